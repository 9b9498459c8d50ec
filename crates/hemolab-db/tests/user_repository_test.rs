//! Integration tests for the User repository using in-memory SurrealDB.

use hemolab_core::error::HemolabError;
use hemolab_core::models::role::Role;
use hemolab_core::models::user::{CreateUser, UpdateUser};
use hemolab_core::repository::{Pagination, UserRepository};
use hemolab_db::repository::SurrealUserRepository;
use hemolab_db::verify_password;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    hemolab_db::run_migrations(&db).await.unwrap();
    db
}

fn new_user(name: &str, role: Role) -> CreateUser {
    CreateUser {
        name: name.into(),
        email: format!("{}@lab.test", name.to_lowercase()),
        role,
        password: "Correct-Horse-9".into(),
        password_reset_required: false,
    }
}

#[tokio::test]
async fn create_and_get_user() {
    let repo = SurrealUserRepository::new(setup().await);

    let user = repo.create(new_user("Alice", Role::Editor)).await.unwrap();
    assert_eq!(user.name, "Alice");
    assert_eq!(user.email, "alice@lab.test");
    assert_eq!(user.role, Role::Editor);
    assert!(!user.password_reset_required);

    // Password should be hashed, not stored in plaintext.
    assert_ne!(user.password_hash, "Correct-Horse-9");
    assert!(user.password_hash.starts_with("$argon2id$"));

    let fetched = repo.get_by_id(user.id).await.unwrap();
    assert_eq!(fetched.id, user.id);
    assert_eq!(fetched.role, Role::Editor);

    let by_email = repo.get_by_email("alice@lab.test").await.unwrap();
    assert_eq!(by_email.id, user.id);
}

#[tokio::test]
async fn password_verification_honours_pepper() {
    let repo = SurrealUserRepository::with_pepper(setup().await, "pepper!".into());
    let user = repo.create(new_user("Bob", Role::User)).await.unwrap();

    assert!(verify_password("Correct-Horse-9", &user.password_hash, Some("pepper!")).unwrap());
    assert!(!verify_password("Correct-Horse-9", &user.password_hash, None).unwrap());
    assert!(!verify_password("wrong", &user.password_hash, Some("pepper!")).unwrap());
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let repo = SurrealUserRepository::new(setup().await);
    repo.create(new_user("Carol", Role::User)).await.unwrap();

    let err = repo.create(new_user("Carol", Role::Editor)).await.unwrap_err();
    assert!(matches!(err, HemolabError::AlreadyExists { .. }));
}

#[tokio::test]
async fn update_to_taken_email_is_rejected() {
    let repo = SurrealUserRepository::new(setup().await);
    let carol = repo.create(new_user("Carol", Role::User)).await.unwrap();
    repo.create(new_user("Dave", Role::User)).await.unwrap();

    let err = repo
        .update(
            carol.id,
            UpdateUser {
                email: Some("dave@lab.test".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, HemolabError::AlreadyExists { .. }), "{err:?}");

    let unchanged = repo.get_by_id(carol.id).await.unwrap();
    assert_eq!(unchanged.email, "carol@lab.test");
}

#[tokio::test]
async fn update_changes_only_given_fields() {
    let repo = SurrealUserRepository::new(setup().await);
    let user = repo.create(new_user("Dave", Role::User)).await.unwrap();

    let updated = repo
        .update(
            user.id,
            UpdateUser {
                role: Some(Role::Editor),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.role, Role::Editor);
    assert_eq!(updated.name, "Dave");
    assert_eq!(updated.email, "dave@lab.test");
    assert!(updated.updated_at >= user.updated_at);
}

#[tokio::test]
async fn delete_removes_user() {
    let repo = SurrealUserRepository::new(setup().await);
    let user = repo.create(new_user("Erin", Role::User)).await.unwrap();

    repo.delete(user.id).await.unwrap();

    let err = repo.get_by_id(user.id).await.unwrap_err();
    assert!(matches!(err, HemolabError::NotFound { .. }));

    // Deleting again reports the missing record.
    let err = repo.delete(user.id).await.unwrap_err();
    assert!(matches!(err, HemolabError::NotFound { .. }));
}

#[tokio::test]
async fn find_by_role_returns_oldest_first() {
    let repo = SurrealUserRepository::new(setup().await);
    let first = repo.create(new_user("Root", Role::Superadmin)).await.unwrap();
    repo.create(new_user("Frank", Role::Maintainer)).await.unwrap();
    let second = repo.create(new_user("Grace", Role::Superadmin)).await.unwrap();

    let admins = repo.find_by_role(Role::Superadmin).await.unwrap();
    let ids: Vec<_> = admins.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);

    assert!(repo.find_by_role(Role::User).await.unwrap().is_empty());
}

#[tokio::test]
async fn list_paginates() {
    let repo = SurrealUserRepository::new(setup().await);
    for name in ["Hank", "Ivy", "Jack"] {
        repo.create(new_user(name, Role::User)).await.unwrap();
    }

    let page = repo
        .list(Pagination {
            offset: 1,
            limit: 1,
        })
        .await
        .unwrap();

    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].name, "Ivy");
}
