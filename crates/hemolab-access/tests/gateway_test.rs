//! Integration tests for direct-vs-approval routing of user changes.

use hemolab_access::config::AccessConfig;
use hemolab_access::gateway::{ChangeOutcome, UserChange, UserChangeGateway};
use hemolab_access::notifier::NotificationRelay;
use hemolab_access::workflow::ChangeRequestService;
use hemolab_core::error::HemolabError;
use hemolab_core::models::change_request::{ChangeKind, RequestStatus};
use hemolab_core::models::role::Role;
use hemolab_core::models::user::{CreateUser, User, UserPayload};
use hemolab_core::repository::UserRepository;
use hemolab_db::repository::{
    SurrealChangeRequestRepository, SurrealNotificationRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

type Gateway = UserChangeGateway<
    SurrealUserRepository<Db>,
    SurrealChangeRequestRepository<Db>,
    SurrealNotificationRepository<Db>,
>;

async fn setup() -> (Gateway, SurrealUserRepository<Db>) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    hemolab_db::run_migrations(&db).await.unwrap();

    let config = AccessConfig::default();
    let users = SurrealUserRepository::new(db.clone());
    let workflow = ChangeRequestService::new(
        users.clone(),
        SurrealChangeRequestRepository::new(db.clone()),
        NotificationRelay::new(SurrealNotificationRepository::new(db), &config),
        config,
    );
    (UserChangeGateway::new(workflow), users)
}

async fn seed(users: &SurrealUserRepository<Db>, name: &str, role: Role) -> User {
    users
        .create(CreateUser {
            name: name.into(),
            email: format!("{}@lab.test", name.to_lowercase()),
            role,
            password: "Initial-Pass-1".into(),
            password_reset_required: false,
        })
        .await
        .unwrap()
}

fn account(name: &str, role: Role) -> UserPayload {
    UserPayload {
        name: Some(name.into()),
        email: Some(format!("{}@lab.test", name.to_lowercase())),
        role: Some(role),
    }
}

#[tokio::test]
async fn superadmin_changes_apply_directly() {
    let (gateway, users) = setup().await;
    let admin = seed(&users, "Root", Role::Superadmin).await.actor();

    let outcome = gateway
        .apply(&admin, UserChange::Create(account("Nina", Role::Editor)))
        .await
        .unwrap();
    let created = match outcome {
        ChangeOutcome::Applied(Some(user)) => user,
        other => panic!("expected direct create, got {other:?}"),
    };
    assert_eq!(created.role, Role::Editor);
    assert!(created.password_reset_required);

    let outcome = gateway
        .apply(
            &admin,
            UserChange::Update {
                user_id: created.id,
                payload: UserPayload {
                    role: Some(Role::Maintainer),
                    ..Default::default()
                },
            },
        )
        .await
        .unwrap();
    assert!(matches!(outcome, ChangeOutcome::Applied(Some(ref u)) if u.role == Role::Maintainer));

    let outcome = gateway
        .apply(&admin, UserChange::Delete { user_id: created.id })
        .await
        .unwrap();
    assert!(matches!(outcome, ChangeOutcome::Applied(None)));
    assert!(users.get_by_id(created.id).await.is_err());

    let workflow = gateway.workflow();
    assert!(workflow.fetch_all(&admin).await.unwrap().is_empty());
}

#[tokio::test]
async fn maintainer_update_is_submitted_with_original_values() {
    let (gateway, users) = setup().await;
    let maintainer = seed(&users, "Maya", Role::Maintainer).await.actor();
    let target = seed(&users, "Uma", Role::User).await;

    let outcome = gateway
        .apply(
            &maintainer,
            UserChange::Update {
                user_id: target.id,
                payload: UserPayload {
                    role: Some(Role::Editor),
                    ..Default::default()
                },
            },
        )
        .await
        .unwrap();

    let request = match outcome {
        ChangeOutcome::Submitted(request) => request,
        other => panic!("expected a change request, got {other:?}"),
    };
    assert_eq!(request.kind, ChangeKind::Update);
    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(request.target_user_id, Some(target.id));
    assert_eq!(request.original_payload, Some(target.payload()));

    // Nothing changed yet.
    assert_eq!(users.get_by_id(target.id).await.unwrap().role, Role::User);
}

#[tokio::test]
async fn maintainer_delete_snapshots_the_target() {
    let (gateway, users) = setup().await;
    let maintainer = seed(&users, "Maya", Role::Maintainer).await.actor();
    let target = seed(&users, "Vic", Role::Editor).await;

    let outcome = gateway
        .apply(&maintainer, UserChange::Delete { user_id: target.id })
        .await
        .unwrap();
    let ChangeOutcome::Submitted(request) = outcome else {
        panic!("expected a change request");
    };
    assert_eq!(request.kind, ChangeKind::Delete);
    assert_eq!(request.payload.name.as_deref(), Some("Vic"));
    assert!(users.get_by_id(target.id).await.is_ok());
}

#[tokio::test]
async fn roles_without_user_permissions_are_denied() {
    let (gateway, users) = setup().await;
    let admin = seed(&users, "Root", Role::Superadmin).await.actor();

    for role in [Role::User, Role::Editor] {
        let actor = seed(&users, &format!("{role}x"), role).await.actor();
        let err = gateway
            .apply(&actor, UserChange::Create(account("Nina", Role::User)))
            .await
            .unwrap_err();
        assert!(matches!(err, HemolabError::PermissionDenied { .. }), "{role}");
    }

    assert!(gateway.workflow().fetch_all(&admin).await.unwrap().is_empty());
    assert!(users.get_by_email("nina@lab.test").await.is_err());
}

#[tokio::test]
async fn submitted_change_applies_on_approval() {
    let (gateway, users) = setup().await;
    let maintainer = seed(&users, "Maya", Role::Maintainer).await.actor();
    let admin = seed(&users, "Root", Role::Superadmin).await.actor();

    let ChangeOutcome::Submitted(request) = gateway
        .apply(&maintainer, UserChange::Create(account("Nina", Role::User)))
        .await
        .unwrap()
    else {
        panic!("expected a change request");
    };
    assert!(users.get_by_email("nina@lab.test").await.is_err());

    gateway.workflow().approve(request.id, &admin).await.unwrap();
    assert!(users.get_by_email("nina@lab.test").await.is_ok());
}
