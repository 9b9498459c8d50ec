//! Static permission model.
//!
//! Each [`Role`] carries a fixed [`RolePolicy`]: the actions it may take
//! per [`Resource`], the roles whose full details it may view, and
//! whether raw user ids are shown to it. Lookups never fail; anything
//! not granted is denied.
//!
//! Approval gating ([`needs_approval`]) is a separate rule and is not
//! derived from the grants table. When adding resources or actions here,
//! check whether `needs_approval` has to learn about them too.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HemolabError;
use crate::models::role::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Checkups,
    Tests,
    Patients,
    Users,
    Approvals,
    Medicines,
}

impl Resource {
    pub const ALL: [Resource; 6] = [
        Resource::Checkups,
        Resource::Tests,
        Resource::Patients,
        Resource::Users,
        Resource::Approvals,
        Resource::Medicines,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Checkups => "checkups",
            Resource::Tests => "tests",
            Resource::Patients => "patients",
            Resource::Users => "users",
            Resource::Approvals => "approvals",
            Resource::Medicines => "medicines",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = HemolabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| HemolabError::validation(format!("unknown resource: {s}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
    #[serde(rename = "generatePDF")]
    GeneratePdf,
    ViewOwn,
    ResetPassword,
    ChangePermissions,
    Approve,
    ApproveUsers,
}

impl Action {
    pub const ALL: [Action; 10] = [
        Action::View,
        Action::Create,
        Action::Edit,
        Action::Delete,
        Action::GeneratePdf,
        Action::ViewOwn,
        Action::ResetPassword,
        Action::ChangePermissions,
        Action::Approve,
        Action::ApproveUsers,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::GeneratePdf => "generatePDF",
            Action::ViewOwn => "viewOwn",
            Action::ResetPassword => "resetPassword",
            Action::ChangePermissions => "changePermissions",
            Action::Approve => "approve",
            Action::ApproveUsers => "approveUsers",
        }
    }

    /// Whether the action changes stored data.
    pub fn is_mutation(self) -> bool {
        matches!(self, Action::Create | Action::Edit | Action::Delete)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = HemolabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| HemolabError::validation(format!("unknown action: {s}")))
    }
}

/// Actions granted to a role on one resource.
#[derive(Debug)]
struct Grant {
    resource: Resource,
    actions: &'static [Action],
}

/// Immutable permission policy of a single role.
#[derive(Debug)]
pub struct RolePolicy {
    pub role: Role,
    grants: &'static [Grant],
    /// Roles whose full details this role may see. An explicit list,
    /// not derived from rank.
    pub view_roles: &'static [Role],
    /// Whether raw user ids are displayed to this role.
    pub view_user_id: bool,
}

impl RolePolicy {
    pub fn allows(&self, resource: Resource, action: Action) -> bool {
        self.actions(resource).contains(&action)
    }

    pub fn actions(&self, resource: Resource) -> &'static [Action] {
        self.grants
            .iter()
            .find(|g| g.resource == resource)
            .map(|g| g.actions)
            .unwrap_or(&[])
    }
}

use Action::*;

const READ_ONLY: &[Action] = &[View];
const CONTRIBUTE: &[Action] = &[View, Create, Edit];
const MANAGE: &[Action] = &[View, Create, Edit, Delete];

static USER_POLICY: RolePolicy = RolePolicy {
    role: Role::User,
    grants: &[
        Grant {
            resource: Resource::Checkups,
            actions: &[View, ViewOwn, GeneratePdf],
        },
        Grant {
            resource: Resource::Tests,
            actions: READ_ONLY,
        },
        Grant {
            resource: Resource::Patients,
            actions: READ_ONLY,
        },
        Grant {
            resource: Resource::Medicines,
            actions: READ_ONLY,
        },
        Grant {
            resource: Resource::Users,
            actions: &[ViewOwn],
        },
    ],
    view_roles: &[],
    view_user_id: false,
};

static EDITOR_POLICY: RolePolicy = RolePolicy {
    role: Role::Editor,
    grants: &[
        Grant {
            resource: Resource::Checkups,
            actions: &[View, ViewOwn, Create, Edit, GeneratePdf],
        },
        Grant {
            resource: Resource::Tests,
            actions: CONTRIBUTE,
        },
        Grant {
            resource: Resource::Patients,
            actions: CONTRIBUTE,
        },
        Grant {
            resource: Resource::Medicines,
            actions: CONTRIBUTE,
        },
        Grant {
            resource: Resource::Users,
            actions: &[ViewOwn],
        },
    ],
    view_roles: &[Role::User],
    view_user_id: false,
};

static MAINTAINER_POLICY: RolePolicy = RolePolicy {
    role: Role::Maintainer,
    grants: &[
        Grant {
            resource: Resource::Checkups,
            actions: &[View, ViewOwn, Create, Edit, Delete, GeneratePdf],
        },
        Grant {
            resource: Resource::Tests,
            actions: MANAGE,
        },
        Grant {
            resource: Resource::Patients,
            actions: MANAGE,
        },
        Grant {
            resource: Resource::Medicines,
            actions: MANAGE,
        },
        Grant {
            resource: Resource::Users,
            actions: &[View, ViewOwn, Create, Edit, Delete, ResetPassword],
        },
        Grant {
            resource: Resource::Approvals,
            actions: READ_ONLY,
        },
    ],
    view_roles: &[Role::User, Role::Editor],
    view_user_id: false,
};

static SUPERADMIN_POLICY: RolePolicy = RolePolicy {
    role: Role::Superadmin,
    grants: &[
        Grant {
            resource: Resource::Checkups,
            actions: &[View, ViewOwn, Create, Edit, Delete, GeneratePdf],
        },
        Grant {
            resource: Resource::Tests,
            actions: MANAGE,
        },
        Grant {
            resource: Resource::Patients,
            actions: MANAGE,
        },
        Grant {
            resource: Resource::Medicines,
            actions: MANAGE,
        },
        Grant {
            resource: Resource::Users,
            actions: &[
                View,
                ViewOwn,
                Create,
                Edit,
                Delete,
                ResetPassword,
                ChangePermissions,
            ],
        },
        Grant {
            resource: Resource::Approvals,
            actions: &[View, Approve, ApproveUsers],
        },
    ],
    view_roles: &[Role::User, Role::Editor, Role::Maintainer, Role::Superadmin],
    view_user_id: true,
};

/// The policy of `role`.
pub fn policy(role: Role) -> &'static RolePolicy {
    match role {
        Role::User => &USER_POLICY,
        Role::Editor => &EDITOR_POLICY,
        Role::Maintainer => &MAINTAINER_POLICY,
        Role::Superadmin => &SUPERADMIN_POLICY,
    }
}

pub fn has_permission(role: Role, resource: Resource, action: Action) -> bool {
    policy(role).allows(resource, action)
}

/// String-level lookup for callers holding raw names. Any unrecognised
/// role, resource or action is denied.
pub fn has_permission_str(role: &str, resource: &str, action: &str) -> bool {
    match (role.parse(), resource.parse(), action.parse()) {
        (Ok(role), Ok(resource), Ok(action)) => has_permission(role, resource, action),
        _ => false,
    }
}

/// Actions `role` may take on `resource`; empty when none.
pub fn allowed_actions(role: Role, resource: Resource) -> &'static [Action] {
    policy(role).actions(resource)
}

pub fn is_role_at_least(role: Role, required: Role) -> bool {
    role.rank() >= required.rank()
}

pub fn can_view_role(viewer: Role, target: Role) -> bool {
    policy(viewer).view_roles.contains(&target)
}

pub fn can_view_user_id(role: Role) -> bool {
    policy(role).view_user_id
}

/// Whether an otherwise permitted action must go through a change
/// request instead of being applied directly.
///
/// Only two rules exist: editors editing checkups or tests, and
/// maintainers mutating users. Everything else, including every
/// superadmin action, is direct.
pub fn needs_approval(role: Role, resource: Resource, action: Action) -> bool {
    match role {
        Role::Editor => {
            action == Action::Edit && matches!(resource, Resource::Checkups | Resource::Tests)
        }
        Role::Maintainer => resource == Resource::Users && action.is_mutation(),
        Role::User | Role::Superadmin => false,
    }
}
