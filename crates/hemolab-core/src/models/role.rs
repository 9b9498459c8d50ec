//! Role domain model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HemolabError;

/// Access level of an account.
///
/// Variants are declared from least to most privileged, so the derived
/// `Ord` agrees with [`Role::rank`]. The ordering describes permission
/// scope only, never business seniority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Editor,
    Maintainer,
    Superadmin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::User, Role::Editor, Role::Maintainer, Role::Superadmin];

    /// Fixed numeric rank: user=1, editor=2, maintainer=3, superadmin=4.
    pub fn rank(self) -> u8 {
        match self {
            Role::User => 1,
            Role::Editor => 2,
            Role::Maintainer => 3,
            Role::Superadmin => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Editor => "editor",
            Role::Maintainer => "maintainer",
            Role::Superadmin => "superadmin",
        }
    }

    /// Human-readable name for display.
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Editor => "Editor",
            Role::Maintainer => "Maintainer",
            Role::Superadmin => "Super Admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = HemolabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "editor" => Ok(Role::Editor),
            "maintainer" => Ok(Role::Maintainer),
            "superadmin" => Ok(Role::Superadmin),
            other => Err(HemolabError::validation(format!("unknown role: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ord_matches_rank() {
        for a in Role::ALL {
            for b in Role::ALL {
                assert_eq!(a >= b, a.rank() >= b.rank(), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn parses_its_own_names() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("admin".parse::<Role>().is_err());
        assert!("Superadmin".parse::<Role>().is_err());
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&Role::Superadmin).unwrap();
        assert_eq!(json, "\"superadmin\"");
    }
}
