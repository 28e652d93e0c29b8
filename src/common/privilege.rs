use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Access level of a registered account. Ordered from least to most privileged.
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum PrivilegeLevel {
    None,
    User,
    SuperUser,
    Admin,
    Owner,
}

impl Default for PrivilegeLevel {
    fn default() -> Self {
        PrivilegeLevel::None
    }
}

impl fmt::Display for PrivilegeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PrivilegeLevel::None => "none",
            PrivilegeLevel::User => "user",
            PrivilegeLevel::SuperUser => "superuser",
            PrivilegeLevel::Admin => "admin",
            PrivilegeLevel::Owner => "owner",
        };
        write!(f, "{}", label)
    }
}

impl FromStr for PrivilegeLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(PrivilegeLevel::None),
            "user" => Ok(PrivilegeLevel::User),
            "superuser" | "super" => Ok(PrivilegeLevel::SuperUser),
            "admin" => Ok(PrivilegeLevel::Admin),
            "owner" => Ok(PrivilegeLevel::Owner),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered() {
        assert!(PrivilegeLevel::Owner > PrivilegeLevel::Admin);
        assert!(PrivilegeLevel::SuperUser < PrivilegeLevel::Admin);
        assert_eq!("Admin".parse(), Ok(PrivilegeLevel::Admin));
    }
}
