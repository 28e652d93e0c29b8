use serde::{Deserialize, Serialize};
use std::{
    borrow::Borrow,
    fmt,
    hash::{Hash, Hasher},
};

/// A player as known to the game server, identified by name.
///
/// Names are compared case-insensitively: the lowercased `key` is used for
/// equality and hashing while `name` keeps the spelling the player chose,
/// which is what gets shown in announcements.
#[derive(Eq, Debug, Clone, Serialize, Deserialize)]
pub struct PlayerId {
    key: String,
    name: String,
}

impl PartialEq for PlayerId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl PartialEq<str> for PlayerId {
    fn eq(&self, other: &str) -> bool {
        self.key == other.to_lowercase()
    }
}

impl Hash for PlayerId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl Borrow<str> for PlayerId {
    /// Lets pools keyed by [`PlayerId`] be queried with a lowercased `&str`
    fn borrow(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl PlayerId {
    pub fn new<S: ToString>(name: S) -> Self {
        let name = name.to_string().trim().to_string();
        PlayerId {
            key: name.to_lowercase(),
            name,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
