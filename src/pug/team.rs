use serde::{Deserialize, Serialize};
use std::{
    fmt,
    ops::{Index, IndexMut},
};

/// Team assignment as reported by the game server.
#[derive(Eq, PartialEq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Team {
    Red,
    Blue,
    Spectator,
    /// Connected but not joined to any team
    Free,
}

impl Team {
    /// The pickup side this team corresponds to, if any.
    pub fn side(self) -> Option<Side> {
        match self {
            Team::Red => Some(Side::Red),
            Team::Blue => Some(Side::Blue),
            Team::Spectator | Team::Free => None,
        }
    }

    pub fn parse(input: &str) -> Option<Team> {
        match input.to_lowercase().as_str() {
            "r" | "red" => Some(Team::Red),
            "b" | "blue" => Some(Team::Blue),
            "s" | "spec" | "spectator" => Some(Team::Spectator),
            "f" | "free" | "none" => Some(Team::Free),
            _ => None,
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::Red => write!(f, "red"),
            Team::Blue => write!(f, "blue"),
            Team::Spectator => write!(f, "spectator"),
            Team::Free => write!(f, "free"),
        }
    }
}

/// One of the two sides a pickup game is played between.
#[derive(Eq, PartialEq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Side {
    Red,
    Blue,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Red, Side::Blue];

    pub fn other(self) -> Side {
        match self {
            Side::Red => Side::Blue,
            Side::Blue => Side::Red,
        }
    }

    fn index(self) -> usize {
        match self {
            Side::Red => 0,
            Side::Blue => 1,
        }
    }
}

impl From<Side> for Team {
    fn from(side: Side) -> Self {
        match side {
            Side::Red => Team::Red,
            Side::Blue => Team::Blue,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Team::from(*self).fmt(f)
    }
}

/// A value held once per side, indexed by [`Side`].
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Sides<T>([T; 2]);

impl<T> Sides<T> {
    pub fn iter(&self) -> impl Iterator<Item = (Side, &T)> {
        Side::BOTH.into_iter().zip(self.0.iter())
    }

    /// The first side whose value matches `predicate`, Red before Blue.
    pub fn find(&self, predicate: impl Fn(&T) -> bool) -> Option<Side> {
        self.iter()
            .find(|(_, value)| predicate(value))
            .map(|(side, _)| side)
    }
}

impl<T> Index<Side> for Sides<T> {
    type Output = T;

    fn index(&self, side: Side) -> &T {
        &self.0[side.index()]
    }
}

impl<T> IndexMut<Side> for Sides<T> {
    fn index_mut(&mut self, side: Side) -> &mut T {
        &mut self.0[side.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sides_are_indexed_by_side() {
        let mut captains: Sides<Option<&str>> = Sides::default();
        captains[Side::Blue] = Some("doom");
        assert_eq!(captains[Side::Red], None);
        assert_eq!(captains[Side::Blue], Some("doom"));
        assert_eq!(captains.find(|c| c.is_none()), Some(Side::Red));
    }

    #[test]
    fn only_red_and_blue_are_sides() {
        assert_eq!(Team::Red.side(), Some(Side::Red));
        assert_eq!(Team::Spectator.side(), None);
        assert_eq!(Team::parse("B"), Some(Team::Blue));
    }
}
