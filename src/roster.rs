use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        RwLock,
    },
};

use crate::pug::{player::PlayerId, team::Team};

/// Read-only view of who is connected to the game server and on which team.
///
/// The view can lag behind moves the bot has requested, so callers should treat
/// it as eventually consistent.
pub trait RosterSnapshot: Send + Sync {
    /// `None` when the player is not connected.
    fn team_of(&self, player: &PlayerId) -> Option<Team>;
    fn members_of(&self, team: Team) -> Vec<PlayerId>;
    fn is_team_based_mode(&self) -> bool;

    /// Connected and playing on red or blue.
    fn is_active_player(&self, player: &PlayerId) -> bool {
        matches!(self.team_of(player), Some(Team::Red) | Some(Team::Blue))
    }

    fn connected(&self) -> Vec<PlayerId> {
        [Team::Red, Team::Blue, Team::Spectator, Team::Free]
            .into_iter()
            .flat_map(|team| self.members_of(team))
            .collect()
    }
}

/// Roster kept up to date by whatever scrapes the server console.
#[derive(Debug, Default)]
pub struct SharedRoster {
    players: RwLock<HashMap<PlayerId, Team>>,
    team_mode: AtomicBool,
}

impl SharedRoster {
    pub fn new(team_mode: bool) -> Self {
        SharedRoster {
            players: RwLock::new(HashMap::new()),
            team_mode: AtomicBool::new(team_mode),
        }
    }

    /// Records the player's team and returns the one they were on before.
    pub fn set_team(&self, player: PlayerId, team: Team) -> Option<Team> {
        let mut players = self.players.write().unwrap_or_else(|e| e.into_inner());
        players.insert(player, team)
    }

    pub fn remove(&self, player: &PlayerId) -> Option<Team> {
        let mut players = self.players.write().unwrap_or_else(|e| e.into_inner());
        players.remove(player)
    }

    pub fn set_team_mode(&self, team_mode: bool) {
        self.team_mode.store(team_mode, Ordering::SeqCst);
    }
}

impl RosterSnapshot for SharedRoster {
    fn team_of(&self, player: &PlayerId) -> Option<Team> {
        let players = self.players.read().unwrap_or_else(|e| e.into_inner());
        players.get(player).copied()
    }

    fn members_of(&self, team: Team) -> Vec<PlayerId> {
        let players = self.players.read().unwrap_or_else(|e| e.into_inner());
        let mut members: Vec<PlayerId> = players
            .iter()
            .filter(|(_, t)| **t == team)
            .map(|(p, _)| p.clone())
            .collect();
        members.sort_by(|a, b| a.key().cmp(b.key()));
        members
    }

    fn is_team_based_mode(&self) -> bool {
        self.team_mode.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn members_are_listed_per_team() {
        let roster = SharedRoster::new(true);
        roster.set_team(PlayerId::new("a"), Team::Red);
        roster.set_team(PlayerId::new("b"), Team::Blue);
        roster.set_team(PlayerId::new("c"), Team::Spectator);
        assert_eq!(roster.members_of(Team::Red), vec![PlayerId::new("a")]);
        assert_eq!(roster.connected().len(), 3);

        roster.set_team(PlayerId::new("c"), Team::Blue);
        assert_eq!(roster.members_of(Team::Blue).len(), 2);
        assert!(roster.members_of(Team::Spectator).is_empty());
    }

    #[test]
    fn active_players_are_on_red_or_blue() {
        let roster = SharedRoster::new(true);
        roster.set_team(PlayerId::new("Doom"), Team::Red);
        roster.set_team(PlayerId::new("Orbb"), Team::Spectator);
        assert!(roster.is_active_player(&PlayerId::new("doom")));
        assert!(!roster.is_active_player(&PlayerId::new("orbb")));
        assert!(!roster.is_active_player(&PlayerId::new("ghost")));
        assert_eq!(roster.connected().len(), 2);
    }
}
