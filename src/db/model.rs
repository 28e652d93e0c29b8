use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::privilege::PrivilegeLevel;

/// Which part of the bot issued a ban. Only pickup bans can be lifted with the pickup `unban` command.
#[derive(Eq, PartialEq, Clone, Copy, Debug, Deserialize, Serialize)]
pub enum BanOrigin {
    Admin,
    PickupNoShow,
    PickupSub,
    OtherModule,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct BanRecord {
    /// Lowercased player name
    pub player: String,
    pub origin: BanOrigin,
    pub issued: DateTime<Utc>,
    pub expires: DateTime<Utc>,
}

impl BanRecord {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires > now
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct User {
    pub player: String,
    pub level: PrivilegeLevel,
}

/// Per-player pickup counters.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PlayerStats {
    pub player: String,
    #[serde(default)]
    pub no_shows: u32,
    #[serde(default)]
    pub subs_used: u32,
    #[serde(default)]
    pub games_started: u32,
    #[serde(default)]
    pub games_finished: u32,
    #[serde(default)]
    pub last_played: Option<DateTime<Utc>>,
}

#[derive(Eq, PartialEq, Hash, Clone, Copy, Debug)]
pub enum Counter {
    NoShows,
    SubsUsed,
    GamesStarted,
    GamesFinished,
}

impl Counter {
    /// Document field holding this counter
    pub fn field(&self) -> &'static str {
        match self {
            Counter::NoShows => "no_shows",
            Counter::SubsUsed => "subs_used",
            Counter::GamesStarted => "games_started",
            Counter::GamesFinished => "games_finished",
        }
    }

    pub fn read(&self, stats: &PlayerStats) -> u32 {
        match self {
            Counter::NoShows => stats.no_shows,
            Counter::SubsUsed => stats.subs_used,
            Counter::GamesStarted => stats.games_started,
            Counter::GamesFinished => stats.games_finished,
        }
    }

    pub fn slot<'a>(&self, stats: &'a mut PlayerStats) -> &'a mut u32 {
        match self {
            Counter::NoShows => &mut stats.no_shows,
            Counter::SubsUsed => &mut stats.subs_used,
            Counter::GamesStarted => &mut stats.games_started,
            Counter::GamesFinished => &mut stats.games_finished,
        }
    }
}

/// One pickup game, from the moment both teams are picked.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct PickupGame {
    pub game_id: String,
    pub created: DateTime<Utc>,
    pub started: Option<DateTime<Utc>>,
    pub ended: Option<DateTime<Utc>>,
    pub red_captain: String,
    pub blue_captain: String,
    pub red_team: Vec<String>,
    pub blue_team: Vec<String>,
    #[serde(default)]
    pub subs: Vec<String>,
    #[serde(default)]
    pub no_shows: Vec<String>,
}
