use chrono::{DateTime, Utc};
use std::time::Duration;

use super::{
    event::TimerKind,
    player::PlayerId,
    team::{Side, Team},
};

/// Why a player is being considered for punishment.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Offence {
    /// Left a team without arranging a substitute
    NoShow,
    /// Left after being substituted; checked against the sub-usage limit
    ExcessSubs,
}

/// Bookkeeping to be written to the persistent store.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum StoreOp {
    /// Both teams have been picked
    SaveLineup {
        game_id: String,
        captains: [(Side, PlayerId); 2],
        red: Vec<PlayerId>,
        blue: Vec<PlayerId>,
    },
    GameStarted {
        game_id: String,
        at: DateTime<Utc>,
        players: Vec<PlayerId>,
    },
    GameEnded {
        game_id: String,
        at: DateTime<Utc>,
        red: Vec<PlayerId>,
        blue: Vec<PlayerId>,
        subs: Vec<String>,
        no_shows: Vec<String>,
    },
    SubUsed(PlayerId),
    RemoveBan(PlayerId),
    ClearNoShows(PlayerId),
    ClearSubsUsed(PlayerId),
}

/// Something the pickup manager wants done. Effects are dispatched in order and
/// never report back; the next authoritative state arrives as a later event.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Effect {
    Announce(String),
    Whisper { player: PlayerId, text: String },
    MovePlayer { player: PlayerId, team: Team },
    LockTeams,
    UnlockTeams(Option<Side>),
    CallVote(String),
    /// Message every connected account at or above the management level
    NotifyPrivileged(String),
    ArmTimer {
        kind: TimerKind,
        generation: u64,
        delay: Duration,
    },
    CancelTimer(TimerKind),
    Persist(StoreOp),
    Punish { player: PlayerId, offence: Offence },
}

impl Effect {
    pub fn whisper<S: ToString>(player: &PlayerId, text: S) -> Self {
        Effect::Whisper {
            player: player.clone(),
            text: text.to_string(),
        }
    }

    pub fn announce<S: ToString>(text: S) -> Self {
        Effect::Announce(text.to_string())
    }

    pub fn move_player(player: &PlayerId, team: Team) -> Self {
        Effect::MovePlayer {
            player: player.clone(),
            team,
        }
    }
}
