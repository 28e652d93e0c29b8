use thiserror::Error as ThisError;

use crate::pug::{player::PlayerId, team::Side};

/// Error type for storage failures, wrapping errors from whichever backend is in use:
///
/// [`mongodb::error::Error`]
///
/// This is to allow the punishment and bookkeeping paths to log a single error type
/// regardless of the configured store.
#[derive(ThisError, Debug)]
pub enum StoreError {
    #[error("mongodb returned an error")]
    Mongo(mongodb::error::Error),
    #[error("no {0} record was found")]
    Missing(&'static str),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(error: mongodb::error::Error) -> Self {
        StoreError::Mongo(error)
    }
}

#[derive(ThisError, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("`{name}` must be {expected}, got `{value}`")]
    Invalid {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Reasons a pickup command is rejected. The message is shown to the requester
/// and the session is left untouched.
#[derive(ThisError, Debug, PartialEq, Eq)]
pub enum PickupErr {
    #[error("Pickups can only be played in a team-based game mode.")]
    NotTeamMode,
    #[error("A game is currently in progress. Wait for it to return to warm-up.")]
    GameInProgress,
    #[error("A pickup is already being set up.")]
    AlreadyPending,
    #[error("There is no pickup being set up right now.")]
    NoPickup,
    #[error("You are banned from pickups until {0}.")]
    Banned(String),
    #[error("You are already signed up.")]
    AlreadySignedUp,
    #[error("You are already on a team.")]
    AlreadyOnTeam,
    #[error("You are not signed up.")]
    NotSignedUp,
    #[error("Captains are the first players on their team and cannot remove themselves.")]
    CaptainCannotRemove,
    #[error("Team selection has already started, you can no longer remove yourself.")]
    TeamSelectionStarted,
    #[error("Captain selection has not started.")]
    CaptainSelectionNotStarted,
    #[error("You must be signed up to become a captain.")]
    NotAvailable,
    #[error("You are already captain of {0} team.")]
    IsCaptainAlready(Side),
    #[error("There are no captain spots available.")]
    CaptainSpotsFilled,
    #[error("Only captains can pick players.")]
    NotCaptain,
    #[error("It is not your turn to pick.")]
    NotYourTurn,
    #[error("Team selection has not started.")]
    TeamSelectionNotStarted,
    #[error("{0} is not available to be picked.")]
    NotPickable(PlayerId),
    #[error("Substitutions can only be made before or during a pickup game.")]
    SubNotAllowed,
    #[error("You are not playing in this pickup.")]
    NotInLineup,
    #[error("{0} is not available as a substitute.")]
    NotASubCandidate(PlayerId),
    #[error("You do not have permission to do that.")]
    Unauthorized,
    #[error("{0} is not banned.")]
    NotBanned(PlayerId),
    #[error("{0}'s ban was not issued by the pickup module. An admin must remove it.")]
    NotPickupBan(PlayerId),
}
