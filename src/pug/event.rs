use super::{player::PlayerId, team::Team};

/// Game-state notifications scraped from the server console.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum GameState {
    Warmup,
    Countdown,
    InProgress,
    ScoreOrTimeLimitHit,
    IntermissionStart,
}

impl GameState {
    pub fn parse(input: &str) -> Option<GameState> {
        match input.to_lowercase().replace('-', "_").as_str() {
            "warmup" | "pre_game" => Some(GameState::Warmup),
            "countdown" => Some(GameState::Countdown),
            "in_progress" | "inprogress" => Some(GameState::InProgress),
            "score_limit" | "time_limit" | "limit" => Some(GameState::ScoreOrTimeLimitHit),
            "intermission" => Some(GameState::IntermissionStart),
            _ => None,
        }
    }
}

#[derive(Eq, PartialEq, Hash, Debug, Clone, Copy)]
pub enum TimerKind {
    /// Assigns random captains if players did not volunteer in time
    CaptainSelection,
    /// Reopens sign-ups after a pickup game ends
    AutoReset,
}

/// Everything that can change the pickup session, delivered one at a time.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum PickupEvent {
    Start { requester: PlayerId },
    Stop { requester: PlayerId },
    Reset { requester: PlayerId },
    Unban { requester: PlayerId, target: PlayerId },
    PlayerJoined(PlayerId),
    PlayerLeft(PlayerId),
    CaptainVolunteered(PlayerId),
    PickMade { captain: PlayerId, target: PlayerId },
    SubRequested { requester: PlayerId, incoming: PlayerId },
    /// A player disconnected or left their team
    PlayerDeparted {
        player: PlayerId,
        was_on_team: bool,
        team: Team,
    },
    /// A player moved onto a team of their own accord
    PlayerJoinedTeam { player: PlayerId, team: Team },
    GameStateChanged(GameState),
    TimerFired { kind: TimerKind, generation: u64 },
}
