use thiserror::Error as ThisError;

use crate::pug::{event::PickupEvent, player::PlayerId};

pub const COMMAND_PREFIX: char = '!';
pub const MAX_HISTORY: usize = 25;
pub const MIN_HISTORY: usize = 1;

/// A chat command addressed to the pickup module.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum PickupCommand {
    Add,
    Remove,
    Captain,
    Pick(PlayerId),
    Sub(PlayerId),
    Start,
    Stop,
    Reset,
    Unban(PlayerId),
    /// Show the n-th most recent pickup game
    Last(usize),
}

#[derive(ThisError, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("Usage: {0}")]
    MissingPlayer(&'static str),
    #[error("Unknown pickup command `{0}`. Use start, stop, reset or unban <player>.")]
    UnknownSubcommand(String),
    #[error("You entered an invalid value where a number was expected - {0}")]
    InvalidNumber(String),
    #[error("The number must be in the range {} - {}", MIN_HISTORY, MAX_HISTORY)]
    HistoryOutOfRange,
}

impl PickupCommand {
    /// Parses a chat line. `Ok(None)` means the line is not meant for the pickup module.
    ///
    /// __Examples__
    ///
    /// `!add` or `!a` signs up, `!pick visor` picks a player,
    /// `!pickup unban visor` lifts a pickup ban,
    /// `!lastt` shows the second most recent game.
    pub fn parse(line: &str) -> Result<Option<PickupCommand>, CommandError> {
        let line = match line.trim().strip_prefix(COMMAND_PREFIX) {
            Some(line) => line,
            None => return Ok(None),
        };
        let mut words = line.split_whitespace();
        let name = match words.next() {
            Some(name) => name.to_lowercase(),
            None => return Ok(None),
        };

        let command = match name.as_str() {
            "add" | "a" => PickupCommand::Add,
            "remove" | "rem" => PickupCommand::Remove,
            "cap" | "captain" => PickupCommand::Captain,
            "pick" | "p" => PickupCommand::Pick(target(words.next(), "!pick <player>")?),
            "sub" => PickupCommand::Sub(target(words.next(), "!sub <player>")?),
            "pickup" => match words.next().map(str::to_lowercase).as_deref() {
                Some("start") => PickupCommand::Start,
                Some("stop") => PickupCommand::Stop,
                Some("reset") => PickupCommand::Reset,
                Some("unban") => {
                    PickupCommand::Unban(target(words.next(), "!pickup unban <player>")?)
                }
                Some(other) => return Err(CommandError::UnknownSubcommand(other.to_string())),
                None => return Err(CommandError::UnknownSubcommand(String::new())),
            },
            last if is_last(last) => {
                let distance = match words.next() {
                    Some(value) => value
                        .parse::<usize>()
                        .map_err(|err| CommandError::InvalidNumber(err.to_string()))?,
                    // how many "t"s in the command
                    None => last.matches('t').count(),
                };
                if !(MIN_HISTORY..=MAX_HISTORY).contains(&distance) {
                    return Err(CommandError::HistoryOutOfRange);
                }
                PickupCommand::Last(distance)
            }
            _ => return Ok(None),
        };
        Ok(Some(command))
    }

    /// The event this command feeds to the pickup manager. History queries are
    /// answered from the store and produce no event.
    pub fn into_event(self, player: PlayerId) -> Option<PickupEvent> {
        let event = match self {
            PickupCommand::Add => PickupEvent::PlayerJoined(player),
            PickupCommand::Remove => PickupEvent::PlayerLeft(player),
            PickupCommand::Captain => PickupEvent::CaptainVolunteered(player),
            PickupCommand::Pick(target) => PickupEvent::PickMade {
                captain: player,
                target,
            },
            PickupCommand::Sub(incoming) => PickupEvent::SubRequested {
                requester: player,
                incoming,
            },
            PickupCommand::Start => PickupEvent::Start { requester: player },
            PickupCommand::Stop => PickupEvent::Stop { requester: player },
            PickupCommand::Reset => PickupEvent::Reset { requester: player },
            PickupCommand::Unban(target) => PickupEvent::Unban {
                requester: player,
                target,
            },
            PickupCommand::Last(_) => return None,
        };
        Some(event)
    }
}

fn target(word: Option<&str>, usage: &'static str) -> Result<PlayerId, CommandError> {
    word.map(PlayerId::new)
        .ok_or(CommandError::MissingPlayer(usage))
}

/// `last`, `lastt`, `lasttt`, ...
fn is_last(word: &str) -> bool {
    word.strip_prefix("las")
        .map(|rest| !rest.is_empty() && rest.chars().all(|c| c == 't'))
        .unwrap_or(false)
}
