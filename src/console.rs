//! Line protocol standing in for the game server's console scraper.
//!
//! ```text
//! chat <player> <text>
//! state <warmup|countdown|in_progress|limit|intermission>
//! team <player> <red|blue|spectator|free>
//! leave <player>
//! mode <team|ffa>
//! ```

use anyhow::Context;
use std::sync::Arc;
use thiserror::Error as ThisError;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::mpsc::Sender,
};
use tracing::{debug, info, warn};

use crate::{
    commands::PickupCommand,
    event_handler::Inbound,
    pug::{
        event::{GameState, PickupEvent},
        player::PlayerId,
        team::Team,
    },
    roster::SharedRoster,
};

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ConsoleLine {
    Chat { player: PlayerId, text: String },
    State(GameState),
    Team { player: PlayerId, team: Team },
    Leave(PlayerId),
    Mode { team_based: bool },
}

#[derive(ThisError, Debug, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("unknown console command `{0}`")]
    UnknownCommand(String),
    #[error("`{0}` is missing an argument")]
    MissingArgument(&'static str),
    #[error("unknown game state `{0}`")]
    UnknownState(String),
    #[error("unknown team `{0}`")]
    UnknownTeam(String),
    #[error("unknown game mode `{0}`, expected team or ffa")]
    UnknownMode(String),
}

impl ConsoleLine {
    /// Blank lines parse to `None`.
    pub fn parse(line: &str) -> Result<Option<ConsoleLine>, ConsoleError> {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };
        if command.is_empty() {
            return Ok(None);
        }

        let parsed = match command.to_lowercase().as_str() {
            "chat" => {
                let (player, text) = rest
                    .split_once(char::is_whitespace)
                    .ok_or(ConsoleError::MissingArgument("chat"))?;
                ConsoleLine::Chat {
                    player: PlayerId::new(player),
                    text: text.trim().to_string(),
                }
            }
            "state" => {
                let state = argument(rest, "state")?;
                ConsoleLine::State(
                    GameState::parse(state)
                        .ok_or_else(|| ConsoleError::UnknownState(state.to_string()))?,
                )
            }
            "team" => {
                let mut words = rest.split_whitespace();
                let player = words.next().ok_or(ConsoleError::MissingArgument("team"))?;
                let team = words.next().ok_or(ConsoleError::MissingArgument("team"))?;
                ConsoleLine::Team {
                    player: PlayerId::new(player),
                    team: Team::parse(team)
                        .ok_or_else(|| ConsoleError::UnknownTeam(team.to_string()))?,
                }
            }
            "leave" => ConsoleLine::Leave(PlayerId::new(argument(rest, "leave")?)),
            "mode" => match argument(rest, "mode")?.to_lowercase().as_str() {
                "team" | "ctf" | "tdm" | "ca" => ConsoleLine::Mode { team_based: true },
                "ffa" | "duel" => ConsoleLine::Mode { team_based: false },
                other => return Err(ConsoleError::UnknownMode(other.to_string())),
            },
            other => return Err(ConsoleError::UnknownCommand(other.to_string())),
        };
        Ok(Some(parsed))
    }
}

fn argument<'a>(rest: &'a str, command: &'static str) -> Result<&'a str, ConsoleError> {
    rest.split_whitespace()
        .next()
        .ok_or(ConsoleError::MissingArgument(command))
}

/// Updates the roster and translates the line into what the event handler consumes.
pub fn apply(line: ConsoleLine, roster: &SharedRoster) -> Vec<Inbound> {
    match line {
        ConsoleLine::Chat { player, text } => match PickupCommand::parse(&text) {
            Ok(Some(PickupCommand::Last(distance))) => vec![Inbound::LastGames {
                requester: player,
                distance,
            }],
            Ok(Some(command)) => command
                .into_event(player)
                .map(Inbound::Event)
                .into_iter()
                .collect(),
            Ok(None) => Vec::new(),
            Err(why) => vec![Inbound::Reply {
                player,
                text: why.to_string(),
            }],
        },
        ConsoleLine::State(state) => vec![Inbound::Event(PickupEvent::GameStateChanged(state))],
        ConsoleLine::Team { player, team } => {
            let previous = roster.set_team(player.clone(), team);
            let mut inbound = Vec::new();
            if let Some(previous) = previous.filter(|p| p.side().is_some() && *p != team) {
                inbound.push(Inbound::Event(PickupEvent::PlayerDeparted {
                    player: player.clone(),
                    was_on_team: true,
                    team: previous,
                }));
            }
            if team.side().is_some() && previous != Some(team) {
                inbound.push(Inbound::Event(PickupEvent::PlayerJoinedTeam { player, team }));
            }
            inbound
        }
        ConsoleLine::Leave(player) => {
            let previous = roster.remove(&player);
            vec![Inbound::Event(PickupEvent::PlayerDeparted {
                player,
                was_on_team: previous.and_then(Team::side).is_some(),
                team: previous.unwrap_or(Team::Free),
            })]
        }
        ConsoleLine::Mode { team_based } => {
            info!("Server switched to a {} mode", if team_based { "team" } else { "non-team" });
            roster.set_team_mode(team_based);
            Vec::new()
        }
    }
}

/// Reads console lines until the input closes.
pub async fn run<R>(reader: R, roster: Arc<SharedRoster>, tx: Sender<Inbound>) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines
        .next_line()
        .await
        .context("Failed to read from the console")?
    {
        let parsed = match ConsoleLine::parse(&line) {
            Ok(Some(parsed)) => parsed,
            Ok(None) => continue,
            Err(why) => {
                warn!("Ignoring console line {:?}: {}", line, why);
                continue;
            }
        };
        debug!("Console: {:?}", parsed);
        for inbound in apply(parsed, &roster) {
            tx.send(inbound)
                .await
                .context("The pickup event handler has stopped")?;
        }
    }
    info!("Console input closed");
    Ok(())
}
