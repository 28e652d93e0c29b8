use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use crate::pug::{
    player::PlayerId,
    team::{Side, Team},
};

/// Commands the pickup sends to the game server. Calls never block and
/// never report back; the server's reaction arrives as a later event.
pub trait CommandSink: Send + Sync {
    fn announce(&self, text: &str);
    fn whisper(&self, player: &PlayerId, text: &str);
    fn move_player(&self, player: &PlayerId, team: Team);
    fn lock_teams(&self);
    /// Unlocks one side, or both when `side` is `None`.
    fn unlock_teams(&self, side: Option<Side>);
    fn call_vote(&self, vote: &str);
}

/// Renders commands as rcon console lines and queues them for the writer task.
#[derive(Clone, Debug)]
pub struct RconSink {
    tx: UnboundedSender<String>,
}

impl RconSink {
    pub fn new(tx: UnboundedSender<String>) -> Self {
        RconSink { tx }
    }

    fn send(&self, line: String) {
        if self.tx.send(line).is_err() {
            warn!("The rcon writer has shut down, dropping command");
        }
    }
}

fn quoted(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "'"))
}

fn team_code(team: Team) -> &'static str {
    match team {
        Team::Red => "r",
        Team::Blue => "b",
        Team::Spectator => "s",
        Team::Free => "f",
    }
}

impl CommandSink for RconSink {
    fn announce(&self, text: &str) {
        self.send(format!("say {}", quoted(text)));
    }

    fn whisper(&self, player: &PlayerId, text: &str) {
        self.send(format!("tell {} {}", player.name(), quoted(text)));
    }

    fn move_player(&self, player: &PlayerId, team: Team) {
        self.send(format!("put {} {}", player.name(), team_code(team)));
    }

    fn lock_teams(&self) {
        self.send("lock".to_string());
    }

    fn unlock_teams(&self, side: Option<Side>) {
        match side {
            Some(side) => self.send(format!("unlock {}", team_code(side.into()))),
            None => self.send("unlock".to_string()),
        }
    }

    fn call_vote(&self, vote: &str) {
        self.send(format!("callvote {}", vote));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn commands_are_rendered_as_rcon_lines() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = RconSink::new(tx);
        let player = PlayerId::new("Xaero");

        sink.announce("Teams are \"set\"");
        sink.whisper(&player, "hi");
        sink.move_player(&player, Team::Spectator);
        sink.unlock_teams(Some(Side::Blue));
        sink.unlock_teams(None);
        sink.call_vote("teamsize 4");

        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line);
        }
        assert_eq!(
            lines,
            vec![
                "say \"Teams are 'set'\"",
                "tell Xaero \"hi\"",
                "put Xaero s",
                "unlock b",
                "unlock",
                "callvote teamsize 4",
            ]
        );
    }
}
