use chrono::{DateTime, Utc};
use itertools::Itertools;
use std::sync::Arc;
use tokio::sync::mpsc::{Receiver, Sender};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    common::privilege::PrivilegeLevel,
    db::{
        client::PersistentStore,
        model::{BanRecord, Counter, PickupGame},
    },
    error::StoreError,
    jobs::Timers,
    pug::{
        effect::{Effect, Offence, StoreOp},
        event::PickupEvent,
        manager::{Lookup, PickupManager},
        player::PlayerId,
        punishment::{self, Verdict},
        team::Side,
    },
    roster::RosterSnapshot,
    sink::CommandSink,
};

/// Capacity of the event stream feeding the [`Handler`].
pub const EVENT_QUEUE_CAPACITY: usize = 256;

/// Everything the [`Handler`] consumes.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Inbound {
    Event(PickupEvent),
    /// `last` history query
    LastGames { requester: PlayerId, distance: usize },
    /// Text to send straight back to a player, e.g. command usage
    Reply { player: PlayerId, text: String },
}

/// Owns the [`PickupManager`] and applies its effects. Every change to the
/// pickup goes through the single event stream consumed by [`Handler::run`].
pub struct Handler {
    manager: PickupManager,
    roster: Arc<dyn RosterSnapshot>,
    sink: Arc<dyn CommandSink>,
    store: Arc<dyn PersistentStore>,
    timers: Timers,
    /// Handed to timers so they can post back into the stream
    tx: Sender<Inbound>,
}

impl Handler {
    pub fn new(
        manager: PickupManager,
        roster: Arc<dyn RosterSnapshot>,
        sink: Arc<dyn CommandSink>,
        store: Arc<dyn PersistentStore>,
        tx: Sender<Inbound>,
    ) -> Self {
        Handler {
            manager,
            roster,
            sink,
            store,
            timers: Timers::default(),
            tx,
        }
    }

    pub async fn run(mut self, mut rx: Receiver<Inbound>) {
        info!("Pickup event handler is running");
        while let Some(inbound) = rx.recv().await {
            self.process(inbound).await;
        }
        info!("Event stream closed, pickup event handler stopping");
    }

    pub async fn process(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Event(event) => self.handle_event(event).await,
            Inbound::LastGames {
                requester,
                distance,
            } => self.last_games(&requester, distance).await,
            Inbound::Reply { player, text } => self.sink.whisper(&player, &text),
        }
    }

    #[instrument(skip(self))]
    async fn handle_event(&mut self, event: PickupEvent) {
        let lookup = self.lookup(&event).await;
        let effects = self.manager.handle(event, self.roster.as_ref(), &lookup);
        for effect in effects {
            self.dispatch(effect).await;
        }
    }

    /// Fetches what the manager needs from the store to judge this event.
    async fn lookup(&self, event: &PickupEvent) -> Lookup {
        let mut lookup = Lookup::default();
        match event {
            PickupEvent::Start { requester }
            | PickupEvent::Stop { requester }
            | PickupEvent::Reset { requester } => {
                lookup.requester_level = self.level(requester).await;
            }
            PickupEvent::Unban { requester, target } => {
                lookup.requester_level = self.level(requester).await;
                lookup.ban = self.ban(target).await;
            }
            PickupEvent::PlayerJoined(player) => {
                lookup.ban = self.ban(player).await;
            }
            _ => {}
        }
        lookup
    }

    async fn level(&self, player: &PlayerId) -> PrivilegeLevel {
        if self.manager.config().owners.contains(player) {
            return PrivilegeLevel::Owner;
        }
        match self.store.privilege_level(player).await {
            Ok(level) => level,
            Err(why) => {
                error!("Could not look up the privilege level of {}: {:?}", player, why);
                PrivilegeLevel::None
            }
        }
    }

    async fn ban(&self, player: &PlayerId) -> Option<BanRecord> {
        match self.store.find_ban(player).await {
            Ok(ban) => ban,
            Err(why) => {
                error!("Could not look up bans for {}: {:?}", player, why);
                None
            }
        }
    }

    async fn dispatch(&mut self, effect: Effect) {
        debug!("Dispatching {:?}", effect);
        match effect {
            Effect::Announce(text) => self.sink.announce(&text),
            Effect::Whisper { player, text } => self.sink.whisper(&player, &text),
            Effect::MovePlayer { player, team } => self.sink.move_player(&player, team),
            Effect::LockTeams => self.sink.lock_teams(),
            Effect::UnlockTeams(side) => self.sink.unlock_teams(side),
            Effect::CallVote(vote) => self.sink.call_vote(&vote),
            Effect::NotifyPrivileged(text) => self.notify_privileged(&text).await,
            Effect::ArmTimer {
                kind,
                generation,
                delay,
            } => self.timers.arm(self.tx.clone(), kind, generation, delay),
            Effect::CancelTimer(kind) => self.timers.cancel(kind),
            Effect::Persist(op) => {
                if let Err(why) = self.persist(op).await {
                    error!("Failed to persist pickup bookkeeping: {:?}", why);
                }
            }
            Effect::Punish { player, offence } => self.punish(&player, offence).await,
        }
    }

    async fn notify_privileged(&self, text: &str) {
        let manage_level = self.manager.config().manage_level;
        for player in self.roster.connected() {
            if self.level(&player).await >= manage_level {
                self.sink.whisper(&player, text);
            }
        }
    }

    async fn punish(&self, player: &PlayerId, offence: Offence) {
        let verdict =
            punishment::apply(self.store.as_ref(), self.manager.config(), player, offence).await;
        match verdict {
            Ok(Verdict::Banned(ban)) => {
                let reason = match offence {
                    Offence::NoShow => "leaving pickup games",
                    Offence::ExcessSubs => "using too many substitutes",
                };
                self.sink.announce(&format!(
                    "{} is banned from pickups until {} for {}.",
                    player,
                    ban.expires.format("%Y-%m-%d %H:%M UTC"),
                    reason
                ));
            }
            Ok(Verdict::Warned(count)) => {
                let (max, what) = match offence {
                    Offence::NoShow => (self.manager.config().max_no_shows, "no-shows"),
                    Offence::ExcessSubs => (self.manager.config().max_subs, "substitutions"),
                };
                self.sink.whisper(
                    player,
                    &format!(
                        "Warning: you have {} of {} allowed {}. Going over the limit gets you banned from pickups.",
                        count, max, what
                    ),
                );
            }
            Ok(Verdict::Exempt) => {}
            Err(why) => error!("Could not punish {} for {:?}: {:?}", player, offence, why),
        }
    }

    async fn persist(&self, op: StoreOp) -> Result<(), StoreError> {
        match op {
            StoreOp::SaveLineup {
                game_id,
                captains,
                red,
                blue,
            } => {
                let captain = |side: Side| {
                    captains
                        .iter()
                        .find(|(s, _)| *s == side)
                        .map(|(_, player)| player.name().to_string())
                        .unwrap_or_default()
                };
                let game = PickupGame {
                    game_id,
                    created: Utc::now(),
                    started: None,
                    ended: None,
                    red_captain: captain(Side::Red),
                    blue_captain: captain(Side::Blue),
                    red_team: names(&red),
                    blue_team: names(&blue),
                    subs: Vec::new(),
                    no_shows: Vec::new(),
                };
                self.store.save_game(&game).await
            }
            StoreOp::GameStarted {
                game_id,
                at,
                players,
            } => {
                let mut game = self
                    .store
                    .find_game(&game_id)
                    .await?
                    .ok_or(StoreError::Missing("pickup game"))?;
                game.started = Some(at);
                self.store.save_game(&game).await?;
                for player in &players {
                    self.store.increment(player, Counter::GamesStarted).await?;
                    self.store.set_last_played(player, at).await?;
                }
                Ok(())
            }
            StoreOp::GameEnded {
                game_id,
                at,
                red,
                blue,
                subs,
                no_shows,
            } => {
                let mut game = self
                    .store
                    .find_game(&game_id)
                    .await?
                    .ok_or(StoreError::Missing("pickup game"))?;
                game.ended = Some(at);
                game.red_team = names(&red);
                game.blue_team = names(&blue);
                game.subs = subs;
                game.no_shows = no_shows;
                self.store.save_game(&game).await?;
                for player in red.iter().chain(blue.iter()) {
                    self.store.increment(player, Counter::GamesFinished).await?;
                }
                Ok(())
            }
            StoreOp::SubUsed(player) => {
                let used = self.store.increment(&player, Counter::SubsUsed).await?;
                debug!("{} has used {} substitutions", player, used);
                Ok(())
            }
            StoreOp::RemoveBan(player) => self.store.remove_ban(&player).await,
            StoreOp::ClearNoShows(player) => {
                self.store.reset_counter(&player, Counter::NoShows).await
            }
            StoreOp::ClearSubsUsed(player) => {
                self.store.reset_counter(&player, Counter::SubsUsed).await
            }
        }
    }

    /// Shows the `distance`-th most recent pickup game to the requester.
    async fn last_games(&self, requester: &PlayerId, distance: usize) {
        let games = match self.store.recent_games(distance).await {
            Ok(games) => games,
            Err(why) => {
                error!("Could not read the pickup history: {:?}", why);
                self.sink
                    .whisper(requester, "The pickup history is unavailable right now.");
                return;
            }
        };

        match games.get(distance.saturating_sub(1)) {
            Some(game) => {
                let response = format!(
                    "Pickup {} [{} ago] Red: {} | Blue: {}",
                    game.game_id,
                    ago(game.created, Utc::now()),
                    game.red_team.iter().join(", "),
                    game.blue_team.iter().join(", ")
                );
                self.sink.whisper(requester, &response);
            }
            None if distance <= 1 => self.sink.whisper(requester, "No pickup games to show."),
            None => {
                warn!("{} asked for pickup #{} of {}", requester, distance, games.len());
                self.sink.whisper(
                    requester,
                    &format!("There haven't been up to {} pickups so far.", distance),
                )
            }
        }
    }
}

fn names(players: &[PlayerId]) -> Vec<String> {
    players.iter().map(|p| p.name().to_string()).collect()
}

fn ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(then);
    if elapsed.num_days() > 0 {
        format!("{}d {}h", elapsed.num_days(), elapsed.num_hours() % 24)
    } else if elapsed.num_hours() > 0 {
        format!("{}h {}m", elapsed.num_hours(), elapsed.num_minutes() % 60)
    } else {
        format!("{}m", elapsed.num_minutes().max(0))
    }
}
