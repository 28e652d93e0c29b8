use chrono::Utc;
use itertools::Itertools;
use nanoid::nanoid;
use rand::{rngs::StdRng, seq::IteratorRandom, Rng, SeedableRng};
use std::{collections::HashMap, time::Duration};
use tracing::{debug, info, warn};

use super::{
    captains::{PickSuccess, PickupCaptains, PostSetCaptainAction},
    effect::{Effect, Offence, StoreOp},
    event::{GameState, PickupEvent, TimerKind},
    player::PlayerId,
    players::{AddOutcome, PickupPlayers},
    session::{Phase, Session},
    team::{Side, Team},
};
use crate::{
    common::privilege::PrivilegeLevel,
    config::PickupConfig,
    db::model::{BanOrigin, BanRecord},
    error::PickupErr,
    roster::RosterSnapshot,
};

/// Store lookups the runtime performs before handing an event to the manager,
/// so that the manager itself never awaits.
#[derive(Debug, Clone, Default)]
pub struct Lookup {
    /// Privilege of the player issuing a session-level command
    pub requester_level: PrivilegeLevel,
    /// Ban held by the subject of the event (the `unban` target, or a player signing up)
    pub ban: Option<BanRecord>,
}

/// Owns the pickup session and turns every [`PickupEvent`] into a list of [`Effect`]s.
///
/// Events are handled one at a time to completion. Nothing here blocks or
/// performs I/O; the caller dispatches the returned effects in order.
pub struct PickupManager {
    config: PickupConfig,
    session: Session,
    /// Last game state reported by the server
    server: GameState,
    generations: HashMap<TimerKind, u64>,
    rng: StdRng,
}

impl PickupManager {
    pub fn new(config: PickupConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_rng(config: PickupConfig, rng: StdRng) -> Self {
        PickupManager {
            session: Session::new(config.teamsize),
            config,
            server: GameState::Warmup,
            generations: HashMap::new(),
            rng,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &PickupConfig {
        &self.config
    }

    /// Picks and sign-up resets are only allowed while the server is in warm-up.
    pub fn game_live(&self) -> bool {
        matches!(self.server, GameState::Countdown | GameState::InProgress)
    }

    pub fn handle(
        &mut self,
        event: PickupEvent,
        roster: &dyn RosterSnapshot,
        lookup: &Lookup,
    ) -> Vec<Effect> {
        let mut fx = Vec::new();
        match event {
            PickupEvent::Start { requester } => {
                let result = self.eval_start(&requester, roster, lookup, &mut fx);
                reject(&mut fx, &requester, result);
            }
            PickupEvent::Stop { requester } => {
                let result = self.eval_stop(&requester, lookup, &mut fx);
                reject(&mut fx, &requester, result);
            }
            PickupEvent::Reset { requester } => {
                let result = self.eval_reset(&requester, roster, lookup, &mut fx);
                reject(&mut fx, &requester, result);
            }
            PickupEvent::Unban { requester, target } => {
                let result = self.eval_unban(&requester, &target, lookup, &mut fx);
                reject(&mut fx, &requester, result);
            }
            PickupEvent::PlayerJoined(player) => {
                let result = self.add(&player, roster, lookup, &mut fx);
                reject(&mut fx, &player, result);
            }
            PickupEvent::PlayerLeft(player) => {
                let result = PickupPlayers::new(&mut self.session, &mut fx, roster).remove(&player);
                reject(&mut fx, &player, result);
            }
            PickupEvent::CaptainVolunteered(player) => {
                let result = self.volunteer(&player, &mut fx);
                reject(&mut fx, &player, result);
            }
            PickupEvent::PickMade { captain, target } => {
                let result = self.pick(&captain, &target, &mut fx);
                reject(&mut fx, &captain, result);
            }
            PickupEvent::SubRequested { requester, incoming } => {
                let result = PickupPlayers::new(&mut self.session, &mut fx, roster)
                    .request_sub(&requester, &incoming);
                reject(&mut fx, &requester, result);
            }
            PickupEvent::PlayerDeparted {
                player,
                was_on_team,
                team,
            } => self.on_player_departed(&player, was_on_team, team, roster, &mut fx),
            PickupEvent::PlayerJoinedTeam { player, team } => {
                self.on_player_joined_team(&player, team, &mut fx)
            }
            PickupEvent::GameStateChanged(state) => self.on_game_state(state, &mut fx),
            PickupEvent::TimerFired { kind, generation } => {
                self.on_timer(kind, generation, roster, &mut fx)
            }
        }
        fx
    }

    fn authorize(&self, lookup: &Lookup) -> Result<(), PickupErr> {
        if lookup.requester_level < self.config.manage_level {
            return Err(PickupErr::Unauthorized);
        }
        Ok(())
    }

    fn eval_start(
        &mut self,
        requester: &PlayerId,
        roster: &dyn RosterSnapshot,
        lookup: &Lookup,
        fx: &mut Vec<Effect>,
    ) -> Result<(), PickupErr> {
        self.authorize(lookup)?;
        if !roster.is_team_based_mode() {
            return Err(PickupErr::NotTeamMode);
        }
        if self.game_live() {
            return Err(PickupErr::GameInProgress);
        }
        if self.session.phase.is_pending() {
            return Err(PickupErr::AlreadyPending);
        }
        info!("{} started a pickup", requester);
        self.start_pre_game(roster, fx);
        Ok(())
    }

    fn eval_stop(
        &mut self,
        requester: &PlayerId,
        lookup: &Lookup,
        fx: &mut Vec<Effect>,
    ) -> Result<(), PickupErr> {
        self.authorize(lookup)?;
        if self.game_live() {
            return Err(PickupErr::GameInProgress);
        }
        if self.session.phase == Phase::Idle {
            return Err(PickupErr::NoPickup);
        }
        info!("{} stopped the pickup", requester);
        self.reset_session(fx);
        fx.push(Effect::UnlockTeams(None));
        fx.push(Effect::announce(format!(
            "The pickup was stopped by {}.",
            requester
        )));
        Ok(())
    }

    fn eval_reset(
        &mut self,
        requester: &PlayerId,
        roster: &dyn RosterSnapshot,
        lookup: &Lookup,
        fx: &mut Vec<Effect>,
    ) -> Result<(), PickupErr> {
        self.authorize(lookup)?;
        if self.game_live() {
            return Err(PickupErr::GameInProgress);
        }
        if !roster.is_team_based_mode() {
            return Err(PickupErr::NotTeamMode);
        }
        info!("{} reset the pickup", requester);
        self.reset_session(fx);
        fx.push(Effect::UnlockTeams(None));
        self.start_pre_game(roster, fx);
        Ok(())
    }

    fn eval_unban(
        &mut self,
        requester: &PlayerId,
        target: &PlayerId,
        lookup: &Lookup,
        fx: &mut Vec<Effect>,
    ) -> Result<(), PickupErr> {
        self.authorize(lookup)?;
        let ban = lookup
            .ban
            .as_ref()
            .ok_or_else(|| PickupErr::NotBanned(target.clone()))?;

        match ban.origin {
            BanOrigin::PickupNoShow => {
                fx.push(Effect::Persist(StoreOp::RemoveBan(target.clone())));
                fx.push(Effect::Persist(StoreOp::ClearNoShows(target.clone())));
            }
            BanOrigin::PickupSub => {
                fx.push(Effect::Persist(StoreOp::RemoveBan(target.clone())));
                fx.push(Effect::Persist(StoreOp::ClearSubsUsed(target.clone())));
            }
            // the general ban-removal path, open to full admins only
            BanOrigin::Admin | BanOrigin::OtherModule => {
                if lookup.requester_level < PrivilegeLevel::Admin {
                    return Err(PickupErr::NotPickupBan(target.clone()));
                }
                fx.push(Effect::Persist(StoreOp::RemoveBan(target.clone())));
            }
        }
        info!("{} lifted the {:?} ban on {}", requester, ban.origin, target);
        fx.push(Effect::whisper(requester, format!("{} has been unbanned.", target)));
        Ok(())
    }

    fn add(
        &mut self,
        player: &PlayerId,
        roster: &dyn RosterSnapshot,
        lookup: &Lookup,
        fx: &mut Vec<Effect>,
    ) -> Result<(), PickupErr> {
        if let Some(ban) = lookup.ban.as_ref().filter(|ban| ban.is_active(Utc::now())) {
            return Err(PickupErr::Banned(
                ban.expires.format("%Y-%m-%d %H:%M UTC").to_string(),
            ));
        }
        let outcome = PickupPlayers::new(&mut self.session, fx, roster).add(player)?;
        if outcome == AddOutcome::ReadyForCaptains {
            self.begin_captain_selection(fx);
        }
        Ok(())
    }

    fn volunteer(&mut self, player: &PlayerId, fx: &mut Vec<Effect>) -> Result<(), PickupErr> {
        let live = self.game_live();
        let action = PickupCaptains::new(&mut self.session, fx, live).volunteer(player)?;
        if action == PostSetCaptainAction::StartPicking {
            self.begin_team_selection(fx);
        }
        Ok(())
    }

    fn pick(
        &mut self,
        captain: &PlayerId,
        target: &PlayerId,
        fx: &mut Vec<Effect>,
    ) -> Result<(), PickupErr> {
        let live = self.game_live();
        let result = PickupCaptains::new(&mut self.session, fx, live).pick(captain, target)?;
        if result == PickSuccess::Complete {
            self.lineup_complete(fx);
        }
        Ok(())
    }

    /// (Re)initialises the session and opens sign-ups.
    fn start_pre_game(&mut self, roster: &dyn RosterSnapshot, fx: &mut Vec<Effect>) {
        self.reset_session(fx);
        self.session.phase = Phase::PreGame { lineup_set: false };
        fx.push(Effect::LockTeams);
        for team in [Team::Red, Team::Blue] {
            for player in roster.members_of(team) {
                fx.push(Effect::move_player(&player, Team::Spectator));
                self.session.locking.insert(player);
            }
        }
        let teamsize = self.session.teamsize;
        fx.push(Effect::CallVote(format!("teamsize {}", teamsize)));
        fx.push(Effect::announce(format!(
            "A {0}v{0} pickup is being set up. Type !add to sign up, captains are chosen once {1} players have joined.",
            teamsize,
            teamsize * 2
        )));
    }

    /// Tears the session down. Safe to call any number of times.
    fn reset_session(&mut self, fx: &mut Vec<Effect>) {
        self.cancel_timer(TimerKind::CaptainSelection, fx);
        self.cancel_timer(TimerKind::AutoReset, fx);
        self.session.reset();
    }

    /// Cancels the session because something it depends on went away.
    fn abort(&mut self, reason: String, fx: &mut Vec<Effect>) {
        warn!("Pickup aborted: {}", reason);
        self.reset_session(fx);
        fx.push(Effect::UnlockTeams(None));
        fx.push(Effect::announce(&reason));
        fx.push(Effect::NotifyPrivileged(format!(
            "{} Use !pickup start or !pickup reset to recover.",
            reason
        )));
    }

    fn arm_timer(&mut self, kind: TimerKind, delay: Duration, fx: &mut Vec<Effect>) {
        let generation = self.bump(kind);
        fx.push(Effect::ArmTimer {
            kind,
            generation,
            delay,
        });
    }

    fn cancel_timer(&mut self, kind: TimerKind, fx: &mut Vec<Effect>) {
        self.bump(kind);
        fx.push(Effect::CancelTimer(kind));
    }

    fn bump(&mut self, kind: TimerKind) -> u64 {
        let generation = self.generations.entry(kind).or_insert(0);
        *generation += 1;
        *generation
    }

    fn begin_captain_selection(&mut self, fx: &mut Vec<Effect>) {
        info!("Enough sign-ups, starting captain selection");
        self.session.phase = Phase::CaptainSelection;
        self.arm_timer(TimerKind::CaptainSelection, self.config.captain_wait, fx);
        fx.push(Effect::announce(format!(
            "The pickup is full! Type !cap within {} seconds to volunteer as captain, otherwise captains are picked at random.",
            self.config.captain_wait.as_secs()
        )));
    }

    fn begin_team_selection(&mut self, fx: &mut Vec<Effect>) {
        self.cancel_timer(TimerKind::CaptainSelection, fx);
        self.session.phase = Phase::TeamSelection;
        let first = if self.rng.gen_bool(0.5) {
            Side::Red
        } else {
            Side::Blue
        };
        PickupCaptains::new(&mut self.session, fx, false).start_picking(first);

        // captains alone can fill one-player teams
        if self.session.teams_full() {
            self.session.turn = None;
            self.lineup_complete(fx);
        }
    }

    fn on_captain_timer(&mut self, fx: &mut Vec<Effect>) {
        if self.session.phase != Phase::CaptainSelection {
            return;
        }
        let eligible = self.session.available.len() + self.session.captain_count();
        if eligible < 2 {
            self.abort(
                "Not enough players are left to pick captains. The pickup has been cancelled."
                    .to_string(),
                fx,
            );
            return;
        }

        for side in Side::BOTH {
            if self.session.captains[side].is_some() {
                continue;
            }
            let choice = self
                .session
                .available
                .iter()
                .choose(&mut self.rng)
                .cloned();
            if let Some(captain) = choice {
                info!("Randomly assigned {} as {} captain", captain, side);
                PickupCaptains::new(&mut self.session, fx, false).set_captain(&captain, side, false);
            }
        }
        self.begin_team_selection(fx);
    }

    fn lineup_complete(&mut self, fx: &mut Vec<Effect>) {
        let (red_captain, blue_captain) = match (
            self.session.captains[Side::Red].clone(),
            self.session.captains[Side::Blue].clone(),
        ) {
            (Some(red), Some(blue)) => (red, blue),
            _ => {
                self.abort(
                    "A captain went missing before the teams were set. The pickup has been cancelled."
                        .to_string(),
                    fx,
                );
                return;
            }
        };

        let game_id = nanoid!();
        let red: Vec<PlayerId> = self.session.lineup[Side::Red].iter().cloned().collect();
        let blue: Vec<PlayerId> = self.session.lineup[Side::Blue].iter().cloned().collect();
        fx.push(Effect::announce(format!(
            "Teams are set! Red: {} | Blue: {}. Ready up, the pickup starts with the next game.",
            red.iter().join(", "),
            blue.iter().join(", ")
        )));
        fx.push(Effect::Persist(StoreOp::SaveLineup {
            game_id: game_id.clone(),
            captains: [(Side::Red, red_captain), (Side::Blue, blue_captain)],
            red,
            blue,
        }));
        info!("Pickup {} line-up is set", game_id);
        self.session.game_id = Some(game_id);
        self.session.phase = Phase::PreGame { lineup_set: true };
    }

    fn on_game_state(&mut self, state: GameState, fx: &mut Vec<Effect>) {
        debug!("Game state {:?} -> {:?}", self.server, state);
        self.server = state;
        match state {
            GameState::Countdown => {
                if self.session.phase.is_pre_game()
                    && self.session.phase != (Phase::PreGame { lineup_set: true })
                {
                    fx.push(Effect::announce(
                        "The game is about to start but the pickup teams are not set. The pickup will be cancelled if it goes live.",
                    ));
                }
            }
            GameState::InProgress => self.on_game_launch(fx),
            GameState::Warmup | GameState::ScoreOrTimeLimitHit | GameState::IntermissionStart => {
                if self.session.phase == Phase::InProgress {
                    self.on_game_end(fx);
                }
            }
        }
    }

    fn on_game_launch(&mut self, fx: &mut Vec<Effect>) {
        match self.session.phase {
            Phase::PreGame { lineup_set: true } => {
                let unpicked = std::mem::take(&mut self.session.available);
                for player in unpicked {
                    self.session.sub_candidates.insert(player);
                }
                self.session.locking.clear();
                self.session.phase = Phase::InProgress;

                let players: Vec<PlayerId> = self.session.lineup_players().cloned().collect();
                if let Some(game_id) = self.session.game_id.clone() {
                    info!("Pickup {} is live", game_id);
                    fx.push(Effect::Persist(StoreOp::GameStarted {
                        game_id,
                        at: Utc::now(),
                        players,
                    }));
                }
                fx.push(Effect::announce(
                    "The pickup game is live! Type !add to be listed as a substitute.",
                ));
            }
            phase if phase.is_pre_game() => self.abort(
                "The game went live before the pickup teams were set. The pickup has been cancelled."
                    .to_string(),
                fx,
            ),
            _ => {}
        }
    }

    fn on_game_end(&mut self, fx: &mut Vec<Effect>) {
        if let Some(game_id) = self.session.game_id.clone() {
            info!("Pickup {} is over", game_id);
            fx.push(Effect::Persist(StoreOp::GameEnded {
                game_id,
                at: Utc::now(),
                red: self.session.lineup[Side::Red].iter().cloned().collect(),
                blue: self.session.lineup[Side::Blue].iter().cloned().collect(),
                subs: self.session.subs_log.clone(),
                no_shows: self.session.no_shows_log.clone(),
            }));
        }
        self.session.phase = Phase::Intermission;
        fx.push(Effect::UnlockTeams(None));
        self.arm_timer(TimerKind::AutoReset, self.config.reset_delay, fx);
        fx.push(Effect::announce(format!(
            "The pickup game is over. Sign-ups reopen in {} seconds.",
            self.config.reset_delay.as_secs()
        )));
    }

    fn on_timer(
        &mut self,
        kind: TimerKind,
        generation: u64,
        roster: &dyn RosterSnapshot,
        fx: &mut Vec<Effect>,
    ) {
        let current = self.generations.get(&kind).copied().unwrap_or(0);
        if generation != current {
            debug!(
                "Ignoring stale {:?} timer (generation {}, current {})",
                kind, generation, current
            );
            return;
        }
        match kind {
            TimerKind::CaptainSelection => self.on_captain_timer(fx),
            TimerKind::AutoReset => {
                info!("Reopening sign-ups after the last pickup game");
                self.start_pre_game(roster, fx);
            }
        }
    }

    fn on_player_departed(
        &mut self,
        player: &PlayerId,
        was_on_team: bool,
        team: Team,
        roster: &dyn RosterSnapshot,
        fx: &mut Vec<Effect>,
    ) {
        // moves the manager made itself while setting up, unless the player disconnected
        let was_on_team = if was_on_team && self.session.locking.remove(player) {
            if roster.team_of(player).is_some() {
                return;
            }
            false
        } else {
            was_on_team
        };

        match self.session.phase {
            Phase::Idle | Phase::Intermission => {}
            Phase::CaptainSelection => {
                if self.session.is_captain(player) {
                    self.abort(
                        format!(
                            "Captain {} left during captain selection. The pickup has been cancelled.",
                            player
                        ),
                        fx,
                    );
                } else if self.session.available.remove(player) {
                    fx.push(Effect::announce(format!(
                        "{} left the pickup. {}/{} players.",
                        player,
                        self.session.available.len() + self.session.captain_count(),
                        self.session.teamsize * 2
                    )));
                }
            }
            Phase::TeamSelection => {
                if self.session.is_captain(player) {
                    self.abort(
                        format!(
                            "Captain {} left during team selection. The pickup has been cancelled.",
                            player
                        ),
                        fx,
                    );
                } else if let Some(side) = self.session.lineup_side(player) {
                    self.session.lineup[side].remove(player);
                    info!("{} left {} during team selection", player, side);
                    fx.push(Effect::announce(format!(
                        "{} left {} after being picked. The spot is open again.",
                        player, side
                    )));
                    self.warn_short_of_players(fx);
                } else if self.session.available.remove(player) {
                    fx.push(Effect::announce(format!("{} left before being picked.", player)));
                    self.warn_short_of_players(fx);
                }
            }
            Phase::PreGame { .. } | Phase::InProgress => {
                if !was_on_team {
                    self.session.remove_from_pools(player);
                } else if let Some(side) = self.session.lineup_side(player) {
                    self.record_no_show(player, side, fx);
                } else if self.session.successful_subs.contains(player) {
                    debug!("{} left {} after being substituted", player, team);
                    fx.push(Effect::Punish {
                        player: player.clone(),
                        offence: Offence::ExcessSubs,
                    });
                }
            }
        }
    }

    fn warn_short_of_players(&self, fx: &mut Vec<Effect>) {
        let open = self.session.open_slots();
        let left = self.session.available.len();
        if left < open {
            fx.push(Effect::announce(format!(
                "Only {} players remain for {} open spots. The pickup may need to be cancelled.",
                left, open
            )));
        }
    }

    fn record_no_show(&mut self, player: &PlayerId, side: Side, fx: &mut Vec<Effect>) {
        info!("{} left {} without a substitute", player, side);
        self.session.lineup[side].remove(player);
        self.session.no_shows_log.push(format!("{} ({})", player, side));
        if matches!(
            self.session.phase,
            Phase::InProgress | Phase::PreGame { lineup_set: true }
        ) {
            self.session.missing[side] += 1;
        }
        fx.push(Effect::UnlockTeams(Some(side)));
        fx.push(Effect::announce(format!(
            "{} left {} without a substitute. The {} team is unlocked so a listed substitute can join.",
            player, side, side
        )));
        fx.push(Effect::Punish {
            player: player.clone(),
            offence: Offence::NoShow,
        });
    }

    fn on_player_joined_team(&mut self, player: &PlayerId, team: Team, fx: &mut Vec<Effect>) {
        let side = match team.side() {
            Some(side) => side,
            None => return,
        };
        if !matches!(
            self.session.phase,
            Phase::InProgress | Phase::PreGame { lineup_set: true }
        ) {
            return;
        }

        match self.session.lineup_side(player) {
            Some(placed) if placed == side => return,
            Some(placed) => {
                fx.push(Effect::move_player(player, placed.into()));
                return;
            }
            None => {}
        }

        let listed =
            self.session.sub_candidates.contains(player) || self.session.available.contains(player);
        if self.session.missing[side] > 0 && listed {
            self.session.missing[side] -= 1;
            self.session.place(player.clone(), side);
            self.session
                .subs_log
                .push(format!("{} filled an open spot ({})", player, side));
            fx.push(Effect::announce(format!(
                "{} fills the open spot on {}.",
                player, side
            )));
            if Side::BOTH.iter().all(|s| self.session.missing[*s] == 0) {
                fx.push(Effect::LockTeams);
            }
        } else {
            fx.push(Effect::move_player(player, Team::Spectator));
            fx.push(Effect::whisper(
                player,
                "Only pickup players can join a team right now. Type !add to be listed as a substitute.",
            ));
        }
    }
}

fn reject(fx: &mut Vec<Effect>, requester: &PlayerId, result: Result<(), PickupErr>) {
    if let Err(err) = result {
        debug!("Rejected request from {}: {:?}", requester, err);
        fx.push(Effect::whisper(requester, err));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::SharedRoster;
    use chrono::Duration as ChronoDuration;

    fn player(name: &str) -> PlayerId {
        PlayerId::new(name)
    }

    fn manager(teamsize: usize) -> PickupManager {
        let config = PickupConfig {
            teamsize,
            ..PickupConfig::default()
        };
        PickupManager::with_rng(config, StdRng::seed_from_u64(7))
    }

    fn owner() -> Lookup {
        Lookup {
            requester_level: PrivilegeLevel::Owner,
            ban: None,
        }
    }

    fn ban(origin: BanOrigin, target: &str) -> Option<BanRecord> {
        let issued = Utc::now();
        Some(BanRecord {
            player: target.to_string(),
            origin,
            issued,
            expires: issued + ChronoDuration::hours(3),
        })
    }

    fn armed(fx: &[Effect], wanted: TimerKind) -> Option<u64> {
        fx.iter().find_map(|effect| match effect {
            Effect::ArmTimer {
                kind, generation, ..
            } if *kind == wanted => Some(*generation),
            _ => None,
        })
    }

    fn start(m: &mut PickupManager, roster: &SharedRoster) -> Vec<Effect> {
        m.handle(
            PickupEvent::Start {
                requester: player("admin"),
            },
            roster,
            &owner(),
        )
    }

    /// Signs players up and returns every effect produced along the way.
    fn sign_up(m: &mut PickupManager, roster: &SharedRoster, names: &[&str]) -> Vec<Effect> {
        names
            .iter()
            .flat_map(|name| {
                m.handle(
                    PickupEvent::PlayerJoined(player(name)),
                    roster,
                    &Lookup::default(),
                )
            })
            .collect()
    }

    fn pick_all(m: &mut PickupManager, roster: &SharedRoster) {
        while m.session().phase == Phase::TeamSelection {
            let side = m.session().turn.expect("a side should be picking");
            let captain = m.session().captains[side].clone().unwrap();
            let target = m.session().available.iter().next().cloned().unwrap();
            m.handle(
                PickupEvent::PickMade { captain, target },
                roster,
                &Lookup::default(),
            );
        }
    }

    /// A 2v2 pickup with its line-up set, waiting for the game to go live.
    fn picked(roster: &SharedRoster) -> PickupManager {
        let mut m = manager(2);
        start(&mut m, roster);
        sign_up(&mut m, roster, &["anarki", "bones", "crash", "doom"]);
        for name in ["anarki", "bones"] {
            m.handle(
                PickupEvent::CaptainVolunteered(player(name)),
                roster,
                &Lookup::default(),
            );
        }
        pick_all(&mut m, roster);
        m
    }

    fn live(roster: &SharedRoster) -> PickupManager {
        let mut m = picked(roster);
        m.handle(
            PickupEvent::GameStateChanged(GameState::InProgress),
            roster,
            &Lookup::default(),
        );
        m
    }

    #[test]
    fn start_requires_privilege_and_team_mode() {
        let roster = SharedRoster::new(true);
        let mut m = manager(4);

        let fx = m.handle(
            PickupEvent::Start {
                requester: player("grunt"),
            },
            &roster,
            &Lookup::default(),
        );
        assert_eq!(fx, vec![Effect::whisper(&player("grunt"), PickupErr::Unauthorized)]);
        assert_eq!(m.session().phase, Phase::Idle);

        roster.set_team_mode(false);
        let fx = start(&mut m, &roster);
        assert_eq!(fx, vec![Effect::whisper(&player("admin"), PickupErr::NotTeamMode)]);
    }

    #[test]
    fn start_clears_the_teams_and_ignores_its_own_moves() {
        let roster = SharedRoster::new(true);
        roster.set_team(player("keel"), Team::Red);
        let mut m = manager(4);

        let fx = start(&mut m, &roster);
        assert_eq!(m.session().phase, Phase::PreGame { lineup_set: false });
        assert!(fx.contains(&Effect::LockTeams));
        assert!(fx.contains(&Effect::move_player(&player("keel"), Team::Spectator)));
        assert!(fx.contains(&Effect::CallVote("teamsize 4".to_string())));

        let fx = m.handle(
            PickupEvent::PlayerDeparted {
                player: player("keel"),
                was_on_team: true,
                team: Team::Red,
            },
            &roster,
            &Lookup::default(),
        );
        assert!(fx.is_empty());
        assert!(m.session().locking.is_empty());

        let fx = start(&mut m, &roster);
        assert_eq!(fx, vec![Effect::whisper(&player("admin"), PickupErr::AlreadyPending)]);
    }

    #[test]
    fn captain_timer_is_armed_once_for_a_full_pickup() {
        let roster = SharedRoster::new(true);
        let mut m = manager(4);
        start(&mut m, &roster);

        let fx = sign_up(
            &mut m,
            &roster,
            &["a", "b", "c", "d", "e", "f", "g", "h", "i"],
        );
        let arms = fx
            .iter()
            .filter(|effect| matches!(effect, Effect::ArmTimer { .. }))
            .count();
        assert_eq!(arms, 1);
        assert_eq!(m.session().phase, Phase::CaptainSelection);
        assert_eq!(m.session().available.len(), 9);
    }

    #[test]
    fn expired_captain_timer_assigns_random_captains() {
        let roster = SharedRoster::new(true);
        let mut m = manager(2);
        start(&mut m, &roster);
        roster.set_team(player("lurker"), Team::Spectator);
        let fx = sign_up(&mut m, &roster, &["a", "b", "c", "d"]);
        let generation = armed(&fx, TimerKind::CaptainSelection).unwrap();
        let pool: Vec<PlayerId> = m.session().available.iter().cloned().collect();

        let fx = m.handle(
            PickupEvent::TimerFired {
                kind: TimerKind::CaptainSelection,
                generation,
            },
            &roster,
            &Lookup::default(),
        );

        assert_eq!(m.session().phase, Phase::TeamSelection);
        assert_eq!(m.session().captain_count(), 2);
        assert_eq!(m.session().available.len(), 2);
        assert!(m.session().turn.is_some());
        for side in Side::BOTH {
            let captain = m.session().captains[side].clone().unwrap();
            assert!(pool.contains(&captain));
            assert!(!m.session().available.contains(&captain));
            assert!(fx.contains(&Effect::move_player(&captain, side.into())));
        }
        assert_ne!(
            m.session().captains[Side::Red],
            m.session().captains[Side::Blue]
        );
    }

    #[test]
    fn captain_timer_cancels_when_too_few_players_remain() {
        let roster = SharedRoster::new(true);
        let mut m = manager(1);
        start(&mut m, &roster);
        let fx = sign_up(&mut m, &roster, &["a", "b"]);
        let generation = armed(&fx, TimerKind::CaptainSelection).unwrap();
        m.handle(PickupEvent::PlayerLeft(player("b")), &roster, &Lookup::default());

        let fx = m.handle(
            PickupEvent::TimerFired {
                kind: TimerKind::CaptainSelection,
                generation,
            },
            &roster,
            &Lookup::default(),
        );

        assert_eq!(m.session().phase, Phase::Idle);
        assert!(fx.contains(&Effect::UnlockTeams(None)));
        assert!(fx
            .iter()
            .any(|effect| matches!(effect, Effect::NotifyPrivileged(_))));
    }

    #[test]
    fn stale_captain_timer_is_ignored_after_stop() {
        let roster = SharedRoster::new(true);
        let mut m = manager(1);
        start(&mut m, &roster);
        let fx = sign_up(&mut m, &roster, &["a", "b"]);
        let stale = armed(&fx, TimerKind::CaptainSelection).unwrap();

        let fx = m.handle(
            PickupEvent::Stop {
                requester: player("admin"),
            },
            &roster,
            &owner(),
        );
        assert!(fx.contains(&Effect::CancelTimer(TimerKind::CaptainSelection)));

        start(&mut m, &roster);
        let fx = sign_up(&mut m, &roster, &["a", "b"]);
        let current = armed(&fx, TimerKind::CaptainSelection).unwrap();
        assert_ne!(stale, current);

        let fx = m.handle(
            PickupEvent::TimerFired {
                kind: TimerKind::CaptainSelection,
                generation: stale,
            },
            &roster,
            &Lookup::default(),
        );
        assert!(fx.is_empty());
        assert_eq!(m.session().phase, Phase::CaptainSelection);
    }

    #[test]
    fn two_volunteers_start_team_selection_immediately() {
        let roster = SharedRoster::new(true);
        let mut m = manager(2);
        start(&mut m, &roster);
        let fx = sign_up(&mut m, &roster, &["a", "b", "c", "d"]);
        let generation = armed(&fx, TimerKind::CaptainSelection).unwrap();

        m.handle(PickupEvent::CaptainVolunteered(player("c")), &roster, &Lookup::default());
        let fx = m.handle(PickupEvent::CaptainVolunteered(player("a")), &roster, &Lookup::default());

        assert!(fx.contains(&Effect::CancelTimer(TimerKind::CaptainSelection)));
        assert_eq!(m.session().phase, Phase::TeamSelection);
        assert_eq!(m.session().captains[Side::Red], Some(player("c")));

        let fx = m.handle(
            PickupEvent::TimerFired {
                kind: TimerKind::CaptainSelection,
                generation,
            },
            &roster,
            &Lookup::default(),
        );
        assert!(fx.is_empty());
    }

    #[test]
    fn completed_picks_set_the_lineup() {
        let roster = SharedRoster::new(true);
        let m = picked(&roster);

        assert_eq!(m.session().phase, Phase::PreGame { lineup_set: true });
        assert!(m.session().teams_full());
        assert!(m.session().game_id.is_some());
        assert!(m.session().available.is_empty());
    }

    #[test]
    fn launch_turns_leftover_sign_ups_into_substitutes() {
        let roster = SharedRoster::new(true);
        let mut m = picked(&roster);
        sign_up(&mut m, &roster, &["latecomer"]);
        assert!(m.session().available.contains(&player("latecomer")));

        let fx = m.handle(
            PickupEvent::GameStateChanged(GameState::InProgress),
            &roster,
            &Lookup::default(),
        );

        assert_eq!(m.session().phase, Phase::InProgress);
        assert!(m.session().available.is_empty());
        assert!(m.session().sub_candidates.contains(&player("latecomer")));
        assert!(fx.iter().any(|effect| matches!(
            effect,
            Effect::Persist(StoreOp::GameStarted { players, .. }) if players.len() == 4
        )));
    }

    #[test]
    fn launch_during_selection_cancels_the_pickup() {
        let roster = SharedRoster::new(true);
        let mut m = manager(2);
        start(&mut m, &roster);
        sign_up(&mut m, &roster, &["a", "b", "c"]);

        let fx = m.handle(
            PickupEvent::GameStateChanged(GameState::InProgress),
            &roster,
            &Lookup::default(),
        );

        assert_eq!(m.session().phase, Phase::Idle);
        assert!(fx.contains(&Effect::UnlockTeams(None)));
        assert!(fx.iter().any(|effect| matches!(
            effect,
            Effect::NotifyPrivileged(text)
                if text.contains("!pickup start") && text.contains("!pickup reset")
        )));
    }

    #[test]
    fn game_end_persists_and_schedules_a_reset() {
        let roster = SharedRoster::new(true);
        let mut m = live(&roster);

        let fx = m.handle(
            PickupEvent::GameStateChanged(GameState::ScoreOrTimeLimitHit),
            &roster,
            &Lookup::default(),
        );
        assert_eq!(m.session().phase, Phase::Intermission);
        assert!(fx
            .iter()
            .any(|effect| matches!(effect, Effect::Persist(StoreOp::GameEnded { .. }))));
        let generation = armed(&fx, TimerKind::AutoReset).unwrap();

        let leaver = m.session().lineup[Side::Red].iter().next().cloned().unwrap();
        let fx = m.handle(
            PickupEvent::PlayerDeparted {
                player: leaver,
                was_on_team: true,
                team: Team::Red,
            },
            &roster,
            &Lookup::default(),
        );
        assert!(fx.is_empty());

        m.handle(
            PickupEvent::GameStateChanged(GameState::Warmup),
            &roster,
            &Lookup::default(),
        );
        m.handle(
            PickupEvent::TimerFired {
                kind: TimerKind::AutoReset,
                generation,
            },
            &roster,
            &Lookup::default(),
        );
        assert_eq!(m.session().phase, Phase::PreGame { lineup_set: false });
        assert!(m.session().lineup_players().next().is_none());
    }

    #[test]
    fn stop_is_refused_while_the_game_is_live() {
        let roster = SharedRoster::new(true);
        let mut m = live(&roster);
        let fx = m.handle(
            PickupEvent::Stop {
                requester: player("admin"),
            },
            &roster,
            &owner(),
        );
        assert_eq!(fx, vec![Effect::whisper(&player("admin"), PickupErr::GameInProgress)]);
        assert_eq!(m.session().phase, Phase::InProgress);
    }

    #[test]
    fn leaving_mid_game_is_a_no_show_and_opens_the_spot() {
        let roster = SharedRoster::new(true);
        let mut m = live(&roster);
        sign_up(&mut m, &roster, &["ranger"]);
        let leaver = m.session().lineup[Side::Blue].iter().last().cloned().unwrap();

        let fx = m.handle(
            PickupEvent::PlayerDeparted {
                player: leaver.clone(),
                was_on_team: true,
                team: Team::Blue,
            },
            &roster,
            &Lookup::default(),
        );
        assert!(fx.contains(&Effect::UnlockTeams(Some(Side::Blue))));
        assert!(fx.contains(&Effect::Punish {
            player: leaver.clone(),
            offence: Offence::NoShow,
        }));
        assert_eq!(m.session().missing[Side::Blue], 1);
        assert_eq!(m.session().no_shows_log.len(), 1);

        let fx = m.handle(
            PickupEvent::PlayerJoinedTeam {
                player: player("stranger"),
                team: Team::Blue,
            },
            &roster,
            &Lookup::default(),
        );
        assert!(fx.contains(&Effect::move_player(&player("stranger"), Team::Spectator)));

        let fx = m.handle(
            PickupEvent::PlayerJoinedTeam {
                player: player("ranger"),
                team: Team::Blue,
            },
            &roster,
            &Lookup::default(),
        );
        assert!(fx.contains(&Effect::LockTeams));
        assert_eq!(m.session().missing[Side::Blue], 0);
        assert_eq!(m.session().lineup_side(&player("ranger")), Some(Side::Blue));
    }

    #[test]
    fn leaving_after_a_substitution_checks_sub_usage() {
        let roster = SharedRoster::new(true);
        let mut m = live(&roster);
        sign_up(&mut m, &roster, &["ranger"]);
        let outgoing = m.session().lineup[Side::Red].iter().last().cloned().unwrap();

        m.handle(
            PickupEvent::SubRequested {
                requester: outgoing.clone(),
                incoming: player("ranger"),
            },
            &roster,
            &Lookup::default(),
        );
        let fx = m.handle(
            PickupEvent::PlayerDeparted {
                player: outgoing.clone(),
                was_on_team: true,
                team: Team::Red,
            },
            &roster,
            &Lookup::default(),
        );

        assert_eq!(
            fx,
            vec![Effect::Punish {
                player: outgoing,
                offence: Offence::ExcessSubs,
            }]
        );
        assert_eq!(m.session().missing[Side::Red], 0);
    }

    #[test]
    fn abandoning_after_being_subbed_back_in_is_a_no_show() {
        let roster = SharedRoster::new(true);
        let mut m = live(&roster);
        sign_up(&mut m, &roster, &["ranger"]);
        let outgoing = m.session().lineup[Side::Red].iter().last().cloned().unwrap();

        m.handle(
            PickupEvent::SubRequested {
                requester: outgoing.clone(),
                incoming: player("ranger"),
            },
            &roster,
            &Lookup::default(),
        );
        sign_up(&mut m, &roster, &[outgoing.name()]);
        assert!(m.session().sub_candidates.contains(&outgoing));
        m.handle(
            PickupEvent::SubRequested {
                requester: player("ranger"),
                incoming: outgoing.clone(),
            },
            &roster,
            &Lookup::default(),
        );
        assert_eq!(m.session().lineup_side(&outgoing), Some(Side::Red));

        let fx = m.handle(
            PickupEvent::PlayerDeparted {
                player: outgoing.clone(),
                was_on_team: true,
                team: Team::Red,
            },
            &roster,
            &Lookup::default(),
        );

        assert!(fx.contains(&Effect::Punish {
            player: outgoing.clone(),
            offence: Offence::NoShow,
        }));
        assert!(fx.contains(&Effect::UnlockTeams(Some(Side::Red))));
        assert_eq!(m.session().missing[Side::Red], 1);
        assert_eq!(m.session().lineup_side(&outgoing), None);
        assert_eq!(m.session().no_shows_log.len(), 1);
    }

    #[test]
    fn picked_player_leaving_team_selection_frees_the_spot() {
        let roster = SharedRoster::new(true);
        let mut m = manager(2);
        start(&mut m, &roster);
        sign_up(&mut m, &roster, &["a", "b", "c", "d", "e"]);
        m.handle(PickupEvent::CaptainVolunteered(player("a")), &roster, &Lookup::default());
        m.handle(PickupEvent::CaptainVolunteered(player("b")), &roster, &Lookup::default());

        let side = m.session().turn.unwrap();
        let captain = m.session().captains[side].clone().unwrap();
        m.handle(
            PickupEvent::PickMade {
                captain,
                target: player("c"),
            },
            &roster,
            &Lookup::default(),
        );
        assert_eq!(m.session().lineup_side(&player("c")), Some(side));

        let fx = m.handle(
            PickupEvent::PlayerDeparted {
                player: player("c"),
                was_on_team: true,
                team: side.into(),
            },
            &roster,
            &Lookup::default(),
        );
        assert!(!fx.is_empty());
        assert_eq!(m.session().phase, Phase::TeamSelection);
        assert_eq!(m.session().lineup_side(&player("c")), None);
        assert_eq!(m.session().lineup[side].len(), 1);
        assert_eq!(m.session().open_slots(), 2);

        pick_all(&mut m, &roster);
        assert_eq!(m.session().phase, Phase::PreGame { lineup_set: true });
        assert!(m.session().teams_full());
        let lineup: Vec<PlayerId> = m.session().lineup_players().cloned().collect();
        assert_eq!(lineup.len(), 4);
        assert!(!lineup.contains(&player("c")));
    }

    #[test]
    fn disconnecting_while_being_cleared_from_a_team_drops_the_sign_up() {
        let roster = SharedRoster::new(true);
        roster.set_team(player("keel"), Team::Red);
        let mut m = manager(2);
        start(&mut m, &roster);
        sign_up(&mut m, &roster, &["keel"]);
        assert!(m.session().available.contains(&player("keel")));

        roster.remove(&player("keel"));
        m.handle(
            PickupEvent::PlayerDeparted {
                player: player("keel"),
                was_on_team: true,
                team: Team::Red,
            },
            &roster,
            &Lookup::default(),
        );

        assert!(m.session().locking.is_empty());
        assert!(!m.session().available.contains(&player("keel")));
        assert_eq!(m.session().phase, Phase::PreGame { lineup_set: false });
    }

    #[test]
    fn captain_leaving_team_selection_cancels_the_pickup() {
        let roster = SharedRoster::new(true);
        let mut m = manager(2);
        start(&mut m, &roster);
        sign_up(&mut m, &roster, &["a", "b", "c", "d"]);
        m.handle(PickupEvent::CaptainVolunteered(player("a")), &roster, &Lookup::default());
        m.handle(PickupEvent::CaptainVolunteered(player("b")), &roster, &Lookup::default());

        let fx = m.handle(
            PickupEvent::PlayerDeparted {
                player: player("b"),
                was_on_team: true,
                team: Team::Blue,
            },
            &roster,
            &Lookup::default(),
        );
        assert_eq!(m.session().phase, Phase::Idle);
        assert!(fx.contains(&Effect::UnlockTeams(None)));
    }

    #[test]
    fn unpicked_player_leaving_warns_when_too_few_remain() {
        let roster = SharedRoster::new(true);
        let mut m = manager(2);
        start(&mut m, &roster);
        sign_up(&mut m, &roster, &["a", "b", "c", "d"]);
        m.handle(PickupEvent::CaptainVolunteered(player("a")), &roster, &Lookup::default());
        m.handle(PickupEvent::CaptainVolunteered(player("b")), &roster, &Lookup::default());

        let fx = m.handle(
            PickupEvent::PlayerDeparted {
                player: player("d"),
                was_on_team: false,
                team: Team::Spectator,
            },
            &roster,
            &Lookup::default(),
        );
        assert_eq!(m.session().phase, Phase::TeamSelection);
        assert!(!m.session().available.contains(&player("d")));
        assert!(fx.contains(&Effect::announce(
            "Only 1 players remain for 2 open spots. The pickup may need to be cancelled."
        )));
    }

    #[test]
    fn admin_bans_can_only_be_lifted_by_admins() {
        let roster = SharedRoster::new(true);
        let mut m = manager(4);
        let unban = || PickupEvent::Unban {
            requester: player("mod"),
            target: player("visor"),
        };
        let superuser = Lookup {
            requester_level: PrivilegeLevel::SuperUser,
            ban: ban(BanOrigin::Admin, "visor"),
        };

        let fx = m.handle(unban(), &roster, &superuser);
        assert_eq!(
            fx,
            vec![Effect::whisper(
                &player("mod"),
                PickupErr::NotPickupBan(player("visor"))
            )]
        );

        let admin = Lookup {
            requester_level: PrivilegeLevel::Admin,
            ..superuser
        };
        let fx = m.handle(unban(), &roster, &admin);
        assert!(fx.contains(&Effect::Persist(StoreOp::RemoveBan(player("visor")))));
    }

    #[test]
    fn pickup_bans_are_lifted_with_their_counter() {
        let roster = SharedRoster::new(true);
        let mut m = manager(4);
        let lookup = Lookup {
            requester_level: PrivilegeLevel::SuperUser,
            ban: ban(BanOrigin::PickupNoShow, "visor"),
        };

        let fx = m.handle(
            PickupEvent::Unban {
                requester: player("mod"),
                target: player("visor"),
            },
            &roster,
            &lookup,
        );
        assert!(fx.contains(&Effect::Persist(StoreOp::RemoveBan(player("visor")))));
        assert!(fx.contains(&Effect::Persist(StoreOp::ClearNoShows(player("visor")))));

        let fx = m.handle(
            PickupEvent::Unban {
                requester: player("mod"),
                target: player("orbb"),
            },
            &roster,
            &Lookup {
                ban: None,
                ..lookup
            },
        );
        assert_eq!(
            fx,
            vec![Effect::whisper(&player("mod"), PickupErr::NotBanned(player("orbb")))]
        );
    }

    #[test]
    fn banned_players_cannot_sign_up() {
        let roster = SharedRoster::new(true);
        let mut m = manager(4);
        start(&mut m, &roster);

        let fx = m.handle(
            PickupEvent::PlayerJoined(player("visor")),
            &roster,
            &Lookup {
                requester_level: PrivilegeLevel::None,
                ban: ban(BanOrigin::PickupNoShow, "visor"),
            },
        );
        assert!(m.session().available.is_empty());
        assert!(matches!(
            fx.as_slice(),
            [Effect::Whisper { text, .. }] if text.starts_with("You are banned from pickups")
        ));
    }
}
