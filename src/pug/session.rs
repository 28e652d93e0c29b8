use linked_hash_set::LinkedHashSet;
use std::collections::HashSet;

use super::player::PlayerId;
use super::team::{Side, Sides};

pub type Pool = LinkedHashSet<PlayerId>;

/// Where the pickup currently stands. Exactly one phase is active at a time.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Phase {
    /// No pickup is being organised
    Idle,
    /// Sign-ups are open. Once both teams have been picked the session
    /// returns here with `lineup_set` raised, waiting for the game to launch.
    PreGame { lineup_set: bool },
    /// Waiting for players to volunteer as captain
    CaptainSelection,
    /// Captains are taking turns picking players
    TeamSelection,
    /// The pickup game is being played
    InProgress,
    /// Between a score/time limit and the next warm-up. Departures are not punished.
    Intermission,
}

impl Phase {
    /// Any phase in which the line-up is still being assembled.
    pub fn is_pre_game(&self) -> bool {
        matches!(
            self,
            Phase::PreGame { .. } | Phase::CaptainSelection | Phase::TeamSelection
        )
    }

    /// Whether a session is waiting on sign-ups or picks.
    pub fn is_pending(&self) -> bool {
        self.is_pre_game()
    }
}

/// State of the single live pickup session.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Session {
    pub phase: Phase,
    pub teamsize: usize,
    /// Signed up and not yet on a team
    pub available: Pool,
    /// Players the session has placed on each side, captains first
    pub lineup: Sides<Pool>,
    /// Players waiting to be called in as replacements
    pub sub_candidates: Pool,
    pub captains: Sides<Option<PlayerId>>,
    pub turn: Option<Side>,
    pub subs_log: Vec<String>,
    pub no_shows_log: Vec<String>,
    pub missing: Sides<usize>,
    /// Players the manager is moving to spectator while setting up; their
    /// departures from a team are expected and not evaluated
    pub locking: HashSet<PlayerId>,
    /// Players who have been replaced through a substitution
    pub successful_subs: HashSet<PlayerId>,
    pub captain_selection_triggered: bool,
    pub game_id: Option<String>,
}

impl Session {
    pub fn new(teamsize: usize) -> Self {
        Session {
            phase: Phase::Idle,
            teamsize,
            available: Pool::new(),
            lineup: Sides::default(),
            sub_candidates: Pool::new(),
            captains: Sides::default(),
            turn: None,
            subs_log: Vec::new(),
            no_shows_log: Vec::new(),
            missing: Sides::default(),
            locking: HashSet::new(),
            successful_subs: HashSet::new(),
            captain_selection_triggered: false,
            game_id: None,
        }
    }

    /// Restores the session to an idle state, keeping only the configured team size.
    pub fn reset(&mut self) {
        *self = Session::new(self.teamsize);
    }

    pub fn captain_side(&self, player: &PlayerId) -> Option<Side> {
        self.captains.find(|c| c.as_ref() == Some(player))
    }

    pub fn is_captain(&self, player: &PlayerId) -> bool {
        self.captain_side(player).is_some()
    }

    pub fn captain_count(&self) -> usize {
        self.captains.iter().filter(|(_, c)| c.is_some()).count()
    }

    pub fn lineup_side(&self, player: &PlayerId) -> Option<Side> {
        self.lineup.find(|pool| pool.contains(player))
    }

    pub fn is_side_full(&self, side: Side) -> bool {
        self.lineup[side].len() >= self.teamsize
    }

    pub fn teams_full(&self) -> bool {
        Side::BOTH.iter().all(|side| self.lineup[*side].len() == self.teamsize)
    }

    /// Empty slots left across both sides.
    pub fn open_slots(&self) -> usize {
        Side::BOTH
            .iter()
            .map(|side| self.teamsize.saturating_sub(self.lineup[*side].len()))
            .sum()
    }

    /// Removes a player from both eligibility pools.
    pub fn remove_from_pools(&mut self, player: &PlayerId) {
        self.available.remove(player);
        self.sub_candidates.remove(player);
    }

    /// Puts a player on a side. Anyone placed again is no longer counted as substituted out.
    pub fn place(&mut self, player: PlayerId, side: Side) {
        self.remove_from_pools(&player);
        self.successful_subs.remove(&player);
        self.lineup[side.other()].remove(&player);
        self.lineup[side].insert(player);
    }

    /// Every player the session has put on a team, Red first.
    pub fn lineup_players(&self) -> impl Iterator<Item = &PlayerId> {
        self.lineup.iter().flat_map(|(_, pool)| pool.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated() -> Session {
        let mut session = Session::new(2);
        session.phase = Phase::TeamSelection;
        session.available.insert(PlayerId::new("visor"));
        session.sub_candidates.insert(PlayerId::new("orbb"));
        session.captains[Side::Red] = Some(PlayerId::new("xaero"));
        session.place(PlayerId::new("xaero"), Side::Red);
        session.subs_log.push("a -> b".to_string());
        session.game_id = Some("abc".to_string());
        session
    }

    #[test]
    fn reset_is_idempotent() {
        let mut once = populated();
        once.reset();
        let mut twice = populated();
        twice.reset();
        twice.reset();
        assert_eq!(once, twice);
        assert_eq!(once.phase, Phase::Idle);
        assert_eq!(once.teamsize, 2);
    }

    #[test]
    fn placing_a_player_removes_them_from_pools() {
        let mut session = populated();
        session.place(PlayerId::new("Visor"), Side::Blue);
        session.place(PlayerId::new("orbb"), Side::Blue);
        assert!(session.available.is_empty());
        assert!(session.sub_candidates.is_empty());
        assert_eq!(session.lineup_side(&PlayerId::new("visor")), Some(Side::Blue));
        assert!(!session.teams_full());
        assert_eq!(session.open_slots(), 1);
    }

    #[test]
    fn placing_a_substituted_player_clears_their_sub_mark() {
        let mut session = populated();
        session.successful_subs.insert(PlayerId::new("visor"));
        session.place(PlayerId::new("visor"), Side::Red);
        assert!(session.successful_subs.is_empty());
    }

    #[test]
    fn pre_game_covers_every_selection_phase() {
        assert!(Phase::PreGame { lineup_set: true }.is_pre_game());
        assert!(Phase::CaptainSelection.is_pre_game());
        assert!(Phase::TeamSelection.is_pre_game());
        assert!(!Phase::InProgress.is_pre_game());
        assert!(!Phase::Intermission.is_pre_game());
        assert!(!Phase::Idle.is_pre_game());
    }
}
