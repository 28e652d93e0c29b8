use tracing::info;

use super::{
    captains::PickupCaptains,
    effect::{Effect, StoreOp},
    player::PlayerId,
    session::{Phase, Session},
    team::{Side, Team},
};
use crate::{error::PickupErr, roster::RosterSnapshot};

#[derive(Eq, PartialEq, Debug)]
pub enum AddOutcome {
    SignedUp,
    /// Enough players have signed up to start picking captains
    ReadyForCaptains,
    /// Added to the substitute list of a game in progress
    SubCandidate,
}

/// Sign-up bookkeeping and substitutions for players who are not captains.
pub struct PickupPlayers<'a> {
    session: &'a mut Session,
    fx: &'a mut Vec<Effect>,
    roster: &'a dyn RosterSnapshot,
}

impl<'a> PickupPlayers<'a> {
    pub fn new(
        session: &'a mut Session,
        fx: &'a mut Vec<Effect>,
        roster: &'a dyn RosterSnapshot,
    ) -> Self {
        PickupPlayers {
            session,
            fx,
            roster,
        }
    }

    pub fn add(&mut self, player: &PlayerId) -> Result<AddOutcome, PickupErr> {
        if self.session.available.contains(player) || self.session.sub_candidates.contains(player)
        {
            return Err(PickupErr::AlreadySignedUp);
        }
        let on_roster_team =
            self.roster.is_active_player(player) && !self.session.locking.contains(player);
        if self.session.lineup_side(player).is_some() || on_roster_team {
            return Err(PickupErr::AlreadyOnTeam);
        }

        match self.session.phase {
            Phase::InProgress => {
                self.session.sub_candidates.insert(player.clone());
                self.fx.push(Effect::whisper(
                    player,
                    "You were added to the substitute list for the game in progress.",
                ));
                info!("{} added as a substitute", player);
                Ok(AddOutcome::SubCandidate)
            }
            phase if phase.is_pre_game() => {
                self.session.available.insert(player.clone());
                let needed = self.session.teamsize * 2;
                self.fx.push(Effect::announce(format!(
                    "{} signed up for the pickup. {}/{} players.",
                    player,
                    self.signed_up(),
                    needed
                )));

                let ready = phase == (Phase::PreGame { lineup_set: false })
                    && !self.session.captain_selection_triggered
                    && self.session.available.len() >= needed;
                if ready {
                    self.session.captain_selection_triggered = true;
                    Ok(AddOutcome::ReadyForCaptains)
                } else {
                    Ok(AddOutcome::SignedUp)
                }
            }
            _ => Err(PickupErr::NoPickup),
        }
    }

    pub fn remove(&mut self, player: &PlayerId) -> Result<(), PickupErr> {
        let mut removed = false;
        if self.session.available.contains(player) {
            if self.session.phase == Phase::TeamSelection {
                return Err(PickupErr::TeamSelectionStarted);
            }
            self.session.available.remove(player);
            removed = true;
            self.fx.push(Effect::announce(format!(
                "{} removed themselves from the pickup. {}/{} players.",
                player,
                self.signed_up(),
                self.session.teamsize * 2
            )));
        }
        if self.session.sub_candidates.remove(player) {
            removed = true;
            self.fx
                .push(Effect::whisper(player, "You were removed from the substitute list."));
        }

        if removed {
            Ok(())
        } else if self.session.is_captain(player) {
            Err(PickupErr::CaptainCannotRemove)
        } else {
            Err(PickupErr::NotSignedUp)
        }
    }

    /// Handles `sub <player>`: the requester gives up their place to `incoming`.
    pub fn request_sub(&mut self, requester: &PlayerId, incoming: &PlayerId) -> Result<(), PickupErr> {
        let phase = self.session.phase;
        if !(matches!(phase, Phase::InProgress) || matches!(phase, Phase::PreGame { .. })) {
            return Err(PickupErr::SubNotAllowed);
        }
        let side = self
            .session
            .lineup_side(requester)
            .ok_or(PickupErr::NotInLineup)?;
        let incoming = self
            .session
            .sub_candidates
            .iter()
            .chain(self.session.available.iter())
            .find(|p| *p == incoming)
            .cloned()
            .ok_or_else(|| PickupErr::NotASubCandidate(incoming.clone()))?;

        self.substitute(requester, side, &incoming);
        Ok(())
    }

    pub fn substitute(&mut self, outgoing: &PlayerId, side: Side, incoming: &PlayerId) {
        self.session.successful_subs.insert(outgoing.clone());
        self.session.lineup[side].remove(outgoing);
        self.session.place(incoming.clone(), side);

        self.fx.push(Effect::move_player(outgoing, Team::Spectator));
        self.fx.push(Effect::move_player(incoming, side.into()));
        self.fx.push(Effect::whisper(
            incoming,
            format!("You are subbing in for {} on {}.", outgoing, side),
        ));
        self.fx.push(Effect::announce(format!(
            "{} replaces {} on {}.",
            incoming, outgoing, side
        )));

        if self.session.captains[side].as_ref() == Some(outgoing) {
            PickupCaptains::new(&mut *self.session, &mut *self.fx, false)
                .set_captain(incoming, side, true);
        }

        self.session
            .subs_log
            .push(format!("{} -> {} ({})", outgoing, incoming, side));
        self.fx
            .push(Effect::Persist(StoreOp::SubUsed(outgoing.clone())));
        info!("{} subbed out for {} on {}", outgoing, incoming, side);
    }

    fn signed_up(&self) -> usize {
        self.session.available.len() + self.session.lineup_players().count()
    }
}
