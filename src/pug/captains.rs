use itertools::Itertools;
use tracing::info;

use super::{
    effect::Effect,
    player::PlayerId,
    session::{Phase, Session},
    team::Side,
};
use crate::error::PickupErr;

/// Represents the action to take after a player volunteers as captain.
#[derive(Eq, PartialEq, Debug)]
pub enum PostSetCaptainAction {
    /// A captain is still needed for this side
    NeedCaptain(Side),
    /// Both captains have been selected
    StartPicking,
}

/// Represents the successful assignment of a player to a team, and the variants describe
/// the team that is to pick next, or whether picking is complete.
#[derive(Eq, PartialEq, Debug)]
pub enum PickSuccess {
    Turn(Side),
    /// Both teams are full
    Complete,
}

/// Captain assignment and the alternating pick protocol, operating on the
/// manager's session.
pub struct PickupCaptains<'a> {
    session: &'a mut Session,
    fx: &'a mut Vec<Effect>,
    game_live: bool,
}

impl<'a> PickupCaptains<'a> {
    pub fn new(session: &'a mut Session, fx: &'a mut Vec<Effect>, game_live: bool) -> Self {
        PickupCaptains {
            session,
            fx,
            game_live,
        }
    }

    /// Fills the first open captain slot, red before blue.
    pub fn volunteer(&mut self, player: &PlayerId) -> Result<PostSetCaptainAction, PickupErr> {
        if self.game_live {
            return Err(PickupErr::GameInProgress);
        }
        if self.session.phase != Phase::CaptainSelection {
            return Err(PickupErr::CaptainSelectionNotStarted);
        }
        if let Some(side) = self.session.captain_side(player) {
            return Err(PickupErr::IsCaptainAlready(side));
        }
        let player = self
            .session
            .available
            .iter()
            .find(|p| *p == player)
            .cloned()
            .ok_or(PickupErr::NotAvailable)?;
        let side = self
            .session
            .captains
            .find(|c| c.is_none())
            .ok_or(PickupErr::CaptainSpotsFilled)?;

        self.set_captain(&player, side, false);

        match self.session.captains.find(|c| c.is_none()) {
            Some(open) => Ok(PostSetCaptainAction::NeedCaptain(open)),
            None => {
                self.fx.push(Effect::announce(format!(
                    "Both captains are set: {}. Team selection is about to begin.",
                    self.matchup()
                )));
                Ok(PostSetCaptainAction::StartPicking)
            }
        }
    }

    /// Makes `player` captain of `side`. Substitutions hand over an existing slot.
    ///
    /// Moving the captain onto their team is left to the caller.
    pub fn set_captain(&mut self, player: &PlayerId, side: Side, is_substitution: bool) {
        self.session.remove_from_pools(player);
        self.session.captains[side] = Some(player.clone());
        self.session.place(player.clone(), side);
        info!("{} is now captain of {}", player, side);

        let announcement = if is_substitution {
            format!("{} takes over as {} captain.", player, side)
        } else {
            format!("{} is the {} captain.", player, side)
        };
        self.fx.push(Effect::announce(announcement));
        self.fx.push(Effect::whisper(
            player,
            "You are a captain. Use !pick <name> when it is your turn.",
        ));
    }

    /// Moves both captains onto their teams.
    pub fn move_captains(&mut self) {
        for (side, captain) in self.session.captains.iter() {
            if let Some(captain) = captain {
                self.fx.push(Effect::move_player(captain, side.into()));
            }
        }
    }

    /// Moves both captains onto their teams and hands the first pick to `first`.
    pub fn start_picking(&mut self, first: Side) {
        self.move_captains();
        self.fx.push(Effect::announce(format!(
            "Team selection has started: {}. The {} captain picks first.",
            self.matchup(),
            first
        )));
        self.set_turn(first);
    }

    pub fn set_turn(&mut self, side: Side) {
        self.session.turn = Some(side);
        if !self.session.is_side_full(side) {
            if let Some(captain) = &self.session.captains[side] {
                self.fx.push(Effect::announce(format!(
                    "{} ({}), it is your turn to pick.",
                    captain, side
                )));
            }
        }
        self.list_available();
    }

    pub fn pick(&mut self, captain: &PlayerId, target: &PlayerId) -> Result<PickSuccess, PickupErr> {
        let side = self
            .session
            .captain_side(captain)
            .ok_or(PickupErr::NotCaptain)?;
        if self.game_live {
            return Err(PickupErr::GameInProgress);
        }
        if self.session.phase != Phase::TeamSelection {
            return Err(PickupErr::TeamSelectionNotStarted);
        }
        if self.session.turn != Some(side) {
            return Err(PickupErr::NotYourTurn);
        }

        let picked = match self.session.available.iter().find(|p| *p == target).cloned() {
            Some(picked) => picked,
            None => {
                // the turn is not consumed; remind everyone where things stand
                self.list_available();
                self.announce_turn();
                return Err(PickupErr::NotPickable(target.clone()));
            }
        };

        self.session.place(picked.clone(), side);
        self.fx.push(Effect::move_player(&picked, side.into()));
        self.fx
            .push(Effect::whisper(&picked, format!("You were picked for {} by {}.", side, captain)));
        self.fx.push(Effect::announce(format!(
            "{} picked {} for {}.",
            captain, picked, side
        )));

        if self.session.teams_full() {
            self.session.turn = None;
            return Ok(PickSuccess::Complete);
        }

        let next = if self.session.is_side_full(side.other()) {
            side
        } else {
            side.other()
        };
        self.set_turn(next);
        Ok(PickSuccess::Turn(next))
    }

    fn announce_turn(&mut self) {
        if let Some(side) = self.session.turn {
            if let Some(captain) = &self.session.captains[side] {
                self.fx.push(Effect::announce(format!(
                    "It is {}'s turn to pick for {}.",
                    captain, side
                )));
            }
        }
    }

    pub fn list_available(&mut self) {
        if self.session.available.is_empty() {
            return;
        }
        let listing = self
            .session
            .available
            .iter()
            .enumerate()
            .format_with(" | ", |(index, player), f| {
                f(&format_args!("{}) {}", index + 1, player))
            });
        self.fx
            .push(Effect::announce(format!("Available players: {}", listing)));
    }

    pub fn matchup(&self) -> String {
        let name = |side: Side| {
            self.session.captains[side]
                .as_ref()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "?".to_string())
        };
        format!("{} (red) vs {} (blue)", name(Side::Red), name(Side::Blue))
    }
}
