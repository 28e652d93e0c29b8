//! Pickup game orchestration: sign-ups, captains, picks, substitutions and
//! the punishments that keep players honest.

pub mod captains;
pub mod effect;
pub mod event;
pub mod manager;
pub mod player;
pub mod players;
pub mod punishment;
pub mod session;
pub mod team;
