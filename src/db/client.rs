use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{BanRecord, Counter, PickupGame, PlayerStats};
use crate::common::privilege::PrivilegeLevel;
use crate::error::StoreError;
use crate::pug::player::PlayerId;

/// Persistence used by the pickup module: bans, counters, game history and privileges.
///
/// Every write is best-effort from the pickup's point of view; callers log
/// failures and carry on.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    async fn find_ban(&self, player: &PlayerId) -> Result<Option<BanRecord>, StoreError>;
    /// Replaces any existing ban for the same player.
    async fn add_ban(&self, ban: BanRecord) -> Result<(), StoreError>;
    async fn remove_ban(&self, player: &PlayerId) -> Result<(), StoreError>;

    async fn privilege_level(&self, player: &PlayerId) -> Result<PrivilegeLevel, StoreError>;

    async fn stats(&self, player: &PlayerId) -> Result<PlayerStats, StoreError>;
    /// Adds one to the counter and returns the new value.
    async fn increment(&self, player: &PlayerId, counter: Counter) -> Result<u32, StoreError>;
    async fn reset_counter(&self, player: &PlayerId, counter: Counter) -> Result<(), StoreError>;
    async fn set_last_played(&self, player: &PlayerId, at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn find_game(&self, game_id: &str) -> Result<Option<PickupGame>, StoreError>;
    /// Inserts or replaces the game with the same id.
    async fn save_game(&self, game: &PickupGame) -> Result<(), StoreError>;
    /// Most recently created games first.
    async fn recent_games(&self, limit: usize) -> Result<Vec<PickupGame>, StoreError>;
}
