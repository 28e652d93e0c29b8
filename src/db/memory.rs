use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::client::PersistentStore;
use super::model::{BanRecord, Counter, PickupGame, PlayerStats, User};
use crate::common::privilege::PrivilegeLevel;
use crate::error::StoreError;
use crate::pug::player::PlayerId;

/// Keeps everything in memory. Used when no database is configured, and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    bans: RwLock<HashMap<String, BanRecord>>,
    users: RwLock<HashMap<String, User>>,
    stats: RwLock<HashMap<String, PlayerStats>>,
    games: RwLock<Vec<PickupGame>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_level(&self, player: &PlayerId, level: PrivilegeLevel) {
        self.users.write().await.insert(
            player.key().to_string(),
            User {
                player: player.key().to_string(),
                level,
            },
        );
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn find_ban(&self, player: &PlayerId) -> Result<Option<BanRecord>, StoreError> {
        Ok(self.bans.read().await.get(player.key()).cloned())
    }

    async fn add_ban(&self, ban: BanRecord) -> Result<(), StoreError> {
        self.bans.write().await.insert(ban.player.clone(), ban);
        Ok(())
    }

    async fn remove_ban(&self, player: &PlayerId) -> Result<(), StoreError> {
        self.bans.write().await.remove(player.key());
        Ok(())
    }

    async fn privilege_level(&self, player: &PlayerId) -> Result<PrivilegeLevel, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .get(player.key())
            .map(|user| user.level)
            .unwrap_or_default())
    }

    async fn stats(&self, player: &PlayerId) -> Result<PlayerStats, StoreError> {
        Ok(self
            .stats
            .read()
            .await
            .get(player.key())
            .cloned()
            .unwrap_or_else(|| PlayerStats {
                player: player.key().to_string(),
                ..PlayerStats::default()
            }))
    }

    async fn increment(&self, player: &PlayerId, counter: Counter) -> Result<u32, StoreError> {
        let mut stats = self.stats.write().await;
        let entry = stats
            .entry(player.key().to_string())
            .or_insert_with(|| PlayerStats {
                player: player.key().to_string(),
                ..PlayerStats::default()
            });
        let slot = counter.slot(entry);
        *slot += 1;
        Ok(*slot)
    }

    async fn reset_counter(&self, player: &PlayerId, counter: Counter) -> Result<(), StoreError> {
        if let Some(entry) = self.stats.write().await.get_mut(player.key()) {
            *counter.slot(entry) = 0;
        }
        Ok(())
    }

    async fn set_last_played(&self, player: &PlayerId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut stats = self.stats.write().await;
        let entry = stats
            .entry(player.key().to_string())
            .or_insert_with(|| PlayerStats {
                player: player.key().to_string(),
                ..PlayerStats::default()
            });
        entry.last_played = Some(at);
        Ok(())
    }

    async fn find_game(&self, game_id: &str) -> Result<Option<PickupGame>, StoreError> {
        Ok(self
            .games
            .read()
            .await
            .iter()
            .find(|game| game.game_id == game_id)
            .cloned())
    }

    async fn save_game(&self, game: &PickupGame) -> Result<(), StoreError> {
        let mut games = self.games.write().await;
        match games.iter_mut().find(|g| g.game_id == game.game_id) {
            Some(existing) => *existing = game.clone(),
            None => games.push(game.clone()),
        }
        Ok(())
    }

    async fn recent_games(&self, limit: usize) -> Result<Vec<PickupGame>, StoreError> {
        let games = self.games.read().await;
        let mut recent: Vec<PickupGame> = games.clone();
        recent.sort_by(|a, b| b.created.cmp(&a.created));
        recent.truncate(limit);
        Ok(recent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counters_start_at_zero_and_reset() {
        let store = MemoryStore::new();
        let player = PlayerId::new("Bones");

        assert_eq!(store.increment(&player, Counter::NoShows).await.unwrap(), 1);
        assert_eq!(store.increment(&player, Counter::NoShows).await.unwrap(), 2);
        assert_eq!(store.stats(&player).await.unwrap().subs_used, 0);

        store.reset_counter(&player, Counter::NoShows).await.unwrap();
        assert_eq!(store.stats(&player).await.unwrap().no_shows, 0);
    }

    #[tokio::test]
    async fn unknown_accounts_have_no_privileges() {
        let store = MemoryStore::new();
        let player = PlayerId::new("Phobos");
        assert_eq!(store.privilege_level(&player).await.unwrap(), PrivilegeLevel::None);

        store.set_level(&player, PrivilegeLevel::Admin).await;
        assert_eq!(
            store.privilege_level(&PlayerId::new("phobos")).await.unwrap(),
            PrivilegeLevel::Admin
        );
    }
}
