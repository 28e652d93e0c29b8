pub mod client;
pub mod memory;
pub mod model;
pub mod read;
pub mod write;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use tracing::{info, instrument};

use crate::common::privilege::PrivilegeLevel;
use crate::error::StoreError;
use crate::pug::player::PlayerId;
use client::PersistentStore;
use model::{BanRecord, Counter, PickupGame, PlayerStats};

pub const DEFAULT_DB_NAME: &str = "pickup";

pub mod collection_name {
    pub const BANS: &str = "bans";
    pub const USERS: &str = "users";
    pub const PLAYER_STATS: &str = "player_stats";
    pub const PICKUP_GAMES: &str = "pickup_games";
}

/// Creates a [`mongodb::Client`] connected to the database cluster and returns a handle
/// to the database the pickup module uses.
#[instrument(skip(connection_string))]
pub async fn setup(connection_string: &str, db_name: &str) -> Result<Database, StoreError> {
    info!("Launching connection to database deployment/cluster");

    // Parse a connection string into an options struct.
    let mut client_options = ClientOptions::parse(connection_string).await?;
    client_options.app_name = Some("Rusty Pickup".to_string());

    let client = Client::with_options(client_options)?;
    Ok(client.database(db_name))
}

/// [`PersistentStore`] backed by MongoDB.
#[derive(Clone, Debug)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        MongoStore { db }
    }
}

#[async_trait]
impl PersistentStore for MongoStore {
    async fn find_ban(&self, player: &PlayerId) -> Result<Option<BanRecord>, StoreError> {
        Ok(read::find_ban(self.db.clone(), player.key()).await?)
    }

    async fn add_ban(&self, ban: BanRecord) -> Result<(), StoreError> {
        write::replace_ban(self.db.clone(), &ban).await?;
        Ok(())
    }

    async fn remove_ban(&self, player: &PlayerId) -> Result<(), StoreError> {
        write::delete_ban(self.db.clone(), player.key()).await?;
        Ok(())
    }

    async fn privilege_level(&self, player: &PlayerId) -> Result<PrivilegeLevel, StoreError> {
        Ok(read::find_user(self.db.clone(), player.key())
            .await?
            .map(|user| user.level)
            .unwrap_or_default())
    }

    async fn stats(&self, player: &PlayerId) -> Result<PlayerStats, StoreError> {
        Ok(read::find_stats(self.db.clone(), player.key())
            .await?
            .unwrap_or_else(|| PlayerStats {
                player: player.key().to_string(),
                ..PlayerStats::default()
            }))
    }

    async fn increment(&self, player: &PlayerId, counter: Counter) -> Result<u32, StoreError> {
        let stats = write::increment_counter(self.db.clone(), player.key(), counter)
            .await?
            .ok_or(StoreError::Missing("player stats"))?;
        Ok(counter.read(&stats))
    }

    async fn reset_counter(&self, player: &PlayerId, counter: Counter) -> Result<(), StoreError> {
        write::reset_counter(self.db.clone(), player.key(), counter).await?;
        Ok(())
    }

    async fn set_last_played(&self, player: &PlayerId, at: DateTime<Utc>) -> Result<(), StoreError> {
        write::set_last_played(self.db.clone(), player.key(), at).await?;
        Ok(())
    }

    async fn find_game(&self, game_id: &str) -> Result<Option<PickupGame>, StoreError> {
        Ok(read::find_game(self.db.clone(), game_id).await?)
    }

    async fn save_game(&self, game: &PickupGame) -> Result<(), StoreError> {
        write::replace_game(self.db.clone(), game).await?;
        Ok(())
    }

    async fn recent_games(&self, limit: usize) -> Result<Vec<PickupGame>, StoreError> {
        Ok(read::recent_games(self.db.clone(), limit as i64).await?)
    }
}
