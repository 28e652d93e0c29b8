use futures::stream::TryStreamExt;
use mongodb::bson::doc;
use mongodb::error::Error;
use mongodb::options::FindOptions;
use mongodb::Database;

use super::collection_name::{BANS, PICKUP_GAMES, PLAYER_STATS, USERS};
use super::model::*;

pub async fn find_ban(db: Database, player_key: &str) -> Result<Option<BanRecord>, Error> {
    let filter = doc! {
        "player": player_key
    };
    db.collection(BANS).find_one(filter, None).await
}

pub async fn find_user(db: Database, player_key: &str) -> Result<Option<User>, Error> {
    let filter = doc! {
        "player": player_key
    };
    db.collection(USERS).find_one(filter, None).await
}

pub async fn find_stats(db: Database, player_key: &str) -> Result<Option<PlayerStats>, Error> {
    let filter = doc! {
        "player": player_key
    };
    db.collection(PLAYER_STATS).find_one(filter, None).await
}

pub async fn find_game(db: Database, game_id: &str) -> Result<Option<PickupGame>, Error> {
    let filter = doc! {
        "game_id": game_id
    };
    db.collection(PICKUP_GAMES).find_one(filter, None).await
}

/// Get the most recently created pickup games, newest first
pub async fn recent_games(db: Database, limit: i64) -> Result<Vec<PickupGame>, Error> {
    let options = FindOptions::builder()
        .sort(doc! { "created": -1 })
        .limit(limit)
        .build();
    let cursor = db
        .collection::<PickupGame>(PICKUP_GAMES)
        .find(None, options)
        .await?;
    cursor.try_collect().await
}
