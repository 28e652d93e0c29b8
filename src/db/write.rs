use chrono::{DateTime, Utc};
use mongodb::bson::{doc, Document};
use mongodb::error::Error;
use mongodb::options::{FindOneAndUpdateOptions, ReplaceOptions, ReturnDocument, UpdateOptions};
use mongodb::results::{DeleteResult, UpdateResult};
use mongodb::Database;

use super::collection_name::{BANS, PICKUP_GAMES, PLAYER_STATS};
use super::model::*;

fn upsert() -> ReplaceOptions {
    ReplaceOptions::builder().upsert(true).build()
}

/// A player holds at most one ban, so a new ban replaces the old one.
pub async fn replace_ban(db: Database, ban: &BanRecord) -> Result<UpdateResult, Error> {
    let filter = doc! {
        "player": ban.player.as_str()
    };
    db.collection::<BanRecord>(BANS)
        .replace_one(filter, ban, upsert())
        .await
}

pub async fn delete_ban(db: Database, player_key: &str) -> Result<DeleteResult, Error> {
    let filter = doc! {
        "player": player_key
    };
    db.collection::<BanRecord>(BANS)
        .delete_one(filter, None)
        .await
}

/// Increments a counter, creating the stats document if needed, and returns the updated document.
pub async fn increment_counter(
    db: Database,
    player_key: &str,
    counter: Counter,
) -> Result<Option<PlayerStats>, Error> {
    let filter = doc! {
        "player": player_key
    };
    let mut increment = Document::new();
    increment.insert(counter.field(), 1);
    let update = doc! {
        "$inc": increment
    };
    let options = FindOneAndUpdateOptions::builder()
        .upsert(true)
        .return_document(ReturnDocument::After)
        .build();
    db.collection::<PlayerStats>(PLAYER_STATS)
        .find_one_and_update(filter, update, options)
        .await
}

pub async fn reset_counter(
    db: Database,
    player_key: &str,
    counter: Counter,
) -> Result<UpdateResult, Error> {
    let filter = doc! {
        "player": player_key
    };
    let mut cleared = Document::new();
    cleared.insert(counter.field(), 0);
    let update = doc! {
        "$set": cleared
    };
    db.collection::<PlayerStats>(PLAYER_STATS)
        .update_one(filter, update, None)
        .await
}

pub async fn set_last_played(
    db: Database,
    player_key: &str,
    at: DateTime<Utc>,
) -> Result<UpdateResult, Error> {
    let filter = doc! {
        "player": player_key
    };
    // stored the way serde writes chrono timestamps so the document reads back into `PlayerStats`
    let update = doc! {
        "$set": { "last_played": at.to_rfc3339() }
    };
    let options = UpdateOptions::builder().upsert(true).build();
    db.collection::<PlayerStats>(PLAYER_STATS)
        .update_one(filter, update, options)
        .await
}

pub async fn replace_game(db: Database, game: &PickupGame) -> Result<UpdateResult, Error> {
    let filter = doc! {
        "game_id": game.game_id.as_str()
    };
    db.collection::<PickupGame>(PICKUP_GAMES)
        .replace_one(filter, game, upsert())
        .await
}
