pub mod commands;
pub mod common;
pub mod config;
pub mod console;
pub mod db;
pub mod error;
pub mod event_handler;
pub mod jobs;
pub mod pug;
pub mod roster;
pub mod sink;

use anyhow::Context;
use std::{env, sync::Arc};
use tokio::{
    io::{AsyncWriteExt, BufReader},
    sync::mpsc::{self, UnboundedReceiver},
};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use config::PickupConfig;
use db::{client::PersistentStore, memory::MemoryStore, MongoStore, DEFAULT_DB_NAME};
use event_handler::{Handler, EVENT_QUEUE_CAPACITY};
use pug::manager::PickupManager;
use roster::SharedRoster;
use sink::RconSink;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenv::dotenv();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("Failed to start the logger")?;
    if let Err(why) = dotenv {
        warn!("No .env file was loaded: {}", why);
    }

    let config = PickupConfig::from_env().context("Invalid pickup configuration")?;

    let store: Arc<dyn PersistentStore> = match env::var("MONGO_URI") {
        Ok(uri) => {
            let db_name = env::var("MONGO_DB").unwrap_or_else(|_| DEFAULT_DB_NAME.to_string());
            let db = db::setup(&uri, &db_name)
                .await
                .context("Could not set up the database client")?;
            Arc::new(MongoStore::new(db))
        }
        Err(_) => {
            warn!("MONGO_URI was not found in the environment, so pickup records are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let roster = Arc::new(SharedRoster::new(true));
    let (rcon_tx, rcon_rx) = mpsc::unbounded_channel();
    tokio::spawn(write_rcon(rcon_rx));

    let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    let handler = Handler::new(
        PickupManager::new(config),
        roster.clone(),
        Arc::new(RconSink::new(rcon_tx)),
        store,
        tx.clone(),
    );
    let running = tokio::spawn(handler.run(rx));

    let console = console::run(BufReader::new(tokio::io::stdin()), roster, tx);
    tokio::select! {
        result = console => result?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Could not register ctrl+c handler")?;
            info!("Received ctrl+c, shutting down");
        }
    }

    running.abort();
    Ok(())
}

/// Writes queued rcon commands to stdout, one per line.
async fn write_rcon(mut rx: UnboundedReceiver<String>) {
    let mut stdout = tokio::io::stdout();
    while let Some(line) = rx.recv().await {
        let written = async {
            stdout.write_all(line.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await
        };
        if let Err(why) = written.await {
            error!("Failed to write rcon command: {:?}", why);
            break;
        }
    }
}
