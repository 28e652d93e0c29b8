use std::{collections::HashMap, time::Duration};
use tokio::{sync::mpsc::Sender, task::JoinHandle, time};
use tracing::{debug, info};

use crate::event_handler::Inbound;
use crate::pug::event::{PickupEvent, TimerKind};

/// The one-shot pickup timers. Arming a timer replaces any pending timer of the same kind.
#[derive(Debug, Default)]
pub struct Timers {
    pending: HashMap<TimerKind, JoinHandle<()>>,
}

impl Timers {
    pub fn arm(&mut self, tx: Sender<Inbound>, kind: TimerKind, generation: u64, delay: Duration) {
        self.cancel(kind);
        info!("Arming {:?} timer for {} seconds", kind, delay.as_secs());
        self.pending
            .insert(kind, schedule(tx, kind, generation, delay));
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        if let Some(handle) = self.pending.remove(&kind) {
            handle.abort();
        }
    }
}

/// Posts a [`PickupEvent::TimerFired`] back into the event stream once `delay` has elapsed.
pub fn schedule(
    tx: Sender<Inbound>,
    kind: TimerKind,
    generation: u64,
    delay: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        time::sleep(delay).await;
        let fired = Inbound::Event(PickupEvent::TimerFired { kind, generation });
        if tx.send(fired).await.is_err() {
            debug!("Event stream closed before the {:?} timer fired", kind);
        }
    })
}
