//! Simple stateless pub-sub event handler
//!
//! Components outside the ledger engine (a web socket pusher, an email sender, a metrics exporter) subscribe to ledger
//! events through this module and react to them. Handlers only ever see the event itself; they have no access to the
//! engine's internal state.
//!
//! Handlers may be async. Each event is handled on its own task.
use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
};

use log::*;
use tokio::sync::mpsc;

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, listener) = mpsc::channel(buffer_size);
        Self { listener, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Runs until every producer handed out by [`Self::subscribe`] has been dropped and all in-flight handler jobs
    /// have finished.
    pub async fn start_handler(mut self) {
        debug!("📬️ Starting ledger event handler");
        // The handler's own sender must go, otherwise the channel never closes
        drop(self.sender);
        let in_flight = Arc::new(AtomicI64::new(0));
        while let Some(ev) = self.listener.recv().await {
            trace!("📬️ Handling ledger event");
            let handler = Arc::clone(&self.handler);
            in_flight.fetch_add(1, Ordering::SeqCst);
            let job = Arc::clone(&in_flight);
            tokio::spawn(async move {
                (handler)(ev).await;
                job.fetch_sub(1, Ordering::SeqCst);
                trace!("📬️ Ledger event handled");
            });
        }
        let drain = tokio::spawn(async move {
            while in_flight.load(Ordering::SeqCst) > 0 {
                debug!("📬️ Waiting for {} event jobs to complete", in_flight.load(Ordering::SeqCst));
                tokio::time::sleep(tokio::time::Duration::from_millis(250)).await;
            }
        });
        if let Err(e) = drain.await {
            warn!("📬️ Could not wait for outstanding event jobs: {e}");
        }
        debug!("📬️ Ledger event handler has shut down");
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    /// Queues the event for the handler. A closed handler is logged and otherwise ignored; publishing never fails
    /// the caller.
    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Failed to publish ledger event: {e}");
        }
    }
}
