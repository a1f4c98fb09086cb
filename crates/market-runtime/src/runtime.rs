//! # Market Runtime
//!
//! Owns the container, the service facade and the spawned event handlers.
//!
//! ## Startup Sequence
//!
//! 1. Build the component container (store client first, then components)
//! 2. Subscribe each handler to its topics
//! 3. Spawn the handlers, all sharing one shutdown signal

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use shared_bus::{EventFilter, EventTopic, ProcessedEventCache};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::adapters::{
    ChatMirror, ContentClassifier, LoggingChatMirror, LoggingDispatcher, NoopClassifier,
    NotificationDispatcher,
};
use crate::container::{MarketConfig, MarketContainer};
use crate::handlers::{
    drive, ChatMirrorHandler, EligibilityHandler, EventHandler, ListingHandler, NotificationHandler,
};
use crate::service::MarketplaceService;

/// How long `shutdown` waits for handlers to finish their current record.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// External collaborators handed to the reactive handlers.
#[derive(Clone)]
pub struct Collaborators {
    pub classifier: Arc<dyn ContentClassifier>,
    pub dispatcher: Arc<dyn NotificationDispatcher>,
    pub chat: Arc<dyn ChatMirror>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            classifier: Arc::new(NoopClassifier),
            dispatcher: Arc::new(LoggingDispatcher),
            chat: Arc::new(LoggingChatMirror),
        }
    }
}

/// The marketplace core with its handlers.
pub struct MarketRuntime {
    container: Arc<MarketContainer>,
    service: MarketplaceService,
    collaborators: Collaborators,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl MarketRuntime {
    /// Runtime over an in-memory store with the default collaborators.
    pub fn new(config: MarketConfig) -> Self {
        Self::with_container(Arc::new(MarketContainer::new(config)), Collaborators::default())
    }

    pub fn with_container(container: Arc<MarketContainer>, collaborators: Collaborators) -> Self {
        let service = MarketplaceService::new(Arc::clone(&container));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            container,
            service,
            collaborators,
            shutdown_tx,
            shutdown_rx,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawns the event handlers. Calling it again is a no-op.
    pub fn start(&self) {
        let mut handles = self.handles.lock();
        if !handles.is_empty() {
            warn!("Runtime already started");
            return;
        }

        info!("===========================================");
        info!("  Task Market Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        let c = &self.collaborators;
        handles.push(self.spawn(
            EligibilityHandler::new(self.service.clone()),
            vec![EventTopic::Eligibility],
        ));
        handles.push(self.spawn(
            ListingHandler::new(self.service.clone(), Arc::clone(&c.classifier)),
            vec![EventTopic::Tasks],
        ));
        handles.push(self.spawn(
            NotificationHandler::new(self.service.clone(), Arc::clone(&c.dispatcher)),
            vec![EventTopic::Offers, EventTopic::Tasks, EventTopic::Disputes],
        ));
        handles.push(self.spawn(
            ChatMirrorHandler::new(Arc::clone(&c.chat)),
            vec![EventTopic::Offers],
        ));

        info!(handlers = handles.len(), "Event handlers started");
    }

    fn spawn<H>(&self, handler: H, topics: Vec<EventTopic>) -> JoinHandle<()>
    where
        H: EventHandler + 'static,
    {
        let subscription = self.container.event_bus.subscribe(EventFilter::topics(topics));
        let seen = ProcessedEventCache::with_config(
            self.container.config.bus.dedup_retention_ms,
            ProcessedEventCache::DEFAULT_GC_INTERVAL_MS,
        );
        tokio::spawn(drive(
            handler,
            subscription,
            seen,
            Arc::clone(&self.container.time),
            self.shutdown_rx.clone(),
        ))
    }

    /// Signals every handler to stop and waits briefly for them.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        for handle in handles {
            match tokio::time::timeout(SHUTDOWN_GRACE, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Handler task failed: {}", e),
                Err(_) => warn!("Handler did not stop within {:?}", SHUTDOWN_GRACE),
            }
        }
        info!("Shutdown complete");
    }

    /// Authenticated operation surface.
    pub fn service(&self) -> MarketplaceService {
        self.service.clone()
    }

    pub fn container(&self) -> Arc<MarketContainer> {
        Arc::clone(&self.container)
    }
}
