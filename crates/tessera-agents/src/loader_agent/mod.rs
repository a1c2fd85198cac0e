// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Tile Loader
//!
//! Drives one tile through fetch and decode. Each call that finds the loader
//! idle starts a new *attempt* on a spawned task; results of superseded
//! attempts are dropped. Cancellation is cooperative: an in-flight fetch is
//! abandoned, a decode already running finishes but cannot move the loader
//! out of `Canceled`.

mod error;

pub use error::TileLoaderError;

use async_trait::async_trait;
use log::{debug, trace, warn};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tessera_core::event::EventBus;
use tessera_core::geometry::DecodedTile;
use tessera_core::loader::{
    ClientId, DataProvider, DecodedTileSource, TileDecoder, TileLoaderEvent, TileLoaderState,
};
use tessera_core::tile::TileKey;
use tokio::sync::watch;

#[derive(Debug, Default)]
struct Inner {
    attempt: u64,
    clients: HashSet<ClientId>,
    decoded: Option<DecodedTile>,
    last_error: Option<TileLoaderError>,
    cancel: Option<watch::Sender<bool>>,
    priority: f64,
}

struct Shared {
    key: TileKey,
    provider: Arc<dyn DataProvider>,
    decoder: Arc<dyn TileDecoder>,
    // State changes happen only while `inner` is locked.
    inner: Mutex<Inner>,
    state: watch::Sender<TileLoaderState>,
    events: Option<flume::Sender<TileLoaderEvent>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current(&self) -> TileLoaderState {
        *self.state.borrow()
    }

    /// Publishes `state` for `attempt`. Caller holds the `inner` lock.
    fn transition(&self, attempt: u64, state: TileLoaderState) {
        let previous = self.state.send_replace(state);
        trace!("TileLoader: {} attempt {attempt}: {previous} -> {state}", self.key);
        if let Some(events) = &self.events {
            let event = TileLoaderEvent {
                key: self.key,
                attempt,
                state,
            };
            if events.send(event).is_err() {
                debug!("TileLoader: {} event receiver is gone", self.key);
            }
        }
    }

    /// Moves `attempt` forward unless it was superseded or canceled.
    fn advance(&self, attempt: u64, state: TileLoaderState) -> bool {
        let inner = self.lock();
        if inner.attempt != attempt || !self.current().is_in_flight() {
            return false;
        }
        self.transition(attempt, state);
        drop(inner);
        true
    }

    fn fail(&self, attempt: u64, error: TileLoaderError) {
        let mut inner = self.lock();
        if inner.attempt != attempt || !self.current().is_in_flight() {
            debug!("TileLoader: ignoring stale failure of attempt {attempt}: {error}");
            return;
        }
        warn!("TileLoader: {error}");
        inner.last_error = Some(error);
        inner.cancel = None;
        inner.clients.clear();
        self.transition(attempt, TileLoaderState::Failed);
    }

    fn finish(&self, attempt: u64, decoded: DecodedTile) {
        let mut inner = self.lock();
        if inner.attempt != attempt {
            debug!("TileLoader: {} dropping result of superseded attempt {attempt}", self.key);
            return;
        }
        inner.decoded = Some(decoded);
        if self.current() == TileLoaderState::Canceled {
            debug!("TileLoader: {} decode finished after cancel, state stays Canceled", self.key);
            return;
        }
        inner.cancel = None;
        inner.clients.clear();
        self.transition(attempt, TileLoaderState::Ready);
    }

    async fn run_attempt(self: Arc<Self>, attempt: u64, mut canceled: watch::Receiver<bool>) {
        let fetched = tokio::select! {
            result = self.provider.fetch(self.key) => result,
            _ = canceled.wait_for(|c| *c) => {
                debug!("TileLoader: {} fetch of attempt {attempt} abandoned", self.key);
                return;
            }
        };
        let payload = match fetched {
            Ok(payload) => payload,
            Err(err) => {
                self.fail(
                    attempt,
                    TileLoaderError::Fetch {
                        key: self.key,
                        reason: format!("{err:#}"),
                    },
                );
                return;
            }
        };

        if !self.advance(attempt, TileLoaderState::Loaded)
            || !self.advance(attempt, TileLoaderState::Decoding)
        {
            return;
        }

        match self.decoder.decode(self.key, payload).await {
            Ok(decoded) => self.finish(attempt, decoded),
            Err(err) => self.fail(
                attempt,
                TileLoaderError::Decode {
                    key: self.key,
                    reason: format!("{err:#}"),
                },
            ),
        }
    }
}

/// Asynchronous loader of one tile.
///
/// Cheap to clone; clones share the same state machine. Must be used from
/// within a tokio runtime.
#[derive(Clone)]
pub struct TileLoader {
    shared: Arc<Shared>,
}

impl TileLoader {
    /// Creates an idle loader for `key`.
    pub fn new(key: TileKey, provider: Arc<dyn DataProvider>, decoder: Arc<dyn TileDecoder>) -> Self {
        Self::build(key, provider, decoder, None)
    }

    /// Creates a loader publishing its state changes on `events`.
    pub fn with_events(
        key: TileKey,
        provider: Arc<dyn DataProvider>,
        decoder: Arc<dyn TileDecoder>,
        events: &EventBus<TileLoaderEvent>,
    ) -> Self {
        Self::build(key, provider, decoder, Some(events.sender()))
    }

    fn build(
        key: TileKey,
        provider: Arc<dyn DataProvider>,
        decoder: Arc<dyn TileDecoder>,
        events: Option<flume::Sender<TileLoaderEvent>>,
    ) -> Self {
        let (state, _) = watch::channel(TileLoaderState::Initialized);
        Self {
            shared: Arc::new(Shared {
                key,
                provider,
                decoder,
                inner: Mutex::new(Inner::default()),
                state,
                events,
            }),
        }
    }

    /// The tile this loader fetches.
    pub fn key(&self) -> TileKey {
        self.shared.key
    }

    /// Number of attempts started so far.
    pub fn attempt(&self) -> u64 {
        self.shared.lock().attempt
    }

    /// Why the last failed attempt failed.
    pub fn last_error(&self) -> Option<TileLoaderError> {
        self.shared.lock().last_error.clone()
    }

    /// Moves the decoded tile out, leaving the loader without one.
    pub fn take_decoded_tile(&self) -> Option<DecodedTile> {
        self.shared.lock().decoded.take()
    }

    /// A receiver observing every state change.
    pub fn subscribe(&self) -> watch::Receiver<TileLoaderState> {
        self.shared.state.subscribe()
    }

    /// Registers `client` and starts an attempt unless one is in flight.
    /// Returns the number of the attempt the caller joined.
    ///
    /// Clients belong to one attempt: a new attempt starts with only the
    /// caller registered.
    pub fn request(&self, client: Option<ClientId>) -> u64 {
        let shared = &self.shared;
        let mut inner = shared.lock();
        if shared.current().is_in_flight() {
            inner.clients.extend(client);
            trace!("TileLoader: {} joining attempt {}", shared.key, inner.attempt);
            return inner.attempt;
        }

        inner.clients.clear();
        inner.clients.extend(client);
        inner.attempt += 1;
        inner.decoded = None;
        inner.last_error = None;
        let (cancel, canceled) = watch::channel(false);
        inner.cancel = Some(cancel);
        let attempt = inner.attempt;
        shared.transition(attempt, TileLoaderState::Loading);
        drop(inner);

        debug!("TileLoader: {} starting attempt {attempt}", shared.key);
        tokio::spawn(Arc::clone(shared).run_attempt(attempt, canceled));
        attempt
    }
}

#[async_trait]
impl DecodedTileSource for TileLoader {
    fn state(&self) -> TileLoaderState {
        self.shared.current()
    }

    fn decoded_tile(&self) -> Option<DecodedTile> {
        self.shared.lock().decoded.clone()
    }

    fn priority(&self) -> f64 {
        self.shared.lock().priority
    }

    fn set_priority(&self, priority: f64) {
        self.shared.lock().priority = priority;
    }

    async fn load_and_decode(&self, client: Option<ClientId>) -> TileLoaderState {
        self.request(client);
        self.wait_settled().await
    }

    async fn wait_settled(&self) -> TileLoaderState {
        let mut states = self.shared.state.subscribe();
        let settled = states.wait_for(|s| !s.is_in_flight()).await.map(|s| *s);
        settled.unwrap_or_else(|_| self.shared.current())
    }

    fn cancel(&self, client: Option<ClientId>) {
        let shared = &self.shared;
        let mut inner = shared.lock();
        if let Some(client) = client {
            inner.clients.remove(&client);
        }
        if !inner.clients.is_empty() {
            trace!(
                "TileLoader: {} cancel ignored, {} client(s) remain",
                shared.key,
                inner.clients.len()
            );
            return;
        }
        if !shared.current().is_in_flight() {
            return;
        }

        if let Some(cancel) = inner.cancel.take() {
            cancel.send_replace(true);
        }
        debug!("TileLoader: {} attempt {} canceled", shared.key, inner.attempt);
        shared.transition(inner.attempt, TileLoaderState::Canceled);
    }
}

impl std::fmt::Debug for TileLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileLoader")
            .field("key", &self.shared.key)
            .field("state", &self.shared.current())
            .finish_non_exhaustive()
    }
}
