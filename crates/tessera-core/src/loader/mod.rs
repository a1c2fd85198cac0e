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

//! # Tile Loading Contracts
//!
//! The state machine vocabulary shared by tile loaders and their clients,
//! and the collaborator traits a loader drives: a [`DataProvider`] fetching
//! raw payloads and a [`TileDecoder`] turning them into a [`DecodedTile`].
//!
//! ```text
//! Initialized -> Loading -> Loaded -> Decoding -> Ready
//!                   |                    |
//!                   +--> Canceled <------+
//!                   +--> Failed   <------+
//! ```

use crate::geometry::DecodedTile;
use crate::tile::TileKey;
use async_trait::async_trait;
use std::fmt;

/// Lifecycle of one load attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TileLoaderState {
    /// Nothing requested yet.
    #[default]
    Initialized,
    /// Fetching the raw payload.
    Loading,
    /// Payload received, decode not started.
    Loaded,
    /// Decoding the payload.
    Decoding,
    /// A decoded tile is available.
    Ready,
    /// Every client lost interest.
    Canceled,
    /// Fetch or decode failed.
    Failed,
}

impl TileLoaderState {
    /// `true` while an attempt is in flight.
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            TileLoaderState::Loading | TileLoaderState::Loaded | TileLoaderState::Decoding
        )
    }

    /// `true` for the terminal states of an attempt.
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            TileLoaderState::Ready | TileLoaderState::Canceled | TileLoaderState::Failed
        )
    }
}

impl fmt::Display for TileLoaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TileLoaderState::Initialized => "Initialized",
            TileLoaderState::Loading => "Loading",
            TileLoaderState::Loaded => "Loaded",
            TileLoaderState::Decoding => "Decoding",
            TileLoaderState::Ready => "Ready",
            TileLoaderState::Canceled => "Canceled",
            TileLoaderState::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// Identity of a party interested in a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

/// Published on every state change of a loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileLoaderEvent {
    /// Tile being loaded.
    pub key: TileKey,
    /// Load attempt counter, starting at 1.
    pub attempt: u64,
    /// New state.
    pub state: TileLoaderState,
}

/// Fetches raw tile payloads (network, disk, cache...).
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Returns the payload of `key`.
    async fn fetch(&self, key: TileKey) -> anyhow::Result<Vec<u8>>;
}

/// Turns payloads into decoded tiles, typically off-thread.
#[async_trait]
pub trait TileDecoder: Send + Sync {
    /// Decodes the payload of `key`.
    async fn decode(&self, key: TileKey, payload: Vec<u8>) -> anyhow::Result<DecodedTile>;
}

/// The loader surface consumed by tiles and data sources.
#[async_trait]
pub trait DecodedTileSource: Send + Sync {
    /// Current state.
    fn state(&self) -> TileLoaderState;

    /// A copy of the decoded tile, once available.
    fn decoded_tile(&self) -> Option<DecodedTile>;

    /// `true` once the current attempt reached a terminal state.
    fn is_finished(&self) -> bool {
        self.state().is_finished()
    }

    /// Scheduling priority; higher loads first.
    fn priority(&self) -> f64;

    /// Updates the scheduling priority.
    fn set_priority(&self, priority: f64);

    /// Starts (or joins) a load and resolves with the settled state.
    async fn load_and_decode(&self, client: Option<ClientId>) -> TileLoaderState;

    /// Resolves with the state once no attempt is in flight.
    async fn wait_settled(&self) -> TileLoaderState;

    /// Withdraws `client`; the load stops once no client remains.
    fn cancel(&self, client: Option<ClientId>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_flight_and_finished_are_disjoint() {
        let all = [
            TileLoaderState::Initialized,
            TileLoaderState::Loading,
            TileLoaderState::Loaded,
            TileLoaderState::Decoding,
            TileLoaderState::Ready,
            TileLoaderState::Canceled,
            TileLoaderState::Failed,
        ];
        for state in all {
            assert!(!(state.is_in_flight() && state.is_finished()), "{state}");
        }
        assert!(!TileLoaderState::Initialized.is_in_flight());
        assert!(!TileLoaderState::Initialized.is_finished());
    }
}
