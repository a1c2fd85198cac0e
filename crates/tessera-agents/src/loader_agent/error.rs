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

use tessera_core::tile::TileKey;
use thiserror::Error;

/// Why a load attempt ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TileLoaderError {
    /// The data provider could not deliver the payload.
    #[error("fetching tile {key} failed: {reason}")]
    Fetch {
        /// The tile.
        key: TileKey,
        /// Provider error, with its causes.
        reason: String,
    },
    /// The payload could not be decoded.
    #[error("decoding tile {key} failed: {reason}")]
    Decode {
        /// The tile.
        key: TileKey,
        /// Decoder error, with its causes.
        reason: String,
    },
}
