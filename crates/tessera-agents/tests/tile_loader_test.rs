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

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tessera_agents::{TileLoader, TileLoaderError};
use tessera_core::event::EventBus;
use tessera_core::geometry::DecodedTile;
use tessera_core::loader::{
    ClientId, DataProvider, DecodedTileSource, TileDecoder, TileLoaderEvent, TileLoaderState,
};
use tessera_core::tile::TileKey;
use tokio::sync::Notify;
use tokio::time::timeout;

const KEY: TileKey = TileKey {
    level: 10,
    row: 5,
    column: 6,
};
const PATIENCE: Duration = Duration::from_secs(5);

/// Provider that can hold its answer until released.
#[derive(Default)]
struct TestProvider {
    gate: Option<Arc<Notify>>,
    fail: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl DataProvider for TestProvider {
    async fn fetch(&self, _key: TileKey) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail {
            bail!("connection reset");
        }
        Ok(vec![1, 2, 3])
    }
}

/// Decoder that can hold its answer until released.
#[derive(Default)]
struct TestDecoder {
    gate: Option<Arc<Notify>>,
    fail: bool,
}

#[async_trait]
impl TileDecoder for TestDecoder {
    async fn decode(&self, _key: TileKey, payload: Vec<u8>) -> Result<DecodedTile> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail || payload.is_empty() {
            bail!("unsupported payload");
        }
        Ok(DecodedTile::default())
    }
}

fn loader(provider: TestProvider, decoder: TestDecoder) -> TileLoader {
    let _ = env_logger::builder().is_test(true).try_init();
    TileLoader::new(KEY, Arc::new(provider), Arc::new(decoder))
}

async fn reach(loader: &TileLoader, state: TileLoaderState) -> Result<()> {
    let mut states = loader.subscribe();
    timeout(PATIENCE, states.wait_for(|s| *s == state)).await??;
    Ok(())
}

#[tokio::test]
async fn load_reaches_ready_with_a_tile() -> Result<()> {
    // ARRANGE
    let loader = loader(TestProvider::default(), TestDecoder::default());
    assert_eq!(loader.state(), TileLoaderState::Initialized);

    // ACT
    let state = timeout(PATIENCE, loader.load_and_decode(None)).await?;

    // ASSERT
    assert_eq!(state, TileLoaderState::Ready);
    assert!(loader.is_finished());
    assert!(loader.decoded_tile().is_some());
    assert_eq!(loader.attempt(), 1);
    assert!(loader.last_error().is_none());
    Ok(())
}

#[tokio::test]
async fn every_transition_is_published() -> Result<()> {
    let bus = EventBus::<TileLoaderEvent>::new();
    let loader = TileLoader::with_events(
        KEY,
        Arc::new(TestProvider::default()),
        Arc::new(TestDecoder::default()),
        &bus,
    );

    timeout(PATIENCE, loader.load_and_decode(None)).await?;

    let states: Vec<_> = bus.drain().into_iter().map(|e| (e.attempt, e.state)).collect();
    assert_eq!(
        states,
        vec![
            (1, TileLoaderState::Loading),
            (1, TileLoaderState::Loaded),
            (1, TileLoaderState::Decoding),
            (1, TileLoaderState::Ready),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn concurrent_requests_share_one_fetch() -> Result<()> {
    let gate = Arc::new(Notify::new());
    let provider = Arc::new(TestProvider {
        gate: Some(Arc::clone(&gate)),
        ..Default::default()
    });
    let loader = TileLoader::new(KEY, provider.clone(), Arc::new(TestDecoder::default()));

    let first = loader.request(Some(ClientId(1)));
    let second = loader.request(Some(ClientId(2)));
    gate.notify_one();
    let state = timeout(PATIENCE, loader.wait_settled()).await?;

    assert_eq!(first, second);
    assert_eq!(state, TileLoaderState::Ready);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn cancel_while_loading_settles_as_canceled() -> Result<()> {
    let gate = Arc::new(Notify::new());
    let loader = loader(
        TestProvider {
            gate: Some(Arc::clone(&gate)),
            ..Default::default()
        },
        TestDecoder::default(),
    );
    let waiter = tokio::spawn({
        let loader = loader.clone();
        async move { loader.load_and_decode(None).await }
    });
    reach(&loader, TileLoaderState::Loading).await?;

    loader.cancel(None);
    let state = timeout(PATIENCE, waiter).await??;
    gate.notify_one();
    tokio::task::yield_now().await;

    assert_eq!(state, TileLoaderState::Canceled);
    assert_eq!(loader.state(), TileLoaderState::Canceled);
    assert!(loader.decoded_tile().is_none());
    Ok(())
}

#[tokio::test]
async fn load_continues_while_any_client_remains() -> Result<()> {
    let gate = Arc::new(Notify::new());
    let loader = loader(
        TestProvider {
            gate: Some(Arc::clone(&gate)),
            ..Default::default()
        },
        TestDecoder::default(),
    );
    loader.request(Some(ClientId(1)));
    loader.request(Some(ClientId(2)));

    loader.cancel(Some(ClientId(1)));
    assert_eq!(loader.state(), TileLoaderState::Loading);

    loader.cancel(Some(ClientId(2)));
    assert_eq!(loader.state(), TileLoaderState::Canceled);
    Ok(())
}

#[tokio::test]
async fn decode_finishing_after_cancel_keeps_canceled() -> Result<()> {
    let gate = Arc::new(Notify::new());
    let loader = loader(
        TestProvider::default(),
        TestDecoder {
            gate: Some(Arc::clone(&gate)),
            ..Default::default()
        },
    );
    let mut states = loader.subscribe();
    loader.request(None);
    timeout(PATIENCE, states.wait_for(|s| *s == TileLoaderState::Decoding)).await??;

    loader.cancel(None);
    gate.notify_one();
    // The decode result lands shortly after the gate opens.
    timeout(PATIENCE, async {
        while loader.decoded_tile().is_none() {
            tokio::task::yield_now().await;
        }
    })
    .await?;

    assert_eq!(loader.state(), TileLoaderState::Canceled);
    assert!(loader.take_decoded_tile().is_some());
    Ok(())
}

#[tokio::test]
async fn fetch_failure_is_reported() -> Result<()> {
    let loader = loader(
        TestProvider {
            fail: true,
            ..Default::default()
        },
        TestDecoder::default(),
    );

    let state = timeout(PATIENCE, loader.load_and_decode(None)).await?;

    assert_eq!(state, TileLoaderState::Failed);
    match loader.last_error() {
        Some(TileLoaderError::Fetch { key, reason }) => {
            assert_eq!(key, KEY);
            assert!(reason.contains("connection reset"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn decode_failure_is_reported() -> Result<()> {
    let loader = loader(
        TestProvider::default(),
        TestDecoder {
            fail: true,
            ..Default::default()
        },
    );

    let state = timeout(PATIENCE, loader.load_and_decode(None)).await?;

    assert_eq!(state, TileLoaderState::Failed);
    assert!(matches!(loader.last_error(), Some(TileLoaderError::Decode { .. })));
    assert!(loader.decoded_tile().is_none());
    Ok(())
}

#[tokio::test]
async fn canceled_loader_can_be_restarted() -> Result<()> {
    let gate = Arc::new(Notify::new());
    let loader = loader(
        TestProvider {
            gate: Some(Arc::clone(&gate)),
            ..Default::default()
        },
        TestDecoder::default(),
    );
    loader.request(None);
    loader.cancel(None);
    assert_eq!(loader.state(), TileLoaderState::Canceled);

    let waiter = tokio::spawn({
        let loader = loader.clone();
        async move { loader.load_and_decode(None).await }
    });
    reach(&loader, TileLoaderState::Loading).await?;
    gate.notify_one();
    let state = timeout(PATIENCE, waiter).await??;

    assert_eq!(state, TileLoaderState::Ready);
    assert_eq!(loader.attempt(), 2);
    Ok(())
}

#[tokio::test]
async fn settled_loader_answers_immediately() -> Result<()> {
    let loader = loader(TestProvider::default(), TestDecoder::default());

    let state = timeout(PATIENCE, loader.wait_settled()).await?;

    assert_eq!(state, TileLoaderState::Initialized);
    Ok(())
}

#[tokio::test]
async fn priority_is_stored() {
    let loader = loader(TestProvider::default(), TestDecoder::default());
    loader.set_priority(4.5);
    assert_eq!(loader.priority(), 4.5);
}

#[tokio::test]
async fn clients_of_a_finished_load_do_not_hold_the_next_one() -> Result<()> {
    // ARRANGE
    let gate = Arc::new(Notify::new());
    let loader = loader(
        TestProvider {
            gate: Some(Arc::clone(&gate)),
            ..Default::default()
        },
        TestDecoder::default(),
    );
    gate.notify_one();
    let first = timeout(PATIENCE, loader.load_and_decode(Some(ClientId(1)))).await?;
    assert_eq!(first, TileLoaderState::Ready);

    // ACT
    loader.request(Some(ClientId(2)));
    loader.cancel(Some(ClientId(2)));

    // ASSERT
    assert_eq!(loader.state(), TileLoaderState::Canceled);
    let settled = timeout(PATIENCE, loader.wait_settled()).await?;
    assert_eq!(settled, TileLoaderState::Canceled);
    assert_eq!(loader.attempt(), 2);
    Ok(())
}

#[tokio::test]
async fn anonymous_cancel_works_after_a_named_load() -> Result<()> {
    let gate = Arc::new(Notify::new());
    let loader = loader(
        TestProvider {
            gate: Some(Arc::clone(&gate)),
            ..Default::default()
        },
        TestDecoder::default(),
    );
    gate.notify_one();
    timeout(PATIENCE, loader.load_and_decode(Some(ClientId(7)))).await?;

    loader.request(None);
    loader.cancel(None);

    assert_eq!(loader.state(), TileLoaderState::Canceled);
    Ok(())
}
