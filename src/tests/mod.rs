//! Cross-module scenarios: sync engine, scheduler and command surface
//! driven by the scripted source in `crate::testing`.

use std::sync::Arc;
use std::time::Duration;

use crate::runtime::SyncEngine;

#[cfg(test)]
mod commands;



/// Wait until the engine has installed at least generation `version`.
pub async fn wait_for_version(engine: &Arc<SyncEngine>, version: u64) {
    let mut rx = engine.subscribe();
    tokio::time::timeout(Duration::from_secs(5), async {
        while rx.borrow_and_update().version() < version {
            if rx.changed().await.is_err() {
                break;
            }
        }
    })
    .await
    .expect("timed out waiting for collection version");
}
