//! Single-flight coalescing under contention
//!
//! Twenty tasks race on the same cold key; the factory runs once and every
//! task observes the same result.

use skp_delivery_cache::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Snapshot {
    revision: u64,
}

impl Freshness for Snapshot {}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cache = Arc::new(DeliveryCache::new(MemoryStore::new(MemoryConfig::default())));
    let fetches = Arc::new(AtomicU64::new(0));

    let mut handles = Vec::new();
    for task in 0..20 {
        let cache = cache.clone();
        let fetches = fetches.clone();
        handles.push(tokio::spawn(async move {
            let snapshot = cache
                .get_or_add("snapshot", || async move {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    let revision = fetches.fetch_add(1, Ordering::SeqCst) + 1;
                    Ok(Snapshot { revision })
                })
                .await
                .unwrap();
            println!("task {task:2} got revision {}", snapshot.revision);
        }));
    }

    for handle in handles {
        handle.await?;
    }

    println!("factory ran {} time(s)", fetches.load(Ordering::SeqCst));
    Ok(())
}
