//! Dependency-trigger invalidation
//!
//! Entries register against dependency names at population time; one
//! invalidation signal (a webhook, say) evicts all of them without the
//! caller knowing their cache keys.

use skp_delivery_cache::prelude::*;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Listing {
    section: String,
    article_ids: Vec<u64>,
}

impl Freshness for Listing {}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cache = DeliveryCache::new(MemoryStore::new(MemoryConfig::default()));

    // Both listings include article 7, so both register against it.
    for section in ["front-page", "tech"] {
        cache
            .get_or_add_with(
                &format!("listing:{section}"),
                || async {
                    Ok(Listing {
                        section: section.to_string(),
                        article_ids: vec![7, 11],
                    })
                },
                |_| true,
                |listing| {
                    listing
                        .article_ids
                        .iter()
                        .map(|id| format!("article:{id}"))
                        .collect()
                },
            )
            .await?;
    }

    // Article 7 changed upstream; every listing that referenced it goes.
    let evicted = cache.invalidate_dependency("article:7").await?;
    println!("evicted {evicted} entries");

    let gone: Option<Listing> = cache.try_get("listing:front-page").await?;
    println!("front-page after invalidation: {gone:?}");

    Ok(())
}
