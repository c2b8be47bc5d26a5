//! Basic read-through usage with the memory store

use skp_delivery_cache::prelude::*;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Article {
    id: u64,
    title: String,
}

impl Freshness for Article {}

async fn fetch_article(id: u64) -> Result<Article> {
    // Stands in for an HTTP call to a content API.
    Ok(Article {
        id,
        title: format!("Article #{id}"),
    })
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cache = DeliveryCache::new(MemoryStore::new(MemoryConfig::default()));

    // First call misses and runs the factory.
    let article = cache
        .get_or_add("article:42", || fetch_article(42))
        .await?;
    println!("fetched: {} ({})", article.title, article.id);

    // Second call is served from cache; the factory never runs.
    let cached: Article = cache
        .get_or_add("article:42", || async {
            unreachable!("served from cache")
        })
        .await?;
    println!("cached:  {} ({})", cached.title, cached.id);

    // Non-populating lookups are available too.
    let peeked: Option<Article> = cache.try_get("article:42").await?;
    println!("try_get: {:?}", peeked.map(|a| a.title));

    Ok(())
}
