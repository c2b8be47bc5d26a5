//! Redis-backed cache
//!
//! Requires a running Redis instance:
//! ```sh
//! cargo run --example redis_store --features redis
//! ```

use skp_delivery_cache::prelude::*;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Article {
    id: u64,
    title: String,
    partial: bool,
}

impl Freshness for Article {
    fn has_stale_content(&self) -> bool {
        self.partial
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let store = RedisStore::new(RedisConfig::new("redis://127.0.0.1:6379").prefix("demo")).await?;
    let cache = DeliveryCache::new(store);

    let article = cache
        .get_or_add_with(
            "article:1",
            || async {
                Ok(Article {
                    id: 1,
                    title: "Hello from Redis".into(),
                    partial: false,
                })
            },
            |_| true,
            |_| vec!["article:1".to_string()],
        )
        .await?;
    println!("stored: {}", article.title);

    // Invalidations performed by any process sharing this Redis database
    // are picked up here through the trigger records.
    cache.invalidate_dependency("article:1").await?;
    let after: Option<Article> = cache.try_get("article:1").await?;
    println!("after invalidation: {after:?}");

    Ok(())
}
