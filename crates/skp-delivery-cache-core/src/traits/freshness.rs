//! Freshness capability for cached values

/// Capability trait for values that can report stale content
///
/// The cache manager inspects this flag once, at population time, to pick
/// the expiration policy: values with stale content get the shorter
/// absolute expiration, everything else gets the sliding default.
///
/// Values are fresh unless they say otherwise, so for types without a
/// staleness notion an empty impl is enough:
///
/// ```rust
/// use skp_delivery_cache_core::Freshness;
///
/// #[derive(serde::Serialize, serde::Deserialize)]
/// struct Article {
///     id: u64,
///     body: String,
/// }
///
/// impl Freshness for Article {}
/// ```
pub trait Freshness {
    /// Whether the value contains content known to be not fully current
    fn has_stale_content(&self) -> bool {
        false
    }
}

impl<T: Freshness> Freshness for Option<T> {
    fn has_stale_content(&self) -> bool {
        self.as_ref().is_some_and(Freshness::has_stale_content)
    }
}

impl<T: Freshness> Freshness for Vec<T> {
    fn has_stale_content(&self) -> bool {
        self.iter().any(Freshness::has_stale_content)
    }
}
