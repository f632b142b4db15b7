//! Explicit caches injected into the clients.
//!
//! Listings are memoized per [`CallSignature`]; an entry lives until it is
//! invalidated, the cache is cleared, or an optional TTL elapses. Expired
//! entries are evicted when a lookup finds them and on every insert. Concurrent
//! misses on the same signature may each fetch; the last write wins.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rax_models::{Format, Listing, MethodValidation, Payment, PaymentMethod, Refund, Void};
use tokio::sync::RwLock;

/// Identifies one memoizable list call: resource path plus body formats.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallSignature {
    /// Request path, e.g. `/v1/accounts/123/methods`.
    pub path: String,
    /// Request body format.
    pub request: Format,
    /// Response body format.
    pub response: Format,
}

impl CallSignature {
    /// A JSON-in, JSON-out signature for `path`.
    #[must_use]
    pub fn json(path: impl Into<String>) -> Self {
        Self::new(path, Format::Json, Format::Json)
    }

    /// A signature for `path` with explicit formats.
    #[must_use]
    pub fn new(path: impl Into<String>, request: Format, response: Format) -> Self {
        Self {
            path: path.into(),
            request,
            response,
        }
    }
}

#[derive(Debug)]
struct CachedListing<T> {
    listing: Arc<Listing<T>>,
    stored_at: Instant,
}

/// Memoized listings of one resource type.
#[derive(Debug)]
pub struct ListingCache<T> {
    ttl: Option<Duration>,
    entries: RwLock<HashMap<CallSignature, CachedListing<T>>>,
}

impl<T> Default for ListingCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ListingCache<T> {
    /// A cache whose entries live until invalidated.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ttl: None,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// A cache whose entries also expire after `ttl`.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Self::new()
        }
    }

    /// Returns the cached listing for `signature` if present and fresh.
    ///
    /// A stale entry found here is evicted.
    pub async fn get(&self, signature: &CallSignature) -> Option<Arc<Listing<T>>> {
        {
            let guard = self.entries.read().await;
            let entry = guard.get(signature)?;
            if self.is_fresh(entry) {
                return Some(Arc::clone(&entry.listing));
            }
        }
        let mut guard = self.entries.write().await;
        // Another task may have refreshed the entry between the two locks.
        if guard.get(signature).is_some_and(|entry| !self.is_fresh(entry)) {
            guard.remove(signature);
        }
        None
    }

    /// Stores a listing and returns the shared handle to it.
    ///
    /// With a TTL, every expired entry is evicted first.
    pub async fn insert(&self, signature: CallSignature, listing: Listing<T>) -> Arc<Listing<T>> {
        let listing = Arc::new(listing);
        let mut guard = self.entries.write().await;
        if self.ttl.is_some() {
            guard.retain(|_, entry| self.is_fresh(entry));
        }
        guard.insert(
            signature,
            CachedListing {
                listing: Arc::clone(&listing),
                stored_at: Instant::now(),
            },
        );
        listing
    }

    /// Number of stored entries, fresh or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn is_fresh(&self, entry: &CachedListing<T>) -> bool {
        self.ttl.is_none_or(|ttl| entry.stored_at.elapsed() < ttl)
    }

    /// Returns the cached listing, or runs `fetch` and caches its result.
    ///
    /// Failed fetches are not cached.
    ///
    /// # Errors
    ///
    /// Returns whatever `fetch` returns.
    pub async fn get_or_try_insert<E, F>(
        &self,
        signature: CallSignature,
        fetch: F,
    ) -> Result<Arc<Listing<T>>, E>
    where
        F: Future<Output = Result<Listing<T>, E>>,
    {
        if let Some(listing) = self.get(&signature).await {
            return Ok(listing);
        }

        #[cfg(feature = "telemetry")]
        tracing::debug!(path = %signature.path, "rax.listing_cache_miss");

        let listing = fetch.await?;
        Ok(self.insert(signature, listing).await)
    }

    /// Drops the entry for one signature.
    pub async fn invalidate(&self, signature: &CallSignature) {
        self.entries.write().await.remove(signature);
    }

    /// Drops every entry.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

/// Records of created resources, in creation order, keyed by id.
#[derive(Debug)]
pub struct Registry<T> {
    entries: RwLock<Vec<(String, T)>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }
}

impl<T: Clone> Registry<T> {
    /// Records `value` under `id`, replacing an earlier record with the
    /// same id.
    pub async fn record(&self, id: impl Into<String>, value: T) {
        let id = id.into();
        let mut guard = self.entries.write().await;
        match guard.iter_mut().find(|(existing, _)| *existing == id) {
            Some(slot) => slot.1 = value,
            None => guard.push((id, value)),
        }
    }

    /// The earliest record.
    pub async fn first(&self) -> Option<(String, T)> {
        self.entries.read().await.first().cloned()
    }

    /// Looks a record up by id.
    pub async fn get(&self, id: &str) -> Option<T> {
        self.entries
            .read()
            .await
            .iter()
            .find(|(key, _)| key == id)
            .map(|(_, value)| value.clone())
    }

    /// Number of records.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing has been recorded.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Forgets every record.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

/// Identity tokens keyed by user section.
#[derive(Debug, Default)]
pub struct TokenCache {
    tokens: RwLock<HashMap<String, String>>,
}

impl TokenCache {
    /// The cached token for `section`.
    pub async fn get(&self, section: &str) -> Option<String> {
        self.tokens.read().await.get(section).cloned()
    }

    /// Stores a token for `section`.
    pub async fn insert(&self, section: impl Into<String>, token: impl Into<String>) {
        self.tokens.write().await.insert(section.into(), token.into());
    }

    /// Drops the token for `section`.
    pub async fn invalidate(&self, section: &str) {
        self.tokens.write().await.remove(section);
    }

    /// Drops every token.
    pub async fn clear(&self) {
        self.tokens.write().await.clear();
    }
}

/// Every resource cache a subsystem client uses, shared behind an `Arc`.
#[derive(Debug, Default)]
pub struct SessionCache {
    /// Payment-method listings.
    pub methods: ListingCache<PaymentMethod>,
    /// Payment listings.
    pub payments: ListingCache<Payment>,
    /// Void listings.
    pub voids: ListingCache<Void>,
    /// Refund listings.
    pub refunds: ListingCache<Refund>,
    /// Method validations created during the session.
    pub validations: Registry<MethodValidation>,
}

impl SessionCache {
    /// A session cache whose listings never expire.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A session cache whose listings expire after `ttl`.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            methods: ListingCache::with_ttl(ttl),
            payments: ListingCache::with_ttl(ttl),
            voids: ListingCache::with_ttl(ttl),
            refunds: ListingCache::with_ttl(ttl),
            validations: Registry::default(),
        }
    }

    /// Drops every cached listing and recorded validation.
    pub async fn clear(&self) {
        self.methods.clear().await;
        self.payments.clear().await;
        self.voids.clear().await;
        self.refunds.clear().await;
        self.validations.clear().await;
    }
}
