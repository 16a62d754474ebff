//! Collection refresh and per-service deduplication of refreshes.

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;

use crate::discovery::types::{CollectionInfo, ServiceInfo};
use crate::error::{DavError, Result};
use crate::webdav::client::WebDavClient;
use crate::webdav::location::ResourceLocation;
use crate::webdav::types::PropfindPurpose;

/// Re-reads home sets and collections of an already discovered service.
#[derive(Debug, Clone)]
pub struct CollectionRefresher {
    client: WebDavClient,
}

impl CollectionRefresher {
    pub fn new(client: WebDavClient) -> Self {
        Self { client }
    }

    /// Refresh `info` in place of the stored one.
    ///
    /// Home sets are re-read from the principal (when known) and replace the
    /// stored ones; every home set is then listed with depth 1. Collections
    /// outside all old and new home sets, such as a calendar URL the user
    /// typed in, are kept as they are. A home set that no longer exists is
    /// dropped along with its collections; other failures abort the refresh.
    pub async fn refresh(&self, mut info: ServiceInfo) -> Result<ServiceInfo> {
        let service = info.service;
        let previous_home_sets = info.home_sets.clone();

        if let Some(principal) = &info.principal {
            let result = self
                .client
                .propfind(principal, PropfindPurpose::HomeSetLookup)
                .await?;
            // The principal's answer replaces the stored home sets; without
            // the property the old ones stay.
            if let Some(resource) = result
                .into_single()
                .filter(|r| r.properties.contains(&service.home_set_property()))
            {
                let mut fresh = BTreeSet::new();
                for href in resource.properties.home_set(service) {
                    match resource.location.resolve(href) {
                        Ok(home) => {
                            fresh.insert(home.as_collection());
                        }
                        Err(err) => tracing::debug!(href, error = %err, "ignoring home set"),
                    }
                }
                info.home_sets = fresh;
            }
        }

        let mut collections = BTreeMap::new();
        let mut home_sets = BTreeSet::new();
        for home in &info.home_sets {
            let listing = match self
                .client
                .propfind(home, PropfindPurpose::MemberEnumeration(service))
                .await
            {
                Ok(listing) => listing,
                Err(DavError::NotFound) => {
                    tracing::warn!(url = %home, "home set disappeared");
                    continue;
                }
                Err(err) => return Err(err),
            };
            home_sets.insert(home.clone());

            for member in &listing.members {
                if let Some(collection) =
                    CollectionInfo::from_properties(&member.location, &member.properties, service)
                {
                    collections.insert(collection.location.clone(), collection);
                }
            }
        }

        for (location, collection) in info.collections {
            let managed = home_sets
                .iter()
                .chain(&previous_home_sets)
                .any(|home| is_direct_member(home, &location));
            if !managed && !collections.contains_key(&location) {
                collections.insert(location, collection);
            }
        }

        tracing::debug!(
            service = service.as_str(),
            home_sets = home_sets.len(),
            collections = collections.len(),
            "collections refreshed"
        );
        info.home_sets = home_sets;
        info.collections = collections;
        Ok(info)
    }
}

fn is_direct_member(home: &ResourceLocation, location: &ResourceLocation) -> bool {
    location
        .as_str()
        .strip_prefix(home.as_str())
        .is_some_and(|rest| !rest.is_empty() && !rest.trim_end_matches('/').contains('/'))
}

/// Lifecycle notifications published by a [`RefreshRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshEvent<K> {
    /// A refresh was requested. `joined` is true when the request attached to
    /// one already in flight and started no work of its own.
    Started { id: K, joined: bool },
    /// The refresh cycle ended, once per cycle.
    Finished { id: K, success: bool },
}

/// Outcome shared between everyone waiting on the same refresh.
pub type RefreshOutcome<T> = std::result::Result<T, Arc<DavError>>;

type InFlight<T> = Shared<BoxFuture<'static, RefreshOutcome<T>>>;

/// Guarantees at most one refresh per service id at a time.
///
/// A request for an id that is already refreshing waits for the running
/// refresh and returns its outcome. Listeners subscribe to a broadcast of
/// [`RefreshEvent`]s; [`is_refreshing`](Self::is_refreshing) answers for
/// listeners that arrive late.
pub struct RefreshRegistry<K, T> {
    in_flight: Arc<Mutex<HashMap<K, InFlight<T>>>>,
    events: broadcast::Sender<RefreshEvent<K>>,
}

impl<K, T> fmt::Debug for RefreshRegistry<K, T>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("RefreshRegistry")
            .field("in_flight", &in_flight.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<K, T> Clone for RefreshRegistry<K, T> {
    fn clone(&self) -> Self {
        Self {
            in_flight: Arc::clone(&self.in_flight),
            events: self.events.clone(),
        }
    }
}

impl<K, T> Default for RefreshRegistry<K, T>
where
    K: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> RefreshRegistry<K, T>
where
    K: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent<K>> {
        self.events.subscribe()
    }

    pub fn is_refreshing(&self, id: &K) -> bool {
        self.lock().contains_key(id)
    }

    /// Run the refresh produced by `start` unless one is already running for
    /// `id`, in which case `start` is not called and the running refresh is
    /// awaited instead. `start` runs under the registry lock and must not call
    /// back into the registry.
    ///
    /// The refresh runs as its own task: dropping every waiter does not stop
    /// it, and the cycle still ends with one `Finished` event.
    pub async fn refresh<F, Fut>(&self, id: K, start: F) -> RefreshOutcome<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let work = {
            let mut in_flight = self.lock();
            let joined = in_flight.contains_key(&id);
            let work = match in_flight.get(&id) {
                Some(running) => {
                    tracing::debug!(?id, "refresh already running, joining");
                    running.clone()
                }
                None => {
                    tracing::debug!(?id, "refresh started");
                    let work = self.spawn_cycle(id.clone(), start());
                    in_flight.insert(id.clone(), work.clone());
                    work
                }
            };
            // Sent under the lock so it always precedes the matching Finished.
            let _ = self.events.send(RefreshEvent::Started { id, joined });
            work
        };
        work.await
    }

    fn spawn_cycle<Fut>(&self, id: K, fut: Fut) -> InFlight<T>
    where
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let mut cycle = Cycle {
            id: Some(id),
            in_flight: Arc::clone(&self.in_flight),
            events: self.events.clone(),
        };
        let task = tokio::spawn(async move {
            let outcome = fut.await.map_err(Arc::new);
            if let Err(err) = &outcome {
                tracing::warn!(id = ?cycle.id, error = %err, "refresh failed");
            }
            cycle.finish(outcome.is_ok());
            outcome
        });

        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(err) => Err(Arc::new(DavError::RefreshAborted(err.to_string()))),
            }
        }
        .boxed()
        .shared()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<K, InFlight<T>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Bookkeeping of one refresh cycle. Dropped unfinished (the task panicked
/// or the runtime shut down), it still clears the entry and reports failure.
struct Cycle<K, T>
where
    K: Eq + Hash + fmt::Debug,
{
    id: Option<K>,
    in_flight: Arc<Mutex<HashMap<K, InFlight<T>>>>,
    events: broadcast::Sender<RefreshEvent<K>>,
}

impl<K, T> Cycle<K, T>
where
    K: Eq + Hash + fmt::Debug,
{
    fn finish(&mut self, success: bool) {
        let Some(id) = self.id.take() else {
            return;
        };
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        tracing::debug!(?id, success, "refresh finished");
        let _ = self.events.send(RefreshEvent::Finished { id, success });
    }
}

impl<K, T> Drop for Cycle<K, T>
where
    K: Eq + Hash + fmt::Debug,
{
    fn drop(&mut self) {
        self.finish(false);
    }
}
