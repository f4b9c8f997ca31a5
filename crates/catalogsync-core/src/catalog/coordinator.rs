//! Tiered cache coordinator: memory, then persistent store, then remote.
//!
//! Each coordinator owns one catalog's memory snapshot and one persistent
//! key. Full loads are deduplicated through a shared in-flight future, and
//! every load carries the generation it was started under. A load that
//! resolves after a newer one was requested (by `reload` or `clear_cache`)
//! is discarded instead of overwriting fresher data.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::actions;
use crate::cache::PersistentInfo;
use crate::error::Result;
use crate::events::{CatalogEvent, Tier};

use super::filter::{self, Criterion, Filterable, QueryScope};
use super::{CatalogContext, FilterCriteria};

/// Bounds every catalog record type satisfies.
pub trait CatalogRecord:
    Filterable + Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> CatalogRecord for T where
    T: Filterable + Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

/// Static description of one catalog.
#[derive(Debug, Clone, Copy)]
pub struct CatalogSpec {
    /// Name used in logs and events.
    pub name: &'static str,
    pub endpoint_id: &'static str,
    /// Persistent key; must be unique across catalogs.
    pub storage_key: &'static str,
    /// A remote query must carry at least one of these.
    pub required_any: &'static [Criterion],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Empty,
    Loading,
    Loaded,
    /// Loaded, with a remote refresh in flight.
    Refreshing,
}

type Records<T> = Arc<Vec<T>>;
type LoadFuture<T> = Shared<BoxFuture<'static, Result<Records<T>>>>;

/// Mutable state of one coordinator. Only the coordinator touches it.
pub struct CacheState<T> {
    phase: LoadPhase,
    records: Option<Records<T>>,
    generation: u64,
    in_flight: Option<LoadFuture<T>>,
}

impl<T> Default for CacheState<T> {
    fn default() -> Self {
        Self {
            phase: LoadPhase::Empty,
            records: None,
            generation: 0,
            in_flight: None,
        }
    }
}

impl<T> CacheState<T> {
    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Starts a new generation; anything in flight becomes stale.
    fn supersede(&mut self) -> u64 {
        self.generation += 1;
        self.in_flight = None;
        self.generation
    }

    fn reset(&mut self) {
        self.supersede();
        self.records = None;
        self.phase = LoadPhase::Empty;
    }

    fn settled_phase(&self) -> LoadPhase {
        if self.records.is_some() {
            LoadPhase::Loaded
        } else {
            LoadPhase::Empty
        }
    }
}

/// Read-only projection for consumers and diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatus {
    pub is_loaded: bool,
    pub record_count: usize,
    pub persistent_info: Option<PersistentInfo>,
}

/// How a load fills the memory tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadSource {
    /// Persistent store first, remote on miss.
    PersistentFirst,
    RemoteOnly,
}

pub struct CatalogCoordinator<T> {
    spec: CatalogSpec,
    ctx: CatalogContext,
    state: Arc<Mutex<CacheState<T>>>,
}

impl<T> Clone for CatalogCoordinator<T> {
    fn clone(&self) -> Self {
        Self {
            spec: self.spec,
            ctx: self.ctx.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: CatalogRecord> CatalogCoordinator<T> {
    pub fn new(spec: CatalogSpec, ctx: CatalogContext) -> Self {
        Self {
            spec,
            ctx,
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    pub fn spec(&self) -> &CatalogSpec {
        &self.spec
    }

    pub fn context(&self) -> &CatalogContext {
        &self.ctx
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<T>> {
        lock_state(&self.state)
    }

    pub fn phase(&self) -> LoadPhase {
        self.lock().phase
    }

    pub fn is_cache_loaded(&self) -> bool {
        self.lock().records.is_some()
    }

    /// Memory-resident records, if loaded.
    pub fn snapshot(&self) -> Option<Records<T>> {
        self.lock().records.clone()
    }

    /// Full catalog load: memory, then persistent store, then remote.
    ///
    /// Concurrent callers share one in-flight load.
    pub async fn load_all(&self) -> Result<Records<T>> {
        let pending = {
            let mut state = self.lock();
            if let Some(records) = &state.records {
                debug!(catalog = self.spec.name, "Memory cache hit");
                self.ctx.events.publish(CatalogEvent::CacheHit {
                    catalog: self.spec.name.to_string(),
                    tier: Tier::Memory,
                });
                return Ok(Arc::clone(records));
            }
            match state.in_flight.clone() {
                Some(pending) => {
                    debug!(catalog = self.spec.name, "Joining in-flight load");
                    pending
                }
                None => self.start_load(&mut state, LoadSource::PersistentFirst),
            }
        };
        pending.await
    }

    /// Drops both tiers and loads from the remote, bypassing the
    /// persistent store.
    pub async fn reload(&self) -> Result<Records<T>> {
        let pending = {
            let mut state = self.lock();
            state.reset();
            self.ctx.store.remove(self.spec.storage_key);
            info!(catalog = self.spec.name, generation = state.generation, "Reloading catalog");
            self.start_load(&mut state, LoadSource::RemoteOnly)
        };
        pending.await
    }

    /// Fetches a fresh copy from the remote while the current snapshot
    /// keeps serving reads.
    pub async fn refresh(&self) -> Result<Records<T>> {
        let pending = {
            let mut state = self.lock();
            match state.in_flight.clone() {
                Some(pending) => pending,
                None => self.start_load(&mut state, LoadSource::RemoteOnly),
            }
        };
        pending.await
    }

    /// Clears both tiers without touching the remote. In-flight loads are
    /// discarded when they resolve.
    pub fn clear_cache(&self) {
        let mut state = self.lock();
        state.reset();
        self.ctx.store.remove(self.spec.storage_key);
        info!(catalog = self.spec.name, "Cache cleared");
    }

    /// Filtered records.
    ///
    /// Served locally when the catalog is resident. Otherwise a scoped remote
    /// `select` is issued and its result returned without being cached.
    pub async fn query(&self, criteria: &FilterCriteria) -> Result<Vec<T>> {
        if let Some(records) = self.snapshot() {
            filter::validate(criteria, self.spec.required_any, QueryScope::Local)?;
            return Ok(filter::apply(&records, criteria));
        }

        filter::validate(criteria, self.spec.required_any, QueryScope::Remote)?;
        let records: Option<Vec<T>> = self
            .ctx
            .fetch_payload(self.spec.name, self.spec.endpoint_id, actions::SELECT, criteria)
            .await?;
        Ok(records.unwrap_or_default())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<T>> {
        if let Some(records) = self.snapshot() {
            return Ok(records.iter().find(|r| r.record_id() == id).cloned());
        }
        let matches = self.query(&FilterCriteria::default().with_id(id)).await?;
        Ok(matches.into_iter().find(|r| r.record_id() == id))
    }

    pub fn get_cache_status(&self) -> CacheStatus {
        let (is_loaded, record_count) = {
            let state = self.lock();
            (
                state.records.is_some(),
                state.records.as_ref().map(|r| r.len()).unwrap_or(0),
            )
        };
        CacheStatus {
            is_loaded,
            record_count,
            persistent_info: self.ctx.store.get_info(self.spec.storage_key),
        }
    }

    /// Registers a new in-flight load under a fresh generation. Must run
    /// under the state lock so concurrent callers see it.
    fn start_load(&self, state: &mut CacheState<T>, source: LoadSource) -> LoadFuture<T> {
        let generation = state.supersede();
        state.phase = if state.records.is_some() {
            LoadPhase::Refreshing
        } else {
            LoadPhase::Loading
        };

        let load = run_load(
            self.spec,
            self.ctx.clone(),
            Arc::clone(&self.state),
            generation,
            source,
        )
        .boxed()
        .shared();
        state.in_flight = Some(load.clone());
        load
    }
}

fn lock_state<T>(state: &Mutex<CacheState<T>>) -> MutexGuard<'_, CacheState<T>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn run_load<T: CatalogRecord>(
    spec: CatalogSpec,
    ctx: CatalogContext,
    state: Arc<Mutex<CacheState<T>>>,
    generation: u64,
    source: LoadSource,
) -> Result<Records<T>> {
    if source == LoadSource::PersistentFirst {
        if let Some(records) = ctx.store.get::<Vec<T>>(spec.storage_key) {
            debug!(catalog = spec.name, count = records.len(), "Persistent cache hit");
            ctx.events.publish(CatalogEvent::CacheHit {
                catalog: spec.name.to_string(),
                tier: Tier::Persistent,
            });
            return Ok(commit(&spec, &ctx, &state, generation, records, false));
        }
        ctx.events.publish(CatalogEvent::CacheMiss {
            catalog: spec.name.to_string(),
        });
    }

    let fetched = ctx
        .fetch_payload::<Vec<T>>(
            spec.name,
            spec.endpoint_id,
            actions::FULL_LOAD,
            &FilterCriteria::default(),
        )
        .await;

    match fetched {
        Ok(Some(records)) => {
            ctx.events.publish(CatalogEvent::CacheHit {
                catalog: spec.name.to_string(),
                tier: Tier::Remote,
            });
            Ok(commit(&spec, &ctx, &state, generation, records, true))
        }
        Ok(None) => {
            warn!(catalog = spec.name, "Full load returned no data; cache left unchanged");
            settle(&state, generation);
            Ok(Arc::new(Vec::new()))
        }
        Err(e) => {
            warn!(catalog = spec.name, error = %e, "Full load failed");
            settle(&state, generation);
            Err(e)
        }
    }
}

/// Installs `records` if `generation` is still current. A superseded load
/// hands its records back to its own callers but leaves both tiers alone.
fn commit<T: CatalogRecord>(
    spec: &CatalogSpec,
    ctx: &CatalogContext,
    state: &Mutex<CacheState<T>>,
    generation: u64,
    records: Vec<T>,
    persist: bool,
) -> Records<T> {
    let records = Arc::new(records);
    let mut state = lock_state(state);
    if state.generation != generation {
        info!(
            catalog = spec.name,
            generation = generation,
            current = state.generation,
            "Discarding superseded load"
        );
        ctx.events.publish(CatalogEvent::LoadDiscarded {
            catalog: spec.name.to_string(),
            generation,
            current: state.generation,
        });
        return records;
    }

    if persist {
        ctx.store.set(spec.storage_key, records.as_slice());
    }
    state.records = Some(Arc::clone(&records));
    state.phase = LoadPhase::Loaded;
    state.in_flight = None;
    debug!(catalog = spec.name, count = records.len(), generation = generation, "Catalog loaded");
    records
}

/// Ends a load that produced nothing to install.
fn settle<T>(state: &Mutex<CacheState<T>>, generation: u64) {
    let mut state = lock_state(state);
    if state.generation == generation {
        state.in_flight = None;
        state.phase = state.settled_phase();
    }
}
