//! Stale-while-revalidate loader for the navigation menu.
//!
//! `initialize` publishes the last persisted menu right away and always
//! starts a background fetch. A successful fetch replaces whatever was shown.
//! A failed fetch keeps a shown menu (degraded mode) or, with nothing to
//! show, publishes an empty menu and raises `MenuUnavailable` once.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::api::actions;
use crate::catalog::{CatalogContext, FilterCriteria};
use crate::error::Result;
use crate::events::{CatalogEvent, MenuSource};

use super::tree::{count_items, render_menu, MenuItem, RawMenuNode};

pub const MENU_STORAGE_KEY: &str = "menu_tree";
pub const MENU_ENDPOINT_ID: &str = "menu";

const CATALOG_NAME: &str = "menu";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuPhase {
    Init,
    /// A persisted menu is shown while the first fetch runs.
    ShowingCache,
    Loading,
    Ready,
    /// The last fetch failed. The menu may still hold a cached copy.
    Error,
}

struct MenuState {
    phase: MenuPhase,
    menu: Arc<Vec<MenuItem>>,
    initialized: bool,
    loading: bool,
    last_error: Option<String>,
    generation: u64,
    unavailable_raised: bool,
}

impl Default for MenuState {
    fn default() -> Self {
        Self {
            phase: MenuPhase::Init,
            menu: Arc::new(Vec::new()),
            initialized: false,
            loading: false,
            last_error: None,
            generation: 0,
            unavailable_raised: false,
        }
    }
}

#[derive(Clone)]
pub struct MenuLoader {
    ctx: CatalogContext,
    state: Arc<Mutex<MenuState>>,
}

impl MenuLoader {
    pub fn new(ctx: CatalogContext) -> Self {
        Self {
            ctx,
            state: Arc::new(Mutex::new(MenuState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MenuState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Shows the cached menu and starts the background refresh.
    ///
    /// Returns the refresh task, or `None` when already initialized.
    pub fn initialize(&self) -> Option<JoinHandle<()>> {
        {
            let mut state = self.lock();
            if state.initialized {
                debug!("Menu loader already initialized");
                return None;
            }
            state.initialized = true;
        }

        let cached = self
            .ctx
            .store
            .get::<Vec<MenuItem>>(MENU_STORAGE_KEY)
            .filter(|menu| !menu.is_empty());

        if let Some(menu) = cached {
            let menu = Arc::new(menu);
            {
                let mut state = self.lock();
                state.menu = Arc::clone(&menu);
                state.phase = MenuPhase::ShowingCache;
                state.loading = false;
            }
            info!(items = count_items(&menu), "Showing cached menu");
            self.ctx.events.publish(CatalogEvent::MenuPublished {
                menu,
                source: MenuSource::Cache,
            });
        }

        let generation = self.begin_fetch();
        let loader = self.clone();
        Some(tokio::spawn(async move {
            // Failures are already recorded in the loader state.
            let _ = loader.refresh(generation, false).await;
        }))
    }

    /// Forces a fresh fetch; on success republishes and requests a repaint.
    /// Does not count as initialization.
    pub async fn reload_menu(&self) -> Result<Arc<Vec<MenuItem>>> {
        let generation = self.begin_fetch();
        self.refresh(generation, true).await
    }

    pub async fn update_menu_on_login(&self) -> Result<Arc<Vec<MenuItem>>> {
        info!("Refreshing menu for new session");
        self.reload_menu().await
    }

    pub fn get_current_menu(&self) -> Arc<Vec<MenuItem>> {
        Arc::clone(&self.lock().menu)
    }

    pub fn has_menu(&self) -> bool {
        !self.lock().menu.is_empty()
    }

    /// True while nothing is shown and a fetch is running.
    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    pub fn phase(&self) -> MenuPhase {
        self.lock().phase
    }

    /// Reason of the last failed fetch, cleared by a successful one.
    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    fn begin_fetch(&self) -> u64 {
        let mut state = self.lock();
        state.generation += 1;
        if state.phase != MenuPhase::ShowingCache {
            state.phase = MenuPhase::Loading;
        }
        state.loading = state.menu.is_empty();
        state.generation
    }

    async fn refresh(&self, generation: u64, repaint: bool) -> Result<Arc<Vec<MenuItem>>> {
        let fetched = self
            .ctx
            .fetch_payload::<Vec<RawMenuNode>>(
                CATALOG_NAME,
                MENU_ENDPOINT_ID,
                actions::LOAD_MENU,
                &FilterCriteria::default(),
            )
            .await;

        match fetched {
            Ok(Some(raw)) => Ok(self.publish_fetched(generation, render_menu(&raw), repaint)),
            Ok(None) => {
                self.record_failure(generation, "backend returned no menu".to_string());
                Ok(self.get_current_menu())
            }
            Err(e) => {
                self.record_failure(generation, e.to_string());
                Err(e)
            }
        }
    }

    fn publish_fetched(&self, generation: u64, menu: Vec<MenuItem>, repaint: bool) -> Arc<Vec<MenuItem>> {
        let menu = Arc::new(menu);
        {
            let mut state = self.lock();
            if state.generation != generation {
                debug!(generation = generation, current = state.generation, "Discarding superseded menu fetch");
                return menu;
            }
            self.ctx.store.set(MENU_STORAGE_KEY, menu.as_slice());
            state.menu = Arc::clone(&menu);
            state.phase = MenuPhase::Ready;
            state.loading = false;
            state.last_error = None;
            state.unavailable_raised = false;
        }

        info!(items = count_items(&menu), "Menu refreshed from backend");
        self.ctx.events.publish(CatalogEvent::MenuPublished {
            menu: Arc::clone(&menu),
            source: MenuSource::Remote,
        });
        if repaint {
            self.ctx.events.publish(CatalogEvent::RepaintRequested);
        }
        menu
    }

    fn record_failure(&self, generation: u64, reason: String) {
        let raise = {
            let mut state = self.lock();
            if state.generation != generation {
                return;
            }
            state.phase = MenuPhase::Error;
            state.loading = false;
            state.last_error = Some(reason.clone());
            if !state.menu.is_empty() {
                false
            } else {
                let raise = !state.unavailable_raised;
                state.unavailable_raised = true;
                raise
            }
        };

        if !raise {
            warn!(reason = %reason, "Menu fetch failed; keeping current menu");
            return;
        }

        error!(reason = %reason, "No menu available");
        self.ctx.events.publish(CatalogEvent::MenuPublished {
            menu: Arc::new(Vec::new()),
            source: MenuSource::Empty,
        });
        self.ctx.events.publish(CatalogEvent::MenuUnavailable);
    }
}
