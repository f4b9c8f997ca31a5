//! catalogsync - diagnostics CLI for the catalog cache layer.
//!
//! Loads, reloads, clears and searches the cached catalogs using the same
//! configuration, session file and persistent cache as the console.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde_json::json;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use catalogsync_core::api::ApiClient;
use catalogsync_core::auth::FileSession;
use catalogsync_core::cache::{FileStorage, TtlStore};
use catalogsync_core::clock::SystemClock;
use catalogsync_core::events::{CatalogEvent, Subscription};
use catalogsync_core::menu::{count_items, MenuLoader};
use catalogsync_core::{ArticleCatalog, BrandCatalog, CatalogContext, Config, SubcategoryCatalog};

/// Directory for a daily rolling log file, in addition to stderr.
const LOG_DIR_ENV: &str = "CATALOGSYNC_LOG_DIR";

const USAGE: &str = "\
Usage: catalogsync <command>

Commands:
  status                     Cache status of every catalog
  load <catalog>             Load a catalog (memory, cache, then backend)
  reload <catalog>           Drop the cached copy and load from the backend
  clear <catalog>            Drop the cached copy
  search <catalog> <text>    Search a catalog by name
  menu                       Load the navigation menu

Catalogs: articles, brands, subcategories";

/// Initialize the tracing subscriber for logging
fn init_tracing() -> Option<WorkerGuard> {
    // RUST_LOG controls the level (e.g. RUST_LOG=catalogsync_core=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var_os(LOG_DIR_ENV) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(PathBuf::from(dir), "catalogsync.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

struct Services {
    articles: ArticleCatalog,
    brands: BrandCatalog,
    subcategories: SubcategoryCatalog,
    menu: MenuLoader,
    events: Subscription,
}

impl Services {
    fn build(config: &Config) -> Result<Self> {
        let cache_dir = config.cache_dir()?;

        let mut session = FileSession::new(cache_dir.clone());
        if !session.load()? {
            info!("No session file found; sending anonymous requests");
        }

        let client = ApiClient::from_config(config, Arc::new(session))
            .context("Failed to build HTTP client")?;
        let storage = FileStorage::new(cache_dir)?;
        let store =
            TtlStore::new(Arc::new(storage), Arc::new(SystemClock)).with_default_ttl(config.ttl_days);

        let ctx = CatalogContext::new(Arc::new(client), Arc::new(store));
        let events = ctx.events.subscribe();

        Ok(Self {
            articles: ArticleCatalog::new(ctx.clone()),
            brands: BrandCatalog::new(ctx.clone()),
            subcategories: SubcategoryCatalog::new(ctx.clone()),
            menu: MenuLoader::new(ctx),
            events,
        })
    }

    /// Logs what the cache layer reported since the last call.
    fn report_events(&mut self) {
        while let Ok(event) = self.events.receiver.try_recv() {
            match event {
                CatalogEvent::Decompressed { catalog, stats } => eprintln!(
                    "[{}] decoded {} payload: {} -> {} bytes in {:.1} ms",
                    catalog,
                    stats.algorithm,
                    stats.original_size,
                    stats.decompressed_size,
                    stats.processing_time_ms
                ),
                CatalogEvent::CacheHit { catalog, tier } => {
                    eprintln!("[{}] served from {:?} tier", catalog, tier)
                }
                CatalogEvent::RawResponse {
                    catalog,
                    status_code,
                    message,
                    ..
                } if status_code != 200 => {
                    eprintln!("[{}] backend answered {}: {}", catalog, status_code, message)
                }
                CatalogEvent::MenuUnavailable => {
                    eprintln!("No menu available: nothing cached and the backend is unreachable")
                }
                _ => {}
            }
        }
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(services: &mut Services, args: &[String]) -> Result<()> {
    let command = args.first().map(String::as_str);
    let catalog = args.get(1).map(String::as_str);

    match (command, catalog) {
        (Some("status"), _) => {
            let statuses = [
                ("articles", services.articles.get_cache_status()),
                ("brands", services.brands.get_cache_status()),
                ("subcategories", services.subcategories.get_cache_status()),
            ];
            for (name, status) in &statuses {
                match &status.persistent_info {
                    Some(info) => eprintln!(
                        "{}: cached {} ({:.1} days left)",
                        name, info.age, info.days_remaining
                    ),
                    None => eprintln!("{}: not cached", name),
                }
            }
            print_json(&json!({
                "articles": statuses[0].1,
                "brands": statuses[1].1,
                "subcategories": statuses[2].1,
            }))
        }
        (Some("load"), Some(name)) => {
            let count = match name {
                "articles" => services.articles.load_all_articles().await?.len(),
                "brands" => services.brands.load_all_brands().await?.len(),
                "subcategories" => services.subcategories.load_all_subcategories().await?.len(),
                other => bail!("Unknown catalog: {}", other),
            };
            println!("{}: {} records", name, count);
            Ok(())
        }
        (Some("reload"), Some(name)) => {
            let count = match name {
                "articles" => services.articles.reload().await?.len(),
                "brands" => services.brands.reload().await?.len(),
                "subcategories" => services.subcategories.reload().await?.len(),
                other => bail!("Unknown catalog: {}", other),
            };
            println!("{}: {} records", name, count);
            Ok(())
        }
        (Some("clear"), Some(name)) => {
            match name {
                "articles" => services.articles.clear_cache(),
                "brands" => services.brands.clear_cache(),
                "subcategories" => services.subcategories.clear_cache(),
                other => bail!("Unknown catalog: {}", other),
            }
            println!("{}: cache cleared", name);
            Ok(())
        }
        (Some("search"), Some(name)) => {
            let text = args.get(2..).map(|rest| rest.join(" ")).unwrap_or_default();
            match name {
                "articles" => print_json(&services.articles.search_articles(&text).await?),
                "brands" => print_json(&services.brands.search_brands(&text).await?),
                "subcategories" => {
                    print_json(&services.subcategories.search_subcategories(&text).await?)
                }
                other => bail!("Unknown catalog: {}", other),
            }
        }
        (Some("menu"), _) => {
            if let Some(task) = services.menu.initialize() {
                task.await?;
            }
            let menu = services.menu.get_current_menu();
            if let Some(reason) = services.menu.last_error() {
                eprintln!("Menu refresh failed: {}", reason);
            }
            eprintln!("{} menu items", count_items(&menu));
            print_json(menu.as_ref())
        }
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();
    info!("catalogsync starting");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = Config::load()?;
    let mut services = Services::build(&config)?;

    let result = run(&mut services, &args).await;
    services.report_events();
    result
}
