//! Navigation menu: tree rendering and the stale-while-revalidate loader.

pub mod loader;
pub mod tree;

pub use loader::{MenuLoader, MenuPhase, MENU_ENDPOINT_ID, MENU_STORAGE_KEY};
pub use tree::{count_items, render_menu, MenuItem, RawMenuNode};
