//! Desktop grid data model and placement engine.

mod desktop;
pub mod grid;
mod item;

pub use desktop::{DesktopLayout, ItemLocation};
pub use grid::{LayoutIssue, Placement};
pub use item::{make_key_name, Area, FolderData, GridPosition, GridSpec, ItemKind, LayoutItem};
