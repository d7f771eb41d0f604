//! Grid layout, folder and dock model for a home-screen launcher.
//!
//! [`LauncherRuntime`] owns the layout and is the only thing that mutates it.
//! Views read snapshots from it and listen for [`LayoutEvent`]s; host
//! integration enters through the `on_*` handlers.

pub mod config;
pub mod dock;
pub mod drag;
pub mod error;
pub mod events;
pub mod folder;
pub mod host;
pub mod launcher;
pub mod layout;
pub mod store;

pub use config::{DeviceType, LauncherConfig};
pub use error::{DockRejection, DropRejection, LayoutError, Notice, StoreError};
pub use events::{LayoutEvent, LayoutEventKind, Surface};
pub use launcher::{LauncherRuntime, LauncherState};
