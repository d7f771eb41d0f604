//! Durable layout descriptor and the stores that hold it.

use crate::config::LauncherConfig;
use crate::dock::{DockItem, DockLists};
use crate::error::StoreError;
use crate::layout::{DesktopLayout, GridSpec, LayoutItem};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

const LAYOUT_FILE: &str = "layout.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDescription {
    pub page_count: u32,
    pub row: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedLayout {
    /// Absent in documents written before versioning, which reads as 0.
    #[serde(default)]
    pub version: u32,
    pub layout_description: LayoutDescription,
    #[serde(default)]
    pub layout_info: Vec<LayoutItem>,
    #[serde(default)]
    pub resident: Vec<DockItem>,
}

impl PersistedLayout {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new(desktop: &DesktopLayout, dock: &DockLists) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            layout_description: LayoutDescription {
                page_count: desktop.page_count,
                row: desktop.grid.rows,
                column: desktop.grid.columns,
            },
            layout_info: desktop.items.clone(),
            resident: dock.resident.clone(),
        }
    }

    pub fn grid(&self) -> GridSpec {
        GridSpec::new(self.layout_description.column, self.layout_description.row)
    }

    pub fn needs_migration(&self) -> bool {
        self.version < Self::CURRENT_VERSION
    }

    /// Version 0 documents carry the same fields; only the tag changes.
    pub fn migrate(&mut self) {
        self.version = Self::CURRENT_VERSION;
    }

    fn checked(mut self) -> Result<Self, StoreError> {
        if self.version > Self::CURRENT_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: self.version,
                supported: Self::CURRENT_VERSION,
            });
        }
        if self.needs_migration() {
            info!("migrating layout from version {}", self.version);
            self.migrate();
        }
        Ok(self)
    }
}

pub trait LayoutStore {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<PersistedLayout>, StoreError>;
    fn save(&self, layout: &PersistedLayout) -> Result<(), StoreError>;
}

impl<T: LayoutStore + ?Sized> LayoutStore for Rc<T> {
    fn load(&self) -> Result<Option<PersistedLayout>, StoreError> {
        (**self).load()
    }

    fn save(&self, layout: &PersistedLayout) -> Result<(), StoreError> {
        (**self).save(layout)
    }
}

pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn open_default() -> Option<Self> {
        LauncherConfig::config_dir().map(|dir| Self::at(dir.join(LAYOUT_FILE)))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LayoutStore for JsonFileStore {
    fn load(&self) -> Result<Option<PersistedLayout>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let file = std::fs::File::open(&self.path)?;
        let layout: PersistedLayout = serde_json::from_reader(std::io::BufReader::new(file))?;
        layout.checked().map(Some)
    }

    fn save(&self, layout: &PersistedLayout) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let mut writer = std::io::BufWriter::new(std::fs::File::create(&tmp)?);
        serde_json::to_writer_pretty(&mut writer, layout)?;
        writer.flush()?;
        std::fs::rename(&tmp, &self.path)?;
        debug!("layout saved to {}", self.path.display());
        Ok(())
    }
}

/// Keeps the serialized document in memory. Writes can be made to fail.
#[derive(Debug, Default)]
pub struct MemoryStore {
    contents: RefCell<Option<String>>,
    fail_writes: Cell<bool>,
    writes: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(json: &str) -> Self {
        Self {
            contents: RefCell::new(Some(json.to_string())),
            ..Self::default()
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.borrow().clone()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// Successful saves so far.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }
}

impl LayoutStore for MemoryStore {
    fn load(&self) -> Result<Option<PersistedLayout>, StoreError> {
        match self.contents.borrow().as_deref() {
            None => Ok(None),
            Some(json) => serde_json::from_str::<PersistedLayout>(json)?
                .checked()
                .map(Some),
        }
    }

    fn save(&self, layout: &PersistedLayout) -> Result<(), StoreError> {
        if self.fail_writes.get() {
            return Err(StoreError::Unavailable);
        }
        *self.contents.borrow_mut() = Some(serde_json::to_string(layout)?);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Area;
    use pretty_assertions::assert_eq;

    fn sample() -> PersistedLayout {
        let mut folder = LayoutItem::folder("f", "New folder 1", Area::UNIT).at(0, 0, 1);
        folder.folder_data_mut().unwrap().layout_info =
            vec![vec![LayoutItem::app("x", "", ""), LayoutItem::app("y", "", "")]];
        let desktop = DesktopLayout::from_items(
            GridSpec::new(5, 6),
            vec![LayoutItem::app("a", "", "").at(0, 0, 0), folder],
        );
        PersistedLayout::new(&desktop, &DockLists::default())
    }

    #[test]
    fn file_store_round_trip() {
        let dir = std::env::temp_dir().join(format!("launcher_layout_store_test_{}", std::process::id()));
        let store = JsonFileStore::at(dir.join("layout.json"));
        assert!(store.load().unwrap().is_none());
        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample()));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unversioned_documents_are_migrated() {
        let store = MemoryStore::with_contents(
            r#"{"layoutDescription":{"pageCount":1,"row":6,"column":5},
                "layoutInfo":[{"keyName":"a","typeId":"app"}]}"#,
        );
        let layout = store.load().unwrap().unwrap();
        assert_eq!(layout.version, PersistedLayout::CURRENT_VERSION);
        assert_eq!(layout.layout_info.len(), 1);
        assert_eq!(layout.grid(), GridSpec::new(5, 6));
    }

    #[test]
    fn newer_versions_are_rejected() {
        let store = MemoryStore::with_contents(
            r#"{"version":9,"layoutDescription":{"pageCount":1,"row":6,"column":5}}"#,
        );
        assert!(matches!(
            store.load(),
            Err(StoreError::UnsupportedVersion { found: 9, supported: 1 })
        ));
        assert!(matches!(
            MemoryStore::with_contents("{oops").load(),
            Err(StoreError::Json(_))
        ));
    }

    #[test]
    fn failing_writes_leave_previous_contents() {
        let store = MemoryStore::new();
        store.save(&sample()).unwrap();
        let before = store.contents();
        store.set_fail_writes(true);
        assert!(matches!(store.save(&sample()), Err(StoreError::Unavailable)));
        assert_eq!(store.contents(), before);
        assert_eq!(store.writes(), 1);
    }
}
