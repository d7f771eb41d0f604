//! Resident (pinned) and recent dock lists.

use crate::config::{DeviceType, DockPreset, LauncherConfig};
use crate::error::DockRejection;
use crate::host::{AppInfo, RecentTask};
use crate::layout::{make_key_name, LayoutItem};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Number of leading resident slots that cannot be moved on pads.
const PAD_LOCKED_SLOTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum DockItemKind {
    #[default]
    App,
    /// Fixed launcher slot such as the recents button.
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockItem {
    pub key_name: String,
    pub bundle_name: String,
    #[serde(default)]
    pub ability_name: String,
    #[serde(default)]
    pub module_name: String,
    #[serde(default)]
    pub app_name: String,
    #[serde(default)]
    pub kind: DockItemKind,
    #[serde(default = "default_editable")]
    pub editable: bool,
    #[serde(default)]
    pub badge_number: u32,
}

fn default_editable() -> bool {
    true
}

impl DockItem {
    pub fn from_app(app: &AppInfo) -> Self {
        Self {
            key_name: app.key_name(),
            bundle_name: app.bundle_name.clone(),
            ability_name: app.ability_name.clone(),
            module_name: app.module_name.clone(),
            app_name: app.app_name.clone(),
            kind: DockItemKind::App,
            editable: true,
            badge_number: 0,
        }
    }

    fn from_layout_item(item: &LayoutItem) -> Self {
        Self {
            key_name: item.key_name.clone(),
            bundle_name: item.bundle_name.clone(),
            ability_name: item.ability_name.clone(),
            module_name: item.module_name.clone(),
            app_name: String::new(),
            kind: DockItemKind::App,
            editable: true,
            badge_number: item.badge_number,
        }
    }

    /// The desktop form of this entry, unplaced.
    pub fn to_layout_item(&self) -> LayoutItem {
        LayoutItem::app(&self.bundle_name, &self.ability_name, &self.module_name)
            .with_badge(self.badge_number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentItem {
    pub key_name: String,
    pub bundle_name: String,
    pub app_name: String,
    pub badge_number: u32,
    pub mission_ids: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockLists {
    pub resident: Vec<DockItem>,
    /// Derived from running tasks; never persisted.
    #[serde(skip)]
    pub recent: Vec<RecentItem>,
}

impl DockLists {
    pub fn contains_key(&self, key_name: &str) -> bool {
        self.resident.iter().any(|item| item.key_name == key_name)
    }
}

/// Selects dock entries by bundle name, or by key name when no bundle is given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemMatcher {
    pub bundle_name: Option<String>,
    pub key_name: Option<String>,
}

impl ItemMatcher {
    pub fn bundle(bundle_name: &str) -> Self {
        Self {
            bundle_name: Some(bundle_name.to_string()),
            key_name: None,
        }
    }

    pub fn key(key_name: &str) -> Self {
        Self {
            bundle_name: None,
            key_name: Some(key_name.to_string()),
        }
    }

    fn matches(&self, bundle_name: &str, key_name: &str) -> bool {
        match (&self.bundle_name, &self.key_name) {
            (Some(bundle), _) => bundle == bundle_name,
            (None, Some(key)) => key == key_name,
            (None, None) => false,
        }
    }
}

pub struct DockManager {
    max_dock_num: usize,
    max_recent_num: usize,
    device: DeviceType,
    presets: Vec<DockPreset>,
}

impl DockManager {
    pub fn new(config: &LauncherConfig) -> Self {
        Self {
            max_dock_num: config.max_dock_num,
            max_recent_num: config.max_recent_num,
            device: config.device,
            presets: config.dock_preset.clone(),
        }
    }

    pub fn max_dock_num(&self) -> usize {
        self.max_dock_num
    }

    /// Pins an app. `index` past the end (or absent) appends.
    pub fn add_resident(
        &self,
        lists: &DockLists,
        item: &LayoutItem,
        index: Option<usize>,
    ) -> Result<DockLists, DockRejection> {
        if !item.is_app() {
            return Err(DockRejection::Unsupported);
        }
        if lists.resident.len() >= self.max_dock_num {
            return Err(DockRejection::Full);
        }
        if lists.contains_key(&item.key_name) {
            return Err(DockRejection::Duplicate);
        }
        if self.device == DeviceType::Pad && index.is_some_and(|index| index < PAD_LOCKED_SLOTS) {
            return Err(DockRejection::Locked);
        }
        let mut next = lists.clone();
        let entry = DockItem::from_layout_item(item);
        match index {
            Some(index) if index < next.resident.len() => next.resident.insert(index, entry),
            _ => next.resident.push(entry),
        }
        debug!("pinned {} to dock", item.key_name);
        Ok(next)
    }

    pub fn remove_resident(
        &self,
        lists: &DockLists,
        matcher: &ItemMatcher,
    ) -> Result<(DockLists, Vec<DockItem>), DockRejection> {
        let found = lists
            .resident
            .iter()
            .find(|item| matcher.matches(&item.bundle_name, &item.key_name))
            .ok_or(DockRejection::NotFound)?;
        if !found.editable {
            return Err(DockRejection::NotEditable);
        }
        let mut next = lists.clone();
        let (removed, kept) = std::mem::take(&mut next.resident)
            .into_iter()
            .partition(|item| matcher.matches(&item.bundle_name, &item.key_name));
        next.resident = kept;
        Ok((next, removed))
    }

    pub fn remove_recent(
        &self,
        lists: &DockLists,
        matcher: &ItemMatcher,
    ) -> Result<DockLists, DockRejection> {
        if !lists
            .recent
            .iter()
            .any(|item| matcher.matches(&item.bundle_name, &item.key_name))
        {
            return Err(DockRejection::NotFound);
        }
        let mut next = lists.clone();
        next.recent
            .retain(|item| !matcher.matches(&item.bundle_name, &item.key_name));
        Ok(next)
    }

    /// Moves the resident at `from` toward `to`.
    ///
    /// Moving right inserts at `to` before removing `from`, so the item ends
    /// up at `to - 1`; moving left ends at `to`. `to` is clamped to the list
    /// length and `from == to` changes nothing. On pads the first two slots
    /// are fixed.
    pub fn reorder(
        &self,
        lists: &DockLists,
        from: usize,
        to: usize,
    ) -> Result<DockLists, DockRejection> {
        if from >= lists.resident.len() {
            return Err(DockRejection::NotFound);
        }
        let to = to.min(lists.resident.len());
        if self.device == DeviceType::Pad && (from < PAD_LOCKED_SLOTS || to < PAD_LOCKED_SLOTS) {
            return Err(DockRejection::Locked);
        }
        let mut next = lists.clone();
        let resident = &mut next.resident;
        if from < to {
            let item = resident[from].clone();
            resident.insert(to, item);
            resident.remove(from);
        } else if from > to {
            let item = resident.remove(from);
            resident.insert(to, item);
        }
        Ok(next)
    }

    /// Rebuilds the recent list from live tasks, newest first. Phones have no
    /// recent list.
    pub fn refresh_recent(&self, lists: &DockLists, tasks: &[RecentTask]) -> DockLists {
        let mut next = lists.clone();
        if self.device != DeviceType::Pad {
            next.recent.clear();
            return next;
        }
        next.recent = tasks
            .iter()
            .take(self.max_recent_num)
            .map(|task| RecentItem {
                key_name: make_key_name(&task.bundle_name, &task.ability_name, &task.module_name),
                bundle_name: task.bundle_name.clone(),
                app_name: task.app_name.clone(),
                badge_number: lists
                    .recent
                    .iter()
                    .find(|item| item.bundle_name == task.bundle_name)
                    .map(|item| item.badge_number)
                    .unwrap_or_default(),
                mission_ids: task.mission_ids.clone(),
            })
            .collect();
        next
    }

    /// Replaces (never patches) every resident and recent entry of the bundle.
    pub fn update_badge(&self, lists: &DockLists, bundle_name: &str, badge_number: u32) -> DockLists {
        DockLists {
            resident: lists
                .resident
                .iter()
                .map(|item| {
                    if item.bundle_name == bundle_name {
                        DockItem {
                            badge_number,
                            ..item.clone()
                        }
                    } else {
                        item.clone()
                    }
                })
                .collect(),
            recent: lists
                .recent
                .iter()
                .map(|item| {
                    if item.bundle_name == bundle_name {
                        RecentItem {
                            badge_number,
                            ..item.clone()
                        }
                    } else {
                        item.clone()
                    }
                })
                .collect(),
        }
    }

    /// Refreshes resident metadata after an app update.
    pub fn update_resident_app(&self, lists: &DockLists, app: &AppInfo) -> DockLists {
        let mut next = lists.clone();
        for item in next
            .resident
            .iter_mut()
            .filter(|item| item.kind == DockItemKind::App && item.bundle_name == app.bundle_name)
        {
            *item = DockItem {
                editable: item.editable,
                badge_number: item.badge_number,
                ..DockItem::from_app(app)
            };
        }
        next
    }

    /// Drops every app entry of an uninstalled bundle.
    pub fn prune_bundle(&self, lists: &DockLists, bundle_name: &str) -> DockLists {
        let mut next = lists.clone();
        next.resident
            .retain(|item| item.kind != DockItemKind::App || item.bundle_name != bundle_name);
        next.recent.retain(|item| item.bundle_name != bundle_name);
        next
    }

    /// First-run resident list. Preset apps that are not installed are skipped.
    pub fn preset_residents(&self, installed: &[AppInfo]) -> Vec<DockItem> {
        let mut residents = Vec::new();
        for preset in &self.presets {
            if residents.len() >= self.max_dock_num {
                warn!("dock preset longer than max_dock_num, truncating");
                break;
            }
            if preset.system {
                residents.push(DockItem {
                    key_name: make_key_name(
                        &preset.bundle_name,
                        &preset.ability_name,
                        &preset.module_name,
                    ),
                    bundle_name: preset.bundle_name.clone(),
                    ability_name: preset.ability_name.clone(),
                    module_name: preset.module_name.clone(),
                    app_name: preset.app_name.clone().unwrap_or_default(),
                    kind: DockItemKind::System,
                    editable: preset.editable,
                    badge_number: 0,
                });
                continue;
            }
            let Some(app) = installed
                .iter()
                .find(|app| app.bundle_name == preset.bundle_name)
            else {
                info!("preset dock app {} is not installed", preset.bundle_name);
                continue;
            };
            let item = DockItem {
                editable: preset.editable,
                ..DockItem::from_app(app)
            };
            if residents.iter().any(|r: &DockItem| r.key_name == item.key_name) {
                continue;
            }
            residents.push(item);
        }
        residents
    }
}
