use crate::dock::{DockLists, DockManager};
use crate::host::AppInfo;
use crate::layout::{DesktopLayout, GridSpec, LayoutIssue, LayoutItem};
use crate::store::PersistedLayout;
use log::warn;
use std::collections::HashSet;

/// Everything the views render: the desktop pages and the dock lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherState {
    pub desktop: DesktopLayout,
    pub dock: DockLists,
}

impl LauncherState {
    /// First-run layout: the preset dock, then every other installed app in
    /// registry order.
    pub fn fresh(grid: GridSpec, installed: &[AppInfo], dock: &DockManager) -> Self {
        let resident = dock.preset_residents(installed);
        let pinned: HashSet<&str> = resident.iter().map(|item| item.key_name.as_str()).collect();
        let mut desktop = DesktopLayout::new(grid);
        for app in installed {
            if pinned.contains(app.key_name().as_str()) || desktop.item(&app.key_name()).is_some() {
                continue;
            }
            let item = LayoutItem::app(&app.bundle_name, &app.ability_name, &app.module_name);
            if let Err(err) = desktop.insert(item) {
                warn!("could not place {}: {}", app.key_name(), err);
            }
        }
        Self {
            desktop,
            dock: DockLists {
                resident,
                recent: Vec::new(),
            },
        }
    }

    /// Rebuilds the state from a stored document, refusing anything that
    /// breaks the layout invariants for `grid`.
    pub fn from_persisted(layout: PersistedLayout, grid: GridSpec) -> Result<Self, Vec<LayoutIssue>> {
        if layout.grid() != grid {
            return Err(vec![LayoutIssue::GridMismatch {
                expected: grid,
                found: layout.grid(),
            }]);
        }
        let desktop = DesktopLayout::from_items(grid, layout.layout_info);
        let mut issues = desktop.issues();

        let mut seen = HashSet::new();
        for item in &layout.resident {
            if !seen.insert(item.key_name.as_str()) || desktop.locate(&item.key_name).is_some() {
                issues.push(LayoutIssue::DuplicateKey(item.key_name.clone()));
            }
        }
        if !issues.is_empty() {
            return Err(issues);
        }
        Ok(Self {
            desktop,
            dock: DockLists {
                resident: layout.resident,
                recent: Vec::new(),
            },
        })
    }

    pub fn snapshot(&self) -> PersistedLayout {
        PersistedLayout::new(&self.desktop, &self.dock)
    }

    /// Whether `key_name` is on the desktop, in a folder or pinned.
    pub fn is_placed(&self, key_name: &str) -> bool {
        self.desktop.locate(key_name).is_some() || self.dock.contains_key(key_name)
    }

    pub fn is_consistent(&self) -> bool {
        self.desktop.page_count >= 1
            && self.desktop.folder_badges_consistent()
            && self.desktop.issues().is_empty()
            && self
                .dock
                .resident
                .iter()
                .all(|item| self.desktop.locate(&item.key_name).is_none())
    }

    /// Drops repeated app keys (the dock and earlier entries win), dissolves
    /// folders left with fewer than two members, recomputes folder badges and
    /// moves overlapping items to free cells.
    pub fn repair(&mut self) {
        self.drop_repeated_keys();
        self.dissolve_undersized_folders();
        self.desktop.recompute_folder_badges();
        let mut guard = self.desktop.items.len();
        while let Some((_, second)) = self.desktop.find_overlap() {
            let key = second.key_name.clone();
            if let Some(item) = self.desktop.take(&key) {
                if let Err(err) = self.desktop.insert(item) {
                    warn!("dropping unplaceable item {}: {}", key, err);
                }
            }
            guard = guard.saturating_sub(1);
            if guard == 0 {
                break;
            }
        }
        self.desktop.compact();
    }

    fn drop_repeated_keys(&mut self) {
        let mut seen: HashSet<String> = self
            .dock
            .resident
            .iter()
            .map(|item| item.key_name.clone())
            .collect();
        self.desktop.items.retain(|item| {
            let keep = !item.is_app() || seen.insert(item.key_name.clone());
            if !keep {
                warn!("dropping repeated desktop entry {}", item.key_name);
            }
            keep
        });
        for data in self.desktop.items.iter_mut().filter_map(LayoutItem::folder_data_mut) {
            for page in &mut data.layout_info {
                page.retain(|member| member.is_add_sentinel() || seen.insert(member.key_name.clone()));
            }
            data.layout_info.retain(|page| !page.is_empty());
        }
    }

    fn dissolve_undersized_folders(&mut self) {
        let undersized: Vec<String> = self
            .desktop
            .folders()
            .filter(|folder| folder.folder_data().is_some_and(|data| data.member_count() < 2))
            .map(|folder| folder.key_name.clone())
            .collect();
        for key in undersized {
            let Some(folder) = self.desktop.take(&key) else {
                continue;
            };
            let survivor = folder
                .folder_data()
                .and_then(|data| data.members().next())
                .map(LayoutItem::as_plain_app);
            if let Some(mut survivor) = survivor {
                survivor.set_position(folder.position());
                self.desktop.items.push(survivor);
            }
            warn!("dissolved undersized folder {}", key);
        }
    }
}
