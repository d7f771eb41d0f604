use super::LauncherRuntime;
use crate::dock::{DockItemKind, ItemMatcher};
use crate::error::{LayoutError, Notice};
use crate::events::{LayoutEvent, Surface};
use crate::host::TaskEvent;
use crate::layout::{ItemLocation, LayoutItem};
use log::{debug, info};
use std::collections::HashSet;

impl LauncherRuntime {
    /// A bundle was installed: place each of its abilities that is not
    /// already shown somewhere.
    pub fn on_app_added(&mut self, bundle_name: &str) -> bool {
        let mut next = self.state.clone();
        let mut events = Vec::new();
        for app in self.registry.apps_for_bundle(bundle_name) {
            let key = app.key_name();
            if next.is_placed(&key) {
                continue;
            }
            let badge = self.badges.get(bundle_name).copied().unwrap_or_default();
            let item = LayoutItem::app(&app.bundle_name, &app.ability_name, &app.module_name)
                .with_badge(badge);
            match next.desktop.insert(item) {
                Ok(position) => {
                    debug!("placed {} at {:?}", key, position);
                    events.push(LayoutEvent::ItemAdd {
                        key_name: key,
                        surface: Surface::Desktop,
                    });
                }
                Err(err) => {
                    let notice = err.notice();
                    self.reject("install placement", &err, notice);
                }
            }
        }
        if events.is_empty() {
            return false;
        }
        self.commit(next, events);
        true
    }

    /// A bundle was uninstalled: drop it from the desktop, every folder and
    /// the dock.
    pub fn on_app_removed(&mut self, bundle_name: &str) -> bool {
        self.badges.remove(bundle_name);
        let mut next = self.state.clone();
        let mut events = Vec::new();

        match self.folders.remove_bundle(&next.desktop, bundle_name) {
            Ok(desktop) => {
                if desktop != next.desktop {
                    events.push(LayoutEvent::ItemUpdate {
                        surface: Surface::Desktop,
                    });
                }
                next.desktop = desktop;
            }
            Err(err) => self.reject("uninstall sweep", &err, None),
        }
        for removed in next
            .desktop
            .remove_where(|item| item.is_app() && item.bundle_name == bundle_name)
        {
            events.push(LayoutEvent::ItemDelete {
                key_name: removed.key_name,
                surface: Surface::Desktop,
            });
        }
        let dock = self.dock.prune_bundle(&next.dock, bundle_name);
        for gone in next
            .dock
            .resident
            .iter()
            .filter(|item| !dock.contains_key(&item.key_name))
        {
            events.push(LayoutEvent::ItemDelete {
                key_name: gone.key_name.clone(),
                surface: Surface::Dock,
            });
        }
        let recent_changed = dock.recent != next.dock.recent;
        next.dock = dock;
        if recent_changed {
            events.push(LayoutEvent::ItemUpdate {
                surface: Surface::Dock,
            });
        }

        if events.is_empty() {
            return false;
        }
        info!("removed bundle {}", bundle_name);
        self.commit(next, events);
        true
    }

    /// A bundle was updated: refresh dock metadata and re-sync its abilities.
    pub fn on_app_updated(&mut self, bundle_name: &str) -> bool {
        let apps = self.registry.apps_for_bundle(bundle_name);
        let mut next = self.state.clone();
        for app in &apps {
            next.dock = self.dock.update_resident_app(&next.dock, app);
        }
        let changed = next != self.state;
        if changed {
            self.commit(
                next,
                vec![LayoutEvent::ItemUpdate {
                    surface: Surface::Dock,
                }],
            );
        }
        self.reconcile() || changed
    }

    pub fn on_badge_update(&mut self, bundle_name: &str, badge_number: u32) -> bool {
        self.badges.insert(bundle_name.to_string(), badge_number);
        let mut next = self.state.clone();
        next.desktop = self
            .folders
            .update_badge(&self.state.desktop, bundle_name, badge_number);
        next.dock = self
            .dock
            .update_badge(&self.state.dock, bundle_name, badge_number);
        if next == self.state {
            return false;
        }
        self.commit(
            next,
            vec![LayoutEvent::BadgeUpdate {
                bundle_name: bundle_name.to_string(),
                badge_number,
            }],
        );
        true
    }

    pub fn on_task_event(&mut self, event: TaskEvent) -> bool {
        debug!("task event {:?}", event);
        self.refresh_recent()
    }

    /// Puts an app on the desktop. An app pinned in the dock moves out of it.
    pub fn add_to_desktop(&mut self, item: LayoutItem) -> bool {
        if self.state.desktop.locate(&item.key_name).is_some() {
            self.reject(
                "add to desktop",
                &LayoutError::Duplicate(item.key_name.clone()),
                Some(Notice::DuplicateItem),
            );
            return false;
        }
        let mut next = self.state.clone();
        let mut events = Vec::new();
        if next.dock.contains_key(&item.key_name) {
            match self
                .dock
                .remove_resident(&next.dock, &ItemMatcher::key(&item.key_name))
            {
                Ok((dock, _)) => next.dock = dock,
                Err(rejection) => {
                    self.reject("add to desktop", &rejection, rejection.notice());
                    return false;
                }
            }
            events.push(LayoutEvent::ItemDelete {
                key_name: item.key_name.clone(),
                surface: Surface::Dock,
            });
        }
        let key = item.key_name.clone();
        if let Err(err) = next.desktop.insert(item) {
            let notice = err.notice();
            self.reject("add to desktop", &err, notice);
            return false;
        }
        events.push(LayoutEvent::ItemAdd {
            key_name: key,
            surface: Surface::Desktop,
        });
        self.commit(next, events);
        true
    }

    /// Removes a top-level desktop item. A folder returns its members to the desktop.
    pub fn remove_from_desktop(&mut self, key_name: &str) -> bool {
        let Some(item) = self.state.desktop.item(key_name) else {
            self.reject(
                "remove from desktop",
                &LayoutError::ItemNotFound(key_name.to_string()),
                None,
            );
            return false;
        };
        let result = match item.folder_id() {
            Some(folder_id) => self
                .folders
                .update_members(&self.state.desktop, folder_id, &[]),
            None => {
                let mut desktop = self.state.desktop.clone();
                desktop.remove(key_name);
                Ok(desktop)
            }
        };
        match result {
            Ok(desktop) => {
                let mut next = self.state.clone();
                next.desktop = desktop;
                self.commit(
                    next,
                    vec![LayoutEvent::ItemDelete {
                        key_name: key_name.to_string(),
                        surface: Surface::Desktop,
                    }],
                );
                true
            }
            Err(err) => {
                let notice = err.notice();
                self.reject("remove from desktop", &err, notice);
                false
            }
        }
    }

    /// Pins an app that is on the desktop or inside a folder.
    pub fn add_to_dock(&mut self, key_name: &str, index: Option<usize>) -> bool {
        let (item, location) = match self.state.desktop.locate(key_name) {
            Some(ItemLocation::Desktop) => match self.state.desktop.item(key_name) {
                Some(item) => (item.clone(), ItemLocation::Desktop),
                None => return false,
            },
            Some(ItemLocation::Folder(folder_id)) => {
                let member = self
                    .state
                    .desktop
                    .folder(&folder_id)
                    .and_then(LayoutItem::folder_data)
                    .and_then(|data| data.members().find(|m| m.key_name == key_name).cloned());
                match member {
                    Some(member) => (member, ItemLocation::Folder(folder_id)),
                    None => return false,
                }
            }
            None => {
                self.reject(
                    "add to dock",
                    &LayoutError::ItemNotFound(key_name.to_string()),
                    None,
                );
                return false;
            }
        };

        let mut next = self.state.clone();
        match self.dock.add_resident(&self.state.dock, &item, index) {
            Ok(dock) => next.dock = dock,
            Err(rejection) => {
                self.reject("add to dock", &rejection, rejection.notice());
                return false;
            }
        }
        let mut events = vec![LayoutEvent::ItemAdd {
            key_name: key_name.to_string(),
            surface: Surface::Dock,
        }];
        match location {
            ItemLocation::Desktop => {
                next.desktop.remove(key_name);
                events.push(LayoutEvent::ItemDelete {
                    key_name: key_name.to_string(),
                    surface: Surface::Desktop,
                });
            }
            ItemLocation::Folder(folder_id) => {
                match self.folders.remove_item(&next.desktop, key_name, &folder_id) {
                    Ok(removal) => next.desktop = removal.layout,
                    Err(err) => {
                        self.reject("add to dock", &err, None);
                        return false;
                    }
                }
                events.push(LayoutEvent::ItemDelete {
                    key_name: key_name.to_string(),
                    surface: Surface::Folder(folder_id),
                });
            }
        }
        self.commit(next, events);
        true
    }

    /// Unpins matching residents; removed apps go back to the desktop.
    pub fn remove_from_dock(&mut self, matcher: &ItemMatcher) -> bool {
        let (dock, removed) = match self.dock.remove_resident(&self.state.dock, matcher) {
            Ok(result) => result,
            Err(rejection) => {
                self.reject("remove from dock", &rejection, rejection.notice());
                return false;
            }
        };
        let mut next = self.state.clone();
        next.dock = dock;
        let mut events = Vec::new();
        for item in removed {
            events.push(LayoutEvent::ItemDelete {
                key_name: item.key_name.clone(),
                surface: Surface::Dock,
            });
            if item.kind != DockItemKind::App || next.desktop.locate(&item.key_name).is_some() {
                continue;
            }
            match next.desktop.insert(item.to_layout_item()) {
                Ok(_) => events.push(LayoutEvent::ItemAdd {
                    key_name: item.key_name,
                    surface: Surface::Desktop,
                }),
                Err(err) => {
                    let notice = err.notice();
                    self.reject("remove from dock", &err, notice);
                    return false;
                }
            }
        }
        self.commit(next, events);
        true
    }

    pub fn remove_recent(&mut self, matcher: &ItemMatcher) -> bool {
        match self.dock.remove_recent(&self.state.dock, matcher) {
            Ok(dock) => {
                let mut next = self.state.clone();
                next.dock = dock;
                self.commit(
                    next,
                    vec![LayoutEvent::ItemUpdate {
                        surface: Surface::Dock,
                    }],
                );
                true
            }
            Err(rejection) => {
                self.reject("remove recent", &rejection, rejection.notice());
                false
            }
        }
    }

    pub fn reorder_dock(&mut self, from: usize, to: usize) -> bool {
        match self.dock.reorder(&self.state.dock, from, to) {
            Ok(dock) => {
                if dock == self.state.dock {
                    return false;
                }
                let mut next = self.state.clone();
                next.dock = dock;
                self.commit(
                    next,
                    vec![LayoutEvent::ItemUpdate {
                        surface: Surface::Dock,
                    }],
                );
                true
            }
            Err(rejection) => {
                self.reject("reorder dock", &rejection, rejection.notice());
                false
            }
        }
    }

    pub fn create_folder(&mut self, key_a: &str, key_b: &str) -> Option<String> {
        match self.folders.create_folder(&self.state.desktop, key_a, key_b) {
            Ok((desktop, folder_id)) => {
                let mut next = self.state.clone();
                next.desktop = desktop;
                self.commit(
                    next,
                    vec![
                        LayoutEvent::ItemAdd {
                            key_name: folder_id.clone(),
                            surface: Surface::Desktop,
                        },
                        LayoutEvent::ItemDelete {
                            key_name: key_a.to_string(),
                            surface: Surface::Desktop,
                        },
                        LayoutEvent::ItemDelete {
                            key_name: key_b.to_string(),
                            surface: Surface::Desktop,
                        },
                    ],
                );
                Some(folder_id)
            }
            Err(err) => {
                let notice = err.notice();
                self.reject("create folder", &err, notice);
                None
            }
        }
    }

    /// Moves an app from the desktop or another folder into `folder_id`.
    pub fn add_to_folder(&mut self, key_name: &str, folder_id: &str) -> bool {
        let mut desktop = self.state.desktop.clone();
        let item = match desktop.locate(key_name) {
            Some(ItemLocation::Desktop) => desktop.item(key_name).cloned(),
            Some(ItemLocation::Folder(other)) if other == folder_id => {
                self.reject(
                    "add to folder",
                    &LayoutError::Duplicate(key_name.to_string()),
                    Some(Notice::DuplicateItem),
                );
                return false;
            }
            Some(ItemLocation::Folder(other)) => {
                match self.folders.remove_item(&desktop, key_name, &other) {
                    Ok(removal) => {
                        desktop = removal.layout;
                        Some(removal.removed)
                    }
                    Err(err) => {
                        self.reject("add to folder", &err, None);
                        return false;
                    }
                }
            }
            None => None,
        };
        let Some(item) = item else {
            self.reject(
                "add to folder",
                &LayoutError::ItemNotFound(key_name.to_string()),
                None,
            );
            return false;
        };
        match self.folders.add_item(&desktop, &item, folder_id) {
            Ok(desktop) => {
                let mut next = self.state.clone();
                next.desktop = desktop;
                self.commit(
                    next,
                    vec![
                        LayoutEvent::ItemAdd {
                            key_name: key_name.to_string(),
                            surface: Surface::Folder(folder_id.to_string()),
                        },
                        LayoutEvent::ItemUpdate {
                            surface: Surface::Desktop,
                        },
                    ],
                );
                true
            }
            Err(err) => {
                let notice = err.notice();
                self.reject("add to folder", &err, notice);
                false
            }
        }
    }

    /// Takes an app out of a folder and puts it on the desktop.
    pub fn remove_from_folder(&mut self, key_name: &str, folder_id: &str) -> bool {
        match self
            .folders
            .move_item_to_desktop(&self.state.desktop, key_name, folder_id, None)
        {
            Ok(desktop) => {
                let mut next = self.state.clone();
                next.desktop = desktop;
                self.commit(
                    next,
                    vec![
                        LayoutEvent::ItemDelete {
                            key_name: key_name.to_string(),
                            surface: Surface::Folder(folder_id.to_string()),
                        },
                        LayoutEvent::ItemAdd {
                            key_name: key_name.to_string(),
                            surface: Surface::Desktop,
                        },
                    ],
                );
                true
            }
            Err(err) => {
                let notice = err.notice();
                self.reject("remove from folder", &err, notice);
                false
            }
        }
    }

    pub fn rename_folder(&mut self, folder_id: &str, name: &str) -> bool {
        match self.folders.rename_folder(&self.state.desktop, folder_id, name) {
            Ok(desktop) => {
                let mut next = self.state.clone();
                next.desktop = desktop;
                self.commit(
                    next,
                    vec![LayoutEvent::ItemUpdate {
                        surface: Surface::Folder(folder_id.to_string()),
                    }],
                );
                true
            }
            Err(err) => {
                self.reject("rename folder", &err, None);
                false
            }
        }
    }

    pub fn update_folder_members(&mut self, folder_id: &str, selected: &[String]) -> bool {
        match self
            .folders
            .update_members(&self.state.desktop, folder_id, selected)
        {
            Ok(desktop) => {
                let mut next = self.state.clone();
                next.desktop = desktop;
                self.commit(
                    next,
                    vec![
                        LayoutEvent::ItemUpdate {
                            surface: Surface::Folder(folder_id.to_string()),
                        },
                        LayoutEvent::ItemUpdate {
                            surface: Surface::Desktop,
                        },
                    ],
                );
                true
            }
            Err(err) => {
                let notice = err.notice();
                self.reject("update folder members", &err, notice);
                false
            }
        }
    }

    /// Brings the layout in line with the registry: uninstalled apps leave,
    /// newly installed apps that are shown nowhere get a desktop slot.
    pub fn reconcile(&mut self) -> bool {
        let installed = self.registry.installed_apps();
        let keys: HashSet<String> = installed.iter().map(|app| app.key_name()).collect();
        let mut next = self.state.clone();

        let stale: Vec<(String, Option<String>)> = next
            .desktop
            .items
            .iter()
            .flat_map(|item| match item.folder_data() {
                Some(data) => data
                    .members()
                    .filter(|member| !keys.contains(&member.key_name))
                    .map(|member| (member.key_name.clone(), Some(data.folder_id.clone())))
                    .collect::<Vec<_>>(),
                None if item.is_app() && !keys.contains(&item.key_name) => {
                    vec![(item.key_name.clone(), None)]
                }
                None => Vec::new(),
            })
            .collect();
        for (key, folder_id) in &stale {
            match folder_id {
                Some(folder_id) if next.desktop.folder(folder_id).is_some() => {
                    match self.folders.remove_item(&next.desktop, key, folder_id) {
                        Ok(removal) => next.desktop = removal.layout,
                        Err(err) => self.reject("reconcile", &err, None),
                    }
                }
                _ => {
                    next.desktop.remove(key);
                }
            }
        }
        next.dock.resident.retain(|item| {
            item.kind != DockItemKind::App || keys.contains(&item.key_name)
        });

        for app in &installed {
            let key = app.key_name();
            if next.is_placed(&key) {
                continue;
            }
            let item = LayoutItem::app(&app.bundle_name, &app.ability_name, &app.module_name)
                .with_badge(self.badges.get(&app.bundle_name).copied().unwrap_or_default());
            if let Err(err) = next.desktop.insert(item) {
                self.reject("reconcile", &err, None);
            }
        }

        if next == self.state {
            return false;
        }
        info!(
            "reconciled layout: {} stale entries dropped",
            stale.len()
        );
        self.commit(
            next,
            vec![
                LayoutEvent::ItemUpdate {
                    surface: Surface::Desktop,
                },
                LayoutEvent::ItemUpdate {
                    surface: Surface::Dock,
                },
            ],
        );
        true
    }
}
