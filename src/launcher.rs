//! Root controller owning the layout state and every manager that edits it.

mod drop;
mod handlers;
mod state;

pub use state::LauncherState;

use crate::config::LauncherConfig;
use crate::dock::{DockLists, DockManager};
use crate::drag::DragCoordinator;
use crate::error::Notice;
use crate::events::{EventBus, LayoutEvent, LayoutEventKind, SubscriberError, SubscriptionId, Surface};
use crate::folder::FolderManager;
use crate::host::{AppRegistry, TaskSource};
use crate::layout::LayoutItem;
use crate::store::LayoutStore;
use crossbeam_channel::Receiver;
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::fmt::Display;

/// Single owner of the launcher layout.
///
/// Each handler reads the current state, computes the next one through the
/// managers, and commits it in one step: the new state replaces the old one,
/// is written to the store and announced on the event bus. A rejected
/// operation leaves the state untouched and may leave a [`Notice`] for the
/// user.
pub struct LauncherRuntime {
    config: LauncherConfig,
    folders: FolderManager,
    dock: DockManager,
    drag: DragCoordinator,
    bus: EventBus,
    store: Box<dyn LayoutStore>,
    registry: Box<dyn AppRegistry>,
    tasks: Option<Box<dyn TaskSource>>,
    state: LauncherState,
    badges: HashMap<String, u32>,
    notice: Option<Notice>,
}

impl LauncherRuntime {
    pub fn new(
        config: LauncherConfig,
        store: Box<dyn LayoutStore>,
        registry: Box<dyn AppRegistry>,
    ) -> Self {
        let folders = FolderManager::new(&config);
        let dock = DockManager::new(&config);
        let drag = DragCoordinator::new(&config);
        let grid = config.desktop_grid();

        let state = match store.load() {
            Ok(Some(persisted)) => match LauncherState::from_persisted(persisted, grid) {
                Ok(state) => {
                    info!("restored layout with {} pages", state.desktop.page_count);
                    Some(state)
                }
                Err(issues) => {
                    warn!("stored layout rejected, rebuilding: {:?}", issues);
                    None
                }
            },
            Ok(None) => {
                info!("no stored layout, building default");
                None
            }
            Err(err) => {
                warn!("failed to load layout, rebuilding: {}", err);
                None
            }
        };
        let rebuilt = state.is_none();
        let state = state
            .unwrap_or_else(|| LauncherState::fresh(grid, &registry.installed_apps(), &dock));

        let mut runtime = Self {
            config,
            folders,
            dock,
            drag,
            bus: EventBus::new(),
            store,
            registry,
            tasks: None,
            state,
            badges: HashMap::new(),
            notice: None,
        };
        let reconciled = runtime.reconcile();
        if rebuilt && !reconciled {
            runtime.persist();
        }
        runtime
    }

    pub fn with_task_source(mut self, tasks: Box<dyn TaskSource>) -> Self {
        self.tasks = Some(tasks);
        self.refresh_recent();
        self
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    pub fn state(&self) -> &LauncherState {
        &self.state
    }

    pub fn desktop_pages(&self) -> Vec<Vec<LayoutItem>> {
        self.state.desktop.pages()
    }

    pub fn dock_lists(&self) -> &DockLists {
        &self.state.dock
    }

    pub fn folder_interior(&self, folder_id: &str) -> Option<Vec<Vec<LayoutItem>>> {
        self.state
            .desktop
            .folder(folder_id)
            .and_then(LayoutItem::folder_data)
            .map(|data| data.layout_info.clone())
    }

    /// Interior pages as the open-folder view shows them, ending with the Add tile.
    pub fn open_folder(&self, folder_id: &str) -> Option<Vec<Vec<LayoutItem>>> {
        self.state
            .desktop
            .folder(folder_id)
            .map(|folder| self.folders.interior_with_add(folder))
    }

    /// Latest user-facing notice, cleared on read.
    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    pub fn subscribe<F>(&mut self, kinds: &[LayoutEventKind], callback: F) -> SubscriptionId
    where
        F: FnMut(&LayoutEvent) -> Result<(), SubscriberError> + 'static,
    {
        self.bus.subscribe(kinds, callback)
    }

    pub fn subscribe_channel(
        &mut self,
        kinds: &[LayoutEventKind],
    ) -> (SubscriptionId, Receiver<LayoutEvent>) {
        self.bus.subscribe_channel(kinds)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Replaces the state, writes it through and notifies subscribers.
    fn commit(&mut self, mut next: LauncherState, events: Vec<LayoutEvent>) {
        let consistent = next.is_consistent();
        debug_assert!(consistent, "layout invariants violated: {:?}", next.desktop.items);
        if !consistent {
            error!("layout invariants violated, repairing");
            next.repair();
        }
        self.state = next;
        self.drag
            .update_slot_boundaries(self.state.dock.resident.len());
        self.persist();
        for event in &events {
            self.bus.publish(event);
        }
    }

    fn persist(&mut self) {
        if let Err(err) = self.store.save(&self.state.snapshot()) {
            error!("failed to persist layout: {}", err);
        }
    }

    fn reject(&mut self, action: &str, err: &dyn Display, notice: Option<Notice>) {
        match notice {
            Some(notice) => {
                info!("{} rejected: {} ({})", action, err, notice.message());
                self.notice = Some(notice);
            }
            None => warn!("{} ignored: {}", action, err),
        }
    }

    fn refresh_recent(&mut self) -> bool {
        let Some(tasks) = &self.tasks else {
            return false;
        };
        let mut dock = self
            .dock
            .refresh_recent(&self.state.dock, &tasks.recent_bundle_tasks());
        for item in &mut dock.recent {
            if let Some(&badge) = self.badges.get(&item.bundle_name) {
                item.badge_number = badge;
            }
        }
        if dock == self.state.dock {
            return false;
        }
        debug!("recent list now has {} entries", dock.recent.len());
        self.state.dock = dock;
        self.bus.publish(&LayoutEvent::ItemUpdate {
            surface: Surface::Dock,
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceType;
    use crate::dock::ItemMatcher;
    use crate::drag::{DragSource, DropTarget, DropZone, Point, Rect};
    use crate::host::{AppInfo, RecentTask, StaticRegistry, StaticTasks, TaskEvent};
    use crate::layout::GridPosition;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::rc::Rc;

    fn apps(names: &[&str]) -> Vec<AppInfo> {
        names
            .iter()
            .map(|name| AppInfo::new(name, "", "", name))
            .collect()
    }

    fn launcher(
        config: LauncherConfig,
        names: &[&str],
    ) -> (LauncherRuntime, Rc<MemoryStore>, Rc<StaticRegistry>) {
        let store = Rc::new(MemoryStore::new());
        let registry = Rc::new(StaticRegistry::new(apps(names)));
        let runtime = LauncherRuntime::new(config, Box::new(store.clone()), Box::new(registry.clone()));
        (runtime, store, registry)
    }

    fn dock_keys(runtime: &LauncherRuntime) -> Vec<String> {
        runtime
            .dock_lists()
            .resident
            .iter()
            .map(|item| item.key_name.clone())
            .collect()
    }

    #[test]
    fn first_run_places_apps_and_persists() {
        let (runtime, store, _) = launcher(LauncherConfig::default(), &["a", "b", "c"]);
        let pages = runtime.desktop_pages();
        assert_eq!(pages.len(), 1);
        assert_eq!(
            pages[0].iter().map(|i| i.position()).collect::<Vec<_>>(),
            vec![
                GridPosition::new(0, 0, 0),
                GridPosition::new(0, 0, 1),
                GridPosition::new(0, 0, 2)
            ]
        );
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn create_folder_replaces_both_apps() {
        let (mut runtime, store, _) = launcher(LauncherConfig::default(), &["a", "b", "c"]);
        let (_, events) = runtime.subscribe_channel(&[LayoutEventKind::ItemAdd]);

        let folder_id = runtime.create_folder("a", "b").expect("folder created");
        let folder = runtime.state().desktop.folder(&folder_id).expect("folder on desktop");
        assert_eq!(folder.position(), GridPosition::new(0, 0, 0));
        let data = folder.folder_data().expect("folder data");
        assert_eq!(data.folder_name, "New folder 1");
        assert_eq!(
            data.members().map(|m| m.key_name.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
        assert!(runtime.state().desktop.item("a").is_none());
        assert_eq!(store.writes(), 2);
        assert!(matches!(
            events.try_recv(),
            Ok(LayoutEvent::ItemAdd { surface: Surface::Desktop, .. })
        ));

        assert_eq!(runtime.create_folder("c", "c"), None);
        assert_eq!(runtime.take_notice(), Some(Notice::DuplicateItem));
    }

    #[test]
    fn full_dock_rejects_with_notice() {
        let config = LauncherConfig {
            max_dock_num: 4,
            ..LauncherConfig::default()
        };
        let (mut runtime, _, _) = launcher(config, &["a", "b", "c", "d", "e"]);
        for key in ["a", "b", "c", "d"] {
            assert!(runtime.add_to_dock(key, None));
        }
        let before = runtime.state().clone();
        assert!(!runtime.add_to_dock("e", None));
        assert_eq!(runtime.take_notice(), Some(Notice::NoSpaceInDock));
        assert_eq!(runtime.take_notice(), None);
        assert_eq!(runtime.state(), &before);
        assert!(runtime.state().desktop.item("e").is_some());
    }

    #[test]
    fn removing_second_to_last_member_dissolves_folder_in_place() {
        let (mut runtime, _, _) = launcher(LauncherConfig::default(), &["x", "y", "z"]);
        let folder_id = runtime.create_folder("x", "y").expect("folder created");
        assert!(runtime.remove_from_folder("y", &folder_id));

        let desktop = &runtime.state().desktop;
        assert!(desktop.folder(&folder_id).is_none());
        assert_eq!(
            desktop.item("x").expect("survivor").position(),
            GridPosition::new(0, 0, 0)
        );
        assert!(desktop.item("y").is_some());
        assert!(desktop.find_overlap().is_none());
    }

    #[test]
    fn dock_reorder_round_trips() {
        let (mut runtime, _, _) = launcher(LauncherConfig::default(), &["a", "b", "c", "d"]);
        for key in ["a", "b", "c", "d"] {
            assert!(runtime.add_to_dock(key, None));
        }
        assert!(runtime.reorder_dock(0, 2));
        assert_eq!(dock_keys(&runtime), vec!["b", "a", "c", "d"]);
        assert!(runtime.reorder_dock(1, 0));
        assert_eq!(dock_keys(&runtime), vec!["a", "b", "c", "d"]);

        assert!(runtime.reorder_dock(3, 1));
        assert_eq!(dock_keys(&runtime), vec!["a", "d", "b", "c"]);
        assert!(runtime.reorder_dock(1, 4));
        assert_eq!(dock_keys(&runtime), vec!["a", "b", "c", "d"]);

        assert!(!runtime.reorder_dock(2, 2));
        assert!(!runtime.reorder_dock(9, 0));
    }

    #[test]
    fn unpinned_app_returns_to_desktop() {
        let (mut runtime, _, _) = launcher(LauncherConfig::default(), &["a", "b"]);
        assert!(runtime.add_to_dock("a", Some(0)));
        assert!(runtime.state().desktop.item("a").is_none());
        assert!(runtime.remove_from_dock(&ItemMatcher::key("a")));
        assert!(runtime.dock_lists().resident.is_empty());
        assert!(runtime.state().desktop.item("a").is_some());
        assert!(!runtime.remove_from_dock(&ItemMatcher::key("a")));
    }

    #[test]
    fn folder_badge_tracks_members() {
        let (mut runtime, _, _) = launcher(LauncherConfig::default(), &["a", "b", "c"]);
        let folder_id = runtime.create_folder("a", "b").expect("folder created");
        assert!(runtime.add_to_dock("c", None));

        assert!(runtime.on_badge_update("a", 3));
        assert!(runtime.on_badge_update("b", 2));
        assert!(runtime.on_badge_update("c", 7));
        let folder = runtime.state().desktop.folder(&folder_id).expect("folder");
        assert_eq!(folder.badge_number, 5);
        assert_eq!(runtime.dock_lists().resident[0].badge_number, 7);
        assert!(runtime.state().desktop.folder_badges_consistent());

        assert!(!runtime.on_badge_update("a", 3));
        assert!(runtime.remove_from_folder("a", &folder_id));
        assert_eq!(runtime.state().desktop.item("a").expect("a").badge_number, 3);
    }

    #[test]
    fn uninstall_sweeps_folders_and_dock() {
        let (mut runtime, _, registry) = launcher(LauncherConfig::default(), &["a", "b", "c", "d"]);
        let folder_id = runtime.create_folder("a", "b").expect("folder created");
        assert!(runtime.add_to_dock("c", None));

        registry.uninstall("a");
        assert!(runtime.on_app_removed("a"));
        assert!(runtime.state().desktop.folder(&folder_id).is_none());
        assert!(runtime.state().desktop.item("b").is_some());

        registry.uninstall("c");
        assert!(runtime.on_app_removed("c"));
        assert!(runtime.dock_lists().resident.is_empty());
        assert!(!runtime.on_app_removed("c"));

        registry.install(AppInfo::new("e", "", "", "e"));
        assert!(runtime.on_app_added("e"));
        assert!(runtime.state().is_placed("e"));
        assert!(!runtime.on_app_added("e"));
    }

    #[test]
    fn restart_restores_committed_layout() {
        let store = Rc::new(MemoryStore::new());
        let registry = Rc::new(StaticRegistry::new(apps(&["a", "b", "c", "d"])));
        let mut first = LauncherRuntime::new(
            LauncherConfig::default(),
            Box::new(store.clone()),
            Box::new(registry.clone()),
        );
        let folder_id = first.create_folder("a", "b").expect("folder created");
        assert!(first.add_to_dock("d", None));
        assert!(first.rename_folder(&folder_id, "Work"));

        let second = LauncherRuntime::new(
            LauncherConfig::default(),
            Box::new(store.clone()),
            Box::new(registry),
        );
        assert_eq!(second.state(), first.state());
        assert_eq!(
            second
                .state()
                .desktop
                .folder(&folder_id)
                .and_then(LayoutItem::folder_data)
                .map(|data| data.folder_name.clone()),
            Some("Work".to_string())
        );
    }

    #[test]
    fn corrupt_store_falls_back_to_default() {
        let store = Rc::new(MemoryStore::with_contents("{\"layoutInfo\": ["));
        let runtime = LauncherRuntime::new(
            LauncherConfig::default(),
            Box::new(store.clone()),
            Box::new(StaticRegistry::new(apps(&["a", "b"]))),
        );
        assert_eq!(runtime.state().desktop.items.len(), 2);
        assert_eq!(store.writes(), 1);
        let rewritten = store.contents().expect("layout written");
        assert!(rewritten.contains("\"a\""));
    }

    #[test]
    fn failed_write_keeps_new_state() {
        let (mut runtime, store, _) = launcher(LauncherConfig::default(), &["a", "b"]);
        store.set_fail_writes(true);
        let folder_id = runtime.create_folder("a", "b").expect("folder created");
        assert!(runtime.state().desktop.folder(&folder_id).is_some());
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn failing_subscriber_does_not_block_others() {
        let (mut runtime, _, _) = launcher(LauncherConfig::default(), &["a", "b"]);
        let seen = Rc::new(Cell::new(0));
        runtime.subscribe(&[], |_| Err("view gone".into()));
        let counter = seen.clone();
        runtime.subscribe(&[LayoutEventKind::BadgeUpdate], move |event| {
            assert_eq!(event.kind(), LayoutEventKind::BadgeUpdate);
            counter.set(counter.get() + 1);
            Ok(())
        });
        let (id, channel) = runtime.subscribe_channel(&[]);

        assert!(runtime.on_badge_update("a", 1));
        assert_eq!(seen.get(), 1);
        assert!(matches!(channel.try_recv(), Ok(LayoutEvent::BadgeUpdate { .. })));

        assert!(runtime.unsubscribe(id));
        assert!(runtime.add_to_dock("b", None));
        assert!(channel.try_recv().is_err());
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn drag_from_desktop_into_dock_and_back() {
        let (mut runtime, _, _) = launcher(LauncherConfig::default(), &["a", "b", "c"]);
        runtime.set_desktop_area(Rect::new(0.0, 0.0, 500.0, 600.0));
        assert!(runtime.add_to_dock("a", None));
        assert!(runtime.add_to_dock("b", None));
        runtime.set_dock_area(Rect::new(0.0, 900.0, 500.0, 1000.0));

        assert!(runtime.begin_drag(DragSource::Desktop, "c", Point::new(250.0, 50.0)));
        assert!(runtime.is_dragging());
        assert_eq!(
            runtime.drag_to(Point::new(60.0, 950.0)),
            Some(DropZone::Dock(DropTarget::Index(0)))
        );
        assert!(runtime.drop_at(Point::new(60.0, 950.0)));
        assert!(!runtime.is_dragging());
        assert_eq!(dock_keys(&runtime), vec!["c", "a", "b"]);
        assert!(runtime.state().desktop.item("c").is_none());

        assert!(runtime.begin_drag(DragSource::Dock, "a", Point::new(250.0, 950.0)));
        assert!(runtime.drop_at(Point::new(450.0, 550.0)));
        assert_eq!(dock_keys(&runtime), vec!["c", "b"]);
        assert_eq!(
            runtime.state().desktop.item("a").expect("a on desktop").position(),
            GridPosition::new(0, 5, 4)
        );
    }

    #[test]
    fn drop_without_session_or_outside_changes_nothing() {
        let (mut runtime, _, _) = launcher(LauncherConfig::default(), &["a"]);
        runtime.set_desktop_area(Rect::new(0.0, 0.0, 500.0, 600.0));
        assert!(!runtime.drop_at(Point::new(10.0, 10.0)));
        assert!(!runtime.begin_drag(DragSource::Dock, "a", Point::new(10.0, 10.0)));

        let before = runtime.state().clone();
        assert!(runtime.begin_drag(DragSource::Desktop, "a", Point::new(10.0, 10.0)));
        assert!(!runtime.drop_at(Point::new(800.0, 800.0)));
        assert_eq!(runtime.state(), &before);
        assert_eq!(runtime.take_notice(), None);

        assert!(runtime.begin_drag(DragSource::Desktop, "a", Point::new(10.0, 10.0)));
        assert!(runtime.cancel_drag());
        assert!(!runtime.cancel_drag());
    }

    #[test]
    fn pad_recent_list_follows_tasks() {
        let config = LauncherConfig {
            device: DeviceType::Pad,
            ..LauncherConfig::default()
        };
        let tasks = Rc::new(StaticTasks::default());
        let task = |bundle: &str, id: u32| RecentTask {
            bundle_name: bundle.to_string(),
            ability_name: String::new(),
            module_name: String::new(),
            app_name: bundle.to_string(),
            mission_ids: vec![id],
        };
        tasks.set(vec![task("d", 4), task("c", 3), task("b", 2), task("a", 1)]);
        let (runtime, _, _) = launcher(config, &["a", "b", "c", "d"]);
        let mut runtime = runtime.with_task_source(Box::new(tasks.clone()));

        let recent: Vec<_> = runtime
            .dock_lists()
            .recent
            .iter()
            .map(|item| item.bundle_name.as_str())
            .collect();
        assert_eq!(recent, vec!["d", "c", "b"]);

        tasks.set(vec![task("a", 1)]);
        assert!(runtime.on_task_event(TaskEvent::Destroyed(4)));
        assert_eq!(runtime.dock_lists().recent.len(), 1);
        assert!(!runtime.on_task_event(TaskEvent::Created(5)));
    }

    #[test]
    fn repeated_folder_selection_dissolves_instead_of_duplicating() {
        let (mut runtime, _, _) = launcher(LauncherConfig::default(), &["a", "b", "c"]);
        let folder_id = runtime.create_folder("a", "b").expect("folder created");

        assert!(runtime.update_folder_members(&folder_id, &["a".to_string(), "a".to_string()]));
        let desktop = &runtime.state().desktop;
        assert!(desktop.folder(&folder_id).is_none());
        assert_eq!(desktop.locate("a"), Some(crate::layout::ItemLocation::Desktop));
        assert_eq!(desktop.locate("b"), Some(crate::layout::ItemLocation::Desktop));
        assert!(runtime.state().is_consistent());
    }

    #[test]
    fn stored_layout_with_overflowing_row_falls_back() {
        let (seed, _, _) = launcher(LauncherConfig::default(), &["a", "b"]);
        let mut snapshot = seed.state().snapshot();
        snapshot.layout_info[1].row = u32::MAX;
        let json = serde_json::to_string(&snapshot).expect("serialize layout");

        let store = Rc::new(MemoryStore::with_contents(&json));
        let runtime = LauncherRuntime::new(
            LauncherConfig::default(),
            Box::new(store.clone()),
            Box::new(StaticRegistry::new(apps(&["a", "b"]))),
        );
        assert_eq!(
            runtime.state().desktop.item("b").map(LayoutItem::position),
            Some(GridPosition::new(0, 0, 1))
        );
        assert_eq!(store.writes(), 1);
    }
}
