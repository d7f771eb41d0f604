//! Collaborators the embedding shell provides: the installed-app registry and
//! the running-task history.

use crate::error::StoreError;
use crate::layout::make_key_name;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    pub bundle_name: String,
    #[serde(default)]
    pub ability_name: String,
    #[serde(default)]
    pub module_name: String,
    #[serde(default)]
    pub app_name: String,
}

impl AppInfo {
    pub fn new(bundle_name: &str, ability_name: &str, module_name: &str, app_name: &str) -> Self {
        Self {
            bundle_name: bundle_name.to_string(),
            ability_name: ability_name.to_string(),
            module_name: module_name.to_string(),
            app_name: app_name.to_string(),
        }
    }

    pub fn key_name(&self) -> String {
        make_key_name(&self.bundle_name, &self.ability_name, &self.module_name)
    }
}

pub trait AppRegistry {
    fn installed_apps(&self) -> Vec<AppInfo>;

    fn apps_for_bundle(&self, bundle_name: &str) -> Vec<AppInfo> {
        self.installed_apps()
            .into_iter()
            .filter(|app| app.bundle_name == bundle_name)
            .collect()
    }
}

impl<T: AppRegistry + ?Sized> AppRegistry for Rc<T> {
    fn installed_apps(&self) -> Vec<AppInfo> {
        (**self).installed_apps()
    }
}

/// In-memory registry, optionally seeded from a JSON array of [`AppInfo`].
#[derive(Debug, Default)]
pub struct StaticRegistry {
    apps: RefCell<Vec<AppInfo>>,
}

impl StaticRegistry {
    pub fn new(apps: Vec<AppInfo>) -> Self {
        Self {
            apps: RefCell::new(apps),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, StoreError> {
        let file = std::fs::File::open(path)?;
        let apps: Vec<AppInfo> = serde_json::from_reader(std::io::BufReader::new(file))?;
        Ok(Self::new(apps))
    }

    pub fn install(&self, app: AppInfo) {
        let mut apps = self.apps.borrow_mut();
        apps.retain(|existing| existing.key_name() != app.key_name());
        apps.push(app);
    }

    pub fn uninstall(&self, bundle_name: &str) {
        self.apps
            .borrow_mut()
            .retain(|app| app.bundle_name != bundle_name);
    }
}

impl AppRegistry for StaticRegistry {
    fn installed_apps(&self) -> Vec<AppInfo> {
        self.apps.borrow().clone()
    }
}

/// One app's entry in the running-task history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentTask {
    pub bundle_name: String,
    #[serde(default)]
    pub ability_name: String,
    #[serde(default)]
    pub module_name: String,
    #[serde(default)]
    pub app_name: String,
    #[serde(default)]
    pub mission_ids: Vec<u32>,
}

/// Task lifecycle callbacks; each one triggers a refresh of the recent list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEvent {
    Created(u32),
    Destroyed(u32),
    MovedToFront(u32),
    SnapshotChanged(u32),
    IconUpdated(u32),
    LabelUpdated(u32),
    Closed(u32),
}

pub trait TaskSource {
    /// Tasks grouped by bundle, most recently used first.
    fn recent_bundle_tasks(&self) -> Vec<RecentTask>;
}

impl<T: TaskSource + ?Sized> TaskSource for Rc<T> {
    fn recent_bundle_tasks(&self) -> Vec<RecentTask> {
        (**self).recent_bundle_tasks()
    }
}

#[derive(Debug, Default)]
pub struct StaticTasks {
    tasks: RefCell<Vec<RecentTask>>,
}

impl StaticTasks {
    pub fn set(&self, tasks: Vec<RecentTask>) {
        *self.tasks.borrow_mut() = tasks;
    }
}

impl TaskSource for StaticTasks {
    fn recent_bundle_tasks(&self) -> Vec<RecentTask> {
        self.tasks.borrow().clone()
    }
}
