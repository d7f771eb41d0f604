use crate::layout::{Area, GridSpec};
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

const QUALIFIER: &str = "com";
const ORGANIZATION: &str = "launcher_layout";
const APPLICATION: &str = "launcher_layout";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DeviceType {
    #[default]
    Phone,
    Pad,
}

/// One entry of the first-run dock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DockPreset {
    pub bundle_name: String,
    #[serde(default)]
    pub ability_name: String,
    #[serde(default)]
    pub module_name: String,
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default = "default_true")]
    pub editable: bool,
    /// System slots (e.g. the recents launcher icon) do not need an installed app.
    #[serde(default)]
    pub system: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LauncherConfig {
    #[serde(default = "default_grid_columns")]
    pub grid_columns: u32,
    #[serde(default = "default_grid_rows")]
    pub grid_rows: u32,
    #[serde(default = "default_folder_columns")]
    pub folder_columns: u32,
    #[serde(default = "default_folder_rows")]
    pub folder_rows: u32,
    #[serde(default = "default_folder_area", deserialize_with = "deserialize_area")]
    pub folder_area: Area,
    #[serde(default = "default_max_dock_num")]
    pub max_dock_num: usize,
    #[serde(default = "default_max_recent_num")]
    pub max_recent_num: usize,
    #[serde(default)]
    pub device: DeviceType,
    #[serde(default = "default_folder_name")]
    pub default_folder_name: String,
    #[serde(default = "default_dock_drop_tolerance")]
    pub dock_drop_tolerance: f32,
    #[serde(default)]
    pub dock_preset: Vec<DockPreset>,
}

fn default_true() -> bool {
    true
}

fn default_grid_columns() -> u32 {
    5
}

fn default_grid_rows() -> u32 {
    6
}

fn default_folder_columns() -> u32 {
    3
}

fn default_folder_rows() -> u32 {
    3
}

fn default_folder_area() -> Area {
    Area::UNIT
}

fn default_max_dock_num() -> usize {
    5
}

fn default_max_recent_num() -> usize {
    3
}

fn default_folder_name() -> String {
    "New folder".to_string()
}

fn default_dock_drop_tolerance() -> f32 {
    24.0
}

// Older configs stored the folder area as a bare number meaning a square.
#[derive(Deserialize)]
#[serde(untagged)]
enum AreaCompat {
    Square(u32),
    Pair([u32; 2]),
}

fn deserialize_area<'de, D>(deserializer: D) -> Result<Area, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match AreaCompat::deserialize(deserializer)? {
        AreaCompat::Square(side) => Area::new(side.max(1), side.max(1)),
        AreaCompat::Pair([w, h]) => Area::new(w.max(1), h.max(1)),
    })
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            grid_columns: default_grid_columns(),
            grid_rows: default_grid_rows(),
            folder_columns: default_folder_columns(),
            folder_rows: default_folder_rows(),
            folder_area: default_folder_area(),
            max_dock_num: default_max_dock_num(),
            max_recent_num: default_max_recent_num(),
            device: DeviceType::default(),
            default_folder_name: default_folder_name(),
            dock_drop_tolerance: default_dock_drop_tolerance(),
            dock_preset: Vec::new(),
        }
    }
}

impl LauncherConfig {
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    pub fn desktop_grid(&self) -> GridSpec {
        GridSpec::new(self.grid_columns.max(1), self.grid_rows.max(1))
    }

    pub fn folder_grid(&self) -> GridSpec {
        GridSpec::new(self.folder_columns.max(1), self.folder_rows.max(1))
    }

    pub fn load() -> Self {
        match Self::config_dir() {
            Some(dir) => Self::load_from(&dir.join("config.json")),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            if let Ok(file) = std::fs::File::open(path) {
                if let Ok(config) = serde_json::from_reader(file) {
                    return config;
                } else {
                    warn!("Failed to parse config, using default");
                }
            }
        }
        Self::default()
    }

    pub fn save(&self) {
        if let Some(dir) = Self::config_dir() {
            self.save_to(&dir.join("config.json"));
        }
    }

    pub fn save_to(&self, path: &Path) {
        if let Some(dir) = path.parent() {
            if std::fs::create_dir_all(dir).is_err() {
                warn!("Failed to create config dir {}", dir.display());
                return;
            }
        }
        match std::fs::File::create(path) {
            Ok(file) => {
                if let Err(err) = serde_json::to_writer_pretty(file, self) {
                    warn!("Failed to write config: {}", err);
                }
            }
            Err(err) => warn!("Failed to create config file: {}", err),
        }
    }
}
