use launcher_layout::host::{AppInfo, StaticRegistry};
use launcher_layout::store::{JsonFileStore, LayoutStore, MemoryStore};
use launcher_layout::{LauncherConfig, LauncherRuntime};
use log::{info, warn};
use std::path::PathBuf;

/// Prints the current layout. An optional argument names a JSON file holding
/// the installed app list; without it a small demo set is used.
fn main() {
    let config = LauncherConfig::load();

    let registry = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => match StaticRegistry::load_from(&path) {
            Ok(registry) => registry,
            Err(err) => {
                eprintln!("failed to read app list {}: {}", path.display(), err);
                std::process::exit(1);
            }
        },
        None => StaticRegistry::new(demo_apps()),
    };

    let store: Box<dyn LayoutStore> = match JsonFileStore::open_default() {
        Some(store) => {
            info!("layout file {}", store.path().display());
            Box::new(store)
        }
        None => {
            warn!("no config directory, layout will not be kept");
            Box::new(MemoryStore::new())
        }
    };

    let runtime = LauncherRuntime::new(config, store, Box::new(registry));

    for (index, page) in runtime.desktop_pages().iter().enumerate() {
        println!("page {}", index);
        for item in page {
            let position = item.position();
            let label = match item.folder_data() {
                Some(data) => format!("{} ({} apps)", data.folder_name, data.member_count()),
                None => item.key_name.clone(),
            };
            println!("  [{},{}] {}", position.row, position.column, label);
        }
    }
    let dock = runtime.dock_lists();
    println!("dock");
    for item in &dock.resident {
        println!("  {}", item.key_name);
    }
    for item in &dock.recent {
        println!("  recent {}", item.key_name);
    }
}

fn demo_apps() -> Vec<AppInfo> {
    [
        ("com.example.phone", "Phone"),
        ("com.example.messages", "Messages"),
        ("com.example.camera", "Camera"),
        ("com.example.gallery", "Gallery"),
        ("com.example.settings", "Settings"),
        ("com.example.browser", "Browser"),
        ("com.example.mail", "Mail"),
    ]
    .into_iter()
    .map(|(bundle, name)| AppInfo::new(bundle, "MainAbility", "entry", name))
    .collect()
}
