//! Folder creation, membership and dissolution over desktop snapshots.
//!
//! Every operation takes the current [`DesktopLayout`] by reference and returns
//! a new one; the caller decides whether to commit it.

use crate::config::LauncherConfig;
use crate::error::LayoutError;
use crate::layout::{grid, Area, DesktopLayout, GridPosition, GridSpec, ItemLocation, LayoutItem};
use log::{debug, warn};
use std::collections::HashSet;
use uuid::Uuid;

/// Result of taking one app out of a folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRemoval {
    pub layout: DesktopLayout,
    pub removed: LayoutItem,
    /// Where the last remaining member landed when the folder dissolved.
    pub survivor_slot: Option<GridPosition>,
}

pub struct FolderManager {
    grid: GridSpec,
    area: Area,
    default_name: String,
}

impl FolderManager {
    pub fn new(config: &LauncherConfig) -> Self {
        Self {
            grid: config.folder_grid(),
            area: config.folder_area,
            default_name: config.default_folder_name.clone(),
        }
    }

    pub fn grid(&self) -> GridSpec {
        self.grid
    }

    /// `"<default> N"` with the lowest N no existing folder uses.
    pub fn generate_folder_name(&self, desktop: &DesktopLayout) -> String {
        let taken: HashSet<&str> = desktop
            .folders()
            .filter_map(LayoutItem::folder_data)
            .map(|data| data.folder_name.as_str())
            .collect();
        let mut number = 1;
        loop {
            let candidate = format!("{} {}", self.default_name, number);
            if !taken.contains(candidate.as_str()) {
                return candidate;
            }
            number += 1;
        }
    }

    /// Merges two desktop apps into a new folder at the first one's slot.
    pub fn create_folder(
        &self,
        desktop: &DesktopLayout,
        key_a: &str,
        key_b: &str,
    ) -> Result<(DesktopLayout, String), LayoutError> {
        if key_a == key_b {
            return Err(LayoutError::Duplicate(key_a.to_string()));
        }
        for key in [key_a, key_b] {
            let item = desktop
                .item(key)
                .ok_or_else(|| LayoutError::ItemNotFound(key.to_string()))?;
            if !item.is_app() {
                return Err(LayoutError::Unsupported(key.to_string()));
            }
        }

        let mut layout = desktop.clone();
        let a = layout
            .take(key_a)
            .ok_or_else(|| LayoutError::ItemNotFound(key_a.to_string()))?;
        let b = layout
            .take(key_b)
            .ok_or_else(|| LayoutError::ItemNotFound(key_b.to_string()))?;
        let slot = a.position();

        let folder_id = Uuid::new_v4().to_string();
        let name = self.generate_folder_name(desktop);
        let mut folder = LayoutItem::folder(&folder_id, &name, self.area);
        self.set_members(&mut folder, vec![a, b]);

        let position = layout.insert_preferring(folder, Some(slot))?;
        layout.compact();
        debug!("created folder {} ({}) at {:?}", name, folder_id, position);
        Ok((layout, folder_id))
    }

    /// Appends an app to the folder, removing it from the desktop if it was there.
    pub fn add_item(
        &self,
        desktop: &DesktopLayout,
        item: &LayoutItem,
        folder_id: &str,
    ) -> Result<DesktopLayout, LayoutError> {
        if !item.is_app() {
            return Err(LayoutError::Unsupported(item.key_name.clone()));
        }
        let data = desktop
            .folder(folder_id)
            .and_then(LayoutItem::folder_data)
            .ok_or_else(|| LayoutError::FolderNotFound(folder_id.to_string()))?;
        if data.contains(&item.key_name) {
            return Err(LayoutError::Duplicate(item.key_name.clone()));
        }
        let mut members = data.member_list();
        members.push(item.as_plain_app());

        let mut layout = desktop.clone();
        layout.take(&item.key_name);
        let folder = layout
            .folder_mut(folder_id)
            .ok_or_else(|| LayoutError::FolderNotFound(folder_id.to_string()))?;
        self.set_members(folder, members);
        layout.compact();
        Ok(layout)
    }

    /// Takes an app out of a folder. One survivor dissolves the folder into a
    /// plain app at the folder's slot; no survivor deletes the folder.
    pub fn remove_item(
        &self,
        desktop: &DesktopLayout,
        key_name: &str,
        folder_id: &str,
    ) -> Result<FolderRemoval, LayoutError> {
        let folder = desktop
            .folder(folder_id)
            .ok_or_else(|| LayoutError::FolderNotFound(folder_id.to_string()))?;
        let data = folder
            .folder_data()
            .ok_or_else(|| LayoutError::FolderNotFound(folder_id.to_string()))?;
        let mut remaining = data.member_list();
        let index = remaining
            .iter()
            .position(|member| member.key_name == key_name)
            .ok_or_else(|| LayoutError::ItemNotFound(key_name.to_string()))?;
        let removed = remaining.remove(index).as_plain_app();
        let slot = folder.position();
        let folder_key = folder.key_name.clone();

        let mut layout = desktop.clone();
        let mut survivor_slot = None;
        match remaining.len() {
            0 => {
                layout.remove(&folder_key);
                debug!("folder {} emptied and removed", folder_id);
            }
            1 => {
                layout.take(&folder_key);
                let survivor = remaining.remove(0).as_plain_app();
                let position = layout.insert_preferring(survivor, Some(slot))?;
                layout.compact();
                survivor_slot = Some(position);
                debug!("folder {} dissolved", folder_id);
            }
            _ => {
                let folder = layout
                    .folder_mut(folder_id)
                    .ok_or_else(|| LayoutError::FolderNotFound(folder_id.to_string()))?;
                self.set_members(folder, remaining);
            }
        }
        Ok(FolderRemoval {
            layout,
            removed,
            survivor_slot,
        })
    }

    /// Drags an app out of a folder onto the desktop.
    pub fn move_item_to_desktop(
        &self,
        desktop: &DesktopLayout,
        key_name: &str,
        folder_id: &str,
        preferred: Option<GridPosition>,
    ) -> Result<DesktopLayout, LayoutError> {
        let FolderRemoval {
            mut layout,
            removed,
            ..
        } = self.remove_item(desktop, key_name, folder_id)?;
        layout.insert_preferring(removed, preferred)?;
        Ok(layout)
    }

    pub fn rename_folder(
        &self,
        desktop: &DesktopLayout,
        folder_id: &str,
        name: &str,
    ) -> Result<DesktopLayout, LayoutError> {
        let mut layout = desktop.clone();
        let data = layout
            .folder_mut(folder_id)
            .and_then(LayoutItem::folder_data_mut)
            .ok_or_else(|| LayoutError::FolderNotFound(folder_id.to_string()))?;
        data.folder_name = name.to_string();
        Ok(layout)
    }

    /// Drops every member of `bundle_name` from every folder, dissolving or
    /// deleting folders that shrink below two members.
    pub fn remove_bundle(
        &self,
        desktop: &DesktopLayout,
        bundle_name: &str,
    ) -> Result<DesktopLayout, LayoutError> {
        let doomed: Vec<(String, String)> = desktop
            .folders()
            .filter_map(LayoutItem::folder_data)
            .flat_map(|data| {
                data.members()
                    .filter(|member| member.bundle_name == bundle_name)
                    .map(|member| (member.key_name.clone(), data.folder_id.clone()))
            })
            .collect();
        let mut layout = desktop.clone();
        for (key_name, folder_id) in doomed {
            // An earlier removal may have dissolved this folder already.
            if layout.folder(&folder_id).is_none() {
                if layout.item(&key_name).is_some() {
                    layout.remove(&key_name);
                }
                continue;
            }
            layout = self.remove_item(&layout, &key_name, &folder_id)?.layout;
        }
        Ok(layout)
    }

    /// Makes the folder hold exactly `selected`, in order. Selected apps are
    /// pulled off the desktop and out of other folders; deselected members go
    /// back to the desktop. One or no selection dissolves the folder.
    pub fn update_members(
        &self,
        desktop: &DesktopLayout,
        folder_id: &str,
        selected: &[String],
    ) -> Result<DesktopLayout, LayoutError> {
        let folder = desktop
            .folder(folder_id)
            .ok_or_else(|| LayoutError::FolderNotFound(folder_id.to_string()))?;
        let former = folder
            .folder_data()
            .map(|data| data.member_list())
            .unwrap_or_default();
        let slot = folder.position();
        let folder_key = folder.key_name.clone();
        let mut layout = desktop.clone();

        let mut seen = HashSet::new();
        let selected: Vec<&str> = selected
            .iter()
            .map(String::as_str)
            .filter(|key_name| seen.insert(*key_name))
            .filter(|key_name| match desktop.locate(key_name) {
                Some(ItemLocation::Folder(_)) => true,
                Some(ItemLocation::Desktop) => {
                    let is_app = desktop.item(key_name).is_some_and(LayoutItem::is_app);
                    if !is_app {
                        warn!("{} is not an app, leaving it on the desktop", key_name);
                    }
                    is_app
                }
                None => {
                    warn!("selected app {} is not placed anywhere", key_name);
                    false
                }
            })
            .collect();

        if selected.len() <= 1 {
            layout.take(&folder_key);
            let mut preferred = Some(slot);
            for member in former {
                layout.insert_preferring(member.as_plain_app(), preferred.take())?;
            }
            layout.compact();
            return Ok(layout);
        }

        let mut members = Vec::with_capacity(selected.len());
        for &key_name in &selected {
            match layout.locate(key_name) {
                Some(ItemLocation::Folder(id)) if id == folder_id => {
                    if let Some(member) = former.iter().find(|m| m.key_name == key_name) {
                        members.push(member.clone());
                    }
                }
                Some(ItemLocation::Folder(other)) => {
                    let removal = self.remove_item(&layout, key_name, &other)?;
                    layout = removal.layout;
                    members.push(removal.removed);
                }
                Some(ItemLocation::Desktop) => {
                    if let Some(item) = layout.take(key_name) {
                        members.push(item);
                    }
                }
                None => {}
            }
        }

        let deselected: Vec<LayoutItem> = former
            .into_iter()
            .filter(|member| !selected.contains(&member.key_name.as_str()))
            .collect();
        let folder = layout
            .folder_mut(folder_id)
            .ok_or_else(|| LayoutError::FolderNotFound(folder_id.to_string()))?;
        self.set_members(folder, members);
        for member in deselected {
            layout.insert(member.as_plain_app())?;
        }
        layout.compact();
        Ok(layout)
    }

    pub fn update_badge(
        &self,
        desktop: &DesktopLayout,
        bundle_name: &str,
        badge_number: u32,
    ) -> DesktopLayout {
        let mut layout = desktop.clone();
        layout.update_badge(bundle_name, badge_number);
        layout
    }

    /// Interior pages with the trailing Add tile, as the open-folder view shows them.
    pub fn interior_with_add(&self, folder: &LayoutItem) -> Vec<Vec<LayoutItem>> {
        let pages = folder
            .folder_data()
            .map(|data| grid::pack_into_pages(data.member_list(), self.grid))
            .unwrap_or_default();
        if pages.is_empty() {
            return vec![vec![LayoutItem::add_sentinel()]];
        }
        grid::with_add_sentinel(pages, self.grid)
    }

    fn set_members(&self, folder: &mut LayoutItem, members: Vec<LayoutItem>) {
        if let Some(data) = folder.folder_data_mut() {
            data.layout_info = grid::pack_into_pages(members, self.grid);
            folder.badge_number = data.badge_total();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const GRID: GridSpec = GridSpec::new(5, 6);

    fn manager() -> FolderManager {
        FolderManager::new(&LauncherConfig::default())
    }

    fn app(name: &str) -> LayoutItem {
        LayoutItem::app(name, "", "")
    }

    fn member_keys(layout: &DesktopLayout, folder_id: &str) -> Vec<String> {
        layout
            .folder(folder_id)
            .and_then(LayoutItem::folder_data)
            .map(|data| data.members().map(|m| m.key_name.clone()).collect())
            .unwrap_or_default()
    }

    fn desktop(items: Vec<LayoutItem>) -> DesktopLayout {
        DesktopLayout::from_items(GRID, items)
    }

    #[test]
    fn create_folder_takes_first_slot_and_sums_badges() {
        let start = desktop(vec![
            app("a").at(0, 0, 0).with_badge(2),
            app("b").at(0, 0, 1).with_badge(3),
        ]);
        let (layout, id) = manager().create_folder(&start, "a", "b").unwrap();
        let folder = layout.folder(&id).unwrap();
        assert_eq!(folder.position(), GridPosition::new(0, 0, 0));
        assert_eq!(folder.badge_number, 5);
        assert_eq!(member_keys(&layout, &id), vec!["a", "b"]);
        assert!(layout.item("a").is_none());
        assert!(layout.item("b").is_none());
        assert_eq!(layout.items.len(), 1);
    }

    #[test]
    fn create_folder_requires_two_desktop_apps() {
        let start = desktop(vec![app("a").at(0, 0, 0)]);
        let m = manager();
        assert!(matches!(
            m.create_folder(&start, "a", "missing"),
            Err(LayoutError::ItemNotFound(_))
        ));
        assert!(matches!(
            m.create_folder(&start, "a", "a"),
            Err(LayoutError::Duplicate(_))
        ));
    }

    #[test]
    fn folder_names_take_lowest_free_number() {
        let m = manager();
        let first = LayoutItem::folder("f1", "New folder 1", Area::UNIT).at(0, 0, 0);
        let third = LayoutItem::folder("f3", "New folder 3", Area::UNIT).at(0, 0, 1);
        let custom = LayoutItem::folder("f9", "new folder 2", Area::UNIT).at(0, 0, 2);
        let layout = desktop(vec![first, third, custom]);
        assert_eq!(m.generate_folder_name(&layout), "New folder 2");
        assert_eq!(m.generate_folder_name(&desktop(Vec::new())), "New folder 1");
    }

    #[test]
    fn add_item_appends_and_opens_interior_pages() {
        let m = manager();
        let (mut layout, id) = m
            .create_folder(&desktop(vec![app("a").at(0, 0, 0), app("b").at(0, 0, 1)]), "a", "b")
            .unwrap();
        for (index, name) in ["c", "d", "e", "f", "g", "h", "i", "j"].iter().enumerate() {
            layout.insert(app(name).with_badge(index as u32)).unwrap();
            layout = m.add_item(&layout, &app(name).with_badge(index as u32), &id).unwrap();
        }
        let data = layout.folder(&id).and_then(LayoutItem::folder_data).unwrap();
        assert_eq!(data.layout_info.len(), 2);
        assert_eq!(data.layout_info[0].len(), 9);
        assert_eq!(data.layout_info[1][0].key_name, "j");
        assert_eq!(layout.folder(&id).unwrap().badge_number, 28);
        assert_eq!(layout.items.len(), 1);
        assert!(matches!(
            m.add_item(&layout, &app("c"), &id),
            Err(LayoutError::Duplicate(_))
        ));
        assert!(matches!(
            m.add_item(&layout, &app("z"), "nope"),
            Err(LayoutError::FolderNotFound(_))
        ));
    }

    #[test]
    fn removing_to_one_member_dissolves_at_folder_slot() {
        let m = manager();
        let mut folder = LayoutItem::folder("f", "New folder 1", Area::UNIT).at(0, 2, 3);
        folder.folder_data_mut().unwrap().layout_info =
            vec![vec![app("x").with_badge(1), app("y").with_badge(4)]];
        let start = desktop(vec![app("a").at(0, 0, 0), folder]);

        let removal = m.remove_item(&start, "y", "f").unwrap();
        assert_eq!(removal.removed.key_name, "y");
        assert_eq!(removal.survivor_slot, Some(GridPosition::new(0, 2, 3)));
        let x = removal.layout.item("x").unwrap();
        assert!(x.is_app());
        assert_eq!(x.area, Area::UNIT);
        assert_eq!(x.position(), GridPosition::new(0, 2, 3));
        assert!(removal.layout.folder("f").is_none());
    }

    #[test]
    fn removing_from_larger_folder_repacks() {
        let m = manager();
        let mut folder = LayoutItem::folder("f", "New folder 1", Area::UNIT).at(0, 0, 0);
        folder.folder_data_mut().unwrap().layout_info =
            vec![vec![app("x").with_badge(1), app("y").with_badge(2), app("z").with_badge(3)]];
        let removal = m.remove_item(&desktop(vec![folder]), "x", "f").unwrap();
        assert_eq!(member_keys(&removal.layout, "f"), vec!["y", "z"]);
        assert_eq!(removal.layout.folder("f").unwrap().badge_number, 5);
        assert_eq!(removal.survivor_slot, None);
        let data = removal.layout.folder("f").and_then(LayoutItem::folder_data).unwrap();
        assert_eq!(data.layout_info[0][0].position(), GridPosition::new(0, 0, 0));
    }

    #[test]
    fn move_to_desktop_prefers_drop_cell() {
        let m = manager();
        let mut folder = LayoutItem::folder("f", "New folder 1", Area::UNIT).at(0, 0, 0);
        folder.folder_data_mut().unwrap().layout_info = vec![vec![app("x"), app("y"), app("z")]];
        let layout = m
            .move_item_to_desktop(&desktop(vec![folder]), "z", "f", Some(GridPosition::new(0, 4, 4)))
            .unwrap();
        assert_eq!(layout.item("z").unwrap().position(), GridPosition::new(0, 4, 4));
        assert_eq!(member_keys(&layout, "f"), vec!["x", "y"]);
    }

    #[test]
    fn uninstall_sweeps_folders() {
        let m = manager();
        let mut f1 = LayoutItem::folder("f1", "New folder 1", Area::UNIT).at(0, 0, 0);
        f1.folder_data_mut().unwrap().layout_info = vec![vec![app("gone"), app("keep")]];
        let mut f2 = LayoutItem::folder("f2", "New folder 2", Area::UNIT).at(0, 0, 1);
        f2.folder_data_mut().unwrap().layout_info =
            vec![vec![app("p"), app("gone"), app("q")]];
        let layout = m.remove_bundle(&desktop(vec![f1, f2]), "gone").unwrap();
        assert!(layout.folder("f1").is_none());
        assert_eq!(layout.item("keep").unwrap().position(), GridPosition::new(0, 0, 0));
        assert_eq!(member_keys(&layout, "f2"), vec!["p", "q"]);
        assert_eq!(layout.locate("gone"), None);
    }

    #[test]
    fn update_members_moves_apps_between_folder_and_desktop() {
        let m = manager();
        let mut f1 = LayoutItem::folder("f1", "New folder 1", Area::UNIT).at(0, 0, 0);
        f1.folder_data_mut().unwrap().layout_info = vec![vec![app("a"), app("b")]];
        let mut f2 = LayoutItem::folder("f2", "New folder 2", Area::UNIT).at(0, 0, 1);
        f2.folder_data_mut().unwrap().layout_info = vec![vec![app("c"), app("d")]];
        let start = desktop(vec![f1, f2, app("e").at(0, 0, 2)]);

        let selected = vec!["a".to_string(), "c".to_string(), "e".to_string()];
        let layout = m.update_members(&start, "f1", &selected).unwrap();
        assert_eq!(member_keys(&layout, "f1"), vec!["a", "c", "e"]);
        assert!(layout.folder("f2").is_none());
        assert_eq!(layout.locate("d"), Some(ItemLocation::Desktop));
        assert_eq!(layout.locate("b"), Some(ItemLocation::Desktop));
        assert!(layout.item("e").is_none());
        assert!(layout.find_overlap().is_none());
    }

    #[test]
    fn update_members_with_single_selection_dissolves() {
        let m = manager();
        let mut f1 = LayoutItem::folder("f1", "New folder 1", Area::UNIT).at(0, 1, 1);
        f1.folder_data_mut().unwrap().layout_info = vec![vec![app("a"), app("b"), app("c")]];
        let layout = m
            .update_members(&desktop(vec![f1]), "f1", &["a".to_string()])
            .unwrap();
        assert!(layout.folder("f1").is_none());
        assert_eq!(layout.item("a").unwrap().position(), GridPosition::new(0, 1, 1));
        assert_eq!(layout.items.len(), 3);
    }

    #[test]
    fn open_folder_view_ends_with_add_tile() {
        let m = manager();
        let mut f = LayoutItem::folder("f", "New folder 1", Area::UNIT);
        f.folder_data_mut().unwrap().layout_info = vec![vec![app("a"), app("b")]];
        let pages = m.interior_with_add(&f);
        assert_eq!(pages.len(), 1);
        assert!(pages[0][2].is_add_sentinel());
    }

    #[test]
    fn update_members_ignores_repeated_and_unplaced_keys() {
        let m = manager();
        let mut f = LayoutItem::folder("f", "New folder 1", Area::UNIT).at(0, 0, 0);
        f.folder_data_mut().unwrap().layout_info = vec![vec![app("a"), app("b")]];
        let start = desktop(vec![f, app("c").at(0, 0, 1)]);

        let selected = vec!["a".to_string(), "a".to_string(), "c".to_string()];
        let layout = m.update_members(&start, "f", &selected).unwrap();
        assert_eq!(member_keys(&layout, "f"), vec!["a", "c"]);
        assert_eq!(layout.locate("b"), Some(ItemLocation::Desktop));
        assert!(layout.issues().is_empty());

        let repeated = vec!["a".to_string(), "a".to_string()];
        let layout = m.update_members(&start, "f", &repeated).unwrap();
        assert!(layout.folder("f").is_none());
        assert_eq!(layout.item("a").unwrap().position(), GridPosition::new(0, 0, 0));
        assert_eq!(layout.locate("b"), Some(ItemLocation::Desktop));

        let ghost = vec!["a".to_string(), "ghost".to_string()];
        let layout = m.update_members(&start, "f", &ghost).unwrap();
        assert!(layout.folder("f").is_none());
        assert_eq!(layout.items.len(), 3);
        assert!(layout.issues().is_empty());
    }

    #[test]
    fn removing_only_member_deletes_folder() {
        let m = manager();
        let mut f = LayoutItem::folder("f", "New folder 1", Area::UNIT).at(1, 0, 0);
        f.folder_data_mut().unwrap().layout_info = vec![vec![app("x")]];
        let start = desktop(vec![app("a").at(0, 0, 0), f]);
        assert_eq!(start.page_count, 2);

        let removal = m.remove_item(&start, "x", "f").unwrap();
        assert_eq!(removal.removed.key_name, "x");
        assert_eq!(removal.survivor_slot, None);
        assert!(removal.layout.folder("f").is_none());
        assert_eq!(removal.layout.items.len(), 1);
        assert_eq!(removal.layout.page_count, 1);
    }
}
