use super::grid::{self, LayoutIssue, Placement};
use super::item::{Area, GridPosition, GridSpec, LayoutItem};
use crate::error::LayoutError;
use std::collections::HashSet;

/// Where an item with a given key currently lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemLocation {
    Desktop,
    Folder(String),
}

/// The paged desktop: every top-level item plus the page count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopLayout {
    pub grid: GridSpec,
    pub page_count: u32,
    pub items: Vec<LayoutItem>,
}

impl DesktopLayout {
    pub fn new(grid: GridSpec) -> Self {
        Self {
            grid,
            page_count: 1,
            items: Vec::new(),
        }
    }

    pub fn from_items(grid: GridSpec, items: Vec<LayoutItem>) -> Self {
        let mut layout = Self {
            grid,
            page_count: 1,
            items,
        };
        layout.compact();
        layout.recompute_folder_badges();
        layout
    }

    pub fn item(&self, key_name: &str) -> Option<&LayoutItem> {
        self.items.iter().find(|item| item.key_name == key_name)
    }

    pub fn item_mut(&mut self, key_name: &str) -> Option<&mut LayoutItem> {
        self.items.iter_mut().find(|item| item.key_name == key_name)
    }

    pub fn folder(&self, folder_id: &str) -> Option<&LayoutItem> {
        self.items
            .iter()
            .find(|item| item.folder_id() == Some(folder_id))
    }

    pub fn folder_mut(&mut self, folder_id: &str) -> Option<&mut LayoutItem> {
        self.items
            .iter_mut()
            .find(|item| item.folder_id() == Some(folder_id))
    }

    pub fn folders(&self) -> impl Iterator<Item = &LayoutItem> + '_ {
        self.items.iter().filter(|item| item.is_folder())
    }

    pub fn locate(&self, key_name: &str) -> Option<ItemLocation> {
        if self.item(key_name).is_some() {
            return Some(ItemLocation::Desktop);
        }
        self.folders()
            .filter_map(LayoutItem::folder_data)
            .find(|data| data.contains(key_name))
            .map(|data| ItemLocation::Folder(data.folder_id.clone()))
    }

    /// Top-level items grouped by page, each page in row-major order.
    pub fn pages(&self) -> Vec<Vec<LayoutItem>> {
        let mut pages = vec![Vec::new(); self.page_count as usize];
        for item in &self.items {
            if let Some(page) = pages.get_mut(item.page as usize) {
                page.push(item.clone());
            }
        }
        for page in &mut pages {
            page.sort_by_key(LayoutItem::position);
        }
        pages
    }

    pub fn item_at(&self, position: GridPosition) -> Option<&LayoutItem> {
        self.items.iter().find(|item| {
            item.page == position.page && item.covers(position.row, position.column)
        })
    }

    pub fn is_vacant(&self, position: GridPosition, area: Area, ignore: Option<&str>) -> bool {
        grid::is_vacant(&self.items, self.grid, position, area, ignore)
    }

    /// Places the item in the first vacant slot, opening a page when none is left.
    pub fn insert(&mut self, mut item: LayoutItem) -> Result<GridPosition, LayoutError> {
        if self.item(&item.key_name).is_some() {
            return Err(LayoutError::Duplicate(item.key_name));
        }
        let position = match grid::place(&self.items, self.grid, item.area, self.page_count)? {
            Placement::At(position) => position,
            Placement::NeedsNewPage => {
                self.page_count += 1;
                GridPosition::new(self.page_count - 1, 0, 0)
            }
        };
        item.set_position(position);
        self.items.push(item);
        Ok(position)
    }

    /// Places the item at an exact cell. A page index past the end opens one new page.
    pub fn insert_at(
        &mut self,
        mut item: LayoutItem,
        mut position: GridPosition,
    ) -> Result<GridPosition, LayoutError> {
        if self.item(&item.key_name).is_some() {
            return Err(LayoutError::Duplicate(item.key_name));
        }
        if position.page >= self.page_count {
            position.page = self.page_count;
        }
        if !self.is_vacant(position, item.area, None) {
            return Err(LayoutError::Occupied);
        }
        if position.page == self.page_count {
            self.page_count += 1;
        }
        item.set_position(position);
        self.items.push(item);
        Ok(position)
    }

    pub fn insert_preferring(
        &mut self,
        item: LayoutItem,
        preferred: Option<GridPosition>,
    ) -> Result<GridPosition, LayoutError> {
        match preferred {
            Some(position) if self.is_vacant(position, item.area, None) => {
                self.insert_at(item, position)
            }
            _ => self.insert(item),
        }
    }

    /// Removes a top-level item without compacting pages.
    pub fn take(&mut self, key_name: &str) -> Option<LayoutItem> {
        let index = self.items.iter().position(|item| item.key_name == key_name)?;
        Some(self.items.remove(index))
    }

    pub fn remove(&mut self, key_name: &str) -> Option<LayoutItem> {
        let removed = self.take(key_name);
        if removed.is_some() {
            self.compact();
        }
        removed
    }

    pub fn remove_where<F>(&mut self, mut predicate: F) -> Vec<LayoutItem>
    where
        F: FnMut(&LayoutItem) -> bool,
    {
        let (removed, kept): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.items).into_iter().partition(|item| predicate(item));
        self.items = kept;
        if !removed.is_empty() {
            self.compact();
        }
        removed
    }

    pub fn compact(&mut self) {
        self.page_count = grid::compact_pages(&mut self.items);
    }

    /// Sets the badge on every app of `bundle_name`, on the desktop and inside
    /// folders. Returns whether anything changed.
    pub fn update_badge(&mut self, bundle_name: &str, badge_number: u32) -> bool {
        let mut changed = false;
        for item in &mut self.items {
            if item.is_app() && item.bundle_name == bundle_name && item.badge_number != badge_number {
                item.badge_number = badge_number;
                changed = true;
            }
            if let Some(data) = item.folder_data_mut() {
                for member in data.layout_info.iter_mut().flatten() {
                    if member.bundle_name == bundle_name && member.badge_number != badge_number {
                        member.badge_number = badge_number;
                        changed = true;
                    }
                }
            }
        }
        self.recompute_folder_badges();
        changed
    }

    pub fn recompute_folder_badges(&mut self) {
        for item in &mut self.items {
            if let Some(total) = item.folder_data().map(|data| data.badge_total()) {
                item.badge_number = total;
            }
        }
    }

    pub fn find_overlap(&self) -> Option<(&LayoutItem, &LayoutItem)> {
        grid::find_overlap(&self.items).map(|(a, b)| (&self.items[a], &self.items[b]))
    }

    /// Everything that breaks the layout invariants: bounds, overlaps, app
    /// keys shown twice (on the desktop or across folders) and folders
    /// holding fewer than two apps.
    pub fn issues(&self) -> Vec<LayoutIssue> {
        let mut issues = grid::validate_layout(&self.items, self.grid);
        let mut seen: HashSet<&str> = self
            .items
            .iter()
            .filter(|item| item.is_app())
            .map(|item| item.key_name.as_str())
            .collect();
        for data in self.folders().filter_map(LayoutItem::folder_data) {
            if data.member_count() < 2 {
                issues.push(LayoutIssue::UndersizedFolder(data.folder_id.clone()));
            }
            for member in data.members() {
                if !seen.insert(member.key_name.as_str()) {
                    issues.push(LayoutIssue::DuplicateKey(member.key_name.clone()));
                }
            }
        }
        issues
    }

    pub fn folder_badges_consistent(&self) -> bool {
        self.folders().all(|folder| {
            folder
                .folder_data()
                .is_some_and(|data| data.badge_total() == folder.badge_number)
        })
    }
}
