//! Pointer-to-slot mapping and drop commits across the dock, the desktop and
//! open folders.

use crate::config::{DeviceType, LauncherConfig};
use crate::dock::{DockManager, ItemMatcher};
use crate::error::{DropRejection, LayoutError};
use crate::events::{LayoutEvent, Surface};
use crate::folder::FolderManager;
use crate::launcher::LauncherState;
use crate::layout::{DesktopLayout, GridPosition, GridSpec, LayoutItem};
use log::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Screen rectangle registered for a drop zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left && point.x <= self.right && point.y >= self.top && point.y <= self.bottom
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragSource {
    Dock,
    Desktop,
    Folder(String),
}

/// Insertion point in the resident list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    Index(usize),
    Append,
}

/// What lies under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropZone {
    Dock(DropTarget),
    Desktop(GridPosition),
    Outside,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub source: DragSource,
    pub source_index: usize,
    pub payload: LayoutItem,
    pub pointer: Point,
    pub target: DropZone,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragSession),
}

/// A committed drop: the next state and what views must hear about it.
#[derive(Debug, Clone, PartialEq)]
pub struct DropOutcome {
    pub state: LauncherState,
    pub events: Vec<LayoutEvent>,
}

pub struct DragCoordinator {
    state: DragState,
    device: DeviceType,
    tolerance: f32,
    desktop_grid: GridSpec,
    dock_area: Option<Rect>,
    desktop_area: Option<Rect>,
    desktop_page: u32,
    slot_boundaries: Vec<f32>,
    column_axis: Vec<f32>,
    row_axis: Vec<f32>,
}

impl DragCoordinator {
    pub fn new(config: &LauncherConfig) -> Self {
        Self {
            state: DragState::Idle,
            device: config.device,
            tolerance: config.dock_drop_tolerance.max(0.0),
            desktop_grid: config.desktop_grid(),
            dock_area: None,
            desktop_area: None,
            desktop_page: 0,
            slot_boundaries: Vec::new(),
            column_axis: Vec::new(),
            row_axis: Vec::new(),
        }
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    pub fn set_dock_area(&mut self, area: Rect) {
        self.dock_area = Some(area);
    }

    /// Registers the desktop grid area and rebuilds the row and column axes.
    pub fn set_desktop_area(&mut self, area: Rect) {
        let columns = self.desktop_grid.columns.max(1);
        let rows = self.desktop_grid.rows.max(1);
        self.column_axis = (1..=columns)
            .map(|i| area.left + area.width() / columns as f32 * i as f32)
            .collect();
        self.row_axis = (1..=rows)
            .map(|i| area.top + area.height() / rows as f32 * i as f32)
            .collect();
        self.desktop_area = Some(area);
    }

    /// Page the desktop view is currently showing.
    pub fn set_desktop_page(&mut self, page: u32) {
        self.desktop_page = page;
    }

    /// One boundary per resident slot, at the slot's horizontal centre.
    pub fn update_slot_boundaries(&mut self, count: usize) {
        self.slot_boundaries.clear();
        let Some(area) = self.dock_area else {
            return;
        };
        if count == 0 {
            return;
        }
        let slot_width = area.width() / count as f32;
        self.slot_boundaries = (0..count)
            .map(|i| area.left + slot_width * (i as f32 + 0.5))
            .collect();
    }

    pub fn resolve_target_index(&self, x: f32) -> DropTarget {
        self.slot_boundaries
            .iter()
            .position(|&boundary| boundary > x)
            .map_or(DropTarget::Append, DropTarget::Index)
    }

    /// The dock area, plus on pads a band of `dock_drop_tolerance` above it.
    pub fn is_drop_zone(&self, point: Point) -> bool {
        let Some(area) = self.dock_area else {
            return false;
        };
        if area.contains(point) {
            return true;
        }
        self.device == DeviceType::Pad
            && point.x >= area.left
            && point.x <= area.right
            && point.y >= area.top - self.tolerance
            && point.y <= area.bottom
    }

    /// Row and column under the point, clamped to the last row or column.
    pub fn desktop_cell(&self, point: Point) -> Option<(u32, u32)> {
        let area = self.desktop_area?;
        if !area.contains(point) {
            return None;
        }
        let column = axis_index(&self.column_axis, point.x);
        let row = axis_index(&self.row_axis, point.y);
        Some((row, column))
    }

    pub fn locate(&self, point: Point) -> DropZone {
        if self.is_drop_zone(point) {
            return DropZone::Dock(self.resolve_target_index(point.x));
        }
        match self.desktop_cell(point) {
            Some((row, column)) => {
                DropZone::Desktop(GridPosition::new(self.desktop_page, row, column))
            }
            None => DropZone::Outside,
        }
    }

    pub fn start(&mut self, source: DragSource, source_index: usize, payload: LayoutItem, pointer: Point) {
        if let DragState::Dragging(previous) = &self.state {
            info!("drag of {} superseded", previous.payload.key_name);
        }
        debug!("drag start {:?} #{} {}", source, source_index, payload.key_name);
        let target = self.locate(pointer);
        self.state = DragState::Dragging(DragSession {
            source,
            source_index,
            payload,
            pointer,
            target,
        });
    }

    pub fn update(&mut self, pointer: Point) -> Option<DropZone> {
        let target = self.locate(pointer);
        match &mut self.state {
            DragState::Dragging(session) => {
                session.pointer = pointer;
                session.target = target;
                Some(target)
            }
            DragState::Idle => None,
        }
    }

    /// Ends the drag. `None` means there was nothing to drop, which callers
    /// treat as a cancellation.
    pub fn drop_at(&mut self, pointer: Point) -> Option<(DragSession, DropZone)> {
        let zone = self.locate(pointer);
        match std::mem::take(&mut self.state) {
            DragState::Dragging(session) if !session.payload.key_name.is_empty() => {
                Some((session, zone))
            }
            DragState::Dragging(_) => {
                debug!("drop with empty payload ignored");
                None
            }
            DragState::Idle => None,
        }
    }

    pub fn cancel(&mut self) -> bool {
        matches!(std::mem::take(&mut self.state), DragState::Dragging(_))
    }

    /// Applies a drop to a state snapshot. Rejections leave the input untouched.
    pub fn commit(
        &self,
        session: &DragSession,
        zone: DropZone,
        state: &LauncherState,
        folders: &FolderManager,
        dock: &DockManager,
    ) -> Result<DropOutcome, DropRejection> {
        let payload = &session.payload;
        let key = payload.key_name.clone();
        let mut next = state.clone();
        let mut events = Vec::new();

        match (&session.source, zone) {
            (_, DropZone::Outside) => return Err(DropRejection::OutsideDropZone),

            (DragSource::Dock, DropZone::Dock(target)) => {
                let to = match target {
                    DropTarget::Index(index) => index,
                    DropTarget::Append => state.dock.resident.len(),
                };
                next.dock = dock.reorder(&state.dock, session.source_index, to)?;
                events.push(LayoutEvent::ItemUpdate {
                    surface: Surface::Dock,
                });
            }

            (DragSource::Dock, DropZone::Desktop(position)) => {
                let (lists, _) = dock.remove_resident(&state.dock, &ItemMatcher::key(&key))?;
                next.desktop = drop_onto_desktop(folders, &state.desktop, payload.as_plain_app(), position)?;
                next.dock = lists;
                events.push(LayoutEvent::ItemDelete {
                    key_name: key.clone(),
                    surface: Surface::Dock,
                });
                events.push(LayoutEvent::ItemAdd {
                    key_name: key,
                    surface: Surface::Desktop,
                });
            }

            (DragSource::Desktop, DropZone::Dock(target)) => {
                let item = state
                    .desktop
                    .item(&key)
                    .ok_or_else(|| LayoutError::ItemNotFound(key.clone()))?;
                next.dock = dock.add_resident(&state.dock, item, index_of(target))?;
                next.desktop.remove(&key);
                events.push(LayoutEvent::ItemAdd {
                    key_name: key.clone(),
                    surface: Surface::Dock,
                });
                events.push(LayoutEvent::ItemDelete {
                    key_name: key,
                    surface: Surface::Desktop,
                });
            }

            (DragSource::Desktop, DropZone::Desktop(position)) => {
                next.desktop = move_on_desktop(folders, &state.desktop, &key, position)?;
                events.push(LayoutEvent::ItemUpdate {
                    surface: Surface::Desktop,
                });
            }

            (DragSource::Folder(folder_id), DropZone::Dock(target)) => {
                next.dock = dock.add_resident(&state.dock, payload, index_of(target))?;
                next.desktop = folders.remove_item(&state.desktop, &key, folder_id)?.layout;
                events.push(LayoutEvent::ItemAdd {
                    key_name: key.clone(),
                    surface: Surface::Dock,
                });
                events.push(LayoutEvent::ItemDelete {
                    key_name: key,
                    surface: Surface::Folder(folder_id.clone()),
                });
                events.push(LayoutEvent::ItemUpdate {
                    surface: Surface::Desktop,
                });
            }

            (DragSource::Folder(folder_id), DropZone::Desktop(position)) => {
                if state
                    .desktop
                    .item_at(position)
                    .and_then(LayoutItem::folder_id)
                    == Some(folder_id.as_str())
                {
                    return Err(LayoutError::Occupied.into());
                }
                let removal = folders.remove_item(&state.desktop, &key, folder_id)?;
                next.desktop = drop_onto_desktop(folders, &removal.layout, removal.removed, position)?;
                events.push(LayoutEvent::ItemDelete {
                    key_name: key,
                    surface: Surface::Folder(folder_id.clone()),
                });
                events.push(LayoutEvent::ItemUpdate {
                    surface: Surface::Desktop,
                });
            }
        }
        Ok(DropOutcome {
            state: next,
            events,
        })
    }
}

fn axis_index(axis: &[f32], value: f32) -> u32 {
    axis.iter()
        .position(|&boundary| value < boundary)
        .unwrap_or(axis.len().saturating_sub(1)) as u32
}

fn index_of(target: DropTarget) -> Option<usize> {
    match target {
        DropTarget::Index(index) => Some(index),
        DropTarget::Append => None,
    }
}

/// Puts an item that is not on the desktop onto the cell at `position`:
/// onto an app it makes a folder, onto a folder it joins it.
fn drop_onto_desktop(
    folders: &FolderManager,
    desktop: &DesktopLayout,
    item: LayoutItem,
    position: GridPosition,
) -> Result<DesktopLayout, LayoutError> {
    match desktop.item_at(position) {
        None => {
            let mut layout = desktop.clone();
            layout.insert_preferring(item, Some(position))?;
            Ok(layout)
        }
        Some(target) => {
            if let Some(folder_id) = target.folder_id() {
                return folders.add_item(desktop, &item, folder_id);
            }
            if !target.is_app() {
                return Err(LayoutError::Occupied);
            }
            let target_key = target.key_name.clone();
            let item_key = item.key_name.clone();
            let mut layout = desktop.clone();
            layout.insert(item)?;
            folders
                .create_folder(&layout, &target_key, &item_key)
                .map(|(layout, _)| layout)
        }
    }
}

fn move_on_desktop(
    folders: &FolderManager,
    desktop: &DesktopLayout,
    key_name: &str,
    position: GridPosition,
) -> Result<DesktopLayout, LayoutError> {
    let item = desktop
        .item(key_name)
        .ok_or_else(|| LayoutError::ItemNotFound(key_name.to_string()))?;
    match desktop.item_at(position) {
        Some(target) if target.key_name == key_name => Ok(desktop.clone()),
        Some(target) if target.is_folder() && item.is_app() => {
            let folder_id = target.folder_id().unwrap_or_default().to_string();
            folders.add_item(desktop, item, &folder_id)
        }
        Some(target) if target.is_app() && item.is_app() => folders
            .create_folder(desktop, &target.key_name, key_name)
            .map(|(layout, _)| layout),
        Some(_) => Err(LayoutError::Occupied),
        None => {
            if !desktop.is_vacant(position, item.area, Some(key_name)) {
                return Err(LayoutError::Occupied);
            }
            let mut layout = desktop.clone();
            let mut moved = layout
                .take(key_name)
                .ok_or_else(|| LayoutError::ItemNotFound(key_name.to_string()))?;
            let page = position.page.min(layout.page_count);
            moved.set_position(GridPosition { page, ..position });
            if page == layout.page_count {
                layout.page_count += 1;
            }
            layout.items.push(moved);
            layout.compact();
            Ok(layout)
        }
    }
}
