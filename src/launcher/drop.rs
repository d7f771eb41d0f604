use super::LauncherRuntime;
use crate::drag::{DragSource, DropZone, Point, Rect};
use crate::error::DropRejection;
use crate::layout::LayoutItem;
use log::{debug, info};

impl LauncherRuntime {
    /// Records the dock's on-screen bounds and recomputes its slot boundaries.
    pub fn set_dock_area(&mut self, area: Rect) {
        self.drag.set_dock_area(area);
        self.drag
            .update_slot_boundaries(self.state.dock.resident.len());
    }

    pub fn set_desktop_area(&mut self, area: Rect) {
        self.drag.set_desktop_area(area);
    }

    pub fn set_desktop_page(&mut self, page: u32) {
        self.drag.set_desktop_page(page);
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    /// Starts dragging `key_name` out of `source`. Fails when the item is not
    /// where the caller says it is.
    pub fn begin_drag(&mut self, source: DragSource, key_name: &str, pointer: Point) -> bool {
        let Some((index, payload)) = self.drag_payload(&source, key_name) else {
            debug!("nothing to drag for {} in {:?}", key_name, source);
            return false;
        };
        self.drag.start(source, index, payload, pointer);
        true
    }

    pub fn drag_to(&mut self, pointer: Point) -> Option<DropZone> {
        self.drag.update(pointer)
    }

    /// Ends the current drag at `pointer`. Returns whether the layout changed.
    pub fn drop_at(&mut self, pointer: Point) -> bool {
        let Some((session, zone)) = self.drag.drop_at(pointer) else {
            debug!("drop without a session, treated as cancel");
            return false;
        };
        let result =
            self.drag
                .commit(&session, zone, &self.state, &self.folders, &self.dock);
        match result {
            Ok(outcome) => {
                if outcome.state == self.state {
                    return false;
                }
                info!("dropped {} onto {:?}", session.payload.key_name, zone);
                self.commit(outcome.state, outcome.events);
                true
            }
            Err(DropRejection::OutsideDropZone) => {
                debug!("{} dropped outside any target", session.payload.key_name);
                false
            }
            Err(rejection) => {
                let notice = rejection.notice();
                self.reject("drop", &rejection, notice);
                false
            }
        }
    }

    pub fn cancel_drag(&mut self) -> bool {
        self.drag.cancel()
    }

    fn drag_payload(&self, source: &DragSource, key_name: &str) -> Option<(usize, LayoutItem)> {
        match source {
            DragSource::Dock => self
                .state
                .dock
                .resident
                .iter()
                .enumerate()
                .find(|(_, item)| item.key_name == key_name)
                .map(|(index, item)| (index, item.to_layout_item())),
            DragSource::Desktop => self
                .state
                .desktop
                .items
                .iter()
                .enumerate()
                .find(|(_, item)| item.key_name == key_name)
                .map(|(index, item)| (index, item.clone())),
            DragSource::Folder(folder_id) => self
                .state
                .desktop
                .folder(folder_id)
                .and_then(LayoutItem::folder_data)
                .and_then(|data| {
                    data.members()
                        .enumerate()
                        .find(|(_, item)| item.key_name == key_name)
                        .map(|(index, item)| (index, item.clone()))
                }),
        }
    }
}
