//! Placement, packing and page compaction over a paged row/column grid.

use super::item::{Area, GridPosition, GridSpec, LayoutItem};
use crate::error::LayoutError;
use std::collections::{BTreeSet, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    At(GridPosition),
    NeedsNewPage,
}

/// Something wrong with a persisted or computed layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutIssue {
    OutOfBounds(String),
    Overlap(String, String),
    DuplicateKey(String),
    /// A folder left with zero or one member.
    UndersizedFolder(String),
    GridMismatch { expected: GridSpec, found: GridSpec },
}

struct Occupancy {
    grid: GridSpec,
    cells: Vec<Vec<bool>>,
}

impl Occupancy {
    fn new(grid: GridSpec, page_count: u32) -> Self {
        Self {
            grid,
            cells: vec![vec![false; grid.capacity()]; page_count as usize],
        }
    }

    fn mark(&mut self, item: &LayoutItem) {
        let Some(page) = self.cells.get_mut(item.page as usize) else {
            return;
        };
        let rows = item.row..item.row.saturating_add(item.area.height).min(self.grid.rows);
        for row in rows {
            let columns = item.column..item.column.saturating_add(item.area.width).min(self.grid.columns);
            for column in columns {
                page[(row * self.grid.columns + column) as usize] = true;
            }
        }
    }

    fn is_free(&self, page: u32, row: u32, column: u32, area: Area) -> bool {
        if !self.grid.contains(row, column, area) {
            return false;
        }
        let Some(cells) = self.cells.get(page as usize) else {
            return false;
        };
        (row..row + area.height).all(|r| {
            (column..column + area.width)
                .all(|c| !cells[(r * self.grid.columns + c) as usize])
        })
    }
}

fn check_fits(grid: GridSpec, area: Area) -> Result<(), LayoutError> {
    if grid.fits(area) {
        Ok(())
    } else {
        Err(LayoutError::DoesNotFit {
            width: area.width,
            height: area.height,
            columns: grid.columns,
            rows: grid.rows,
        })
    }
}

/// First vacant rectangle of `area` cells, scanning pages in order and each
/// page row by row.
pub fn place(
    items: &[LayoutItem],
    grid: GridSpec,
    area: Area,
    page_count: u32,
) -> Result<Placement, LayoutError> {
    check_fits(grid, area)?;
    let mut occupancy = Occupancy::new(grid, page_count);
    for item in items {
        occupancy.mark(item);
    }
    for page in 0..page_count {
        for row in 0..grid.rows {
            for column in 0..grid.columns {
                if occupancy.is_free(page, row, column, area) {
                    return Ok(Placement::At(GridPosition::new(page, row, column)));
                }
            }
        }
    }
    Ok(Placement::NeedsNewPage)
}

/// Whether `area` at `position` is inside the grid and clear of every item
/// except the one keyed `ignore`.
pub fn is_vacant(
    items: &[LayoutItem],
    grid: GridSpec,
    position: GridPosition,
    area: Area,
    ignore: Option<&str>,
) -> bool {
    if !grid.contains(position.row, position.column, area) {
        return false;
    }
    let mut probe = LayoutItem::add_sentinel();
    probe.set_position(position);
    probe.area = area;
    !items
        .iter()
        .filter(|item| Some(item.key_name.as_str()) != ignore)
        .any(|item| item.overlaps(&probe))
}

/// Packs a flat item sequence into pages of `grid.capacity()` items, left to
/// right and top to bottom, keeping input order. Add sentinels are dropped.
pub fn pack_into_pages(items: Vec<LayoutItem>, grid: GridSpec) -> Vec<Vec<LayoutItem>> {
    let capacity = grid.capacity().max(1);
    let columns = grid.columns.max(1) as usize;
    let mut pages: Vec<Vec<LayoutItem>> = Vec::new();
    for (index, mut item) in items
        .into_iter()
        .filter(|item| !item.is_add_sentinel())
        .enumerate()
    {
        let slot = index % capacity;
        item.set_position(GridPosition::new(
            (index / capacity) as u32,
            (slot / columns) as u32,
            (slot % columns) as u32,
        ));
        if slot == 0 {
            pages.push(Vec::with_capacity(capacity));
        }
        if let Some(page) = pages.last_mut() {
            page.push(item);
        }
    }
    pages
}

/// Appends the Add sentinel as the very last interior item.
pub fn with_add_sentinel(mut pages: Vec<Vec<LayoutItem>>, grid: GridSpec) -> Vec<Vec<LayoutItem>> {
    let Some(last) = pages.last() else {
        return pages;
    };
    if last.last().is_some_and(LayoutItem::is_add_sentinel) {
        return pages;
    }
    let capacity = grid.capacity().max(1);
    if last.len() >= capacity {
        pages.push(Vec::new());
    }
    let page_index = pages.len() - 1;
    if let Some(page) = pages.last_mut() {
        let slot = page.len() as u32;
        let columns = grid.columns.max(1);
        page.push(LayoutItem::add_sentinel().at(page_index as u32, slot / columns, slot % columns));
    }
    pages
}

pub fn without_add_sentinel(mut pages: Vec<Vec<LayoutItem>>) -> Vec<Vec<LayoutItem>> {
    if let Some(last) = pages.last_mut() {
        if last.last().is_some_and(LayoutItem::is_add_sentinel) {
            last.pop();
        }
        if last.is_empty() {
            pages.pop();
        }
    }
    pages
}

/// Removes empty pages by shifting each item's page down by the number of
/// empty pages before it. Returns the new page count, never below one.
pub fn compact_pages(items: &mut [LayoutItem]) -> u32 {
    let used: Vec<u32> = items
        .iter()
        .map(|item| item.page)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    for item in items.iter_mut() {
        if let Ok(rank) = used.binary_search(&item.page) {
            item.page = rank as u32;
        }
    }
    (used.len() as u32).max(1)
}

pub fn find_overlap(items: &[LayoutItem]) -> Option<(usize, usize)> {
    for (i, a) in items.iter().enumerate() {
        for (j, b) in items.iter().enumerate().skip(i + 1) {
            if a.overlaps(b) {
                return Some((i, j));
            }
        }
    }
    None
}

pub fn validate_layout(items: &[LayoutItem], grid: GridSpec) -> Vec<LayoutIssue> {
    let mut issues = Vec::new();
    for item in items {
        if !grid.fits(item.area) || !grid.contains(item.row, item.column, item.area) {
            issues.push(LayoutIssue::OutOfBounds(item.key_name.clone()));
        }
    }
    for (i, a) in items.iter().enumerate() {
        for b in items.iter().skip(i + 1) {
            if a.overlaps(b) {
                issues.push(LayoutIssue::Overlap(a.key_name.clone(), b.key_name.clone()));
            }
        }
    }
    let mut seen = HashSet::new();
    for item in items.iter().filter(|item| item.is_app()) {
        if !seen.insert(item.key_name.as_str()) {
            issues.push(LayoutIssue::DuplicateKey(item.key_name.clone()));
        }
    }
    issues
}
