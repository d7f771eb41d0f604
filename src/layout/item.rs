use serde::{Deserialize, Serialize};

/// Columns x rows of one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSpec {
    pub columns: u32,
    pub rows: u32,
}

impl GridSpec {
    pub const fn new(columns: u32, rows: u32) -> Self {
        Self { columns, rows }
    }

    pub fn capacity(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    pub fn fits(&self, area: Area) -> bool {
        area.width >= 1 && area.height >= 1 && area.width <= self.columns && area.height <= self.rows
    }

    /// Whether `area` anchored at `row`/`column` stays inside one page.
    pub fn contains(&self, row: u32, column: u32, area: Area) -> bool {
        matches!(row.checked_add(area.height), Some(end) if end <= self.rows)
            && matches!(column.checked_add(area.width), Some(end) if end <= self.columns)
    }
}

/// Footprint in cells, serialized as `[width, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct Area {
    pub width: u32,
    pub height: u32,
}

impl Area {
    pub const UNIT: Area = Area {
        width: 1,
        height: 1,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Area {
    fn default() -> Self {
        Self::UNIT
    }
}

impl From<[u32; 2]> for Area {
    fn from([width, height]: [u32; 2]) -> Self {
        Self { width, height }
    }
}

impl From<Area> for [u32; 2] {
    fn from(area: Area) -> Self {
        [area.width, area.height]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    pub page: u32,
    pub row: u32,
    pub column: u32,
}

impl GridPosition {
    pub const fn new(page: u32, row: u32, column: u32) -> Self {
        Self { page, row, column }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "typeId", rename_all = "camelCase")]
pub enum ItemKind {
    App,
    Card {
        #[serde(rename = "cardId")]
        card_id: u64,
    },
    Folder(FolderData),
    /// Trailing "add apps" tile of an open folder.
    Add,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderData {
    pub folder_id: String,
    pub folder_name: String,
    #[serde(default)]
    pub layout_info: Vec<Vec<LayoutItem>>,
}

impl FolderData {
    pub fn members(&self) -> impl Iterator<Item = &LayoutItem> + '_ {
        self.layout_info
            .iter()
            .flatten()
            .filter(|item| !item.is_add_sentinel())
    }

    pub fn member_list(&self) -> Vec<LayoutItem> {
        self.members().cloned().collect()
    }

    pub fn member_count(&self) -> usize {
        self.members().count()
    }

    pub fn contains(&self, key_name: &str) -> bool {
        self.members().any(|item| item.key_name == key_name)
    }

    pub fn badge_total(&self) -> u32 {
        self.members()
            .fold(0u32, |total, item| total.saturating_add(item.badge_number))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutItem {
    pub key_name: String,
    #[serde(default)]
    pub bundle_name: String,
    #[serde(default)]
    pub ability_name: String,
    #[serde(default)]
    pub module_name: String,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub row: u32,
    #[serde(default)]
    pub column: u32,
    #[serde(default)]
    pub area: Area,
    #[serde(default)]
    pub badge_number: u32,
    #[serde(flatten)]
    pub kind: ItemKind,
}

pub fn make_key_name(bundle_name: &str, ability_name: &str, module_name: &str) -> String {
    format!("{bundle_name}{ability_name}{module_name}")
}

impl LayoutItem {
    pub fn app(bundle_name: &str, ability_name: &str, module_name: &str) -> Self {
        Self {
            key_name: make_key_name(bundle_name, ability_name, module_name),
            bundle_name: bundle_name.to_string(),
            ability_name: ability_name.to_string(),
            module_name: module_name.to_string(),
            page: 0,
            row: 0,
            column: 0,
            area: Area::UNIT,
            badge_number: 0,
            kind: ItemKind::App,
        }
    }

    pub fn card(bundle_name: &str, card_id: u64, area: Area) -> Self {
        Self {
            key_name: format!("{bundle_name}#card{card_id}"),
            bundle_name: bundle_name.to_string(),
            ability_name: String::new(),
            module_name: String::new(),
            page: 0,
            row: 0,
            column: 0,
            area,
            badge_number: 0,
            kind: ItemKind::Card { card_id },
        }
    }

    pub fn folder(folder_id: &str, folder_name: &str, area: Area) -> Self {
        Self {
            key_name: folder_id.to_string(),
            bundle_name: String::new(),
            ability_name: String::new(),
            module_name: String::new(),
            page: 0,
            row: 0,
            column: 0,
            area,
            badge_number: 0,
            kind: ItemKind::Folder(FolderData {
                folder_id: folder_id.to_string(),
                folder_name: folder_name.to_string(),
                layout_info: Vec::new(),
            }),
        }
    }

    pub fn add_sentinel() -> Self {
        Self {
            key_name: String::new(),
            bundle_name: String::new(),
            ability_name: String::new(),
            module_name: String::new(),
            page: 0,
            row: 0,
            column: 0,
            area: Area::UNIT,
            badge_number: 0,
            kind: ItemKind::Add,
        }
    }

    pub fn at(mut self, page: u32, row: u32, column: u32) -> Self {
        self.set_position(GridPosition::new(page, row, column));
        self
    }

    pub fn with_badge(mut self, badge_number: u32) -> Self {
        self.badge_number = badge_number;
        self
    }

    pub fn position(&self) -> GridPosition {
        GridPosition::new(self.page, self.row, self.column)
    }

    pub fn set_position(&mut self, position: GridPosition) {
        self.page = position.page;
        self.row = position.row;
        self.column = position.column;
    }

    pub fn is_app(&self) -> bool {
        matches!(self.kind, ItemKind::App)
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, ItemKind::Folder(_))
    }

    pub fn is_add_sentinel(&self) -> bool {
        matches!(self.kind, ItemKind::Add)
    }

    pub fn folder_data(&self) -> Option<&FolderData> {
        match &self.kind {
            ItemKind::Folder(data) => Some(data),
            _ => None,
        }
    }

    pub fn folder_data_mut(&mut self) -> Option<&mut FolderData> {
        match &mut self.kind {
            ItemKind::Folder(data) => Some(data),
            _ => None,
        }
    }

    pub fn folder_id(&self) -> Option<&str> {
        self.folder_data().map(|data| data.folder_id.as_str())
    }

    /// Whether the item's rectangle covers the given cell.
    pub fn covers(&self, row: u32, column: u32) -> bool {
        self.row <= row && row < self.row_end() && self.column <= column && column < self.column_end()
    }

    pub fn overlaps(&self, other: &LayoutItem) -> bool {
        self.page == other.page
            && self.row < other.row_end()
            && other.row < self.row_end()
            && self.column < other.column_end()
            && other.column < self.column_end()
    }

    /// First row below the item; saturates for corrupt coordinates.
    fn row_end(&self) -> u32 {
        self.row.saturating_add(self.area.height)
    }

    fn column_end(&self) -> u32 {
        self.column.saturating_add(self.area.width)
    }

    /// Copy of this item as a plain single-cell app, keeping its identity and badge.
    pub fn as_plain_app(&self) -> LayoutItem {
        LayoutItem {
            area: Area::UNIT,
            kind: ItemKind::App,
            ..self.clone()
        }
    }
}
