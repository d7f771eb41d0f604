//! Error taxonomy and the user-facing notices the launcher surfaces for them.

use thiserror::Error;

/// Placement and folder failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("item {0} is not on the desktop")]
    ItemNotFound(String),
    #[error("folder {0} does not exist")]
    FolderNotFound(String),
    #[error("item {0} is already placed")]
    Duplicate(String),
    #[error("area {width}x{height} does not fit a {columns}x{rows} grid")]
    DoesNotFit {
        width: u32,
        height: u32,
        columns: u32,
        rows: u32,
    },
    #[error("item {0} cannot be used here")]
    Unsupported(String),
    #[error("target cell is occupied")]
    Occupied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DockRejection {
    #[error("dock is full")]
    Full,
    #[error("item is already in the dock")]
    Duplicate,
    #[error("only apps can be pinned to the dock")]
    Unsupported,
    #[error("dock item is not editable")]
    NotEditable,
    #[error("dock item not found")]
    NotFound,
    #[error("dock slot is locked")]
    Locked,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DropRejection {
    #[error("drop outside any drop zone")]
    OutsideDropZone,
    #[error(transparent)]
    Dock(#[from] DockRejection),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("layout store io: {0}")]
    Io(#[from] std::io::Error),
    #[error("layout store json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("layout version {found} is newer than supported {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
    #[error("layout store unavailable")]
    Unavailable,
}

/// Transient message shown to the user after a rejected operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    NoSpaceInDock,
    DuplicateItem,
    NotEditable,
    MoveNotAllowed,
    UnsupportedItem,
    DesktopFull,
}

impl Notice {
    pub fn message(self) -> &'static str {
        match self {
            Notice::NoSpaceInDock => "No space in the dock",
            Notice::DuplicateItem => "Already added",
            Notice::NotEditable => "This item cannot be removed",
            Notice::MoveNotAllowed => "This item cannot be moved",
            Notice::UnsupportedItem => "Only apps can be added here",
            Notice::DesktopFull => "No space on the desktop",
        }
    }
}

impl DockRejection {
    pub fn notice(self) -> Option<Notice> {
        match self {
            DockRejection::Full => Some(Notice::NoSpaceInDock),
            DockRejection::Duplicate => Some(Notice::DuplicateItem),
            DockRejection::Unsupported => Some(Notice::UnsupportedItem),
            DockRejection::NotEditable => Some(Notice::NotEditable),
            DockRejection::Locked => Some(Notice::MoveNotAllowed),
            DockRejection::NotFound => None,
        }
    }
}

impl LayoutError {
    pub fn notice(&self) -> Option<Notice> {
        match self {
            LayoutError::Duplicate(_) => Some(Notice::DuplicateItem),
            LayoutError::DoesNotFit { .. } => Some(Notice::DesktopFull),
            LayoutError::Unsupported(_) => Some(Notice::UnsupportedItem),
            LayoutError::Occupied => Some(Notice::MoveNotAllowed),
            LayoutError::ItemNotFound(_) | LayoutError::FolderNotFound(_) => None,
        }
    }
}

impl DropRejection {
    pub fn notice(&self) -> Option<Notice> {
        match self {
            DropRejection::Dock(dock) => dock.notice(),
            DropRejection::Layout(layout) => layout.notice(),
            DropRejection::OutsideDropZone => None,
        }
    }
}
