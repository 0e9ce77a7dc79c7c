//! 展示后端实现

pub mod audio;
pub mod command;
pub mod event_table;
pub mod menu;
pub mod tray;
pub mod urgent;
pub mod visual;

pub use audio::AudioBackend;
pub use command::{build_invocation, CommandBackend, Invocation};
pub use event_table::{EventRecord, EventTable, Pixmap};
pub use menu::MenuEntry;
pub use tray::{CategoryPresentation, TrayBackend, TraySnapshot};
pub use urgent::UrgentBackend;
pub use visual::{Popup, VisualBackend};
