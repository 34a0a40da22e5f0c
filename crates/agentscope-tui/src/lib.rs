//! TUI components for agentscope
//!
//! This crate provides the terminal user interface for agentscope,
//! including view state, keybindings, event handling, and the log viewer.

pub mod app;
pub mod config;
pub mod tui;
pub mod ui;

pub use app::{Action, AppState, UiState, ViewCache};
pub use config::{KeyBinding, KeyBindings, KeyContext};
pub use tui::{Event, EventHandler, Tui};
pub use ui::components::{HelpOverlay, StatusBar};
pub use ui::screens::LogViewerScreen;
pub use ui::{Layout, LogViewerAreas, Theme};
