//! Client-side state holders.
//!
//! Session and UI state survive restarts through small JSON files;
//! domain snapshots live only in memory and are rebuilt from the store
//! on startup.

mod data;
mod session;
mod ui;

pub use data::DataStore;
pub use session::{SessionState, SessionStore};
pub use ui::{UiState, UiStore};
