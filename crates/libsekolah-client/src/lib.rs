pub mod academic;
pub mod api;
pub mod auth;
pub mod autosave;
pub mod logging;
pub mod notice;
pub mod realtime;
pub mod stores;

pub use academic::Academic;
pub use api::Api;
pub use auth::AuthManager;
pub use autosave::Autosave;
pub use logging::init_logging;
pub use notice::{Notice, NoticeBus, NoticeLevel};
pub use realtime::{bind, watch_table, SnapshotCallback, TableWatcher};
pub use stores::{DataStore, SessionStore, UiStore};
