pub mod config;
pub mod constants;
pub mod error;
pub mod identity;
pub mod store;
pub mod types;

pub use config::{load_client_config, save_client_config, ClientConfig};
pub use error::SekolahError;
pub use identity::{IdentityProvider, MemoryIdentity, Session, SessionChange};
pub use store::{
    ChangeEvent, ChangeKind, Filter, FilterOp, MemoryBackend, Order, Query, RelationalStore, Row,
    SledBackend,
};
pub use types::{
    Announcement, AttendanceRecord, AttendanceStatus, Audience, ClassRoom, Grade,
    NewScheduleEntry, Profile, RecordId, Role, ScheduleEntry, Semester, Student, Table, Teacher,
    Weekday,
};
