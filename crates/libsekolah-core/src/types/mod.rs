pub mod academic;
pub mod ids;
pub mod people;
pub mod role;
pub mod table;

pub use academic::{
    Announcement, AttendanceRecord, AttendanceStatus, Audience, ClassRoom, Grade,
    NewScheduleEntry, ScheduleEntry, Semester, Weekday,
};
pub use ids::RecordId;
pub use people::{Profile, Student, Teacher};
pub use role::Role;
pub use table::Table;
