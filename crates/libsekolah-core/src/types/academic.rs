use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ids::RecordId;

/// A class (homeroom group), e.g. "7A"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRoom {
    pub id: RecordId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homeroom_teacher_id: Option<RecordId>,
    pub capacity: u32,
    /// Academic year label, e.g. "2026/2027"
    pub academic_year: String,
    pub created_at: DateTime<Utc>,
}

/// School day. Saturday is a teaching day, Sunday is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    pub const ALL: [Weekday; 6] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "monday" => Some(Weekday::Monday),
            "tuesday" => Some(Weekday::Tuesday),
            "wednesday" => Some(Weekday::Wednesday),
            "thursday" => Some(Weekday::Thursday),
            "friday" => Some(Weekday::Friday),
            "saturday" => Some(Weekday::Saturday),
            _ => None,
        }
    }
}

/// One lesson in the weekly timetable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: RecordId,
    pub day: Weekday,
    /// Lesson slot label, e.g. "07:00 - 07:45"
    pub time_slot: String,
    pub subject: String,
    pub teacher_id: RecordId,
    pub class_id: RecordId,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a schedule entry (id and created_at are
/// assigned by the store)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewScheduleEntry {
    pub day: Weekday,
    pub time_slot: String,
    pub subject: String,
    pub teacher_id: RecordId,
    pub class_id: RecordId,
}

/// Semester within the academic year, serialized as 1 or 2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Semester {
    First,
    Second,
}

impl TryFrom<u8> for Semester {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Semester::First),
            2 => Ok(Semester::Second),
            other => Err(format!("semester must be 1 or 2, got {}", other)),
        }
    }
}

impl From<Semester> for u8 {
    fn from(s: Semester) -> u8 {
        match s {
            Semester::First => 1,
            Semester::Second => 2,
        }
    }
}

/// A subject score for one student. Scores are expected in [0, 100]
/// but not enforced at the store level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub id: RecordId,
    pub student_id: RecordId,
    pub subject: String,
    pub score: f64,
    pub semester: Semester,
    pub created_at: DateTime<Utc>,
}

/// Daily attendance status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Sick,
    Excused,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Sick => "sick",
            AttendanceStatus::Excused => "excused",
            AttendanceStatus::Absent => "absent",
        }
    }
}

/// One attendance record per student per date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: RecordId,
    pub student_id: RecordId,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Who an announcement is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    All,
    Teacher,
    Student,
}

/// A school announcement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: RecordId,
    pub title: String,
    pub body: String,
    pub audience: Audience,
    pub important: bool,
    pub author_id: RecordId,
    pub created_at: DateTime<Utc>,
}
