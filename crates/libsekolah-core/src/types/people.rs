use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ids::RecordId;
use super::role::Role;

/// Account profile, one per identity. The id equals the identity id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Absent on profiles fabricated in memory (never stored)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A student row. `student_number` is unique school-wide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: RecordId,
    pub student_number: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    /// Class the student belongs to, if assigned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<RecordId>,
    pub created_at: DateTime<Utc>,
}

/// A teacher row. `staff_number` is unique school-wide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: RecordId,
    pub staff_number: String,
    pub name: String,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_optional_fields_default() {
        let json = serde_json::json!({
            "id": RecordId::generate(),
            "student_number": "2024-001",
            "name": "Budi Santoso",
            "created_at": "2026-08-01T07:00:00Z",
        });
        let student: Student = serde_json::from_value(json).unwrap();
        assert!(student.class_id.is_none());
        assert!(student.email.is_none());
    }

    #[test]
    fn test_profile_without_created_at() {
        let json = serde_json::json!({
            "id": RecordId::generate(),
            "name": "Administrator",
            "email": "admin@smp.example",
            "role": "admin",
        });
        let profile: Profile = serde_json::from_value(json).unwrap();
        assert_eq!(profile.role, Role::Admin);
        assert!(profile.created_at.is_none());
    }
}
