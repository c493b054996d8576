use serde::{Deserialize, Serialize};

/// The eight domain tables held in the relational store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Profiles,
    Students,
    Teachers,
    Classes,
    Schedules,
    Grades,
    Attendance,
    Announcements,
}

impl Table {
    /// All tables, in a fixed order
    pub const ALL: [Table; 8] = [
        Table::Profiles,
        Table::Students,
        Table::Teachers,
        Table::Classes,
        Table::Schedules,
        Table::Grades,
        Table::Attendance,
        Table::Announcements,
    ];

    /// Position in `ALL`; stable index for per-table state
    pub fn index(&self) -> usize {
        match self {
            Table::Profiles => 0,
            Table::Students => 1,
            Table::Teachers => 2,
            Table::Classes => 3,
            Table::Schedules => 4,
            Table::Grades => 5,
            Table::Attendance => 6,
            Table::Announcements => 7,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Profiles => "profiles",
            Table::Students => "students",
            Table::Teachers => "teachers",
            Table::Classes => "classes",
            Table::Schedules => "schedules",
            Table::Grades => "grades",
            Table::Attendance => "attendance",
            Table::Announcements => "announcements",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "profiles" => Some(Table::Profiles),
            "students" => Some(Table::Students),
            "teachers" => Some(Table::Teachers),
            "classes" => Some(Table::Classes),
            "schedules" => Some(Table::Schedules),
            "grades" => Some(Table::Grades),
            "attendance" => Some(Table::Attendance),
            "announcements" => Some(Table::Announcements),
            _ => None,
        }
    }

    /// Columns that must be unique within this table (beyond the id)
    pub fn unique_columns(&self) -> &'static [&'static str] {
        match self {
            Table::Students => &["student_number"],
            Table::Teachers => &["staff_number"],
            _ => &[],
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_roundtrip() {
        for table in Table::ALL {
            assert_eq!(Table::from_str(table.as_str()), Some(table));
        }
    }

    #[test]
    fn test_index_matches_all_order() {
        for (i, table) in Table::ALL.iter().enumerate() {
            assert_eq!(table.index(), i);
        }
    }

    #[test]
    fn test_unique_columns() {
        assert_eq!(Table::Students.unique_columns(), &["student_number"]);
        assert!(Table::Grades.unique_columns().is_empty());
    }
}
