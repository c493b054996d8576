//! Shared school constants: teaching days, lesson slots, subjects.

use crate::types::Weekday;

/// Teaching days, Monday through Saturday
pub const SCHOOL_DAYS: [Weekday; 6] = Weekday::ALL;

/// Lesson time slots. The gap after the fourth slot is the morning break.
pub const LESSON_SLOTS: [&str; 7] = [
    "07:00 - 07:45",
    "07:45 - 08:30",
    "08:30 - 09:15",
    "09:15 - 10:00",
    "10:15 - 11:00",
    "11:00 - 11:45",
    "11:45 - 12:30",
];

/// Subjects taught at the school
pub const SUBJECTS: [&str; 10] = [
    "Mathematics",
    "Indonesian",
    "English",
    "Natural Sciences",
    "Social Sciences",
    "Religious Education",
    "Civics",
    "Arts and Culture",
    "Physical Education",
    "Crafts",
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_no_duplicate_slots_or_subjects() {
        assert_eq!(LESSON_SLOTS.iter().collect::<HashSet<_>>().len(), 7);
        assert_eq!(SUBJECTS.iter().collect::<HashSet<_>>().len(), 10);
        assert_eq!(SCHOOL_DAYS.iter().collect::<HashSet<_>>().len(), 6);
    }
}
