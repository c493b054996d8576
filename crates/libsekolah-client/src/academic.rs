//! Typed convenience queries over the generic data access layer, plus
//! the application-level guards: class deletion and schedule slot
//! conflicts.

use serde::de::DeserializeOwned;
use serde_json::Value;

use libsekolah_core::store::{from_row, to_row, Filter, Query};
use libsekolah_core::{
    Announcement, AttendanceRecord, ClassRoom, Grade, NewScheduleEntry, RecordId, ScheduleEntry,
    SekolahError, Student, Table, Teacher,
};

use crate::api::Api;

#[derive(Clone)]
pub struct Academic {
    api: Api,
}

impl Academic {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &Api {
        &self.api
    }

    async fn fetch_typed<T: DeserializeOwned>(
        &self,
        table: Table,
        query: &Query,
    ) -> Result<Vec<T>, SekolahError> {
        let rows = self.api.fetch_all(table, query).await?;
        rows.into_iter().map(from_row).collect()
    }

    /// All students, ordered by name
    pub async fn students(&self) -> Result<Vec<Student>, SekolahError> {
        self.fetch_typed(Table::Students, &Query::new().order_by("name", true))
            .await
    }

    /// Students assigned to one class, ordered by name
    pub async fn students_in_class(&self, class_id: RecordId) -> Result<Vec<Student>, SekolahError> {
        let query = Query::new()
            .filter(Filter::eq("class_id", Value::String(class_id.to_string())))
            .order_by("name", true);
        self.fetch_typed(Table::Students, &query).await
    }

    /// All teachers, ordered by name
    pub async fn teachers(&self) -> Result<Vec<Teacher>, SekolahError> {
        self.fetch_typed(Table::Teachers, &Query::new().order_by("name", true))
            .await
    }

    /// All classes, ordered by name
    pub async fn classes(&self) -> Result<Vec<ClassRoom>, SekolahError> {
        self.fetch_typed(Table::Classes, &Query::new().order_by("name", true))
            .await
    }

    /// Weekly timetable for one class
    pub async fn schedule_for_class(
        &self,
        class_id: RecordId,
    ) -> Result<Vec<ScheduleEntry>, SekolahError> {
        let query = Query::new()
            .filter(Filter::eq("class_id", Value::String(class_id.to_string())))
            .order_by("day", true);
        self.fetch_typed(Table::Schedules, &query).await
    }

    /// Weekly timetable for one teacher
    pub async fn schedule_for_teacher(
        &self,
        teacher_id: RecordId,
    ) -> Result<Vec<ScheduleEntry>, SekolahError> {
        let query = Query::new()
            .filter(Filter::eq("teacher_id", Value::String(teacher_id.to_string())))
            .order_by("day", true);
        self.fetch_typed(Table::Schedules, &query).await
    }

    /// All grades, newest first
    pub async fn grades(&self) -> Result<Vec<Grade>, SekolahError> {
        self.fetch_typed(Table::Grades, &Query::new().order_by("created_at", false))
            .await
    }

    /// Grades for one student, newest first
    pub async fn grades_for_student(
        &self,
        student_id: RecordId,
    ) -> Result<Vec<Grade>, SekolahError> {
        let query = Query::new()
            .filter(Filter::eq("student_id", Value::String(student_id.to_string())))
            .order_by("created_at", false);
        self.fetch_typed(Table::Grades, &query).await
    }

    /// All attendance records, newest date first
    pub async fn attendance(&self) -> Result<Vec<AttendanceRecord>, SekolahError> {
        self.fetch_typed(Table::Attendance, &Query::new().order_by("date", false))
            .await
    }

    /// Attendance for one student, newest date first
    pub async fn attendance_for_student(
        &self,
        student_id: RecordId,
    ) -> Result<Vec<AttendanceRecord>, SekolahError> {
        let query = Query::new()
            .filter(Filter::eq("student_id", Value::String(student_id.to_string())))
            .order_by("date", false);
        self.fetch_typed(Table::Attendance, &query).await
    }

    /// All announcements, newest first
    pub async fn announcements(&self) -> Result<Vec<Announcement>, SekolahError> {
        self.fetch_typed(
            Table::Announcements,
            &Query::new().order_by("created_at", false),
        )
        .await
    }

    /// Create a schedule entry. Rejected when the class already has a
    /// lesson in the same slot on the same day.
    pub async fn create_schedule(
        &self,
        entry: &NewScheduleEntry,
    ) -> Result<ScheduleEntry, SekolahError> {
        let query = Query::new()
            .filter(Filter::eq(
                "class_id",
                Value::String(entry.class_id.to_string()),
            ))
            .filter(Filter::eq("day", serde_json::to_value(entry.day)?))
            .filter(Filter::eq("time_slot", Value::String(entry.time_slot.clone())));
        let occupied = self.api.fetch_all(Table::Schedules, &query).await?;
        if !occupied.is_empty() {
            let message = format!(
                "class already has a lesson on {} at {}",
                entry.day.as_str(),
                entry.time_slot
            );
            self.api.notices().error(&message);
            return Err(SekolahError::Conflict(message));
        }

        let created = self.api.create(Table::Schedules, to_row(entry)?).await?;
        from_row(created)
    }

    /// Delete a class. Rejected while any student still references it;
    /// the error names the student count.
    pub async fn delete_class(&self, class_id: RecordId) -> Result<(), SekolahError> {
        let class = self.api.fetch_by_id(Table::Classes, class_id).await?;
        let name = class
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("(unnamed)")
            .to_string();

        let query =
            Query::new().filter(Filter::eq("class_id", Value::String(class_id.to_string())));
        let students = self.api.fetch_all(Table::Students, &query).await?;
        if !students.is_empty() {
            let message = format!(
                "cannot delete class {}: {} student(s) still assigned",
                name,
                students.len()
            );
            self.api.notices().error(&message);
            return Err(SekolahError::Conflict(message));
        }

        self.api.delete(Table::Classes, class_id).await
    }
}
