use async_trait::async_trait;
use time::Date;
use uuid::Uuid;

use super::repo_types::{AttendanceMark, AttendanceRecord, AttendanceTally, StudentAttendanceRow};
use crate::db::PgStore;

#[async_trait]
pub trait AttendanceRepo: Send + Sync {
    /// Upserts every mark keyed by (student, course, date) in one transaction.
    async fn upsert_attendance(
        &self,
        course_id: Uuid,
        date: Date,
        marks: &[AttendanceMark],
        marked_by: Uuid,
    ) -> anyhow::Result<usize>;
    async fn list_course_attendance(
        &self,
        course_id: Uuid,
        date: Date,
    ) -> anyhow::Result<Vec<AttendanceRecord>>;
    async fn list_student_attendance(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Vec<StudentAttendanceRow>>;
    async fn attendance_tally(&self, user_id: Uuid, course_id: Uuid)
        -> anyhow::Result<AttendanceTally>;
}

#[async_trait]
impl AttendanceRepo for PgStore {
    async fn upsert_attendance(
        &self,
        course_id: Uuid,
        date: Date,
        marks: &[AttendanceMark],
        marked_by: Uuid,
    ) -> anyhow::Result<usize> {
        let mut tx = self.pool.begin().await?;
        for mark in marks {
            sqlx::query(
                r#"
                INSERT INTO attendance (user_id, course_id, date, status, marked_by)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (user_id, course_id, date) DO UPDATE
                   SET status = EXCLUDED.status,
                       marked_by = EXCLUDED.marked_by,
                       updated_at = now()
                "#,
            )
            .bind(mark.user_id)
            .bind(course_id)
            .bind(date)
            .bind(mark.status)
            .bind(marked_by)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(marks.len())
    }

    async fn list_course_attendance(
        &self,
        course_id: Uuid,
        date: Date,
    ) -> anyhow::Result<Vec<AttendanceRecord>> {
        let rows = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            SELECT id, user_id, course_id, date, status, marked_by
              FROM attendance
             WHERE course_id = $1 AND date = $2
            "#,
        )
        .bind(course_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_student_attendance(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Vec<StudentAttendanceRow>> {
        let rows = sqlx::query_as::<_, StudentAttendanceRow>(
            r#"
            SELECT a.course_id, c.code AS course_code, c.name AS course_name, a.date, a.status
              FROM attendance a
              JOIN courses c ON c.id = a.course_id
             WHERE a.user_id = $1
             ORDER BY c.name ASC, a.date DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn attendance_tally(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> anyhow::Result<AttendanceTally> {
        let tally = sqlx::query_as::<_, AttendanceTally>(
            r#"
            SELECT COUNT(*) FILTER (WHERE status = 'PRESENT') AS present,
                   COUNT(*) FILTER (WHERE status = 'LATE') AS late,
                   COUNT(*) FILTER (WHERE status = 'ABSENT') AS absent
              FROM attendance
             WHERE user_id = $1 AND course_id = $2
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(tally)
    }
}
