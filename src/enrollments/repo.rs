use async_trait::async_trait;
use uuid::Uuid;

use super::repo_types::{
    CourseEnrollee, EnrollInsert, Enrollment, EnrollmentParties, EnrollmentStatus,
    EnrollmentWithCourse,
};
use crate::db::{is_unique_violation, PgStore};

#[async_trait]
pub trait EnrollmentRepo: Send + Sync {
    async fn find_enrollment(&self, id: Uuid) -> anyhow::Result<Option<Enrollment>>;
    async fn find_enrollment_parties(&self, id: Uuid)
        -> anyhow::Result<Option<EnrollmentParties>>;
    async fn find_enrollment_for(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> anyhow::Result<Option<Enrollment>>;
    async fn count_active_enrollments(&self, course_id: Uuid) -> anyhow::Result<i64>;
    /// Re-checks capacity and uniqueness atomically with the insert.
    async fn insert_enrollment(&self, user_id: Uuid, course_id: Uuid)
        -> anyhow::Result<EnrollInsert>;
    async fn set_enrollment_status(
        &self,
        id: Uuid,
        status: EnrollmentStatus,
    ) -> anyhow::Result<Option<Enrollment>>;
    async fn set_enrollment_grade(&self, id: Uuid, grade: &str)
        -> anyhow::Result<Option<Enrollment>>;
    /// Newest first.
    async fn list_enrollments_for_user(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Vec<EnrollmentWithCourse>>;
    async fn list_course_enrollments(&self, course_id: Uuid)
        -> anyhow::Result<Vec<CourseEnrollee>>;
}

const ENROLLMENT_COLUMNS: &str = "id, user_id, course_id, status, grade, enrolled_at";

#[async_trait]
impl EnrollmentRepo for PgStore {
    async fn find_enrollment(&self, id: Uuid) -> anyhow::Result<Option<Enrollment>> {
        let row = sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_enrollment_parties(
        &self,
        id: Uuid,
    ) -> anyhow::Result<Option<EnrollmentParties>> {
        let row = sqlx::query_as::<_, EnrollmentParties>(
            r#"
            SELECT e.id, e.user_id, e.course_id, e.status, e.grade, e.enrolled_at,
                   u.name AS student_name, c.name AS course_name
              FROM enrollments e
              JOIN users u ON u.id = e.user_id
              JOIN courses c ON c.id = e.course_id
             WHERE e.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_enrollment_for(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> anyhow::Result<Option<Enrollment>> {
        let row = sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE user_id = $1 AND course_id = $2"
        ))
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn count_active_enrollments(&self, course_id: Uuid) -> anyhow::Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM enrollments WHERE course_id = $1 AND status = 'ACTIVE'",
        )
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn insert_enrollment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> anyhow::Result<EnrollInsert> {
        let mut tx = self.pool.begin().await?;

        // Row lock serialises concurrent enrollments into the same course.
        let capacity: Option<(i32,)> =
            sqlx::query_as("SELECT capacity FROM courses WHERE id = $1 FOR UPDATE")
                .bind(course_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((capacity,)) = capacity else {
            return Ok(EnrollInsert::CourseMissing);
        };

        let (active,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM enrollments WHERE course_id = $1 AND status = 'ACTIVE'",
        )
        .bind(course_id)
        .fetch_one(&mut *tx)
        .await?;
        if active >= i64::from(capacity) {
            return Ok(EnrollInsert::Full);
        }

        let res = sqlx::query_as::<_, Enrollment>(&format!(
            r#"
            INSERT INTO enrollments (user_id, course_id, status)
            VALUES ($1, $2, 'ACTIVE')
            RETURNING {ENROLLMENT_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&mut *tx)
        .await;
        let enrollment = match res {
            Ok(e) => e,
            Err(e) if is_unique_violation(&e) => return Ok(EnrollInsert::Duplicate),
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;
        Ok(EnrollInsert::Created(enrollment))
    }

    async fn set_enrollment_status(
        &self,
        id: Uuid,
        status: EnrollmentStatus,
    ) -> anyhow::Result<Option<Enrollment>> {
        let row = sqlx::query_as::<_, Enrollment>(&format!(
            "UPDATE enrollments SET status = $2 WHERE id = $1 RETURNING {ENROLLMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn set_enrollment_grade(
        &self,
        id: Uuid,
        grade: &str,
    ) -> anyhow::Result<Option<Enrollment>> {
        let row = sqlx::query_as::<_, Enrollment>(&format!(
            "UPDATE enrollments SET grade = $2 WHERE id = $1 RETURNING {ENROLLMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(grade)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_enrollments_for_user(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Vec<EnrollmentWithCourse>> {
        let rows = sqlx::query_as::<_, EnrollmentWithCourse>(
            r#"
            SELECT e.id, e.user_id, e.course_id, e.status, e.grade, e.enrolled_at,
                   c.code AS course_code, c.name AS course_name, c.credits AS course_credits,
                   c.instructor AS course_instructor, c.schedule AS course_schedule
              FROM enrollments e
              JOIN courses c ON c.id = e.course_id
             WHERE e.user_id = $1
             ORDER BY e.enrolled_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_course_enrollments(
        &self,
        course_id: Uuid,
    ) -> anyhow::Result<Vec<CourseEnrollee>> {
        let rows = sqlx::query_as::<_, CourseEnrollee>(
            r#"
            SELECT e.id AS enrollment_id, e.user_id, u.name AS student_name,
                   u.email AS student_email, e.status, e.grade, e.enrolled_at
              FROM enrollments e
              JOIN users u ON u.id = e.user_id
             WHERE e.course_id = $1
             ORDER BY u.name ASC
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
