use async_trait::async_trait;
use uuid::Uuid;

use super::repo_types::{Course, CourseChanges, CourseUpdate, CourseWithCount, NewCourse};
use crate::db::{is_unique_violation, PgStore};

#[async_trait]
pub trait CourseRepo: Send + Sync {
    async fn find_course(&self, id: Uuid) -> anyhow::Result<Option<Course>>;
    /// All courses, newest first.
    async fn list_courses(&self) -> anyhow::Result<Vec<CourseWithCount>>;
    /// Active courses ordered by name.
    async fn list_active_courses(&self) -> anyhow::Result<Vec<CourseWithCount>>;
    /// `None` when the code is already taken.
    async fn insert_course(&self, new: &NewCourse) -> anyhow::Result<Option<Course>>;
    async fn update_course(&self, id: Uuid, changes: &CourseChanges)
        -> anyhow::Result<CourseUpdate>;
    async fn delete_course(&self, id: Uuid) -> anyhow::Result<bool>;
}

const COURSE_COLUMNS: &str = "id, code, name, description, credits, capacity, instructor, \
                              schedule, is_active, created_at";

const COURSE_WITH_COUNT: &str = r#"
    SELECT c.id, c.code, c.name, c.description, c.credits, c.capacity, c.instructor,
           c.schedule, c.is_active, c.created_at,
           (SELECT COUNT(*) FROM enrollments e
             WHERE e.course_id = c.id AND e.status = 'ACTIVE') AS active_enrollments
      FROM courses c
"#;

#[async_trait]
impl CourseRepo for PgStore {
    async fn find_course(&self, id: Uuid) -> anyhow::Result<Option<Course>> {
        let course = sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(course)
    }

    async fn list_courses(&self) -> anyhow::Result<Vec<CourseWithCount>> {
        let rows = sqlx::query_as::<_, CourseWithCount>(&format!(
            "{COURSE_WITH_COUNT} ORDER BY c.created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_active_courses(&self) -> anyhow::Result<Vec<CourseWithCount>> {
        let rows = sqlx::query_as::<_, CourseWithCount>(&format!(
            "{COURSE_WITH_COUNT} WHERE c.is_active ORDER BY c.name ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn insert_course(&self, new: &NewCourse) -> anyhow::Result<Option<Course>> {
        let res = sqlx::query_as::<_, Course>(&format!(
            r#"
            INSERT INTO courses (code, name, description, credits, capacity, instructor,
                                 schedule, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {COURSE_COLUMNS}
            "#
        ))
        .bind(&new.code)
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.credits)
        .bind(new.capacity)
        .bind(&new.instructor)
        .bind(&new.schedule)
        .bind(new.is_active)
        .fetch_one(&self.pool)
        .await;
        match res {
            Ok(course) => Ok(Some(course)),
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_course(
        &self,
        id: Uuid,
        changes: &CourseChanges,
    ) -> anyhow::Result<CourseUpdate> {
        let res = sqlx::query_as::<_, Course>(&format!(
            r#"
            UPDATE courses
               SET code = COALESCE($2, code),
                   name = COALESCE($3, name),
                   description = COALESCE($4, description),
                   credits = COALESCE($5, credits),
                   capacity = COALESCE($6, capacity),
                   instructor = COALESCE($7, instructor),
                   schedule = COALESCE($8, schedule),
                   is_active = COALESCE($9, is_active)
             WHERE id = $1
            RETURNING {COURSE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.code)
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(changes.credits)
        .bind(changes.capacity)
        .bind(&changes.instructor)
        .bind(&changes.schedule)
        .bind(changes.is_active)
        .fetch_optional(&self.pool)
        .await;
        match res {
            Ok(Some(course)) => Ok(CourseUpdate::Updated(course)),
            Ok(None) => Ok(CourseUpdate::NotFound),
            Err(e) if is_unique_violation(&e) => Ok(CourseUpdate::CodeTaken),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_course(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
