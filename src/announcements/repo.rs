use async_trait::async_trait;
use uuid::Uuid;

use super::repo_types::{Announcement, AnnouncementWithCourse, NewAnnouncement};
use crate::db::PgStore;

#[async_trait]
pub trait AnnouncementRepo: Send + Sync {
    async fn insert_announcement(&self, new: &NewAnnouncement) -> anyhow::Result<Announcement>;
    async fn find_announcement(&self, id: Uuid) -> anyhow::Result<Option<Announcement>>;
    /// Every announcement, newest first.
    async fn list_announcements(&self) -> anyhow::Result<Vec<AnnouncementWithCourse>>;
    /// Active announcements that are global or scoped to a course the student is
    /// actively enrolled in, newest first.
    async fn list_announcements_for_student(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Vec<AnnouncementWithCourse>>;
    async fn delete_announcement(&self, id: Uuid) -> anyhow::Result<bool>;
}

const WITH_COURSE: &str = r#"
    SELECT a.id, a.title, a.content, a.priority, a.course_id, a.is_active, a.created_at,
           c.code AS course_code, c.name AS course_name
      FROM announcements a
      LEFT JOIN courses c ON c.id = a.course_id
"#;

#[async_trait]
impl AnnouncementRepo for PgStore {
    async fn insert_announcement(&self, new: &NewAnnouncement) -> anyhow::Result<Announcement> {
        let row = sqlx::query_as::<_, Announcement>(
            r#"
            INSERT INTO announcements (title, content, priority, course_id, is_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, title, content, priority, course_id, is_active, created_at
            "#,
        )
        .bind(&new.title)
        .bind(&new.content)
        .bind(new.priority)
        .bind(new.course_id)
        .bind(new.is_active)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_announcement(&self, id: Uuid) -> anyhow::Result<Option<Announcement>> {
        let row = sqlx::query_as::<_, Announcement>(
            r#"
            SELECT id, title, content, priority, course_id, is_active, created_at
              FROM announcements
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_announcements(&self) -> anyhow::Result<Vec<AnnouncementWithCourse>> {
        let rows = sqlx::query_as::<_, AnnouncementWithCourse>(&format!(
            "{WITH_COURSE} ORDER BY a.created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_announcements_for_student(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Vec<AnnouncementWithCourse>> {
        let rows = sqlx::query_as::<_, AnnouncementWithCourse>(&format!(
            r#"{WITH_COURSE}
             WHERE a.is_active
               AND (a.course_id IS NULL
                    OR EXISTS (SELECT 1 FROM enrollments e
                                WHERE e.course_id = a.course_id
                                  AND e.user_id = $1
                                  AND e.status = 'ACTIVE'))
             ORDER BY a.created_at DESC"#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn delete_announcement(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM announcements WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
