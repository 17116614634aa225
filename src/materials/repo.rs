use anyhow::Context;
use async_trait::async_trait;
use uuid::Uuid;

use super::repo_types::{Material, MaterialFile, NewMaterial};
use crate::db::PgStore;

#[async_trait]
pub trait MaterialRepo: Send + Sync {
    async fn insert_material(&self, new: &NewMaterial) -> anyhow::Result<Material>;
    /// Active materials of a course, by week and then newest first.
    async fn list_materials(&self, course_id: Uuid) -> anyhow::Result<Vec<Material>>;
    async fn find_material(&self, id: Uuid) -> anyhow::Result<Option<Material>>;
    async fn find_material_file(&self, id: Uuid) -> anyhow::Result<Option<MaterialFile>>;
    async fn delete_material(&self, id: Uuid) -> anyhow::Result<bool>;
}

const MATERIAL_COLUMNS: &str = "id, course_id, title, description, file_name, file_type, \
                                file_size, week, module, uploaded_by, is_active, created_at";

#[async_trait]
impl MaterialRepo for PgStore {
    async fn insert_material(&self, new: &NewMaterial) -> anyhow::Result<Material> {
        let size = i32::try_from(new.file_data.len()).context("file size overflow")?;
        let row = sqlx::query_as::<_, Material>(&format!(
            r#"
            INSERT INTO course_materials
                (course_id, title, description, file_name, file_type, file_size, file_data,
                 week, module, uploaded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {MATERIAL_COLUMNS}
            "#
        ))
        .bind(new.course_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.file_name)
        .bind(&new.file_type)
        .bind(size)
        .bind(&new.file_data)
        .bind(new.week)
        .bind(&new.module)
        .bind(new.uploaded_by)
        .fetch_one(&self.pool)
        .await
        .context("insert course material")?;
        Ok(row)
    }

    async fn list_materials(&self, course_id: Uuid) -> anyhow::Result<Vec<Material>> {
        let rows = sqlx::query_as::<_, Material>(&format!(
            r#"
            SELECT {MATERIAL_COLUMNS}
              FROM course_materials
             WHERE course_id = $1 AND is_active
             ORDER BY week ASC NULLS LAST, created_at DESC
            "#
        ))
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_material(&self, id: Uuid) -> anyhow::Result<Option<Material>> {
        let row = sqlx::query_as::<_, Material>(&format!(
            "SELECT {MATERIAL_COLUMNS} FROM course_materials WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_material_file(&self, id: Uuid) -> anyhow::Result<Option<MaterialFile>> {
        let row = sqlx::query_as::<_, MaterialFile>(
            r#"
            SELECT course_id, file_name, file_type, file_data, is_active
              FROM course_materials
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_material(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM course_materials WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
