use async_trait::async_trait;
use uuid::Uuid;

use super::repo_types::{
    NewUser, Profile, ProfileUpdate, StudentSummary, User, UserInsert, UserSummary,
};
use crate::db::{is_unique_violation, PgStore};

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    /// Inserts the user and, for students, the profile as one unit.
    async fn insert_user(&self, new: &NewUser) -> anyhow::Result<UserInsert>;
    async fn update_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()>;
    async fn delete_user(&self, id: Uuid) -> anyhow::Result<bool>;
    async fn list_students(&self) -> anyhow::Result<Vec<StudentSummary>>;
    /// Every account, newest first.
    async fn list_users(&self) -> anyhow::Result<Vec<UserSummary>>;
    async fn find_profile(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>>;
    /// Renames the user and creates or replaces the editable profile fields.
    async fn save_profile(
        &self,
        user_id: Uuid,
        name: &str,
        update: &ProfileUpdate,
    ) -> anyhow::Result<Profile>;
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at";
const PROFILE_COLUMNS: &str = "user_id, student_id, phone, address, date_of_birth, bio";

#[async_trait]
impl UserRepo for PgStore {
    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert_user(&self, new: &NewUser) -> anyhow::Result<UserInsert> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.role)
        .fetch_one(&mut *tx)
        .await;
        let user = match user {
            Ok(u) => u,
            Err(e) if is_unique_violation(&e) => return Ok(UserInsert::EmailTaken),
            Err(e) => return Err(e.into()),
        };

        if let Some(student_id) = &new.student_id {
            let res = sqlx::query("INSERT INTO profiles (user_id, student_id) VALUES ($1, $2)")
                .bind(user.id)
                .bind(student_id)
                .execute(&mut *tx)
                .await;
            match res {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => return Ok(UserInsert::StudentIdTaken),
                Err(e) => return Err(e.into()),
            }
        }

        tx.commit().await?;
        Ok(UserInsert::Created(user))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_students(&self) -> anyhow::Result<Vec<StudentSummary>> {
        let rows = sqlx::query_as::<_, StudentSummary>(
            r#"
            SELECT u.id, u.name, u.email, p.student_id,
                   (SELECT COUNT(*) FROM enrollments e
                     WHERE e.user_id = u.id AND e.status = 'ACTIVE') AS active_enrollments,
                   u.created_at
              FROM users u
              LEFT JOIN profiles p ON p.user_id = u.id
             WHERE u.role = 'STUDENT'
             ORDER BY u.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_users(&self) -> anyhow::Result<Vec<UserSummary>> {
        let rows = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.name, u.email, u.role, p.student_id,
                   (SELECT COUNT(*) FROM enrollments e WHERE e.user_id = u.id) AS enrollment_count,
                   u.created_at
              FROM users u
              LEFT JOIN profiles p ON p.user_id = u.id
             ORDER BY u.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_profile(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn save_profile(
        &self,
        user_id: Uuid,
        name: &str,
        update: &ProfileUpdate,
    ) -> anyhow::Result<Profile> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE users SET name = $2 WHERE id = $1")
            .bind(user_id)
            .bind(name)
            .execute(&mut *tx)
            .await?;

        let profile = sqlx::query_as::<_, Profile>(&format!(
            r#"
            INSERT INTO profiles (user_id, phone, address, date_of_birth, bio)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE
               SET phone = EXCLUDED.phone,
                   address = EXCLUDED.address,
                   date_of_birth = EXCLUDED.date_of_birth,
                   bio = EXCLUDED.bio,
                   updated_at = now()
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&update.phone)
        .bind(&update.address)
        .bind(update.date_of_birth)
        .bind(&update.bio)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(profile)
    }
}
