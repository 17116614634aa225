use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::announcements::repo::AnnouncementRepo;
use crate::attendance::repo::AttendanceRepo;
use crate::audit::repo::AuditRepo;
use crate::auth::repo::UserRepo;
use crate::config::AppConfig;
use crate::courses::repo::CourseRepo;
use crate::enrollments::repo::EnrollmentRepo;
use crate::materials::repo::MaterialRepo;

#[cfg(test)]
pub mod memory;

/// The persistence gateway: every feature repository behind one object.
pub trait Store:
    UserRepo
    + CourseRepo
    + EnrollmentRepo
    + AttendanceRepo
    + AnnouncementRepo
    + MaterialRepo
    + AuditRepo
{
}

impl<T> Store for T where
    T: UserRepo
        + CourseRepo
        + EnrollmentRepo
        + AttendanceRepo
        + AnnouncementRepo
        + MaterialRepo
        + AuditRepo
{
}

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    pub(crate) pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
