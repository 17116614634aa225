use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::dto::CreateAnnouncementRequest;
use super::repo_types::{Announcement, AnnouncementWithCourse, NewAnnouncement};
use crate::audit::{AuditAction, AuditEntity};
use crate::auth::identity::Identity;
use crate::error::{PortalError, PortalResult};
use crate::state::AppState;

pub async fn create_announcement(
    st: &AppState,
    who: &Identity,
    req: CreateAnnouncementRequest,
) -> PortalResult<Announcement> {
    who.require_admin()?;
    let req = req.normalized();
    req.validate()?;

    if let Some(course_id) = req.course_id {
        st.store
            .find_course(course_id)
            .await?
            .ok_or_else(|| PortalError::not_found("Course not found"))?;
    }

    let new = NewAnnouncement {
        title: req.title,
        content: req.content,
        priority: req.priority,
        course_id: req.course_id,
        is_active: req.is_active,
    };
    let announcement = st.store.insert_announcement(&new).await?;

    st.audit.record(
        who.user_id,
        AuditAction::Create,
        AuditEntity::Announcement,
        announcement.id,
        format!("Created announcement: {}", announcement.title),
    );
    info!(announcement_id = %announcement.id, "announcement created");
    Ok(announcement)
}

pub async fn list_announcements(
    st: &AppState,
    who: &Identity,
) -> PortalResult<Vec<AnnouncementWithCourse>> {
    who.require_admin()?;
    Ok(st.store.list_announcements().await?)
}

pub async fn delete_announcement(st: &AppState, who: &Identity, id: Uuid) -> PortalResult<()> {
    who.require_admin()?;
    let announcement = st
        .store
        .find_announcement(id)
        .await?
        .ok_or_else(|| PortalError::not_found("Announcement not found"))?;

    if !st.store.delete_announcement(id).await? {
        return Err(PortalError::not_found("Announcement not found"));
    }

    st.audit.record(
        who.user_id,
        AuditAction::Delete,
        AuditEntity::Announcement,
        id,
        format!("Deleted announcement: {}", announcement.title),
    );
    info!(announcement_id = %id, "announcement deleted");
    Ok(())
}

pub async fn my_announcements(
    st: &AppState,
    who: &Identity,
) -> PortalResult<Vec<AnnouncementWithCourse>> {
    who.require_student()?;
    Ok(st.store.list_announcements_for_student(who.user_id).await?)
}
