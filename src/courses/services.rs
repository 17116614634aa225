use std::collections::HashMap;

use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::dto::{CatalogEntry, CourseDetail, CreateCourseRequest, UpdateCourseRequest};
use super::repo_types::{Course, CourseChanges, CourseUpdate, CourseWithCount, NewCourse};
use crate::audit::{AuditAction, AuditEntity};
use crate::auth::identity::Identity;
use crate::error::{PortalError, PortalResult};
use crate::state::AppState;

pub async fn create_course(
    st: &AppState,
    who: &Identity,
    req: CreateCourseRequest,
) -> PortalResult<Course> {
    who.require_admin()?;
    let req = req.normalized();
    req.validate()?;

    let new = NewCourse {
        code: req.code,
        name: req.name,
        description: req.description,
        credits: req.credits,
        capacity: req.capacity,
        instructor: req.instructor,
        schedule: req.schedule,
        is_active: req.is_active,
    };
    let course = st
        .store
        .insert_course(&new)
        .await?
        .ok_or_else(|| PortalError::conflict("Course code already exists"))?;

    st.audit.record(
        who.user_id,
        AuditAction::Create,
        AuditEntity::Course,
        course.id,
        format!("Created course: {} - {}", course.code, course.name),
    );
    info!(course_id = %course.id, code = %course.code, "course created");
    Ok(course)
}

pub async fn update_course(
    st: &AppState,
    who: &Identity,
    id: Uuid,
    req: UpdateCourseRequest,
) -> PortalResult<Course> {
    who.require_admin()?;
    let req = req.normalized();
    req.validate()?;

    let changes = CourseChanges {
        code: req.code,
        name: req.name,
        description: req.description,
        credits: req.credits,
        capacity: req.capacity,
        instructor: req.instructor,
        schedule: req.schedule,
        is_active: req.is_active,
    };
    let course = match st.store.update_course(id, &changes).await? {
        CourseUpdate::Updated(c) => c,
        CourseUpdate::NotFound => return Err(PortalError::not_found("Course not found")),
        CourseUpdate::CodeTaken => return Err(PortalError::conflict("Course code already exists")),
    };

    st.audit.record(
        who.user_id,
        AuditAction::Update,
        AuditEntity::Course,
        course.id,
        format!("Updated course: {}", course.code),
    );
    Ok(course)
}

pub async fn delete_course(st: &AppState, who: &Identity, id: Uuid) -> PortalResult<()> {
    who.require_admin()?;

    let course = st
        .store
        .find_course(id)
        .await?
        .ok_or_else(|| PortalError::not_found("Course not found"))?;
    if !st.store.delete_course(id).await? {
        return Err(PortalError::not_found("Course not found"));
    }

    st.audit.record(
        who.user_id,
        AuditAction::Delete,
        AuditEntity::Course,
        id,
        format!("Deleted course: {}", course.code),
    );
    info!(course_id = %id, "course deleted");
    Ok(())
}

pub async fn list_courses(st: &AppState, who: &Identity) -> PortalResult<Vec<CourseWithCount>> {
    who.require_admin()?;
    Ok(st.store.list_courses().await?)
}

pub async fn get_course(st: &AppState, who: &Identity, id: Uuid) -> PortalResult<CourseDetail> {
    who.require_admin()?;
    let course = st
        .store
        .find_course(id)
        .await?
        .ok_or_else(|| PortalError::not_found("Course not found"))?;
    let enrollments = st.store.list_course_enrollments(id).await?;
    Ok(CourseDetail {
        course,
        enrollments,
    })
}

/// Active courses with remaining seats and the caller's own enrollment status.
pub async fn catalog(st: &AppState, who: &Identity) -> PortalResult<Vec<CatalogEntry>> {
    who.require_student()?;

    let mine: HashMap<Uuid, _> = st
        .store
        .list_enrollments_for_user(who.user_id)
        .await?
        .into_iter()
        .map(|e| (e.enrollment.course_id, e.enrollment.status))
        .collect();

    let entries = st
        .store
        .list_active_courses()
        .await?
        .into_iter()
        .map(|c| CatalogEntry {
            available_seats: (i64::from(c.course.capacity) - c.active_enrollments).max(0),
            enrollment_status: mine.get(&c.course.id).copied(),
            course: c.course,
        })
        .collect();
    Ok(entries)
}
