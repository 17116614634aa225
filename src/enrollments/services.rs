use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use super::dto::AssignGradeRequest;
use super::repo_types::{
    CourseBrief, EnrollInsert, Enrollment, EnrollmentStatus, EnrollmentWithCourse,
};
use crate::audit::{AuditAction, AuditEntity};
use crate::auth::identity::Identity;
use crate::error::{PortalError, PortalResult};
use crate::state::AppState;

fn course_full() -> PortalError {
    PortalError::CapacityExceeded("Course is full".into())
}

/// Student self-service enrollment into an active course with free seats.
pub async fn enroll(
    st: &AppState,
    who: &Identity,
    course_id: Uuid,
) -> PortalResult<EnrollmentWithCourse> {
    who.require_student()?;

    let course = st
        .store
        .find_course(course_id)
        .await?
        .ok_or_else(|| PortalError::not_found("Course not found"))?;

    if !course.is_active {
        return Err(PortalError::InvalidState("Course is not active".into()));
    }

    let active = st.store.count_active_enrollments(course_id).await?;
    if active >= i64::from(course.capacity) {
        warn!(course_id = %course_id, active, capacity = course.capacity, "course full");
        return Err(course_full());
    }

    if let Some(existing) = st.store.find_enrollment_for(who.user_id, course_id).await? {
        return Err(match existing.status {
            EnrollmentStatus::Dropped => PortalError::conflict(
                "You previously dropped this course; contact an administrator to re-enroll",
            ),
            _ => PortalError::conflict("Already enrolled in this course"),
        });
    }

    let enrollment = match st.store.insert_enrollment(who.user_id, course_id).await? {
        EnrollInsert::Created(e) => e,
        EnrollInsert::CourseMissing => return Err(PortalError::not_found("Course not found")),
        EnrollInsert::Full => return Err(course_full()),
        EnrollInsert::Duplicate => {
            return Err(PortalError::conflict("Already enrolled in this course"))
        }
    };

    info!(
        user_id = %who.user_id,
        course_id = %course_id,
        enrollment_id = %enrollment.id,
        "student enrolled"
    );
    Ok(EnrollmentWithCourse {
        enrollment,
        course: CourseBrief {
            code: course.code,
            name: course.name,
            credits: course.credits,
            instructor: course.instructor,
            schedule: course.schedule,
        },
    })
}

pub async fn my_enrollments(st: &AppState, who: &Identity) -> PortalResult<Vec<EnrollmentWithCourse>> {
    who.require_student()?;
    Ok(st.store.list_enrollments_for_user(who.user_id).await?)
}

/// Student drops one of their own active enrollments. The row is kept.
pub async fn drop_own(st: &AppState, who: &Identity, enrollment_id: Uuid) -> PortalResult<Enrollment> {
    who.require_student()?;

    let enrollment = st
        .store
        .find_enrollment(enrollment_id)
        .await?
        .ok_or_else(|| PortalError::not_found("Enrollment not found"))?;
    if enrollment.user_id != who.user_id {
        return Err(PortalError::forbidden("Enrollment belongs to another student"));
    }
    if enrollment.status != EnrollmentStatus::Active {
        return Err(PortalError::InvalidState(
            "Only active enrollments can be dropped".into(),
        ));
    }

    let dropped = st
        .store
        .set_enrollment_status(enrollment_id, EnrollmentStatus::Dropped)
        .await?
        .ok_or_else(|| PortalError::not_found("Enrollment not found"))?;
    info!(user_id = %who.user_id, enrollment_id = %enrollment_id, "course dropped");
    Ok(dropped)
}

pub async fn admin_drop(st: &AppState, who: &Identity, enrollment_id: Uuid) -> PortalResult<Enrollment> {
    who.require_admin()?;

    let parties = st
        .store
        .find_enrollment_parties(enrollment_id)
        .await?
        .ok_or_else(|| PortalError::not_found("Enrollment not found"))?;

    let dropped = st
        .store
        .set_enrollment_status(enrollment_id, EnrollmentStatus::Dropped)
        .await?
        .ok_or_else(|| PortalError::not_found("Enrollment not found"))?;

    st.audit.record(
        who.user_id,
        AuditAction::DropStudent,
        AuditEntity::Enrollment,
        enrollment_id,
        format!("Dropped {} from {}", parties.student_name, parties.course_name),
    );
    info!(
        admin_id = %who.user_id,
        enrollment_id = %enrollment_id,
        course_id = %parties.enrollment.course_id,
        previous = ?parties.enrollment.status,
        "student dropped by admin"
    );
    Ok(dropped)
}

/// Grades are free-form and may be set whatever the enrollment status.
pub async fn assign_grade(
    st: &AppState,
    who: &Identity,
    enrollment_id: Uuid,
    req: AssignGradeRequest,
) -> PortalResult<Enrollment> {
    who.require_admin()?;
    let req = req.normalized();
    req.validate()?;
    let grade = req.grade.as_str();

    let parties = st
        .store
        .find_enrollment_parties(enrollment_id)
        .await?
        .ok_or_else(|| PortalError::not_found("Enrollment not found"))?;

    let graded = st
        .store
        .set_enrollment_grade(enrollment_id, grade)
        .await?
        .ok_or_else(|| PortalError::not_found("Enrollment not found"))?;

    st.audit.record(
        who.user_id,
        AuditAction::AssignGrade,
        AuditEntity::Enrollment,
        enrollment_id,
        format!(
            "Assigned grade {} to {} for {}",
            grade, parties.student_name, parties.course_name
        ),
    );
    info!(
        enrollment_id = %enrollment_id,
        course_id = %parties.enrollment.course_id,
        "grade assigned"
    );
    Ok(graded)
}
