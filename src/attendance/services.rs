use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use super::dto::{
    CourseAttendanceSummary, DayRecord, MarkAttendanceRequest, MarkAttendanceResponse,
};
use super::repo_types::{AttendanceRecord, AttendanceTally};
use crate::audit::{AuditAction, AuditEntity};
use crate::auth::identity::{Identity, Role};
use crate::enrollments::repo_types::EnrollmentStatus;
use crate::error::{PortalError, PortalResult};
use crate::state::AppState;

/// Students below this percentage are flagged as at risk.
pub const AT_RISK_THRESHOLD: u8 = 75;

/// Calendar day of a `YYYY-MM-DD` date or RFC 3339 timestamp; time of day is dropped.
pub fn parse_attendance_date(raw: &str) -> PortalResult<Date> {
    let raw = raw.trim();
    if let Ok(day) = Date::parse(raw, format_description!("[year]-[month]-[day]")) {
        return Ok(day);
    }
    OffsetDateTime::parse(raw, &Rfc3339)
        .map(|ts| ts.date())
        .map_err(|_| PortalError::invalid(format!("Invalid date: {raw}")))
}

/// round(100 * (present + late) / total), 0 without records.
pub fn attendance_percentage(tally: &AttendanceTally) -> u8 {
    let total = tally.total();
    if total <= 0 {
        return 0;
    }
    let attended = tally.present + tally.late;
    ((attended * 200 + total) / (total * 2)) as u8
}

pub fn is_at_risk(percentage: u8) -> bool {
    percentage < AT_RISK_THRESHOLD
}

pub async fn mark_attendance(
    st: &AppState,
    who: &Identity,
    req: MarkAttendanceRequest,
) -> PortalResult<MarkAttendanceResponse> {
    who.require_admin()?;
    let date = parse_attendance_date(&req.date)?;

    st.store
        .find_course(req.course_id)
        .await?
        .ok_or_else(|| PortalError::not_found("Course not found"))?;

    for mark in &req.records {
        match st.store.find_user(mark.user_id).await? {
            Some(user) if user.role == Role::Student => {}
            _ => {
                return Err(PortalError::not_found(format!(
                    "Student {} not found",
                    mark.user_id
                )))
            }
        }
    }

    let marked = st
        .store
        .upsert_attendance(req.course_id, date, &req.records, who.user_id)
        .await?;

    st.audit.record(
        who.user_id,
        AuditAction::MarkAttendance,
        AuditEntity::Attendance,
        req.course_id,
        format!("Marked attendance for {marked} students on {date}"),
    );
    info!(course_id = %req.course_id, %date, marked, "attendance marked");
    Ok(MarkAttendanceResponse {
        course_id: req.course_id,
        date,
        marked,
    })
}

pub async fn course_attendance(
    st: &AppState,
    who: &Identity,
    course_id: Uuid,
    raw_date: &str,
) -> PortalResult<Vec<AttendanceRecord>> {
    who.require_admin()?;
    let date = parse_attendance_date(raw_date)?;
    Ok(st.store.list_course_attendance(course_id, date).await?)
}

/// Students may only ask about themselves; admins about anyone.
pub async fn percentage_for(
    st: &AppState,
    who: &Identity,
    student_id: Uuid,
    course_id: Uuid,
) -> PortalResult<u8> {
    if who.role == Role::Student && who.user_id != student_id {
        return Err(PortalError::forbidden("Cannot view another student's attendance"));
    }
    let tally = st.store.attendance_tally(student_id, course_id).await?;
    Ok(attendance_percentage(&tally))
}

/// One summary per active enrollment; a course without records reads 0% and at risk.
pub async fn my_attendance(
    st: &AppState,
    who: &Identity,
) -> PortalResult<Vec<CourseAttendanceSummary>> {
    who.require_student()?;

    let mut courses: Vec<_> = st
        .store
        .list_enrollments_for_user(who.user_id)
        .await?
        .into_iter()
        .filter(|e| e.enrollment.status == EnrollmentStatus::Active)
        .map(|e| {
            (
                CourseAttendanceSummary {
                    course_id: e.enrollment.course_id,
                    course_code: e.course.code,
                    course_name: e.course.name,
                    percentage: 0,
                    at_risk: false,
                    records: Vec::new(),
                },
                AttendanceTally::default(),
            )
        })
        .collect();
    courses.sort_by(|(a, _), (b, _)| a.course_name.cmp(&b.course_name));

    // rows arrive newest first within each course
    for row in st.store.list_student_attendance(who.user_id).await? {
        let Some((summary, tally)) = courses
            .iter_mut()
            .find(|(s, _)| s.course_id == row.course_id)
        else {
            continue;
        };
        tally.add(row.status);
        summary.records.push(DayRecord {
            date: row.date,
            status: row.status,
        });
    }

    Ok(courses
        .into_iter()
        .map(|(mut summary, tally)| {
            summary.percentage = attendance_percentage(&tally);
            summary.at_risk = is_at_risk(summary.percentage);
            summary
        })
        .collect())
}
