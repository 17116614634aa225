//! In-process [`Store`](super::Store) used by unit tests.
//!
//! Mirrors the Postgres constraints the services rely on: unique emails, student
//! ids, course codes and enrollment pairs, `ACTIVE`-only capacity counting,
//! attendance keyed by (student, course, date), and delete cascades. Listings
//! that are "newest first" in SQL use reverse insertion order here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::announcements::repo::AnnouncementRepo;
use crate::announcements::repo_types::{Announcement, AnnouncementWithCourse, NewAnnouncement};
use crate::attendance::repo::AttendanceRepo;
use crate::attendance::repo_types::{
    AttendanceMark, AttendanceRecord, AttendanceTally, StudentAttendanceRow,
};
use crate::audit::repo::AuditRepo;
use crate::audit::repo_types::{AuditLogEntry, NewAuditEntry};
use crate::auth::identity::Role;
use crate::auth::repo::UserRepo;
use crate::auth::repo_types::{
    NewUser, Profile, ProfileUpdate, StudentSummary, User, UserInsert, UserSummary,
};
use crate::courses::repo::CourseRepo;
use crate::courses::repo_types::{Course, CourseChanges, CourseUpdate, CourseWithCount, NewCourse};
use crate::enrollments::repo::EnrollmentRepo;
use crate::enrollments::repo_types::{
    CourseBrief, CourseEnrollee, EnrollInsert, Enrollment, EnrollmentParties, EnrollmentStatus,
    EnrollmentWithCourse,
};
use crate::materials::repo::MaterialRepo;
use crate::materials::repo_types::{Material, MaterialFile, NewMaterial};

struct StoredMaterial {
    meta: Material,
    data: Vec<u8>,
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    profiles: Vec<Profile>,
    courses: Vec<Course>,
    enrollments: Vec<Enrollment>,
    attendance: Vec<AttendanceRecord>,
    announcements: Vec<Announcement>,
    materials: Vec<StoredMaterial>,
    audit: Vec<AuditLogEntry>,
}

impl Tables {
    fn active_count(&self, course_id: Uuid) -> i64 {
        self.enrollments
            .iter()
            .filter(|e| e.course_id == course_id && e.status == EnrollmentStatus::Active)
            .count() as i64
    }

    fn with_count(&self, course: &Course) -> CourseWithCount {
        CourseWithCount {
            course: course.clone(),
            active_enrollments: self.active_count(course.id),
        }
    }

    fn course(&self, id: Uuid) -> Option<&Course> {
        self.courses.iter().find(|c| c.id == id)
    }

    fn user(&self, id: Uuid) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn with_course(&self, e: &Enrollment) -> Option<EnrollmentWithCourse> {
        let c = self.course(e.course_id)?;
        Some(EnrollmentWithCourse {
            enrollment: e.clone(),
            course: CourseBrief {
                code: c.code.clone(),
                name: c.name.clone(),
                credits: c.credits,
                instructor: c.instructor.clone(),
                schedule: c.schedule.clone(),
            },
        })
    }

    fn announcement_view(&self, a: &Announcement) -> AnnouncementWithCourse {
        let course = a.course_id.and_then(|id| self.course(id));
        AnnouncementWithCourse {
            announcement: a.clone(),
            course_code: course.map(|c| c.code.clone()),
            course_name: course.map(|c| c.name.clone()),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_audit: AtomicBool,
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Makes every subsequent audit insert fail.
    pub fn fail_audit_writes(&self, fail: bool) {
        self.fail_audit.store(fail, Ordering::SeqCst);
    }

    pub fn attendance_rows(&self) -> Vec<AttendanceRecord> {
        self.lock().attendance.clone()
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.lock().user(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self.lock().users.iter().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, new: &NewUser) -> anyhow::Result<UserInsert> {
        let mut t = self.lock();
        if t.users.iter().any(|u| u.email == new.email) {
            return Ok(UserInsert::EmailTaken);
        }
        if let Some(sid) = &new.student_id {
            if t.profiles.iter().any(|p| p.student_id.as_ref() == Some(sid)) {
                return Ok(UserInsert::StudentIdTaken);
            }
        }
        let user = User {
            id: Uuid::new_v4(),
            name: new.name.clone(),
            email: new.email.clone(),
            password_hash: new.password_hash.clone(),
            role: new.role,
            created_at: OffsetDateTime::now_utc(),
        };
        if let Some(sid) = &new.student_id {
            t.profiles.push(Profile {
                user_id: user.id,
                student_id: Some(sid.clone()),
                phone: None,
                address: None,
                date_of_birth: None,
                bio: None,
            });
        }
        t.users.push(user.clone());
        Ok(UserInsert::Created(user))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        if let Some(u) = self.lock().users.iter_mut().find(|u| u.id == id) {
            u.password_hash = password_hash.to_string();
        }
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut t = self.lock();
        let before = t.users.len();
        t.users.retain(|u| u.id != id);
        if t.users.len() == before {
            return Ok(false);
        }
        t.profiles.retain(|p| p.user_id != id);
        t.enrollments.retain(|e| e.user_id != id);
        t.attendance.retain(|a| a.user_id != id);
        Ok(true)
    }

    async fn list_students(&self) -> anyhow::Result<Vec<StudentSummary>> {
        let t = self.lock();
        Ok(t.users
            .iter()
            .rev()
            .filter(|u| u.role == Role::Student)
            .map(|u| StudentSummary {
                id: u.id,
                name: u.name.clone(),
                email: u.email.clone(),
                student_id: t
                    .profiles
                    .iter()
                    .find(|p| p.user_id == u.id)
                    .and_then(|p| p.student_id.clone()),
                active_enrollments: t
                    .enrollments
                    .iter()
                    .filter(|e| e.user_id == u.id && e.status == EnrollmentStatus::Active)
                    .count() as i64,
                created_at: u.created_at,
            })
            .collect())
    }

    async fn list_users(&self) -> anyhow::Result<Vec<UserSummary>> {
        let t = self.lock();
        Ok(t.users
            .iter()
            .rev()
            .map(|u| UserSummary {
                id: u.id,
                name: u.name.clone(),
                email: u.email.clone(),
                role: u.role,
                student_id: t
                    .profiles
                    .iter()
                    .find(|p| p.user_id == u.id)
                    .and_then(|p| p.student_id.clone()),
                enrollment_count: t.enrollments.iter().filter(|e| e.user_id == u.id).count()
                    as i64,
                created_at: u.created_at,
            })
            .collect())
    }

    async fn find_profile(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>> {
        Ok(self
            .lock()
            .profiles
            .iter()
            .find(|p| p.user_id == user_id)
            .cloned())
    }

    async fn save_profile(
        &self,
        user_id: Uuid,
        name: &str,
        update: &ProfileUpdate,
    ) -> anyhow::Result<Profile> {
        let mut t = self.lock();
        if let Some(u) = t.users.iter_mut().find(|u| u.id == user_id) {
            u.name = name.to_string();
        }
        let idx = match t.profiles.iter().position(|p| p.user_id == user_id) {
            Some(i) => i,
            None => {
                t.profiles.push(Profile {
                    user_id,
                    student_id: None,
                    phone: None,
                    address: None,
                    date_of_birth: None,
                    bio: None,
                });
                t.profiles.len() - 1
            }
        };
        let p = &mut t.profiles[idx];
        p.phone = update.phone.clone();
        p.address = update.address.clone();
        p.date_of_birth = update.date_of_birth;
        p.bio = update.bio.clone();
        Ok(p.clone())
    }
}

#[async_trait]
impl CourseRepo for MemoryStore {
    async fn find_course(&self, id: Uuid) -> anyhow::Result<Option<Course>> {
        Ok(self.lock().course(id).cloned())
    }

    async fn list_courses(&self) -> anyhow::Result<Vec<CourseWithCount>> {
        let t = self.lock();
        Ok(t.courses.iter().rev().map(|c| t.with_count(c)).collect())
    }

    async fn list_active_courses(&self) -> anyhow::Result<Vec<CourseWithCount>> {
        let t = self.lock();
        let mut rows: Vec<_> = t
            .courses
            .iter()
            .filter(|c| c.is_active)
            .map(|c| t.with_count(c))
            .collect();
        rows.sort_by(|a, b| a.course.name.cmp(&b.course.name));
        Ok(rows)
    }

    async fn insert_course(&self, new: &NewCourse) -> anyhow::Result<Option<Course>> {
        let mut t = self.lock();
        if t.courses.iter().any(|c| c.code == new.code) {
            return Ok(None);
        }
        let course = Course {
            id: Uuid::new_v4(),
            code: new.code.clone(),
            name: new.name.clone(),
            description: new.description.clone(),
            credits: new.credits,
            capacity: new.capacity,
            instructor: new.instructor.clone(),
            schedule: new.schedule.clone(),
            is_active: new.is_active,
            created_at: OffsetDateTime::now_utc(),
        };
        t.courses.push(course.clone());
        Ok(Some(course))
    }

    async fn update_course(
        &self,
        id: Uuid,
        changes: &CourseChanges,
    ) -> anyhow::Result<CourseUpdate> {
        let mut t = self.lock();
        if let Some(code) = &changes.code {
            if t.courses.iter().any(|c| c.id != id && &c.code == code) {
                return Ok(CourseUpdate::CodeTaken);
            }
        }
        let Some(c) = t.courses.iter_mut().find(|c| c.id == id) else {
            return Ok(CourseUpdate::NotFound);
        };
        if let Some(v) = &changes.code {
            c.code = v.clone();
        }
        if let Some(v) = &changes.name {
            c.name = v.clone();
        }
        if let Some(v) = &changes.description {
            c.description = Some(v.clone());
        }
        if let Some(v) = changes.credits {
            c.credits = v;
        }
        if let Some(v) = changes.capacity {
            c.capacity = v;
        }
        if let Some(v) = &changes.instructor {
            c.instructor = Some(v.clone());
        }
        if let Some(v) = &changes.schedule {
            c.schedule = Some(v.clone());
        }
        if let Some(v) = changes.is_active {
            c.is_active = v;
        }
        Ok(CourseUpdate::Updated(c.clone()))
    }

    async fn delete_course(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut t = self.lock();
        let before = t.courses.len();
        t.courses.retain(|c| c.id != id);
        if t.courses.len() == before {
            return Ok(false);
        }
        t.enrollments.retain(|e| e.course_id != id);
        t.attendance.retain(|a| a.course_id != id);
        t.announcements.retain(|a| a.course_id != Some(id));
        t.materials.retain(|m| m.meta.course_id != id);
        Ok(true)
    }
}

#[async_trait]
impl EnrollmentRepo for MemoryStore {
    async fn find_enrollment(&self, id: Uuid) -> anyhow::Result<Option<Enrollment>> {
        Ok(self.lock().enrollments.iter().find(|e| e.id == id).cloned())
    }

    async fn find_enrollment_parties(
        &self,
        id: Uuid,
    ) -> anyhow::Result<Option<EnrollmentParties>> {
        let t = self.lock();
        let Some(e) = t.enrollments.iter().find(|e| e.id == id) else {
            return Ok(None);
        };
        let (Some(user), Some(course)) = (t.user(e.user_id), t.course(e.course_id)) else {
            return Ok(None);
        };
        Ok(Some(EnrollmentParties {
            enrollment: e.clone(),
            student_name: user.name.clone(),
            course_name: course.name.clone(),
        }))
    }

    async fn find_enrollment_for(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> anyhow::Result<Option<Enrollment>> {
        Ok(self
            .lock()
            .enrollments
            .iter()
            .find(|e| e.user_id == user_id && e.course_id == course_id)
            .cloned())
    }

    async fn count_active_enrollments(&self, course_id: Uuid) -> anyhow::Result<i64> {
        Ok(self.lock().active_count(course_id))
    }

    async fn insert_enrollment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> anyhow::Result<EnrollInsert> {
        let mut t = self.lock();
        let Some(capacity) = t.course(course_id).map(|c| c.capacity) else {
            return Ok(EnrollInsert::CourseMissing);
        };
        if t.active_count(course_id) >= i64::from(capacity) {
            return Ok(EnrollInsert::Full);
        }
        if t
            .enrollments
            .iter()
            .any(|e| e.user_id == user_id && e.course_id == course_id)
        {
            return Ok(EnrollInsert::Duplicate);
        }
        let enrollment = Enrollment {
            id: Uuid::new_v4(),
            user_id,
            course_id,
            status: EnrollmentStatus::Active,
            grade: None,
            enrolled_at: OffsetDateTime::now_utc(),
        };
        t.enrollments.push(enrollment.clone());
        Ok(EnrollInsert::Created(enrollment))
    }

    async fn set_enrollment_status(
        &self,
        id: Uuid,
        status: EnrollmentStatus,
    ) -> anyhow::Result<Option<Enrollment>> {
        let mut t = self.lock();
        Ok(t.enrollments.iter_mut().find(|e| e.id == id).map(|e| {
            e.status = status;
            e.clone()
        }))
    }

    async fn set_enrollment_grade(
        &self,
        id: Uuid,
        grade: &str,
    ) -> anyhow::Result<Option<Enrollment>> {
        let mut t = self.lock();
        Ok(t.enrollments.iter_mut().find(|e| e.id == id).map(|e| {
            e.grade = Some(grade.to_string());
            e.clone()
        }))
    }

    async fn list_enrollments_for_user(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Vec<EnrollmentWithCourse>> {
        let t = self.lock();
        Ok(t.enrollments
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id)
            .filter_map(|e| t.with_course(e))
            .collect())
    }

    async fn list_course_enrollments(
        &self,
        course_id: Uuid,
    ) -> anyhow::Result<Vec<CourseEnrollee>> {
        let t = self.lock();
        let mut rows: Vec<_> = t
            .enrollments
            .iter()
            .filter(|e| e.course_id == course_id)
            .filter_map(|e| {
                let u = t.user(e.user_id)?;
                Some(CourseEnrollee {
                    enrollment_id: e.id,
                    user_id: e.user_id,
                    student_name: u.name.clone(),
                    student_email: u.email.clone(),
                    status: e.status,
                    grade: e.grade.clone(),
                    enrolled_at: e.enrolled_at,
                })
            })
            .collect();
        rows.sort_by(|a, b| a.student_name.cmp(&b.student_name));
        Ok(rows)
    }
}

#[async_trait]
impl AttendanceRepo for MemoryStore {
    async fn upsert_attendance(
        &self,
        course_id: Uuid,
        date: Date,
        marks: &[AttendanceMark],
        marked_by: Uuid,
    ) -> anyhow::Result<usize> {
        let mut t = self.lock();
        for mark in marks {
            let existing = t.attendance.iter().position(|a| {
                a.user_id == mark.user_id && a.course_id == course_id && a.date == date
            });
            match existing {
                Some(i) => {
                    let row = &mut t.attendance[i];
                    row.status = mark.status;
                    row.marked_by = marked_by;
                }
                None => t.attendance.push(AttendanceRecord {
                    id: Uuid::new_v4(),
                    user_id: mark.user_id,
                    course_id,
                    date,
                    status: mark.status,
                    marked_by,
                }),
            }
        }
        Ok(marks.len())
    }

    async fn list_course_attendance(
        &self,
        course_id: Uuid,
        date: Date,
    ) -> anyhow::Result<Vec<AttendanceRecord>> {
        Ok(self
            .lock()
            .attendance
            .iter()
            .filter(|a| a.course_id == course_id && a.date == date)
            .cloned()
            .collect())
    }

    async fn list_student_attendance(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Vec<StudentAttendanceRow>> {
        let t = self.lock();
        let mut rows: Vec<_> = t
            .attendance
            .iter()
            .filter(|a| a.user_id == user_id)
            .filter_map(|a| {
                let c = t.course(a.course_id)?;
                Some(StudentAttendanceRow {
                    course_id: a.course_id,
                    course_code: c.code.clone(),
                    course_name: c.name.clone(),
                    date: a.date,
                    status: a.status,
                })
            })
            .collect();
        rows.sort_by(|a, b| a.course_name.cmp(&b.course_name).then(b.date.cmp(&a.date)));
        Ok(rows)
    }

    async fn attendance_tally(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> anyhow::Result<AttendanceTally> {
        let mut tally = AttendanceTally::default();
        for a in self
            .lock()
            .attendance
            .iter()
            .filter(|a| a.user_id == user_id && a.course_id == course_id)
        {
            tally.add(a.status);
        }
        Ok(tally)
    }
}

#[async_trait]
impl AnnouncementRepo for MemoryStore {
    async fn insert_announcement(&self, new: &NewAnnouncement) -> anyhow::Result<Announcement> {
        let announcement = Announcement {
            id: Uuid::new_v4(),
            title: new.title.clone(),
            content: new.content.clone(),
            priority: new.priority,
            course_id: new.course_id,
            is_active: new.is_active,
            created_at: OffsetDateTime::now_utc(),
        };
        self.lock().announcements.push(announcement.clone());
        Ok(announcement)
    }

    async fn find_announcement(&self, id: Uuid) -> anyhow::Result<Option<Announcement>> {
        Ok(self
            .lock()
            .announcements
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn list_announcements(&self) -> anyhow::Result<Vec<AnnouncementWithCourse>> {
        let t = self.lock();
        Ok(t.announcements
            .iter()
            .rev()
            .map(|a| t.announcement_view(a))
            .collect())
    }

    async fn list_announcements_for_student(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Vec<AnnouncementWithCourse>> {
        let t = self.lock();
        let enrolled = |course_id: Uuid| {
            t.enrollments.iter().any(|e| {
                e.user_id == user_id
                    && e.course_id == course_id
                    && e.status == EnrollmentStatus::Active
            })
        };
        Ok(t.announcements
            .iter()
            .rev()
            .filter(|a| a.is_active && a.course_id.map_or(true, enrolled))
            .map(|a| t.announcement_view(a))
            .collect())
    }

    async fn delete_announcement(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut t = self.lock();
        let before = t.announcements.len();
        t.announcements.retain(|a| a.id != id);
        Ok(t.announcements.len() != before)
    }
}

#[async_trait]
impl MaterialRepo for MemoryStore {
    async fn insert_material(&self, new: &NewMaterial) -> anyhow::Result<Material> {
        let meta = Material {
            id: Uuid::new_v4(),
            course_id: new.course_id,
            title: new.title.clone(),
            description: new.description.clone(),
            file_name: new.file_name.clone(),
            file_type: new.file_type.clone(),
            file_size: i32::try_from(new.file_data.len())?,
            week: new.week,
            module: new.module.clone(),
            uploaded_by: new.uploaded_by,
            is_active: true,
            created_at: OffsetDateTime::now_utc(),
        };
        self.lock().materials.push(StoredMaterial {
            meta: meta.clone(),
            data: new.file_data.clone(),
        });
        Ok(meta)
    }

    async fn list_materials(&self, course_id: Uuid) -> anyhow::Result<Vec<Material>> {
        let t = self.lock();
        let mut rows: Vec<_> = t
            .materials
            .iter()
            .rev()
            .filter(|m| m.meta.course_id == course_id && m.meta.is_active)
            .map(|m| m.meta.clone())
            .collect();
        // stable sort keeps newest-first within a week; no week sorts last
        rows.sort_by_key(|m| m.week.unwrap_or(i32::MAX));
        Ok(rows)
    }

    async fn find_material(&self, id: Uuid) -> anyhow::Result<Option<Material>> {
        Ok(self
            .lock()
            .materials
            .iter()
            .find(|m| m.meta.id == id)
            .map(|m| m.meta.clone()))
    }

    async fn find_material_file(&self, id: Uuid) -> anyhow::Result<Option<MaterialFile>> {
        Ok(self
            .lock()
            .materials
            .iter()
            .find(|m| m.meta.id == id)
            .map(|m| MaterialFile {
                course_id: m.meta.course_id,
                file_name: m.meta.file_name.clone(),
                file_type: m.meta.file_type.clone(),
                file_data: m.data.clone(),
                is_active: m.meta.is_active,
            }))
    }

    async fn delete_material(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut t = self.lock();
        let before = t.materials.len();
        t.materials.retain(|m| m.meta.id != id);
        Ok(t.materials.len() != before)
    }
}

#[async_trait]
impl AuditRepo for MemoryStore {
    async fn insert_audit(&self, entry: &NewAuditEntry) -> anyhow::Result<()> {
        if self.fail_audit.load(Ordering::SeqCst) {
            anyhow::bail!("audit table unavailable");
        }
        self.lock().audit.push(AuditLogEntry {
            id: Uuid::new_v4(),
            user_id: entry.actor_id,
            action: entry.action.as_str().to_string(),
            entity: entry.entity.as_str().to_string(),
            entity_id: entry.entity_id,
            details: entry.details.clone(),
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(())
    }

    async fn list_audit(&self, limit: i64) -> anyhow::Result<Vec<AuditLogEntry>> {
        let limit = usize::try_from(limit.max(0))?;
        Ok(self
            .lock()
            .audit
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}
