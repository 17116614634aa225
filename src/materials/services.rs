use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use super::repo_types::{Material, MaterialFile, NewMaterial};
use crate::audit::{AuditAction, AuditEntity};
use crate::auth::identity::Identity;
use crate::courses::dto::trimmed;
use crate::enrollments::repo_types::EnrollmentStatus;
use crate::error::{PortalError, PortalResult};
use crate::state::AppState;

pub const MAX_MATERIAL_BYTES: usize = 2 * 1024 * 1024;

pub struct UploadItem {
    pub file_name: String,
    pub content_type: String,
    pub body: Bytes,
}

pub struct MaterialUpload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub week: Option<i32>,
    pub module: Option<String>,
    pub file: Option<UploadItem>,
}

async fn require_active_enrollment(st: &AppState, who: &Identity, course_id: Uuid) -> PortalResult<()> {
    match st.store.find_enrollment_for(who.user_id, course_id).await? {
        Some(e) if e.status == EnrollmentStatus::Active => Ok(()),
        _ => Err(PortalError::forbidden("You are not enrolled in this course")),
    }
}

pub async fn upload_material(
    st: &AppState,
    who: &Identity,
    course_id: Uuid,
    upload: MaterialUpload,
) -> PortalResult<Material> {
    who.require_admin()?;
    st.store
        .find_course(course_id)
        .await?
        .ok_or_else(|| PortalError::not_found("Course not found"))?;

    let title = trimmed(upload.title).ok_or_else(|| PortalError::invalid("Title is required"))?;
    let file = upload
        .file
        .filter(|f| !f.body.is_empty())
        .ok_or_else(|| PortalError::invalid("File is required"))?;
    if file.body.len() > MAX_MATERIAL_BYTES {
        warn!(course_id = %course_id, size = file.body.len(), "material too large");
        return Err(PortalError::invalid("File size must be less than 2MB"));
    }

    let new = NewMaterial {
        course_id,
        title,
        description: trimmed(upload.description),
        file_name: file.file_name,
        file_type: file.content_type,
        file_data: file.body.to_vec(),
        week: upload.week,
        module: trimmed(upload.module),
        uploaded_by: who.user_id,
    };
    let material = st.store.insert_material(&new).await?;

    st.audit.record(
        who.user_id,
        AuditAction::Upload,
        AuditEntity::CourseMaterial,
        material.id,
        format!("Uploaded material: {}", material.title),
    );
    info!(material_id = %material.id, course_id = %course_id, size = material.file_size, "material uploaded");
    Ok(material)
}

pub async fn list_materials(
    st: &AppState,
    who: &Identity,
    course_id: Uuid,
) -> PortalResult<Vec<Material>> {
    who.require_admin()?;
    Ok(st.store.list_materials(course_id).await?)
}

pub async fn list_my_materials(
    st: &AppState,
    who: &Identity,
    course_id: Uuid,
) -> PortalResult<Vec<Material>> {
    who.require_student()?;
    require_active_enrollment(st, who, course_id).await?;
    Ok(st.store.list_materials(course_id).await?)
}

pub async fn download_material(
    st: &AppState,
    who: &Identity,
    course_id: Uuid,
    id: Uuid,
) -> PortalResult<MaterialFile> {
    who.require_admin()?;
    st.store
        .find_material_file(id)
        .await?
        .filter(|f| f.course_id == course_id)
        .ok_or_else(|| PortalError::not_found("Material not found"))
}

/// Students only see active materials of courses they are actively enrolled in.
pub async fn download_my_material(
    st: &AppState,
    who: &Identity,
    id: Uuid,
) -> PortalResult<MaterialFile> {
    who.require_student()?;
    let file = st
        .store
        .find_material_file(id)
        .await?
        .filter(|f| f.is_active)
        .ok_or_else(|| PortalError::not_found("Material not found"))?;
    require_active_enrollment(st, who, file.course_id).await?;
    Ok(file)
}

pub async fn delete_material(
    st: &AppState,
    who: &Identity,
    course_id: Uuid,
    id: Uuid,
) -> PortalResult<()> {
    who.require_admin()?;
    let material = st
        .store
        .find_material(id)
        .await?
        .filter(|m| m.course_id == course_id)
        .ok_or_else(|| PortalError::not_found("Material not found"))?;

    if !st.store.delete_material(id).await? {
        return Err(PortalError::not_found("Material not found"));
    }

    st.audit.record(
        who.user_id,
        AuditAction::Delete,
        AuditEntity::CourseMaterial,
        id,
        format!("Deleted material: {}", material.title),
    );
    info!(material_id = %id, "material deleted");
    Ok(())
}
