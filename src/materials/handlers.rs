use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tracing::instrument;
use uuid::Uuid;

use super::repo_types::{Material, MaterialFile};
use super::services::{self, MaterialUpload, UploadItem, MAX_MATERIAL_BYTES};
use crate::{
    auth::jwt::AuthUser,
    error::{PortalError, PortalResult},
    extract::{Json, Multipart, Path},
    state::AppState,
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/admin/courses/:id/materials",
            get(list_materials).post(upload_material),
        )
        .route(
            "/admin/courses/:id/materials/:material_id",
            axum::routing::delete(delete_material),
        )
        .route(
            "/admin/courses/:id/materials/:material_id/download",
            get(download_material),
        )
        // room for the multipart envelope around a maximum-size file
        .layer(DefaultBodyLimit::max(MAX_MATERIAL_BYTES + 1024 * 1024))
}

pub fn student_routes() -> Router<AppState> {
    Router::new()
        .route("/student/courses/:id/materials", get(list_my_materials))
        .route("/student/materials/:id/download", get(download_my_material))
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> PortalError {
    PortalError::invalid(format!("Invalid multipart body: {e}"))
}

async fn read_upload(Multipart(mut mp): Multipart) -> PortalResult<MaterialUpload> {
    let mut upload = MaterialUpload {
        title: None,
        description: None,
        week: None,
        module: None,
        file: None,
    };
    while let Some(field) = mp.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload.bin").to_string();
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let body = field.bytes().await.map_err(bad_multipart)?;
                upload.file = Some(UploadItem {
                    file_name,
                    content_type,
                    body,
                });
            }
            "title" => upload.title = Some(field.text().await.map_err(bad_multipart)?),
            "description" => upload.description = Some(field.text().await.map_err(bad_multipart)?),
            "module" => upload.module = Some(field.text().await.map_err(bad_multipart)?),
            "week" => {
                let raw = field.text().await.map_err(bad_multipart)?;
                let raw = raw.trim();
                if !raw.is_empty() {
                    let week = raw
                        .parse::<i32>()
                        .map_err(|_| PortalError::invalid("Week must be a number"))?;
                    upload.week = Some(week);
                }
            }
            _ => {}
        }
    }
    Ok(upload)
}

fn attachment(file: MaterialFile) -> Response {
    let safe_name: String = file
        .file_name
        .chars()
        .filter(|c| *c != '"' && *c != '\\' && !c.is_control())
        .collect();
    (
        [
            (header::CONTENT_TYPE, file.file_type),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{safe_name}\""),
            ),
        ],
        file.file_data,
    )
        .into_response()
}

#[instrument(skip(state, mp))]
pub async fn upload_material(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(course_id): Path<Uuid>,
    mp: Multipart,
) -> PortalResult<(StatusCode, Json<Material>)> {
    let upload = read_upload(mp).await?;
    let material = services::upload_material(&state, &who, course_id, upload).await?;
    Ok((StatusCode::CREATED, Json(material)))
}

#[instrument(skip(state))]
pub async fn list_materials(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(course_id): Path<Uuid>,
) -> PortalResult<Json<Vec<Material>>> {
    Ok(Json(services::list_materials(&state, &who, course_id).await?))
}

#[instrument(skip(state))]
pub async fn download_material(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path((course_id, material_id)): Path<(Uuid, Uuid)>,
) -> PortalResult<Response> {
    let file = services::download_material(&state, &who, course_id, material_id).await?;
    Ok(attachment(file))
}

#[instrument(skip(state))]
pub async fn delete_material(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path((course_id, material_id)): Path<(Uuid, Uuid)>,
) -> PortalResult<Json<Value>> {
    services::delete_material(&state, &who, course_id, material_id).await?;
    Ok(Json(json!({ "message": "Material deleted successfully" })))
}

#[instrument(skip(state))]
pub async fn list_my_materials(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(course_id): Path<Uuid>,
) -> PortalResult<Json<Vec<Material>>> {
    Ok(Json(services::list_my_materials(&state, &who, course_id).await?))
}

#[instrument(skip(state))]
pub async fn download_my_material(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(id): Path<Uuid>,
) -> PortalResult<Response> {
    let file = services::download_my_material(&state, &who, id).await?;
    Ok(attachment(file))
}
