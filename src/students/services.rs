use time::macros::format_description;
use time::Date;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::dto::{AccountView, StudentDetail, UpdateProfileRequest, UserDirectory};
use crate::audit::{AuditAction, AuditEntity};
use crate::auth::dto::{PublicUser, RegisterRequest};
use crate::auth::identity::{Identity, Role};
use crate::auth::repo_types::{ProfileUpdate, StudentSummary, User};
use crate::auth::services::{
    create_account, normalize_email, parse_role, validate_account, AccountDraft,
};
use crate::courses::dto::trimmed;
use crate::error::{PortalError, PortalResult};
use crate::state::AppState;

async fn find_student(st: &AppState, id: Uuid) -> PortalResult<User> {
    st.store
        .find_user(id)
        .await?
        .filter(|u| u.role == Role::Student)
        .ok_or_else(|| PortalError::not_found("Student not found"))
}

fn profile_update(req: UpdateProfileRequest) -> PortalResult<(String, ProfileUpdate)> {
    let req = UpdateProfileRequest {
        name: req.name.trim().to_string(),
        ..req
    };
    req.validate()?;
    let date_of_birth = match trimmed(req.date_of_birth) {
        None => None,
        Some(raw) => Some(
            Date::parse(&raw, format_description!("[year]-[month]-[day]"))
                .map_err(|_| PortalError::invalid("Date of birth must be YYYY-MM-DD"))?,
        ),
    };
    Ok((
        req.name,
        ProfileUpdate {
            phone: trimmed(req.phone),
            address: trimmed(req.address),
            date_of_birth,
            bio: trimmed(req.bio),
        },
    ))
}

/// Admin account creation; unlike public registration this may create admins.
pub async fn create_user(
    st: &AppState,
    who: &Identity,
    req: RegisterRequest,
) -> PortalResult<PublicUser> {
    who.require_admin()?;
    let role = parse_role(req.role.as_deref())?;
    let req = RegisterRequest {
        name: req.name.trim().to_string(),
        email: normalize_email(&req.email),
        ..req
    };
    validate_account(&req)?;

    if st.store.find_user_by_email(&req.email).await?.is_some() {
        return Err(PortalError::conflict("Email already registered"));
    }
    let user = create_account(
        st,
        AccountDraft {
            name: &req.name,
            email: &req.email,
            password: &req.password,
            role,
        },
    )
    .await?;

    st.audit.record(
        who.user_id,
        AuditAction::Create,
        AuditEntity::User,
        user.id,
        format!("Created {} account: {}", role.as_str(), user.email),
    );
    info!(user_id = %user.id, role = role.as_str(), "user created by admin");
    Ok(user.into())
}

pub async fn list_students(st: &AppState, who: &Identity) -> PortalResult<Vec<StudentSummary>> {
    who.require_admin()?;
    Ok(st.store.list_students().await?)
}

pub async fn list_users(st: &AppState, who: &Identity) -> PortalResult<UserDirectory> {
    who.require_admin()?;
    Ok(UserDirectory::new(st.store.list_users().await?))
}

pub async fn get_student(st: &AppState, who: &Identity, id: Uuid) -> PortalResult<StudentDetail> {
    who.require_admin()?;
    let user = find_student(st, id).await?;
    let profile = st.store.find_profile(id).await?;
    let enrollments = st.store.list_enrollments_for_user(id).await?;
    Ok(StudentDetail {
        account: AccountView::new(user, profile),
        enrollments,
    })
}

pub async fn delete_student(st: &AppState, who: &Identity, id: Uuid) -> PortalResult<()> {
    who.require_admin()?;
    let user = find_student(st, id).await?;
    if !st.store.delete_user(id).await? {
        return Err(PortalError::not_found("Student not found"));
    }

    st.audit.record(
        who.user_id,
        AuditAction::Delete,
        AuditEntity::Student,
        id,
        format!("Deleted student: {}", user.email),
    );
    info!(user_id = %id, "student deleted");
    Ok(())
}

pub async fn get_profile(st: &AppState, who: &Identity) -> PortalResult<AccountView> {
    who.require_student()?;
    let user = find_student(st, who.user_id).await?;
    let profile = st.store.find_profile(who.user_id).await?;
    Ok(AccountView::new(user, profile))
}

pub async fn update_profile(
    st: &AppState,
    who: &Identity,
    req: UpdateProfileRequest,
) -> PortalResult<AccountView> {
    who.require_student()?;
    let user = find_student(st, who.user_id).await?;
    let (name, update) = profile_update(req)?;
    let profile = st.store.save_profile(user.id, &name, &update).await?;
    info!(user_id = %user.id, "profile updated");
    Ok(AccountView::new(User { name, ..user }, Some(profile)))
}

pub async fn admin_update_profile(
    st: &AppState,
    who: &Identity,
    student_id: Uuid,
    req: UpdateProfileRequest,
) -> PortalResult<AccountView> {
    who.require_admin()?;
    let user = find_student(st, student_id).await?;
    let (name, update) = profile_update(req)?;
    let profile = st.store.save_profile(user.id, &name, &update).await?;

    st.audit.record(
        who.user_id,
        AuditAction::Update,
        AuditEntity::Student,
        user.id,
        format!("Updated profile of {}", user.email),
    );
    info!(user_id = %user.id, "profile updated by admin");
    Ok(AccountView::new(User { name, ..user }, Some(profile)))
}
