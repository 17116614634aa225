use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use tracing::{error, info, warn};
use validator::Validate;

use super::dto::{AuthResponse, ChangePasswordRequest, LoginRequest, PublicUser, RegisterRequest};
use super::identity::{Identity, Role};
use super::jwt::JwtKeys;
use super::password::{check_password_strength, hash_password, verify_password};
use super::repo_types::{NewUser, User, UserInsert};
use crate::error::{PortalError, PortalResult};
use crate::state::AppState;

const STUDENT_ID_ATTEMPTS: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// `STU` followed by six random digits.
pub fn generate_student_id() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("STU{n:06}")
}

/// Account fields that already passed validation.
pub(crate) struct AccountDraft<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub role: Role,
}

/// Hashes the password and inserts the user; students also get a profile with a
/// fresh student id, re-drawn on collision.
pub(crate) async fn create_account(st: &AppState, draft: AccountDraft<'_>) -> PortalResult<User> {
    let password_hash = hash_password(draft.password)?;
    let mut new = NewUser {
        name: draft.name.to_string(),
        email: draft.email.to_string(),
        password_hash,
        role: draft.role,
        student_id: None,
    };

    for attempt in 1..=STUDENT_ID_ATTEMPTS {
        if draft.role == Role::Student {
            new.student_id = Some(generate_student_id());
        }
        match st.store.insert_user(&new).await? {
            UserInsert::Created(user) => return Ok(user),
            UserInsert::EmailTaken => {
                return Err(PortalError::conflict("Email already registered"))
            }
            UserInsert::StudentIdTaken => {
                warn!(attempt, "student id collision, drawing a new one");
            }
        }
    }
    error!(email = %new.email, "could not allocate a unique student id");
    Err(anyhow::anyhow!("student id space exhausted after {STUDENT_ID_ATTEMPTS} attempts").into())
}

/// Name, email and password rules shared by self-registration and admin account creation.
pub(crate) fn validate_account(req: &RegisterRequest) -> PortalResult<()> {
    req.validate()?;
    if !is_valid_email(&req.email) {
        return Err(PortalError::invalid("Invalid email address"));
    }
    check_password_strength(&req.password)
}

pub(crate) fn parse_role(raw: Option<&str>) -> PortalResult<Role> {
    match raw {
        None => Ok(Role::Student),
        Some(r) => Role::parse(r).ok_or_else(|| PortalError::invalid("Role must be ADMIN or STUDENT")),
    }
}

/// Public self-registration; admin accounts are never created here.
pub async fn register(st: &AppState, req: RegisterRequest) -> PortalResult<PublicUser> {
    let role = parse_role(req.role.as_deref())?;
    if role == Role::Admin {
        warn!("public registration attempted with admin role");
        return Err(PortalError::forbidden(
            "Admin accounts cannot be created through public registration. Contact an administrator.",
        ));
    }

    let req = RegisterRequest {
        name: req.name.trim().to_string(),
        email: normalize_email(&req.email),
        ..req
    };
    validate_account(&req)?;

    if st.store.find_user_by_email(&req.email).await?.is_some() {
        warn!(email = %req.email, "email already registered");
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

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user.into())
}

fn issue_tokens(st: &AppState, user: User) -> PortalResult<AuthResponse> {
    let keys = JwtKeys::from(&st.config.jwt);
    let who = Identity::new(user.id, user.role);
    Ok(AuthResponse {
        access_token: keys.sign_access(&who)?,
        refresh_token: keys.sign_refresh(&who)?,
        user: user.into(),
    })
}

pub async fn login(st: &AppState, req: LoginRequest) -> PortalResult<AuthResponse> {
    let email = normalize_email(&req.email);
    let invalid = || PortalError::unauthorized("Invalid credentials");

    let Some(user) = st.store.find_user_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(invalid());
    };
    if !verify_password(&req.password, &user.password_hash)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    info!(user_id = %user.id, "user logged in");
    issue_tokens(st, user)
}

/// Trades a refresh token for a new pair; the role is re-read from the store.
pub async fn refresh(st: &AppState, refresh_token: &str) -> PortalResult<AuthResponse> {
    let keys = JwtKeys::from(&st.config.jwt);
    let claims = keys.verify_refresh(refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        PortalError::unauthorized("Invalid or expired token")
    })?;
    let user = st
        .store
        .find_user(claims.sub)
        .await?
        .ok_or_else(|| PortalError::unauthorized("User not found"))?;
    issue_tokens(st, user)
}

pub async fn me(st: &AppState, who: &Identity) -> PortalResult<PublicUser> {
    let user = st
        .store
        .find_user(who.user_id)
        .await?
        .ok_or_else(|| PortalError::unauthorized("User not found"))?;
    Ok(user.into())
}

pub async fn change_password(
    st: &AppState,
    who: &Identity,
    req: ChangePasswordRequest,
) -> PortalResult<()> {
    let user = st
        .store
        .find_user(who.user_id)
        .await?
        .ok_or_else(|| PortalError::unauthorized("User not found"))?;
    if !verify_password(&req.current_password, &user.password_hash)? {
        return Err(PortalError::invalid("Current password is incorrect"));
    }
    check_password_strength(&req.new_password)?;

    let hash = hash_password(&req.new_password)?;
    st.store.update_password(user.id, &hash).await?;
    info!(user_id = %user.id, "password changed");
    Ok(())
}
