//! Fixtures shared by the unit tests.

use crate::auth::identity::{Identity, Role};
use crate::auth::jwt::JwtKeys;
use crate::auth::repo_types::{NewUser, UserInsert};
use crate::courses::repo_types::{Course, NewCourse};
use crate::state::AppState;

async fn seed_user(st: &AppState, email: &str, role: Role) -> Identity {
    let new = NewUser {
        name: email.split('@').next().unwrap_or(email).to_string(),
        email: email.to_string(),
        password_hash: "unused".into(),
        role,
        student_id: (role == Role::Student).then(|| format!("STU-{email}")),
    };
    match st.store.insert_user(&new).await.unwrap() {
        UserInsert::Created(user) => Identity::new(user.id, user.role),
        other => panic!("seed user {email}: {other:?}"),
    }
}

pub async fn seed_admin(st: &AppState) -> Identity {
    seed_user(st, "admin@uni.edu", Role::Admin).await
}

pub async fn seed_student(st: &AppState, email: &str) -> Identity {
    seed_user(st, email, Role::Student).await
}

pub async fn seed_course(st: &AppState, code: &str, capacity: i32) -> Course {
    let new = NewCourse {
        code: code.to_string(),
        name: format!("Course {code}"),
        description: None,
        credits: 3,
        capacity,
        instructor: Some("Dr. Smith".into()),
        schedule: None,
        is_active: true,
    };
    st.store.insert_course(&new).await.unwrap().unwrap()
}

pub fn access_token(st: &AppState, who: &Identity) -> String {
    JwtKeys::from(&st.config.jwt).sign_access(who).unwrap()
}
