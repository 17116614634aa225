//! CSV bulk account import.
//!
//! The header row must name `name`, `email`, `password` and `role` (any case, any
//! order). Each data row is handled on its own: a bad row is reported as
//! `Row N: ...` with its line number in the file and the import moves on.

use std::collections::HashMap;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{info, warn};

use super::dto::ImportReport;
use crate::audit::{AuditAction, AuditEntity};
use crate::auth::identity::{Identity, Role};
use crate::auth::password::MIN_PASSWORD_LEN;
use crate::auth::services::{create_account, is_valid_email, normalize_email, AccountDraft};
use crate::error::{PortalError, PortalResult};
use crate::state::AppState;

const REQUIRED_COLUMNS: [&str; 4] = ["name", "email", "password", "role"];

struct Columns {
    name: usize,
    email: usize,
    password: usize,
    role: usize,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> PortalResult<Self> {
        let index: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_ascii_lowercase(), i))
            .collect();
        let find = |col: &str| {
            index.get(col).copied().ok_or_else(|| {
                PortalError::invalid(format!(
                    "CSV must contain columns: {}",
                    REQUIRED_COLUMNS.join(", ")
                ))
            })
        };
        Ok(Self {
            name: find("name")?,
            email: find("email")?,
            password: find("password")?,
            role: find("role")?,
        })
    }
}

struct ImportRow {
    name: String,
    email: String,
    password: String,
    role: Role,
}

fn parse_row(cols: &Columns, record: &StringRecord) -> Result<ImportRow, String> {
    let field = move |i: usize| record.get(i).unwrap_or("").trim();
    let (name, email, password, role) = (
        field(cols.name),
        normalize_email(field(cols.email)),
        field(cols.password),
        field(cols.role),
    );
    if name.is_empty() || email.is_empty() || password.is_empty() || role.is_empty() {
        return Err("Missing required fields".into());
    }
    let role = Role::parse(role).ok_or_else(|| format!("Invalid role \"{role}\""))?;
    if !is_valid_email(&email) {
        return Err(format!("Invalid email \"{email}\""));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }
    Ok(ImportRow {
        name: name.to_string(),
        email,
        password: password.to_string(),
        role,
    })
}

async fn import_row(st: &AppState, who: &Identity, row: ImportRow) -> Result<(), String> {
    let duplicate = || format!("Email \"{}\" already exists", row.email);
    match st.store.find_user_by_email(&row.email).await {
        Ok(Some(_)) => return Err(duplicate()),
        Ok(None) => {}
        Err(e) => {
            warn!(error = %e, "lookup failed during import");
            return Err("Internal error".into());
        }
    }

    let draft = AccountDraft {
        name: &row.name,
        email: &row.email,
        password: &row.password,
        role: row.role,
    };
    let user = match create_account(st, draft).await {
        Ok(user) => user,
        Err(PortalError::Conflict(_)) => return Err(duplicate()),
        Err(e) => {
            warn!(error = %e, email = %row.email, "import insert failed");
            return Err("Internal error".into());
        }
    };

    st.audit.record(
        who.user_id,
        AuditAction::BulkImport,
        AuditEntity::User,
        user.id,
        format!("Imported {} account: {}", row.role.as_str(), user.email),
    );
    Ok(())
}

/// Imports every valid row of `data`; only request-level problems return an error.
pub async fn bulk_import(st: &AppState, who: &Identity, data: &[u8]) -> PortalResult<ImportReport> {
    who.require_admin()?;
    if data.iter().all(u8::is_ascii_whitespace) {
        return Err(PortalError::invalid("CSV file is empty"));
    }

    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(data);
    let headers = reader
        .headers()
        .map_err(|e| PortalError::invalid(format!("Invalid CSV header: {e}")))?
        .clone();
    let cols = Columns::from_headers(&headers)?;

    let mut report = ImportReport::default();
    let mut rows = 0usize;
    for (i, result) in reader.records().enumerate() {
        // header is line 1
        let fallback_line = i as u64 + 2;
        let outcome = match result {
            Ok(record) => {
                if record.iter().all(|f| f.is_empty()) {
                    continue;
                }
                rows += 1;
                let line = record.position().map_or(fallback_line, |p| p.line());
                let result = match parse_row(&cols, &record) {
                    Ok(row) => import_row(st, who, row).await,
                    Err(msg) => Err(msg),
                };
                result.map_err(|msg| format!("Row {line}: {msg}"))
            }
            Err(e) => {
                rows += 1;
                let line = e.position().map_or(fallback_line, |p| p.line());
                Err(format!("Row {line}: Malformed row"))
            }
        };
        match outcome {
            Ok(()) => report.success_count += 1,
            Err(msg) => {
                report.failed_count += 1;
                report.errors.push(msg);
            }
        }
    }

    if rows == 0 {
        return Err(PortalError::invalid("CSV file has no data rows"));
    }
    info!(
        imported = report.success_count,
        failed = report.failed_count,
        "bulk import finished"
    );
    Ok(report)
}

#[cfg(test)]
mod import_tests {
    use super::*;
    use crate::audit::repo::AuditRepo;
    use crate::auth::repo::UserRepo;
    use crate::auth::repo_types::UserInsert;
    use crate::auth::repo_types::NewUser;
    use crate::testing::seed_admin;

    #[tokio::test]
    async fn duplicate_row_fails_alone() {
        let (st, mem) = AppState::fake();
        let admin = seed_admin(&st).await;
        let csv = "name,email,password,role\n\
                   Ada,ada@uni.edu,password1,STUDENT\n\
                   Bob,bob@uni.edu,password2,student\n\
                   Cy,cy@uni.edu,password3,ADMIN\n\
                   Ada Again,ada@uni.edu,password4,STUDENT\n";

        let report = bulk_import(&st, &admin, csv.as_bytes()).await.unwrap();
        assert_eq!(report.success_count, 3);
        assert_eq!(report.failed_count, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("Row 5:"));
        assert!(report.errors[0].contains("ada@uni.edu"));

        st.audit.flush().await;
        let log = mem.list_audit(10).await.unwrap();
        assert_eq!(log.len(), 3);
        assert!(log.iter().all(|e| e.action == "BULK_IMPORT" && e.entity == "USER"));

        let cy = mem.find_user_by_email("cy@uni.edu").await.unwrap().unwrap();
        assert_eq!(cy.role, Role::Admin);
        assert!(mem.find_profile(cy.id).await.unwrap().is_none());
        let bob = mem.find_user_by_email("bob@uni.edu").await.unwrap().unwrap();
        assert!(mem.find_profile(bob.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn quoted_fields_and_header_case() {
        let (st, mem) = AppState::fake();
        let admin = seed_admin(&st).await;
        let csv = "Email,NAME,Role,Password\n\
                   ada@uni.edu,\"Lovelace, Ada\",STUDENT,password1\n";

        let report = bulk_import(&st, &admin, csv.as_bytes()).await.unwrap();
        assert_eq!(report, ImportReport { success_count: 1, ..Default::default() });
        let ada = mem.find_user_by_email("ada@uni.edu").await.unwrap().unwrap();
        assert_eq!(ada.name, "Lovelace, Ada");
    }

    #[tokio::test]
    async fn bad_rows_are_reported_by_line() {
        let (st, mem) = AppState::fake();
        let admin = seed_admin(&st).await;
        let existing = NewUser {
            name: "Old".into(),
            email: "old@uni.edu".into(),
            password_hash: "x".into(),
            role: Role::Admin,
            student_id: None,
        };
        assert!(matches!(mem.insert_user(&existing).await.unwrap(), UserInsert::Created(_)));
        let csv = "name,email,password,role\n\
                   ,a@uni.edu,password1,STUDENT\n\
                   B,b@uni.edu,password2,TEACHER\n\
                   C,c@uni.edu,short,STUDENT\n\
                   D,OLD@uni.edu,password4,STUDENT\n";

        let report = bulk_import(&st, &admin, csv.as_bytes()).await.unwrap();
        assert_eq!(report.success_count, 0);
        assert_eq!(
            report.errors,
            vec![
                "Row 2: Missing required fields".to_string(),
                "Row 3: Invalid role \"TEACHER\"".to_string(),
                "Row 4: Password must be at least 8 characters".to_string(),
                "Row 5: Email \"old@uni.edu\" already exists".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn request_level_failures() {
        let (st, _) = AppState::fake();
        let admin = seed_admin(&st).await;
        for csv in ["", "  \n", "name,email,password,role\n", "name,email\nAda,ada@uni.edu\n"] {
            assert!(
                matches!(
                    bulk_import(&st, &admin, csv.as_bytes()).await,
                    Err(PortalError::InvalidInput(_))
                ),
                "{csv:?} should be rejected"
            );
        }
    }
}
