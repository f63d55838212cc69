use serde::Serialize;
use tracing::{info, instrument};

use crate::auth::{Permission, Role};
use crate::db::Database;
use crate::error::AppError;
use crate::seed::insert_row;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct GrantSummary {
    pub roles_created: usize,
    pub permissions_created: usize,
    pub granted: usize,
    pub already_present: usize,
}

/// Links each role to `permissions`, or to its full default set when
/// `permissions` is empty. Existing links are left untouched.
#[instrument(skip(db))]
pub async fn grant_permissions(
    db: &Database,
    roles: &[Role],
    permissions: &[Permission],
) -> Result<GrantSummary, AppError> {
    let mut summary = GrantSummary::default();

    for role in roles {
        let role_id = ensure_role(db, *role, &mut summary).await?;

        let mut wanted: Vec<Permission> = if permissions.is_empty() {
            role.permissions().iter().copied().collect()
        } else {
            permissions.to_vec()
        };
        wanted.sort_by_key(|p| p.code());

        for permission in wanted {
            let permission_id = ensure_permission(db, permission, &mut summary).await?;

            let existing: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM role_permissions WHERE role_id = ? AND permission_id = ?",
            )
            .bind(role_id)
            .bind(permission_id)
            .fetch_one(db.pool())
            .await?;

            if existing > 0 {
                summary.already_present += 1;
                continue;
            }

            sqlx::query("INSERT INTO role_permissions (role_id, permission_id) VALUES (?, ?)")
                .bind(role_id)
                .bind(permission_id)
                .execute(db.pool())
                .await?;
            info!("Granted {} to {}", permission.code(), role);
            summary.granted += 1;
        }
    }

    Ok(summary)
}

async fn ensure_role(
    db: &Database,
    role: Role,
    summary: &mut GrantSummary,
) -> Result<i64, AppError> {
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM roles WHERE code = ?")
        .bind(role.as_str())
        .fetch_optional(db.pool())
        .await?;

    if let Some(id) = existing {
        return Ok(id);
    }

    let sql = db.dialect().returning_id("INSERT INTO roles (code, name) VALUES (?, ?)");
    let query = sqlx::query(&sql)
        .bind(role.as_str())
        .bind(role.display_name());
    let id = insert_row(db.pool(), db.dialect(), query, "role").await?;
    summary.roles_created += 1;
    Ok(id)
}

async fn ensure_permission(
    db: &Database,
    permission: Permission,
    summary: &mut GrantSummary,
) -> Result<i64, AppError> {
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM permissions WHERE code = ?")
        .bind(permission.code())
        .fetch_optional(db.pool())
        .await?;

    if let Some(id) = existing {
        return Ok(id);
    }

    let sql = db
        .dialect()
        .returning_id("INSERT INTO permissions (code, name, type) VALUES (?, ?, 'action')");
    let query = sqlx::query(&sql)
        .bind(permission.code())
        .bind(permission.name());
    let id = insert_row(db.pool(), db.dialect(), query, "permission").await?;
    summary.permissions_created += 1;
    Ok(id)
}
