//! Admin and role queries.

use uuid::Uuid;

use super::AppState;
use crate::auth::model::{Admin, AdminInfo, Role, RESERVED_ROLE_CODE};
use crate::auth::query::{admin_table, AdminListQuery};
use crate::error::AppError;
use crate::pagination::sql::SqlSource;
use crate::pagination::{paginate, PageResult};

const ADMIN_COLUMNS: &str =
    "id, username, password_hash, display_name, refresh_token, role_id, is_active, created_at, updated_at, created_by";

/// Fields of an admin account about to be inserted.
pub struct NewAdmin<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
    pub display_name: Option<&'a str>,
    pub role_id: Uuid,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
}

impl AppState {
    pub async fn admin_count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM admins")
            .fetch_one(&self.pool)
            .await
    }

    pub async fn admin_by_id(&self, id: &Uuid) -> Result<Option<Admin>, sqlx::Error> {
        sqlx::query_as::<_, Admin>(&format!("SELECT {} FROM admins WHERE id = $1", ADMIN_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn admin_by_username(&self, username: &str) -> Result<Option<Admin>, sqlx::Error> {
        sqlx::query_as::<_, Admin>(&format!("SELECT {} FROM admins WHERE username = $1", ADMIN_COLUMNS))
            .bind(username)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn admin_by_refresh_token(&self, refresh_token: &str) -> Result<Option<Admin>, sqlx::Error> {
        sqlx::query_as::<_, Admin>(&format!(
            "SELECT {} FROM admins WHERE refresh_token = $1",
            ADMIN_COLUMNS
        ))
        .bind(refresh_token)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn insert_admin(&self, admin: NewAdmin<'_>) -> Result<Admin, sqlx::Error> {
        sqlx::query_as::<_, Admin>(&format!(
            "INSERT INTO admins (username, password_hash, display_name, role_id, is_active, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            ADMIN_COLUMNS
        ))
        .bind(admin.username)
        .bind(admin.password_hash)
        .bind(admin.display_name)
        .bind(admin.role_id)
        .bind(admin.is_active)
        .bind(admin.created_by)
        .fetch_one(&self.pool)
        .await
    }

    /// Stores the refresh token of the latest login, ending older sessions.
    pub async fn set_refresh_token(&self, admin_id: &Uuid, refresh_token: Option<&str>) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE admins SET refresh_token = $1, updated_at = NOW() WHERE id = $2")
            .bind(refresh_token)
            .bind(admin_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn toggle_admin_active(&self, admin_id: &Uuid) -> Result<Option<Admin>, sqlx::Error> {
        sqlx::query_as::<_, Admin>(&format!(
            "UPDATE admins SET is_active = NOT is_active, refresh_token = NULL, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            ADMIN_COLUMNS
        ))
        .bind(admin_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn delete_admin(&self, admin_id: &Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM admins WHERE id = $1")
            .bind(admin_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn admins_page(&self, query: &AdminListQuery) -> Result<PageResult<AdminInfo>, AppError> {
        let source: SqlSource<AdminInfo> = SqlSource::new(self.pool.clone(), admin_table());
        Ok(paginate(&source, &query.page_request()).await?)
    }

    /// Roles that can be assigned through the API, newest first.
    pub async fn assignable_roles(&self) -> Result<Vec<Role>, sqlx::Error> {
        sqlx::query_as::<_, Role>("SELECT id, code, name, created_at FROM roles WHERE code <> $1 ORDER BY created_at DESC")
            .bind(RESERVED_ROLE_CODE)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn role_by_id(&self, id: &Uuid) -> Result<Option<Role>, sqlx::Error> {
        sqlx::query_as::<_, Role>("SELECT id, code, name, created_at FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn role_code_exists(&self, code: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM roles WHERE code = $1)")
            .bind(code)
            .fetch_one(&self.pool)
            .await
    }

    pub async fn insert_role(&self, code: &str, name: &str) -> Result<Role, sqlx::Error> {
        sqlx::query_as::<_, Role>("INSERT INTO roles (code, name) VALUES ($1, $2) RETURNING id, code, name, created_at")
            .bind(code)
            .bind(name)
            .fetch_one(&self.pool)
            .await
    }
}
