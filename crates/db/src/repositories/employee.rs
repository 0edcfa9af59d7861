use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use tracing::debug;

use minerbot_core::collaborators::EmployeeDirectory;
use minerbot_core::domain::employee::{EmployeeId, EmployeeRecord};
use minerbot_core::errors::CollaboratorError;

use super::{decode_err, RepositoryError};
use crate::DbPool;

const COLLABORATOR: &str = "employee_directory";

/// Row written by provisioning and the demo seed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewEmployee {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub tax_id: String,
    pub password_hash: Option<String>,
    pub site_id: i64,
    pub area_id: i64,
    pub role_id: i64,
    pub active: bool,
}

pub struct SqlEmployeeDirectory {
    pool: DbPool,
}

impl SqlEmployeeDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Active employee whose corporate email (any case) or tax id equals `identifier`.
    pub async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<EmployeeRecord>, RepositoryError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Ok(None);
        }

        let row = sqlx::query(
            "SELECT e.id, e.first_name, e.last_name, e.email, e.tax_id, e.password_hash,
                    e.site_id, s.name AS site_name, a.name AS area_name, r.name AS role_name
             FROM employees e
             JOIN sites s ON e.site_id = s.id
             JOIN areas a ON e.area_id = a.id
             JOIN roles r ON e.role_id = r.id
             WHERE (e.email = ?1 OR e.tax_id = ?1) AND e.status = 'active'
             LIMIT 1",
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_employee).transpose()
    }

    pub async fn upsert_employee(&self, employee: &NewEmployee) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        let status = if employee.active { "active" } else { "inactive" };

        sqlx::query(
            "INSERT INTO employees (id, first_name, last_name, email, tax_id, password_hash,
                                    site_id, area_id, role_id, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 first_name = excluded.first_name,
                 last_name = excluded.last_name,
                 email = excluded.email,
                 tax_id = excluded.tax_id,
                 password_hash = excluded.password_hash,
                 site_id = excluded.site_id,
                 area_id = excluded.area_id,
                 role_id = excluded.role_id,
                 status = excluded.status,
                 updated_at = excluded.updated_at",
        )
        .bind(&employee.id)
        .bind(&employee.first_name)
        .bind(&employee.last_name)
        .bind(&employee.email)
        .bind(&employee.tax_id)
        .bind(&employee.password_hash)
        .bind(employee.site_id)
        .bind(employee.area_id)
        .bind(employee.role_id)
        .bind(status)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn count_active(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar("SELECT COUNT(1) FROM employees WHERE status = 'active'")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn row_to_employee(row: &sqlx::sqlite::SqliteRow) -> Result<EmployeeRecord, RepositoryError> {
    let site_id: i64 = row.try_get("site_id").map_err(decode_err)?;

    Ok(EmployeeRecord {
        id: EmployeeId(row.try_get("id").map_err(decode_err)?),
        first_name: row.try_get("first_name").map_err(decode_err)?,
        last_name: row.try_get("last_name").map_err(decode_err)?,
        email: row.try_get("email").map_err(decode_err)?,
        tax_id: row.try_get("tax_id").map_err(decode_err)?,
        site: row.try_get("site_name").map_err(decode_err)?,
        site_id: site_id.to_string(),
        area: row.try_get("area_name").map_err(decode_err)?,
        role: row.try_get("role_name").map_err(decode_err)?,
        credential_hash: row.try_get("password_hash").map_err(decode_err)?,
    })
}

#[async_trait]
impl EmployeeDirectory for SqlEmployeeDirectory {
    async fn lookup_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<EmployeeRecord>, CollaboratorError> {
        let found = self
            .find_by_identifier(identifier)
            .await
            .map_err(|error| error.into_collaborator(COLLABORATOR))?;
        debug!(event_name = "directory.lookup", found = found.is_some(), "employee lookup finished");
        Ok(found)
    }
}
