use sqlx::Executor;
use thiserror::Error;

use crate::connection::DbPool;
use crate::credentials::{hash_password, CredentialError};
use crate::repositories::{NewEmployee, RepositoryError, SqlEmployeeDirectory};

/// Password shared by every demo employee.
pub const DEMO_PASSWORD: &str = "MinerBot#2026";

const DEMO_SITE_IDS: &[i64] = &[1, 2, 3];
const DEMO_AREA_IDS: &[i64] = &[10, 11, 12, 13];
const DEMO_ROLE_IDS: &[i64] = &[100, 101, 102, 103];

const DEMO_EMPLOYEES: &[DemoEmployee] = &[
    DemoEmployee {
        id: "EMP-0001",
        first_name: "Valentina",
        last_name: "Muñoz",
        email: "valentina.munoz@minerbot.example",
        tax_id: "15123456-7",
        site_id: 1,
        area_id: 10,
        role_id: 100,
        active: true,
    },
    DemoEmployee {
        id: "EMP-0002",
        first_name: "Rodrigo",
        last_name: "Tapia",
        email: "rodrigo.tapia@minerbot.example",
        tax_id: "16234567-8",
        site_id: 2,
        area_id: 11,
        role_id: 101,
        active: true,
    },
    DemoEmployee {
        id: "EMP-0003",
        first_name: "Francisca",
        last_name: "Vega",
        email: "francisca.vega@minerbot.example",
        tax_id: "17345678-9",
        site_id: 3,
        area_id: 12,
        role_id: 102,
        active: true,
    },
    DemoEmployee {
        id: "EMP-0004",
        first_name: "Matías",
        last_name: "Godoy",
        email: "matias.godoy@minerbot.example",
        tax_id: "14456789-K",
        site_id: 1,
        area_id: 13,
        role_id: 103,
        active: false,
    },
];

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
}

impl From<sqlx::Error> for SeedError {
    fn from(error: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(error))
    }
}

/// Demo employee directory: three sites, their areas and roles, three active
/// employees and one inactive one.
pub struct DemoDirectory;

impl DemoDirectory {
    /// Reference data (sites, areas, roles).
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_directory.sql");

    /// Loads the dataset, hashing [`DEMO_PASSWORD`] at `hash_cost`. Safe to run repeatedly.
    pub async fn load(pool: &DbPool, hash_cost: u32) -> Result<SeedResult, SeedError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let password_hash = hash_password(DEMO_PASSWORD, hash_cost)?;
        let directory = SqlEmployeeDirectory::new(pool.clone());
        for employee in DEMO_EMPLOYEES {
            directory.upsert_employee(&employee.to_new(&password_hash)).await?;
        }

        let employees = DEMO_EMPLOYEES
            .iter()
            .map(|employee| SeededEmployee {
                id: employee.id,
                email: employee.email,
                tax_id: employee.tax_id,
                active: employee.active,
            })
            .collect();

        Ok(SeedResult { employees, password: DEMO_PASSWORD })
    }

    /// Checks that the dataset is present and that directory lookups honour the active flag.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        checks.push(("sites", count_ids(pool, "sites", DEMO_SITE_IDS).await? == len(DEMO_SITE_IDS)));
        checks.push(("areas", count_ids(pool, "areas", DEMO_AREA_IDS).await? == len(DEMO_AREA_IDS)));
        checks.push(("roles", count_ids(pool, "roles", DEMO_ROLE_IDS).await? == len(DEMO_ROLE_IDS)));

        for employee in DEMO_EMPLOYEES {
            let status = if employee.active { "active" } else { "inactive" };
            let row_ok: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM employees
                               WHERE id = ?1 AND status = ?2 AND site_id = ?3 AND area_id = ?4
                                 AND role_id = ?5 AND password_hash LIKE '$2%')",
            )
            .bind(employee.id)
            .bind(status)
            .bind(employee.site_id)
            .bind(employee.area_id)
            .bind(employee.role_id)
            .fetch_one(pool)
            .await?;
            checks.push((employee.id, row_ok == 1));
        }

        let directory = SqlEmployeeDirectory::new(pool.clone());
        for employee in DEMO_EMPLOYEES {
            let found = directory.find_by_identifier(employee.email).await?.is_some();
            checks.push((employee.lookup_label(), found == employee.active));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes the demo employees and any reference rows no other employee uses.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let employee_ids = sql_array_from_ids(DEMO_EMPLOYEES.iter().map(|employee| employee.id));
        sqlx::query(&format!("DELETE FROM employees WHERE id IN {employee_ids}"))
            .execute(&mut *tx)
            .await?;

        for (table, column, ids) in [
            ("sites", "site_id", DEMO_SITE_IDS),
            ("areas", "area_id", DEMO_AREA_IDS),
            ("roles", "role_id", DEMO_ROLE_IDS),
        ] {
            let ids = sql_int_array(ids);
            sqlx::query(&format!(
                "DELETE FROM {table} WHERE id IN {ids} AND id NOT IN (SELECT {column} FROM employees)"
            ))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct DemoEmployee {
    id: &'static str,
    first_name: &'static str,
    last_name: &'static str,
    email: &'static str,
    tax_id: &'static str,
    site_id: i64,
    area_id: i64,
    role_id: i64,
    active: bool,
}

impl DemoEmployee {
    fn to_new(self, password_hash: &str) -> NewEmployee {
        NewEmployee {
            id: self.id.to_string(),
            first_name: self.first_name.to_string(),
            last_name: self.last_name.to_string(),
            email: self.email.to_string(),
            tax_id: self.tax_id.to_string(),
            password_hash: Some(password_hash.to_string()),
            site_id: self.site_id,
            area_id: self.area_id,
            role_id: self.role_id,
            active: self.active,
        }
    }

    fn lookup_label(&self) -> &'static str {
        match self.id {
            "EMP-0001" => "lookup-EMP-0001",
            "EMP-0002" => "lookup-EMP-0002",
            "EMP-0003" => "lookup-EMP-0003",
            _ => "lookup-inactive-hidden",
        }
    }
}

async fn count_ids(pool: &DbPool, table: &str, ids: &[i64]) -> Result<i64, RepositoryError> {
    let count = sqlx::query_scalar(&format!(
        "SELECT COUNT(1) FROM {table} WHERE id IN {}",
        sql_int_array(ids)
    ))
    .fetch_one(pool)
    .await?;
    Ok(count)
}

fn len(ids: &[i64]) -> i64 {
    ids.len() as i64
}

fn sql_array_from_ids<'a>(ids: impl Iterator<Item = &'a str>) -> String {
    let quoted = ids.map(|id| format!("'{id}'")).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}

fn sql_int_array(ids: &[i64]) -> String {
    let joined = ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
    format!("({joined})")
}

#[derive(Debug)]
pub struct SeedResult {
    pub employees: Vec<SeededEmployee>,
    pub password: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct SeededEmployee {
    pub id: &'static str,
    pub email: &'static str,
    pub tax_id: &'static str,
    pub active: bool,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use minerbot_core::collaborators::PasswordVerifier;

    use super::{DemoDirectory, DEMO_PASSWORD};
    use crate::credentials::BcryptPasswordVerifier;
    use crate::repositories::SqlEmployeeDirectory;
    use crate::{connect_with_settings, migrations::run_pending, DbPool};

    async fn migrated_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");
        pool
    }

    #[tokio::test]
    async fn load_then_verify_passes_every_check() {
        let pool = migrated_pool().await;

        let seeded = DemoDirectory::load(&pool, 4).await.expect("load");
        assert_eq!(seeded.employees.len(), 4);
        assert_eq!(seeded.employees.iter().filter(|employee| employee.active).count(), 3);

        let verification = DemoDirectory::verify(&pool).await.expect("verify");
        let failed: Vec<_> =
            verification.checks.iter().filter(|(_, ok)| !ok).map(|(label, _)| *label).collect();
        assert!(verification.all_present, "failed checks: {failed:?}");
    }

    #[tokio::test]
    async fn loading_twice_is_idempotent() {
        let pool = migrated_pool().await;
        DemoDirectory::load(&pool, 4).await.expect("first load");
        DemoDirectory::load(&pool, 4).await.expect("second load");

        let employees: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM employees")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(employees, 4);
    }

    #[tokio::test]
    async fn seeded_hash_verifies_the_demo_password() {
        let pool = migrated_pool().await;
        let seeded = DemoDirectory::load(&pool, 4).await.expect("load");

        let directory = SqlEmployeeDirectory::new(pool.clone());
        let record = directory
            .find_by_identifier(seeded.employees[1].tax_id)
            .await
            .expect("lookup")
            .expect("active employee");
        let hash = record.credential_hash.expect("hash");
        assert!(BcryptPasswordVerifier.verify(DEMO_PASSWORD, &hash).await.expect("verify"));
        assert_eq!(record.site, "Oficina Iquique");
    }

    #[tokio::test]
    async fn clean_removes_the_dataset() {
        let pool = migrated_pool().await;
        DemoDirectory::load(&pool, 4).await.expect("load");
        DemoDirectory::clean(&pool).await.expect("clean");

        let verification = DemoDirectory::verify(&pool).await.expect("verify");
        assert!(!verification.all_present);
        let sites: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM sites")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(sites, 0);
    }
}
