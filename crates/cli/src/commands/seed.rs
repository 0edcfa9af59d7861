use crate::commands::{current_thread_runtime, load_config, CommandResult};
use minerbot_db::{connect_from_config, migrations, DemoDirectory, SeededEmployee};

pub fn run(hash_cost: u32) -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match current_thread_runtime("seed") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_from_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let seed_result = DemoDirectory::load(&pool, hash_cost)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = DemoDirectory::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result = if verification.all_present {
            Ok((seed_result.employees, seed_result.password))
        } else {
            Err(("seed_verification", failed_checks_message(&verification.checks), 6u8))
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok((employees, password)) => CommandResult::success("seed", summary(&employees, password)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn failed_checks_message(checks: &[(&'static str, bool)]) -> String {
    let failed_checks =
        checks.iter().filter_map(|(check, passed)| (!passed).then_some(*check)).collect::<Vec<_>>();
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}

fn summary(employees: &[SeededEmployee], password: &str) -> String {
    let lines = employees
        .iter()
        .map(|employee| {
            let status = if employee.active { "active" } else { "inactive" };
            format!("  - {}: {} / {} ({status})", employee.id, employee.email, employee.tax_id)
        })
        .collect::<Vec<_>>();
    format!(
        "demo directory loaded ({} employees, password `{password}`):\n{}",
        employees.len(),
        lines.join("\n")
    )
}
