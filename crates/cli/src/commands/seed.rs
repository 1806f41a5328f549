use crate::commands::{
    load_config, runtime, CommandResult, EXIT_DATA, EXIT_DATABASE, EXIT_MIGRATION,
};
use sentinel_db::{connect_with_config, migrations, DemoDataset, SeedResult};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("seed") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let dataset = DemoDataset::for_cutoff(config.pipeline.data_cutoff);
    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), EXIT_DATABASE))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), EXIT_MIGRATION))?;

        let seeded = dataset
            .load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), EXIT_DATA))?;

        let verification = dataset
            .verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), EXIT_DATA))?;

        let outcome = if verification.all_present {
            Ok(seeded)
        } else {
            Err(("seed_verification", failed_checks_message(&verification.checks), EXIT_DATA))
        };

        pool.close().await;
        outcome
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", summary(&seeded)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn summary(seeded: &SeedResult) -> String {
    format!(
        "demo market data loaded: {} cost-basis rows ({} to {}), {} price observations across {} series",
        seeded.cost_basis_rows,
        seeded.first_date,
        seeded.last_cost_basis_date,
        seeded.price_history_rows,
        seeded.series
    )
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

#[cfg(test)]
mod tests {
    use super::failed_checks_message;

    #[test]
    fn verification_error_message_targets_failed_checks() {
        let checks = [
            ("cost-basis-cutoff", true),
            ("cost-basis-horizon", false),
            ("price-history-cutoff", false),
        ];

        assert_eq!(
            failed_checks_message(&checks),
            "Seed verification failed for checks: cost-basis-horizon, price-history-cutoff"
        );
    }

    #[test]
    fn verification_error_message_falls_back_to_generic_when_no_labels() {
        let checks = [("cost-basis-cutoff", true), ("price-history-series", true)];
        assert_eq!(failed_checks_message(&checks), "Some seed data failed to load");
    }
}
