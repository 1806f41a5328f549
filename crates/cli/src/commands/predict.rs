use chrono::{NaiveDate, Utc};
use clap::Args;
use sentinel_core::pricing::StaticExplainer;
use sentinel_core::{
    DomainError, ManualOverride, ModelArtifactSet, PolicyTables, PriceRequest, RequestMode,
    SentinelPipeline,
};
use sentinel_db::{
    connect_with_config, load_cost_basis_store, load_price_history_store, migrations,
};

use crate::commands::{
    load_config, runtime, CommandResult, EXIT_ASSETS, EXIT_DATABASE, EXIT_MIGRATION,
    EXIT_REQUEST,
};

const CORRELATION_ID: &str = "cli";

#[derive(Debug, Clone, Args)]
pub struct PredictArgs {
    #[arg(long, help = "Commodity name or alias, e.g. \"ayam bersih\"")]
    pub item: String,
    #[arg(long, help = "Malaysian state the price applies to")]
    pub region: String,
    #[arg(long, conflicts_with = "manual", help = "Price against the cost basis of this date")]
    pub date: Option<NaiveDate>,
    #[arg(
        long,
        value_parser = parse_manual,
        help = "Manual cost inputs: usd_now,usd_lag_60,diesel_now,diesel_lag_30"
    )]
    pub manual: Option<ManualOverride>,
    #[arg(long, help = "Observed shelf price to audit, in RM")]
    pub price: Option<f64>,
    #[arg(long, help = "Retail premise type; defaults to the configured premise")]
    pub premise: Option<String>,
    #[arg(long, help = "Treat the date as part of a festive season")]
    pub festive: bool,
}

impl PredictArgs {
    /// The observed price is passed through untouched; the pipeline owns
    /// its validation.
    pub fn into_request(self, today: NaiveDate) -> Result<PriceRequest, DomainError> {
        Ok(PriceRequest {
            item: self.item,
            region: self.region,
            premise: self.premise,
            observed_price: self.price,
            mode: RequestMode::from_parts(self.date, self.manual)?,
            festive: self.festive,
            today,
        })
    }
}

pub fn parse_manual(raw: &str) -> Result<ManualOverride, String> {
    let values = raw
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| format!("`{}` is not a finite number", part.trim()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    match values.as_slice() {
        [currency_now, currency_lag60, fuel_now, fuel_lag30] => Ok(ManualOverride {
            currency_now: *currency_now,
            currency_lag60: *currency_lag60,
            fuel_now: *fuel_now,
            fuel_lag30: *fuel_lag30,
        }),
        _ => Err(format!("expected 4 comma-separated values, got {}", values.len())),
    }
}

pub fn run(args: PredictArgs) -> CommandResult {
    let request = match args.into_request(Utc::now().date_naive()) {
        Ok(request) => request,
        Err(error) => {
            return CommandResult::failure("predict", "bad_request", error.to_string(), EXIT_REQUEST)
        }
    };
    let config = match load_config("predict") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("predict") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let policy = PolicyTables::load(config.assets.policy_path.as_deref())
            .map_err(|error| ("policy_tables", error.to_string(), EXIT_ASSETS))?;
        let models = ModelArtifactSet::load(&config.assets.models_path)
            .and_then(ModelArtifactSet::into_registry)
            .map_err(|error| ("model_artifacts", error.to_string(), EXIT_ASSETS))?;

        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), EXIT_DATABASE))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), EXIT_MIGRATION))?;
        let stores = async {
            Ok::<_, sentinel_db::RepositoryError>((
                load_cost_basis_store(&pool).await?,
                load_price_history_store(&pool).await?,
            ))
        }
        .await;
        pool.close().await;
        let (cost_basis, history) =
            stores.map_err(|error| ("market_data", error.to_string(), EXIT_DATABASE))?;

        let pipeline =
            SentinelPipeline::new(&policy, config.pipeline.clone(), cost_basis, history, models);
        pipeline
            .predict(&request, &StaticExplainer, CORRELATION_ID)
            .await
            .map_err(|error| match error {
                DomainError::ModelNotFound { .. } | DomainError::CostBasisNotFound { .. } => {
                    ("not_found", error.to_string(), EXIT_REQUEST)
                }
                DomainError::InvalidRequest(_) => ("bad_request", error.to_string(), EXIT_REQUEST),
            })
    });

    match result {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(output) => CommandResult { exit_code: 0, output },
            Err(error) => {
                CommandResult::failure("predict", "serialization", error.to_string(), EXIT_REQUEST)
            }
        },
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("predict", error_class, message, exit_code)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use sentinel_core::config::PipelineConfig;
    use sentinel_core::{
        CostBasisStore, DomainError, ModelRegistry, PolicyTables, PriceHistoryStore, RequestMode,
        SentinelPipeline,
    };

    use super::{parse_manual, PredictArgs};

    fn args() -> PredictArgs {
        PredictArgs {
            item: "ayam bersih".to_string(),
            region: "Selangor".to_string(),
            date: None,
            manual: None,
            price: None,
            premise: None,
            festive: false,
        }
    }

    #[test]
    fn manual_inputs_parse_in_declared_order() {
        let manual = parse_manual("4.40, 4.55,3.35,2.15").expect("parse");
        assert_eq!(manual.currency_now, 4.40);
        assert_eq!(manual.currency_lag60, 4.55);
        assert_eq!(manual.fuel_now, 3.35);
        assert_eq!(manual.fuel_lag30, 2.15);
    }

    #[test]
    fn manual_inputs_reject_wrong_arity_and_garbage() {
        assert!(parse_manual("4.40,4.55,3.35").is_err());
        assert!(parse_manual("4.40,abc,3.35,2.15").is_err());
        assert!(parse_manual("4.40,NaN,3.35,2.15").is_err());
    }

    #[test]
    fn request_requires_a_date_or_manual_inputs() {
        let today = NaiveDate::from_ymd_opt(2025, 7, 1).expect("date");
        let error = args().into_request(today).expect_err("mode is missing");
        assert!(matches!(error, DomainError::InvalidRequest(_)));

        let date = NaiveDate::from_ymd_opt(2025, 6, 1).expect("date");
        let request =
            PredictArgs { date: Some(date), ..args() }.into_request(today).expect("request");
        assert_eq!(request.mode, RequestMode::Historical { target_date: date });
    }

    #[test]
    fn zero_observed_price_is_rejected_by_the_pipeline() {
        let today = NaiveDate::from_ymd_opt(2025, 7, 1).expect("date");
        let request = PredictArgs { price: Some(0.0), date: Some(today), ..args() }
            .into_request(today)
            .expect("price is not checked here");
        assert_eq!(request.observed_price, Some(0.0));

        let pipeline = SentinelPipeline::new(
            &PolicyTables::default(),
            PipelineConfig::default(),
            CostBasisStore::default(),
            PriceHistoryStore::default(),
            ModelRegistry::new(),
        );
        let error = pipeline.assess(&request).expect_err("zero price");
        assert!(
            matches!(error, DomainError::InvalidRequest(ref message) if message.contains("positive"))
        );
    }
}
