use offerwise_core::domain::profile::{AlgorithmHint, BudgetTier, UsageType, UserProfile};
use offerwise_core::resolution::RecommendationRequest;
use offerwise_server::bootstrap::{bootstrap_with_config, BootstrapError};

use crate::commands::{
    build_runtime, init_logging, load_config, CommandResult, Failure, EXIT_CONFIG,
    EXIT_DATABASE, EXIT_MIGRATION, EXIT_RECOMMENDATION, EXIT_RUNTIME,
};

#[derive(Debug, Clone)]
pub struct RecommendArgs {
    pub usage_type: UsageType,
    pub budget: Option<BudgetTier>,
    pub interests: Vec<String>,
    pub limit: usize,
    pub algorithm: AlgorithmHint,
    pub user_id: Option<String>,
}

impl RecommendArgs {
    fn into_request(self) -> RecommendationRequest {
        let mut profile = UserProfile::new(self.usage_type).with_interests(self.interests);
        profile.budget = self.budget;

        let request = RecommendationRequest::new(profile, self.limit)
            .with_algorithm(self.algorithm)
            .with_correlation_id("cli");
        match self.user_id {
            Some(user_id) => request.with_user_id(user_id),
            None => request,
        }
    }
}

pub fn run(args: RecommendArgs) -> CommandResult {
    let config = match load_config("recommend") {
        Ok(config) => config,
        Err(result) => return result,
    };
    init_logging(&config);

    let runtime = match build_runtime("recommend") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let app = bootstrap_with_config(config).await.map_err(bootstrap_failure)?;

        let outcome = app.engine.recommend(args.into_request()).await;
        app.db_pool.close().await;

        let result =
            outcome.map_err(|error| ("recommendation", error.to_string(), EXIT_RECOMMENDATION))?;
        let message = format!(
            "{} recommendations ({} primary, {} fallback, classifier mode {})",
            result.entries.len(),
            result.metadata.primary_count,
            result.metadata.fallback_count,
            format!("{:?}", result.metadata.classifier_mode).to_ascii_lowercase(),
        );
        let data = serde_json::to_value(&result)
            .map_err(|error| ("serialization", error.to_string(), EXIT_RECOMMENDATION))?;
        Ok::<(String, serde_json::Value), Failure>((message, data))
    });

    match result {
        Ok((message, data)) => CommandResult::success_with_data("recommend", message, Some(data)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("recommend", error_class, message, exit_code)
        }
    }
}

fn bootstrap_failure(error: BootstrapError) -> Failure {
    let message = error.to_string();
    match error {
        BootstrapError::Config(_) => ("config_validation", message, EXIT_CONFIG),
        BootstrapError::DatabaseConnect(_) => ("db_connectivity", message, EXIT_DATABASE),
        BootstrapError::Migration(_) => ("migration", message, EXIT_MIGRATION),
        BootstrapError::Classifier(_) => ("classifier_init", message, EXIT_RUNTIME),
    }
}
