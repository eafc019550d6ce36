use chrono::Utc;
use clap::Args;

use rately_core::config::{AppConfig, LoadOptions};
use rately_core::domain::lookup::{ConfidenceLevel, EffortLevel};
use rately_core::estimation::{EstimationCatalog, QuoteAdjustments, QuoteEngine};
use rately_core::workflow::ApprovalWorkflow;
use rately_db::repositories::{
    ApprovalRepository, CalculationRuleRepository, EffortLevelRepository, QuoteRepository,
    RateProfileRepository, SqlApprovalRepository, SqlCatalogRepository, SqlQuoteRepository,
};
use rately_db::{connect_with_settings, migrations};

use crate::commands::estimate::{
    classify_domain_error, parse_decimal_arg, QuotePayload, TicketArgs,
};
use crate::commands::CommandResult;

#[derive(Debug, Args)]
pub struct ReviseArgs {
    #[command(flatten)]
    pub ticket: TicketArgs,
    #[arg(long, help = "low | medium | high")]
    pub effort_level: Option<String>,
    #[arg(long)]
    pub hours_min: Option<String>,
    #[arg(long)]
    pub hours_max: Option<String>,
    #[arg(long)]
    pub fixed_cost: Option<String>,
    #[arg(long)]
    pub confidence: Option<String>,
    #[arg(long, help = "Override the resolution-time midpoint, in hours")]
    pub resolution_time: Option<String>,
}

fn build_adjustments(args: &ReviseArgs) -> Result<QuoteAdjustments, String> {
    Ok(QuoteAdjustments {
        effort_level: args
            .effort_level
            .as_deref()
            .map(EffortLevel::from_stable_key)
            .transpose()
            .map_err(|e| e.to_string())?,
        estimated_hours_minimum: args
            .hours_min
            .as_deref()
            .map(|raw| parse_decimal_arg("hours-min", raw))
            .transpose()?,
        estimated_hours_maximum: args
            .hours_max
            .as_deref()
            .map(|raw| parse_decimal_arg("hours-max", raw))
            .transpose()?,
        fixed_cost: args
            .fixed_cost
            .as_deref()
            .map(|raw| parse_decimal_arg("fixed-cost", raw))
            .transpose()?,
        confidence_level: args
            .confidence
            .as_deref()
            .map(ConfidenceLevel::from_stable_key)
            .transpose()
            .map_err(|e| e.to_string())?,
        resolution_time_override: args
            .resolution_time
            .as_deref()
            .map(|raw| parse_decimal_arg("resolution-time", raw))
            .transpose()?,
    })
}

pub fn run(args: ReviseArgs) -> CommandResult {
    let ticket = match args.ticket.to_record() {
        Ok(ticket) => ticket,
        Err(message) => return CommandResult::failure("revise", "invalid_argument", message, 2),
    };
    let adjustments = match build_adjustments(&args) {
        Ok(adjustments) => adjustments,
        Err(message) => return CommandResult::failure("revise", "invalid_argument", message, 2),
    };

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "revise",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "revise",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let catalog_repo = SqlCatalogRepository::new(pool.clone());
        let quote_repo = SqlQuoteRepository::new(pool.clone());
        let approval_repo = SqlApprovalRepository::new(pool.clone());

        let prior = quote_repo
            .find_latest(&ticket.id)
            .await
            .map_err(|error| ("repository", error.to_string(), 5u8))?
            .ok_or_else(|| {
                ("not_found", format!("no quote exists for ticket `{}`", ticket.id.0), 6u8)
            })?;

        let rate_profiles = catalog_repo
            .list_rate_profiles()
            .await
            .map_err(|error| ("repository", error.to_string(), 5u8))?;
        let calculation_rules = catalog_repo
            .list_calculation_rules()
            .await
            .map_err(|error| ("repository", error.to_string(), 5u8))?;
        let effort_levels = catalog_repo
            .list_effort_levels()
            .await
            .map_err(|error| ("repository", error.to_string(), 5u8))?;
        let catalog = EstimationCatalog {
            rate_profiles: &rate_profiles,
            calculation_rules: &calculation_rules,
            effort_levels: &effort_levels,
        };

        let engine = QuoteEngine::default();
        let outcome = engine
            .revise_quote(&catalog, &ticket, &prior, &adjustments, Utc::now())
            .map_err(|error| {
                let (class, code) = classify_domain_error(&error);
                (class, error.to_string(), code)
            })?;

        let mut quote = quote_repo
            .insert_quote(outcome.quote.clone())
            .await
            .map_err(|error| ("repository", error.to_string(), 5u8))?;

        let workflow = ApprovalWorkflow;
        let approval = workflow.open(quote.id.clone());
        approval_repo
            .save(approval.clone())
            .await
            .map_err(|error| ("repository", error.to_string(), 5u8))?;
        quote.attach_approval(approval.id.clone()).map_err(|error| {
            let (class, code) = classify_domain_error(&error);
            (class, error.to_string(), code)
        })?;
        quote_repo
            .update_quote(&quote)
            .await
            .map_err(|error| ("repository", error.to_string(), 5u8))?;

        pool.close().await;
        Ok::<QuotePayload, (&'static str, String, u8)>(QuotePayload {
            command: "revise",
            status: "ok",
            quote_id: quote.id.0.clone(),
            ticket_id: quote.ticket_id.0.clone(),
            version: quote.version,
            approval_id: approval.id.0,
            effort_level: quote.effort_level.stable_key(),
            estimated_hours_minimum: quote.estimated_hours_minimum,
            estimated_hours_maximum: quote.estimated_hours_maximum,
            estimated_resolution_time: quote.estimated_resolution_time,
            hourly_rate: quote.hourly_rate,
            estimated_cost: quote.estimated_cost,
            suggested_priority: quote.suggested_priority.stable_key(),
            matched_rule: outcome.suggestion.rule_name,
            rate_profile: outcome.rate_profile_name,
        })
    });

    match result {
        Ok(payload) => CommandResult::payload(&payload),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("revise", error_class, message, exit_code)
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn ticket_args() -> TicketArgs {
        TicketArgs {
            ticket_id: "t-1".to_string(),
            ticket_type: "support".to_string(),
            severity: "low".to_string(),
            impact: "critical".to_string(),
            users_impacted: 40,
            organization: None,
            user: "cli-user".to_string(),
        }
    }

    #[test]
    fn unset_flags_leave_adjustments_empty() {
        let args = ReviseArgs {
            ticket: ticket_args(),
            effort_level: None,
            hours_min: None,
            hours_max: None,
            fixed_cost: None,
            confidence: None,
            resolution_time: None,
        };

        assert_eq!(build_adjustments(&args).expect("empty"), QuoteAdjustments::default());
    }

    #[test]
    fn set_flags_parse_into_typed_adjustments() {
        let args = ReviseArgs {
            ticket: ticket_args(),
            effort_level: Some("high".to_string()),
            hours_min: None,
            hours_max: Some("40".to_string()),
            fixed_cost: Some("25.50".to_string()),
            confidence: None,
            resolution_time: None,
        };

        let adjustments = build_adjustments(&args).expect("valid");
        assert_eq!(adjustments.effort_level, Some(EffortLevel::High));
        assert_eq!(adjustments.estimated_hours_maximum, Some(Decimal::new(40, 0)));
        assert_eq!(adjustments.fixed_cost, Some(Decimal::new(2550, 2)));
    }
}
