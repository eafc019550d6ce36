use std::str::FromStr;

use chrono::Utc;
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;

use rately_core::config::{AppConfig, LoadOptions};
use rately_core::domain::lookup::{
    BusinessImpact, ConfidenceLevel, EffortLevel, QuoteCreator, Severity, TicketType,
};
use rately_core::domain::ticket::{OrganizationId, TicketId, TicketRecord, UserId};
use rately_core::errors::{DomainError, ErrorKind};
use rately_core::estimation::{CreateQuoteRequest, EstimationCatalog, QuoteEngine};
use rately_core::workflow::ApprovalWorkflow;
use rately_db::repositories::{
    ApprovalRepository, CalculationRuleRepository, EffortLevelRepository, QuoteRepository,
    RateProfileRepository, SqlApprovalRepository, SqlCatalogRepository, SqlQuoteRepository,
};
use rately_db::{connect_with_settings, migrations};

use crate::commands::CommandResult;

/// Ticket classification shared by the estimate and revise commands.
#[derive(Debug, Args)]
pub struct TicketArgs {
    #[arg(long)]
    pub ticket_id: String,
    #[arg(long, help = "incident | support | maintenance | installation")]
    pub ticket_type: String,
    #[arg(long, help = "low | medium | high | critical")]
    pub severity: String,
    #[arg(long, help = "low | medium | high | critical")]
    pub impact: String,
    #[arg(long)]
    pub users_impacted: u32,
    #[arg(long)]
    pub organization: Option<String>,
    #[arg(long, default_value = "cli-user")]
    pub user: String,
}

impl TicketArgs {
    pub fn to_record(&self) -> Result<TicketRecord, String> {
        Ok(TicketRecord {
            id: TicketId(self.ticket_id.clone()),
            ticket_type: TicketType::from_stable_key(&self.ticket_type)
                .map_err(|e| e.to_string())?,
            severity: Severity::from_stable_key(&self.severity).map_err(|e| e.to_string())?,
            impact: BusinessImpact::from_stable_key(&self.impact).map_err(|e| e.to_string())?,
            users_impacted: self.users_impacted,
            organization_id: self.organization.clone().map(OrganizationId),
            creator_user_id: UserId(self.user.clone()),
        })
    }
}

#[derive(Debug, Args)]
pub struct EstimateArgs {
    #[command(flatten)]
    pub ticket: TicketArgs,
    #[arg(long, help = "low | medium | high")]
    pub effort_level: String,
    #[arg(long)]
    pub hours_min: String,
    #[arg(long)]
    pub hours_max: String,
    #[arg(long)]
    pub fixed_cost: Option<String>,
    #[arg(long, default_value = "medium")]
    pub confidence: String,
    #[arg(long, help = "Override the resolution-time midpoint, in hours")]
    pub resolution_time: Option<String>,
    #[arg(long, default_value = "technician", help = "system | technician | administrator")]
    pub created_by: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuotePayload {
    pub command: &'static str,
    pub status: &'static str,
    pub quote_id: String,
    pub ticket_id: String,
    pub version: u32,
    pub approval_id: String,
    pub effort_level: &'static str,
    pub estimated_hours_minimum: Decimal,
    pub estimated_hours_maximum: Decimal,
    pub estimated_resolution_time: Decimal,
    pub hourly_rate: Decimal,
    pub estimated_cost: Decimal,
    pub suggested_priority: &'static str,
    pub matched_rule: String,
    pub rate_profile: String,
}

pub(crate) fn classify_domain_error(error: &DomainError) -> (&'static str, u8) {
    match error.kind() {
        ErrorKind::ConfigurationGap => ("configuration_gap", 6),
        ErrorKind::InvalidTransition => ("invalid_transition", 7),
        ErrorKind::ConstraintViolation => ("constraint_violation", 2),
    }
}

pub(crate) fn parse_decimal_arg(name: &str, raw: &str) -> Result<Decimal, String> {
    Decimal::from_str(raw).map_err(|e| format!("--{name}: {e}"))
}

pub fn run(args: EstimateArgs) -> CommandResult {
    let ticket = match args.ticket.to_record() {
        Ok(ticket) => ticket,
        Err(message) => return CommandResult::failure("estimate", "invalid_argument", message, 2),
    };
    let request = match build_request(&args, ticket) {
        Ok(request) => request,
        Err(message) => return CommandResult::failure("estimate", "invalid_argument", message, 2),
    };

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "estimate",
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
                "estimate",
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
        let outcome = engine.create_quote(&catalog, &request).map_err(|error| {
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
            command: "estimate",
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
            CommandResult::failure("estimate", error_class, message, exit_code)
        }
    }
}

fn build_request(args: &EstimateArgs, ticket: TicketRecord) -> Result<CreateQuoteRequest, String> {
    Ok(CreateQuoteRequest {
        ticket,
        effort_level: EffortLevel::from_stable_key(&args.effort_level)
            .map_err(|e| e.to_string())?,
        estimated_hours_minimum: parse_decimal_arg("hours-min", &args.hours_min)?,
        estimated_hours_maximum: parse_decimal_arg("hours-max", &args.hours_max)?,
        fixed_cost: args
            .fixed_cost
            .as_deref()
            .map(|raw| parse_decimal_arg("fixed-cost", raw))
            .transpose()?,
        confidence_level: ConfidenceLevel::from_stable_key(&args.confidence)
            .map_err(|e| e.to_string())?,
        created_by: QuoteCreator::from_stable_key(&args.created_by).map_err(|e| e.to_string())?,
        resolution_time_override: args
            .resolution_time
            .as_deref()
            .map(|raw| parse_decimal_arg("resolution-time", raw))
            .transpose()?,
        at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_args_reject_unknown_severity() {
        let args = TicketArgs {
            ticket_id: "t-1".to_string(),
            ticket_type: "support".to_string(),
            severity: "catastrophic".to_string(),
            impact: "critical".to_string(),
            users_impacted: 40,
            organization: None,
            user: "cli-user".to_string(),
        };

        let error = args.to_record().expect_err("unknown severity");
        assert!(error.contains("catastrophic"));
    }

    #[test]
    fn decimal_args_carry_the_flag_name_in_errors() {
        let error = parse_decimal_arg("hours-min", "four").expect_err("not a number");
        assert!(error.starts_with("--hours-min"));
    }
}
