use chrono::Utc;
use clap::Args;
use serde::Serialize;

use rately_core::config::{AppConfig, LoadOptions};
use rately_core::domain::approval::ApprovalId;
use rately_core::domain::ticket::UserId;
use rately_core::workflow::{ApprovalDecision, ApprovalWorkflow, Capability, Principal};
use rately_db::repositories::{ApprovalRepository, SqlApprovalRepository};
use rately_db::{connect_with_settings, migrations};

use crate::commands::estimate::classify_domain_error;
use crate::commands::CommandResult;

#[derive(Debug, Args)]
pub struct DecideArgs {
    #[arg(long)]
    pub approval_id: String,
    #[arg(long, help = "approve | reject")]
    pub decision: String,
    #[arg(long)]
    pub comment: Option<String>,
    #[arg(long)]
    pub user: String,
    #[arg(long, help = "Role of the deciding user; must hold the approver role")]
    pub role: String,
}

#[derive(Debug, Serialize)]
struct DecidePayload {
    command: &'static str,
    status: &'static str,
    approval_id: String,
    quote_id: String,
    approval_status: &'static str,
    decided_by: String,
}

pub fn run(args: DecideArgs) -> CommandResult {
    let decision = match args.decision.as_str() {
        "approve" => ApprovalDecision::Approve,
        "reject" => ApprovalDecision::Reject,
        other => {
            return CommandResult::failure(
                "decide",
                "invalid_argument",
                format!("--decision must be approve or reject, got `{other}`"),
                2,
            );
        }
    };

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "decide",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    // The configured approver role is the only role granted the decide
    // capability from the CLI.
    let capabilities = if args.role == config.quoting.approver_role {
        vec![Capability::DecideQuotes]
    } else {
        Vec::new()
    };
    let principal =
        Principal { user_id: UserId(args.user.clone()), role: args.role.clone(), capabilities };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "decide",
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

        let approval_repo = SqlApprovalRepository::new(pool.clone());
        let approval = approval_repo
            .find_by_id(&ApprovalId(args.approval_id.clone()))
            .await
            .map_err(|error| ("repository", error.to_string(), 5u8))?
            .ok_or_else(|| {
                ("not_found", format!("no approval with id `{}`", args.approval_id), 6u8)
            })?;

        let workflow = ApprovalWorkflow;
        let decided = workflow
            .transition(&approval, decision, args.comment.clone(), &principal, Utc::now())
            .map_err(|error| {
                let (class, code) = classify_domain_error(&error);
                (class, error.to_string(), code)
            })?;
        approval_repo
            .save(decided.clone())
            .await
            .map_err(|error| ("repository", error.to_string(), 5u8))?;

        pool.close().await;
        Ok::<DecidePayload, (&'static str, String, u8)>(DecidePayload {
            command: "decide",
            status: "ok",
            approval_id: decided.id.0.clone(),
            quote_id: decided.quote_id.0.clone(),
            approval_status: decided.status.stable_key(),
            decided_by: args.user,
        })
    });

    match result {
        Ok(payload) => CommandResult::payload(&payload),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("decide", error_class, message, exit_code)
        }
    }
}
