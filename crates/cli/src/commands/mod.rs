pub mod decide;
pub mod doctor;
pub mod estimate;
pub mod migrate;
pub mod revise;
pub mod seed;

use serde::Serialize;

/// Outcome of one CLI invocation: the process exit code plus the JSON
/// already rendered for stdout.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

/// Status envelope for commands without a richer payload and for every
/// failure. `error_class` is absent on success so scripts can key off it.
#[derive(Debug, Serialize)]
struct StatusReport<'a> {
    command: &'a str,
    status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_class: Option<&'a str>,
    message: &'a str,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            exit_code: 0,
            output: render(&StatusReport {
                command,
                status: "ok",
                error_class: None,
                message: &message,
            }),
        }
    }

    /// Success carrying a typed payload, pretty-printed for operators.
    pub fn payload<T: Serialize>(payload: &T) -> Self {
        Self {
            exit_code: 0,
            output: serde_json::to_string_pretty(payload)
                .unwrap_or_else(|error| error.to_string()),
        }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let message = message.into();
        Self {
            exit_code,
            output: render(&StatusReport {
                command,
                status: "error",
                error_class: Some(error_class),
                message: &message,
            }),
        }
    }
}

fn render(report: &StatusReport<'_>) -> String {
    serde_json::to_string(report).unwrap_or_else(|error| {
        format!(
            r#"{{"status":"error","error_class":"serialization","message":"{}"}}"#,
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
