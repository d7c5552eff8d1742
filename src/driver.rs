//! JSON-lines console driver.
//!
//! Stands in for the presentation layer: one command object per input line,
//! one reply object per output line. Commands are tagged by `op`:
//!
//! ```text
//! {"op": "choose", "mode": "identified"}
//! {"op": "edit", "edit": {"field": "category", "value": "harassment"}}
//! {"op": "submit"}   {"op": "wait"}   {"op": "retry"}   {"op": "cancel"}
//! {"op": "back"}     {"op": "reset"}  {"op": "abandon"} {"op": "state"}
//! {"op": "receipts"} {"op": "modes"}  {"op": "categories"}
//! ```
//!
//! Replies are `{"state": ..., "can_submit": ...}`, a listing, or
//! `{"error": {"code", "message", "retryable"}}`. A bad line produces an
//! error reply and the loop keeps going.

use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

use crate::controller::WizardController;
use crate::error::{ErrorCode, WizardError};
use crate::report::{FieldEdit, IncidentCategory, ReportMode};
use crate::wizard::WizardState;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    Choose { mode: ReportMode },
    Edit { edit: FieldEdit },
    Submit,
    /// Block until the in-flight submission settles.
    Wait,
    Retry,
    Cancel,
    Back,
    Reset,
    Abandon,
    State,
    Receipts,
    Modes,
    Categories,
}

#[derive(Debug, thiserror::Error)]
enum DriverError {
    #[error("unreadable command: {0}")]
    BadCommand(String),
    #[error(transparent)]
    Wizard(#[from] WizardError),
}

impl ErrorCode for DriverError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::BadCommand(_) => "E_BAD_COMMAND",
            Self::Wizard(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::BadCommand(_) => false,
            Self::Wizard(e) => e.retryable(),
        }
    }
}

/// Read commands from `reader` until EOF, writing one reply line each.
///
/// # Errors
///
/// Returns I/O errors from reading or writing; command errors are reported
/// in-band.
pub async fn run<R, W>(controller: &WizardController, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let reply = handle_line(controller, line).await;
        writer.write_all(reply.to_string().as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}

async fn handle_line(controller: &WizardController, line: &str) -> Value {
    let outcome = match serde_json::from_str::<Command>(line) {
        Ok(command) => execute(controller, command).await,
        Err(e) => Err(DriverError::BadCommand(e.to_string())),
    };
    outcome.unwrap_or_else(|e| {
        warn!(code = e.error_code(), error = %e, "command failed");
        error_reply(&e)
    })
}

async fn execute(controller: &WizardController, command: Command) -> Result<Value, DriverError> {
    let state = match command {
        Command::Choose { mode } => controller.choose_mode(mode)?,
        Command::Edit { edit } => controller.edit(edit)?,
        Command::Submit => {
            controller.submit()?;
            controller.state()
        }
        Command::Retry => {
            controller.retry()?;
            controller.state()
        }
        Command::Wait => controller.wait_until_settled().await,
        Command::Cancel => controller.cancel()?,
        Command::Back => controller.back()?,
        Command::Reset => controller.reset()?,
        Command::Abandon => controller.abandon(),
        Command::State => controller.state(),
        Command::Receipts => return Ok(json!({ "receipts": controller.receipts() })),
        Command::Modes => return Ok(modes_listing()),
        Command::Categories => return Ok(categories_listing()),
    };
    Ok(state_reply(&state))
}

fn state_reply(state: &WizardState) -> Value {
    let mut reply = json!({ "state": state, "can_submit": state.can_submit() });
    if let WizardState::Failed { error, .. } = state {
        reply["retryable"] = Value::Bool(error.retryable());
    }
    reply
}

fn error_reply(err: &impl ErrorCode) -> Value {
    json!({
        "error": {
            "code": err.error_code(),
            "message": err.to_string(),
            "retryable": err.retryable(),
        }
    })
}

fn modes_listing() -> Value {
    let modes: Vec<Value> = ReportMode::ALL
        .iter()
        .map(|mode| {
            json!({
                "mode": mode,
                "label": mode.label(),
                "description": mode.description(),
                "highlights": mode.highlights(),
            })
        })
        .collect();
    json!({ "modes": modes })
}

fn categories_listing() -> Value {
    let categories: Vec<Value> = IncidentCategory::ALL
        .iter()
        .map(|category| json!({ "category": category, "label": category.label() }))
        .collect();
    json!({ "categories": categories })
}

#[cfg(test)]
#[path = "driver_test.rs"]
mod tests;
