//! Collaborator backed by an external command.
//!
//! One process per call. The request is a single JSON object on stdin,
//! tagged by `op`; the reply is a single JSON object on stdout:
//!
//! | op | reply |
//! |---|---|
//! | `suggest_events` | `{"events": [SuggestedEvent, ...]}` |
//! | `suggest_anomalies` | `{"anomalies": {"<index>": ["note", ...]}}` |
//!
//! The child is killed if the engine's timeout drops the call.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{AugmentationCollaborator, SuggestedEvent};
use crate::domain::{AugmentError, Event};

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Request<'a> {
    SuggestEvents {
        text: &'a str,
        #[serde(rename = "baseDate", skip_serializing_if = "Option::is_none")]
        base_date: Option<NaiveDate>,
    },
    SuggestAnomalies {
        events: &'a [Event],
    },
}

#[derive(Debug, Deserialize)]
struct EventsReply {
    #[serde(default)]
    events: Vec<SuggestedEvent>,
}

#[derive(Debug, Deserialize)]
struct AnomaliesReply {
    #[serde(default)]
    anomalies: BTreeMap<usize, Vec<String>>,
}

/// Runs `program args...` for every request.
#[derive(Debug, Clone)]
pub struct ProcessCollaborator {
    program: String,
    args: Vec<String>,
}

impl ProcessCollaborator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a shell-style command line on whitespace. `None` when empty.
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    async fn call(&self, request: &Request<'_>) -> Result<Vec<u8>, AugmentError> {
        let payload =
            serde_json::to_vec(request).map_err(|e| AugmentError::Failed(e.to_string()))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AugmentError::Unavailable(format!("{}: {e}", self.program)))?;

        // Written alongside the read so a chatty child cannot fill its
        // stdout pipe while we are still blocked on its stdin.
        let writer = child.stdin.take().map(|mut stdin| {
            tokio::spawn(async move { stdin.write_all(&payload).await })
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| AugmentError::Failed(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AugmentError::Failed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }
        if let Some(writer) = writer {
            match writer.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    tracing::debug!(program = %self.program, "helper replied without reading the whole request");
                }
                Ok(Err(e)) => return Err(AugmentError::Failed(format!("write request: {e}"))),
                Err(e) => return Err(AugmentError::Failed(format!("write request: {e}"))),
            }
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl AugmentationCollaborator for ProcessCollaborator {
    fn name(&self) -> &str {
        &self.program
    }

    async fn suggest_events(
        &self,
        text: &str,
        base_date: Option<NaiveDate>,
    ) -> Result<Vec<SuggestedEvent>, AugmentError> {
        let stdout = self.call(&Request::SuggestEvents { text, base_date }).await?;
        let reply: EventsReply = serde_json::from_slice(&stdout)
            .map_err(|e| AugmentError::Failed(format!("invalid events reply: {e}")))?;
        Ok(reply.events)
    }

    async fn suggest_anomalies(
        &self,
        events: &[Event],
    ) -> Result<BTreeMap<usize, Vec<String>>, AugmentError> {
        let stdout = self.call(&Request::SuggestAnomalies { events }).await?;
        let reply: AnomaliesReply = serde_json::from_slice(&stdout)
            .map_err(|e| AugmentError::Failed(format!("invalid anomalies reply: {e}")))?;
        Ok(reply.anomalies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_splits_program_and_args() {
        let c = ProcessCollaborator::from_command_line("python3 sof_nlp.py --json")
            .expect("non-empty command");
        assert_eq!(c.name(), "python3");
        assert_eq!(c.args, vec!["sof_nlp.py", "--json"]);
        assert!(ProcessCollaborator::from_command_line("   ").is_none());
    }

    #[test]
    fn requests_are_tagged_by_op() {
        let request = Request::SuggestEvents {
            text: "Vessel berthed",
            base_date: NaiveDate::from_ymd_opt(2024, 1, 10),
        };
        let value = serde_json::to_value(&request).expect("serialize request");
        assert_eq!(value["op"], "suggest_events");
        assert_eq!(value["baseDate"], "2024-01-10");

        let value =
            serde_json::to_value(Request::SuggestAnomalies { events: &[] }).expect("serialize");
        assert_eq!(value["op"], "suggest_anomalies");
        assert!(value["events"].as_array().is_some_and(|a| a.is_empty()));
    }

    #[test]
    fn anomaly_reply_accepts_string_indices() {
        let reply: AnomaliesReply =
            serde_json::from_str(r#"{"anomalies": {"0": ["late NOR"], "3": []}}"#)
                .expect("deserialize reply");
        assert_eq!(reply.anomalies[&0], vec!["late NOR"]);
        assert!(reply.anomalies[&3].is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_program_is_unavailable() {
        let c = ProcessCollaborator::new("/nonexistent/laytime-helper", Vec::new());
        let err = c
            .suggest_events("text", None)
            .await
            .expect_err("spawn should fail");
        assert!(matches!(err, AugmentError::Unavailable(_)));
    }
}
