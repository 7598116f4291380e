//! Message surface consumed by UIs.
//!
//! Commands arrive as `{"action": "...", "data": {...}}` and every one
//! answers with a [`Response`], never an error.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::challenge::Difficulty;
use crate::error::Result;
use crate::session::{BlockingService, StartRequest, StopReason};

/// A UI command.
///
/// `data` may be omitted or `null` for every command; commands without a
/// payload ignore whatever `data` carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "action",
    content = "data",
    rename_all = "camelCase",
    try_from = "RawCommand"
)]
pub enum Command {
    StartBlocking(StartRequest),
    StopBlocking,
    GetBlockingState,
    GenerateMathChallenge { difficulty: Option<Difficulty> },
    SubmitMathAnswer { raw: String },
    GetMathChallengeState,
    AddDistractionNote { text: String },
}

#[derive(Deserialize)]
struct RawCommand {
    action: String,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
struct ChallengeRequest {
    #[serde(default)]
    difficulty: Option<Difficulty>,
}

#[derive(Deserialize)]
struct AnswerRequest {
    #[serde(alias = "answer")]
    raw: String,
}

#[derive(Deserialize)]
struct NoteRequest {
    text: String,
}

impl TryFrom<RawCommand> for Command {
    type Error = String;

    fn try_from(raw: RawCommand) -> std::result::Result<Self, Self::Error> {
        let data = raw.data;
        let command = match raw.action.as_str() {
            "startBlocking" => Command::StartBlocking(payload(data)?),
            "stopBlocking" => Command::StopBlocking,
            "getBlockingState" => Command::GetBlockingState,
            "generateMathChallenge" => {
                let request: ChallengeRequest = payload(data)?;
                Command::GenerateMathChallenge {
                    difficulty: request.difficulty,
                }
            }
            "submitMathAnswer" => {
                let request: AnswerRequest = payload(data)?;
                Command::SubmitMathAnswer { raw: request.raw }
            }
            "getMathChallengeState" => Command::GetMathChallengeState,
            "addDistractionNote" => {
                let request: NoteRequest = payload(data)?;
                Command::AddDistractionNote { text: request.text }
            }
            other => return Err(format!("unknown action `{other}`")),
        };
        Ok(command)
    }
}

/// Decode a command payload; a missing payload reads as `{}`.
fn payload<T: DeserializeOwned>(data: Value) -> std::result::Result<T, String> {
    let data = match data {
        Value::Null => Value::Object(Default::default()),
        data => data,
    };
    serde_json::from_value(data).map_err(|e| e.to_string())
}

/// Discriminated command result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Run `command` against `service`.
pub fn dispatch(service: &BlockingService, command: Command) -> Response {
    let result = match command {
        Command::StartBlocking(request) => service.start(request).and_then(to_value),
        Command::StopBlocking => service.stop(StopReason::Manual).and_then(to_value),
        Command::GetBlockingState => service.get_state().and_then(to_value),
        Command::GenerateMathChallenge { difficulty } => {
            service.generate_challenge(difficulty).and_then(to_value)
        }
        Command::SubmitMathAnswer { raw } => service.submit_answer(&raw).and_then(to_value),
        Command::GetMathChallengeState => service.challenge_state().and_then(to_value),
        Command::AddDistractionNote { text } => service.add_note(&text).and_then(to_value),
    };

    match result {
        Ok(data) => Response::ok(data),
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            Response::err(e.to_string())
        }
    }
}

/// Parse a raw JSON command and dispatch it. Malformed input is reported as
/// a failed response.
pub fn dispatch_json(service: &BlockingService, raw: &str) -> Response {
    match serde_json::from_str::<Command>(raw) {
        Ok(command) => dispatch(service, command),
        Err(e) => Response::err(format!("Invalid command: {e}")),
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::rules::{RuleProgrammer, StoredRuleSet};
    use crate::session::PendingAlarms;
    use crate::storage::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    fn service() -> BlockingService {
        let store = Arc::new(MemoryStore::new());
        BlockingService::new(
            store.clone(),
            RuleProgrammer::new(Arc::new(StoredRuleSet::new(store, 5000)), "siteblock://blocked"),
            Arc::new(PendingAlarms::new()),
            Arc::new(ManualClock::new(1_000)),
        )
    }

    fn send(service: &BlockingService, command: Value) -> Response {
        dispatch_json(service, &command.to_string())
    }

    #[test]
    fn parses_wire_format() {
        let cmd: Command = serde_json::from_value(json!({
            "action": "startBlocking",
            "data": {"sites": ["a.com"], "durationMinutes": 5}
        }))
        .unwrap();
        assert_eq!(
            cmd,
            Command::StartBlocking(StartRequest {
                sites: vec!["a.com".into()],
                duration_minutes: 5,
                profile_id: None,
            })
        );

        let cmd: Command = serde_json::from_value(json!({"action": "stopBlocking"})).unwrap();
        assert_eq!(cmd, Command::StopBlocking);

        let cmd: Command = serde_json::from_value(json!({
            "action": "submitMathAnswer",
            "data": {"answer": "42"}
        }))
        .unwrap();
        assert_eq!(cmd, Command::SubmitMathAnswer { raw: "42".into() });
    }

    #[test]
    fn start_then_get_state() {
        let service = service();
        let response = send(
            &service,
            json!({"action": "startBlocking", "data": {"sites": ["www.x.com/"], "durationMinutes": 1}}),
        );
        assert!(response.success, "{response:?}");

        let response = send(&service, json!({"action": "getBlockingState"}));
        let data = response.data.unwrap();
        assert_eq!(data["active"], json!(true));
        assert_eq!(data["blockedSites"], json!(["x.com"]));
        assert_eq!(data["endTimestamp"], json!(61_000));
    }

    #[test]
    fn validation_failures_are_responses() {
        let service = service();
        let response = send(
            &service,
            json!({"action": "startBlocking", "data": {"sites": ["a.com"], "durationMinutes": 0}}),
        );
        assert!(!response.success);
        assert!(response.error.unwrap().contains("greater than zero"));

        let response = send(&service, json!({"action": "submitMathAnswer", "data": {"raw": "5"}}));
        assert_eq!(response.error.as_deref(), Some("No active math challenge"));
    }

    #[test]
    fn malformed_command_is_a_failed_response() {
        let service = service();
        let response = dispatch_json(&service, r#"{"action": "launchRockets"}"#);
        assert!(!response.success);
        let error = response.error.unwrap();
        assert!(error.starts_with("Invalid command"), "{error}");
        assert!(error.contains("launchRockets"), "{error}");

        let response = send(&service, json!({"action": "addDistractionNote"}));
        assert!(response.error.unwrap().starts_with("Invalid command"));

        let response = dispatch_json(&service, "not json");
        assert!(response.error.unwrap().starts_with("Invalid command"));
    }

    #[test]
    fn data_is_optional_and_ignored_by_unit_commands() {
        let service = service();
        send(
            &service,
            json!({"action": "startBlocking", "data": {"sites": ["a.com"], "durationMinutes": 30}}),
        );
        service.set_difficulty(Difficulty::Hard).unwrap();

        let response = send(&service, json!({"action": "generateMathChallenge"}));
        assert!(response.success, "{response:?}");
        assert_eq!(response.data.unwrap()["problems"].as_array().unwrap().len(), 7);

        let response = send(&service, json!({"action": "generateMathChallenge", "data": null}));
        assert!(response.success, "{response:?}");

        for action in ["getBlockingState", "getMathChallengeState"] {
            let response = send(&service, json!({"action": action, "data": {}}));
            assert!(response.success, "{action}: {response:?}");
        }

        let response = send(&service, json!({"action": "stopBlocking", "data": {"force": true}}));
        assert!(response.success, "{response:?}");
        assert!(!service.get_state().unwrap().active);
    }

    #[test]
    fn challenge_round_trip_through_commands() {
        let service = service();
        send(
            &service,
            json!({"action": "startBlocking", "data": {"sites": ["a.com"], "durationMinutes": 30}}),
        );
        let response = send(
            &service,
            json!({"action": "generateMathChallenge", "data": {"difficulty": "easy"}}),
        );
        let problems = response.data.unwrap()["problems"].as_array().unwrap().clone();
        assert_eq!(problems.len(), 3);

        for problem in &problems {
            let answer = problem["answer"].as_i64().unwrap().to_string();
            let response = send(&service, json!({"action": "submitMathAnswer", "data": {"raw": answer}}));
            assert!(response.success);
        }

        let state = send(&service, json!({"action": "getBlockingState"})).data.unwrap();
        assert_eq!(state["active"], json!(false));
        let challenge = send(&service, json!({"action": "getMathChallengeState"}));
        assert_eq!(challenge.data, Some(Value::Null));
    }

    #[test]
    fn add_note_command() {
        let service = service();
        let response = send(&service, json!({"action": "addDistractionNote", "data": {"text": "news"}}));
        assert_eq!(response.data.unwrap()["note"], json!("news"));

        let response = send(&service, json!({"action": "addDistractionNote", "data": {"text": "  "}}));
        assert!(!response.success);
    }
}
