//! Remote report-mode toggle
//!
//! Posts a GraphQL mutation switching the remote service between report
//! modes before a run. The remote schema varies across deployments, so the
//! client negotiates: it cycles through decreasingly ambitious response
//! selections when the service rejects a queried field, and drops flag
//! arguments the service does not recognize, restarting the selection cycle
//! with the reduced payload. It always resolves to a structured outcome;
//! report generation is never gated on it.

use crate::config::ToggleConfig;
use crate::error::{ReportSrvError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};
use trackscan_core::AddressingMode;

pub const FLAG_ENABLE_TTID: &str = "enableTtid";
pub const FLAG_ENABLE_MODBUS_SORTING: &str = "enableModbusSorting";

/// Response selections, decreasingly ambitious. The last is an empty
/// selection set for deployments whose mutation returns a scalar.
const SELECTION_SHAPES: [&str; 4] = [
    "{ __typename enableTtid enableModbusSorting }",
    "{ __typename enableTtid }",
    "{ __typename }",
    "",
];

/// Outer payload cycles before giving up
const MAX_CYCLES: usize = 6;

/// Report mode requested for a run
///
/// Also decides the addressing convention for network controllers: the
/// TTID report addresses them 1-based at unit 100, the legacy (position)
/// variants 0-based at unit 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportMode {
    #[default]
    Ttid,
    LegacySorted,
    LegacyUnsorted,
}

impl ReportMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportMode::Ttid => "ttid",
            ReportMode::LegacySorted => "legacy-sorted",
            ReportMode::LegacyUnsorted => "legacy-unsorted",
        }
    }

    pub fn addressing(self) -> AddressingMode {
        match self {
            ReportMode::Ttid => AddressingMode::Ttid,
            ReportMode::LegacySorted | ReportMode::LegacyUnsorted => AddressingMode::Position,
        }
    }

    /// Flag pair sent to the remote service for this mode
    fn flags(self) -> Vec<(&'static str, bool)> {
        match self {
            ReportMode::Ttid => vec![(FLAG_ENABLE_TTID, true), (FLAG_ENABLE_MODBUS_SORTING, true)],
            ReportMode::LegacySorted => {
                vec![(FLAG_ENABLE_TTID, false), (FLAG_ENABLE_MODBUS_SORTING, true)]
            }
            ReportMode::LegacyUnsorted => {
                vec![(FLAG_ENABLE_TTID, false), (FLAG_ENABLE_MODBUS_SORTING, false)]
            }
        }
    }
}

impl fmt::Display for ReportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportMode {
    type Err = ReportSrvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ttid" => Ok(ReportMode::Ttid),
            "legacy-sorted" => Ok(ReportMode::LegacySorted),
            "legacy-unsorted" => Ok(ReportMode::LegacyUnsorted),
            other => Err(ReportSrvError::config(format!(
                "unknown report mode '{}'",
                other
            ))),
        }
    }
}

/// How a toggle run ended; never an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// A mutation went through; names the flags actually sent
    Applied { flags: Vec<&'static str> },
    /// The service recognized none of the flags
    SkippedUnsupported,
    /// Attempt budget spent without a clean response
    SkippedExhausted,
}

/// Transport seam: post one GraphQL document, return the response body
///
/// `Err` is a transport failure (connect, timeout, HTTP status); GraphQL
/// application errors come back inside the `Ok` body.
#[async_trait]
pub trait GraphqlTransport {
    async fn post(&self, query: &str) -> std::result::Result<Value, String>;
}

/// Production transport: reqwest POST with optional bearer token
pub struct GraphqlClient {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl GraphqlClient {
    pub fn new(config: &ToggleConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ReportSrvError::config(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            url: config.url.clone(),
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl GraphqlTransport for GraphqlClient {
    async fn post(&self, query: &str) -> std::result::Result<Value, String> {
        let mut request = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "query": query }));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        // An aborted/timed-out request surfaces as a transport error here.
        let response = request.send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status));
        }
        response.json::<Value>().await.map_err(|e| e.to_string())
    }
}

/// Negotiation state
#[derive(Debug, Clone, PartialEq, Eq)]
enum ToggleState {
    TryingSelection(usize),
    ReducingPayload(&'static str),
    Applied,
    Exhausted,
}

/// One attempt's classification
enum AttemptResult {
    Accepted,
    SelectionTooWide,
    FlagRejected(&'static str),
    Failed(String),
}

/// Set the remote report mode, negotiating the request shape
pub async fn apply_report_mode<T: GraphqlTransport + ?Sized>(
    transport: &T,
    mode: ReportMode,
) -> ToggleOutcome {
    let mut flags = mode.flags();
    let mut attempts = 0usize;
    let budget = MAX_CYCLES * SELECTION_SHAPES.len();
    let mut state = ToggleState::TryingSelection(0);

    loop {
        match state {
            ToggleState::TryingSelection(shape) => {
                if attempts >= budget {
                    state = ToggleState::Exhausted;
                    continue;
                }
                attempts += 1;
                let query = build_mutation(&flags, SELECTION_SHAPES[shape]);
                debug!(attempt = attempts, shape, query = query.as_str(), "posting mode toggle");
                state = match classify(transport.post(&query).await, &flags) {
                    AttemptResult::Accepted => ToggleState::Applied,
                    AttemptResult::SelectionTooWide => {
                        if shape + 1 < SELECTION_SHAPES.len() {
                            ToggleState::TryingSelection(shape + 1)
                        } else {
                            // Even the empty selection was refused; start
                            // the cycle over until the budget runs out.
                            ToggleState::TryingSelection(0)
                        }
                    }
                    AttemptResult::FlagRejected(flag) => ToggleState::ReducingPayload(flag),
                    AttemptResult::Failed(msg) => {
                        warn!(attempt = attempts, "mode toggle attempt failed: {}", msg);
                        ToggleState::TryingSelection(shape)
                    }
                };
            }
            ToggleState::ReducingPayload(flag) => {
                info!(flag, "service rejected flag, retrying without it");
                flags.retain(|(name, _)| *name != flag);
                if flags.is_empty() {
                    return ToggleOutcome::SkippedUnsupported;
                }
                state = ToggleState::TryingSelection(0);
            }
            ToggleState::Applied => {
                let sent: Vec<&'static str> = flags.iter().map(|(name, _)| *name).collect();
                info!(mode = %mode, ?sent, "report mode applied");
                return ToggleOutcome::Applied { flags: sent };
            }
            ToggleState::Exhausted => {
                warn!(mode = %mode, attempts, "mode toggle retries exhausted");
                return ToggleOutcome::SkippedExhausted;
            }
        }
    }
}

/// Run the toggle if configured; outcome is logged, never fatal
pub async fn toggle_if_enabled(config: &ToggleConfig, mode: ReportMode) -> Option<ToggleOutcome> {
    if !config.enabled {
        debug!("mode toggle disabled, skipping");
        return None;
    }
    let client = match GraphqlClient::new(config) {
        Ok(client) => client,
        Err(err) => {
            warn!("mode toggle unavailable: {}", err);
            return None;
        }
    };
    Some(apply_report_mode(&client, mode).await)
}

fn build_mutation(flags: &[(&'static str, bool)], selection: &str) -> String {
    let args: Vec<String> = flags
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value))
        .collect();
    let call = format!("setReportMode({})", args.join(", "));
    if selection.is_empty() {
        format!("mutation {{ {} }}", call)
    } else {
        format!("mutation {{ {} {} }}", call, selection)
    }
}

/// Sort a response into the negotiation moves
///
/// Selection problems take precedence over flag problems: a response
/// complaining about a queried field restarts with a smaller selection
/// even when the message also names a flag.
fn classify(
    result: std::result::Result<Value, String>,
    flags: &[(&'static str, bool)],
) -> AttemptResult {
    let body = match result {
        Ok(body) => body,
        Err(msg) => return AttemptResult::Failed(msg),
    };
    let errors = match body.get("errors").and_then(Value::as_array) {
        Some(errors) if !errors.is_empty() => errors,
        _ => return AttemptResult::Accepted,
    };

    let mut rejected_flag = None;
    for error in errors {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let lowered = message.to_lowercase();
        if lowered.contains("cannot query field") {
            return AttemptResult::SelectionTooWide;
        }
        if rejected_flag.is_none() {
            rejected_flag = flags
                .iter()
                .map(|(name, _)| *name)
                .find(|name| message.contains(name));
        }
    }
    match rejected_flag {
        Some(flag) => AttemptResult::FlagRejected(flag),
        None => AttemptResult::Failed(format!(
            "application errors: {}",
            serde_json::to_string(errors).unwrap_or_default()
        )),
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Scripted transport: pops canned responses, records queries
    struct FakeGraphql {
        responses: Mutex<Vec<std::result::Result<Value, String>>>,
        queries: Mutex<Vec<String>>,
    }

    impl FakeGraphql {
        fn new(mut responses: Vec<std::result::Result<Value, String>>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                queries: Mutex::new(Vec::new()),
            }
        }

        fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GraphqlTransport for FakeGraphql {
        async fn post(&self, query: &str) -> std::result::Result<Value, String> {
            self.queries.lock().unwrap().push(query.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop()
                // Past the script, keep failing like a dead endpoint.
                .unwrap_or_else(|| Err("no response scripted".to_string()))
        }
    }

    fn ok_body() -> std::result::Result<Value, String> {
        Ok(json!({ "data": { "setReportMode": { "__typename": "ReportModeFlags" } } }))
    }

    fn error_body(message: &str) -> std::result::Result<Value, String> {
        Ok(json!({ "errors": [ { "message": message } ] }))
    }

    // ========== Happy path ==========

    #[tokio::test]
    async fn test_first_attempt_success_sends_both_flags() {
        let transport = FakeGraphql::new(vec![ok_body()]);
        let outcome = apply_report_mode(&transport, ReportMode::Ttid).await;
        assert_eq!(
            outcome,
            ToggleOutcome::Applied {
                flags: vec![FLAG_ENABLE_TTID, FLAG_ENABLE_MODBUS_SORTING]
            }
        );
        let queries = transport.queries();
        assert_eq!(queries.len(), 1);
        assert!(queries[0].contains("enableTtid: true"));
        assert!(queries[0].contains("enableModbusSorting: true"));
        assert!(queries[0].contains("{ __typename enableTtid enableModbusSorting }"));
    }

    #[tokio::test]
    async fn test_legacy_unsorted_sends_both_flags_false() {
        let transport = FakeGraphql::new(vec![ok_body()]);
        apply_report_mode(&transport, ReportMode::LegacyUnsorted).await;
        let queries = transport.queries();
        assert!(queries[0].contains("enableTtid: false"));
        assert!(queries[0].contains("enableModbusSorting: false"));
    }

    // ========== Selection negotiation ==========

    #[tokio::test]
    async fn test_unknown_response_field_shrinks_selection() {
        let transport = FakeGraphql::new(vec![
            error_body("Cannot query field \"enableModbusSorting\" on type \"ReportModeFlags\""),
            error_body("Cannot query field \"enableTtid\" on type \"ReportModeFlags\""),
            ok_body(),
        ]);
        let outcome = apply_report_mode(&transport, ReportMode::Ttid).await;
        assert!(matches!(outcome, ToggleOutcome::Applied { .. }));
        let queries = transport.queries();
        assert_eq!(queries.len(), 3);
        assert!(queries[1].contains("{ __typename enableTtid }"));
        assert!(queries[2].contains("{ __typename }"));
        // the payload never shrank, only the selection
        assert!(queries[2].contains("enableModbusSorting: true"));
    }

    #[tokio::test]
    async fn test_empty_selection_has_no_braces_after_call() {
        let transport = FakeGraphql::new(vec![
            error_body("Cannot query field \"enableModbusSorting\" on type \"ReportModeFlags\""),
            error_body("Cannot query field \"enableTtid\" on type \"ReportModeFlags\""),
            error_body("Cannot query field \"__typename\" on type \"ReportModeFlags\""),
            ok_body(),
        ]);
        let outcome = apply_report_mode(&transport, ReportMode::Ttid).await;
        assert!(matches!(outcome, ToggleOutcome::Applied { .. }));
        let queries = transport.queries();
        assert!(queries[3].ends_with(") }"), "{}", queries[3]);
    }

    // ========== Payload reduction ==========

    #[tokio::test]
    async fn test_rejected_flag_is_removed_and_cycle_restarts() {
        let transport = FakeGraphql::new(vec![
            error_body("Unknown field \"enableModbusSorting\" on mutation \"setReportMode\""),
            ok_body(),
        ]);
        let outcome = apply_report_mode(&transport, ReportMode::Ttid).await;
        assert_eq!(
            outcome,
            ToggleOutcome::Applied {
                flags: vec![FLAG_ENABLE_TTID]
            }
        );
        let queries = transport.queries();
        assert_eq!(queries.len(), 2);
        // the argument list omits only the rejected flag; the selection
        // shapes are fixed and restart at the widest
        assert!(queries[1].contains("setReportMode(enableTtid: true)"));
        assert!(!queries[1].contains("enableModbusSorting:"));
        assert!(queries[1].contains("{ __typename enableTtid enableModbusSorting }"));
    }

    #[tokio::test]
    async fn test_all_flags_rejected_is_skipped_unsupported() {
        let transport = FakeGraphql::new(vec![
            error_body("Unknown argument \"enableModbusSorting\""),
            error_body("Unknown argument \"enableTtid\""),
        ]);
        let outcome = apply_report_mode(&transport, ReportMode::Ttid).await;
        assert_eq!(outcome, ToggleOutcome::SkippedUnsupported);
    }

    // ========== Budget ==========

    #[tokio::test]
    async fn test_transport_errors_exhaust_the_budget() {
        let transport = FakeGraphql::new(vec![]);
        let outcome = apply_report_mode(&transport, ReportMode::Ttid).await;
        assert_eq!(outcome, ToggleOutcome::SkippedExhausted);
        // 6 outer cycles x 4 selection shapes
        assert_eq!(transport.queries().len(), 24);
    }

    // ========== Mode plumbing ==========

    #[test]
    fn test_mode_parsing_and_addressing() {
        assert_eq!("ttid".parse::<ReportMode>().unwrap(), ReportMode::Ttid);
        assert_eq!(
            "legacy-sorted".parse::<ReportMode>().unwrap(),
            ReportMode::LegacySorted
        );
        assert!("modern".parse::<ReportMode>().is_err());

        assert_eq!(ReportMode::Ttid.addressing(), AddressingMode::Ttid);
        assert_eq!(ReportMode::LegacySorted.addressing(), AddressingMode::Position);
        assert_eq!(
            ReportMode::LegacyUnsorted.addressing(),
            AddressingMode::Position
        );
    }
}
