//! Result payload written to stdout, and the matching exit status.

use serde::Serialize;

use crate::reconciler::Outcome;

/// Exit status for a failed run.
pub const EXIT_FAILED: u8 = 1;
/// Exit status for a change when detailed exit codes are requested.
pub const EXIT_CHANGED: u8 = 2;

#[derive(Debug, Serialize)]
struct Failure<'a> {
    failed: bool,
    msg: &'a str,
}

/// JSON document for a successful run.
pub fn success_payload(outcome: &Outcome) -> serde_json::Result<String> {
    serde_json::to_string_pretty(outcome)
}

/// JSON document for a failed run.
pub fn failure_payload(msg: &str) -> String {
    // A struct of a bool and a str always serializes.
    serde_json::to_string_pretty(&Failure { failed: true, msg }).unwrap_or_default()
}

/// Exit status for a successful run.
pub fn exit_status(outcome: &Outcome, detailed: bool) -> u8 {
    if detailed && outcome.changed {
        EXIT_CHANGED
    } else {
        0
    }
}
