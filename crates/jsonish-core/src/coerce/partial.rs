//! Best-effort handling for streamed/truncated (`Incomplete`) values.
//!
//! `options.allow_partial` controls two things: whether an `Incomplete`
//! value is accepted at all (see `check_completion` in the parent module),
//! and - once accepted - whether a required field missing only because the
//! input was cut off before it appeared should default to `Null` instead of
//! failing the whole parse.

use crate::options::Options;
use crate::value::{CompletionState, Value};

/// True when `value` was truncated mid-container and `allow_partial` is on -
/// i.e. a missing required field here is explained by truncation, not by the
/// source genuinely omitting it.
pub fn truncated_container(value: &Value, options: &Options) -> bool {
    options.allow_partial && value.completion() == CompletionState::Incomplete
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::CompletionState::{Complete, Incomplete};
    use serde_json::Number;

    #[test]
    fn truncated_requires_both_incomplete_and_allow_partial() {
        let mut options = Options::default();
        let incomplete = Value::Object(vec![], Incomplete);
        assert!(!truncated_container(&incomplete, &options));
        options.allow_partial = true;
        assert!(truncated_container(&incomplete, &options));
        let complete = Value::Number(Number::from(1), Complete);
        assert!(!truncated_container(&complete, &options));
    }
}
