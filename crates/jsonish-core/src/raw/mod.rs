//! The raw parser: turns LLM output text into a [`Value`] tree.
//!
//! Every strategy enabled by [`Options`] runs unconditionally - none is
//! skipped because an earlier one already produced something - and every
//! candidate they produce is combined into one [`Value::AnyOf`], left for the
//! coercer to pick from by schema fit and score. A caller that knows its
//! input is always clean JSON can still skip the tolerant machinery by
//! turning its flags off.
//!
//! Strategies:
//! 1. [`strict::parse_strict`] - the whole input is one well-formed JSON
//!    value, nothing else.
//! 2. [`markdown::extract`] (if `allow_markdown_json`) - one or more fenced
//!    code blocks, each recursively run back through this same pipeline.
//! 3. [`multi_object::scan`] (if `find_all_json_objects`) - multiple
//!    JSON-looking spans embedded in prose.
//! 4. [`fixer::parse_lenient`] (if `allow_fixes`) - the whole input, read
//!    with recovery.
//!
//! If none of the above produced a candidate and `allow_as_string` is set,
//! the raw input text is handed back verbatim as a [`Value::String`].

pub mod fixer;
pub mod markdown;
pub mod multi_object;
pub mod strict;

use crate::error::{ParseError, Reason};
use crate::options::Options;
use crate::value::{CompletionState, Value};

pub fn parse(input: &str, options: &Options) -> Result<Value, ParseError> {
    let mut candidates = Vec::new();

    if let Ok(value) = strict::parse_strict(input) {
        candidates.push(value);
    }

    if options.allow_markdown_json {
        if let Some(found) = markdown::extract(input, options) {
            candidates.extend(found);
        }
    }

    if options.find_all_json_objects {
        if let Some(found) = multi_object::scan(input, options) {
            candidates.extend(found);
        }
    }

    if options.allow_fixes {
        if let Some((value, fixes)) = fixer::parse_lenient(input) {
            candidates.push(if fixes.is_empty() { value } else { Value::fixed_json(value, fixes) });
        }
    }

    if candidates.is_empty() {
        if options.allow_as_string {
            return Ok(Value::String(input.to_string(), CompletionState::Complete));
        }
        return Err(ParseError::new(Reason::NoCandidate, "no raw-parser strategy produced a value"));
    }

    Ok(Value::any_of(candidates, "raw_parser"))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every candidate in an (optionally nested) `AnyOf` satisfies `pred`; a
    /// bare value satisfies it directly. Used because strict JSON always
    /// reparses cleanly under the fixer too, so a clean input legitimately
    /// yields several structurally-equivalent candidates, not one bare value.
    fn all_candidates_match(value: &Value, pred: impl Fn(&Value) -> bool + Copy) -> bool {
        match value {
            Value::AnyOf(cands, _) => cands.iter().all(|c| all_candidates_match(c, pred)),
            other => pred(other),
        }
    }

    #[test]
    fn clean_json_takes_the_strict_path() {
        let options = Options::default();
        let value = parse(r#"{"a": 1}"#, &options).unwrap();
        assert!(all_candidates_match(&value, |v| matches!(
            v,
            Value::Object(_, CompletionState::Complete)
        )));
    }

    #[test]
    fn sloppy_json_is_recovered_by_the_fixer() {
        let options = Options::default();
        let value = parse("{name: 'Ada', active: true,}", &options).unwrap();
        assert!(all_candidates_match(&value, |v| match v {
            Value::FixedJson(inner, fixes) => matches!(**inner, Value::Object(_, _)) && !fixes.is_empty(),
            _ => false,
        }));
    }

    #[test]
    fn embedded_fenced_json_is_extracted() {
        let options = Options::default();
        let text = "Sure, here it is:\n```json\n{\"ok\": true}\n```";
        let value = parse(text, &options).unwrap();
        assert!(all_candidates_match(&value, |v| matches!(v, Value::Markdown(_, _, _))));
    }

    #[test]
    fn multiple_bare_objects_in_prose_become_any_of() {
        let options = Options::default();
        let text = r#"one: {"a": 1} two: {"b": 2}"#;
        let value = parse(text, &options).unwrap();
        match value {
            Value::AnyOf(cands, origin) => {
                // Two individual FixedJson spans plus one Array(all) aggregate.
                assert_eq!(cands.len(), 3);
                assert_eq!(origin, "raw_parser");
            }
            other => panic!("expected AnyOf, got {other:?}"),
        }
    }

    #[test]
    fn prose_with_no_json_falls_back_to_string() {
        let options = Options::default();
        let value = parse("there is no json in here at all", &options).unwrap();
        assert!(matches!(value, Value::String(_, CompletionState::Complete)));
    }

    #[test]
    fn disabling_everything_but_strict_fails_on_sloppy_input() {
        let mut options = Options::default();
        options.allow_markdown_json = false;
        options.find_all_json_objects = false;
        options.allow_fixes = false;
        options.allow_as_string = false;
        let err = parse("{a: 1}", &options).unwrap_err();
        assert_eq!(err.reason, Reason::NoCandidate);
    }

    #[test]
    fn literal_null_is_not_confused_with_a_failed_fix() {
        let options = Options::default();
        let value = parse("null", &options).unwrap();
        assert!(all_candidates_match(&value, |v| matches!(v, Value::Null)));
    }
}
