//! Scans free-form text for multiple embedded JSON-ish objects/arrays (e.g.
//! a model emitting "Sure, here's the first one: {...} and the second:
//! [...]") rather than one value occupying the whole input.

use crate::options::Options;
use crate::value::{Fix, Value};

use super::strict;

pub fn scan(input: &str, options: &Options) -> Option<Vec<Value>> {
    let chars: Vec<char> = input.chars().collect();
    let mut spans = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '{' || chars[i] == '[' {
            if let Ok((value, _fixes, end)) = strict::parse_from(&chars, i, options.allow_fixes) {
                spans.push(value);
                i = end.max(i + 1);
                continue;
            }
        }
        i += 1;
    }
    if spans.len() < 2 {
        return None;
    }
    let mut candidates: Vec<Value> =
        spans.iter().cloned().map(|v| Value::fixed_json(v, vec![Fix::GreppedForJson])).collect();
    candidates.push(Value::Array(spans, crate::value::CompletionState::Complete));
    Some(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_two_separate_json_objects_in_prose() {
        let options = Options::default();
        let text = r#"First record: {"a": 1} then a second one: {"b": 2}"#;
        let candidates = scan(text, &options).unwrap();
        // Two individual FixedJson candidates plus one Array(all) aggregate.
        assert_eq!(candidates.len(), 3);
        assert!(candidates.iter().any(|v| matches!(v, Value::Array(items, _) if items.len() == 2)));
    }

    #[test]
    fn single_object_does_not_trigger_multi_object_mode() {
        let options = Options::default();
        let candidates = scan(r#"{"a": 1}"#, &options);
        assert!(candidates.is_none());
    }
}
