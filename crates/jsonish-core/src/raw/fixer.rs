//! The lenient entry point into [`super::strict`]'s shared grammar: same
//! parser, `lenient = true`, returning the recovered value plus the list of
//! fixes applied along the way. Returns `None` when even the lenient grammar
//! cannot make sense of the first token - callers fall back further (grep for
//! embedded JSON, or treat the input as an opaque string).

use crate::value::{Fix, Value};

use super::strict;

pub fn parse_lenient(input: &str) -> Option<(Value, Vec<Fix>)> {
    let chars: Vec<char> = input.chars().collect();
    strict::parse_from(&chars, 0, true).ok().map(|(value, fixes, _end)| (value, fixes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::CompletionState;

    #[test]
    fn recovers_unquoted_keys_and_single_quotes() {
        let (value, fixes) = parse_lenient("{name: 'Ada', active: true,}").unwrap();
        assert_eq!(value.completion(), CompletionState::Complete);
        assert!(!fixes.is_empty());
    }

    #[test]
    fn gives_up_on_pure_punctuation() {
        assert!(parse_lenient("!!!").is_none());
    }
}
