//! The Value intermediate representation.
//!
//! `Value` is the tagged tree produced by the raw parser and consumed by the
//! coercer. It is immutable after construction; every "fix" or "merge"
//! produces a new node rather than mutating in place.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde_json::Number;

/// Whether a container's terminator was observed in the source.
///
/// A container is `Complete` iff every child is `Complete` *and* its own
/// terminator (`}`, `]`, closing quote, ...) was seen; otherwise
/// `Incomplete`. Scalars are `Complete` unless they were truncated mid-token
/// (e.g. an unterminated string at end of input).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
    Complete,
    Incomplete,
}

impl CompletionState {
    /// Combine a container's own terminator state with its children: the
    /// container is complete only if every child is complete AND its own
    /// terminator was observed.
    pub fn of_container(own_terminator_seen: bool, children: &[CompletionState]) -> Self {
        if own_terminator_seen && children.iter().all(|c| *c == CompletionState::Complete) {
            CompletionState::Complete
        } else {
            CompletionState::Incomplete
        }
    }
}

/// A single recovery step applied by the fixing state machine, recorded on
/// the enclosing [`Value::FixedJson`] node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fix {
    GreppedForJson,
    ClosedString,
    InferredComma,
    InferredBrace,
    InferredBracket,
    DroppedComment,
    StrippedQuote,
    TripleQuoteUnwrap,
    OtherRecovery(String),
}

/// The raw-parser intermediate representation.
///
/// Object entries are kept as an ordered `Vec` rather than a map: source
/// order must be preserved and duplicate keys must be retained until the
/// coercer (which alone knows the target schema) decides how to merge them.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number, CompletionState),
    String(String, CompletionState),
    Array(Vec<Value>, CompletionState),
    Object(Vec<(String, Value)>, CompletionState),
    /// A fenced Markdown code block: `tag` is the token after the opening
    /// fence (possibly empty), `inner` is the recursively-parsed body.
    Markdown(String, Box<Value>, CompletionState),
    /// Records recovery steps applied while producing `inner`.
    FixedJson(Box<Value>, Vec<Fix>),
    /// Multiple viable interpretations of the same span of input; `origin`
    /// names the strategy that produced the candidate set (for diagnostics).
    AnyOf(Vec<Value>, String),
}

/// A structural digest of a `Value`, used as half of the cycle-detection key
/// `(SchemaId, ValueFingerprint)` in [`crate::coerce::Context`].
///
/// This digests shape and scalar content, not source position — two
/// identical literals *are* the same fingerprint. Correctness of cycle
/// detection therefore does not come from the fingerprint being
/// position-unique (it isn't); it comes from `Context` scoping visited pairs
/// to the *active* recursion chain (push on entry, pop on exit) rather than
/// a whole-call accumulation, so two unrelated sibling values with equal
/// content never collide. See `DESIGN.md` for the rationale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueFingerprint(u64);

impl Value {
    /// Build an `AnyOf`, flattening any nested `AnyOf` candidates so the
    /// invariant "`AnyOf` never nests directly inside `AnyOf`" holds by
    /// construction.
    pub fn any_of(candidates: Vec<Value>, origin: impl Into<String>) -> Value {
        let mut flat = Vec::with_capacity(candidates.len());
        for c in candidates {
            match c {
                Value::AnyOf(inner, _) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            return flat.into_iter().next().unwrap();
        }
        Value::AnyOf(flat, origin.into())
    }

    /// Wrap `inner` in `FixedJson`, merging fix lists rather than nesting
    /// when `inner` is itself already `FixedJson`.
    pub fn fixed_json(inner: Value, mut fixes: Vec<Fix>) -> Value {
        match inner {
            Value::FixedJson(boxed_inner, mut existing) => {
                existing.append(&mut fixes);
                Value::FixedJson(boxed_inner, existing)
            }
            other => Value::FixedJson(Box::new(other), fixes),
        }
    }

    pub fn completion(&self) -> CompletionState {
        match self {
            Value::Null | Value::Bool(_) => CompletionState::Complete,
            Value::Number(_, c) | Value::String(_, c) => *c,
            Value::Array(_, c) | Value::Object(_, c) | Value::Markdown(_, _, c) => *c,
            Value::FixedJson(inner, _) => inner.completion(),
            Value::AnyOf(cands, _) => {
                if cands.iter().all(|c| c.completion() == CompletionState::Complete) {
                    CompletionState::Complete
                } else {
                    CompletionState::Incomplete
                }
            }
        }
    }

    /// When the object has repeated keys, decide what to do with the later
    /// occurrences. The decision of *whether* to array-lift is deferred to
    /// the coercer (it alone knows the target field's schema); this just
    /// exposes the grouped occurrences for that decision.
    ///
    /// Returns a `Vec` of `(key, occurrences)` in first-seen key order.
    pub fn group_duplicate_keys(entries: &[(String, Value)]) -> Vec<(&str, Vec<&Value>)> {
        let mut order: Vec<&str> = Vec::new();
        let mut grouped: std::collections::HashMap<&str, Vec<&Value>> =
            std::collections::HashMap::new();
        for (k, v) in entries {
            if !grouped.contains_key(k.as_str()) {
                order.push(k.as_str());
            }
            grouped.entry(k.as_str()).or_default().push(v);
        }
        order
            .into_iter()
            .map(|k| (k, grouped.remove(k).unwrap()))
            .collect()
    }

    /// Shape-and-scalars digest, used for cycle detection.
    pub fn fingerprint(&self) -> ValueFingerprint {
        let mut hasher = DefaultHasher::new();
        fingerprint_into(self, &mut hasher);
        ValueFingerprint(hasher.finish())
    }
}

fn fingerprint_into(value: &Value, hasher: &mut DefaultHasher) {
    match value {
        Value::Null => 0u8.hash(hasher),
        Value::Bool(b) => {
            1u8.hash(hasher);
            b.hash(hasher);
        }
        Value::Number(n, _) => {
            2u8.hash(hasher);
            n.to_string().hash(hasher);
        }
        Value::String(s, _) => {
            3u8.hash(hasher);
            s.hash(hasher);
        }
        Value::Array(items, _) => {
            4u8.hash(hasher);
            items.len().hash(hasher);
            for item in items {
                fingerprint_into(item, hasher);
            }
        }
        Value::Object(entries, _) => {
            5u8.hash(hasher);
            entries.len().hash(hasher);
            for (k, v) in entries {
                k.hash(hasher);
                fingerprint_into(v, hasher);
            }
        }
        Value::Markdown(tag, inner, _) => {
            6u8.hash(hasher);
            tag.hash(hasher);
            fingerprint_into(inner, hasher);
        }
        Value::FixedJson(inner, _) => {
            7u8.hash(hasher);
            fingerprint_into(inner, hasher);
        }
        Value::AnyOf(cands, _) => {
            8u8.hash(hasher);
            cands.len().hash(hasher);
            for c in cands {
                fingerprint_into(c, hasher);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn any_of_flattens_nested_candidates() {
        let v = Value::any_of(
            vec![
                Value::Null,
                Value::any_of(vec![Value::Bool(true), Value::Bool(false)], "inner"),
            ],
            "outer",
        );
        match v {
            Value::AnyOf(cands, _) => assert_eq!(cands.len(), 3),
            other => panic!("expected AnyOf, got {:?}", other),
        }
    }

    #[test]
    fn any_of_of_one_collapses() {
        let v = Value::any_of(vec![Value::Null], "origin");
        assert!(matches!(v, Value::Null));
    }

    #[test]
    fn fixed_json_merges_fix_lists_instead_of_nesting() {
        let inner = Value::fixed_json(Value::Null, vec![Fix::InferredComma]);
        let outer = Value::fixed_json(inner, vec![Fix::InferredBrace]);
        match outer {
            Value::FixedJson(boxed, fixes) => {
                assert!(matches!(*boxed, Value::Null));
                assert_eq!(fixes, vec![Fix::InferredComma, Fix::InferredBrace]);
            }
            other => panic!("expected FixedJson, got {:?}", other),
        }
    }

    #[test]
    fn fingerprint_equal_for_structurally_equal_values() {
        let a = Value::Object(
            vec![("x".to_string(), Value::Number(Number::from(1), CompletionState::Complete))],
            CompletionState::Complete,
        );
        let b = Value::Object(
            vec![("x".to_string(), Value::Number(Number::from(1), CompletionState::Complete))],
            CompletionState::Complete,
        );
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_differs_on_different_content() {
        let a = Value::String("a".into(), CompletionState::Complete);
        let b = Value::String("b".into(), CompletionState::Complete);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn group_duplicate_keys_preserves_first_seen_order() {
        let entries = vec![
            ("a".to_string(), Value::Null),
            ("b".to_string(), Value::Bool(true)),
            ("a".to_string(), Value::Bool(false)),
        ];
        let grouped = Value::group_duplicate_keys(&entries);
        assert_eq!(grouped[0].0, "a");
        assert_eq!(grouped[0].1.len(), 2);
        assert_eq!(grouped[1].0, "b");
    }
}
