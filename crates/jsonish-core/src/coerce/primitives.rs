//! Primitive coercers.
//!
//! Each function returns the coerced JSON payload plus the flags it had to
//! record to get there. `lax` gates every cross-kind rule at once: when
//! `false` (Union Phase 1, or `options.coerce_primitives = false`), only an
//! exact kind match succeeds.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Number, Value as JsonValue};

use crate::error::{ParseError, Reason};
use crate::value::Value;

use super::scoring::Flag;

type PrimResult = Result<(JsonValue, Vec<Flag>), ParseError>;

fn fail(reason: Reason, detail: impl Into<String>) -> ParseError {
    ParseError::new(reason, detail)
}

/// Strip the normalisations applied before parsing a numeric string:
/// surrounding whitespace, a leading `$`, a trailing `%`, and thousands
/// separators.
fn normalize_numeric_text(s: &str) -> String {
    let s = s.trim();
    let s = s.strip_prefix('$').unwrap_or(s);
    let s = s.strip_suffix('%').unwrap_or(s);
    s.replace(',', "")
}

/// Split `"a/b"` into `(a, b)` if both sides are plain integers.
fn as_fraction(s: &str) -> Option<(i64, i64)> {
    let (num, den) = s.split_once('/')?;
    let num: i64 = num.trim().parse().ok()?;
    let den: i64 = den.trim().parse().ok()?;
    Some((num, den))
}

/// Round-half-to-even (banker's rounding), used for `FloatToInt`.
pub fn round_half_even(n: f64) -> i64 {
    let floor = n.floor();
    let diff = n - floor;
    let floor_i = floor as i64;
    if diff < 0.5 {
        floor_i
    } else if diff > 0.5 {
        floor_i + 1
    } else if floor_i % 2 == 0 {
        floor_i
    } else {
        floor_i + 1
    }
}

fn number_is_integral(n: &Number) -> bool {
    n.is_i64() || n.is_u64() || {
        let text = n.to_string();
        !text.contains('.') && !text.contains(['e', 'E'])
    }
}

pub fn coerce_string(value: &Value, lax: bool) -> PrimResult {
    match value {
        Value::String(s, _) => Ok((JsonValue::String(s.clone()), vec![])),
        Value::Number(n, _) if lax => Ok((JsonValue::String(n.to_string()), vec![Flag::NumberToString])),
        Value::Bool(b) if lax => Ok((
            JsonValue::String(if *b { "true" } else { "false" }.to_string()),
            vec![Flag::BoolToString],
        )),
        other => Err(fail(
            Reason::TypeMismatch,
            format!("cannot coerce {other:?} to string"),
        )),
    }
}

pub fn coerce_int(value: &Value, lax: bool) -> PrimResult {
    match value {
        Value::Number(n, _) if number_is_integral(n) => Ok((JsonValue::Number(n.clone()), vec![])),
        Value::Number(n, _) if lax => {
            let f = n.as_f64().ok_or_else(|| {
                fail(Reason::UnparseableNumber, format!("number {n} has no f64 representation"))
            })?;
            Ok((JsonValue::Number(Number::from(round_half_even(f))), vec![Flag::FloatToInt]))
        }
        Value::String(s, _) if lax => {
            let normalized = normalize_numeric_text(s);
            let normalized = normalized.strip_prefix('+').unwrap_or(&normalized);
            if let Ok(i) = normalized.parse::<i64>() {
                return Ok((JsonValue::Number(Number::from(i)), vec![Flag::StringToInt]));
            }
            if let Some((num, den)) = as_fraction(&normalized) {
                if den != 0 && num % den == 0 {
                    return Ok((JsonValue::Number(Number::from(num / den)), vec![Flag::StringToInt]));
                }
            }
            Err(fail(Reason::UnparseableNumber, format!("cannot parse \"{s}\" as int")))
        }
        Value::Bool(b) if lax => Ok((JsonValue::Number(Number::from(if *b { 1 } else { 0 })), vec![Flag::BoolToInt])),
        other => Err(fail(Reason::TypeMismatch, format!("cannot coerce {other:?} to int"))),
    }
}

pub fn coerce_float(value: &Value, lax: bool) -> PrimResult {
    match value {
        Value::Number(n, _) if !number_is_integral(n) => {
            let f = n
                .as_f64()
                .ok_or_else(|| fail(Reason::UnparseableNumber, format!("number {n} has no f64 representation")))?;
            Ok((json_f64(f)?, vec![]))
        }
        Value::Number(n, _) => Ok((JsonValue::Number(n.clone()), vec![])),
        Value::String(s, _) if lax => {
            let normalized = normalize_numeric_text(s);
            let normalized = normalized.strip_prefix('+').unwrap_or(&normalized);
            if let Some((num, den)) = as_fraction(&normalized) {
                if den != 0 {
                    return Ok((json_f64(num as f64 / den as f64)?, vec![Flag::StringToFloat]));
                }
            }
            if let Ok(f) = normalized.parse::<f64>() {
                return Ok((json_f64(f)?, vec![Flag::StringToFloat]));
            }
            Err(fail(Reason::UnparseableNumber, format!("cannot parse \"{s}\" as float")))
        }
        Value::Bool(b) if lax => Ok((json_f64(if *b { 1.0 } else { 0.0 })?, vec![Flag::BoolToFloat])),
        other => Err(fail(Reason::TypeMismatch, format!("cannot coerce {other:?} to float"))),
    }
}

fn json_f64(f: f64) -> Result<JsonValue, ParseError> {
    Number::from_f64(f)
        .map(JsonValue::Number)
        .ok_or_else(|| fail(Reason::UnparseableNumber, format!("{f} is not a finite number")))
}

fn true_false_word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(true|false)\b").unwrap())
}

pub fn coerce_bool(value: &Value, lax: bool) -> PrimResult {
    match value {
        Value::Bool(b) => Ok((JsonValue::Bool(*b), vec![])),
        Value::String(s, _) if lax => {
            let trimmed = s.trim().to_ascii_lowercase();
            match trimmed.as_str() {
                "true" | "yes" | "y" | "on" => Ok((JsonValue::Bool(true), vec![Flag::StringToBool])),
                "false" | "no" | "n" | "off" => Ok((JsonValue::Bool(false), vec![Flag::StringToBool])),
                _ => {
                    let matches: Vec<&str> = true_false_word_regex()
                        .find_iter(s)
                        .map(|m| m.as_str())
                        .collect();
                    let has_true = matches.iter().any(|m| m.eq_ignore_ascii_case("true"));
                    let has_false = matches.iter().any(|m| m.eq_ignore_ascii_case("false"));
                    match (has_true, has_false) {
                        (true, false) => Ok((JsonValue::Bool(true), vec![Flag::StringToBool])),
                        (false, true) => Ok((JsonValue::Bool(false), vec![Flag::StringToBool])),
                        (true, true) => Err(fail(
                            Reason::AmbiguousBoolean,
                            format!("both \"true\" and \"false\" appear in \"{s}\""),
                        )),
                        (false, false) => {
                            Err(fail(Reason::TypeMismatch, format!("no boolean word found in \"{s}\"")))
                        }
                    }
                }
            }
        }
        Value::Number(n, _) if lax => {
            let is_zero = n.as_f64().map(|f| f == 0.0).unwrap_or(false);
            Ok((JsonValue::Bool(!is_zero), vec![Flag::NumberToBool]))
        }
        other => Err(fail(Reason::TypeMismatch, format!("cannot coerce {other:?} to bool"))),
    }
}

pub fn coerce_null(value: &Value, lax: bool) -> PrimResult {
    match value {
        Value::Null => Ok((JsonValue::Null, vec![])),
        Value::String(s, _) if lax && (s.eq_ignore_ascii_case("null") || s.is_empty()) => {
            Ok((JsonValue::Null, vec![Flag::StringToNull]))
        }
        other => Err(fail(Reason::TypeMismatch, format!("cannot coerce {other:?} to null"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::CompletionState::Complete;
    use pretty_assertions::assert_eq;

    #[test]
    fn string_from_number_flags_number_to_string() {
        let v = Value::Number(Number::from(42), Complete);
        let (payload, flags) = coerce_string(&v, true).unwrap();
        assert_eq!(payload, JsonValue::String("42".into()));
        assert_eq!(flags, vec![Flag::NumberToString]);
    }

    #[test]
    fn string_from_number_fails_strict() {
        let v = Value::Number(Number::from(42), Complete);
        assert!(coerce_string(&v, false).is_err());
    }

    #[test]
    fn int_from_currency_string() {
        let v = Value::String("$3,200".into(), Complete);
        let (payload, flags) = coerce_int(&v, true).unwrap();
        assert_eq!(payload, JsonValue::Number(Number::from(3200)));
        assert_eq!(flags, vec![Flag::StringToInt]);
    }

    #[test]
    fn int_from_exact_fraction() {
        let v = Value::String("10/5".into(), Complete);
        let (payload, _) = coerce_int(&v, true).unwrap();
        assert_eq!(payload, JsonValue::Number(Number::from(2)));
    }

    #[test]
    fn int_from_inexact_fraction_fails() {
        let v = Value::String("1/5".into(), Complete);
        assert!(coerce_int(&v, true).is_err());
    }

    #[test]
    fn float_from_exact_fraction() {
        let v = Value::String("1/5".into(), Complete);
        let (payload, flags) = coerce_float(&v, true).unwrap();
        assert_eq!(payload.as_f64().unwrap(), 0.2);
        assert_eq!(flags, vec![Flag::StringToFloat]);
    }

    #[test]
    fn float_from_percentage() {
        let v = Value::String("42%".into(), Complete);
        let (payload, _) = coerce_float(&v, true).unwrap();
        assert_eq!(payload.as_f64().unwrap(), 42.0);
    }

    #[test]
    fn round_half_even_ties_to_even() {
        assert_eq!(round_half_even(2.5), 2);
        assert_eq!(round_half_even(3.5), 4);
        assert_eq!(round_half_even(2.4), 2);
        assert_eq!(round_half_even(2.6), 3);
    }

    #[test]
    fn bool_from_yes_no_words() {
        assert_eq!(
            coerce_bool(&Value::String("yes".into(), Complete), true).unwrap().0,
            JsonValue::Bool(true)
        );
        assert_eq!(
            coerce_bool(&Value::String("off".into(), Complete), true).unwrap().0,
            JsonValue::Bool(false)
        );
    }

    #[test]
    fn bool_embedded_in_prose_single_match() {
        let v = Value::String("The answer is true, I promise".into(), Complete);
        let (payload, flags) = coerce_bool(&v, true).unwrap();
        assert_eq!(payload, JsonValue::Bool(true));
        assert_eq!(flags, vec![Flag::StringToBool]);
    }

    #[test]
    fn bool_ambiguous_when_both_words_present() {
        let v = Value::String("true or false, who knows".into(), Complete);
        let err = coerce_bool(&v, true).unwrap_err();
        assert_eq!(err.reason, Reason::AmbiguousBoolean);
    }

    #[test]
    fn null_from_empty_string() {
        let v = Value::String("".into(), Complete);
        let (payload, flags) = coerce_null(&v, true).unwrap();
        assert_eq!(payload, JsonValue::Null);
        assert_eq!(flags, vec![Flag::StringToNull]);
    }
}
