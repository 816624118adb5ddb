//! Structural coercers: array, object, map, enum, literal, and the
//! `Optional`/`Nullable` wrappers.

use regex::Regex;
use serde_json::{Map, Value as JsonValue};

use crate::error::{ParseError, Reason};
use crate::options::OnElementError;
use crate::schema::{FieldSchema, LiteralValue, ObjectSchema, Openness, Schema, SchemaRef};
use crate::value::{CompletionState, Value};

use super::{check_completion, dispatch, partial, peel, Coerced, Context, Flag, Strictness};

fn fail(ctx: &Context, reason: Reason, detail: impl Into<String>) -> ParseError {
    ctx.error(reason, detail)
}

/// Whether `schema` resolves (through any `Lazy` wrapper) to `Enum`.
fn resolves_to_enum(schema: &SchemaRef) -> bool {
    match &**schema {
        Schema::Enum(_) => true,
        Schema::Lazy(lazy) => resolves_to_enum(&lazy.resolve()),
        _ => false,
    }
}

pub fn coerce_array(
    value: &Value,
    elem: &SchemaRef,
    ctx: &mut Context,
    strict: Strictness,
) -> Result<Coerced, ParseError> {
    check_completion(value, ctx)?;
    let value = peel(value);
    if strict.is_lax() && resolves_to_enum(elem) {
        if let Value::String(s, _) = value {
            if s.contains(',') {
                let mut payloads = Vec::new();
                let mut child_scores = Vec::new();
                let mut own_flags = vec![Flag::SplitStringToArray];
                for (i, piece) in s.split(',').enumerate() {
                    let piece_value = Value::String(piece.trim().to_string(), CompletionState::Complete);
                    ctx.push_scope(format!("[{i}]"));
                    let result = dispatch(&piece_value, elem, ctx, strict);
                    ctx.pop_scope();
                    match result {
                        Ok(c) => {
                            child_scores.push(c.score);
                            payloads.push(c.payload);
                        }
                        Err(e) => match ctx.options.on_element_error {
                            OnElementError::KeepPartial => own_flags.push(Flag::ArrayElementDropped),
                            OnElementError::FailFast => return Err(e),
                        },
                    }
                }
                return Ok(Coerced::container(JsonValue::Array(payloads), own_flags, &child_scores));
            }
        }
    }
    match value {
        Value::Array(items, _) => {
            let mut payloads = Vec::with_capacity(items.len());
            let mut child_scores = Vec::new();
            let mut own_flags = Vec::new();
            for (i, item) in items.iter().enumerate() {
                ctx.push_scope(format!("[{i}]"));
                let result = dispatch(item, elem, ctx, strict);
                ctx.pop_scope();
                match result {
                    Ok(c) => {
                        child_scores.push(c.score);
                        payloads.push(c.payload);
                    }
                    Err(e) => match ctx.options.on_element_error {
                        OnElementError::KeepPartial => own_flags.push(Flag::ArrayElementDropped),
                        OnElementError::FailFast => return Err(e),
                    },
                }
            }
            Ok(Coerced::container(JsonValue::Array(payloads), own_flags, &child_scores))
        }
        other if strict.is_lax() => {
            let coerced = dispatch(other, elem, ctx, strict)?;
            let score = coerced.score;
            Ok(Coerced::container(
                JsonValue::Array(vec![coerced.payload]),
                vec![Flag::SingleToArray],
                &[score],
            ))
        }
        other => Err(fail(ctx, Reason::TypeMismatch, format!("cannot coerce {other:?} to array"))),
    }
}

pub fn coerce_map(
    value: &Value,
    key_schema: &SchemaRef,
    val_schema: &SchemaRef,
    ctx: &mut Context,
    strict: Strictness,
) -> Result<Coerced, ParseError> {
    check_completion(value, ctx)?;
    let lax = strict.is_lax();
    let peeled = peel(value);

    let (entries, mut own_flags): (Vec<(String, Value)>, Vec<Flag>) = match peeled {
        Value::Object(entries, _) => (entries.clone(), Vec::new()),
        Value::String(s, _) if lax => match crate::raw::parse(s, &ctx.options) {
            Ok(Value::Object(entries, _)) => (entries, vec![Flag::StringToMap]),
            _ => {
                return Err(fail(
                    ctx,
                    Reason::TypeMismatch,
                    "string does not contain a JSON object for map coercion",
                ))
            }
        },
        other => return Err(fail(ctx, Reason::TypeMismatch, format!("cannot coerce {other:?} to map"))),
    };

    let mut child_scores = Vec::new();
    let mut out = Map::new();
    for (k, v) in entries {
        ctx.push_scope(k.clone());
        let key_result = dispatch(&Value::String(k.clone(), CompletionState::Complete), key_schema, ctx, strict);
        let val_result = dispatch(&v, val_schema, ctx, strict);
        ctx.pop_scope();

        let key_coerced = match key_result {
            Ok(c) => c,
            Err(e) => match ctx.options.on_element_error {
                OnElementError::KeepPartial => {
                    own_flags.push(Flag::MapKeyParseError);
                    continue;
                }
                OnElementError::FailFast => return Err(e),
            },
        };
        let val_coerced = match val_result {
            Ok(c) => c,
            Err(e) => match ctx.options.on_element_error {
                OnElementError::KeepPartial => {
                    own_flags.push(Flag::MapValueParseError);
                    continue;
                }
                OnElementError::FailFast => return Err(e),
            },
        };

        child_scores.push(key_coerced.score);
        child_scores.push(val_coerced.score);
        out.insert(json_scalar_to_key(&key_coerced.payload), val_coerced.payload);
    }

    Ok(Coerced::container(JsonValue::Object(out), own_flags, &child_scores))
}

fn json_scalar_to_key(v: &JsonValue) -> String {
    match v {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

enum FieldOutcome {
    Present { payload: JsonValue, score: u32, flags: Vec<Flag> },
    Defaulted { payload: JsonValue, flag: Flag },
    NullOptional,
    Fail(ParseError),
}

pub fn coerce_object(
    value: &Value,
    obj: &ObjectSchema,
    ctx: &mut Context,
    strict: Strictness,
) -> Result<Coerced, ParseError> {
    check_completion(value, ctx)?;
    let lax = strict.is_lax();
    let truncated = partial::truncated_container(value, &ctx.options);
    let peeled = peel(value);

    let (entries, mut own_flags): (Vec<(String, Value)>, Vec<Flag>) = match peeled {
        Value::Object(entries, _) => (entries.clone(), Vec::new()),
        Value::String(s, _) if lax => match crate::raw::parse(s, &ctx.options) {
            Ok(Value::Object(entries, _)) => (entries, vec![Flag::StringToObject]),
            _ => return implied_key(peeled, obj, ctx, strict),
        },
        other => return implied_key(other, obj, ctx, strict),
    };

    let groups = Value::group_duplicate_keys(&entries);
    let mut used = vec![false; groups.len()];
    let mut out = Map::new();
    let mut child_scores = Vec::new();

    for field in &obj.fields {
        ctx.push_scope(field.name.clone());
        let outcome = coerce_field(&groups, &mut used, field, ctx, strict, lax, truncated);
        ctx.pop_scope();
        match outcome {
            FieldOutcome::Present { payload, score, flags } => {
                child_scores.push(score);
                own_flags.extend(flags);
                out.insert(field.name.clone(), payload);
            }
            FieldOutcome::Defaulted { payload, flag } => {
                own_flags.push(flag);
                out.insert(field.name.clone(), payload);
            }
            FieldOutcome::NullOptional => {
                out.insert(field.name.clone(), JsonValue::Null);
            }
            FieldOutcome::Fail(e) => return Err(e),
        }
    }

    if matches!(obj.openness, Openness::Closed) {
        for is_used in &used {
            if !*is_used {
                own_flags.push(Flag::ExtraKey);
            }
        }
    }

    Ok(Coerced::container(JsonValue::Object(out), own_flags, &child_scores))
}

/// A non-object value against a single-field object schema is treated as the
/// value of that lone field (e.g. `"ok"` against `{ status: string }`).
fn implied_key(
    value: &Value,
    obj: &ObjectSchema,
    ctx: &mut Context,
    strict: Strictness,
) -> Result<Coerced, ParseError> {
    if strict.is_lax() && obj.fields.len() == 1 {
        let field = &obj.fields[0];
        ctx.push_scope(field.name.clone());
        let result = dispatch(value, &field.schema, ctx, strict);
        ctx.pop_scope();
        if let Ok(c) = result {
            let mut out = Map::new();
            out.insert(field.name.clone(), c.payload);
            return Ok(Coerced::container(JsonValue::Object(out), vec![Flag::ImpliedKey], &[c.score]));
        }
    }
    Err(fail(ctx, Reason::TypeMismatch, format!("cannot coerce {value:?} to object {}", obj.name)))
}

fn coerce_field(
    groups: &[(&str, Vec<&Value>)],
    used: &mut [bool],
    field: &FieldSchema,
    ctx: &mut Context,
    strict: Strictness,
    lax: bool,
    truncated: bool,
) -> FieldOutcome {
    match find_field_group(groups, used, field, lax) {
        Some((idx, occurrences, ladder_flag)) => {
            used[idx] = true;
            let is_array_field = matches!(field.schema.as_ref(), Schema::Array(_));
            let (source_value, merged) = if occurrences.len() > 1 {
                if is_array_field {
                    (
                        Value::Array(occurrences.iter().map(|v| (*v).clone()).collect(), CompletionState::Complete),
                        true,
                    )
                } else {
                    ((*occurrences.last().unwrap()).clone(), true)
                }
            } else {
                (occurrences[0].clone(), false)
            };

            match dispatch(&source_value, &field.schema, ctx, strict) {
                Ok(c) => {
                    let mut flags: Vec<Flag> = ladder_flag.into_iter().collect();
                    if merged {
                        flags.push(Flag::MergedDuplicateKeys);
                    }
                    FieldOutcome::Present { payload: c.payload, score: c.score, flags }
                }
                Err(e) => {
                    if let Some(default) = &field.default {
                        FieldOutcome::Defaulted { payload: default.clone(), flag: Flag::DefaultButHadValue }
                    } else if field.optional {
                        FieldOutcome::NullOptional
                    } else {
                        FieldOutcome::Fail(e)
                    }
                }
            }
        }
        None => {
            if let Some(default) = &field.default {
                FieldOutcome::Defaulted { payload: default.clone(), flag: Flag::DefaultFromNoValue }
            } else if field.optional || truncated {
                FieldOutcome::NullOptional
            } else {
                FieldOutcome::Fail(fail(
                    ctx,
                    Reason::MissingRequiredField,
                    format!("missing required field \"{}\"", field.name),
                ))
            }
        }
    }
}

/// The field-match ladder: exact name, then (lax only) trimmed whitespace,
/// case-insensitive, and alias matches, in that order of preference. Each
/// source key is claimed by at most one field.
fn find_field_group<'a>(
    groups: &'a [(&'a str, Vec<&'a Value>)],
    used: &[bool],
    field: &FieldSchema,
    lax: bool,
) -> Option<(usize, Vec<&'a Value>, Option<Flag>)> {
    let find = |pred: &dyn Fn(&str) -> bool| -> Option<usize> {
        (0..groups.len()).find(|&i| !used[i] && pred(groups[i].0))
    };

    let name = field.name.as_str();
    if let Some(i) = find(&|k| k == name) {
        return Some((i, groups[i].1.clone(), None));
    }
    if !lax {
        return None;
    }
    if let Some(i) = find(&|k| k.trim() == name) {
        return Some((i, groups[i].1.clone(), Some(Flag::TrimmedMatch)));
    }
    if let Some(i) = find(&|k| k.eq_ignore_ascii_case(name)) {
        return Some((i, groups[i].1.clone(), Some(Flag::CaseInsensitiveMatch)));
    }
    if !field.aliases.is_empty() {
        if let Some(i) = find(&|k| field.aliases.iter().any(|a| a.eq_ignore_ascii_case(k))) {
            return Some((i, groups[i].1.clone(), Some(Flag::AliasMatch)));
        }
    }
    None
}

pub fn coerce_enum(value: &Value, variants: &[String], lax: bool) -> Result<(JsonValue, Vec<Flag>), ParseError> {
    let peeled = peel(value);
    let s = match peeled {
        Value::String(s, _) => s,
        other => {
            return Err(ParseError::new(
                Reason::TypeMismatch,
                format!("cannot match {other:?} against an enum"),
            ))
        }
    };

    if let Some(exact) = variants.iter().find(|v| v.as_str() == s) {
        return Ok((JsonValue::String(exact.clone()), vec![]));
    }
    if !lax {
        return Err(ParseError::new(
            Reason::TypeMismatch,
            format!("\"{s}\" is not one of the enum's exact variants"),
        ));
    }

    let trimmed = s.trim();
    if let Some(exact) = variants.iter().find(|v| v.as_str() == trimmed) {
        return Ok((JsonValue::String(exact.clone()), vec![Flag::TrimmedMatch]));
    }

    let ci: Vec<&String> = variants.iter().filter(|v| v.eq_ignore_ascii_case(trimmed)).collect();
    match ci.len() {
        1 => return Ok((JsonValue::String(ci[0].clone()), vec![Flag::CaseInsensitiveMatch])),
        n if n > 1 => {
            return Err(ParseError::new(
                Reason::AmbiguousEnum,
                format!("\"{s}\" matches {n} variants case-insensitively"),
            ))
        }
        _ => {}
    }

    let stripped = strip_non_alnum(trimmed);
    let stripped_matches: Vec<&String> = variants.iter().filter(|v| strip_non_alnum(v) == stripped).collect();
    match stripped_matches.len() {
        1 => return Ok((JsonValue::String(stripped_matches[0].clone()), vec![Flag::StrippedNonAlphaNumeric])),
        n if n > 1 => {
            return Err(ParseError::new(
                Reason::AmbiguousEnum,
                format!("\"{s}\" matches {n} variants after stripping punctuation"),
            ))
        }
        _ => {}
    }

    let (de_emphasized, had_markdown) = strip_markdown_emphasis(s);
    let lowered = de_emphasized.to_lowercase();
    let substr_matches: Vec<&String> = variants.iter().filter(|v| contains_whole_word(&lowered, v)).collect();
    match substr_matches.len() {
        1 => {
            let mut flags = vec![Flag::SubstringMatch];
            if had_markdown {
                flags.push(Flag::StrippedNonAlphaNumeric);
            }
            Ok((JsonValue::String(substr_matches[0].clone()), flags))
        }
        n if n > 1 => Err(ParseError::new(
            Reason::AmbiguousEnum,
            format!("\"{s}\" contains {n} variants as substrings"),
        )),
        _ => Err(ParseError::new(Reason::TypeMismatch, format!("\"{s}\" does not match any enum variant"))),
    }
}

fn strip_non_alnum(s: &str) -> String {
    s.chars().filter(|c| c.is_alphanumeric()).collect::<String>().to_lowercase()
}

/// Drops Markdown emphasis markers (`**bold**`, `*italic*`) so a variant
/// wrapped in emphasis (e.g. `"The answer is **one**."`) still whole-word
/// matches. Returns whether any marker was actually present.
fn strip_markdown_emphasis(s: &str) -> (String, bool) {
    let had_markdown = s.contains('*');
    (s.chars().filter(|c| *c != '*').collect(), had_markdown)
}

/// Whether `variant` appears in `haystack` (both already lower-cased) as a
/// whole word, not merely as a substring of some other word.
fn contains_whole_word(haystack: &str, variant: &str) -> bool {
    if variant.is_empty() {
        return false;
    }
    let pattern = format!(r"\b{}\b", regex::escape(&variant.to_lowercase()));
    Regex::new(&pattern).map(|re| re.is_match(haystack)).unwrap_or(false)
}

pub fn coerce_literal(value: &Value, lit: &LiteralValue, lax: bool) -> Result<(JsonValue, Vec<Flag>), ParseError> {
    let peeled = peel(value);
    match lit {
        LiteralValue::String(expected) => match peeled {
            Value::String(s, _) if s == expected => Ok((JsonValue::String(s.clone()), vec![])),
            other => Err(ParseError::new(
                Reason::TypeMismatch,
                format!("{other:?} does not equal literal \"{expected}\""),
            )),
        },
        LiteralValue::Int(expected) => {
            let (payload, flags) = super::primitives::coerce_int(peeled, lax)?;
            if payload.as_i64() == Some(*expected) {
                Ok((payload, flags))
            } else {
                Err(ParseError::new(Reason::TypeMismatch, format!("does not equal literal {expected}")))
            }
        }
        LiteralValue::Bool(expected) => {
            let (payload, flags) = super::primitives::coerce_bool(peeled, lax)?;
            if payload.as_bool() == Some(*expected) {
                Ok((payload, flags))
            } else {
                Err(ParseError::new(Reason::TypeMismatch, format!("does not equal literal {expected}")))
            }
        }
    }
}

pub fn coerce_optional(
    value: &Value,
    inner: &SchemaRef,
    ctx: &mut Context,
    strict: Strictness,
) -> Result<Coerced, ParseError> {
    if matches!(peel(value), Value::Null) {
        return Ok(Coerced::leaf(JsonValue::Null, vec![Flag::OptionalFromNull]));
    }
    match dispatch(value, inner, ctx, strict) {
        Ok(inner_coerced) => {
            let score = inner_coerced.score;
            Ok(Coerced::container(inner_coerced.payload, vec![Flag::OptionalWrapper], &[score]))
        }
        Err(_) if strict.is_lax() => Ok(Coerced::leaf(JsonValue::Null, vec![Flag::OptionalDefaultFromNoValue])),
        Err(e) => Err(e),
    }
}

pub fn coerce_nullable(
    value: &Value,
    inner: &SchemaRef,
    ctx: &mut Context,
    strict: Strictness,
) -> Result<Coerced, ParseError> {
    if matches!(peel(value), Value::Null) {
        return Ok(Coerced::leaf(JsonValue::Null, vec![Flag::NullableWrapper]));
    }
    let inner_coerced = dispatch(value, inner, ctx, strict)?;
    let score = inner_coerced.score;
    Ok(Coerced::container(inner_coerced.payload, vec![Flag::NullableWrapper], &[score]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use crate::schema::Schema;
    use pretty_assertions::assert_eq;

    fn ctx() -> Context {
        Context::new(Options::default())
    }

    #[test]
    fn array_wraps_single_value_when_lax() {
        let mut c = ctx();
        let elem = Schema::Int.rc();
        let v = Value::Number(serde_json::Number::from(5), CompletionState::Complete);
        let result = coerce_array(&v, &elem, &mut c, Strictness::Lax).unwrap();
        assert_eq!(result.payload, JsonValue::Array(vec![JsonValue::Number(5.into())]));
        assert!(result.flags.contains(&Flag::SingleToArray));
    }

    #[test]
    fn array_drops_failing_elements_by_default() {
        let mut c = ctx();
        let elem = Schema::Int.rc();
        let v = Value::Array(
            vec![
                Value::Number(serde_json::Number::from(1), CompletionState::Complete),
                Value::String("not a number".into(), CompletionState::Complete),
            ],
            CompletionState::Complete,
        );
        let result = coerce_array(&v, &elem, &mut c, Strictness::Lax).unwrap();
        assert_eq!(result.payload, JsonValue::Array(vec![JsonValue::Number(1.into())]));
        assert!(result.flags.contains(&Flag::ArrayElementDropped));
    }

    #[test]
    fn object_matches_case_insensitive_and_trimmed_fields() {
        let mut c = ctx();
        let obj = ObjectSchema {
            name: "Person".into(),
            fields: vec![FieldSchema::required("name", Schema::String.rc())],
            openness: Openness::Closed,
        };
        let v = Value::Object(
            vec![(" NAME ".into(), Value::String("Ada".into(), CompletionState::Complete))],
            CompletionState::Complete,
        );
        let result = coerce_object(&v, &obj, &mut c, Strictness::Lax).unwrap();
        assert_eq!(result.payload["name"], JsonValue::String("Ada".into()));
    }

    #[test]
    fn object_missing_required_field_fails() {
        let mut c = ctx();
        let obj = ObjectSchema {
            name: "Person".into(),
            fields: vec![FieldSchema::required("name", Schema::String.rc())],
            openness: Openness::Closed,
        };
        let v = Value::Object(vec![], CompletionState::Complete);
        let err = coerce_object(&v, &obj, &mut c, Strictness::Lax).unwrap_err();
        assert_eq!(err.reason, Reason::MissingRequiredField);
    }

    #[test]
    fn object_defaults_missing_optional_field() {
        let mut c = ctx();
        let obj = ObjectSchema {
            name: "Person".into(),
            fields: vec![FieldSchema::optional("nickname", Schema::String.rc())
                .with_default(JsonValue::String("anon".into()))],
            openness: Openness::Closed,
        };
        let v = Value::Object(vec![], CompletionState::Complete);
        let result = coerce_object(&v, &obj, &mut c, Strictness::Lax).unwrap();
        assert_eq!(result.payload["nickname"], JsonValue::String("anon".into()));
        assert!(result.flags.contains(&Flag::DefaultFromNoValue));
    }

    #[test]
    fn object_implied_key_wraps_scalar_for_single_field_schema() {
        let mut c = ctx();
        let obj = ObjectSchema {
            name: "Status".into(),
            fields: vec![FieldSchema::required("status", Schema::String.rc())],
            openness: Openness::Closed,
        };
        let v = Value::String("ok".into(), CompletionState::Complete);
        let result = coerce_object(&v, &obj, &mut c, Strictness::Lax).unwrap();
        assert_eq!(result.payload["status"], JsonValue::String("ok".into()));
        assert!(result.flags.contains(&Flag::ImpliedKey));
    }

    #[test]
    fn object_merges_duplicate_keys_into_array_field() {
        let mut c = ctx();
        let obj = ObjectSchema {
            name: "Tagged".into(),
            fields: vec![FieldSchema::required("tags", Schema::Array(Schema::String.rc()).rc())],
            openness: Openness::Closed,
        };
        let v = Value::Object(
            vec![
                ("tags".into(), Value::String("a".into(), CompletionState::Complete)),
                ("tags".into(), Value::String("b".into(), CompletionState::Complete)),
            ],
            CompletionState::Complete,
        );
        let result = coerce_object(&v, &obj, &mut c, Strictness::Lax).unwrap();
        assert_eq!(
            result.payload["tags"],
            JsonValue::Array(vec![JsonValue::String("a".into()), JsonValue::String("b".into())])
        );
        assert!(result.flags.contains(&Flag::MergedDuplicateKeys));
    }

    #[test]
    fn enum_matches_substring_when_unambiguous() {
        let variants = vec!["RED".to_string(), "BLUE".to_string()];
        let v = Value::String("the color is RED here".into(), CompletionState::Complete);
        let (payload, flags) = coerce_enum(&v, &variants, true).unwrap();
        assert_eq!(payload, JsonValue::String("RED".into()));
        assert_eq!(flags, vec![Flag::SubstringMatch]);
    }

    #[test]
    fn enum_ambiguous_substring_fails() {
        let variants = vec!["RED".to_string(), "REDACTED".to_string()];
        let v = Value::String("REDACTED".into(), CompletionState::Complete);
        // Exact match on "REDACTED" wins before substring is ever considered.
        let (payload, _) = coerce_enum(&v, &variants, true).unwrap();
        assert_eq!(payload, JsonValue::String("REDACTED".into()));
    }

    #[test]
    fn literal_string_requires_exact_match() {
        let lit = LiteralValue::String("ok".into());
        let v = Value::String("OK".into(), CompletionState::Complete);
        assert!(coerce_literal(&v, &lit, true).is_err());
    }

    #[test]
    fn optional_falls_back_to_default_on_lax_mismatch() {
        let mut c = ctx();
        let inner = Schema::Int.rc();
        let v = Value::String("not an int".into(), CompletionState::Complete);
        let result = coerce_optional(&v, &inner, &mut c, Strictness::Lax).unwrap();
        assert_eq!(result.payload, JsonValue::Null);
        assert!(result.flags.contains(&Flag::OptionalDefaultFromNoValue));
    }

    #[test]
    fn nullable_propagates_inner_error() {
        let mut c = ctx();
        let inner = Schema::Int.rc();
        let v = Value::String("not an int".into(), CompletionState::Complete);
        assert!(coerce_nullable(&v, &inner, &mut c, Strictness::Lax).is_err());
    }
}
