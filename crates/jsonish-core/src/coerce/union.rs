//! Union resolution: try every arm strictly before trying any arm laxly, and
//! break score ties in favor of composite arms, then non-null results, then
//! declaration order.

use crate::error::{ParseError, Reason};
use crate::schema::{DiscriminatedUnionSchema, Schema, SchemaRef};
use crate::value::Value;

use super::{dispatch, peel, Coerced, Context, Flag, Strictness};

fn is_composite(schema: &SchemaRef) -> bool {
    matches!(
        schema.as_ref(),
        Schema::Object(_) | Schema::Array(_) | Schema::Map(_, _) | Schema::DiscriminatedUnion(_) | Schema::Union(_)
    )
}

/// Try every arm under one strictness level; return the lowest-scoring
/// success (ties broken composite-over-primitive, non-null-over-null,
/// earlier-declared-over-later) alongside every arm's failure.
fn try_phase(
    value: &Value,
    arms: &[SchemaRef],
    ctx: &mut Context,
    strict: Strictness,
) -> (Option<Coerced>, Vec<ParseError>) {
    let mut candidates: Vec<(usize, bool, Coerced)> = Vec::new();
    let mut causes = Vec::new();
    for (i, arm) in arms.iter().enumerate() {
        ctx.enter_union_arm();
        let result = dispatch(value, arm, ctx, strict);
        ctx.exit_union_arm();
        match result {
            Ok(c) => candidates.push((i, is_composite(arm), c)),
            Err(e) => causes.push(e),
        }
    }
    let best = candidates
        .into_iter()
        .min_by_key(|(i, composite, c)| {
            let composite_rank: u8 = if *composite { 0 } else { 1 };
            let null_rank: u8 = if c.payload.is_null() { 1 } else { 0 };
            (c.score, composite_rank, null_rank, *i)
        })
        .map(|(_, _, c)| c);
    (best, causes)
}

pub fn resolve(value: &Value, arms: &[SchemaRef], ctx: &mut Context) -> Result<Coerced, ParseError> {
    let (phase1, _) = try_phase(value, arms, ctx, Strictness::Strict);
    if let Some(mut best) = phase1 {
        best.flags.push(Flag::UnionMatch);
        return Ok(best);
    }

    // Every arm already failed to try-cast; re-attempt laxly and report
    // those failures (the phase 1 causes are redundant - a stricter failure
    // implies the corresponding lax attempt was the real verdict).
    let (phase2, causes) = try_phase(value, arms, ctx, Strictness::Lax);
    if let Some(mut best) = phase2 {
        best.flags.push(Flag::UnionMatch);
        return Ok(best);
    }

    Err(ctx.error(Reason::NoMatchingUnionArm, "no union arm matched").with_causes(causes))
}

/// Exact-tag fast path: if the discriminant field's value names a known
/// variant, coerce against that variant alone. Otherwise fall back to
/// resolving the variants as an ordinary union.
pub fn resolve_discriminated(
    value: &Value,
    du: &DiscriminatedUnionSchema,
    ctx: &mut Context,
) -> Result<Coerced, ParseError> {
    if let Value::Object(entries, _) = peel(value) {
        if let Some((_, tag_value)) = entries.iter().find(|(k, _)| k == &du.tag) {
            if let Value::String(tag, _) = peel(tag_value) {
                if let Some((_, schema)) = du.variants.iter().find(|(name, _)| name == tag) {
                    // Tag match is only a fast path, not a guarantee - the matched
                    // arm still has to try-cast under Phase 1. If it can't, fall
                    // through to ordinary union resolution over every arm rather
                    // than hard-failing on the tag's pick alone.
                    ctx.enter_union_arm();
                    let attempt = dispatch(value, schema, ctx, Strictness::Strict);
                    ctx.exit_union_arm();
                    if let Ok(mut result) = attempt {
                        result.flags.push(Flag::UnionMatch);
                        return Ok(result);
                    }
                }
            }
        }
    }
    let arms: Vec<SchemaRef> = du.variants.iter().map(|(_, s)| s.clone()).collect();
    resolve(value, &arms, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use crate::schema::FieldSchema;
    use crate::value::CompletionState::Complete;
    use serde_json::Value as JsonValue;

    fn ctx() -> Context {
        Context::new(Options::default())
    }

    #[test]
    fn strict_pass_beats_lax_fallback() {
        let mut c = ctx();
        let arms = vec![Schema::Int.rc(), Schema::String.rc()];
        let v = Value::String("42".into(), Complete);
        // "42" try-casts cleanly to String but only lax-coerces to Int; the
        // strict string match should win over a would-be lax int match.
        let result = resolve(&v, &arms, &mut c).unwrap();
        assert_eq!(result.payload, JsonValue::String("42".into()));
    }

    #[test]
    fn earlier_declared_arm_wins_a_genuine_score_tie() {
        let mut c = ctx();
        let first = Schema::object("First", vec![]).rc();
        let second = Schema::object("Second", vec![]).rc();
        let arms = vec![first, second];
        let v = Value::Object(vec![], Complete);
        let (best, _) = try_phase(&v, &arms, &mut c, Strictness::Lax);
        // Both arms match an empty object with zero flags; declaration order breaks the tie.
        assert_eq!(best.unwrap().score, 0);
    }

    #[test]
    fn no_matching_arm_collects_causes() {
        let mut c = ctx();
        let arms = vec![Schema::Int.rc(), Schema::Bool.rc()];
        let v = Value::Object(vec![], Complete);
        let err = resolve(&v, &arms, &mut c).unwrap_err();
        assert_eq!(err.reason, Reason::NoMatchingUnionArm);
        assert_eq!(err.causes.len(), 2);
    }

    #[test]
    fn discriminated_union_exact_tag_short_circuits() {
        let mut c = ctx();
        let cat = Schema::object(
            "Cat",
            vec![
                FieldSchema::required("kind", Schema::Literal(crate::schema::LiteralValue::String("cat".into())).rc()),
                FieldSchema::required("lives", Schema::Int.rc()),
            ],
        )
        .rc();
        let dog = Schema::object(
            "Dog",
            vec![FieldSchema::required(
                "kind",
                Schema::Literal(crate::schema::LiteralValue::String("dog".into())).rc(),
            )],
        )
        .rc();
        let du = DiscriminatedUnionSchema {
            tag: "kind".into(),
            variants: vec![("cat".into(), cat), ("dog".into(), dog)],
        };
        let v = Value::Object(
            vec![
                ("kind".into(), Value::String("cat".into(), Complete)),
                ("lives".into(), Value::Number(serde_json::Number::from(9), Complete)),
            ],
            Complete,
        );
        let result = resolve_discriminated(&v, &du, &mut c).unwrap();
        assert_eq!(result.payload["lives"], JsonValue::Number(9.into()));
    }
}
