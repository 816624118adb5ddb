//! Refinement validation: a user predicate layered on top of an otherwise
//! successfully coerced value.
//!
//! Refinement failure is a hard error everywhere *except* a Phase 2 (lax)
//! union-arm trial, where it is only a scored penalty so the best-effort
//! union resolver can still compare this arm against the others instead of
//! losing it outright. That distinction is `Context::in_union_arm`, not
//! [`Strictness`] - `Strictness::Lax` is also what ordinary top-level and
//! nested-field coercion runs under, and a refinement failing there must
//! still fail the whole parse.

use crate::error::{ParseError, Reason};
use crate::schema::{Refinement, SchemaRef};
use crate::value::Value;

use super::{dispatch, Coerced, Context, Flag, Strictness};

pub fn coerce_refined(
    value: &Value,
    inner: &SchemaRef,
    refinement: &Refinement,
    ctx: &mut Context,
    strict: Strictness,
) -> Result<Coerced, ParseError> {
    let mut result = dispatch(value, inner, ctx, strict)?;
    if ctx.options.ignore_refinements || refinement.validate(&result.payload) {
        return Ok(result);
    }
    if strict == Strictness::Lax && ctx.in_union_arm() {
        result.flags.push(Flag::RefinementFailed);
        return Ok(result);
    }
    Err(ctx.error(
        Reason::RefinementFailed,
        format!("value failed refinement \"{}\"", refinement.name),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use crate::schema::Schema;
    use crate::value::CompletionState::Complete;
    use serde_json::Number;

    #[test]
    fn strict_refinement_failure_rejects_the_arm() {
        let mut ctx = Context::new(Options::default());
        let inner = Schema::Int.rc();
        let positive = Refinement::new("positive", |v| v.as_i64().map(|n| n > 0).unwrap_or(false));
        let v = Value::Number(Number::from(-1), Complete);
        let err = coerce_refined(&v, &inner, &positive, &mut ctx, Strictness::Strict).unwrap_err();
        assert_eq!(err.reason, Reason::RefinementFailed);
    }

    #[test]
    fn lax_refinement_failure_inside_union_arm_is_scored_not_rejected() {
        let mut ctx = Context::new(Options::default());
        let inner = Schema::Int.rc();
        let positive = Refinement::new("positive", |v| v.as_i64().map(|n| n > 0).unwrap_or(false));
        let v = Value::Number(Number::from(-1), Complete);
        ctx.enter_union_arm();
        let result = coerce_refined(&v, &inner, &positive, &mut ctx, Strictness::Lax).unwrap();
        ctx.exit_union_arm();
        assert!(result.flags.contains(&Flag::RefinementFailed));
    }

    #[test]
    fn lax_refinement_failure_outside_union_arm_hard_fails() {
        let mut ctx = Context::new(Options::default());
        let inner = Schema::Int.rc();
        let positive = Refinement::new("positive", |v| v.as_i64().map(|n| n > 0).unwrap_or(false));
        let v = Value::Number(Number::from(-1), Complete);
        let err = coerce_refined(&v, &inner, &positive, &mut ctx, Strictness::Lax).unwrap_err();
        assert_eq!(err.reason, Reason::RefinementFailed);
    }

    #[test]
    fn ignore_refinements_skips_validation_entirely() {
        let mut options = Options::default();
        options.ignore_refinements = true;
        let mut ctx = Context::new(options);
        let inner = Schema::Int.rc();
        let positive = Refinement::new("positive", |v| v.as_i64().map(|n| n > 0).unwrap_or(false));
        let v = Value::Number(Number::from(-1), Complete);
        let result = coerce_refined(&v, &inner, &positive, &mut ctx, Strictness::Lax).unwrap();
        assert!(!result.flags.contains(&Flag::RefinementFailed));
    }
}
