//! The coercer: walks a [`Value`] against a [`Schema`] and produces a scored,
//! schema-shaped `serde_json::Value`.
//!
//! Coercion runs in one of two strictness modes. `Lax` is the normal mode:
//! every rule in [`primitives`] and [`structural`] is available. `Strict` is
//! used only while a union arm is being try-cast (see [`union`]) - exact
//! kind matches only, no defaults, no `SingleToArray`, no string coercions.
//! Both modes share the same recursive dispatcher so a structural type
//! (object, array, map) nested under a union arm sees the same strictness
//! its parent was evaluated under.

pub mod partial;
pub mod primitives;
pub mod refine;
pub mod scoring;
pub mod structural;
pub mod union;

pub use scoring::Flag;

use std::collections::HashSet;

use serde_json::Value as JsonValue;

use crate::error::{ParseError, Reason};
use crate::options::Options;
use crate::schema::{schema_id, Schema, SchemaId, SchemaRef};
use crate::value::{CompletionState, Value, ValueFingerprint};

/// Which ruleset a dispatch call is running under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    /// Exact kind matches only; used while try-casting a union arm.
    Strict,
    /// The full coercion ruleset.
    Lax,
}

impl Strictness {
    pub fn is_lax(self) -> bool {
        matches!(self, Strictness::Lax)
    }
}

/// A successfully coerced node: its JSON payload, the flags recorded at this
/// node specifically (not its children), and the combined score.
#[derive(Debug, Clone)]
pub struct Coerced {
    pub payload: JsonValue,
    pub flags: Vec<Flag>,
    pub score: u32,
}

impl Coerced {
    pub fn leaf(payload: JsonValue, flags: Vec<Flag>) -> Self {
        let score = scoring::combine(&flags, &[]);
        Coerced { payload, flags, score }
    }

    pub fn container(payload: JsonValue, own_flags: Vec<Flag>, child_scores: &[u32]) -> Self {
        let score = scoring::combine(&own_flags, child_scores);
        Coerced { payload, flags: own_flags, score }
    }
}

/// Per-parse mutable state: recursion depth, the scope breadcrumb used to
/// annotate errors, and the two cycle-guard sets keyed by
/// `(SchemaId, ValueFingerprint)`.
///
/// The guard sets are scoped to the *active* recursion chain: a key is
/// inserted on entry to [`dispatch`] and removed again before it returns, so
/// two unrelated sibling positions that happen to carry structurally equal
/// values never collide. Only a genuine cycle - the same schema node
/// revisited with an unchanged value while still on the call stack that
/// produced it - trips the guard.
pub struct Context {
    pub options: Options,
    scope: Vec<String>,
    depth: usize,
    visited_try: HashSet<(SchemaId, ValueFingerprint)>,
    visited_coerce: HashSet<(SchemaId, ValueFingerprint)>,
    /// How many union-arm trials are currently on the call stack. Distinct
    /// from [`Strictness`]: a union arm can be tried under either phase, and
    /// ordinary (non-union) lax coercion also uses `Strictness::Lax`.
    /// Refinement failure needs to tell these apart - it is a hard error
    /// everywhere except a Phase 2 (lax) union-arm trial.
    union_arm_depth: usize,
}

impl Context {
    pub fn new(options: Options) -> Self {
        Context {
            options,
            scope: Vec::new(),
            depth: 0,
            visited_try: HashSet::new(),
            visited_coerce: HashSet::new(),
            union_arm_depth: 0,
        }
    }

    pub fn push_scope(&mut self, segment: impl Into<String>) {
        self.scope.push(segment.into());
    }

    pub fn pop_scope(&mut self) {
        self.scope.pop();
    }

    pub fn enter_union_arm(&mut self) {
        self.union_arm_depth += 1;
    }

    pub fn exit_union_arm(&mut self) {
        self.union_arm_depth -= 1;
    }

    /// Whether the call stack is currently inside a union arm's trial
    /// (either phase), as opposed to ordinary top-level or structural-field
    /// coercion.
    pub fn in_union_arm(&self) -> bool {
        self.union_arm_depth > 0
    }

    /// Build a [`ParseError`] already annotated with the current scope.
    pub fn error(&self, reason: Reason, detail: impl Into<String>) -> ParseError {
        let mut err = ParseError::new(reason, detail);
        for segment in self.scope.iter().rev() {
            err = err.with_scope(segment.clone());
        }
        err
    }
}

/// Entry point used by [`crate::parse`]: coerce `value` against `schema`
/// under the full (lax) ruleset.
pub fn coerce(value: &Value, schema: &SchemaRef, options: Options) -> Result<Coerced, ParseError> {
    let mut ctx = Context::new(options);
    dispatch(value, schema, &mut ctx, Strictness::Lax)
}

/// The recursive dispatcher every coercer (structural, union, refinement)
/// routes back through. Performs the depth guard and the cycle guard, then
/// hands off to the kind-specific coercer.
pub fn dispatch(
    value: &Value,
    schema: &SchemaRef,
    ctx: &mut Context,
    strict: Strictness,
) -> Result<Coerced, ParseError> {
    if let Value::AnyOf(candidates, origin) = value {
        return resolve_any_of(candidates, origin, schema, ctx, strict);
    }
    if ctx.depth >= ctx.options.max_depth {
        return Err(ctx.error(
            Reason::DepthExceeded,
            format!("recursion exceeded max-depth {}", ctx.options.max_depth),
        ));
    }

    let key = (schema_id(schema), value.fingerprint());
    let first_visit = match strict {
        Strictness::Strict => ctx.visited_try.insert(key),
        Strictness::Lax => ctx.visited_coerce.insert(key),
    };
    if !first_visit {
        return match strict {
            Strictness::Strict => Err(ctx.error(
                Reason::CircularReference,
                "cyclic schema/value pair revisited while try-casting",
            )),
            Strictness::Lax => Ok(Coerced::leaf(JsonValue::Null, vec![Flag::CircularGuard])),
        };
    }

    ctx.depth += 1;
    let result = dispatch_inner(value, schema, ctx, strict);
    ctx.depth -= 1;

    match strict {
        Strictness::Strict => {
            ctx.visited_try.remove(&key);
        }
        Strictness::Lax => {
            ctx.visited_coerce.remove(&key);
        }
    }
    result
}

fn dispatch_inner(
    value: &Value,
    schema: &SchemaRef,
    ctx: &mut Context,
    strict: Strictness,
) -> Result<Coerced, ParseError> {
    let value = peel(value);
    let lax = strict.is_lax() && ctx.options.coerce_primitives;
    match schema.as_ref() {
        Schema::String => primitives::coerce_string(value, lax).map(|(p, f)| Coerced::leaf(p, f)),
        Schema::Int => primitives::coerce_int(value, lax).map(|(p, f)| Coerced::leaf(p, f)),
        Schema::Float => primitives::coerce_float(value, lax).map(|(p, f)| Coerced::leaf(p, f)),
        Schema::Bool => primitives::coerce_bool(value, lax).map(|(p, f)| Coerced::leaf(p, f)),
        Schema::Null => primitives::coerce_null(value, lax).map(|(p, f)| Coerced::leaf(p, f)),
        Schema::Array(elem) => structural::coerce_array(value, elem, ctx, strict),
        Schema::Object(obj) => structural::coerce_object(value, obj, ctx, strict),
        Schema::Map(key, val) => structural::coerce_map(value, key, val, ctx, strict),
        Schema::Enum(variants) => {
            structural::coerce_enum(value, variants, strict.is_lax()).map(|(p, f)| Coerced::leaf(p, f))
        }
        Schema::Literal(lit) => {
            structural::coerce_literal(value, lit, strict.is_lax()).map(|(p, f)| Coerced::leaf(p, f))
        }
        Schema::Union(arms) => union::resolve(value, arms, ctx),
        Schema::DiscriminatedUnion(du) => union::resolve_discriminated(value, du, ctx),
        Schema::Optional(inner) => structural::coerce_optional(value, inner, ctx, strict),
        Schema::Nullable(inner) => structural::coerce_nullable(value, inner, ctx, strict),
        Schema::Lazy(lazy) => dispatch(value, &lazy.resolve(), ctx, strict),
        Schema::Refined(inner, refinement) => refine::coerce_refined(value, inner, refinement, ctx, strict),
    }
}

/// Try every candidate of an `AnyOf` (multiple viable readings of the same
/// input span, produced by the raw parser) against `schema` and keep the
/// lowest-scoring success. All candidates that fail are kept as `causes` on
/// the resulting error if every one of them does.
fn resolve_any_of(
    candidates: &[Value],
    origin: &str,
    schema: &SchemaRef,
    ctx: &mut Context,
    strict: Strictness,
) -> Result<Coerced, ParseError> {
    let mut best: Option<Coerced> = None;
    let mut causes = Vec::new();
    for candidate in candidates {
        match dispatch(candidate, schema, ctx, strict) {
            Ok(coerced) => {
                if best.as_ref().map_or(true, |b| coerced.score < b.score) {
                    best = Some(coerced);
                }
            }
            Err(e) => causes.push(e),
        }
    }
    best.ok_or_else(|| {
        ctx.error(
            Reason::NoCandidate,
            format!("no candidate from \"{origin}\" coerced successfully"),
        )
        .with_causes(causes)
    })
}

/// Strip the raw parser's provenance wrappers (`Markdown`, `FixedJson`) down
/// to the value they carry; coercion only cares about shape and content, not
/// how that shape was recovered.
pub(crate) fn peel(value: &Value) -> &Value {
    match value {
        Value::Markdown(_, inner, _) => peel(inner),
        Value::FixedJson(inner, _) => peel(inner),
        _ => value,
    }
}

/// Reject an `Incomplete` value unless `options.allow_partial` is set. Called
/// by leaf and structural coercers before they inspect `value`'s content, so
/// a truncated token never silently coerces into a complete-looking result.
pub(crate) fn check_completion(value: &Value, ctx: &Context) -> Result<(), ParseError> {
    if !ctx.options.allow_partial && value.completion() == CompletionState::Incomplete {
        return Err(ctx.error(Reason::IncompleteValue, "value was truncated and allow-partial is disabled"));
    }
    Ok(())
}
