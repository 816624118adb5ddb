//! The schema capability set the coercer is generic over.
//!
//! The host's actual schema library (a derive macro, a reflection layer, a
//! JSON-Schema document, ...) is out of scope for this crate; what
//! is in scope is the minimal capability set the coercer needs. `Schema`
//! below is a concrete realization of that capability set, Rc-based so a
//! recursive schema can be built by cloning a shared node (see
//! [`Schema::lazy`]), and used by this crate's own tests, its CLI, and any
//! host that does not already have a richer schema type to adapt.
//!
//! `SchemaId` is derived from `Rc` pointer identity: recursive schemas are
//! built by sharing one `Rc<Schema>` wherever the recursive reference
//! appears, so pointer identity gives a stable hash key even for a
//! lazy/recursive schema node.

use std::fmt;
use std::rc::Rc;

use serde_json::Value as JsonValue;

/// Shared handle to a schema node.
pub type SchemaRef = Rc<Schema>;

/// Stable identity for a schema node, suitable as a hash-set key even for
/// lazy/recursive schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchemaId(usize);

pub fn schema_id(schema: &SchemaRef) -> SchemaId {
    SchemaId(Rc::as_ptr(schema) as *const () as usize)
}

/// Whether an object schema tolerates keys with no matching field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Openness {
    /// Extra keys are recorded as `ExtraKey` flags but do not fail coercion.
    Closed,
    /// Extra keys are free (no flag, no penalty). Rare in practice; exists
    /// for host schemas that declare `additionalProperties: true`-style
    /// openness.
    Open,
}

/// A single field of an [`Schema::Object`].
#[derive(Clone)]
pub struct FieldSchema {
    pub name: String,
    pub schema: SchemaRef,
    pub optional: bool,
    pub default: Option<JsonValue>,
    /// Library-provided aliases.
    pub aliases: Vec<String>,
}

impl fmt::Debug for FieldSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSchema")
            .field("name", &self.name)
            .field("optional", &self.optional)
            .field("aliases", &self.aliases)
            .finish()
    }
}

impl FieldSchema {
    pub fn required(name: impl Into<String>, schema: SchemaRef) -> Self {
        FieldSchema {
            name: name.into(),
            schema,
            optional: false,
            default: None,
            aliases: Vec::new(),
        }
    }

    pub fn optional(name: impl Into<String>, schema: SchemaRef) -> Self {
        FieldSchema {
            name: name.into(),
            schema,
            optional: true,
            default: None,
            aliases: Vec::new(),
        }
    }

    pub fn with_default(mut self, default: JsonValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_aliases(mut self, aliases: Vec<String>) -> Self {
        self.aliases = aliases;
        self
    }
}

/// An `Object`/class schema: ordered fields plus an openness policy.
#[derive(Debug, Clone)]
pub struct ObjectSchema {
    pub name: String,
    pub fields: Vec<FieldSchema>,
    pub openness: Openness,
}

/// A scalar literal a [`Schema::Literal`] must exactly match.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    String(String),
    Int(i64),
    Bool(bool),
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::String(s) => write!(f, "{s}"),
            LiteralValue::Int(i) => write!(f, "{i}"),
            LiteralValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// A `DiscriminatedUnion`: variants are keyed by the literal value of `tag`.
#[derive(Debug, Clone)]
pub struct DiscriminatedUnionSchema {
    pub tag: String,
    pub variants: Vec<(String, SchemaRef)>,
}

/// A user predicate attached to a [`Schema::Refined`] schema. The coercer
/// never inspects the predicate; it only calls `validate`.
#[derive(Clone)]
pub struct Refinement {
    pub name: String,
    validate: Rc<dyn Fn(&JsonValue) -> bool>,
}

impl fmt::Debug for Refinement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Refinement").field("name", &self.name).finish()
    }
}

impl Refinement {
    pub fn new(name: impl Into<String>, validate: impl Fn(&JsonValue) -> bool + 'static) -> Self {
        Refinement {
            name: name.into(),
            validate: Rc::new(validate),
        }
    }

    pub fn validate(&self, payload: &JsonValue) -> bool {
        (self.validate)(payload)
    }
}

/// A recursive schema reference. Built by sharing one `Rc<Schema>` at every
/// point the recursive type recurs; see [`Schema::lazy`].
#[derive(Clone)]
pub struct LazySchema {
    thunk: Rc<dyn Fn() -> SchemaRef>,
}

impl fmt::Debug for LazySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LazySchema(..)")
    }
}

impl LazySchema {
    pub fn resolve(&self) -> SchemaRef {
        (self.thunk)()
    }
}

/// The schema capability set the coercer dispatches over.
#[derive(Debug, Clone)]
pub enum Schema {
    String,
    Int,
    Float,
    Bool,
    Null,
    Array(SchemaRef),
    Object(ObjectSchema),
    Map(SchemaRef, SchemaRef),
    Enum(Vec<String>),
    Literal(LiteralValue),
    Union(Vec<SchemaRef>),
    DiscriminatedUnion(DiscriminatedUnionSchema),
    Optional(SchemaRef),
    Nullable(SchemaRef),
    Lazy(LazySchema),
    Refined(SchemaRef, Refinement),
}

impl Schema {
    pub fn rc(self) -> SchemaRef {
        Rc::new(self)
    }

    /// Build a recursive schema: `build` receives a handle to the node
    /// currently under construction (wrapped in `Schema::Lazy`) and should
    /// use it wherever the type refers to itself.
    ///
    /// ```
    /// use jsonish_core::schema::Schema;
    /// use std::cell::RefCell;
    /// use std::rc::Rc;
    ///
    /// // type Node = { next: Optional<Node> }
    /// let slot: Rc<RefCell<Option<jsonish_core::schema::SchemaRef>>> = Rc::new(RefCell::new(None));
    /// let slot_for_thunk = slot.clone();
    /// let lazy = Schema::lazy(move || slot_for_thunk.borrow().clone().expect("initialized below"));
    /// let node = Schema::Object(jsonish_core::schema::ObjectSchema {
    ///     name: "Node".into(),
    ///     fields: vec![jsonish_core::schema::FieldSchema::optional(
    ///         "next",
    ///         Schema::Optional(lazy.clone()).rc(),
    ///     )],
    ///     openness: jsonish_core::schema::Openness::Closed,
    /// })
    /// .rc();
    /// *slot.borrow_mut() = Some(node);
    /// ```
    pub fn lazy(thunk: impl Fn() -> SchemaRef + 'static) -> SchemaRef {
        Schema::Lazy(LazySchema { thunk: Rc::new(thunk) }).rc()
    }

    pub fn object(name: impl Into<String>, fields: Vec<FieldSchema>) -> Schema {
        Schema::Object(ObjectSchema {
            name: name.into(),
            fields,
            openness: Openness::Closed,
        })
    }

    pub fn discriminated_union(
        tag: impl Into<String>,
        variants: Vec<(impl Into<String>, SchemaRef)>,
    ) -> Schema {
        Schema::DiscriminatedUnion(DiscriminatedUnionSchema {
            tag: tag.into(),
            variants: variants.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        })
    }

    /// Human-readable kind name, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Schema::String => "string",
            Schema::Int => "int",
            Schema::Float => "float",
            Schema::Bool => "bool",
            Schema::Null => "null",
            Schema::Array(_) => "array",
            Schema::Object(_) => "object",
            Schema::Map(_, _) => "map",
            Schema::Enum(_) => "enum",
            Schema::Literal(_) => "literal",
            Schema::Union(_) => "union",
            Schema::DiscriminatedUnion(_) => "discriminated_union",
            Schema::Optional(_) => "optional",
            Schema::Nullable(_) => "nullable",
            Schema::Lazy(_) => "lazy",
            Schema::Refined(_, _) => "refined",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_id_is_stable_for_cloned_rc() {
        let s = Schema::String.rc();
        let a = schema_id(&s);
        let b = schema_id(&s.clone());
        assert_eq!(a, b);
    }

    #[test]
    fn schema_id_differs_across_distinct_nodes() {
        let a = Schema::String.rc();
        let b = Schema::String.rc();
        assert_ne!(schema_id(&a), schema_id(&b));
    }
}
