//! A small JSON DSL implementing `jsonish_core::schema`'s capability
//! contract, so the CLI has a host schema to read off disk instead of
//! requiring callers to build a `Schema` tree in Rust.
//!
//! `Schema::Lazy` (recursive types) and `Schema::Refined` (predicate
//! validators) have no JSON representation here - both need a Rust closure,
//! which this text format can't carry - so schemas needing them should be
//! constructed as a library, with this CLI reserved for the common
//! first-order case.

use anyhow::{bail, Context, Result};
use jsonish_core::schema::{
    DiscriminatedUnionSchema, FieldSchema, LiteralValue, ObjectSchema, Openness, Schema, SchemaRef,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchemaDsl {
    String,
    Int,
    Float,
    Bool,
    Null,
    Array {
        items: Box<SchemaDsl>,
    },
    Object {
        #[serde(default)]
        name: String,
        fields: Vec<FieldDsl>,
        #[serde(default)]
        open: bool,
    },
    Map {
        key: Box<SchemaDsl>,
        value: Box<SchemaDsl>,
    },
    Enum {
        values: Vec<String>,
    },
    Literal {
        value: LiteralDsl,
    },
    Union {
        variants: Vec<SchemaDsl>,
    },
    DiscriminatedUnion {
        tag: String,
        variants: Vec<(String, SchemaDsl)>,
    },
    Optional {
        inner: Box<SchemaDsl>,
    },
    Nullable {
        inner: Box<SchemaDsl>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LiteralDsl {
    String(String),
    Int(i64),
    Bool(bool),
}

#[derive(Debug, Deserialize)]
pub struct FieldDsl {
    pub name: String,
    pub schema: SchemaDsl,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
}

pub fn to_schema(dsl: SchemaDsl) -> Result<SchemaRef> {
    let schema = match dsl {
        SchemaDsl::String => Schema::String,
        SchemaDsl::Int => Schema::Int,
        SchemaDsl::Float => Schema::Float,
        SchemaDsl::Bool => Schema::Bool,
        SchemaDsl::Null => Schema::Null,
        SchemaDsl::Array { items } => Schema::Array(to_schema(*items)?),
        SchemaDsl::Object { name, fields, open } => {
            let fields = fields
                .into_iter()
                .map(|f| -> Result<FieldSchema> {
                    let schema = to_schema(f.schema)
                        .with_context(|| format!("field \"{}\"", f.name))?;
                    let mut field = if f.optional {
                        FieldSchema::optional(f.name, schema)
                    } else {
                        FieldSchema::required(f.name, schema)
                    };
                    if !f.aliases.is_empty() {
                        field = field.with_aliases(f.aliases);
                    }
                    if let Some(default) = f.default {
                        field = field.with_default(default);
                    }
                    Ok(field)
                })
                .collect::<Result<Vec<_>>>()?;
            Schema::Object(ObjectSchema {
                name,
                fields,
                openness: if open { Openness::Open } else { Openness::Closed },
            })
        }
        SchemaDsl::Map { key, value } => Schema::Map(to_schema(*key)?, to_schema(*value)?),
        SchemaDsl::Enum { values } => Schema::Enum(values),
        SchemaDsl::Literal { value } => Schema::Literal(match value {
            LiteralDsl::String(s) => LiteralValue::String(s),
            LiteralDsl::Int(i) => LiteralValue::Int(i),
            LiteralDsl::Bool(b) => LiteralValue::Bool(b),
        }),
        SchemaDsl::Union { variants } => {
            let variants = variants.into_iter().map(to_schema).collect::<Result<Vec<_>>>()?;
            if variants.is_empty() {
                bail!("union schema must list at least one variant");
            }
            Schema::Union(variants)
        }
        SchemaDsl::DiscriminatedUnion { tag, variants } => {
            if variants.is_empty() {
                bail!("discriminated_union schema must list at least one variant");
            }
            let variants = variants
                .into_iter()
                .map(|(k, v)| -> Result<(String, SchemaRef)> { Ok((k, to_schema(v)?)) })
                .collect::<Result<Vec<_>>>()?;
            Schema::DiscriminatedUnion(DiscriminatedUnionSchema { tag, variants })
        }
        SchemaDsl::Optional { inner } => Schema::Optional(to_schema(*inner)?),
        SchemaDsl::Nullable { inner } => Schema::Nullable(to_schema(*inner)?),
    };
    Ok(schema.rc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_flat_object_schema() {
        let text = r#"{
            "type": "object",
            "name": "Person",
            "fields": [
                {"name": "name", "schema": {"type": "string"}},
                {"name": "age", "schema": {"type": "int"}, "optional": true}
            ]
        }"#;
        let dsl: SchemaDsl = serde_json::from_str(text).unwrap();
        let schema = to_schema(dsl).unwrap();
        match schema.as_ref() {
            Schema::Object(obj) => assert_eq!(obj.fields.len(), 2),
            other => panic!("expected object schema, got {other:?}"),
        }
    }

    #[test]
    fn rejects_an_empty_union() {
        let text = r#"{"type": "union", "variants": []}"#;
        let dsl: SchemaDsl = serde_json::from_str(text).unwrap();
        assert!(to_schema(dsl).is_err());
    }
}
