//! A schema-directed, tolerant reader for the "JSON-ish" text large language
//! models actually emit: fenced Markdown, trailing commas, unquoted keys,
//! truncated streaming output, prose wrapped around an otherwise valid
//! object. [`parse`] runs the raw parser (module [`raw`]) to recover a
//! [`value::Value`] tree from the input text, then the coercer (module
//! [`coerce`]) walks that tree against a caller-supplied [`schema::Schema`]
//! to produce a scored, schema-shaped `serde_json::Value`.
//!
//! ```
//! use jsonish_core::{parse, Options};
//! use jsonish_core::schema::Schema;
//!
//! let schema = Schema::object(
//!     "Person",
//!     vec![jsonish_core::schema::FieldSchema::required("name", Schema::String.rc())],
//! )
//! .rc();
//! let result = parse("Sure! ```json\n{name: 'Ada'}\n```", &schema, Options::default()).unwrap();
//! assert_eq!(result.payload["name"], "Ada");
//! ```

pub mod coerce;
pub mod error;
pub mod options;
pub mod raw;
pub mod schema;
pub mod value;

pub use coerce::{Coerced, Flag};
pub use error::{ParseError, Reason};
pub use options::{OnElementError, Options};
pub use value::Value;

use schema::SchemaRef;

/// Parse `input` against `schema`: run the raw parser, then the coercer,
/// under `options`. Returns the coerced, scored payload, or a [`ParseError`]
/// carrying the breadcrumb into the failing field and the causes tried for
/// any union arm. Never panics on malformed input - every raw-parser
/// strategy `options` enables runs and its candidates are combined, so one
/// strategy failing never blocks the others from being tried.
pub fn parse(input: &str, schema: &SchemaRef, options: Options) -> Result<Coerced, ParseError> {
    let value = raw::parse(input, &options)?;
    coerce::coerce(&value, schema, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSchema, Schema};
    use pretty_assertions::assert_eq;

    #[test]
    fn end_to_end_happy_path_strict_json() {
        let schema = Schema::object("Person", vec![FieldSchema::required("name", Schema::String.rc())]).rc();
        let result = parse(r#"{"name": "Ada"}"#, &schema, Options::default()).unwrap();
        assert_eq!(result.payload["name"], "Ada");
        assert_eq!(result.score, 0);
    }

    #[test]
    fn end_to_end_recovers_fenced_sloppy_json() {
        let schema = Schema::object("Person", vec![FieldSchema::required("name", Schema::String.rc())]).rc();
        let text = "Sure, here you go:\n```json\n{Name: 'Ada',}\n```";
        let result = parse(text, &schema, Options::default()).unwrap();
        assert_eq!(result.payload["name"], "Ada");
        assert!(result.score > 0, "case-insensitive field match should be scored");
    }

    #[test]
    fn end_to_end_missing_required_field_fails_with_breadcrumb() {
        let schema = Schema::object("Person", vec![FieldSchema::required("name", Schema::String.rc())]).rc();
        let err = parse("{}", &schema, Options::default()).unwrap_err();
        assert_eq!(err.reason, Reason::MissingRequiredField);
        assert_eq!(err.scope, vec!["name".to_string()]);
    }

    #[test]
    fn end_to_end_array_of_objects() {
        let item = Schema::object("Item", vec![FieldSchema::required("id", Schema::Int.rc())]).rc();
        let schema = Schema::Array(item).rc();
        let result = parse(r#"[{"id": 1}, {"id": "2"}]"#, &schema, Options::default()).unwrap();
        assert_eq!(result.payload, serde_json::json!([{"id": 1}, {"id": 2}]));
    }
}
