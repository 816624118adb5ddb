//! Runtime options for [`crate::parse`].
//!
//! ## Serialization format
//!
//! Fields are serialized in `kebab-case`, matching this crate's other
//! config-shaped types, so an `Options` value round-trips through a host's
//! config file or FFI boundary unchanged.

use serde::{Deserialize, Serialize};

/// Strategy for array elements that fail to coerce against the element
/// schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnElementError {
    /// Drop the failing element, keep the rest. Default.
    #[default]
    KeepPartial,
    /// Fail the whole array if any element fails.
    FailFast,
}

/// Options recognised by the raw parser and coercer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Options {
    /// Run the Markdown extractor in the raw parser.
    pub allow_markdown_json: bool,
    /// Scan for multiple embedded JSON objects/arrays.
    pub find_all_json_objects: bool,
    /// Enable the token-level fixing state machine.
    pub allow_fixes: bool,
    /// As a last resort, return the raw input as a string.
    pub allow_as_string: bool,
    /// Coerce incomplete (streamed) values with best-effort defaults.
    pub allow_partial: bool,
    /// Behavior when an array element fails to coerce.
    pub on_element_error: OnElementError,
    /// Enable lax primitive coercion rules. `false` restricts primitive
    /// coercion to exact kind matches.
    pub coerce_primitives: bool,
    /// Skip refinement validation entirely.
    pub ignore_refinements: bool,
    /// Maximum recursion depth for both the raw parser and the coercer.
    pub max_depth: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            allow_markdown_json: true,
            find_all_json_objects: true,
            allow_fixes: true,
            allow_as_string: true,
            allow_partial: false,
            on_element_error: OnElementError::KeepPartial,
            coerce_primitives: true,
            ignore_refinements: false,
            max_depth: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_tuned_for_llm_output() {
        let o = Options::default();
        assert!(o.allow_markdown_json);
        assert!(o.find_all_json_objects);
        assert!(o.allow_fixes);
        assert!(o.allow_as_string);
        assert!(!o.allow_partial);
        assert_eq!(o.on_element_error, OnElementError::KeepPartial);
        assert!(o.coerce_primitives);
        assert!(!o.ignore_refinements);
        assert_eq!(o.max_depth, 100);
    }

    #[test]
    fn serde_round_trip_uses_kebab_case() {
        let opts = Options {
            allow_partial: true,
            on_element_error: OnElementError::FailFast,
            max_depth: 10,
            ..Options::default()
        };
        let json = serde_json::to_string(&opts).unwrap();
        assert!(json.contains("\"allow-partial\":true"));
        assert!(json.contains("\"on-element-error\":\"fail-fast\""));
        assert!(json.contains("\"max-depth\":10"));

        let back: Options = serde_json::from_str(&json).unwrap();
        assert_eq!(back, opts);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let json = r#"{"allow-partial": true}"#;
        let opts: Options = serde_json::from_str(json).unwrap();
        assert!(opts.allow_partial);
        assert!(opts.allow_markdown_json);
        assert_eq!(opts.max_depth, 100);
    }
}
