//! The scoring model.
//!
//! Every non-trivial coercion step records a [`Flag`]; flags are summed into
//! a penalty via [`Flag::penalty`], and container totals amplify their
//! children's totals 10x so a handful of structural wins dominate many
//! leaf-level conversions (spec: "don't coerce the whole object to a string
//! just because one leaf was a number").

/// A named annotation recording a non-trivial coercion step. Flags never change the value, only its score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    UnionMatch,
    OptionalFromNull,
    ExactMatch,
    OptionalWrapper,
    NullableWrapper,
    OptionalDefaultFromNoValue,
    SingleToArray,
    SplitStringToArray,
    StringToInt,
    StringToFloat,
    StringToBool,
    StringToNull,
    NumberToBool,
    FloatToInt,
    BoolToInt,
    BoolToFloat,
    NumberToString,
    BoolToString,
    ExtraKey,
    CaseInsensitiveMatch,
    TrimmedMatch,
    SubstringMatch,
    AliasMatch,
    MergedDuplicateKeys,
    StrippedNonAlphaNumeric,
    ImpliedKey,
    StringToObject,
    StringToMap,
    MapKeyParseError,
    MapValueParseError,
    ArrayElementDropped,
    DefaultFromNoValue,
    DefaultButHadValue,
    RefinementFailed,
    /// A recursive schema/value pair was seen again while coercing laxly;
    /// the cycle resolves to `Null` rather than failing the whole parse.
    CircularGuard,
}

impl Flag {
    /// Penalty contributed by a single occurrence of this flag.
    pub fn penalty(self) -> u32 {
        use Flag::*;
        match self {
            UnionMatch | OptionalFromNull | ExactMatch | OptionalWrapper | NullableWrapper => 0,
            OptionalDefaultFromNoValue
            | SingleToArray
            | SplitStringToArray
            | StringToInt
            | StringToFloat
            | StringToBool
            | StringToNull
            | NumberToBool
            | FloatToInt
            | BoolToInt
            | BoolToFloat
            | NumberToString
            | BoolToString
            | ExtraKey
            | CaseInsensitiveMatch
            | TrimmedMatch => 1,
            SubstringMatch | AliasMatch | MergedDuplicateKeys | StrippedNonAlphaNumeric => 2,
            ImpliedKey | StringToObject | StringToMap | MapKeyParseError | MapValueParseError
            | ArrayElementDropped => 4,
            RefinementFailed => 8,
            DefaultFromNoValue => 100,
            DefaultButHadValue => 110,
            CircularGuard => 120,
        }
    }
}

/// Sum of this node's own flag penalties plus 10x the total of its
/// children's scores (spec "Composite scoring").
pub fn combine(own_flags: &[Flag], child_totals: &[u32]) -> u32 {
    let own: u32 = own_flags.iter().map(|f| f.penalty()).sum();
    let children: u32 = child_totals.iter().sum();
    own + 10 * children
}
