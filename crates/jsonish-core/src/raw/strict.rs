//! The shared recursive-descent grammar, parameterized by `lenient`.
//!
//! `lenient = false` is a plain JSON reader: any deviation is an error.
//! `lenient = true` additionally tolerates unquoted/single-quoted keys
//! (letters, digits, `_`/`$`/`-`/`.`, and folded internal whitespace),
//! missing commas, trailing commas, `//`/`/* */` comments, unterminated
//! strings (auto-closed at EOF), triple-quoted strings, missing closing
//! braces/brackets (inferred at EOF), bare identifiers used as string
//! values, a bool/null literal running straight into an unseparated
//! malformed JSON blob (folded into one opaque string), and comma-grouped,
//! currency-prefixed, percentage-suffixed, or fraction numeric literals -
//! recording a [`Fix`] for each recovery so the caller can see what was
//! assumed. Quoted strings close on the first unescaped delimiter whose
//! lookahead actually matches what should follow it (`:` for a key, a
//! terminator for a value); a delimiter that doesn't is kept as content,
//! so an apostrophe or stray quote inside the intended text doesn't cut
//! the string short.

use crate::error::{ParseError, Reason};
use crate::value::{CompletionState, Fix, Value};

pub(crate) struct Scanner<'a> {
    chars: &'a [char],
    pos: usize,
    lenient: bool,
    fixes: Vec<Fix>,
    /// Nesting depth inside object/array containers. Bareword-as-string
    /// recovery only applies to a field value or array element, never to an
    /// entire root-level response - otherwise any plain-English sentence
    /// would "succeed" as a one-word string and the fixer would never defer
    /// to `allow_as_string`.
    container_depth: usize,
}

impl<'a> Scanner<'a> {
    fn new(chars: &'a [char], start: usize, lenient: bool) -> Self {
        Scanner { chars, pos: start, lenient, fixes: Vec::new(), container_depth: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn skip_ws(&mut self) {
        loop {
            while matches!(self.peek(), Some(c) if c.is_whitespace()) {
                self.pos += 1;
            }
            if self.lenient && self.peek() == Some('/') && self.peek_at(1) == Some('/') {
                while !self.eof() && self.peek() != Some('\n') {
                    self.pos += 1;
                }
                self.fixes.push(Fix::DroppedComment);
                continue;
            }
            if self.lenient && self.peek() == Some('/') && self.peek_at(1) == Some('*') {
                self.pos += 2;
                while !self.eof() && !(self.peek() == Some('*') && self.peek_at(1) == Some('/')) {
                    self.pos += 1;
                }
                if !self.eof() {
                    self.pos += 2;
                }
                self.fixes.push(Fix::DroppedComment);
                continue;
            }
            break;
        }
    }
}

fn fail(reason: Reason, detail: impl Into<String>) -> ParseError {
    ParseError::new(reason, detail)
}

fn completion_of(complete: bool) -> CompletionState {
    if complete {
        CompletionState::Complete
    } else {
        CompletionState::Incomplete
    }
}

/// Parse one value starting at `start` in `chars`. Returns the value, the
/// fixes applied, and the position just past the value.
pub(crate) fn parse_from(
    chars: &[char],
    start: usize,
    lenient: bool,
) -> Result<(Value, Vec<Fix>, usize), ParseError> {
    let mut s = Scanner::new(chars, start, lenient);
    let value = parse_value(&mut s)?;
    let fixes = s.fixes;
    let pos = s.pos;
    Ok((value, fixes, pos))
}

/// Parse the whole of `input` as one JSON value with no recovery; fails if
/// anything (leading garbage, trailing garbage, malformed syntax) deviates.
pub fn parse_strict(input: &str) -> Result<Value, ParseError> {
    let chars: Vec<char> = input.chars().collect();
    let (value, _fixes, end) = parse_from(&chars, 0, false)?;
    let mut trailing = Scanner::new(&chars, end, false);
    trailing.skip_ws();
    if !trailing.eof() {
        return Err(fail(Reason::TypeMismatch, "trailing input after JSON value"));
    }
    Ok(value)
}

fn parse_value(s: &mut Scanner) -> Result<Value, ParseError> {
    s.skip_ws();
    match s.peek() {
        Some('{') => parse_object(s),
        Some('[') => parse_array(s),
        Some('"') => parse_string_value(s),
        Some('\'') if s.lenient => {
            let (text, complete) = parse_quoted(s, '\'', QuotePosition::Value)?;
            s.fixes.push(Fix::StrippedQuote);
            Ok(Value::String(text, completion_of(complete)))
        }
        Some(c) if c == '-' || c.is_ascii_digit() => parse_number(s),
        Some('$') if s.lenient => parse_number(s),
        Some('t') | Some('f') | Some('n') => {
            let start = s.pos;
            if let Ok(v) = parse_bool_literal(s) {
                return Ok(recover_trailing_embedded_json(s, v, start));
            }
            if let Ok(v) = parse_null_literal(s) {
                return Ok(recover_trailing_embedded_json(s, v, start));
            }
            parse_bareword_or_fail(s)
        }
        Some(c) if s.lenient && c.is_alphabetic() => parse_bareword_or_fail(s),
        Some(c) => Err(fail(Reason::TypeMismatch, format!("unexpected character '{c}'"))),
        None => Err(fail(Reason::NoCandidate, "unexpected end of input")),
    }
}

fn parse_bareword_or_fail(s: &mut Scanner) -> Result<Value, ParseError> {
    if !s.lenient || s.container_depth == 0 {
        return Err(fail(Reason::TypeMismatch, "expected a boolean or null literal"));
    }
    let start = s.pos;
    while matches!(s.peek(), Some(c) if c.is_alphanumeric() || c == '_' || c == '-') {
        s.pos += 1;
    }
    if s.pos == start {
        return Err(fail(Reason::TypeMismatch, "unrecognized token"));
    }
    let word: String = s.chars[start..s.pos].iter().collect();
    s.fixes.push(Fix::OtherRecovery("bareword_string".into()));
    Ok(Value::String(word, CompletionState::Complete))
}

/// Which grammar position a quoted span occupies - an object key expects a
/// `:` after the closer, a value expects `,`/`}`/`]` or end of input.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum QuotePosition {
    ObjectKey,
    Value,
}

/// Whether the `delim` just peeked at genuinely ends the quoted span, or is
/// an unescaped delimiter character that occurs inside the intended content
/// (e.g. an apostrophe inside a single-quoted string, or a stray `"` before
/// the real closing quote). Looks past the candidate closer, skipping
/// whitespace, for whatever punctuation should follow it in `position`; if
/// that punctuation isn't there, the candidate is treated as content instead
/// of a terminator.
fn quote_closes_here(s: &Scanner, position: QuotePosition) -> bool {
    let mut i = 1;
    while matches!(s.peek_at(i), Some(c) if c.is_whitespace()) {
        i += 1;
    }
    match s.peek_at(i) {
        None => true,
        Some(c) => match position {
            QuotePosition::ObjectKey => c == ':',
            QuotePosition::Value => matches!(c, ',' | '}' | ']'),
        },
    }
}

fn parse_quoted(s: &mut Scanner, delim: char, position: QuotePosition) -> Result<(String, bool), ParseError> {
    s.bump();
    let mut out = String::new();
    loop {
        match s.peek() {
            None => {
                if s.lenient {
                    s.fixes.push(Fix::ClosedString);
                    return Ok((out, false));
                }
                return Err(fail(Reason::UnterminatedString, "string was not closed before end of input"));
            }
            Some(c) if c == delim => {
                if s.lenient && !quote_closes_here(s, position) {
                    out.push(c);
                    s.bump();
                    continue;
                }
                s.bump();
                return Ok((out, true));
            }
            Some('\\') => {
                s.bump();
                match s.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('b') => out.push('\u{8}'),
                    Some('f') => out.push('\u{c}'),
                    Some('"') => out.push('"'),
                    Some('\'') => out.push('\''),
                    Some('\\') => out.push('\\'),
                    Some('/') => out.push('/'),
                    Some('u') => {
                        let hex: String = (0..4).filter_map(|i| s.peek_at(i)).collect();
                        if hex.len() == 4 {
                            if let Ok(code) = u32::from_str_radix(&hex, 16) {
                                if let Some(ch) = char::from_u32(code) {
                                    out.push(ch);
                                }
                            }
                            for _ in 0..4 {
                                s.bump();
                            }
                        }
                    }
                    Some(other) => out.push(other),
                    None => {}
                }
            }
            Some(c) => {
                out.push(c);
                s.bump();
            }
        }
    }
}

fn parse_string_value(s: &mut Scanner) -> Result<Value, ParseError> {
    if s.lenient && s.peek() == Some('"') && s.peek_at(1) == Some('"') && s.peek_at(2) == Some('"') {
        s.pos += 3;
        s.fixes.push(Fix::TripleQuoteUnwrap);
        let mut out = String::new();
        loop {
            if s.peek() == Some('"') && s.peek_at(1) == Some('"') && s.peek_at(2) == Some('"') {
                s.pos += 3;
                return Ok(Value::String(out, CompletionState::Complete));
            }
            match s.bump() {
                Some(c) => out.push(c),
                None => {
                    s.fixes.push(Fix::ClosedString);
                    return Ok(Value::String(out, CompletionState::Incomplete));
                }
            }
        }
    }
    let (text, complete) = parse_quoted(s, '"', QuotePosition::Value)?;
    Ok(Value::String(text, completion_of(complete)))
}

fn parse_number(s: &mut Scanner) -> Result<Value, ParseError> {
    if s.lenient {
        let start = s.pos;
        if let Some(v) = parse_lenient_number(s) {
            return Ok(v);
        }
        s.pos = start;
    }
    parse_plain_number(s)
}

fn parse_plain_number(s: &mut Scanner) -> Result<Value, ParseError> {
    let start = s.pos;
    if s.peek() == Some('-') {
        s.pos += 1;
    } else if s.lenient && s.peek() == Some('+') {
        s.pos += 1;
    }
    let mut saw_digit = false;
    while matches!(s.peek(), Some(c) if c.is_ascii_digit()) {
        s.pos += 1;
        saw_digit = true;
    }
    if s.peek() == Some('.') && matches!(s.peek_at(1), Some(c) if c.is_ascii_digit()) {
        s.pos += 1;
        while matches!(s.peek(), Some(c) if c.is_ascii_digit()) {
            s.pos += 1;
        }
    }
    if matches!(s.peek(), Some('e') | Some('E')) {
        let save = s.pos;
        s.pos += 1;
        if matches!(s.peek(), Some('+') | Some('-')) {
            s.pos += 1;
        }
        let exp_start = s.pos;
        while matches!(s.peek(), Some(c) if c.is_ascii_digit()) {
            s.pos += 1;
        }
        if s.pos == exp_start {
            s.pos = save;
        }
    }
    if !saw_digit {
        return Err(fail(Reason::TypeMismatch, "not a number"));
    }
    let text: String = s.chars[start..s.pos].iter().collect();
    let text = if let Some(stripped) = text.strip_prefix('+') { stripped.to_string() } else { text };
    let number: serde_json::Number =
        serde_json::from_str(&text).map_err(|_| fail(Reason::UnparseableNumber, format!("\"{text}\" is not a valid number")))?;
    Ok(Value::Number(number, CompletionState::Complete))
}

/// Recognizes the numeric literal shapes a model tends to produce around
/// currency and percentages that plain JSON number grammar rejects outright:
/// a leading `$`, comma-grouped thousands (`12,000`), a trailing `%`, and a
/// `numerator/denominator` fraction in place of a decimal point. Returns
/// `None` (leaving `s.pos` wherever it walked to - the caller resets it) if
/// none of those extensions actually triggered, so ordinary numbers still
/// fall through to [`parse_plain_number`].
fn parse_lenient_number(s: &mut Scanner) -> Option<Value> {
    let mut currency = false;
    let mut grouped = false;
    let mut percent = false;

    if s.peek() == Some('$') {
        currency = true;
        s.bump();
    }
    let negative = if s.peek() == Some('-') {
        s.bump();
        true
    } else {
        false
    };
    if s.peek() == Some('+') {
        s.bump();
    }

    let mut int_part = String::new();
    let mut saw_digit = false;
    loop {
        match s.peek() {
            Some(c) if c.is_ascii_digit() => {
                int_part.push(c);
                saw_digit = true;
                s.bump();
            }
            Some(',') if matches!(s.peek_at(1), Some(c) if c.is_ascii_digit()) => {
                grouped = true;
                s.bump();
            }
            _ => break,
        }
    }
    if !saw_digit {
        return None;
    }

    let mut frac_part = String::new();
    if s.peek() == Some('.') && matches!(s.peek_at(1), Some(c) if c.is_ascii_digit()) {
        s.bump();
        while matches!(s.peek(), Some(c) if c.is_ascii_digit()) {
            frac_part.push(s.peek().unwrap());
            s.bump();
        }
    }

    let mut fraction_value: Option<f64> = None;
    if frac_part.is_empty() && s.peek() == Some('/') && matches!(s.peek_at(1), Some(c) if c.is_ascii_digit()) {
        s.bump();
        let mut denom = String::new();
        while matches!(s.peek(), Some(c) if c.is_ascii_digit()) {
            denom.push(s.peek().unwrap());
            s.bump();
        }
        let numerator: f64 = int_part.parse().ok()?;
        let denominator: f64 = denom.parse().ok()?;
        if denominator == 0.0 {
            return None;
        }
        fraction_value = Some(numerator / denominator);
    }

    if s.peek() == Some('%') {
        percent = true;
        s.bump();
    }

    if !currency && !grouped && !percent && fraction_value.is_none() {
        // Nothing lenient-specific triggered; defer to plain number grammar.
        return None;
    }

    let magnitude = if let Some(f) = fraction_value {
        f
    } else {
        let text = if frac_part.is_empty() { int_part.clone() } else { format!("{int_part}.{frac_part}") };
        text.parse::<f64>().ok()?
    };
    let magnitude = if negative { -magnitude } else { magnitude };

    let number = serde_json::Number::from_f64(magnitude)?;
    s.fixes.push(Fix::OtherRecovery("lenient_number".into()));
    Some(Value::Number(number, CompletionState::Complete))
}

fn parse_keyword(s: &mut Scanner, word: &str) -> bool {
    let len = word.chars().count();
    let end = s.pos + len;
    if end > s.chars.len() {
        return false;
    }
    if s.chars[s.pos..end].iter().collect::<String>() != word {
        return false;
    }
    // Don't swallow "nullable" as "null" followed by garbage.
    if matches!(s.chars.get(end), Some(c) if c.is_alphanumeric() || *c == '_') {
        return false;
    }
    s.pos = end;
    true
}

/// After a bool/null literal, a model sometimes runs straight into a
/// malformed JSON blob with no separator (`"key": null{"nested": 1}`) -
/// never a valid second token, so instead of failing the whole parse this
/// folds the literal and everything up to the point the embedded blob
/// closes back into one opaque string, the way a string value recovers an
/// unparseable tail.
fn recover_trailing_embedded_json(s: &mut Scanner, literal: Value, start: usize) -> Value {
    if !s.lenient || !matches!(s.peek(), Some('{') | Some('[')) {
        return literal;
    }
    recover_embedded_malformed(s, start)
}

/// Scans from `start` (already past the leading literal) through a
/// balanced `{}`/`[]` span, treating quoted spans as opaque so a comma or
/// bracket inside a string never confuses the depth count. Stops at a
/// top-level comma or an unmatched closing bracket (the enclosing
/// container's own terminator, left unconsumed) without regard for whether
/// the embedded blob was itself valid JSON - it never has to be.
fn recover_embedded_malformed(s: &mut Scanner, start: usize) -> Value {
    let mut depth: i32 = 0;
    loop {
        match s.peek() {
            None => break,
            Some(delim @ ('"' | '\'')) => {
                s.bump();
                while let Some(c) = s.peek() {
                    if c == '\\' {
                        s.bump();
                        s.bump();
                        continue;
                    }
                    s.bump();
                    if c == delim {
                        break;
                    }
                }
            }
            Some('{') | Some('[') => {
                depth += 1;
                s.bump();
            }
            Some('}') | Some(']') => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
                s.bump();
            }
            Some(',') if depth == 0 => break,
            Some(_) => {
                s.bump();
            }
        }
    }
    let text: String = s.chars[start..s.pos].iter().collect();
    s.fixes.push(Fix::OtherRecovery("embedded_malformed_json".into()));
    Value::String(text, CompletionState::Complete)
}

fn parse_bool_literal(s: &mut Scanner) -> Result<Value, ParseError> {
    if parse_keyword(s, "true") {
        return Ok(Value::Bool(true));
    }
    if parse_keyword(s, "false") {
        return Ok(Value::Bool(false));
    }
    Err(fail(Reason::TypeMismatch, "expected a boolean literal"))
}

fn parse_null_literal(s: &mut Scanner) -> Result<Value, ParseError> {
    if parse_keyword(s, "null") {
        return Ok(Value::Null);
    }
    Err(fail(Reason::TypeMismatch, "expected a null literal"))
}

fn is_unquoted_key_start(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Continuation characters for an unquoted object key: the start set plus
/// `-`/`.` (common in model-emitted keys like `first-name` or `v1.metadata`)
/// and whitespace, which is folded to a single space by
/// [`fold_unquoted_key_spaces`] rather than rejected outright.
fn is_unquoted_key_char(c: char) -> bool {
    is_unquoted_key_start(c) || c == '-' || c == '.' || c.is_whitespace()
}

/// Collapse internal whitespace runs to a single space; leading/trailing
/// whitespace is expected to already be trimmed by the caller.
fn fold_unquoted_key_spaces(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_space = false;
    for c in raw.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out
}

fn parse_object(s: &mut Scanner) -> Result<Value, ParseError> {
    s.bump();
    s.container_depth += 1;
    let result = parse_object_body(s);
    s.container_depth -= 1;
    result
}

fn parse_object_body(s: &mut Scanner) -> Result<Value, ParseError> {
    let mut entries: Vec<(String, Value)> = Vec::new();
    let mut terminator_seen = false;
    loop {
        s.skip_ws();
        if s.peek() == Some('}') {
            s.bump();
            terminator_seen = true;
            break;
        }
        if s.eof() {
            break;
        }

        let (key, key_incomplete) = match s.peek() {
            Some('"') => {
                let (text, complete) = parse_quoted(s, '"', QuotePosition::ObjectKey)?;
                (text, !complete)
            }
            Some('\'') if s.lenient => {
                let (text, complete) = parse_quoted(s, '\'', QuotePosition::ObjectKey)?;
                s.fixes.push(Fix::StrippedQuote);
                (text, !complete)
            }
            Some(c) if s.lenient && is_unquoted_key_start(c) => {
                let start = s.pos;
                s.pos += 1;
                while matches!(s.peek(), Some(c2) if is_unquoted_key_char(c2)) {
                    s.pos += 1;
                }
                let mut end = s.pos;
                while end > start && s.chars[end - 1].is_whitespace() {
                    end -= 1;
                }
                let raw: String = s.chars[start..end].iter().collect();
                let ident = fold_unquoted_key_spaces(&raw);
                s.fixes.push(Fix::OtherRecovery("unquoted_key".into()));
                (ident, false)
            }
            _ if !s.lenient => return Err(fail(Reason::TypeMismatch, "expected a quoted object key")),
            _ => break,
        };
        if key_incomplete {
            break;
        }

        s.skip_ws();
        if s.peek() == Some(':') {
            s.bump();
        } else if !s.lenient {
            return Err(fail(Reason::TypeMismatch, "expected ':' after object key"));
        } else {
            s.fixes.push(Fix::OtherRecovery("missing_colon".into()));
        }

        s.skip_ws();
        let value = match parse_value(s) {
            Ok(v) => v,
            Err(e) => {
                if s.lenient {
                    break;
                }
                return Err(e);
            }
        };
        entries.push((key, value));

        s.skip_ws();
        match s.peek() {
            Some(',') => {
                s.bump();
                if !s.lenient {
                    let mut probe = Scanner::new(s.chars, s.pos, false);
                    probe.skip_ws();
                    if probe.peek() == Some('}') {
                        return Err(fail(Reason::TypeMismatch, "trailing comma before '}'"));
                    }
                }
            }
            Some('}') => {
                s.bump();
                terminator_seen = true;
                break;
            }
            _ if s.lenient => s.fixes.push(Fix::InferredComma),
            _ => return Err(fail(Reason::TypeMismatch, "expected ',' or '}' in object")),
        }
    }
    if !terminator_seen && s.lenient {
        s.fixes.push(Fix::InferredBrace);
    }
    let children: Vec<CompletionState> = entries.iter().map(|(_, v)| v.completion()).collect();
    let completion = CompletionState::of_container(terminator_seen, &children);
    Ok(Value::Object(entries, completion))
}

fn parse_array(s: &mut Scanner) -> Result<Value, ParseError> {
    s.bump();
    s.container_depth += 1;
    let result = parse_array_body(s);
    s.container_depth -= 1;
    result
}

fn parse_array_body(s: &mut Scanner) -> Result<Value, ParseError> {
    let mut items = Vec::new();
    let mut terminator_seen = false;
    loop {
        s.skip_ws();
        if s.peek() == Some(']') {
            s.bump();
            terminator_seen = true;
            break;
        }
        if s.eof() {
            break;
        }
        let value = match parse_value(s) {
            Ok(v) => v,
            Err(e) => {
                if s.lenient {
                    break;
                }
                return Err(e);
            }
        };
        items.push(value);
        s.skip_ws();
        match s.peek() {
            Some(',') => {
                s.bump();
                if !s.lenient {
                    let mut probe = Scanner::new(s.chars, s.pos, false);
                    probe.skip_ws();
                    if probe.peek() == Some(']') {
                        return Err(fail(Reason::TypeMismatch, "trailing comma before ']'"));
                    }
                }
            }
            Some(']') => {
                s.bump();
                terminator_seen = true;
                break;
            }
            _ if s.lenient => s.fixes.push(Fix::InferredComma),
            _ => return Err(fail(Reason::TypeMismatch, "expected ',' or ']' in array")),
        }
    }
    if !terminator_seen && s.lenient {
        s.fixes.push(Fix::InferredBracket);
    }
    let children: Vec<CompletionState> = items.iter().map(|v| v.completion()).collect();
    let completion = CompletionState::of_container(terminator_seen, &children);
    Ok(Value::Array(items, completion))
}
