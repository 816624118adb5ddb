//! Extracts fenced code blocks (``` ```` ```lang ... ``` ````) from free-form
//! text and recursively runs the full [`super::parse`] pipeline on each
//! body, since a fenced block can itself contain loosely-formatted JSON that
//! needs the fixer.

use crate::options::Options;
use crate::value::Value;

pub fn extract(input: &str, options: &Options) -> Option<Vec<Value>> {
    let chars: Vec<char> = input.chars().collect();
    let mut candidates = Vec::new();
    let mut i = 0;
    while let Some(start) = find_fence(&chars, i) {
        let tag_start = start + 3;
        let tag_end = (tag_start..chars.len()).find(|&p| chars[p] == '\n');
        let (tag, body_start) = match tag_end {
            Some(nl) => (chars[tag_start..nl].iter().collect::<String>(), nl + 1),
            None => (String::new(), tag_start),
        };
        let close = find_fence(&chars, body_start);
        let (body_end, next) = match close {
            Some(c) => (c, c + 3),
            None => (chars.len(), chars.len()),
        };
        let body: String = chars[body_start..body_end].iter().collect();
        if let Ok(inner) = super::parse(&body, options) {
            let completion = inner.completion();
            candidates.push(Value::Markdown(tag.trim().to_string(), Box::new(inner), completion));
        }
        i = next;
        if next <= start {
            break;
        }
    }
    if candidates.is_empty() {
        None
    } else {
        Some(candidates)
    }
}

fn find_fence(chars: &[char], from: usize) -> Option<usize> {
    if chars.len() < 3 {
        return None;
    }
    (from..=chars.len() - 3).find(|&i| chars[i] == '`' && chars[i + 1] == '`' && chars[i + 2] == '`')
}
