//! SQL `LIKE` pattern matching
//!
//! Patterns follow the usual `LIKE` syntax and match case-insensitively
//! against the whole input:
//! - `%` matches any run of characters (including none)
//! - `_` matches exactly one character
//! - `[abc]`, `[a-c]` match one character from a set, `[^abc]` one outside it
//!
//! Everything else matches literally.

use crate::core::error::{SpecResult, SpecificationError};
use regex::{Regex, RegexBuilder};

/// A compiled `LIKE` pattern
#[derive(Debug, Clone)]
pub struct LikePattern {
    pattern: String,
    regex: Regex,
}

impl LikePattern {
    /// Compile a pattern, failing on malformed character sets
    pub fn new(pattern: &str) -> SpecResult<Self> {
        let invalid = || SpecificationError::InvalidSearchPattern {
            pattern: pattern.to_string(),
        };

        let source = translate(pattern).ok_or_else(invalid)?;
        let regex = RegexBuilder::new(&source)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()
            .map_err(|_| invalid())?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// The original pattern text
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Check whether the whole input matches
    pub fn is_match(&self, input: &str) -> bool {
        self.regex.is_match(input)
    }
}

/// Translate a `LIKE` pattern into an anchored regex, `None` if malformed
fn translate(pattern: &str) -> Option<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');

    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            '[' => {
                let close = chars[i + 1..].iter().position(|c| *c == ']')? + i + 1;
                let set = &chars[i + 1..close];
                out.push_str(&translate_set(set)?);
                i = close;
            }
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    out.push('$');
    Some(out)
}

fn translate_set(set: &[char]) -> Option<String> {
    let (negated, members) = match set.split_first() {
        Some(('^', rest)) => (true, rest),
        _ => (false, set),
    };
    if members.is_empty() {
        return None;
    }

    let mut class = String::from("[");
    if negated {
        class.push('^');
    }
    for (idx, c) in members.iter().enumerate() {
        let is_range = *c == '-'
            && idx > 0
            && idx + 1 < members.len()
            && members[idx - 1] != '-'
            && members[idx + 1] != '-';
        if is_range {
            class.push('-');
        } else {
            class.push_str(&regex::escape(&c.to_string()));
        }
    }
    class.push(']');
    Some(class)
}
