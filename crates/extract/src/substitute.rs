//! Token back-substitution.

use crate::consts::TOKEN_REGEX;
use regex::Captures;
use std::collections::HashMap;

/// Token to final value (public URL or data URI).
pub type StubMap = HashMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitution {
    pub text: String,
    /// Tokens without a stub, each listed once in order of first occurrence.
    /// They are left in the text as-is.
    pub missing: Vec<String>,
}

/// Replace every token in `text` with its value from `stubs`.
///
/// Values are inserted literally; a `$` in a URL is never treated as a group
/// reference.
#[tracing::instrument(skip_all, fields(size = text.len(), stubs = stubs.len()))]
pub fn substitute(text: &str, stubs: &StubMap) -> Substitution {
    let mut missing: Vec<String> = Vec::new();
    let replaced = TOKEN_REGEX.replace_all(text, |caps: &Captures| {
        let token = &caps[0];
        match stubs.get(token) {
            Some(value) => value.clone(),
            None => {
                if !missing.iter().any(|m| m == token) {
                    missing.push(token.to_string());
                }
                token.to_string()
            },
        }
    });
    let text = replaced.into_owned();
    for token in &missing {
        tracing::error!(token, "stub not found");
    }
    Substitution { text, missing }
}
