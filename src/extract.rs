use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Up to the first `]`; a nested `[` becomes part of the name.
    static ref VARIABLE_RE: Regex = Regex::new(r"\[([^\]]+)\]").expect("invalid variable pattern");
}

/// Names referenced as `[name]`, each once, in first-seen order.
///
/// Works on the raw text and never fails: an unterminated `[` is ignored, and
/// references inside an otherwise malformed expression are still reported.
pub fn extract_variables(expression: &str) -> Vec<String> {
    VARIABLE_RE
        .captures_iter(expression)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|name| !name.is_empty())
        .unique()
        .map(str::to_string)
        .collect()
}
