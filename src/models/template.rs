//! Placeholder substitution and value validation.

use crate::error::ValidationError;
use crate::models::snippet::{Snippet, SnippetId};
use crate::models::values::PlaceholderValues;
use regex::Regex;

/// Checks every placeholder's effective value against its pattern.
///
/// Patterns must match the whole value. A pattern that does not compile is
/// reported the same way as a value that does not match it.
pub fn validate(
    id: SnippetId,
    snippet: &Snippet,
    values: &PlaceholderValues,
) -> Vec<ValidationError> {
    snippet
        .placeholders
        .iter()
        .filter_map(|ph| {
            let pattern = ph.required.pattern();
            let value = values.effective(id, ph);
            let matched = match full_match(pattern) {
                Ok(re) => re.is_match(value),
                Err(_) => false,
            };
            (!matched).then(|| ValidationError {
                snippet_name: snippet.name.clone(),
                placeholder_id: ph.id.clone(),
                message: wrong_pattern_message(&snippet.name, &ph.id, pattern),
            })
        })
        .collect()
}

/// Renders a snippet, using its error template when `errors` is non-empty.
pub fn render(
    id: SnippetId,
    snippet: &Snippet,
    values: &PlaceholderValues,
    errors: &[ValidationError],
) -> String {
    let template = if errors.is_empty() {
        snippet.code.clone()
    } else {
        let messages: String = errors.iter().map(|e| e.message.as_str()).collect();
        match &snippet.error_code {
            Some(error_code) => format!("{}\n{}", error_code, messages),
            None => messages,
        }
    };
    substitute(&template, id, snippet, values)
}

/// Replaces the first occurrence of each needle with the placeholder's effective value.
pub fn substitute(
    template: &str,
    id: SnippetId,
    snippet: &Snippet,
    values: &PlaceholderValues,
) -> String {
    snippet
        .placeholders
        .iter()
        .fold(template.to_string(), |acc, ph| {
            acc.replacen(&ph.needle, values.effective(id, ph), 1)
        })
}

fn full_match(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{})$", pattern))
}

fn wrong_pattern_message(snippet: &str, placeholder: &str, pattern: &str) -> String {
    format!(
        "/*\n\t{}.{}: wrong pattern!\n\tCorrect pattern:\n\t{}\n*/\n",
        snippet, placeholder, pattern
    )
}
