//! Custom Askama template filters.

use std::fmt::Display;

/// Characters of the identity shown in the page header.
const SHORT_ID_LEN: usize = 5;

/// Abbreviate an identity for the page header.
///
/// Usage in templates: `{{ identity|short_id }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn short_id(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let id = value.to_string();
    Ok(abbreviate(&id))
}

fn abbreviate(id: &str) -> String {
    let short: String = id.chars().take(SHORT_ID_LEN).collect();
    if short.len() < id.len() {
        format!("{short}...")
    } else {
        short
    }
}
