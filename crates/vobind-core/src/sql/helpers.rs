use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{DefinitionError, Result};

/// Very simple identifier guard: letters, digits, underscore only.
pub(crate) fn validate_ident(what: &'static str, ident: &str) -> Result<()> {
    static SEG: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex"));
    if ident.is_empty() {
        return Err(DefinitionError::EmptyIdentifier { what });
    }
    if !SEG.is_match(ident) {
        return Err(DefinitionError::InvalidIdentifier {
            what,
            value: ident.to_string(),
        });
    }
    Ok(())
}

/// `?, ?, ?` for `n` positional arguments.
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
