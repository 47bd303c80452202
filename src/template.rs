//! Program command templates
//!
//! A template is shell text, not an argument vector. The placeholder is
//! replaced by the literal test path with no quoting or escaping, and the
//! resulting line is handed to `sh -c`. Paths containing spaces or shell
//! metacharacters must be quoted inside the template by the caller, for
//! example `prog '@'`.

use std::path::Path;

use crate::error::{HarnessError, Result};

/// Command template bound to its placeholder symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramTemplate {
    template: String,
    symbol: String,
}

impl ProgramTemplate {
    /// Bind a template; appends `" " + symbol` when the symbol does not occur
    pub fn new(template: &str, symbol: &str) -> Result<Self> {
        if symbol.is_empty() {
            return Err(HarnessError::EmptyPlaceholder);
        }

        let template = if template.contains(symbol) {
            template.to_string()
        } else {
            format!("{} {}", template, symbol)
        };

        Ok(Self {
            template,
            symbol: symbol.to_string(),
        })
    }

    /// The bound template, including any appended placeholder
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Substitute every occurrence of the symbol with the test path
    pub fn format(&self, test_path: &Path) -> String {
        self.template
            .replace(&self.symbol, &test_path.to_string_lossy())
    }
}
