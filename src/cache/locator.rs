//! Package locators
//!
//! A locator is the resolved identity of one artifact: its ident (optional
//! scope plus name) and the reference it was resolved to.

use crate::error::{FodError, FodResult};
use std::fmt;
use std::str::FromStr;

/// Resolved identity of a package artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    /// Scope without the leading `@`
    pub scope: Option<String>,
    pub name: String,
    /// Resolved reference, e.g. `npm:1.3.0` or a tarball URL
    pub reference: String,
}

impl Locator {
    pub fn new(scope: Option<&str>, name: &str, reference: &str) -> Self {
        Self {
            scope: scope.map(str::to_string),
            name: name.to_string(),
            reference: reference.to_string(),
        }
    }

    /// `@scope/name` or `name`
    pub fn ident(&self) -> String {
        match &self.scope {
            Some(scope) => format!("@{}/{}", scope, self.name),
            None => self.name.clone(),
        }
    }

    /// Parse `name@reference` or `@scope/name@reference`.
    pub fn parse(text: &str) -> FodResult<Self> {
        let invalid = || FodError::InvalidLocator(text.to_string());

        // The separator is the first `@` that does not open a scope
        let split = text
            .char_indices()
            .skip(1)
            .find(|&(_, c)| c == '@')
            .map(|(i, _)| i)
            .ok_or_else(invalid)?;
        let (ident, reference) = (&text[..split], &text[split + 1..]);

        if reference.is_empty() {
            return Err(invalid());
        }

        let (scope, name) = match ident.strip_prefix('@') {
            Some(scoped) => {
                let (scope, name) = scoped.split_once('/').ok_or_else(invalid)?;
                if scope.is_empty() {
                    return Err(invalid());
                }
                (Some(scope), name)
            }
            None => (None, ident),
        };

        if name.is_empty() || name.contains('/') {
            return Err(invalid());
        }

        Ok(Self::new(scope, name, reference))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.ident(), self.reference)
    }
}

impl FromStr for Locator {
    type Err = FodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
