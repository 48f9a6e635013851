use crate::DomainError;
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Canonical fully-qualified domain name: trimmed, lowercase, dot-terminated.
///
/// Two spellings of the same name (`Example.COM`, `example.com.`) produce equal
/// values, so an `Fqdn` is safe to use as a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fqdn(Arc<str>);

impl Fqdn {
    pub fn new(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.len() < 2 {
            return Err(DomainError::InvalidDomainName(format!(
                "'{}' is too short",
                raw
            )));
        }
        if trimmed.chars().any(|c| c.is_whitespace()) {
            return Err(DomainError::InvalidDomainName(format!(
                "'{}' contains whitespace",
                raw
            )));
        }
        if trimmed.starts_with('.') || trimmed.contains("..") {
            return Err(DomainError::InvalidDomainName(format!(
                "'{}' has an empty label",
                raw
            )));
        }

        let mut canonical = trimmed.to_ascii_lowercase();
        if !canonical.ends_with('.') {
            canonical.push('.');
        }
        Ok(Self(Arc::from(canonical)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name without the trailing root dot, for log output.
    pub fn without_root(&self) -> &str {
        self.0.strip_suffix('.').unwrap_or(&self.0)
    }

    /// True when `self` equals `suffix` or is a subdomain of it.
    pub fn ends_with(&self, suffix: &Fqdn) -> bool {
        if self.0.len() == suffix.0.len() {
            return self.0 == suffix.0;
        }
        self.0.ends_with(suffix.as_str())
            && self.0.as_bytes()[self.0.len() - suffix.0.len() - 1] == b'.'
    }

    /// The name itself, then each parent up to the top-level label.
    ///
    /// `a.example.com.` yields `a.example.com.`, `example.com.`, `com.`.
    pub fn suffixes(&self) -> impl Iterator<Item = &str> {
        let name = self.as_str();
        std::iter::successors(Some(name), |current| {
            let (_, rest) = current.split_once('.')?;
            (!rest.is_empty()).then_some(rest)
        })
    }
}

impl fmt::Display for Fqdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Fqdn {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Borrow<str> for Fqdn {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Fqdn {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
