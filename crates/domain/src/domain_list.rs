use crate::{DomainError, Fqdn};
use std::path::Path;
use tracing::warn;

/// Parses a domain list: one name per line, `#` and `;` start comment lines.
/// Invalid names are skipped with a warning.
pub fn parse_domain_list(content: &str) -> Vec<Fqdn> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with(';'))
        .filter_map(|line| match Fqdn::new(line) {
            Ok(name) => Some(name),
            Err(e) => {
                warn!(line, error = %e, "Skipping invalid domain list entry");
                None
            }
        })
        .collect()
}

pub fn read_domain_list(path: &Path) -> Result<Vec<Fqdn>, DomainError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        DomainError::IoError(format!("Failed to read domain list {}: {}", path.display(), e))
    })?;
    Ok(parse_domain_list(&content))
}
