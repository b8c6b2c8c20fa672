/// Parse an `--entry` value: `./src/index.js` or `name=./src/index.js`.
///
/// Names become chunk names, so they may only contain letters, digits,
/// `-`, `_` and `.`.
pub fn parse_entry(s: &str) -> Result<String, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err("Entry cannot be empty".to_string());
    }

    let (name, request) = tote_config::EntryRequest::parse_cli(trimmed);

    if request.trim().is_empty() {
        return Err(format!("Entry '{trimmed}' has no path after '='"));
    }

    if let Some(name) = name {
        let valid = name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(format!(
                "Entry name can only contain letters, numbers, '-', '_' or '.': '{name}'"
            ));
        }
    }

    Ok(trimmed.to_string())
}

/// Parse a `--host` value. Accepts host names and IP addresses without a
/// scheme or port.
pub fn parse_host(s: &str) -> Result<String, String> {
    if s.is_empty() {
        return Err("Host cannot be empty".to_string());
    }
    if s.contains("://") {
        return Err(format!("Host must not include a scheme: '{s}'"));
    }
    if s.contains('/') {
        return Err(format!("Host must not include a path: '{s}'"));
    }
    Ok(s.to_string())
}
