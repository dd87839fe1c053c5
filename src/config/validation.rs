use crate::config::types::{Config, FetchConfig, HarvestConfig, ParserEntry, SearchConfig};
use crate::parsers::ParserKind;
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_search_config(&config.search)?;
    validate_harvest_config(&config.harvest)?;
    validate_fetch_config(&config.fetch)?;
    validate_parsers(&config.parsers)?;
    Ok(())
}

/// Validates search configuration
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    if config.queries.is_empty() {
        return Err(ConfigError::Validation(
            "at least one search query is required".to_string(),
        ));
    }

    for (label, query) in &config.queries {
        if query.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "search query '{}' cannot be empty",
                label
            )));
        }
    }

    if let Some(domain) = &config.domain {
        validate_domain(domain)?;
    }

    if config.results_db.is_empty() {
        return Err(ConfigError::Validation(
            "results_db cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the objective
fn validate_harvest_config(config: &HarvestConfig) -> Result<(), ConfigError> {
    if config.count_objective != -1 && config.count_objective < 1 {
        return Err(ConfigError::Validation(format!(
            "count_objective must be -1 (unbounded) or >= 1, got {}",
            config.count_objective
        )));
    }
    Ok(())
}

/// Validates fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > 256 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_fetches must be between 1 and 256, got {}",
            config.max_concurrent_fetches
        )));
    }

    if config.queue_capacity < 1 {
        return Err(ConfigError::Validation(format!(
            "queue_capacity must be >= 1, got {}",
            config.queue_capacity
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the parser table
fn validate_parsers(parsers: &[ParserEntry]) -> Result<(), ConfigError> {
    for entry in parsers {
        if entry.pattern.is_empty() {
            return Err(ConfigError::InvalidParser {
                pattern: entry.pattern.clone(),
                message: "pattern cannot be empty".to_string(),
            });
        }

        if entry.kind == ParserKind::Regex {
            let expr = entry.regex.as_deref().ok_or_else(|| ConfigError::InvalidParser {
                pattern: entry.pattern.clone(),
                message: "regex parser requires a `regex` expression".to_string(),
            })?;

            regex::Regex::new(expr).map_err(|e| ConfigError::InvalidParser {
                pattern: entry.pattern.clone(),
                message: e.to_string(),
            })?;
        }
    }
    Ok(())
}

/// Validates a domain restriction such as "example.com"
fn validate_domain(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidDomain(
            "Domain cannot be empty".to_string(),
        ));
    }

    if domain.contains("://") || domain.contains('/') {
        return Err(ConfigError::InvalidDomain(format!(
            "Domain '{}' must be a bare host name, not a URL",
            domain
        )));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidDomain(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidDomain(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidDomain(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}
