use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Environment variable that sets a dotted configuration key, e.g. `primary.api_key`
pub fn to_env_var(field_path: &str) -> String {
    let parts: Vec<String> = field_path
        .split('.')
        .filter(|part| !part.is_empty())
        .map(str::to_uppercase)
        .collect();
    format!("MAESTRO_{}", parts.join("__"))
}

/// Dotted key named by a serde "missing field" message.
///
/// Handles both "missing field `type`" and "missing field `api_key` for key `primary`".
pub fn missing_field_path(message: &str) -> Option<String> {
    let rest = message.strip_prefix("missing field `")?;
    let (field, rest) = rest.split_once('`')?;
    match rest
        .strip_prefix(" for key `")
        .and_then(|key| key.split_once('`'))
    {
        Some((key, _)) => Some(format!("{}.{}", key, field)),
        None => Some(field.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_env_var() {
        assert_eq!(to_env_var("primary"), "MAESTRO_PRIMARY");
        assert_eq!(to_env_var("primary.api_key"), "MAESTRO_PRIMARY__API_KEY");
        assert_eq!(
            to_env_var("orchestration.max_iterations"),
            "MAESTRO_ORCHESTRATION__MAX_ITERATIONS"
        );
    }

    #[test]
    fn test_missing_field_path() {
        assert_eq!(missing_field_path("missing field `type`"), Some("type".to_string()));
        assert_eq!(
            missing_field_path("missing field `api_key` for key `primary`"),
            Some("primary.api_key".to_string())
        );
        assert_eq!(missing_field_path("invalid type: string"), None);
    }
}
