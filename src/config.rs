use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    /// Interval for the embedded scheduler. None disables it; the trigger
    /// endpoint is then the only way to start a run.
    pub run_interval_secs: Option<u64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let run_interval_secs = env_map
            .get("RUN_INTERVAL_SECS")
            .map(|s| {
                s.parse::<u64>().map_err(|_| {
                    ConfigError::InvalidValue(
                        "RUN_INTERVAL_SECS".to_string(),
                        "must be a valid u64".to_string(),
                    )
                })
            })
            .transpose()?;

        if run_interval_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "RUN_INTERVAL_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Config {
            port,
            database_path,
            run_interval_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("DATABASE_PATH".to_string(), "/tmp/test.db".to_string());
        map
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.run_interval_secs, None);
    }

    #[test]
    fn test_missing_database_path() {
        let result = Config::from_env_map(HashMap::new());
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "DATABASE_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_invalid_port() {
        let mut env_map = setup_required_env();
        env_map.insert("PORT".to_string(), "not_a_number".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PORT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_run_interval_parsed() {
        let mut env_map = setup_required_env();
        env_map.insert("RUN_INTERVAL_SECS".to_string(), "3600".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.run_interval_secs, Some(3600));
    }

    #[test]
    fn test_zero_run_interval_rejected() {
        let mut env_map = setup_required_env();
        env_map.insert("RUN_INTERVAL_SECS".to_string(), "0".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "RUN_INTERVAL_SECS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }
}
