use crate::engine::RoundingPolicy;
use crate::ledger::MissingRecordPolicy;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub ledger_backend: LedgerBackend,
    pub rounding_policy: RoundingPolicy,
    pub missing_record_policy: MissingRecordPolicy,
    pub seed_demo_data: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerBackend {
    Memory,
    Sqlite { database_path: String },
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

        let ledger_backend = match env_map
            .get("LEDGER_BACKEND")
            .map(|s| s.as_str())
            .unwrap_or("memory")
        {
            "memory" => LedgerBackend::Memory,
            "sqlite" => LedgerBackend::Sqlite {
                database_path: env_map
                    .get("DATABASE_PATH")
                    .cloned()
                    .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?,
            },
            other => {
                return Err(ConfigError::InvalidValue(
                    "LEDGER_BACKEND".to_string(),
                    format!("must be memory or sqlite, got {}", other),
                ))
            }
        };

        let rounding_policy = env_map
            .get("ROUNDING_POLICY")
            .map(|s| s.as_str())
            .unwrap_or("whole")
            .parse::<RoundingPolicy>()
            .map_err(|e| ConfigError::InvalidValue("ROUNDING_POLICY".to_string(), e))?;

        let missing_record_policy = env_map
            .get("MISSING_RECORD_POLICY")
            .map(|s| s.as_str())
            .unwrap_or("create")
            .parse::<MissingRecordPolicy>()
            .map_err(|e| ConfigError::InvalidValue("MISSING_RECORD_POLICY".to_string(), e))?;

        let seed_demo_data = match env_map
            .get("SEED_DEMO_DATA")
            .map(|s| s.as_str())
            .unwrap_or("true")
        {
            "true" | "1" => true,
            "false" | "0" => false,
            other => {
                return Err(ConfigError::InvalidValue(
                    "SEED_DEMO_DATA".to_string(),
                    format!("must be true or false, got {}", other),
                ))
            }
        };

        Ok(Config {
            port,
            ledger_backend,
            rounding_policy,
            missing_record_policy,
            seed_demo_data,
        })
    }
}
