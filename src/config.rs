use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub storage: StorageBackend,
    pub responses_file: PathBuf,
    pub users_file: PathBuf,
    pub max_body_size: usize,
    pub cors_origins: Vec<String>,
    pub log_level: String,
}

/// Where responses and credentials live. Fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageBackend {
    File,
    Postgres { database_url: String },
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let host: IpAddr = env_or("SURVEYOR_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid SURVEYOR_HOST: {e}"))?;

        let port: u16 = env_or("SURVEYOR_PORT", "5500")
            .parse()
            .map_err(|e| format!("Invalid SURVEYOR_PORT: {e}"))?;

        let storage = match env_or("SURVEYOR_STORAGE", "file").as_str() {
            "file" => StorageBackend::File,
            "postgres" => StorageBackend::Postgres {
                database_url: env_required("DATABASE_URL")?,
            },
            other => {
                return Err(format!(
                    "Invalid SURVEYOR_STORAGE '{other}': expected 'file' or 'postgres'"
                ));
            }
        };

        let responses_file = PathBuf::from(env_or(
            "SURVEYOR_RESPONSES_FILE",
            "data/survey_responses.csv",
        ));
        let users_file = PathBuf::from(env_or("SURVEYOR_USERS_FILE", "data/users.csv"));

        let max_body_size: usize = env_or("SURVEYOR_MAX_BODY_SIZE", "1048576")
            .parse()
            .map_err(|e| format!("Invalid SURVEYOR_MAX_BODY_SIZE: {e}"))?;

        let cors_origins: Vec<String> = env_or("SURVEYOR_CORS_ORIGINS", "")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let log_level = env_or("SURVEYOR_LOG_LEVEL", "info");

        Ok(Config {
            host,
            port,
            storage,
            responses_file,
            users_file,
            max_body_size,
            cors_origins,
            log_level,
        })
    }

    /// File-backed configuration rooted at `dir`, used by tests and local runs.
    pub fn for_data_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Config {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 0,
            storage: StorageBackend::File,
            responses_file: dir.join("survey_responses.csv"),
            users_file: dir.join("users.csv"),
            max_body_size: 1_048_576,
            cors_origins: Vec::new(),
            log_level: "warn".to_string(),
        }
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
