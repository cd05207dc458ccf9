use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {name}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub socket_url: String,
    pub reconnect_attempts: u32,
    pub reconnect_delay: Duration,
    pub connect_timeout: Duration,
    pub session_db_url: String,
}

impl Config {
    /// Read configuration from the environment, loading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }

        Ok(Self {
            api_url: env::var("QUIZARENA_API_URL")
                .unwrap_or_else(|_| "http://localhost:5000/api".to_string()),
            socket_url: env::var("QUIZARENA_SOCKET_URL")
                .unwrap_or_else(|_| "ws://localhost:5000/ws".to_string()),
            reconnect_attempts: parse_var("QUIZARENA_RECONNECT_ATTEMPTS", 5)?,
            reconnect_delay: Duration::from_millis(parse_var("QUIZARENA_RECONNECT_DELAY_MS", 1000)?),
            connect_timeout: Duration::from_millis(parse_var(
                "QUIZARENA_CONNECT_TIMEOUT_MS",
                10_000,
            )?),
            session_db_url: env::var("QUIZARENA_SESSION_DB")
                .unwrap_or_else(|_| "sqlite://quizarena_session.db?mode=rwc".to_string()),
        })
    }

    /// Point both the REST and channel endpoints at one server root.
    pub fn for_server(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        let socket_base = base
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1);
        Self {
            api_url: format!("{}/api", base),
            socket_url: format!("{}/ws", socket_base),
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000/api".to_string(),
            socket_url: "ws://localhost:5000/ws".to_string(),
            reconnect_attempts: 5,
            reconnect_delay: Duration::from_millis(1000),
            connect_timeout: Duration::from_millis(10_000),
            session_db_url: "sqlite://quizarena_session.db?mode=rwc".to_string(),
        }
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}
