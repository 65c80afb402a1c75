//! Process configuration, read once from the environment at startup.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::application::services::rag_service::DEFAULT_RAG_SYSTEM_PROMPT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStoreKind {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub run_interval: Duration,
    pub batch_size: i64,
    pub concurrency: usize,
    /// `None` disables the stuck-request sweep.
    pub processing_timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub request_store: RequestStoreKind,
    pub database_url: Option<String>,
    pub worker: WorkerConfig,
    pub request_processing_minutes: f64,
    pub default_model: String,
    pub admin_password: String,
    pub embeddings_service_url: Url,
    pub generation_service_url: Url,
    pub rag_model: String,
    pub rag_system_prompt: String,
    pub similarity_top_k: usize,
    pub vector_store_path: PathBuf,
    pub corpus_url_template: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let request_store = match get("REQUEST_STORE").as_deref().unwrap_or("postgres") {
            "postgres" => RequestStoreKind::Postgres,
            "memory" => RequestStoreKind::Memory,
            other => {
                return Err(ConfigError::Invalid(
                    "REQUEST_STORE",
                    format!("unknown backend '{}', expected postgres or memory", other),
                ));
            }
        };

        let database_url = get("DATABASE_URL");
        if request_store == RequestStoreKind::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let interval_minutes: u64 = parse_or(&get, "WORKER_RUN_INTERVAL_MINUTES", 10)?;
        if interval_minutes == 0 {
            return Err(ConfigError::Invalid(
                "WORKER_RUN_INTERVAL_MINUTES",
                "must be at least 1".to_string(),
            ));
        }
        let batch_size: i64 = parse_or(&get, "WORKER_BATCH_SIZE", 20)?;
        if batch_size < 1 {
            return Err(ConfigError::Invalid(
                "WORKER_BATCH_SIZE",
                "must be at least 1".to_string(),
            ));
        }
        let concurrency: usize = parse_or(&get, "WORKER_CONCURRENCY", 3)?;
        let timeout_minutes: u64 = parse_or(&get, "PROCESSING_TIMEOUT_MINUTES", 60)?;

        let similarity_top_k: usize = parse_or(&get, "SIMILARITY_TOP_K", 3)?;
        if similarity_top_k == 0 {
            return Err(ConfigError::Invalid(
                "SIMILARITY_TOP_K",
                "must be at least 1".to_string(),
            ));
        }

        let request_processing_minutes: f64 = parse_or(&get, "REQUEST_PROCESSING_TIME_MINUTES", 2.0)?;
        if !request_processing_minutes.is_finite() || request_processing_minutes < 0.0 {
            return Err(ConfigError::Invalid(
                "REQUEST_PROCESSING_TIME_MINUTES",
                "must be a non-negative number".to_string(),
            ));
        }

        let default_model = get("DEFAULT_MODEL").unwrap_or_else(|| "gemini-1.5-flash".to_string());

        Ok(Self {
            port: parse_or(&get, "PORT", 3000)?,
            request_store,
            database_url,
            worker: WorkerConfig {
                run_interval: Duration::from_secs(interval_minutes * 60),
                batch_size,
                concurrency: concurrency.max(1),
                processing_timeout: (timeout_minutes > 0)
                    .then(|| Duration::from_secs(timeout_minutes * 60)),
            },
            request_processing_minutes,
            rag_model: get("RAG_MODEL").unwrap_or_else(|| default_model.clone()),
            default_model,
            admin_password: get("ADMIN_PASSWORD").ok_or(ConfigError::Missing("ADMIN_PASSWORD"))?,
            embeddings_service_url: required_url(&get, "EMBEDDINGS_SERVICE_URL")?,
            generation_service_url: required_url(&get, "GENERATION_SERVICE_URL")?,
            rag_system_prompt: get("SYSTEMPROMPT_RAG")
                .unwrap_or_else(|| DEFAULT_RAG_SYSTEM_PROMPT.to_string()),
            similarity_top_k,
            vector_store_path: PathBuf::from(
                get("VECTOR_STORE_PATH").unwrap_or_else(|| "./vector_store".to_string()),
            ),
            corpus_url_template: get("CORPUS_URL_TEMPLATE").unwrap_or_else(|| "/posts/{id}".to_string()),
        })
    }
}

fn parse_or<T, F>(get: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(key, format!("'{}' is not a valid number", raw))),
        None => Ok(default),
    }
}

fn required_url<F>(get: &F, key: &'static str) -> Result<Url, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = get(key).ok_or(ConfigError::Missing(key))?;
    Url::parse(&raw).map_err(|e| ConfigError::Invalid(key, e.to_string()))
}
