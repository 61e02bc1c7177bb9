//! Configuration management for Rulegate.
//!
//! This module handles loading and merging configuration from multiple sources,
//! lowest precedence first:
//! - Built-in defaults
//! - A YAML config file (`RULEGATE_CONFIG` or `--config`)
//! - Environment variables
//! - Command-line flags (applied by the binary through `with_overrides`)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::{MAX_TOP_K, MIN_TOP_K};
use crate::error::{AppError, AppResult};

/// Generation providers known to the factory.
pub const KNOWN_PROVIDERS: [&str; 2] = ["gemini", "ollama"];

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl LogFormat {
    /// Parse a log format name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Main service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Google Cloud project hosting the corpus and models
    pub project_id: String,

    /// Google Cloud region
    pub region: String,

    /// Retrieval corpus identifier (short id or full resource name)
    pub rag_corpus_id: String,

    /// Generation provider ("gemini" or "ollama")
    pub provider: String,

    /// Model used for answer generation
    pub model: String,

    /// Model used for query rewriting (defaults to `model`)
    pub rewrite_model: Option<String>,

    /// Base URL of a local Ollama runtime
    pub ollama_endpoint: String,

    /// Environment variable that may hold a fixed Google access token,
    /// overriding Application Default Credentials
    pub access_token_env: String,

    /// Citation source URL used when the model omits one
    pub source_url: String,

    /// Value of `Access-Control-Allow-Origin`
    pub allow_origin: String,

    /// Listening port
    pub port: u16,

    /// Path to the prompt template document
    pub prompts_path: PathBuf,

    /// Fallback number of passages to retrieve
    pub default_top_k: usize,

    /// Fallback confidence gate threshold
    pub default_min_confidence: f64,

    /// Token refill rate per client
    pub rate_limit_rps: f64,

    /// Token bucket capacity per client
    pub rate_limit_burst: u32,

    /// Buckets idle longer than this are evicted
    pub rate_limit_idle_secs: u64,

    /// Deadline for a whole ask request
    pub request_timeout_secs: u64,

    /// HTTP timeout for each backend call
    pub backend_timeout_secs: u64,

    /// Time allowed for in-flight requests to drain on shutdown
    pub shutdown_grace_secs: u64,

    /// Log level override
    pub log_level: Option<String>,

    /// Log output format
    pub log_format: LogFormat,

    /// Disable colored output
    pub no_color: bool,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    gcp: Option<GcpSection>,
    rag: Option<RagSection>,
    llm: Option<LlmSection>,
    server: Option<ServerSection>,
    rate_limit: Option<RateLimitSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GcpSection {
    project_id: Option<String>,
    region: Option<String>,
    access_token_env: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RagSection {
    corpus_id: Option<String>,
    source_url: Option<String>,
    top_k: Option<usize>,
    min_confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LlmSection {
    provider: Option<String>,
    model: Option<String>,
    rewrite_model: Option<String>,
    endpoint: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerSection {
    port: Option<u16>,
    allow_origin: Option<String>,
    prompts_path: Option<String>,
    request_timeout_secs: Option<u64>,
    shutdown_grace_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RateLimitSection {
    rps: Option<f64>,
    burst: Option<u32>,
    idle_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    format: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_file: None,
            project_id: String::new(),
            region: "us-central1".to_string(),
            rag_corpus_id: String::new(),
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash".to_string(),
            rewrite_model: None,
            ollama_endpoint: "http://localhost:11434".to_string(),
            access_token_env: "GOOGLE_ACCESS_TOKEN".to_string(),
            source_url: "https://www.canoeicf.com/rules".to_string(),
            allow_origin: "*".to_string(),
            port: 8080,
            prompts_path: PathBuf::from("prompts/prompts.md"),
            default_top_k: 8,
            default_min_confidence: 0.55,
            rate_limit_rps: 10.0,
            rate_limit_burst: 20,
            rate_limit_idle_secs: 600,
            request_timeout_secs: 60,
            backend_timeout_secs: 30,
            shutdown_grace_secs: 10,
            log_level: None,
            log_format: LogFormat::Pretty,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment and defaults.
    ///
    /// Environment variables:
    /// - `RULEGATE_CONFIG`: Path to a YAML config file
    /// - `GCP_PROJECT_ID`, `GCP_REGION`, `GOOGLE_ACCESS_TOKEN_ENV`
    /// - `RAG_CORPUS_ID`, `SOURCE_URL`, `TOP_K_DEFAULT`, `MIN_CONFIDENCE_DEFAULT`
    /// - `RULEGATE_PROVIDER`, `GEMINI_MODEL`, `GEMINI_REWRITE_MODEL`, `OLLAMA_ENDPOINT`
    /// - `PORT`, `ALLOW_ORIGIN`, `PROMPTS_PATH`
    /// - `RATE_LIMIT_RPS`, `RATE_LIMIT_BURST`
    /// - `RUST_LOG`, `LOG_FORMAT`, `NO_COLOR`
    ///
    /// # Example
    /// ```no_run
    /// use rulegate_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Corpus: {}", config.rag_corpus_id);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(|key| std::env::var(key).ok())
    }

    /// Load configuration using `lookup` to read environment variables.
    pub fn load_from<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(config_file) = env("RULEGATE_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if let Some(path) = config.config_file.clone() {
            if !path.exists() {
                return Err(AppError::Config(format!(
                    "Config file does not exist: {:?}",
                    path
                )));
            }
            config = config.merge_yaml(&path)?;
        }

        // Environment variables override YAML config
        if let Some(v) = env("GCP_PROJECT_ID") {
            config.project_id = v;
        }
        if let Some(v) = env("GCP_REGION") {
            config.region = v;
        }
        if let Some(v) = env("GOOGLE_ACCESS_TOKEN_ENV") {
            config.access_token_env = v;
        }
        if let Some(v) = env("RAG_CORPUS_ID") {
            config.rag_corpus_id = v;
        }
        if let Some(v) = env("RULEGATE_PROVIDER") {
            config.provider = v;
        }
        if let Some(v) = env("GEMINI_MODEL") {
            config.model = v;
        }
        if let Some(v) = env("GEMINI_REWRITE_MODEL") {
            config.rewrite_model = Some(v);
        }
        if let Some(v) = env("OLLAMA_ENDPOINT") {
            config.ollama_endpoint = v;
        }
        if let Some(v) = env("SOURCE_URL") {
            config.source_url = v;
        }
        if let Some(v) = env("ALLOW_ORIGIN") {
            config.allow_origin = v;
        }
        if let Some(v) = env("PROMPTS_PATH") {
            config.prompts_path = PathBuf::from(v);
        }

        // Unparsable numbers keep the current value
        config.port = parse_or(env("PORT"), config.port);
        config.default_top_k = parse_or(env("TOP_K_DEFAULT"), config.default_top_k);
        config.default_min_confidence =
            parse_or(env("MIN_CONFIDENCE_DEFAULT"), config.default_min_confidence);
        config.rate_limit_rps = parse_or(env("RATE_LIMIT_RPS"), config.rate_limit_rps);
        config.rate_limit_burst = parse_or(env("RATE_LIMIT_BURST"), config.rate_limit_burst);

        if let Some(level) = env("RUST_LOG") {
            config.log_level = Some(level);
        }
        if let Some(format) = env("LOG_FORMAT").as_deref().and_then(LogFormat::parse) {
            config.log_format = format;
        }
        if lookup("NO_COLOR").is_some() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(gcp) = config_file.gcp {
            set(&mut result.project_id, gcp.project_id);
            set(&mut result.region, gcp.region);
            set(&mut result.access_token_env, gcp.access_token_env);
        }

        if let Some(rag) = config_file.rag {
            set(&mut result.rag_corpus_id, rag.corpus_id);
            set(&mut result.source_url, rag.source_url);
            set(&mut result.default_top_k, rag.top_k);
            set(&mut result.default_min_confidence, rag.min_confidence);
        }

        if let Some(llm) = config_file.llm {
            set(&mut result.provider, llm.provider);
            set(&mut result.model, llm.model);
            set(&mut result.ollama_endpoint, llm.endpoint);
            set(&mut result.backend_timeout_secs, llm.timeout_secs);
            if llm.rewrite_model.is_some() {
                result.rewrite_model = llm.rewrite_model;
            }
        }

        if let Some(server) = config_file.server {
            set(&mut result.port, server.port);
            set(&mut result.allow_origin, server.allow_origin);
            set(&mut result.prompts_path, server.prompts_path.map(PathBuf::from));
            set(&mut result.request_timeout_secs, server.request_timeout_secs);
            set(&mut result.shutdown_grace_secs, server.shutdown_grace_secs);
        }

        if let Some(rate_limit) = config_file.rate_limit {
            set(&mut result.rate_limit_rps, rate_limit.rps);
            set(&mut result.rate_limit_burst, rate_limit.burst);
            set(&mut result.rate_limit_idle_secs, rate_limit.idle_secs);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(format) = logging.format.as_deref().and_then(LogFormat::parse) {
                result.log_format = format;
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables.
    pub fn with_overrides(
        mut self,
        port: Option<u16>,
        prompts_path: Option<PathBuf>,
        provider: Option<String>,
        log_level: Option<String>,
        json_logs: bool,
        no_color: bool,
    ) -> Self {
        if let Some(port) = port {
            self.port = port;
        }

        if let Some(prompts_path) = prompts_path {
            self.prompts_path = prompts_path;
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if json_logs {
            self.log_format = LogFormat::Json;
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Model used for query rewriting.
    pub fn rewrite_model(&self) -> &str {
        self.rewrite_model.as_deref().unwrap_or(&self.model)
    }

    /// Fixed access token from the configured variable, if one is set.
    pub fn resolve_access_token(&self) -> Option<String> {
        std::env::var(&self.access_token_env)
            .ok()
            .filter(|v| !v.is_empty())
    }

    /// Validate configuration before startup.
    pub fn validate(&self) -> AppResult<()> {
        if self.project_id.is_empty() {
            return Err(AppError::Config("GCP_PROJECT_ID is required".to_string()));
        }

        if self.rag_corpus_id.is_empty() {
            return Err(AppError::Config("RAG_CORPUS_ID is required".to_string()));
        }

        if !KNOWN_PROVIDERS.contains(&self.provider.to_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if !(MIN_TOP_K..=MAX_TOP_K).contains(&self.default_top_k) {
            return Err(AppError::Config(format!(
                "TOP_K_DEFAULT must be between {} and {}, got {}",
                MIN_TOP_K, MAX_TOP_K, self.default_top_k
            )));
        }

        if !(0.0..=1.0).contains(&self.default_min_confidence) {
            return Err(AppError::Config(format!(
                "MIN_CONFIDENCE_DEFAULT must be between 0.0 and 1.0, got {}",
                self.default_min_confidence
            )));
        }

        if self.rate_limit_rps.is_nan() || self.rate_limit_rps <= 0.0 || self.rate_limit_burst == 0 {
            return Err(AppError::Config(
                "RATE_LIMIT_RPS and RATE_LIMIT_BURST must be positive".to_string(),
            ));
        }

        if self.rate_limit_idle_secs == 0 {
            return Err(AppError::Config(
                "rate_limit.idle_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, current: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(current)
}
