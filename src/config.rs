use serde::{Deserialize, Serialize};

/// Main configuration structure loaded from able_mind.toml and environment variables
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub system: SystemConfig,
    pub model: ModelConfig,
    pub assessment: AssessmentConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// Document store connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SystemConfig {
    pub database_url: String,
    pub database_ns: String,
    pub database_db: String,
}

/// Generative-language service settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelConfig {
    /// "gemini" or "openai" (any OpenAI-compatible chat completions endpoint)
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    pub timeout_ms: u64,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
}

/// Shape of one assessment run
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssessmentConfig {
    pub total_challenges: usize,
    pub initial_difficulty: u8,
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub database_user: String,
    pub database_pass: String,
    pub api_key: Option<String>,
    pub no_log: bool,
    pub log_level: String,
    pub run_cache_max: usize,
    // HTTP transport configuration
    pub transport: String,
    pub http_bind: std::net::SocketAddr,
    pub http_path: String,
    pub bearer_token: Option<String>,
    pub http_sse_keepalive_sec: u64,
    pub http_request_timeout_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            database_user: "root".to_string(),
            database_pass: "root".to_string(),
            api_key: None,
            no_log: false,
            log_level: "able_mind=info,rmcp=info".to_string(),
            run_cache_max: 1024,
            transport: "stdio".to_string(),
            http_bind: std::net::SocketAddr::from(([127, 0, 0, 1], 8788)),
            http_path: "/mcp".to_string(),
            bearer_token: None,
            http_sse_keepalive_sec: 15,
            http_request_timeout_ms: 90_000,
        }
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables
    /// Uses ABLE_MIND_CONFIG environment variable or defaults to "able_mind.toml"
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(env_path) = std::env::var("ABLE_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::from_path(".env");
        }

        let config_path = std::env::var("ABLE_MIND_CONFIG")
            .unwrap_or_else(|_| "able_mind.toml".to_string());

        let mut config: Config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            toml::from_str(&content)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();
        config.runtime = RuntimeConfig::load_from_env(&config.model.provider);
        config.validate()?;

        Ok(config)
    }

    /// Env-first overrides for file-backed settings
    fn apply_env_overrides(&mut self) {
        if let Ok(db_url) = std::env::var("ABLE_DB_URL") {
            tracing::debug!("ABLE_DB_URL env override applied");
            self.system.database_url = db_url;
        }
        if let Ok(db_ns) = std::env::var("ABLE_DB_NS") {
            self.system.database_ns = db_ns;
        }
        if let Ok(db_name) = std::env::var("ABLE_DB_DB") {
            self.system.database_db = db_name;
        }

        if let Ok(provider) = std::env::var("ABLE_MODEL_PROVIDER") {
            self.model.provider = provider.to_ascii_lowercase();
        }
        if let Ok(model) = std::env::var("ABLE_MODEL") {
            self.model.model = model;
        }
        if let Ok(base) = std::env::var("ABLE_MODEL_BASE_URL") {
            self.model.base_url = Some(base);
        }
        if let Some(timeout) = env_parse::<u64>("ABLE_MODEL_TIMEOUT_MS") {
            self.model.timeout_ms = timeout;
        }
        if let Some(temperature) = env_parse::<f32>("ABLE_MODEL_TEMPERATURE") {
            self.model.temperature = Some(temperature);
        }
        if let Some(top_p) = env_parse::<f32>("ABLE_MODEL_TOP_P") {
            self.model.top_p = Some(top_p);
        }

        if let Some(total) = env_parse::<usize>("ABLE_TOTAL_CHALLENGES") {
            self.assessment.total_challenges = total;
        }
        if let Some(initial) = env_parse::<u8>("ABLE_INITIAL_DIFFICULTY") {
            self.assessment.initial_difficulty = initial;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(1..=20).contains(&self.assessment.total_challenges) {
            anyhow::bail!("total_challenges must be between 1 and 20");
        }
        if !(1..=10).contains(&self.assessment.initial_difficulty) {
            anyhow::bail!("initial_difficulty must be between 1 and 10");
        }
        if self.model.timeout_ms == 0 {
            anyhow::bail!("ABLE_MODEL_TIMEOUT_MS must be > 0");
        }
        if let Some(t) = self.model.temperature
            && !(0.0..=2.0).contains(&t)
        {
            anyhow::bail!("ABLE_MODEL_TEMPERATURE must be between 0.0 and 2.0");
        }
        if let Some(p) = self.model.top_p
            && !(0.0..=1.0).contains(&p)
        {
            anyhow::bail!("ABLE_MODEL_TOP_P must be between 0.0 and 1.0");
        }
        match self.model.provider.as_str() {
            "gemini" | "openai" => {}
            other => anyhow::bail!("Unknown model provider '{}'", other),
        }

        if !self.system.database_url.starts_with("ws://")
            && !self.system.database_url.starts_with("wss://")
            && !self.system.database_url.contains(':')
        {
            tracing::warn!(
                "Database URL '{}' appears to be missing a port",
                self.system.database_url
            );
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            system: SystemConfig {
                database_url: "127.0.0.1:8000".to_string(),
                database_ns: "able_mind".to_string(),
                database_db: "assessments".to_string(),
            },
            model: ModelConfig {
                provider: "gemini".to_string(),
                model: "gemini-2.5-flash".to_string(),
                base_url: None,
                timeout_ms: 30_000,
                temperature: Some(0.9),
                top_p: None,
            },
            assessment: AssessmentConfig {
                total_challenges: 5,
                initial_difficulty: 5,
            },
            runtime: RuntimeConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load runtime configuration from environment variables
    pub fn load_from_env(provider: &str) -> Self {
        let mut cfg = Self::default();

        cfg.database_user = std::env::var("ABLE_DB_USER").unwrap_or_else(|_| "root".to_string());
        cfg.database_pass = std::env::var("ABLE_DB_PASS").unwrap_or_else(|_| "root".to_string());
        cfg.api_key = match provider {
            "openai" => std::env::var("OPENAI_API_KEY").ok(),
            _ => std::env::var("GEMINI_API_KEY")
                .or_else(|_| std::env::var("GOOGLE_API_KEY"))
                .ok(),
        };
        cfg.no_log = std::env::var("ABLE_NO_LOG")
            .ok()
            .is_some_and(|v| v == "true" || v == "1");
        cfg.log_level =
            std::env::var("RUST_LOG").unwrap_or_else(|_| "able_mind=info,rmcp=info".to_string());
        if let Some(max) = env_parse::<usize>("ABLE_RUN_CACHE_MAX").filter(|&v| v > 0) {
            cfg.run_cache_max = max;
        }

        cfg.transport = std::env::var("ABLE_TRANSPORT").unwrap_or_else(|_| "stdio".to_string());
        if let Ok(v) = std::env::var("ABLE_HTTP_BIND")
            && let Ok(bind) = v.parse::<std::net::SocketAddr>()
        {
            cfg.http_bind = bind;
        }
        cfg.http_path = std::env::var("ABLE_HTTP_PATH").unwrap_or_else(|_| "/mcp".to_string());
        cfg.bearer_token = std::env::var("ABLE_BEARER_TOKEN").ok();
        if let Some(sse) = env_parse::<u64>("ABLE_HTTP_SSE_KEEPALIVE_SEC") {
            cfg.http_sse_keepalive_sec = sse;
        }
        if let Some(timeout) = env_parse::<u64>("ABLE_HTTP_REQUEST_TIMEOUT_MS") {
            cfg.http_request_timeout_ms = timeout;
        }

        cfg
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
