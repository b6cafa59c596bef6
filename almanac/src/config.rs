use serde::Deserialize;
use std::env;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_env_opt<T: std::str::FromStr>(var: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Ignoring.", val, var, e);
                None
            }
        },
        Err(_) => None,
    }
}

/// `parse_env_or` for settings where zero would stall or disable the service.
fn parse_env_at_least_one<T>(var: &str, default: T) -> T
where
    T: std::str::FromStr + PartialOrd + From<u8> + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    let value = parse_env_or(var, default);
    let floor = T::from(1);
    if value < floor {
        tracing::warn!("{} must be at least 1, got {}. Using 1.", var, value);
        floor
    } else {
        value
    }
}

/// Ninety days.
pub const DEFAULT_INTERPRETATION_TTL_SECS: u64 = 90 * 24 * 60 * 60;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub llm: Option<LlmConfig>,
    pub chart: ChartConfig,
    pub interpretation: InterpretationConfig,
    pub calendar: CalendarConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub api_keys: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: Option<String>,
    pub local_path: Option<String>,
    pub busy_timeout_ms: u64,
    pub journal_mode: String,
    pub synchronous: String,
}

/// LLM configuration for the interpretation generator.
///
/// Either `api_key` is used as a static bearer credential, or all of
/// `token_url`, `client_id` and `client_secret` are set and an access token is
/// fetched and cached with its expiry.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub token_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// External chart computation provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartConfig {
    /// `None` means no remote provider; cycles are built from an empty event list.
    pub provider_url: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InterpretationConfig {
    pub ttl_secs: u64,
    /// Maximum in-flight generation calls per reconcile run.
    pub concurrency: usize,
    pub generation_timeout_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for InterpretationConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_INTERPRETATION_TTL_SECS,
            concurrency: 3,
            generation_timeout_secs: 30,
            sweep_interval_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    /// Base of the live view deep links embedded in exported events.
    pub base_url: String,
    /// Right-hand side of exported `UID` values.
    pub uid_domain: String,
    pub name: String,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            uid_domain: "almanac.local".to_string(),
            name: "Solar Return Calendar".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let interpretation_defaults = InterpretationConfig::default();
        let calendar_defaults = CalendarConfig::default();

        Self {
            server: ServerConfig {
                host: env::var("ALMANAC_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("ALMANAC_PORT", 3000),
                api_keys: env::var("ALMANAC_API_KEYS")
                    .map(|keys| {
                        keys.split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "file:almanac.db".to_string()),
                auth_token: env::var("DATABASE_AUTH_TOKEN").ok(),
                local_path: env::var("DATABASE_LOCAL_PATH").ok(),
                busy_timeout_ms: parse_env_or("DATABASE_BUSY_TIMEOUT_MS", 5000),
                journal_mode: env::var("DATABASE_JOURNAL_MODE").unwrap_or_else(|_| "WAL".to_string()),
                synchronous: env::var("DATABASE_SYNCHRONOUS")
                    .unwrap_or_else(|_| "NORMAL".to_string()),
            },
            llm: env::var("LLM_MODEL").ok().map(|model| LlmConfig {
                model,
                api_key: env::var("LLM_API_KEY").ok(),
                base_url: env::var("LLM_BASE_URL").ok(),
                timeout_secs: parse_env_or("LLM_TIMEOUT", 30),
                token_url: env::var("LLM_TOKEN_URL").ok(),
                client_id: env::var("LLM_CLIENT_ID").ok(),
                client_secret: env::var("LLM_CLIENT_SECRET").ok(),
                temperature: parse_env_opt("LLM_TEMPERATURE"),
                max_tokens: parse_env_opt("LLM_MAX_TOKENS"),
            }),
            chart: ChartConfig {
                provider_url: env::var("CHART_PROVIDER_URL").ok(),
                timeout_secs: parse_env_or("CHART_PROVIDER_TIMEOUT", 20),
            },
            interpretation: InterpretationConfig {
                ttl_secs: parse_env_at_least_one(
                    "INTERPRETATION_TTL_SECS",
                    interpretation_defaults.ttl_secs,
                ),
                concurrency: parse_env_at_least_one(
                    "GENERATION_CONCURRENCY",
                    interpretation_defaults.concurrency,
                ),
                generation_timeout_secs: parse_env_at_least_one(
                    "GENERATION_TIMEOUT_SECS",
                    interpretation_defaults.generation_timeout_secs,
                ),
                sweep_interval_secs: parse_env_at_least_one(
                    "SWEEP_INTERVAL_SECS",
                    interpretation_defaults.sweep_interval_secs,
                ),
            },
            calendar: CalendarConfig {
                base_url: env::var("CALENDAR_BASE_URL").unwrap_or(calendar_defaults.base_url),
                uid_domain: env::var("CALENDAR_UID_DOMAIN")
                    .unwrap_or(calendar_defaults.uid_domain),
                name: env::var("CALENDAR_NAME").unwrap_or(calendar_defaults.name),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

/// Known LLM providers that use OpenAI-compatible APIs
pub const KNOWN_LLM_PROVIDERS: &[&str] = &["openai", "openrouter", "ollama", "lmstudio"];

/// Parse an LLM model name into (provider, model) tuple.
pub fn parse_llm_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_LLM_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    // Default to treating the whole string as a local model
    ("local", model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_interpretation_config_defaults() {
        std::env::remove_var("INTERPRETATION_TTL_SECS");
        std::env::remove_var("GENERATION_CONCURRENCY");
        std::env::remove_var("GENERATION_TIMEOUT_SECS");

        let config = Config::default();
        assert_eq!(config.interpretation.ttl_secs, DEFAULT_INTERPRETATION_TTL_SECS);
        assert_eq!(config.interpretation.concurrency, 3);
        assert_eq!(config.interpretation.generation_timeout_secs, 30);
        assert_eq!(config.interpretation.sweep_interval_secs, 3600);
    }

    #[test]
    #[serial]
    fn test_interpretation_config_from_env() {
        std::env::set_var("INTERPRETATION_TTL_SECS", "600");
        std::env::set_var("GENERATION_CONCURRENCY", "8");
        std::env::set_var("GENERATION_TIMEOUT_SECS", "4");

        let config = Config::default();
        assert_eq!(config.interpretation.ttl_secs, 600);
        assert_eq!(config.interpretation.concurrency, 8);
        assert_eq!(config.interpretation.generation_timeout_secs, 4);

        std::env::remove_var("INTERPRETATION_TTL_SECS");
        std::env::remove_var("GENERATION_CONCURRENCY");
        std::env::remove_var("GENERATION_TIMEOUT_SECS");
    }

    #[test]
    #[serial]
    fn test_zero_concurrency_is_clamped_to_one() {
        std::env::set_var("GENERATION_CONCURRENCY", "0");
        let config = Config::default();
        assert_eq!(config.interpretation.concurrency, 1);
        std::env::remove_var("GENERATION_CONCURRENCY");
    }

    #[test]
    #[serial]
    fn test_zero_ttl_and_sweep_interval_are_clamped_to_one() {
        std::env::set_var("INTERPRETATION_TTL_SECS", "0");
        std::env::set_var("SWEEP_INTERVAL_SECS", "0");
        std::env::set_var("GENERATION_TIMEOUT_SECS", "0");

        let config = Config::default();
        assert_eq!(config.interpretation.ttl_secs, 1);
        assert_eq!(config.interpretation.sweep_interval_secs, 1);
        assert_eq!(config.interpretation.generation_timeout_secs, 1);

        std::env::remove_var("INTERPRETATION_TTL_SECS");
        std::env::remove_var("SWEEP_INTERVAL_SECS");
        std::env::remove_var("GENERATION_TIMEOUT_SECS");
    }

    #[test]
    #[serial]
    fn test_invalid_value_falls_back_to_default() {
        std::env::set_var("GENERATION_TIMEOUT_SECS", "soon");
        let config = Config::default();
        assert_eq!(config.interpretation.generation_timeout_secs, 30);
        std::env::remove_var("GENERATION_TIMEOUT_SECS");
    }

    #[test]
    #[serial]
    fn test_llm_config_absent_without_model() {
        std::env::remove_var("LLM_MODEL");
        let config = Config::default();
        assert!(config.llm.is_none());
    }

    #[test]
    #[serial]
    fn test_llm_config_with_token_endpoint() {
        std::env::set_var("LLM_MODEL", "openai/gpt-4o-mini");
        std::env::set_var("LLM_TOKEN_URL", "https://auth.example.com/token");
        std::env::set_var("LLM_CLIENT_ID", "client");
        std::env::set_var("LLM_CLIENT_SECRET", "secret");

        let llm = Config::default().llm.expect("llm config should be present");
        assert_eq!(llm.model, "openai/gpt-4o-mini");
        assert_eq!(llm.token_url.as_deref(), Some("https://auth.example.com/token"));
        assert_eq!(llm.client_id.as_deref(), Some("client"));

        std::env::remove_var("LLM_MODEL");
        std::env::remove_var("LLM_TOKEN_URL");
        std::env::remove_var("LLM_CLIENT_ID");
        std::env::remove_var("LLM_CLIENT_SECRET");
    }

    #[test]
    #[serial]
    fn test_api_keys_are_trimmed_and_filtered() {
        std::env::set_var("ALMANAC_API_KEYS", " one, ,two ");
        let config = Config::default();
        assert_eq!(config.server.api_keys, vec!["one".to_string(), "two".to_string()]);
        std::env::remove_var("ALMANAC_API_KEYS");
    }

    #[test]
    fn test_parse_llm_provider_model() {
        assert_eq!(parse_llm_provider_model("openai/gpt-4o"), ("openai", "gpt-4o"));
        assert_eq!(
            parse_llm_provider_model("openrouter/anthropic/claude-3.5-sonnet"),
            ("openrouter", "anthropic/claude-3.5-sonnet")
        );
        assert_eq!(
            parse_llm_provider_model("custom/model"),
            ("local", "custom/model")
        );
    }
}
