use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use foodie_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

struct FieldSources<'a> {
    overrides: &'a ConfigOverrides,
    doc: Option<&'a Value>,
    path: Option<&'a Path>,
}

pub fn run(options: &LoadOptions) -> String {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let sources = FieldSources {
        overrides: &options.overrides,
        doc: config_file_doc.as_ref(),
        path: config_file_path.as_deref(),
    };

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];

    let api_key = config
        .llm
        .api_key
        .as_ref()
        .map(|key| redact_token(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());
    lines.push(render_line(
        "llm.api_key",
        &api_key,
        sources.field("llm.api_key", &["FOODIE_LLM_API_KEY", "GROQ_API_KEY"]),
    ));
    lines.push(render_line(
        "llm.base_url",
        &config.llm.base_url,
        sources.field("llm.base_url", &["FOODIE_LLM_BASE_URL"]),
    ));
    lines.push(render_line(
        "llm.model",
        &config.llm.model,
        sources.field("llm.model", &["FOODIE_LLM_MODEL"]),
    ));
    lines.push(render_line(
        "llm.temperature",
        &config.llm.temperature.to_string(),
        sources.field("llm.temperature", &["FOODIE_LLM_TEMPERATURE"]),
    ));
    lines.push(render_line(
        "llm.max_tokens",
        &config.llm.max_tokens.to_string(),
        sources.field("llm.max_tokens", &["FOODIE_LLM_MAX_TOKENS"]),
    ));
    lines.push(render_line(
        "llm.timeout_secs",
        &config.llm.timeout_secs.to_string(),
        sources.field("llm.timeout_secs", &["FOODIE_LLM_TIMEOUT_SECS"]),
    ));
    lines.push(render_line(
        "llm.max_attempts",
        &config.llm.max_attempts.to_string(),
        sources.field("llm.max_attempts", &["FOODIE_LLM_MAX_ATTEMPTS"]),
    ));
    lines.push(render_line(
        "llm.base_delay_ms",
        &config.llm.base_delay_ms.to_string(),
        sources.field("llm.base_delay_ms", &["FOODIE_LLM_BASE_DELAY_MS"]),
    ));
    lines.push(render_line(
        "llm.min_request_interval_ms",
        &config.llm.min_request_interval_ms.to_string(),
        sources.field("llm.min_request_interval_ms", &["FOODIE_LLM_MIN_REQUEST_INTERVAL_MS"]),
    ));
    lines.push(render_line(
        "llm.rate_limit_warning_threshold",
        &config.llm.rate_limit_warning_threshold.to_string(),
        sources.field(
            "llm.rate_limit_warning_threshold",
            &["FOODIE_LLM_RATE_LIMIT_WARNING_THRESHOLD"],
        ),
    ));

    let menu_path = config
        .menu
        .path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<builtin>".to_string());
    lines.push(render_line(
        "menu.path",
        &menu_path,
        sources.field("menu.path", &["FOODIE_MENU_PATH"]),
    ));

    let history_window = match config.session.history_window() {
        Some(window) => window.to_string(),
        None => "unbounded".to_string(),
    };
    lines.push(render_line(
        "session.history_window",
        &history_window,
        sources.field("session.history_window", &["FOODIE_SESSION_HISTORY_WINDOW"]),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        sources.field("logging.level", &["FOODIE_LOGGING_LEVEL", "FOODIE_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        sources.field("logging.format", &["FOODIE_LOGGING_FORMAT", "FOODIE_LOG_FORMAT"]),
    ));

    lines.join("\n")
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    let root = PathBuf::from("foodie.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/foodie.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

impl FieldSources<'_> {
    fn field(&self, key_path: &str, env_keys: &[&str]) -> String {
        if self.flagged(key_path) {
            return "flag".to_string();
        }

        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = self.doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .path
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }

    fn flagged(&self, key_path: &str) -> bool {
        let overrides = self.overrides;
        match key_path {
            "llm.api_key" => overrides.llm_api_key.is_some(),
            "llm.base_url" => overrides.llm_base_url.is_some(),
            "llm.model" => overrides.llm_model.is_some(),
            "menu.path" => overrides.menu_path.is_some(),
            "session.history_window" => overrides.history_window.is_some(),
            "logging.level" => overrides.log_level.is_some(),
            _ => false,
        }
    }
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps a provider prefix such as `gsk_` and hides the rest.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once(|c: char| c == '_' || c == '-') {
        if !prefix.is_empty() && prefix.len() <= 8 {
            return format!("{prefix}_***");
        }
    }

    "<redacted>".to_string()
}
