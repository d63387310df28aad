use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Prefix every API route is nested under, e.g. `/api/v2`.
    pub root_path: String,
    /// Tokio worker threads; `0` means one per CPU.
    pub max_threads: usize,
    /// Upper bound on handling one request; `0` disables the timeout.
    pub request_timeout_secs: u64,
    pub debug: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub enable: bool,
    pub max_requests: u64,
    pub window_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiAuthConfig {
    pub enforce_key: bool,
    pub enforce_ip: bool,
    pub key: String,
    pub ip_list_file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyConfig {
    pub enforce_ban: bool,
    pub enforce_map: bool,
    pub enforce_sc: bool,
    pub map_list_file: String,
    pub ban_list_file: String,
    pub admin_list_file: String,
    pub sc_hash: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub dir: String,
    /// Daily log files kept on disk; `0` keeps every file.
    pub max_files: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub rate_limit: RateLimitConfig,
    pub api_auth: ApiAuthConfig,
    pub verify: VerifyConfig,
    pub log: LogConfig,
}

const DEFAULTS: &str = include_str!("../config/default.toml");

impl Default for AppConfig {
    fn default() -> Self {
        // Fallback: parse the embedded default TOML
        match ::config::Config::builder()
            .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
            .build()
        {
            Ok(cfg) => match cfg.try_deserialize() {
                Ok(app_cfg) => app_cfg,
                Err(e) => {
                    eprintln!("FATAL: Failed to deserialize default config: {}", e);
                    panic!("Failed to deserialize default config: {}", e);
                }
            },
            Err(e) => {
                eprintln!("FATAL: Failed to parse default config: {}", e);
                panic!("Failed to parse default config: {}", e);
            }
        }
    }
}

/// Loads the configuration: embedded defaults -> `nexus.toml` -> explicit file -> env.
///
/// The explicit file comes from `custom_path` (the `--config` flag) or, when absent,
/// from the `NEXUS_CONFIG` environment variable.
pub fn load(custom_path: Option<&Path>) -> anyhow::Result<AppConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();

    let mut builder = ::config::Config::builder()
        .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
        .add_source(::config::File::with_name("nexus").required(false));

    match custom_path {
        Some(path) => {
            builder = builder.add_source(::config::File::new(
                &path.to_string_lossy(),
                ::config::FileFormat::Toml,
            ));
        }
        None => {
            if let Ok(env_path) = std::env::var("NEXUS_CONFIG") {
                builder = builder.add_source(::config::File::with_name(&env_path).required(false));
            }
        }
    }
    // Environment variables last to have highest precedence
    builder = builder.add_source(::config::Environment::with_prefix("NEXUS").separator("__"));

    let cfg = builder.build()?;
    let app_cfg: AppConfig = cfg.try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

pub fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    if cfg.server.port == 0 {
        return Err(anyhow::anyhow!("invalid server.port: {}", cfg.server.port));
    }
    if !cfg.server.root_path.starts_with('/') {
        return Err(anyhow::anyhow!("server.root_path must start with '/': {}", cfg.server.root_path));
    }

    // A zero window has no defined reset behaviour; refuse to start.
    if cfg.rate_limit.window_secs == 0 {
        return Err(anyhow::anyhow!("rate_limit.window_secs must be > 0"));
    }

    if cfg.api_auth.enforce_key && cfg.api_auth.key.is_empty() {
        return Err(anyhow::anyhow!("api_auth.key must be set when api_auth.enforce_key is on"));
    }
    if cfg.api_auth.enforce_ip && cfg.api_auth.ip_list_file.trim().is_empty() {
        return Err(anyhow::anyhow!("api_auth.ip_list_file must be set when api_auth.enforce_ip is on"));
    }
    if cfg.verify.enforce_map && cfg.verify.map_list_file.trim().is_empty() {
        return Err(anyhow::anyhow!("verify.map_list_file must be set when verify.enforce_map is on"));
    }
    if cfg.verify.enforce_ban && cfg.verify.ban_list_file.trim().is_empty() {
        return Err(anyhow::anyhow!("verify.ban_list_file must be set when verify.enforce_ban is on"));
    }

    Ok(())
}

/// Non-fatal configuration remarks, logged by `main` once logging is up.
pub fn startup_warnings(cfg: &AppConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    if cfg!(unix) && cfg.server.port < 1024 {
        warnings.push(format!("Using privileged port {} - may require elevated permissions", cfg.server.port));
    }
    if cfg.server.debug {
        warnings.push("Running in debug mode, do not use in production!".to_string());
    }
    warnings
}

pub fn ensure_sqlite_parent_dir(url: &str) -> anyhow::Result<()> {
    if let Some(path) = url.strip_prefix("sqlite://") {
        let p = Path::new(path);
        if let Some(parent) = p.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }
    Ok(())
}
