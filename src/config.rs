use std::path::Path;

use serde::Deserialize;

/// Secret shipped in `config/default.toml`. Only meant for local development.
pub const DEV_JWT_SECRET: &str = "yamdb-dev-secret-change-me";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_ttl_minutes: i64,
    pub confirmation_code_ttl_minutes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailBackend {
    /// Log outgoing mail instead of sending it.
    Console,
    Smtp,
    /// Keep outgoing mail in an in-process outbox.
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub backend: EmailBackend,
    pub from_address: String,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    pub page_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_seconds: u64,
    pub auth_max_requests: usize,
    pub auth_window_seconds: u64,
    /// Key clients by `X-Forwarded-For` / `X-Real-IP`. Only enable behind a proxy that sets them.
    #[serde(default)]
    pub trust_proxy_headers: bool,
}

/// Admin account created at startup when both fields are set.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct BootstrapConfig {
    pub admin_username: Option<String>,
    pub admin_email: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SecurityConfig {
    pub enable_hsts: Option<bool>,
    pub hsts_max_age: Option<u64>,
    pub hsts_include_subdomains: Option<bool>,
    pub csp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub email: EmailConfig,
    pub pagination: PaginationConfig,
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
    pub security: Option<SecurityConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        // Fallback: parse the embedded default TOML
        let defaults: &str = include_str!("../config/default.toml");
        match ::config::Config::builder()
            .add_source(::config::File::from_str(defaults, ::config::FileFormat::Toml))
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

pub fn load() -> anyhow::Result<AppConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();

    let defaults: &str = include_str!("../config/default.toml");
    let mut builder = ::config::Config::builder()
        .add_source(::config::File::from_str(defaults, ::config::FileFormat::Toml))
        // Optional local file: yamdb.toml (in CWD)
        .add_source(::config::File::with_name("yamdb").required(false));

    if let Ok(custom_path) = std::env::var("YAMDB_CONFIG") {
        builder = builder.add_source(::config::File::with_name(&custom_path).required(false));
    }
    // Environment variables last to have highest precedence
    builder = builder.add_source(::config::Environment::with_prefix("YAMDB").separator("__"));

    let cfg = builder.build()?;
    let app_cfg: AppConfig = cfg.try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

pub fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    // Server
    if cfg.server.port == 0 {
        return Err(anyhow::anyhow!("invalid server.port: {}", cfg.server.port));
    }
    #[cfg(unix)]
    if cfg.server.port < 1024 {
        tracing::warn!("Using privileged port {} - may require elevated permissions", cfg.server.port);
    }

    // Auth
    if cfg.auth.jwt_secret.trim().is_empty() {
        return Err(anyhow::anyhow!("auth.jwt_secret must not be empty"));
    }
    if cfg.auth.jwt_secret == DEV_JWT_SECRET {
        tracing::warn!("auth.jwt_secret is the built-in development secret; set YAMDB__AUTH__JWT_SECRET");
    }
    if cfg.auth.access_token_ttl_minutes <= 0 {
        return Err(anyhow::anyhow!("auth.access_token_ttl_minutes must be > 0"));
    }
    if cfg.auth.confirmation_code_ttl_minutes <= 0 {
        return Err(anyhow::anyhow!("auth.confirmation_code_ttl_minutes must be > 0"));
    }

    // Email
    if cfg.email.backend == EmailBackend::Smtp
        && cfg.email.smtp_host.as_deref().map(str::trim).unwrap_or("").is_empty()
    {
        return Err(anyhow::anyhow!("email.smtp_host is required when email.backend = \"smtp\""));
    }
    if cfg.email.from_address.parse::<lettre::Address>().is_err() {
        return Err(anyhow::anyhow!("email.from_address is not a valid address: {}", cfg.email.from_address));
    }

    // Pagination
    if cfg.pagination.page_size == 0 || cfg.pagination.page_size > 1000 {
        return Err(anyhow::anyhow!("pagination.page_size must be in 1..=1000"));
    }

    // Rate limits
    if cfg.rate_limit.max_requests == 0 || cfg.rate_limit.auth_max_requests == 0 {
        return Err(anyhow::anyhow!("rate_limit request counts must be > 0"));
    }
    if cfg.rate_limit.window_seconds == 0 || cfg.rate_limit.auth_window_seconds == 0 {
        return Err(anyhow::anyhow!("rate_limit windows must be > 0"));
    }

    Ok(())
}

pub fn ensure_sqlite_parent_dir(url: &str) -> anyhow::Result<()> {
    if let Some(path) = url.strip_prefix("sqlite://") {
        // sqlite:///C:/... on Windows
        #[cfg(windows)]
        let path = {
            let bytes = path.as_bytes();
            if bytes.len() >= 3 && bytes[0] == b'/' && bytes[2] == b':' && bytes[1].is_ascii_alphabetic() {
                &path[1..]
            } else {
                path
            }
        };
        let path = path.split('?').next().unwrap_or(path);
        let p = Path::new(path);
        if let Some(parent) = p.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }
    Ok(())
}
