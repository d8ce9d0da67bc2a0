#[cfg(test)]
mod tests {
    use crate::config::{self, AppConfig, EmailBackend, DEV_JWT_SECRET};
    use std::env;

    #[test]
    fn test_default_config() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.port, 8000);
        assert_eq!(cfg.database.url, "sqlite://data/yamdb.db");
        assert_eq!(cfg.auth.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(cfg.auth.confirmation_code_ttl_minutes, 3 * 24 * 60);
        assert_eq!(cfg.email.backend, EmailBackend::Console);
        assert_eq!(cfg.pagination.page_size, 10);
        assert!(!cfg.rate_limit.trust_proxy_headers);
        assert!(cfg.bootstrap.admin_username.is_none());
        assert!(cfg.security.is_none());
        assert!(config::validate(&cfg).is_ok());
    }

    #[test]
    fn test_env_overrides_defaults() {
        env::set_var("YAMDB__PAGINATION__PAGE_SIZE", "25");
        env::set_var("YAMDB__BOOTSTRAP__ADMIN_USERNAME", "root");
        let result = config::load();
        env::remove_var("YAMDB__PAGINATION__PAGE_SIZE");
        env::remove_var("YAMDB__BOOTSTRAP__ADMIN_USERNAME");

        let cfg = result.unwrap();
        assert_eq!(cfg.pagination.page_size, 25);
        assert_eq!(cfg.bootstrap.admin_username.as_deref(), Some("root"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut cfg = AppConfig::default();
        cfg.server.port = 0;
        assert!(config::validate(&cfg).unwrap_err().to_string().contains("server.port"));

        let mut cfg = AppConfig::default();
        cfg.auth.jwt_secret = "   ".to_string();
        assert!(config::validate(&cfg).is_err());

        let mut cfg = AppConfig::default();
        cfg.auth.confirmation_code_ttl_minutes = 0;
        assert!(config::validate(&cfg).is_err());

        let mut cfg = AppConfig::default();
        cfg.pagination.page_size = 0;
        assert!(config::validate(&cfg).is_err());

        let mut cfg = AppConfig::default();
        cfg.email.from_address = "nobody".to_string();
        assert!(config::validate(&cfg).is_err());
    }

    #[test]
    fn test_smtp_backend_requires_host() {
        let mut cfg = AppConfig::default();
        cfg.email.backend = EmailBackend::Smtp;
        assert!(config::validate(&cfg).unwrap_err().to_string().contains("smtp_host"));

        cfg.email.smtp_host = Some("smtp.example.com".to_string());
        assert!(config::validate(&cfg).is_ok());
    }

    #[test]
    fn test_ensure_sqlite_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("yamdb.db");
        let url = format!("sqlite://{}", db_path.display());

        config::ensure_sqlite_parent_dir(&url).unwrap();
        assert!(dir.path().join("nested").is_dir());
        // Non-file URLs are left alone
        config::ensure_sqlite_parent_dir("sqlite::memory:").unwrap();
    }
}
