use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::error::DoughError;

pub const PLAID_SANDBOX_URL: &str = "https://sandbox.plaid.com";
pub const PLAID_DEVELOPMENT_URL: &str = "https://development.plaid.com";
pub const PLAID_PRODUCTION_URL: &str = "https://production.plaid.com";

/// Process configuration, read once at startup and injected from there on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub listen_addr: String,
    pub loglevel: String,
    /// Key material for the private session cookie; at least 64 bytes.
    pub session_secret: String,
    pub plaid: PlaidConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaidEnvironment {
    Sandbox,
    Development,
    Production,
}

impl PlaidEnvironment {
    pub fn base_url(self) -> &'static str {
        match self {
            Self::Sandbox => PLAID_SANDBOX_URL,
            Self::Development => PLAID_DEVELOPMENT_URL,
            Self::Production => PLAID_PRODUCTION_URL,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaidConfig {
    pub env: PlaidEnvironment,
    pub client_id: String,
    pub sandbox_secret: Option<String>,
    pub dev_secret: Option<String>,
    pub production_secret: Option<String>,
    /// Required by OAuth institutions; sent with every link token request when set.
    /// Kept verbatim: Plaid matches it exactly against the dashboard allow-list.
    pub redirect_uri: Option<String>,
    /// Overrides the environment's base URL (proxies, local fakes).
    pub base_url: Option<Url>,
    pub client_name: String,
    pub language: String,
    pub country_codes: Vec<String>,
    pub products: Vec<String>,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
}

impl Default for PlaidConfig {
    fn default() -> Self {
        Self {
            env: PlaidEnvironment::Sandbox,
            client_id: String::new(),
            sandbox_secret: None,
            dev_secret: None,
            production_secret: None,
            redirect_uri: None,
            base_url: None,
            client_name: "dough".to_string(),
            language: "en".to_string(),
            country_codes: vec!["US".to_string()],
            products: vec!["auth".to_string()],
            connect_timeout_secs: 5,
            timeout_secs: 15,
        }
    }
}

impl PlaidConfig {
    /// Secret matching the selected environment. Production falls back to the
    /// development secret when no dedicated one is configured.
    pub fn secret(&self) -> Option<&str> {
        match self.env {
            PlaidEnvironment::Sandbox => self.sandbox_secret.as_deref(),
            PlaidEnvironment::Development => self.dev_secret.as_deref(),
            PlaidEnvironment::Production => self
                .production_secret
                .as_deref()
                .or(self.dev_secret.as_deref()),
        }
    }

    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.as_str().trim_end_matches('/').to_string(),
            None => self.env.base_url().to_string(),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:dough.sqlite".to_string(),
            listen_addr: "0.0.0.0:8000".to_string(),
            loglevel: "info".to_string(),
            session_secret: String::new(),
            plaid: PlaidConfig::default(),
        }
    }
}

impl Config {
    /// Layer defaults, top-level env vars and `PLAID_*` env vars.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::raw().only(&[
                "database_url",
                "listen_addr",
                "loglevel",
                "session_secret",
            ]))
            .merge(Env::prefixed("PLAID_").map(|key| format!("plaid.{}", key.as_str()).into()))
    }

    pub fn load() -> Result<Self, DoughError> {
        let cfg: Config = Self::figment().extract().map_err(Box::new)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), DoughError> {
        if self.plaid.client_id.is_empty() {
            return Err(DoughError::Config("PLAID_CLIENT_ID is not set".to_string()));
        }
        if self.plaid.secret().is_none() {
            return Err(DoughError::Config(format!(
                "no Plaid secret configured for the {:?} environment",
                self.plaid.env
            )));
        }
        if let Some(uri) = self.plaid.redirect_uri.as_deref() {
            Url::parse(uri).map_err(|e| {
                DoughError::Config(format!("PLAID_REDIRECT_URI {uri:?} is not a URL: {e}"))
            })?;
        }
        if self.session_secret.len() < 64 {
            return Err(DoughError::Config(
                "SESSION_SECRET must be at least 64 bytes".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_follows_environment() {
        let mut plaid = PlaidConfig {
            sandbox_secret: Some("sb".into()),
            dev_secret: Some("dev".into()),
            ..PlaidConfig::default()
        };
        assert_eq!(plaid.secret(), Some("sb"));

        plaid.env = PlaidEnvironment::Development;
        assert_eq!(plaid.secret(), Some("dev"));

        plaid.env = PlaidEnvironment::Production;
        assert_eq!(plaid.secret(), Some("dev"));
        plaid.production_secret = Some("prod".into());
        assert_eq!(plaid.secret(), Some("prod"));
    }

    #[test]
    fn base_url_override_wins() {
        let mut plaid = PlaidConfig::default();
        assert_eq!(plaid.base_url(), PLAID_SANDBOX_URL);

        plaid.base_url = Some(Url::parse("http://127.0.0.1:9000/").unwrap());
        assert_eq!(plaid.base_url(), "http://127.0.0.1:9000");
    }

    #[test]
    fn figment_reads_plaid_env_vars() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("PLAID_ENV", "development");
            jail.set_env("PLAID_CLIENT_ID", "client-123");
            jail.set_env("PLAID_DEV_SECRET", "dev-secret");
            jail.set_env("DATABASE_URL", "sqlite::memory:");

            let cfg: Config = Config::figment().extract()?;
            assert_eq!(cfg.plaid.env, PlaidEnvironment::Development);
            assert_eq!(cfg.plaid.client_id, "client-123");
            assert_eq!(cfg.plaid.secret(), Some("dev-secret"));
            assert_eq!(cfg.database_url, "sqlite::memory:");
            assert_eq!(cfg.plaid.client_name, "dough");
            Ok(())
        });
    }

    #[test]
    fn validate_rejects_short_session_secret() {
        let cfg = Config {
            session_secret: "short".into(),
            plaid: PlaidConfig {
                client_id: "id".into(),
                sandbox_secret: Some("sb".into()),
                ..PlaidConfig::default()
            },
            ..Config::default()
        };
        assert!(matches!(cfg.validate(), Err(DoughError::Config(_))));
    }

    #[test]
    fn validate_checks_redirect_uri() {
        let mut cfg = Config {
            session_secret: "s".repeat(64),
            plaid: PlaidConfig {
                client_id: "id".into(),
                sandbox_secret: Some("sb".into()),
                redirect_uri: Some("not a url".into()),
                ..PlaidConfig::default()
            },
            ..Config::default()
        };
        assert!(matches!(cfg.validate(), Err(DoughError::Config(_))));

        cfg.plaid.redirect_uri = Some("https://dough.test".into());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn redirect_uri_is_read_verbatim() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("PLAID_REDIRECT_URI", "https://dough.test");
            let cfg: Config = Config::figment().extract()?;
            assert_eq!(cfg.plaid.redirect_uri.as_deref(), Some("https://dough.test"));
            Ok(())
        });
    }
}
