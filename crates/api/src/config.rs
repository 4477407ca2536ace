//! Process configuration, read once at startup.

use core::fmt;
use core::str::FromStr;
use std::path::PathBuf;

use anyhow::{bail, Context};
use tracing::warn;

const DEV_JWT_SECRET: &str = "dev-secret";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_STATIC_ROOT: &str = ".";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Platform {
    Dev,
    #[default]
    Prod,
}

impl Platform {
    pub fn is_dev(self) -> bool {
        self == Platform::Dev
    }
}

impl FromStr for Platform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" => Ok(Platform::Dev),
            "prod" | "" => Ok(Platform::Prod),
            other => bail!("unknown PLATFORM '{other}' (expected 'dev' or 'prod')"),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub jwt_secret: String,
    pub polka_key: String,
    pub platform: Platform,
    pub port: u16,
    pub database_url: Option<String>,
    /// Directory served under `/app/`.
    pub static_root: PathBuf,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("jwt_secret", &"<redacted>")
            .field("polka_key", &"<redacted>")
            .field("platform", &self.platform)
            .field("port", &self.port)
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("static_root", &self.static_root)
            .finish()
    }
}

impl ApiConfig {
    /// Read `JWT_SECRET`, `POLKA_KEY`, `PLATFORM`, `PORT`, `DATABASE_URL` and
    /// `STATIC_ROOT`.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let platform = match get("PLATFORM") {
            Some(v) => v.parse::<Platform>()?,
            None => Platform::default(),
        };

        let jwt_secret = match (get("JWT_SECRET"), platform) {
            (Some(secret), _) => secret,
            (None, Platform::Dev) => {
                warn!("JWT_SECRET not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            }
            (None, Platform::Prod) => bail!("JWT_SECRET must be set outside the dev platform"),
        };

        let polka_key = match (get("POLKA_KEY"), platform) {
            (Some(key), _) => key,
            (None, Platform::Dev) => {
                warn!("POLKA_KEY not set; webhook calls will be rejected");
                String::new()
            }
            (None, Platform::Prod) => bail!("POLKA_KEY must be set outside the dev platform"),
        };

        let port = match get("PORT") {
            Some(v) => v
                .trim()
                .parse::<u16>()
                .with_context(|| format!("PORT '{v}' is not a valid port"))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            jwt_secret,
            polka_key,
            platform,
            port,
            database_url: get("DATABASE_URL"),
            static_root: get("STATIC_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_ROOT)),
        })
    }

    /// Dev-platform config with the given secrets, in-memory storage, and an
    /// ephemeral port.
    pub fn for_tests(jwt_secret: impl Into<String>, polka_key: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            polka_key: polka_key.into(),
            platform: Platform::Dev,
            port: 0,
            database_url: None,
            static_root: PathBuf::from(DEFAULT_STATIC_ROOT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn prod_requires_secrets() {
        let err = ApiConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));

        let err = ApiConfig::from_lookup(lookup(&[("JWT_SECRET", "s")])).unwrap_err();
        assert!(err.to_string().contains("POLKA_KEY"));
    }

    #[test]
    fn dev_falls_back_to_defaults() {
        let cfg = ApiConfig::from_lookup(lookup(&[("PLATFORM", "dev")])).unwrap();
        assert_eq!(cfg.platform, Platform::Dev);
        assert_eq!(cfg.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(cfg.polka_key, "");
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.static_root, PathBuf::from("."));
    }

    #[test]
    fn explicit_values_win() {
        let cfg = ApiConfig::from_lookup(lookup(&[
            ("JWT_SECRET", "jwt"),
            ("POLKA_KEY", "polka"),
            ("PORT", "9000"),
            ("DATABASE_URL", "postgres://localhost/chirpy"),
            ("STATIC_ROOT", "/srv/chirpy"),
        ]))
        .unwrap();
        assert_eq!(cfg.platform, Platform::Prod);
        assert_eq!(cfg.jwt_secret, "jwt");
        assert_eq!(cfg.polka_key, "polka");
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/chirpy"));
        assert_eq!(cfg.static_root, PathBuf::from("/srv/chirpy"));
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(ApiConfig::from_lookup(lookup(&[("PLATFORM", "staging")])).is_err());
        assert!(ApiConfig::from_lookup(lookup(&[("PLATFORM", "dev"), ("PORT", "eighty")])).is_err());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let cfg = ApiConfig::for_tests("super-secret-jwt", "super-secret-polka");
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("super-secret"));
    }
}
