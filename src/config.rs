use std::path::PathBuf;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// `None` runs the service on the in-memory stores.
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub cors_origin: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = get("JWT_SECRET").context("JWT_SECRET must be set")?;
        anyhow::ensure!(!secret.trim().is_empty(), "JWT_SECRET must not be empty");

        let ttl_minutes = parse_or(&get, "JWT_TTL_MINUTES", 60i64)?;
        anyhow::ensure!(ttl_minutes > 0, "JWT_TTL_MINUTES must be positive");

        Ok(Self {
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&get, "APP_PORT", 8080u16)?,
            database_url: get("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            jwt: JwtConfig {
                secret,
                ttl_minutes,
            },
            storage: StorageConfig {
                upload_dir: get("UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("static/images")),
                max_upload_bytes: parse_or(&get, "MAX_UPLOAD_BYTES", 20 * 1024 * 1024usize)?,
            },
            cors_origin: get("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:5173".into()),
        })
    }
}

fn parse_or<F, T>(get: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let cfg = AppConfig::from_lookup(lookup(&[("JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 8080);
        assert!(cfg.database_url.is_none());
        assert_eq!(cfg.jwt.ttl_minutes, 60);
        assert_eq!(cfg.storage.upload_dir, PathBuf::from("static/images"));
        assert_eq!(cfg.storage.max_upload_bytes, 20 * 1024 * 1024);
        assert_eq!(cfg.cors_origin, "http://localhost:5173");
    }

    #[test]
    fn missing_or_blank_secret_is_fatal() {
        assert!(AppConfig::from_lookup(lookup(&[])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("JWT_SECRET", "   ")])).is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("JWT_SECRET", "k"),
            ("APP_PORT", "9000"),
            ("JWT_TTL_MINUTES", "15"),
            ("DATABASE_URL", "postgres://localhost/pix"),
            ("UPLOAD_DIR", "/tmp/uploads"),
        ]))
        .unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.jwt.ttl_minutes, 15);
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/pix"));
        assert_eq!(cfg.storage.upload_dir, PathBuf::from("/tmp/uploads"));
    }

    #[test]
    fn garbage_numbers_are_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("JWT_SECRET", "k"), ("APP_PORT", "http")]))
            .unwrap_err();
        assert!(err.to_string().contains("APP_PORT"));

        assert!(AppConfig::from_lookup(lookup(&[("JWT_SECRET", "k"), ("JWT_TTL_MINUTES", "0")]))
            .is_err());
    }
}
