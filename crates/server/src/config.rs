use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub storage_path: String,
    pub jwt_secret: String,
    pub jwt_ttl_days: i64,
    /// Upload-layer cap on a single payload, independent of plan limits.
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: "sqlite:./data/casefile.db?mode=rwc".to_string(),
            storage_path: "./data/documents".to_string(),
            jwt_secret: "development-secret-change-in-production".to_string(),
            jwt_ttl_days: 7,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(default.port),
            database_url: env::var("DATABASE_URL").unwrap_or(default.database_url),
            storage_path: env::var("STORAGE_PATH").unwrap_or(default.storage_path),
            jwt_secret: env::var("JWT_SECRET").unwrap_or(default.jwt_secret),
            jwt_ttl_days: env::var("JWT_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|days| *days > 0)
                .unwrap_or(default.jwt_ttl_days),
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_upload_bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.jwt_ttl_days, 7);
        assert_eq!(config.max_upload_bytes, 50 * 1024 * 1024);
        assert!(config.database_url.starts_with("sqlite:"));
    }
}
