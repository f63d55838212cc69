use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Url;
use validator::{Validate, ValidationError};

use crate::error::AppError;

#[derive(Debug, Clone, Validate)]
pub struct DatabaseConfig {
    #[validate(length(min = 1, message = "DB_HOST must not be empty"))]
    pub host: String,
    #[validate(range(min = 1, message = "DB_PORT must be a valid port"))]
    pub port: u16,
    #[validate(length(min = 1, message = "DB_USER must not be empty"))]
    pub user: String,
    pub password: String,
    #[validate(length(min = 1, message = "DB_NAME must not be empty"))]
    pub name: String,
    #[validate(range(min = 1, max = 64))]
    pub max_connections: u32,
    pub url: Option<String>,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let config = Self {
            host: env_or("DB_HOST", "localhost"),
            port: env_parse("DB_PORT", 3306)?,
            user: env_or("DB_USER", "root"),
            password: env_or("DB_PASSWORD", ""),
            name: env_or("DB_NAME", "kindergarten"),
            max_connections: env_parse("DB_MAX_CONNECTIONS", 5)?,
            url: env_opt("DATABASE_URL"),
        };
        config.validate()?;
        Ok(config)
    }

    /// `DATABASE_URL` wins over the discrete `DB_*` settings.
    pub fn connection_url(&self) -> Result<String, AppError> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }

        let mut url = Url::parse(&format!("mysql://{}:{}/{}", self.host, self.port, self.name))
            .map_err(|e| AppError::Config(format!("Invalid database address: {}", e)))?;
        url.set_username(&self.user)
            .map_err(|_| AppError::Config("Invalid DB_USER".to_string()))?;
        if !self.password.is_empty() {
            url.set_password(Some(&self.password))
                .map_err(|_| AppError::Config("Invalid DB_PASSWORD".to_string()))?;
        }

        Ok(url.to_string())
    }

    /// Connection URL with the password masked, for logs.
    pub fn display_url(&self) -> String {
        match self.connection_url() {
            Ok(raw) => match Url::parse(&raw) {
                Ok(mut url) if url.password().is_some() => {
                    let _ = url.set_password(Some("****"));
                    url.to_string()
                }
                _ => raw,
            },
            Err(_) => "<invalid>".to_string(),
        }
    }
}

#[derive(Debug, Clone, Validate)]
pub struct ApiConfig {
    #[validate(custom(function = "validate_base_url"))]
    pub base_url: String,
    #[validate(range(min = 1, max = 600))]
    pub timeout_secs: u64,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let config = Self {
            base_url: env_or("API_BASE_URL", "http://localhost:3000"),
            timeout_secs: env_parse("API_TIMEOUT_SECS", 10)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Credentials for a role: `API_<ROLE>_USERNAME` / `API_<ROLE>_PASSWORD`,
    /// falling back to `API_USERNAME` / `API_PASSWORD` for admin.
    pub fn credentials(&self, role: &str) -> Result<(String, String), AppError> {
        let prefix = format!("API_{}", role.to_uppercase());
        let username = env_opt(&format!("{}_USERNAME", prefix));
        let password = env_opt(&format!("{}_PASSWORD", prefix));

        let (username, password) = match (username, password) {
            (Some(u), Some(p)) => (u, p),
            _ if role.eq_ignore_ascii_case("admin") => (
                env_or("API_USERNAME", "admin"),
                env_opt("API_PASSWORD").ok_or_else(|| {
                    AppError::Config("API_PASSWORD or API_ADMIN_PASSWORD must be set".to_string())
                })?,
            ),
            _ => {
                return Err(AppError::Config(format!(
                    "Missing {}_USERNAME / {}_PASSWORD",
                    prefix, prefix
                )));
            }
        };

        Ok((username, password))
    }
}

#[derive(Debug, Clone)]
pub struct PathsConfig {
    pub reports_dir: PathBuf,
    pub dictionary_dir: PathBuf,
    pub source_dir: PathBuf,
    pub routes_dir: PathBuf,
}

impl PathsConfig {
    pub fn from_env() -> Self {
        Self {
            reports_dir: env_or("REPORTS_DIR", "reports").into(),
            dictionary_dir: env_or("DICTIONARY_DIR", "server/src/config/ai-dictionaries").into(),
            source_dir: env_or("SOURCE_DIR", "server/src").into(),
            routes_dir: env_or("ROUTES_DIR", "server/src/routes").into(),
        }
    }
}

#[derive(Debug, Clone, Validate)]
pub struct SeedConfig {
    #[validate(length(min = 6, message = "SEED_PASSWORD must be at least 6 characters"))]
    pub default_password: String,
    #[validate(range(min = 4, max = 31))]
    pub bcrypt_cost: u32,
}

impl SeedConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let config = Self {
            default_password: env_or("SEED_PASSWORD", "123456"),
            bcrypt_cost: env_parse("SEED_BCRYPT_COST", bcrypt::DEFAULT_COST)?,
        };
        config.validate()?;
        Ok(config)
    }
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            default_password: "123456".to_string(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub paths: PathsConfig,
    pub seed: SeedConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            database: DatabaseConfig::from_env()?,
            api: ApiConfig::from_env()?,
            paths: PathsConfig::from_env(),
            seed: SeedConfig::from_env()?,
        })
    }
}

fn validate_base_url(value: &str) -> Result<(), ValidationError> {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(ValidationError::new("base_url")
            .with_message("API_BASE_URL must be an http(s) URL".into())),
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match env_opt(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::Config(format!("{} has an invalid value: {}", key, raw))),
        None => Ok(default),
    }
}
