use std::{env, fmt, net::SocketAddr, path::PathBuf};

use super::server_bind_address;

/// Application runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }

    /// Returns `true` when the current environment should behave as development.
    pub fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    /// Returns the canonical name used for logging/metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

/// Tunables for a single audit pass over the bookmark tree.
#[derive(Debug, Clone)]
pub struct AuditSettings {
    /// Pixel size requested from the favicon cache and used for the raster
    /// surface. The cache convention and the classifier must agree on it.
    pub icon_size_px: u32,
    /// Upper bound on the number of distinct HTTPS hostnames audited.
    pub domain_limit: usize,
    /// Deadline for the background-tab favicon discovery race.
    pub recovery_timeout_ms: u64,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            icon_size_px: 16,
            domain_limit: 100,
            recovery_timeout_ms: 5000,
        }
    }
}

/// Runtime configuration resolved from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub environment: Environment,
    pub audit: AuditSettings,
    /// Optional Chrome `Bookmarks` JSON export to audit instead of the
    /// built-in sample tree.
    pub bookmarks_file: Option<PathBuf>,
}

impl AppConfig {
    /// Constructs the configuration by reading and validating environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_value = env::var("FAVLENS_ENV").unwrap_or_else(|_| "development".to_string());
        let environment = Environment::from_str(&env_value)?;
        let bind_addr = server_bind_address().map_err(ConfigError::BindAddress)?;

        let defaults = AuditSettings::default();
        let audit = AuditSettings {
            icon_size_px: read_number("FAVLENS_ICON_SIZE_PX", defaults.icon_size_px)?,
            domain_limit: read_number("FAVLENS_DOMAIN_LIMIT", defaults.domain_limit)?,
            recovery_timeout_ms: read_number(
                "FAVLENS_RECOVERY_TIMEOUT_MS",
                defaults.recovery_timeout_ms,
            )?,
        };
        if audit.icon_size_px == 0 {
            return Err(ConfigError::InvalidNumber {
                var: "FAVLENS_ICON_SIZE_PX",
                value: "0".to_string(),
            });
        }

        let bookmarks_file = env::var("FAVLENS_BOOKMARKS_FILE").ok().map(PathBuf::from);

        Ok(Self {
            bind_addr,
            environment,
            audit,
            bookmarks_file,
        })
    }
}

fn read_number<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidNumber {
            var,
            value: raw.clone(),
        }),
        Err(_) => Ok(default),
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    InvalidEnvironment(String),
    BindAddress(std::net::AddrParseError),
    InvalidNumber { var: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnvironment(value) => write!(
                f,
                "FAVLENS_ENV must be one of 'development', 'production', or 'test' (got {value})"
            ),
            Self::BindAddress(err) => write!(f, "invalid FAVLENS_BIND_ADDR value: {err}"),
            Self::InvalidNumber { var, value } => {
                write!(f, "{var} must be a positive number (got {value})")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_BIND_ADDR;
    use std::sync::{LazyLock, Mutex};

    static ENV_GUARD: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

    fn clear_env() {
        for var in [
            "FAVLENS_ENV",
            "FAVLENS_BIND_ADDR",
            "FAVLENS_ICON_SIZE_PX",
            "FAVLENS_DOMAIN_LIMIT",
            "FAVLENS_RECOVERY_TIMEOUT_MS",
            "FAVLENS_BOOKMARKS_FILE",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn loads_defaults_in_development() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        clear_env();

        let config = AppConfig::from_env().expect("config should load with defaults");
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.audit.icon_size_px, 16);
        assert_eq!(config.audit.domain_limit, 100);
        assert_eq!(config.audit.recovery_timeout_ms, 5000);
        assert!(config.bookmarks_file.is_none());
    }

    #[test]
    fn rejects_invalid_environment() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        clear_env();
        env::set_var("FAVLENS_ENV", "invalid");

        let err = AppConfig::from_env().expect_err("invalid env should error");
        assert!(matches!(err, ConfigError::InvalidEnvironment(value) if value == "invalid"));

        env::remove_var("FAVLENS_ENV");
    }

    #[test]
    fn reads_audit_tunables_from_env() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        clear_env();
        env::set_var("FAVLENS_ICON_SIZE_PX", "32");
        env::set_var("FAVLENS_DOMAIN_LIMIT", "7");
        env::set_var("FAVLENS_RECOVERY_TIMEOUT_MS", "250");
        env::set_var("FAVLENS_BOOKMARKS_FILE", "/tmp/Bookmarks");

        let config = AppConfig::from_env().expect("config should load");
        assert_eq!(config.audit.icon_size_px, 32);
        assert_eq!(config.audit.domain_limit, 7);
        assert_eq!(config.audit.recovery_timeout_ms, 250);
        assert_eq!(
            config.bookmarks_file.as_deref(),
            Some(std::path::Path::new("/tmp/Bookmarks"))
        );

        clear_env();
    }

    #[test]
    fn rejects_zero_icon_size() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        clear_env();
        env::set_var("FAVLENS_ICON_SIZE_PX", "0");

        let err = AppConfig::from_env().expect_err("zero icon size should error");
        assert!(matches!(
            err,
            ConfigError::InvalidNumber {
                var: "FAVLENS_ICON_SIZE_PX",
                ..
            }
        ));

        env::remove_var("FAVLENS_ICON_SIZE_PX");
    }
}
