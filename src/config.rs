/// Configuration management for SASM-IMS
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub email: Option<EmailConfig>,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
    /// Origin allowed to call the API (the SPA)
    pub app_origin: String,
    pub upload_limit: usize,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
    pub upload_directory: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Domain attribute for the auth cookies; None for host-only cookies
    pub cookie_domain: Option<String>,
    /// Set the Secure flag on auth cookies
    pub cookie_secure: bool,
    /// Session lifetime in days
    pub session_ttl_days: i64,
    /// Access token lifetime in minutes
    pub access_ttl_minutes: i64,
    /// Allow unauthenticated signup of hr/office accounts (bootstrap only)
    pub allow_privileged_signup: bool,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("SASM_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("SASM_PORT")
            .unwrap_or_else(|_| "4000".to_string())
            .parse()
            .map_err(|_| AppError::Validation("Invalid port number".to_string()))?;
        let version = env::var("SASM_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let app_origin = env::var("SASM_APP_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:5173".to_string());
        let upload_limit = env::var("SASM_UPLOAD_LIMIT")
            .unwrap_or_else(|_| "5242880".to_string())
            .parse()
            .unwrap_or(5242880);

        let data_directory: PathBuf = env::var("SASM_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("SASM_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("sasm.sqlite"));
        let upload_directory = env::var("SASM_UPLOAD_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("uploads"));

        let jwt_secret = env::var("SASM_JWT_SECRET")
            .map_err(|_| AppError::Validation("JWT secret required".to_string()))?;
        let cookie_domain = env::var("SASM_COOKIE_DOMAIN").ok().filter(|s| !s.is_empty());
        let cookie_secure = env::var("SASM_COOKIE_SECURE")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);
        let session_ttl_days = env::var("SASM_SESSION_TTL_DAYS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);
        let access_ttl_minutes = env::var("SASM_ACCESS_TTL_MINUTES")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .unwrap_or(15);
        let allow_privileged_signup = env::var("SASM_ALLOW_PRIVILEGED_SIGNUP")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        let email = if let Ok(smtp_url) = env::var("SASM_EMAIL_SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("SASM_EMAIL_FROM_ADDRESS")
                    .unwrap_or_else(|_| format!("noreply@{}", hostname)),
            })
        } else {
            None
        };

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
                app_origin,
                upload_limit,
            },
            storage: StorageConfig {
                data_directory,
                database,
                upload_directory,
            },
            authentication: AuthConfig {
                jwt_secret,
                cookie_domain,
                cookie_secure,
                session_ttl_days,
                access_ttl_minutes,
                allow_privileged_signup,
            },
            email,
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.service.hostname.is_empty() {
            return Err(AppError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(AppError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.authentication.session_ttl_days < 1 {
            return Err(AppError::Validation(
                "Session TTL must be at least one day".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> ServerConfig {
    ServerConfig {
        service: ServiceConfig {
            hostname: "localhost".to_string(),
            port: 4000,
            version: "0.1.0".to_string(),
            app_origin: "http://localhost:5173".to_string(),
            upload_limit: 5242880,
        },
        storage: StorageConfig {
            data_directory: PathBuf::from("./data"),
            database: PathBuf::from(":memory:"),
            upload_directory: PathBuf::from("./data/uploads"),
        },
        authentication: AuthConfig {
            jwt_secret: "test-secret-key-for-testing-only-0123456789".to_string(),
            cookie_domain: None,
            cookie_secure: false,
            session_ttl_days: 30,
            access_ttl_minutes: 15,
            allow_privileged_signup: false,
        },
        email: None,
        logging: LoggingConfig {
            level: "info".to_string(),
        },
    }
}
