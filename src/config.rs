use std::net::IpAddr;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub service_name: String,
    pub environment: String,
    pub host: IpAddr,
    pub port: u16,
    pub db_max_connections: u32,
    pub log_level: String,
    pub log_format: LogFormat,
    pub password: PasswordConfig,
}

/// Argon2id cost parameters used when hashing new passwords.
#[derive(Debug, Clone)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt_secret = env_required("JWT_SECRET")?;

        let service_name = env_or("USERS_SERVICE_NAME", "tenant-users");
        let environment = env_or("USERS_ENVIRONMENT", "development");

        let host: IpAddr = env_or("USERS_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid USERS_HOST: {e}"))?;

        let port: u16 = env_or("USERS_PORT", "8080")
            .parse()
            .map_err(|e| format!("Invalid USERS_PORT: {e}"))?;

        let db_max_connections: u32 = env_or("USERS_DB_MAX_CONNECTIONS", "10")
            .parse()
            .map_err(|e| format!("Invalid USERS_DB_MAX_CONNECTIONS: {e}"))?;

        let log_level = env_or("USERS_LOG_LEVEL", "info");

        let log_format = match env_or("USERS_LOG_FORMAT", "pretty").to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" | "text" => LogFormat::Pretty,
            other => return Err(format!("Invalid USERS_LOG_FORMAT: {other}")),
        };

        let defaults = PasswordConfig::default();
        let password = PasswordConfig {
            memory_kib: env_or("USERS_ARGON2_MEMORY_KIB", &defaults.memory_kib.to_string())
                .parse()
                .map_err(|e| format!("Invalid USERS_ARGON2_MEMORY_KIB: {e}"))?,
            iterations: env_or("USERS_ARGON2_ITERATIONS", &defaults.iterations.to_string())
                .parse()
                .map_err(|e| format!("Invalid USERS_ARGON2_ITERATIONS: {e}"))?,
        };

        Ok(Config {
            database_url,
            jwt_secret,
            service_name,
            environment,
            host,
            port,
            db_max_connections,
            log_level,
            log_format,
            password,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
