use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub smtp: SmtpConfig,
    pub google: OAuthConfig,
    pub jwt: JwtConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub username: String,
    pub password: String,
    pub server: String,
    pub port: u32,
    pub database: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiry_hours: i64,
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl AppConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenv().ok();

        let server = ServerConfig {
            host: get_env("SERVER_HOST", "127.0.0.1"),
            port: get_env("SERVER_PORT", "8080").parse()?,
        };

        let database = DatabaseConfig {
            username: get_env("DB_USER", "okruser"),
            password: get_env("DB_PASSWORD", ""),
            server: get_env("DB_HOST", "localhost"),
            port: get_env("DB_PORT", "5432").parse()?,
            database: get_env("DB_NAME", "okrserver"),
            max_connections: get_env("DB_MAX_CONNECTIONS", "10").parse()?,
        };

        let smtp = SmtpConfig {
            host: get_env("SMTP_HOST", "localhost"),
            username: env::var("SMTP_USERNAME").ok(),
            password: env::var("SMTP_PASSWORD").ok(),
            from: get_env("SMTP_FROM", "noreply@okrserver.local"),
        };

        let google = OAuthConfig {
            client_id: get_env("GOOGLE_CLIENT_ID", ""),
            client_secret: get_env("GOOGLE_CLIENT_SECRET", ""),
            redirect_uri: get_env(
                "GOOGLE_REDIRECT_URI",
                &format!(
                    "http://localhost:{}/api/auth/google/callback",
                    server.port
                ),
            ),
        };

        let jwt = JwtConfig {
            secret: get_env("JWT_KEY", "change-me"),
            expiry_hours: get_env("JWT_EXPIRY_HOURS", "24").parse()?,
        };

        Ok(Self {
            server,
            database,
            smtp,
            google,
            jwt,
        })
    }

    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.database.username,
            self.database.password,
            self.database.server,
            self.database.port,
            self.database.database
        )
    }
}
