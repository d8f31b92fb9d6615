use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// SMTP settings. An empty `smtp_host` puts the mailer in no-op mode.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: String,
    pub use_starttls: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub minio_endpoint: String,
    pub minio_bucket: String,
    pub minio_access_key: String,
    pub minio_secret_key: String,
    pub mail: MailConfig,
    /// Base URL used to build links sent by email (no trailing slash).
    pub public_base_url: String,
    pub invitation_ttl_hours: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "matkamestre".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "matkamestre-users".into()),
            ttl_minutes: parse_or("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: parse_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };
        let mail = MailConfig {
            smtp_host: std::env::var("SMTP_HOST").unwrap_or_default(),
            smtp_port: parse_or("SMTP_PORT", 587),
            smtp_username: std::env::var("SMTP_USERNAME").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
            smtp_from: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| "MatkaMestre <no-reply@matkamestre.local>".into()),
            use_starttls: parse_or("SMTP_STARTTLS", true),
        };
        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080".into())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            database_url,
            jwt,
            minio_endpoint: std::env::var("MINIO_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:9000".into()),
            minio_bucket: std::env::var("MINIO_BUCKET").unwrap_or_else(|_| "matkamestre".into()),
            minio_access_key: std::env::var("MINIO_ACCESS_KEY").unwrap_or_default(),
            minio_secret_key: std::env::var("MINIO_SECRET_KEY").unwrap_or_default(),
            mail,
            public_base_url,
            invitation_ttl_hours: parse_or("INVITATION_TTL_HOURS", 24),
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
