use std::path::PathBuf;

use serde::Deserialize;

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:4002,http://127.0.0.1:4002,\
http://localhost:3000,http://localhost:5000,http://localhost:4001";

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    /// Root directory for uploaded files, also served under `/uploads`.
    pub uploads_dir: PathBuf,
    /// Prefix used to build absolute links to uploaded files.
    pub public_base_url: String,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "retail-auth".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "retail-users".into()),
        };
        let uploads_dir = std::env::var("UPLOADS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));
        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:4000".into())
            .trim_end_matches('/')
            .to_string();
        let cors_origins = parse_origins(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.into()),
        );
        Ok(Self {
            database_url,
            jwt,
            uploads_dir,
            public_base_url,
            cors_origins,
        })
    }
}

/// Splits a comma separated origin list, dropping blanks and trailing slashes.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/'))
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}
