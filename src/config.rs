// src/config.rs

use std::{env, time::Duration};

use dotenvy::dotenv;
use url::Url;

use crate::scroll::ScrollPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,

    // Admin sentinel. Compared in plaintext; there is exactly one admin.
    pub admin_id: String,
    pub admin_email: String,
    pub admin_password: String,

    pub recommendation_url: Option<Url>,
    pub recommendation_timeout: Duration,

    pub frames_dir: String,
    pub total_frames: usize,
    pub background_policy: ScrollPolicy,

    /// Idle time before an open assessment session is dropped.
    pub session_ttl: Duration,
    /// Open sessions kept per user.
    pub max_sessions_per_user: usize,

    /// Artificial delay around login, signup and result saves.
    pub simulated_latency: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://eduassess.db?mode=rwc".to_string());

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = parse_or("JWT_EXPIRATION", 86_400);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let recommendation_url = env::var("RECOMMENDATION_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .and_then(|raw| match Url::parse(&raw) {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::warn!("Ignoring invalid RECOMMENDATION_URL '{}': {}", raw, e);
                    None
                }
            });

        let background_policy = env::var("BACKGROUND_POLICY")
            .ok()
            .and_then(|raw| ScrollPolicy::parse(&raw))
            .unwrap_or(ScrollPolicy::Delta);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            port: parse_or("PORT", 3000),
            allowed_origins,
            admin_id: env::var("ADMIN_ID").unwrap_or_else(|_| "admin_secure_456".to_string()),
            admin_email: env::var("ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@example.com".to_string()),
            admin_password: env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "adminpass".to_string()),
            recommendation_url,
            recommendation_timeout: Duration::from_secs(parse_or("RECOMMENDATION_TIMEOUT_SECS", 15)),
            frames_dir: env::var("FRAMES_DIR").unwrap_or_else(|_| "frames".to_string()),
            total_frames: parse_or("TOTAL_FRAMES", 200),
            background_policy,
            session_ttl: Duration::from_secs(parse_or("SESSION_TTL_SECS", 3600)),
            max_sessions_per_user: parse_or("MAX_SESSIONS_PER_USER", 8),
            simulated_latency: Duration::from_millis(parse_or("SIMULATED_LATENCY_MS", 0)),
        }
    }

    /// Settings for tests and local tooling; no environment access.
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: jwt_secret.to_string(),
            jwt_expiration: 600,
            rust_log: "error".to_string(),
            port: 0,
            allowed_origins: vec!["http://localhost:3000".to_string()],
            admin_id: "admin_secure_456".to_string(),
            admin_email: "admin@example.com".to_string(),
            admin_password: "adminpass".to_string(),
            recommendation_url: None,
            recommendation_timeout: Duration::from_secs(5),
            frames_dir: "frames".to_string(),
            total_frames: 200,
            background_policy: ScrollPolicy::Fractional,
            session_ttl: Duration::from_secs(3600),
            max_sessions_per_user: 8,
            simulated_latency: Duration::ZERO,
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring unparsable {}='{}'", key, raw);
            default
        }),
        Err(_) => default,
    }
}
