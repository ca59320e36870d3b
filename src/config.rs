// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Join codes are fixed-width numeric strings.
pub const JOIN_CODE_LENGTH: usize = 6;

/// How many fresh codes the assessment insert tries before giving up.
/// At 10^6 possible codes this only trips under extreme churn.
pub const JOIN_CODE_MAX_ATTEMPTS: u32 = 8;

/// Hard ceiling on questions per assessment. Requested values are clamped
/// into 1..=MAX_QUESTIONS_PER_ASSESSMENT.
pub const MAX_QUESTIONS_PER_ASSESSMENT: i32 = 60;

/// Grade report paging.
pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const MAX_PAGE_SIZE: usize = 200;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86400);

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            port,
            rust_log,
        }
    }
}
