// src/utils/join_code.rs

use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;

use crate::config::JOIN_CODE_LENGTH;

static CODE_SHAPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{6}$").unwrap());

/// Produces one candidate join code: a fixed-width numeric string, uniform
/// over the whole 000000-999999 space.
///
/// Uniqueness is not guaranteed here. The unique index on
/// `assessments.join_code` is the arbiter; the assessment insert retries
/// with a fresh candidate when the store reports a collision.
pub fn generate_join_code() -> String {
    let n: u32 = rand::rng().random_range(0..1_000_000);
    format!("{:0width$}", n, width = JOIN_CODE_LENGTH)
}

/// Shape check for participant-typed codes (exactly six digits).
pub fn is_valid_join_code(code: &str) -> bool {
    CODE_SHAPE.is_match(code)
}
