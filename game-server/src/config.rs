use std::env;
use std::str::FromStr;
use std::time::Duration;

use game_core::PhaseTimings;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub words_file: String,
    pub conundrums_file: String,
    pub letters_solve_seconds: u64,
    pub conundrum_solve_seconds: u64,
    pub round_result_seconds: u64,
    pub conundrum_guess_interval_ms: u64,
    pub match_retention_minutes: u64,
    pub cleanup_interval_seconds: u64,
    /// Fixed seed for letter draws and conundrum choice; random when unset.
    pub rng_seed: Option<u64>,
    pub auth_dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT", defaults.port)?,
            words_file: env::var("WORDS_FILE").unwrap_or(defaults.words_file),
            conundrums_file: env::var("CONUNDRUMS_FILE").unwrap_or(defaults.conundrums_file),
            letters_solve_seconds: parse_var(
                "LETTERS_SOLVE_SECONDS",
                defaults.letters_solve_seconds,
            )?,
            conundrum_solve_seconds: parse_var(
                "CONUNDRUM_SOLVE_SECONDS",
                defaults.conundrum_solve_seconds,
            )?,
            round_result_seconds: parse_var("ROUND_RESULT_SECONDS", defaults.round_result_seconds)?,
            conundrum_guess_interval_ms: parse_var(
                "CONUNDRUM_GUESS_INTERVAL_MS",
                defaults.conundrum_guess_interval_ms,
            )?,
            match_retention_minutes: parse_var(
                "MATCH_RETENTION_MINUTES",
                defaults.match_retention_minutes,
            )?,
            cleanup_interval_seconds: parse_var(
                "CLEANUP_INTERVAL_SECONDS",
                defaults.cleanup_interval_seconds,
            )?,
            rng_seed: match env::var("RNG_SEED") {
                Ok(value) => Some(parse_value("RNG_SEED", &value)?),
                Err(_) => None,
            },
            auth_dev_mode: parse_var("AUTH_DEV_MODE", defaults.auth_dev_mode)?,
        })
    }

    pub fn phase_timings(&self) -> PhaseTimings {
        PhaseTimings {
            letters_solve_ms: seconds_to_ms(self.letters_solve_seconds),
            conundrum_solve_ms: seconds_to_ms(self.conundrum_solve_seconds),
            round_result_ms: seconds_to_ms(self.round_result_seconds),
            conundrum_guess_interval_ms: self.conundrum_guess_interval_ms as i64,
        }
    }

    pub fn match_retention(&self) -> Duration {
        Duration::from_secs(self.match_retention_minutes * 60)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_seconds.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            words_file: "./shared/words.txt".to_string(),
            conundrums_file: "./shared/conundrums.txt".to_string(),
            letters_solve_seconds: 30,
            conundrum_solve_seconds: 30,
            round_result_seconds: 5,
            conundrum_guess_interval_ms: 500,
            match_retention_minutes: 30,
            cleanup_interval_seconds: 30,
            rng_seed: None,
            auth_dev_mode: true,
        }
    }
}

fn seconds_to_ms(seconds: u64) -> i64 {
    (seconds as i64) * 1_000
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => parse_value(key, &value),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}
