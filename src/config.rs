use crate::error::{Error, Result};
use crate::services::transition_table::TransitionTable;
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub notification_webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
    pub pipeline: PipelineConfig,
}

/// Rules shared by the lifecycle manager, the scheduler and the feedback
/// aggregator. Built once and handed to each service at construction.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub transitions: TransitionTable,
    /// Reject `schedule` while the application already has an active interview.
    pub single_active_interview: bool,
    /// Reject `schedule` when an interviewer already has an overlapping active interview.
    pub reject_overlapping_interviews: bool,
    /// Gate `offer_made` on a favorable feedback consensus.
    pub require_favorable_feedback_for_offer: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            transitions: TransitionTable::standard(),
            single_active_interview: false,
            reject_overlapping_interviews: false,
            require_favorable_feedback_for_offer: false,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            transitions: TransitionTable::standard(),
            single_active_interview: get_env_flag("PIPELINE_SINGLE_ACTIVE_INTERVIEW")?,
            reject_overlapping_interviews: get_env_flag("PIPELINE_REJECT_OVERLAPPING_INTERVIEWS")?,
            require_favorable_feedback_for_offer: get_env_flag(
                "PIPELINE_REQUIRE_FAVORABLE_FEEDBACK_FOR_OFFER",
            )?,
        })
    }
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let database_max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(_) => get_env_parse("DATABASE_MAX_CONNECTIONS")?,
            Err(_) => 20,
        };

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            database_max_connections,
            jwt_secret: get_env("JWT_SECRET")?,
            notification_webhook_url: env::var("NOTIFICATION_WEBHOOK_URL").ok(),
            webhook_secret: env::var("WEBHOOK_SECRET").ok(),
            pipeline: PipelineConfig::from_env()?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse<T>(name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(name)?;
    raw.parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

fn get_env_flag(name: &str) -> Result<bool> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            other => Err(Error::Config(format!("Invalid value for {}: {}", name, other))),
        },
        Err(_) => Ok(false),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> Result<&'static Config> {
    CONFIG
        .get()
        .ok_or_else(|| Error::Config("Configuration has not been initialized".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pipeline_config_keeps_hooks_off() {
        let cfg = PipelineConfig::default();
        assert!(!cfg.single_active_interview);
        assert!(!cfg.reject_overlapping_interviews);
        assert!(!cfg.require_favorable_feedback_for_offer);
    }

    #[test]
    fn unset_flag_reads_false() {
        assert!(!get_env_flag("PIPELINE_FLAG_THAT_IS_NEVER_SET").unwrap());
    }
}
