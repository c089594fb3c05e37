use std::{str::FromStr, time::Duration};

use color_eyre::eyre::{eyre, Result, WrapErr};

use crate::orchestrator::OrchestratorSettings;

const PREFIX: &str = "WAYFINDER_";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub llm_url: String,
    pub llm_model: String,
    pub llm_timeout: Duration,
    pub maps_url: String,
    pub maps_api_key: String,
    pub maps_timeout: Duration,
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
    pub max_query_length: usize,
    pub max_results: usize,
    pub detail_concurrency: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; keys are given without the prefix.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(&format!("{PREFIX}{key}"));

        let config = Config {
            port: parse_or(&get, "PORT", 3000)?,
            llm_url: get("LLM_URL").unwrap_or_else(|| "http://localhost:11434".to_string()),
            llm_model: get("LLM_MODEL").unwrap_or_else(|| "llama3.2".to_string()),
            llm_timeout: Duration::from_secs(parse_or(&get, "LLM_TIMEOUT_SECS", 30)?),
            maps_url: get("MAPS_URL")
                .unwrap_or_else(|| "https://maps.googleapis.com/maps/api/place".to_string()),
            maps_api_key: get("GOOGLE_API_KEY")
                .filter(|key| !key.trim().is_empty())
                .ok_or(eyre!("{}GOOGLE_API_KEY must be set", PREFIX))?,
            maps_timeout: Duration::from_secs(parse_or(&get, "MAPS_TIMEOUT_SECS", 10)?),
            rate_limit_max: parse_or(&get, "RATE_LIMIT_MAX", 30)?,
            rate_limit_window: Duration::from_secs(parse_or(&get, "RATE_LIMIT_WINDOW_SECS", 60)?),
            max_query_length: parse_or(&get, "MAX_QUERY_LENGTH", 500)?,
            max_results: parse_or(&get, "MAX_RESULTS", 10)?,
            detail_concurrency: parse_or(&get, "DETAIL_CONCURRENCY", 4)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let zero = [
            ("RATE_LIMIT_MAX", self.rate_limit_max == 0),
            ("RATE_LIMIT_WINDOW_SECS", self.rate_limit_window.is_zero()),
            ("LLM_TIMEOUT_SECS", self.llm_timeout.is_zero()),
            ("MAPS_TIMEOUT_SECS", self.maps_timeout.is_zero()),
            ("MAX_QUERY_LENGTH", self.max_query_length == 0),
            ("MAX_RESULTS", self.max_results == 0),
            ("DETAIL_CONCURRENCY", self.detail_concurrency == 0),
        ];
        match zero.iter().find(|(_, is_zero)| *is_zero) {
            Some((key, _)) => Err(eyre!("{}{} must be greater than zero", PREFIX, key)),
            None => Ok(()),
        }
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            max_query_length: self.max_query_length,
            max_results: self.max_results,
            detail_concurrency: self.detail_concurrency,
            llm_timeout: self.llm_timeout,
            maps_timeout: self.maps_timeout,
        }
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(value) => value
            .trim()
            .parse()
            .wrap_err_with(|| format!("{PREFIX}{key} is invalid: {value:?}")),
        None => Ok(default),
    }
}
