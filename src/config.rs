use std::{env, str::FromStr, time::Duration};

use anyhow::{ensure, Context, Result};

use crate::generator::poller::PollConfig;

pub const DEFAULT_API_URL: &str = "https://api.replicate.com/v1";
pub const DEFAULT_MODEL: &str = "black-forest-labs/flux-dev";

/// Service configuration, read once at startup.
///
/// | Env Var                | Default                        |
/// |------------------------|--------------------------------|
/// | `ADDRESS`              | `0.0.0.0:8080`                 |
/// | `REPLICATE_API_TOKEN`  | unset                          |
/// | `REPLICATE_API_URL`    | `https://api.replicate.com/v1` |
/// | `REPLICATE_MODEL`      | `black-forest-labs/flux-dev`   |
/// | `GUIDANCE`             | `3.5`                          |
/// | `POLL_INTERVAL_MS`     | `1000`                         |
/// | `POLL_MAX_INTERVAL_MS` | `10000`                        |
/// | `POLL_MULTIPLIER`      | `1.0`                          |
/// | `POLL_BUDGET_SECS`     | `300`                          |
#[derive(Debug, Clone)]
pub struct Config {
    pub address: String,
    /// The service still starts without a token, only `/generate` refuses to work.
    pub api_token: Option<String>,
    pub api_url: String,
    pub model: String,
    pub guidance: f64,
    pub poll: PollConfig
}

impl Config {

    pub fn from_env() -> Result<Config> {
        let api_token = env::var("REPLICATE_API_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());

        let poll = PollConfig {
            interval: Duration::from_millis(parse_var("POLL_INTERVAL_MS", 1000)?),
            max_interval: Duration::from_millis(parse_var("POLL_MAX_INTERVAL_MS", 10_000)?),
            multiplier: parse_var("POLL_MULTIPLIER", 1.0)?,
            budget: Duration::from_secs(parse_var("POLL_BUDGET_SECS", 300)?)
        };
        check_poll(&poll).context("Invalid polling configuration")?;

        Ok(Config {
            address: env::var("ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            api_token,
            api_url: env::var("REPLICATE_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.into())
                .trim_end_matches('/')
                .to_string(),
            model: env::var("REPLICATE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into()),
            guidance: parse_var("GUIDANCE", 3.5)?,
            poll
        })
    }

}

/// Rejects settings that would turn polling into a busy loop.
fn check_poll(poll: &PollConfig) -> Result<()> {
    ensure!(!poll.interval.is_zero(), "POLL_INTERVAL_MS must be greater than 0");
    ensure!(
        poll.multiplier.is_finite() && poll.multiplier > 0.0,
        "POLL_MULTIPLIER must be a positive number, got {}",
        poll.multiplier
    );
    ensure!(!poll.budget.is_zero(), "POLL_BUDGET_SECS must be greater than 0");
    Ok(())
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number, got \"{}\"", name, value)),
        Err(_) => Ok(default)
    }
}
