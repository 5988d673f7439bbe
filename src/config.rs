use anyhow::{Context, Result};
use clap::Parser;
use std::{env, str::FromStr};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    pub public_url: String,
    pub prediction_url: String,
    pub utc_offset_minutes: i32,
}

/// What the process should do after configuration is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    Serve,
    Migrate,
    BootstrapAdmin(String),
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Jernih water-pollution reporting API")]
pub struct Args {
    /// Host to bind to (overrides JERNIH_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides JERNIH_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where uploaded images are stored (overrides JERNIH_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides JERNIH_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Public origin used in asset URLs (overrides JERNIH_PUBLIC_URL)
    #[arg(long)]
    pub public_url: Option<String>,

    /// Base URL of the potability prediction service (overrides JERNIH_PREDICTION_URL)
    #[arg(long)]
    pub prediction_url: Option<String>,

    /// Offset from UTC, in minutes, for dashboard months (overrides JERNIH_UTC_OFFSET_MINUTES)
    #[arg(long, allow_hyphen_values = true)]
    pub utc_offset_minutes: Option<i32>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,

    /// Create an admin profile with the given name, print its session token and exit
    #[arg(long, value_name = "NAME", conflicts_with = "migrate")]
    pub bootstrap_admin: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and run mode.
    pub fn from_env_and_args() -> Result<(Self, RunMode)> {
        let args = Args::parse();
        Self::resolve(args, |key| env::var(key).ok())
    }

    /// Merge `args` over values looked up with `env`, then defaults.
    pub fn resolve(args: Args, env: impl Fn(&str) -> Option<String>) -> Result<(Self, RunMode)> {
        let string = |key: &str, default: &str| env(key).unwrap_or_else(|| default.into());

        let env_port = parse_env(&env, "JERNIH_PORT", 3000)?;
        let env_offset = parse_env(&env, "JERNIH_UTC_OFFSET_MINUTES", 420)?;

        let cfg = Self {
            host: args.host.unwrap_or_else(|| string("JERNIH_HOST", "0.0.0.0")),
            port: args.port.unwrap_or(env_port),
            storage_dir: args
                .storage_dir
                .unwrap_or_else(|| string("JERNIH_STORAGE_DIR", "./data/assets")),
            database_url: args
                .database_url
                .unwrap_or_else(|| string("JERNIH_DATABASE_URL", "sqlite://./data/meta/jernih.db")),
            public_url: args
                .public_url
                .unwrap_or_else(|| string("JERNIH_PUBLIC_URL", "http://localhost:3000")),
            prediction_url: args
                .prediction_url
                .unwrap_or_else(|| string("JERNIH_PREDICTION_URL", "http://127.0.0.1:5000")),
            utc_offset_minutes: args.utc_offset_minutes.unwrap_or(env_offset),
        };

        let mode = match (args.migrate, args.bootstrap_admin) {
            (_, Some(name)) => RunMode::BootstrapAdmin(name),
            (true, None) => RunMode::Migrate,
            (false, None) => RunMode::Serve,
        };

        Ok((cfg, mode))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<T>(env: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_env_or_flags() {
        let (cfg, mode) = AppConfig::resolve(Args::default(), env_from(&[])).unwrap();
        assert_eq!(cfg.addr(), "0.0.0.0:3000");
        assert_eq!(cfg.utc_offset_minutes, 420);
        assert_eq!(cfg.prediction_url, "http://127.0.0.1:5000");
        assert_eq!(mode, RunMode::Serve);
    }

    #[test]
    fn flags_override_env() {
        let args = Args {
            port: Some(8080),
            migrate: true,
            ..Default::default()
        };
        let env = env_from(&[("JERNIH_PORT", "9000"), ("JERNIH_HOST", "127.0.0.1")]);
        let (cfg, mode) = AppConfig::resolve(args, env).unwrap();
        assert_eq!(cfg.addr(), "127.0.0.1:8080");
        assert_eq!(mode, RunMode::Migrate);
    }

    #[test]
    fn bad_numeric_env_is_an_error() {
        let env = env_from(&[("JERNIH_UTC_OFFSET_MINUTES", "seven")]);
        let err = AppConfig::resolve(Args::default(), env).unwrap_err();
        assert!(err.to_string().contains("JERNIH_UTC_OFFSET_MINUTES"));
    }

    #[test]
    fn bootstrap_mode_carries_the_name() {
        let args = Args::parse_from(["jernih", "--bootstrap-admin", "Admin"]);
        let (_, mode) = AppConfig::resolve(args, env_from(&[])).unwrap();
        assert_eq!(mode, RunMode::BootstrapAdmin("Admin".into()));
    }
}
