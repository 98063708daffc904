//! Server configuration and CLI argument parsing
//!
//! Every option can be set on the command line or through an environment
//! variable with the `SMSGATE_` prefix. Precedence, highest first:
//!
//! 1. CLI arguments
//! 2. Environment variables
//! 3. Default values
//!
//! ```bash
//! # Via CLI
//! smsgate --port 8080 --request-limit 50 --window-secs 86400
//!
//! # Via environment variables
//! export SMSGATE_PORT=8080
//! export SMSGATE_REQUEST_LIMIT=50
//! smsgate
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, anyhow};
use clap::Parser;

/// Command-line arguments for the server
#[derive(Parser, Debug)]
#[command(
    name = "smsgate",
    about = "SMS HTTP API with sliding-window admission control",
    long_about = "An SMS HTTP API with a sliding-window rate limiter in front of it.\n\nEnvironment variables with the SMSGATE_ prefix are supported. CLI arguments take precedence over environment variables."
)]
pub struct Args {
    #[arg(
        long,
        value_name = "HOST",
        help = "Host to bind to",
        default_value = "127.0.0.1",
        env = "SMSGATE_HOST"
    )]
    pub host: String,
    #[arg(
        long,
        value_name = "PORT",
        help = "Port to listen on",
        default_value_t = 8080,
        env = "SMSGATE_PORT"
    )]
    pub port: u16,

    // Admission control
    #[arg(
        long,
        value_name = "N",
        help = "Approximate requests allowed per identity and window",
        default_value_t = 50,
        env = "SMSGATE_REQUEST_LIMIT"
    )]
    pub request_limit: u64,
    #[arg(
        long,
        value_name = "SECS",
        help = "Rate limit window length in seconds",
        default_value_t = 86_400,
        env = "SMSGATE_WINDOW_SECS"
    )]
    pub window_secs: u64,

    // Messaging
    #[arg(
        long,
        value_name = "SECS",
        help = "How long a STOP request blocks a sender/recipient pair",
        default_value_t = 14_400,
        env = "SMSGATE_STOP_TTL_SECS"
    )]
    pub stop_ttl_secs: u64,
    #[arg(
        long,
        value_name = "FILE",
        help = "JSON file with accounts and their phone numbers",
        env = "SMSGATE_ACCOUNTS"
    )]
    pub accounts: Option<PathBuf>,

    // General options
    #[arg(
        long,
        value_name = "LEVEL",
        help = "Log level: error, warn, info, debug, trace",
        default_value = "info",
        env = "SMSGATE_LOG_LEVEL"
    )]
    pub log_level: String,
}

/// Resolved server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP listener binds to
    pub bind: SocketAddr,
    /// Approximate requests allowed per identity and window
    pub request_limit: u64,
    /// Rate limit window length
    pub window: Duration,
    /// Lifetime of a STOP block
    pub stop_ttl: Duration,
    /// Optional account seed file
    pub accounts: Option<PathBuf>,
    /// Logging level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Config {
    /// Build configuration from environment variables and CLI arguments.
    ///
    /// Clap resolves the precedence: CLI arguments over environment
    /// variables over defaults.
    pub fn from_env_and_args() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    fn from_args(args: Args) -> Result<Self> {
        let bind = format!("{}:{}", args.host, args.port)
            .parse()
            .map_err(|_| anyhow!("invalid bind address {}:{}", args.host, args.port))?;

        let config = Config {
            bind,
            request_limit: args.request_limit,
            window: Duration::from_secs(args.window_secs),
            stop_ttl: Duration::from_secs(args.stop_ttl_secs),
            accounts: args.accounts,
            log_level: args.log_level,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.request_limit == 0 {
            return Err(anyhow!("request limit must be positive"));
        }
        if self.window.is_zero() {
            return Err(anyhow!("window length must be positive"));
        }
        if self.stop_ttl.is_zero() {
            return Err(anyhow!("STOP block lifetime must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_produce_a_valid_config() {
        let args = Args::try_parse_from(["smsgate"]).unwrap();
        let config = Config::from_args(args).unwrap();
        assert_eq!(config.request_limit, 50);
        assert_eq!(config.window, Duration::from_secs(86_400));
        assert_eq!(config.stop_ttl, Duration::from_secs(14_400));
    }

    #[test]
    fn cli_arguments_override_defaults() {
        let args =
            Args::try_parse_from(["smsgate", "--request-limit", "5", "--window-secs", "60"])
                .unwrap();
        let config = Config::from_args(args).unwrap();
        assert_eq!(config.request_limit, 5);
        assert_eq!(config.window, Duration::from_secs(60));
    }

    #[test]
    fn zero_limit_is_rejected() {
        let args = Args::try_parse_from(["smsgate", "--request-limit", "0"]).unwrap();
        assert!(Config::from_args(args).is_err());
    }

    #[test]
    fn unparsable_host_is_rejected() {
        let args = Args::try_parse_from(["smsgate", "--host", "not a host"]).unwrap();
        assert!(Config::from_args(args).is_err());
    }
}
