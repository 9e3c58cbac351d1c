//! CLI arguments and validated runtime configuration.
//!
//! [`CliArgs`] is the raw clap surface (flags with env-var fallbacks);
//! [`WorkerConfig`] is the validated form the rest of the binary consumes.
//! Validation lives in the `TryFrom` conversion so `main` stays a straight
//! parse-validate-run pipeline.

use clap::Parser;
use core::time::Duration;

/// Command-line arguments for the worker process.
#[derive(Debug, Parser)]
#[command(name = "gridcast-worker", about = "gridcast remote compute worker")]
pub struct CliArgs {
    /// Number of local compute tasks.
    #[arg(short = 't', long, env = "GRIDCAST_THREADS", default_value_t = 4)]
    pub threads: usize,

    /// TCP port of the reply endpoint.
    #[arg(short = 'p', long, env = "GRIDCAST_PORT", default_value_t = 3141)]
    pub port: u16,

    /// Idle timeout in HH:MM:SS. The worker exits cleanly when no request
    /// arrives within it.
    #[arg(long, env = "GRIDCAST_TIMEOUT", default_value = "01:00:00")]
    pub timeout: String,
}

/// Validated worker configuration.
#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub threads: usize,
    pub port: u16,
    pub idle_timeout: Duration,
}

impl TryFrom<CliArgs> for WorkerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let threads = if args.threads == 0 {
            tracing::warn!("thread count 0 raised to 1");
            1
        } else {
            args.threads
        };
        let idle_timeout = parse_hms(&args.timeout)?;
        if idle_timeout.is_zero() {
            anyhow::bail!("idle timeout must be positive, got '{}'", args.timeout);
        }

        Ok(Self {
            threads,
            port: args.port,
            idle_timeout,
        })
    }
}

/// Parses a `HH:MM:SS` duration. Hours are unbounded; minutes and seconds
/// must be below 60.
fn parse_hms(text: &str) -> anyhow::Result<Duration> {
    let parts: Vec<&str> = text.split(':').collect();
    let [hours, minutes, seconds] = parts.as_slice() else {
        anyhow::bail!("timeout '{text}' is not in HH:MM:SS form");
    };
    let hours: u64 = hours
        .parse()
        .map_err(|_| anyhow::anyhow!("timeout hours '{hours}' is not an integer"))?;
    let minutes: u64 = minutes
        .parse()
        .map_err(|_| anyhow::anyhow!("timeout minutes '{minutes}' is not an integer"))?;
    let seconds: u64 = seconds
        .parse()
        .map_err(|_| anyhow::anyhow!("timeout seconds '{seconds}' is not an integer"))?;
    if minutes >= 60 || seconds >= 60 {
        anyhow::bail!("timeout '{text}' has minutes or seconds of 60 or more");
    }
    Ok(Duration::from_secs(hours * 3600 + minutes * 60 + seconds))
}
