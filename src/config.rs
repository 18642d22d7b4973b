use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::app::LoopSettings;
use crate::constants::{DEFAULT_HEADER_FREQ, DEFAULT_INTERVAL_SECS, DEFAULT_PLOT_FILE, DEFAULT_TIMEOUT_SECS};

/// Live table of L2 latest/safe/finalized heads with deltas and age.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// JSON-RPC endpoint of the node
    #[arg(long, env = "RPC_URL")]
    pub rpc_url: String,

    /// Polling interval in seconds
    #[arg(long, default_value_t = DEFAULT_INTERVAL_SECS, value_parser = parse_secs)]
    pub interval: f64,

    /// Rows between header reprints (0 disables)
    #[arg(long, default_value_t = DEFAULT_HEADER_FREQ)]
    pub header_freq: usize,

    /// Output image for the chart
    #[arg(long, default_value = DEFAULT_PLOT_FILE)]
    pub plot_file: PathBuf,

    /// HTTP timeout per poll in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, value_parser = parse_secs)]
    pub timeout: f64,

    /// Log level for diagnostics on stderr
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    pub fn settings(&self) -> LoopSettings {
        LoopSettings {
            interval: Duration::from_secs_f64(self.interval),
            header_freq: self.header_freq,
            plot_file: self.plot_file.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout)
    }
}

fn parse_secs(raw: &str) -> Result<f64, String> {
    let secs: f64 = raw.parse().map_err(|_| format!("`{raw}` is not a number"))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(format!("`{raw}` must be a finite, non-negative number of seconds"));
    }
    Ok(secs)
}
