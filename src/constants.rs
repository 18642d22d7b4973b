pub const DEFAULT_INTERVAL_SECS: f64 = 2.0;
pub const DEFAULT_HEADER_FREQ: usize = 50;
pub const DEFAULT_PLOT_FILE: &str = "base_heads_plot.png";
pub const DEFAULT_TIMEOUT_SECS: f64 = 10.0;

// Longest uninterrupted sleep between stop-signal checks
pub const STOP_POLL_MS: u64 = 100;

pub const PLACEHOLDER: &str = "—";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const CHART_WIDTH: u32 = 1000;
pub const CHART_HEIGHT: u32 = 600;
