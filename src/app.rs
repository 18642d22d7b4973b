use std::{
    fmt,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use chrono::{DateTime, Local};
use tracing::{error, info, warn};

use crate::chart::Exporter;
use crate::constants::STOP_POLL_MS;
use crate::error::MonitorError;
use crate::network::HeadSource;
use crate::ui::{format_row, Report};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Heads {
    pub latest: Option<u64>,
    pub safe: Option<u64>,
    pub finalized: Option<u64>,
}

// One poll result, stamped when the tick started
#[derive(Debug, Clone)]
pub struct HeadSample {
    pub timestamp: DateTime<Local>,
    pub age_secs: u64,
    pub heads: Heads,
}

/// Three parallel series, one entry per tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleHistory {
    pub latest: Vec<Option<u64>>,
    pub safe: Vec<Option<u64>>,
    pub finalized: Vec<Option<u64>>,
}

impl SampleHistory {
    pub fn push(&mut self, heads: &Heads) {
        self.latest.push(heads.latest);
        self.safe.push(heads.safe);
        self.finalized.push(heads.finalized);
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeltaSet {
    pub finalized_change: Option<i64>,
    pub safe_change: Option<i64>,
    pub latest_change: Option<i64>,
    pub safe_lag: Option<i64>,
    pub finalized_lag: Option<i64>,
}

impl DeltaSet {
    /// Changes need both samples. Lags only look at the current one.
    pub fn compute(current: &Heads, previous: Option<&Heads>) -> Self {
        let change = |pick: fn(&Heads) -> Option<u64>| {
            previous.and_then(|prev| Some(diff(pick(current)?, pick(prev)?)))
        };
        Self {
            finalized_change: change(|h| h.finalized),
            safe_change: change(|h| h.safe),
            latest_change: change(|h| h.latest),
            safe_lag: current.latest.zip(current.safe).map(|(l, s)| diff(l, s)),
            finalized_lag: current
                .latest
                .zip(current.finalized)
                .map(|(l, f)| diff(l, f)),
        }
    }

    fn fields(&self) -> [(&'static str, Option<i64>); 5] {
        [
            ("finalized_change", self.finalized_change),
            ("safe_change", self.safe_change),
            ("latest_change", self.latest_change),
            ("safe_lag", self.safe_lag),
            ("finalized_lag", self.finalized_lag),
        ]
    }

    /// Names of the fields that are present and negative.
    pub fn regressions(&self) -> Vec<&'static str> {
        self.fields()
            .into_iter()
            .filter(|(_, value)| value.is_some_and(|v| v < 0))
            .map(|(name, _)| name)
            .collect()
    }

    pub fn is_anomalous(&self) -> bool {
        !self.regressions().is_empty()
    }
}

// Saturates instead of dropping, so a huge drop still reads as negative
fn diff(a: u64, b: u64) -> i64 {
    let d = i128::from(a) - i128::from(b);
    d.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    UserInterrupt,
    AnomalyDetected { fields: Vec<&'static str> },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::UserInterrupt => write!(f, "interrupted by operator"),
            StopReason::AnomalyDetected { fields } => {
                write!(f, "head regression in {}", fields.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped(StopReason),
    // a poll or a terminal write failed
    Failed,
}

/// Shared flag raised by the interrupt handler.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn install_ctrlc(&self) -> Result<(), ctrlc::Error> {
        let signal = self.clone();
        ctrlc::set_handler(move || signal.raise())
    }
}

#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub interval: Duration,
    pub header_freq: usize,
    pub plot_file: PathBuf,
}

enum TickOutcome {
    Continue,
    Anomaly(Vec<&'static str>),
}

/// Poll, compare, report, sleep. Owns every piece of state that survives
/// between ticks.
pub struct SampleLoop<S, R, E> {
    source: S,
    reporter: R,
    exporter: E,
    settings: LoopSettings,
    state: LoopState,
    history: SampleHistory,
    previous: Option<HeadSample>,
    rows_since_header: usize,
    started: Instant,
}

impl<S: HeadSource, R: Report, E: Exporter> SampleLoop<S, R, E> {
    pub fn new(source: S, reporter: R, exporter: E, settings: LoopSettings) -> Self {
        Self {
            source,
            reporter,
            exporter,
            settings,
            state: LoopState::Running,
            history: SampleHistory::default(),
            previous: None,
            rows_since_header: 0,
            started: Instant::now(),
        }
    }

    pub fn history(&self) -> &SampleHistory {
        &self.history
    }

    /// Runs until interrupted or until a head regresses. Poll failures end
    /// the run with an error. The chart is exported once on every exit path.
    /// A loop runs once; calling `run` again returns `AlreadyStopped`.
    pub fn run(&mut self, stop: &StopSignal) -> Result<StopReason, MonitorError> {
        if self.state != LoopState::Running {
            return Err(MonitorError::AlreadyStopped);
        }

        self.started = Instant::now();
        let result = self
            .reporter
            .print_header()
            .map_err(MonitorError::from)
            .and_then(|_| self.poll_until_stopped(stop));

        match &result {
            Ok(reason) => {
                info!(%reason, samples = self.history.len(), "monitor stopped");
                self.state = LoopState::Stopped(reason.clone());
            }
            Err(err) => {
                error!(error = %err, samples = self.history.len(), "monitor aborted");
                self.state = LoopState::Failed;
            }
        }
        self.shutdown();
        result
    }

    fn poll_until_stopped(&mut self, stop: &StopSignal) -> Result<StopReason, MonitorError> {
        loop {
            if stop.is_raised() {
                return Ok(StopReason::UserInterrupt);
            }
            match self.tick()? {
                TickOutcome::Anomaly(fields) => return Ok(StopReason::AnomalyDetected { fields }),
                TickOutcome::Continue => self.pause(stop),
            }
        }
    }

    fn tick(&mut self) -> Result<TickOutcome, MonitorError> {
        let timestamp = Local::now();
        let age_secs = self.started.elapsed().as_secs();

        let heads = self.source.fetch_heads()?;
        let sample = HeadSample {
            timestamp,
            age_secs,
            heads,
        };

        let deltas = DeltaSet::compute(&sample.heads, self.previous.as_ref().map(|p| &p.heads));
        self.history.push(&sample.heads);

        let row = format_row(&sample, &deltas);
        let anomalous = deltas.is_anomalous();
        self.reporter.print_row(&row, anomalous)?;

        if anomalous {
            let regressions = deltas.regressions();
            warn!(fields = ?regressions, ?heads, "head regression detected");
            return Ok(TickOutcome::Anomaly(regressions));
        }

        self.previous = Some(sample);
        self.rows_since_header += 1;
        if self.settings.header_freq > 0 && self.rows_since_header >= self.settings.header_freq {
            self.reporter.print_header()?;
            self.rows_since_header = 0;
        }
        Ok(TickOutcome::Continue)
    }

    // Sleeps for the interval, waking early once the stop signal is raised
    fn pause(&self, stop: &StopSignal) {
        let deadline = Instant::now() + self.settings.interval;
        let slice = Duration::from_millis(STOP_POLL_MS);
        loop {
            let now = Instant::now();
            if now >= deadline || stop.is_raised() {
                return;
            }
            thread::sleep((deadline - now).min(slice));
        }
    }

    fn shutdown(&mut self) {
        if self.history.is_empty() {
            warn!("no samples recorded, plot will be empty");
        }
        info!(path = %self.settings.plot_file.display(), "generating plot");
        match self.exporter.export(&self.history, &self.settings.plot_file) {
            Ok(()) => info!(path = %self.settings.plot_file.display(), "plot saved"),
            Err(err) => error!(error = %err, "plot export failed"),
        }
    }
}
