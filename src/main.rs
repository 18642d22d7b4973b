mod app;
mod chart;
mod config;
mod constants;
mod error;
mod logging;
mod network;
mod ui;
mod util;

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};

use crate::app::{SampleLoop, StopReason, StopSignal};
use crate::chart::PlotExporter;
use crate::config::Cli;
use crate::error::MonitorError;
use crate::logging::setup_logging;
use crate::network::RpcClient;
use crate::ui::TerminalReporter;

const EXIT_FAILURE: u8 = 1;

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    let client = match RpcClient::new(&cli.rpc_url, cli.request_timeout()) {
        Ok(client) => client,
        Err(err) => {
            error!(error = %err, "cannot build rpc client");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let stop = StopSignal::new();
    if let Err(err) = stop.install_ctrlc() {
        warn!(error = %err, "cannot install interrupt handler");
    }

    info!(url = %cli.rpc_url, interval = cli.interval, "polling block heads");
    let mut sample_loop = SampleLoop::new(
        client,
        TerminalReporter::stdout(),
        PlotExporter::new(cli.interval),
        cli.settings(),
    );

    let outcome = sample_loop.run(&stop);
    let samples = sample_loop.history().len();
    match &outcome {
        Ok(StopReason::UserInterrupt) => println!("\nBye. {samples} samples recorded."),
        Ok(reason) => println!("\nStopped: {reason}. {samples} samples recorded."),
        Err(err) => eprintln!("Error: {err}"),
    }
    ExitCode::from(exit_status(&outcome))
}

// A regression stop is a deliberate, successful end of the run
fn exit_status(outcome: &Result<StopReason, MonitorError>) -> u8 {
    match outcome {
        Ok(_) => 0,
        Err(_) => EXIT_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RpcError;

    #[test]
    fn anomaly_and_interrupt_exit_cleanly() {
        assert_eq!(exit_status(&Ok(StopReason::UserInterrupt)), 0);
        let anomaly = StopReason::AnomalyDetected {
            fields: vec!["finalized_change"],
        };
        assert_eq!(exit_status(&Ok(anomaly)), 0);
    }

    #[test]
    fn poll_failure_exits_non_zero() {
        let err = MonitorError::Rpc(RpcError::MissingResponse { id: 2 });
        assert_eq!(exit_status(&Err(err)), EXIT_FAILURE);
    }
}
