use std::io::{self, Write};

use crossterm::{
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
};

use crate::app::{DeltaSet, HeadSample};
use crate::constants::TIMESTAMP_FORMAT;
use crate::util::format_opt;

pub trait Report {
    fn print_header(&mut self) -> io::Result<()>;
    fn print_row(&mut self, row: &str, anomalous: bool) -> io::Result<()>;
}

pub fn format_header() -> String {
    format!(
        "{:<19} | {:>6} | {:>10} | {:>8} | {:>10} | {:>8} | {:>10} | {:>8} | {:>5} | {:>6}",
        "TIME", "AGE", "FINALIZED", "F_CHANGE", "SAFE", "S_CHANGE", "LATEST", "L_CHANGE", "Δsafe", "Δfinal"
    )
}

pub fn format_row(sample: &HeadSample, deltas: &DeltaSet) -> String {
    let heads = &sample.heads;
    format!(
        "{:<19} | {:>6} | {:>10} | {:>8} | {:>10} | {:>8} | {:>10} | {:>8} | {:>5} | {:>6}",
        sample.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        sample.age_secs,
        format_opt(heads.finalized),
        format_opt(deltas.finalized_change),
        format_opt(heads.safe),
        format_opt(deltas.safe_change),
        format_opt(heads.latest),
        format_opt(deltas.latest_change),
        format_opt(deltas.safe_lag),
        format_opt(deltas.finalized_lag),
    )
}

/// Line-oriented table on a terminal (or any writer), flushed per row.
pub struct TerminalReporter<W: Write> {
    out: W,
}

impl<W: Write> TerminalReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl TerminalReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Report for TerminalReporter<W> {
    fn print_header(&mut self) -> io::Result<()> {
        let header = format_header();
        let rule = "-".repeat(header.chars().count());
        writeln!(self.out, "{header}")?;
        writeln!(self.out, "{rule}")?;
        self.out.flush()
    }

    fn print_row(&mut self, row: &str, anomalous: bool) -> io::Result<()> {
        if anomalous {
            queue!(
                self.out,
                SetForegroundColor(Color::Red),
                Print(row),
                ResetColor,
                Print("\n")
            )?;
        } else {
            writeln!(self.out, "{row}")?;
        }
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone};

    use super::*;
    use crate::app::Heads;

    fn sample(heads: Heads) -> HeadSample {
        HeadSample {
            timestamp: Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 5).unwrap(),
            age_secs: 42,
            heads,
        }
    }

    #[test]
    fn row_lines_up_with_header() {
        let current = Heads {
            latest: Some(1_000_120),
            safe: Some(1_000_100),
            finalized: Some(1_000_000),
        };
        let previous = Heads {
            latest: Some(1_000_118),
            safe: Some(1_000_100),
            finalized: Some(999_990),
        };
        let row = format_row(&sample(current), &DeltaSet::compute(&current, Some(&previous)));

        assert_eq!(
            row,
            "2024-05-01 12:30:05 |     42 |    1000000 |       10 |    1000100 |        0 |    1000120 |        2 |    20 |    120"
        );
        assert_eq!(row.chars().count(), format_header().chars().count());
    }

    #[test]
    fn absent_values_render_as_placeholder() {
        let current = Heads {
            latest: Some(500),
            safe: None,
            finalized: None,
        };
        let row = format_row(&sample(current), &DeltaSet::compute(&current, None));
        let cells: Vec<&str> = row.split('|').map(str::trim).collect();

        assert_eq!(cells[2], "—");
        assert_eq!(cells[3], "—");
        assert_eq!(cells[6], "500");
        assert_eq!(cells[8], "—");
        assert_eq!(cells[9], "—");
    }

    #[test]
    fn header_is_followed_by_rule() {
        let mut reporter = TerminalReporter::new(Vec::new());
        reporter.print_header().unwrap();
        let out = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("TIME"));
        assert!(lines[0].ends_with("Δfinal"));
        assert_eq!(lines[1].len(), lines[0].chars().count());
        assert!(lines[1].chars().all(|c| c == '-'));
    }

    #[test]
    fn anomalous_rows_are_highlighted() {
        let mut reporter = TerminalReporter::new(Vec::new());
        reporter.print_row("plain", false).unwrap();
        reporter.print_row("alert", true).unwrap();
        let out = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "plain");
        assert!(lines[1].starts_with('\u{1b}'));
        assert!(lines[1].contains("alert"));
        assert!(lines[1].ends_with("\u{1b}[0m"));
    }
}
