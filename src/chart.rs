use std::{error::Error, fs, path::Path};

use plotters::prelude::*;

use crate::app::SampleHistory;
use crate::constants::{CHART_HEIGHT, CHART_WIDTH};
use crate::error::ChartError;
use crate::util::format_secs;

pub trait Exporter {
    fn export(&mut self, history: &SampleHistory, path: &Path) -> Result<(), ChartError>;
}

/// Renders the recorded heads as a PNG line chart.
pub struct PlotExporter {
    interval_secs: f64,
    size: (u32, u32),
}

impl PlotExporter {
    pub fn new(interval_secs: f64) -> Self {
        Self {
            interval_secs,
            size: (CHART_WIDTH, CHART_HEIGHT),
        }
    }

    fn render(&self, history: &SampleHistory, path: &Path) -> Result<(), Box<dyn Error>> {
        let root = BitMapBackend::new(path, self.size).into_drawing_area();
        root.fill(&WHITE)?;

        let x_max = history.len().saturating_sub(1).max(1) as f64;
        let (y_min, y_max) = y_range(history);

        let mut chart = ChartBuilder::on(&root)
            .caption("L2 Sync: Unsafe / Safe / Final Blocks", ("sans-serif", 24))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(90)
            .build_cartesian_2d(0f64..x_max, y_min..y_max)?;

        chart
            .configure_mesh()
            .x_desc(format!("Sample ({}s interval)", format_secs(self.interval_secs)))
            .y_desc("Block Number")
            .x_label_formatter(&|x| format!("{:.0}", x))
            .y_label_formatter(&|y| format!("{:.0}", y))
            .draw()?;

        let series = [
            (&history.latest, "latest block", RED),
            (&history.safe, "safe block", BLUE),
            (&history.finalized, "final block", GREEN),
        ];
        for (values, label, color) in series {
            // empty series carries the legend entry, segments carry the data
            chart
                .draw_series(LineSeries::new(std::iter::empty::<(f64, f64)>(), color.stroke_width(2)))?
                .label(label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
            for segment in segments(values) {
                chart.draw_series(LineSeries::new(segment, color.stroke_width(2)))?;
            }
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;

        root.present()?;
        Ok(())
    }
}

impl Exporter for PlotExporter {
    fn export(&mut self, history: &SampleHistory, path: &Path) -> Result<(), ChartError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        self.render(history, path)
            .map_err(|err| ChartError::Render(err.to_string()))
    }
}

/// Splits a series at absent entries so gaps are not drawn as lines.
fn segments(values: &[Option<u64>]) -> Vec<Vec<(f64, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for (i, value) in values.iter().enumerate() {
        match value {
            Some(v) => current.push((i as f64, *v as f64)),
            None if !current.is_empty() => out.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn y_range(history: &SampleHistory) -> (f64, f64) {
    let present = history
        .latest
        .iter()
        .chain(&history.safe)
        .chain(&history.finalized)
        .flatten()
        .copied();

    let bounds = present.fold(None, |acc: Option<(u64, u64)>, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    });

    match bounds {
        None => (0.0, 1.0),
        Some((lo, hi)) => {
            let pad = ((hi - lo) as f64 * 0.05).max(1.0);
            (lo as f64 - pad, hi as f64 + pad)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaps_split_segments() {
        let values = [Some(1), Some(2), None, None, Some(5), None, Some(7), Some(8)];
        assert_eq!(
            segments(&values),
            vec![
                vec![(0.0, 1.0), (1.0, 2.0)],
                vec![(4.0, 5.0)],
                vec![(6.0, 7.0), (7.0, 8.0)],
            ]
        );
        assert!(segments(&[None, None]).is_empty());
    }

    #[test]
    fn range_covers_all_series() {
        let history = SampleHistory {
            latest: vec![Some(120), None],
            safe: vec![None, Some(100)],
            finalized: vec![Some(80), Some(81)],
        };
        let (lo, hi) = y_range(&history);
        assert!(lo < 80.0);
        assert!(hi > 120.0);
    }

    #[test]
    fn empty_history_gets_unit_range() {
        assert_eq!(y_range(&SampleHistory::default()), (0.0, 1.0));
    }

    #[test]
    fn exports_series_with_gaps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plots").join("heads.png");
        let history = SampleHistory {
            latest: vec![Some(100), None, Some(102)],
            safe: vec![Some(90), Some(91), None],
            finalized: vec![None, Some(80), Some(81)],
        };

        PlotExporter::new(2.0).export(&history, &path).unwrap();
        assert!(fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn exports_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.png");

        PlotExporter::new(0.5).export(&SampleHistory::default(), &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn unwritable_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"x").unwrap();

        let mut exporter = PlotExporter::new(2.0);
        let err = exporter
            .export(&SampleHistory::default(), &blocker.join("heads.png"))
            .unwrap_err();
        assert!(matches!(err, ChartError::Io(_)));
    }
}
