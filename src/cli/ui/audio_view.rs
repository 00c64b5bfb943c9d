use std::fmt::{self, Display, Formatter};

use crate::cli::audio::AudioReport;

use super::device_view::DeviceView;
use super::painter::Painter;
use super::summary_view::RunSummaryView;
use super::table::Table;

/// Renders the outcome of an audio recording.
pub(crate) struct AudioView<'a> {
    report: &'a AudioReport,
    painter: &'a Painter,
}

impl<'a> AudioView<'a> {
    pub(crate) fn new(report: &'a AudioReport, painter: &'a Painter) -> Self {
        Self { report, painter }
    }

    fn recording_table(&self) -> Table {
        let painter = self.painter;
        let report = self.report;
        let stats = &report.stats;
        let optional_sample = |sample: Option<i16>| match sample {
            Some(sample) => painter.value(sample.to_string()),
            None => painter.muted("-"),
        };

        Table::key_value(
            painter,
            vec![
                ("codec", painter.value(report.codec.to_string())),
                ("chunks", painter.value(report.chunks.to_string())),
                ("dropped_chunks", painter.problem_count(report.dropped_chunks)),
                ("total_bytes", painter.value(report.total_bytes.to_string())),
                ("samples", painter.value(stats.sample_count.to_string())),
                ("duration", painter.value(format!("{:.3}s", stats.duration_secs))),
                ("min", optional_sample(stats.min)),
                ("max", optional_sample(stats.max)),
                ("mean", painter.value(format!("{:.2}", stats.mean))),
                ("rms", painter.value(format!("{:.2}", stats.rms))),
                ("peak", painter.value(stats.peak.to_string())),
                ("dc_offset", painter.value(format!("{:.2}", report.dc_offset))),
                (
                    "scale",
                    match report.scale {
                        Some(scale) => painter.value(format!("{scale:.4}")),
                        None => painter.warning("<silence>"),
                    },
                ),
                (
                    "saved_to",
                    match &report.saved_to {
                        Some(path) => painter.value(path.display().to_string()),
                        None => painter.muted("<not saved>"),
                    },
                ),
            ],
        )
    }
}

impl Display for AudioView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let device = DeviceView::new(&self.report.device, self.painter);

        write!(f, "{}", self.painter.heading("Connected device:"))?;
        write!(f, "\n{device}")?;
        writeln!(f)?;
        write!(f, "\n{}", self.painter.heading("Audio recording:"))?;
        write!(f, "\n{}", self.recording_table())?;
        writeln!(f)?;
        write!(f, "\n{}", RunSummaryView::new(&self.report.run, self.painter))
    }
}
