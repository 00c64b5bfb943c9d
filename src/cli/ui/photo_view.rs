use std::fmt::{self, Display, Formatter};

use crate::cli::photo::PhotoReport;

use super::device_view::DeviceView;
use super::painter::Painter;
use super::summary_view::RunSummaryView;
use super::table::Table;

/// Renders a completed photo capture.
pub(crate) struct PhotoView<'a> {
    report: &'a PhotoReport,
    painter: &'a Painter,
}

impl<'a> PhotoView<'a> {
    pub(crate) fn new(report: &'a PhotoReport, painter: &'a Painter) -> Self {
        Self { report, painter }
    }

    fn capture_table(&self) -> Table {
        let painter = self.painter;
        let report = self.report;
        let device_status = match report.device_status {
            Some(status) if status.is_error() => painter.warning(status.to_string()),
            Some(status) => painter.value(status.to_string()),
            None => painter.warning("<no status yet>"),
        };
        let saved_to = match &report.saved_to {
            Some(path) => painter.value(path.display().to_string()),
            None => painter.muted("<not saved>"),
        };

        Table::key_value(
            painter,
            vec![
                ("bytes", painter.value(report.bytes.to_string())),
                ("frames", painter.value(report.frames.to_string())),
                ("sequence_gaps", painter.problem_count(report.sequence_gaps)),
                ("rejected_packets", painter.problem_count(report.rejected_packets)),
                ("device_status", device_status),
                ("saved_to", saved_to),
            ],
        )
    }
}

impl Display for PhotoView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let device = DeviceView::new(&self.report.device, self.painter);

        write!(f, "{}", self.painter.heading("Connected device:"))?;
        write!(f, "\n{device}")?;
        writeln!(f)?;
        write!(f, "\n{}", self.painter.heading("Photo:"))?;
        write!(f, "\n{}", self.capture_table())?;
        writeln!(f)?;
        write!(f, "\n{}", RunSummaryView::new(&self.report.run, self.painter))
    }
}
