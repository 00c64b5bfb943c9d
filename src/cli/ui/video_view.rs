use std::fmt::{self, Display, Formatter};

use crate::cli::video::VideoReport;

use super::device_view::DeviceView;
use super::painter::Painter;
use super::summary_view::RunSummaryView;
use super::table::Table;

/// Renders the frames received during a video stream.
pub(crate) struct VideoView<'a> {
    report: &'a VideoReport,
    painter: &'a Painter,
}

impl<'a> VideoView<'a> {
    pub(crate) fn new(report: &'a VideoReport, painter: &'a Painter) -> Self {
        Self { report, painter }
    }

    fn frames_table(&self) -> Table {
        let rows = self
            .report
            .frames
            .iter()
            .enumerate()
            .map(|(index, frame)| {
                vec![
                    self.painter.muted((index + 1).to_string()),
                    self.painter.value(frame.bytes.to_string()),
                    self.painter.value(frame.chunks.to_string()),
                    self.painter.problem_count(frame.sequence_gaps),
                ]
            })
            .collect();
        Table::grid(["frame", "bytes", "chunks", "sequence_gaps"], rows)
    }

    fn stream_table(&self) -> Table {
        let painter = self.painter;
        let mut rows = vec![
            ("frames", painter.value(self.report.frames.len().to_string())),
            (
                "rejected_packets",
                painter.problem_count(self.report.rejected_packets),
            ),
        ];
        match self.report.status {
            Some(status) => rows.extend([
                (
                    "streaming",
                    if status.streaming {
                        painter.success("yes")
                    } else {
                        painter.muted("no")
                    },
                ),
                ("device_fps", painter.value(status.fps.to_string())),
                ("device_frame_count", painter.value(status.frame_count.to_string())),
                (
                    "device_dropped_frames",
                    painter.problem_count(usize::from(status.dropped_frames)),
                ),
            ]),
            None => rows.push(("device_status", painter.warning("<not reported>"))),
        }
        Table::key_value(painter, rows)
    }
}

impl Display for VideoView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let device = DeviceView::new(&self.report.device, self.painter);

        write!(f, "{}", self.painter.heading("Connected device:"))?;
        write!(f, "\n{device}")?;
        writeln!(f)?;
        write!(f, "\n{}", self.painter.heading("Video stream:"))?;
        write!(f, "\n{}", self.stream_table())?;
        if !self.report.frames.is_empty() {
            writeln!(f)?;
            write!(f, "\n{}", self.painter.heading("Frames:"))?;
            write!(f, "\n{}", self.frames_table())?;
        }
        writeln!(f)?;
        write!(f, "\n{}", RunSummaryView::new(&self.report.run, self.painter))
    }
}
