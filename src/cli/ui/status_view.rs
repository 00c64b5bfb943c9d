use std::fmt::{self, Display, Formatter};

use crate::cli::status::StatusReport;
use crate::handlers::{DeviceStatus, StatusReading};

use super::device_view::DeviceView;
use super::painter::Painter;
use super::summary_view::RunSummaryView;
use super::table::Table;

/// Renders the device status history.
pub(crate) struct StatusView<'a> {
    report: &'a StatusReport,
    painter: &'a Painter,
}

impl<'a> StatusView<'a> {
    pub(crate) fn new(report: &'a StatusReport, painter: &'a Painter) -> Self {
        Self { report, painter }
    }

    fn status_label(&self, status: DeviceStatus) -> String {
        let label = status.to_string();
        if status.is_ready() {
            self.painter.success(label)
        } else if status.is_error() {
            self.painter.warning(label)
        } else {
            self.painter.value(label)
        }
    }

    fn history_table(&self) -> Table {
        let rows = self
            .report
            .history
            .iter()
            .enumerate()
            .map(|(index, status)| {
                vec![
                    self.painter.muted((index + 1).to_string()),
                    self.painter.muted(format!("0x{:02X}", status.code())),
                    self.status_label(*status),
                ]
            })
            .collect();
        Table::grid(["#", "code", "status"], rows)
    }
}

impl Display for StatusView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let device = DeviceView::new(&self.report.device, self.painter);
        let current = match self.report.current {
            StatusReading::Status(status) => self.status_label(status),
            StatusReading::NoStatusYet => self.painter.warning("<no status yet>"),
        };

        write!(f, "{}", self.painter.heading("Connected device:"))?;
        write!(f, "\n{device}")?;
        writeln!(f)?;
        write!(f, "\n{} {current}", self.painter.heading("Current status:"))?;
        if !self.report.history.is_empty() {
            writeln!(f)?;
            write!(f, "\n{}", self.painter.heading("History:"))?;
            write!(f, "\n{}", self.history_table())?;
        }
        for transition in &self.report.transitions {
            write!(
                f,
                "\n{} {} {}",
                self.status_label(transition.from),
                self.painter.muted("->"),
                self.status_label(transition.to)
            )?;
        }
        writeln!(f)?;
        write!(f, "\n{}", RunSummaryView::new(&self.report.run, self.painter))
    }
}

#[cfg(test)]
mod tests {
    use crate::cli::status::StatusTransition;
    use crate::hw::{FoundDevice, ListenStopReason, NotificationRunSummary};

    use super::*;

    fn device() -> FoundDevice {
        FoundDevice::new(
            "hci0".into(),
            "AA:BB:CC".into(),
            Some("OpenGlass".into()),
            Some(-50),
        )
    }

    #[test]
    fn status_view_lists_history_and_transitions() {
        let report = StatusReport {
            device: device(),
            current: StatusReading::Status(DeviceStatus::Ready),
            history: vec![DeviceStatus::BleInit, DeviceStatus::Ready],
            transitions: vec![StatusTransition {
                from: DeviceStatus::BleInit,
                to: DeviceStatus::Ready,
            }],
            run: NotificationRunSummary::new(1, ListenStopReason::ReachedLimit(1)),
        };
        let painter = Painter::new(false);
        let rendered = StatusView::new(&report, &painter).to_string();

        assert!(rendered.contains("Current status: READY"), "{rendered}");
        assert!(rendered.contains("│ 1 │ 0x07 │ BLE_INIT"), "{rendered}");
        assert!(rendered.contains("BLE_INIT -> READY"), "{rendered}");
    }

    #[test]
    fn status_view_without_readings() {
        let report = StatusReport {
            device: device(),
            current: StatusReading::NoStatusYet,
            history: Vec::new(),
            transitions: Vec::new(),
            run: NotificationRunSummary::new(0, ListenStopReason::Cancelled),
        };
        let painter = Painter::new(false);
        let rendered = StatusView::new(&report, &painter).to_string();

        assert!(rendered.contains("Current status: <no status yet>"), "{rendered}");
        assert!(!rendered.contains("History:"), "{rendered}");
    }
}
