use std::fmt::{self, Display, Formatter};

use crate::hw::{ListenStopReason, NotificationRunSummary};

use super::painter::Painter;

/// Renders the one-line notification run summary.
pub(crate) struct RunSummaryView<'a> {
    summary: &'a NotificationRunSummary,
    painter: &'a Painter,
}

impl<'a> RunSummaryView<'a> {
    pub(crate) fn new(summary: &'a NotificationRunSummary, painter: &'a Painter) -> Self {
        Self { summary, painter }
    }
}

impl Display for RunSummaryView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let reason = self.summary.stop_reason().to_string();
        let stop_reason = match self.summary.stop_reason() {
            ListenStopReason::ReachedLimit(_) | ListenStopReason::Finished => {
                self.painter.success(reason)
            }
            ListenStopReason::Cancelled | ListenStopReason::NotificationStreamClosed => {
                self.painter.warning(reason)
            }
        };
        write!(
            f,
            "{} {} {}",
            self.painter.heading("Stopped:"),
            stop_reason,
            self.painter.value(format!(
                "- received {} notification(s)",
                self.summary.received_notifications()
            ))
        )
    }
}
