use std::fmt::{self, Display, Formatter};

use crate::cli::hotspot::HotspotReport;
use crate::handlers::HotspotState;

use super::device_view::DeviceView;
use super::painter::Painter;
use super::summary_view::RunSummaryView;
use super::table::Table;

/// Renders a hotspot status snapshot.
pub(crate) struct HotspotView<'a> {
    report: &'a HotspotReport,
    painter: &'a Painter,
}

impl<'a> HotspotView<'a> {
    pub(crate) fn new(report: &'a HotspotReport, painter: &'a Painter) -> Self {
        Self { report, painter }
    }

    fn optional<T: ToString>(&self, value: Option<T>) -> String {
        match value {
            Some(value) => self.painter.value(value.to_string()),
            None => self.painter.muted("<not sent>"),
        }
    }

    fn status_table(&self) -> Table {
        let painter = self.painter;
        let status = &self.report.status;
        let state = status.state();
        let state_label = match state {
            HotspotState::Active => painter.success(state.to_string()),
            HotspotState::Error | HotspotState::Unknown(_) => painter.warning(state.to_string()),
            HotspotState::Disabled | HotspotState::Starting => painter.value(state.to_string()),
        };

        let mut rows = vec![
            ("command", painter.muted(self.report.command.to_string())),
            ("state", state_label),
            (
                "clients",
                painter.value(format!("{}/{}", status.connected_clients, status.max_clients)),
            ),
            (
                "ble_connected",
                self.optional(status.ble_connected.map(|connected| if connected { "yes" } else { "no" })),
            ),
            ("interfaces", self.optional(status.active_interfaces)),
            ("total_data_bytes", self.optional(status.total_data_bytes)),
            ("ble_data_bytes", self.optional(status.ble_data_bytes)),
            ("ssid", self.optional(status.ssid.as_deref())),
            ("ip_address", self.optional(status.ip_address.as_deref())),
        ];
        if let Some(truncated) = status.truncated() {
            rows.push((
                "truncated",
                painter.warning(format!(
                    "{} declared {} byte(s), {} available",
                    truncated.field, truncated.declared_len, truncated.available
                )),
            ));
        }
        Table::key_value(painter, rows)
    }
}

impl Display for HotspotView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let device = DeviceView::new(&self.report.device, self.painter);

        write!(f, "{}", self.painter.heading("Connected device:"))?;
        write!(f, "\n{device}")?;
        writeln!(f)?;
        write!(f, "\n{}", self.painter.heading("Hotspot:"))?;
        write!(f, "\n{}", self.status_table())?;
        writeln!(f)?;
        write!(f, "\n{}", RunSummaryView::new(&self.report.run, self.painter))
    }
}

#[cfg(test)]
mod tests {
    use crate::handlers::{HotspotCommand, HotspotStatus};
    use crate::hw::{FoundDevice, ListenStopReason, NotificationRunSummary};

    use super::*;

    fn report(raw: &[u8]) -> HotspotReport {
        HotspotReport {
            device: FoundDevice::new(
                "hci0".into(),
                "AA:BB:CC".into(),
                Some("OpenGlass".into()),
                Some(-43),
            ),
            command: HotspotCommand::GetStatus,
            status: HotspotStatus::decode(raw).expect("fixture should decode"),
            run: NotificationRunSummary::new(1, ListenStopReason::Finished),
        }
    }

    #[test]
    fn hotspot_view_renders_full_snapshot() {
        let mut raw = vec![0x02, 0x01, 0x04, 0x01, 0x03];
        raw.extend_from_slice(&10u32.to_le_bytes());
        raw.extend_from_slice(&4u32.to_le_bytes());
        raw.push(2);
        raw.extend_from_slice(b"og");
        raw.push(8);
        raw.extend_from_slice(b"10.0.0.1");
        let report = report(&raw);
        let painter = Painter::new(false);
        let rendered = HotspotView::new(&report, &painter).to_string();

        assert!(rendered.contains("│ state            │ active"), "{rendered}");
        assert!(rendered.contains("│ clients          │ 1/4"), "{rendered}");
        assert!(rendered.contains("ble+wifi"), "{rendered}");
        assert!(rendered.contains("10.0.0.1"), "{rendered}");
        assert!(!rendered.contains("truncated"), "{rendered}");
    }

    #[test]
    fn hotspot_view_marks_missing_and_truncated_fields() {
        let mut raw = vec![0x00, 0x00, 0x04, 0x00, 0x00];
        raw.extend_from_slice(&[0; 8]);
        raw.extend_from_slice(&[5, b'o', b'g']);
        let report = report(&raw);
        let painter = Painter::new(false);
        let rendered = HotspotView::new(&report, &painter).to_string();

        assert!(rendered.contains("<not sent>"), "{rendered}");
        assert!(
            rendered.contains("ssid declared 5 byte(s), 2 available"),
            "{rendered}"
        );
    }
}
