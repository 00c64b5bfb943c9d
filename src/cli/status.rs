use std::io;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tracing::{instrument, warn};

use crate::SessionHandler;
use crate::cli::command::parse_duration;
use crate::cli::ui::{Painter, StatusView};
use crate::cli::{OutputFormat, close_session, interrupt_token, write_json};
use crate::handlers::{DeviceStatus, DeviceStatusTracker, StatusReading};
use crate::hw::{
    DeviceSession, FoundDevice, HardwareClient, ListenRequest, NotificationFlow,
    NotificationRunSummary,
};
use crate::protocol::EndpointId;
use crate::terminal::TerminalClient;
use crate::utils::format_hex;

/// Arguments for the `status` command.
#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Stops after this many status notifications. Zero only reads the current value.
    #[arg(long)]
    max_notifications: Option<usize>,
    /// Stops following after this long.
    #[arg(long, value_parser = parse_duration)]
    timeout: Option<Duration>,
}

impl StatusArgs {
    /// Creates status arguments that stop after `max_notifications`.
    #[must_use]
    pub fn new(max_notifications: Option<usize>) -> Self {
        Self {
            max_notifications,
            timeout: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub(crate) struct StatusTransition {
    pub(crate) from: DeviceStatus,
    pub(crate) to: DeviceStatus,
}

/// Device status history gathered by one `status` run.
#[derive(Debug, Serialize)]
pub(crate) struct StatusReport {
    pub(crate) device: FoundDevice,
    pub(crate) current: StatusReading,
    pub(crate) history: Vec<DeviceStatus>,
    pub(crate) transitions: Vec<StatusTransition>,
    pub(crate) run: NotificationRunSummary,
}

/// Executes the `status` command.
#[instrument(skip(client, args, out, terminal_client), level = "info", fields(?output_format))]
pub(crate) async fn run<W>(
    client: Box<dyn HardwareClient>,
    args: &StatusArgs,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    let session = SessionHandler::new(client).connect_first().await?;
    let follow_result = follow(&session, args).await;
    let report = close_session(session, follow_result).await?;

    match output_format {
        OutputFormat::Pretty => {
            let painter = Painter::new(terminal_client.stdout_is_terminal());
            writeln!(out, "{}", StatusView::new(&report, &painter))?;
        }
        OutputFormat::Json => write_json(out, &report)?,
    }

    Ok(())
}

#[instrument(skip(session, args), level = "debug")]
async fn follow(session: &DeviceSession, args: &StatusArgs) -> Result<StatusReport> {
    let mut tracker = DeviceStatusTracker::new();
    let initial = session.read_endpoint(EndpointId::DeviceStatus).await?;
    if let Err(error) = tracker.on_status_payload(&initial) {
        warn!(%error, "initial device status read was unusable");
    }

    let request = ListenRequest::builder()
        .endpoints(vec![EndpointId::DeviceStatus])
        .maybe_max_notifications(args.max_notifications)
        .build();
    let (cancel, _guard) = interrupt_token(args.timeout);
    let run = session
        .run_notifications(&request, cancel, |notification| {
            if let Err(error) = tracker.on_status_payload(&notification.payload) {
                warn!(
                    index = notification.index,
                    payload = %format_hex(&notification.payload),
                    %error,
                    "rejected status notification"
                );
            }
            NotificationFlow::Continue
        })
        .await?;

    Ok(StatusReport {
        device: session.device().clone(),
        current: tracker.current(),
        history: tracker.history().to_vec(),
        transitions: tracker
            .transitions()
            .map(|(from, to)| StatusTransition { from, to })
            .collect(),
        run,
    })
}
