use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Args;
use serde::Serialize;
use tracing::{instrument, warn};

use crate::SessionHandler;
use crate::cli::command::parse_duration;
use crate::cli::ui::{Painter, PhotoView};
use crate::cli::{OutputFormat, close_session, interrupt_token, write_json};
use crate::handlers::{CompletedTransfer, DeviceStatus, PhotoControl, TransferEvent};
use crate::hw::{
    DeviceSession, FoundDevice, HardwareClient, ListenRequest, NotificationFlow,
    NotificationRunSummary, WriteRequest,
};
use crate::notification::{NotificationHandler, NotifyEvent};
use crate::protocol::EndpointId;
use crate::terminal::TerminalClient;
use crate::utils::format_hex;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Arguments for the `photo` command.
#[derive(Debug, Args)]
pub struct PhotoArgs {
    /// Writes the reassembled photo bytes to this file.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Gives up when no complete photo arrives within this time.
    #[arg(long, value_parser = parse_duration, default_value = "30s")]
    timeout: Duration,
    /// Aborts a transfer that grows beyond this many bytes.
    #[arg(long)]
    max_bytes: Option<usize>,
}

impl Default for PhotoArgs {
    fn default() -> Self {
        Self {
            output: None,
            timeout: DEFAULT_TIMEOUT,
            max_bytes: None,
        }
    }
}

impl PhotoArgs {
    /// Creates photo arguments with the default timeout and no output file.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Saves the photo to `path`.
    #[must_use]
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Overrides the capture timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Result of one photo capture.
#[derive(Debug, Serialize)]
pub(crate) struct PhotoReport {
    pub(crate) device: FoundDevice,
    pub(crate) bytes: usize,
    pub(crate) frames: usize,
    pub(crate) sequence_gaps: usize,
    pub(crate) rejected_packets: usize,
    pub(crate) device_status: Option<DeviceStatus>,
    pub(crate) saved_to: Option<PathBuf>,
    pub(crate) run: NotificationRunSummary,
}

struct PhotoCapture {
    photo: Option<CompletedTransfer>,
    rejected_packets: usize,
    device_status: Option<DeviceStatus>,
    run: NotificationRunSummary,
}

/// Executes the `photo` command.
#[instrument(skip(client, args, out, terminal_client), level = "info", fields(?output_format))]
pub(crate) async fn run<W>(
    client: Box<dyn HardwareClient>,
    args: &PhotoArgs,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    let session = SessionHandler::new(client).connect_first().await?;
    let device = session.device().clone();
    let capture_result = capture(&session, args).await;
    let capture = close_session(session, capture_result).await?;

    let Some(photo) = capture.photo else {
        bail!(
            "no complete photo was received ({}, {} notification(s))",
            capture.run.stop_reason(),
            capture.run.received_notifications()
        );
    };
    if let Some(path) = &args.output {
        std::fs::write(path, photo.bytes())
            .with_context(|| format!("failed to write photo to {}", path.display()))?;
    }

    let report = PhotoReport {
        device,
        bytes: photo.len(),
        frames: photo.frame_count(),
        sequence_gaps: photo.sequence_gaps(),
        rejected_packets: capture.rejected_packets,
        device_status: capture.device_status,
        saved_to: args.output.clone(),
        run: capture.run,
    };
    match output_format {
        OutputFormat::Pretty => {
            let painter = Painter::new(terminal_client.stdout_is_terminal());
            writeln!(out, "{}", PhotoView::new(&report, &painter))?;
        }
        OutputFormat::Json => write_json(out, &report)?,
    }

    Ok(())
}

#[instrument(skip(session, args), level = "debug")]
async fn capture(session: &DeviceSession, args: &PhotoArgs) -> Result<PhotoCapture> {
    let mut handler = NotificationHandler::default();
    if let Some(limit) = args.max_bytes {
        handler = handler.with_max_transfer_bytes(limit);
    }
    let request = ListenRequest::builder()
        .endpoints(vec![EndpointId::PhotoData, EndpointId::DeviceStatus])
        .trigger(WriteRequest::new(
            EndpointId::PhotoControl,
            PhotoControl::SingleShot.encode(),
        ))
        .build();

    let mut photo = None;
    let mut rejected_packets = 0usize;
    let (cancel, _guard) = interrupt_token(Some(args.timeout));
    let run = session
        .run_notifications(&request, cancel, |notification| {
            match handler.handle(notification.endpoint, &notification.payload) {
                Ok(NotifyEvent::Transfer {
                    event: TransferEvent::Completed(completed),
                    ..
                }) => {
                    photo = Some(completed);
                    NotificationFlow::Stop
                }
                Ok(_event) => NotificationFlow::Continue,
                Err(error) => {
                    warn!(
                        index = notification.index,
                        payload = %format_hex(&notification.payload),
                        %error,
                        "rejected photo notification"
                    );
                    rejected_packets += 1;
                    NotificationFlow::Continue
                }
            }
        })
        .await?;

    Ok(PhotoCapture {
        photo,
        rejected_packets,
        device_status: handler.status().current().status(),
        run,
    })
}
