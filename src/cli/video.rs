use std::io;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::SessionHandler;
use crate::cli::command::parse_duration;
use crate::cli::ui::{Painter, VideoView};
use crate::cli::{OutputFormat, close_session, interrupt_token, write_json};
use crate::handlers::{ChannelKind, TransferEvent, VideoControl, VideoStatus};
use crate::hw::{
    DeviceSession, FoundDevice, HardwareClient, ListenRequest, NotificationFlow,
    NotificationRunSummary, WriteMode, WriteRequest,
};
use crate::notification::{NotificationHandler, NotifyEvent};
use crate::protocol::EndpointId;
use crate::terminal::TerminalClient;
use crate::utils::format_hex;

/// Arguments for the `video` command.
#[derive(Debug, Args)]
pub struct VideoArgs {
    /// Stops after this many complete frames.
    #[arg(long, default_value_t = 5)]
    frames: usize,
    /// Requests a streaming rate (2..=10 fps) before starting.
    #[arg(long, value_parser = parse_fps)]
    fps: Option<VideoControl>,
    /// Stops streaming after this long even if frames are missing.
    #[arg(long, value_parser = parse_duration, default_value = "30s")]
    timeout: Duration,
}

impl VideoArgs {
    /// Creates video arguments for `frames` frames at the device's current rate.
    #[must_use]
    pub fn new(frames: usize) -> Self {
        Self {
            frames,
            fps: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// One reassembled video frame.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub(crate) struct FrameSummary {
    pub(crate) bytes: usize,
    pub(crate) chunks: usize,
    pub(crate) sequence_gaps: usize,
}

/// Result of one video streaming session.
#[derive(Debug, Serialize)]
pub(crate) struct VideoReport {
    pub(crate) device: FoundDevice,
    pub(crate) frames: Vec<FrameSummary>,
    pub(crate) rejected_packets: usize,
    pub(crate) status: Option<VideoStatus>,
    pub(crate) run: NotificationRunSummary,
}

/// Executes the `video` command.
#[instrument(skip(client, args, out, terminal_client), level = "info", fields(frames = args.frames, ?output_format))]
pub(crate) async fn run<W>(
    client: Box<dyn HardwareClient>,
    args: &VideoArgs,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    let session = SessionHandler::new(client).connect_first().await?;
    let stream_result = stream(&session, args).await;
    let report = close_session(session, stream_result).await?;

    match output_format {
        OutputFormat::Pretty => {
            let painter = Painter::new(terminal_client.stdout_is_terminal());
            writeln!(out, "{}", VideoView::new(&report, &painter))?;
        }
        OutputFormat::Json => write_json(out, &report)?,
    }

    Ok(())
}

#[instrument(skip(session, args), level = "debug")]
async fn stream(session: &DeviceSession, args: &VideoArgs) -> Result<VideoReport> {
    if let Some(fps) = args.fps {
        session
            .write_endpoint(EndpointId::VideoControl, &fps.encode(), WriteMode::WithResponse)
            .await?;
    }

    let request = ListenRequest::builder()
        .endpoints(vec![EndpointId::VideoData, EndpointId::VideoStatus])
        .trigger(WriteRequest::new(
            EndpointId::VideoControl,
            VideoControl::Start.encode(),
        ))
        .build();
    let mut handler = NotificationHandler::default();
    let mut frames = Vec::with_capacity(args.frames);
    let mut rejected_packets = 0usize;
    let wanted = args.frames;
    let (cancel, _guard) = interrupt_token(Some(args.timeout));
    let run_result = session
        .run_notifications(&request, cancel, |notification| {
            match handler.handle(notification.endpoint, &notification.payload) {
                Ok(NotifyEvent::Transfer {
                    channel: ChannelKind::Video,
                    event: TransferEvent::Completed(frame),
                }) => {
                    debug!(bytes = frame.len(), "video frame complete");
                    frames.push(FrameSummary {
                        bytes: frame.len(),
                        chunks: frame.frame_count(),
                        sequence_gaps: frame.sequence_gaps(),
                    });
                    if frames.len() >= wanted {
                        NotificationFlow::Stop
                    } else {
                        NotificationFlow::Continue
                    }
                }
                Ok(_event) => NotificationFlow::Continue,
                Err(error) => {
                    warn!(
                        index = notification.index,
                        payload = %format_hex(&notification.payload),
                        %error,
                        "rejected video notification"
                    );
                    rejected_packets += 1;
                    NotificationFlow::Continue
                }
            }
        })
        .await;

    // Stop streaming even when the run failed part-way.
    let stop_result = session
        .write_endpoint(
            EndpointId::VideoControl,
            &VideoControl::Stop.encode(),
            WriteMode::WithResponse,
        )
        .await;
    let run = run_result?;
    stop_result?;

    Ok(VideoReport {
        device: session.device().clone(),
        frames,
        rejected_packets,
        status: handler.latest_video_status(),
        run,
    })
}

fn parse_fps(value: &str) -> Result<VideoControl, String> {
    let fps = value.parse::<u8>().map_err(|error| error.to_string())?;
    VideoControl::fps(fps).map_err(|error| error.to_string())
}
