use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Args;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::SessionHandler;
use crate::cli::command::parse_duration;
use crate::cli::ui::{AudioView, Painter};
use crate::cli::{OutputFormat, close_session, interrupt_token, write_json};
use crate::handlers::{AudioCodec, AudioConfig, AudioStats};
use crate::hw::{
    DeviceSession, FoundDevice, HardwareClient, ListenRequest, NotificationFlow,
    NotificationRunSummary,
};
use crate::notification::NotificationHandler;
use crate::protocol::EndpointId;
use crate::terminal::TerminalClient;
use crate::utils::format_hex;

/// Arguments for the `audio` command.
#[derive(Debug, Args)]
pub struct AudioArgs {
    /// Stops after this many audio notifications.
    #[arg(long)]
    max_chunks: Option<usize>,
    /// Bytes of frame header stripped from each chunk.
    #[arg(long, default_value_t = 3)]
    header_len: usize,
    /// Writes normalised mono 16-bit little-endian PCM to this file.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Stops recording after this long.
    #[arg(long, value_parser = parse_duration)]
    timeout: Option<Duration>,
}

impl AudioArgs {
    /// Creates audio arguments that stop after `max_chunks` notifications.
    #[must_use]
    pub fn new(max_chunks: Option<usize>) -> Self {
        Self {
            max_chunks,
            header_len: 3,
            output: None,
            timeout: None,
        }
    }

    /// Saves the processed samples to `path`.
    #[must_use]
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }
}

/// Result of one audio recording.
#[derive(Debug, Serialize)]
pub(crate) struct AudioReport {
    pub(crate) device: FoundDevice,
    pub(crate) codec: AudioCodec,
    pub(crate) chunks: usize,
    pub(crate) dropped_chunks: usize,
    pub(crate) total_bytes: usize,
    pub(crate) stats: AudioStats,
    pub(crate) dc_offset: f64,
    pub(crate) scale: Option<f64>,
    pub(crate) saved_to: Option<PathBuf>,
    pub(crate) run: NotificationRunSummary,
}

/// Executes the `audio` command.
#[instrument(skip(client, args, out, terminal_client), level = "info", fields(?output_format))]
pub(crate) async fn run<W>(
    client: Box<dyn HardwareClient>,
    args: &AudioArgs,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    let session = SessionHandler::new(client).connect_first().await?;
    let record_result = record(&session, args).await;
    let report = close_session(session, record_result).await?;

    match output_format {
        OutputFormat::Pretty => {
            let painter = Painter::new(terminal_client.stdout_is_terminal());
            writeln!(out, "{}", AudioView::new(&report, &painter))?;
        }
        OutputFormat::Json => write_json(out, &report)?,
    }

    Ok(())
}

#[instrument(skip(session, args), level = "debug")]
async fn record(session: &DeviceSession, args: &AudioArgs) -> Result<AudioReport> {
    let codec_payload = session.read_endpoint(EndpointId::AudioCodec).await?;
    let Some(codec) = AudioCodec::from_payload(&codec_payload) else {
        bail!("audio codec characteristic returned no data");
    };
    if !codec.is_pcm() {
        bail!("device streams {codec} audio; only 16-bit PCM can be recorded");
    }
    info!(%codec, "recording audio");

    let request = ListenRequest::builder()
        .endpoints(vec![EndpointId::AudioData])
        .maybe_max_notifications(args.max_chunks)
        .build();
    let mut handler =
        NotificationHandler::new(AudioConfig::builder().header_len(args.header_len).build());
    let (cancel, _guard) = interrupt_token(args.timeout);
    let run = session
        .run_notifications(&request, cancel, |notification| {
            if let Err(error) = handler.handle(notification.endpoint, &notification.payload) {
                warn!(
                    index = notification.index,
                    payload = %format_hex(&notification.payload),
                    %error,
                    "rejected audio notification"
                );
            }
            NotificationFlow::Continue
        })
        .await?;

    let audio = handler.audio();
    let stats = audio.stats()?;
    let buffer = audio.finalize()?;
    if let Some(path) = &args.output {
        std::fs::write(path, buffer.to_le_bytes())
            .with_context(|| format!("failed to write audio to {}", path.display()))?;
    }

    Ok(AudioReport {
        device: session.device().clone(),
        codec,
        chunks: audio.chunk_count(),
        dropped_chunks: audio.dropped_chunks(),
        total_bytes: audio.total_bytes(),
        stats,
        dc_offset: buffer.dc_offset(),
        scale: buffer.scale(),
        saved_to: args.output.clone(),
        run,
    })
}
