use std::time::Duration;

use bon::Builder;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::filter::LevelFilter;

use crate::cli::audio::AudioArgs;
use crate::cli::hotspot::HotspotArgs;
use crate::cli::photo::PhotoArgs;
use crate::cli::status::StatusArgs;
use crate::cli::video::VideoArgs;
use crate::error::{CliConfigError, FixtureError};
use crate::hw::{EndpointPayloads, FakeBackendConfig, ScanFixture};

/// Command-line options for the OpenGlass BLE tool.
#[derive(Debug, Parser)]
#[command(name = "openglass", about = "Capture photos, video, audio and status from OpenGlass devices.")]
pub struct Args {
    /// Log verbosity; overrides `RUST_LOG`.
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,
    /// Output format. Defaults to `pretty` on terminals and `json` otherwise.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,
    /// Uses the fake BLE backend with fixture-driven discovery and payloads.
    #[arg(long, global = true)]
    fake: bool,
    /// Fake scan fixtures in the form `adapter|device_id|local_name|rssi;...`.
    #[arg(long, global = true, requires = "fake", required_if_eq("fake", "true"))]
    fake_scan: Option<ScanFixture>,
    /// Fake characteristic values as `endpoint=hex,...` (e.g. `audio_codec=14`).
    #[arg(long, global = true, requires = "fake")]
    fake_reads: Option<EndpointPayloads>,
    /// Fake notifications as `endpoint=hex,...`, delivered in order.
    #[arg(long, global = true, requires = "fake")]
    fake_notifications: Option<EndpointPayloads>,
    /// Artificial fake scan delay (e.g. `250ms`, `2s`).
    #[arg(long, global = true, requires = "fake", value_parser = parse_duration)]
    fake_discovery_delay: Option<Duration>,
    /// Artificial delay between fake notifications.
    #[arg(long, global = true, requires = "fake", value_parser = parse_duration)]
    fake_notification_interval: Option<Duration>,
    #[command(subcommand)]
    command: Command,
}

impl Args {
    /// Creates argument values directly without CLI parsing.
    ///
    /// ```
    /// use openglass::{Args, Command, StatusArgs};
    ///
    /// let inspect = Args::new(Command::Inspect);
    /// let status = Args::new(Command::Status(StatusArgs::new(Some(4))));
    /// let _ = (inspect, status);
    /// ```
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self {
            log_level: None,
            format: None,
            fake: false,
            fake_scan: None,
            fake_reads: None,
            fake_notifications: None,
            fake_discovery_delay: None,
            fake_notification_interval: None,
            command,
        }
    }

    /// Enables fake backend mode with pre-parsed fake configuration.
    #[must_use]
    pub fn with_fake(mut self, fake: FakeArgs) -> Self {
        let FakeArgs {
            scan,
            reads,
            notifications,
            discovery_delay,
            notification_interval,
        } = fake;

        self.fake = true;
        self.fake_scan = Some(scan);
        self.fake_reads = reads;
        self.fake_notifications = notifications;
        self.fake_discovery_delay = Some(discovery_delay);
        self.fake_notification_interval = Some(notification_interval);
        self
    }

    /// Returns the explicit log-level override, if any.
    #[must_use]
    pub fn log_level(&self) -> Option<LogLevel> {
        self.log_level
    }

    /// Returns the explicit output format, if any.
    #[must_use]
    pub fn output_format(&self) -> Option<OutputFormat> {
        self.format
    }

    /// Splits parsed CLI arguments into command and optional fake-client settings.
    ///
    /// # Errors
    ///
    /// Returns an error if CLI backend configuration is invalid.
    pub fn into_command_and_fake_args(self) -> anyhow::Result<(Command, Option<FakeArgs>)> {
        let Args {
            log_level: _,
            format: _,
            fake,
            fake_scan,
            fake_reads,
            fake_notifications,
            fake_discovery_delay,
            fake_notification_interval,
            command,
        } = self;

        let fake_args = if fake {
            let Some(scan) = fake_scan else {
                return Err(CliConfigError::MissingFakeScanFixture.into());
            };
            Some(FakeArgs {
                scan,
                reads: fake_reads,
                notifications: fake_notifications,
                discovery_delay: fake_discovery_delay.unwrap_or(Duration::ZERO),
                notification_interval: fake_notification_interval.unwrap_or(Duration::ZERO),
            })
        } else {
            None
        };

        Ok((command, fake_args))
    }
}

/// Log verbosity accepted by `--log-level`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub(crate) fn as_level_filter(self) -> LevelFilter {
        match self {
            Self::Off => LevelFilter::OFF,
            Self::Error => LevelFilter::ERROR,
            Self::Warn => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }
}

/// How command results are written to stdout.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Coloured tables for people.
    Pretty,
    /// Pretty-printed JSON documents for scripts.
    Json,
}

/// Fake backend arguments for programmatic runs.
///
/// ```
/// let fake = openglass::FakeArgs::builder()
///     .scan("hci0|AA:BB:CC|OpenGlass|-43")?
///     .notifications("device_status=03")?
///     .build();
/// let _ = fake;
/// # Ok::<(), openglass::FixtureError>(())
/// ```
#[derive(Debug, Builder)]
pub struct FakeArgs {
    #[builder(with = |value: &str| -> std::result::Result<_, FixtureError> { value.parse() })]
    scan: ScanFixture,
    #[builder(with = |value: &str| -> std::result::Result<_, FixtureError> { value.parse() })]
    reads: Option<EndpointPayloads>,
    #[builder(with = |value: &str| -> std::result::Result<_, FixtureError> { value.parse() })]
    notifications: Option<EndpointPayloads>,
    #[builder(default)]
    discovery_delay: Duration,
    #[builder(default)]
    notification_interval: Duration,
}

impl FakeArgs {
    pub(crate) fn into_backend_config(self) -> FakeBackendConfig {
        let Self {
            scan,
            reads,
            notifications,
            discovery_delay,
            notification_interval,
        } = self;

        FakeBackendConfig::builder()
            .scan_fixture(scan)
            .maybe_reads(reads)
            .maybe_notifications(notifications)
            .discovery_delay(discovery_delay)
            .notification_interval(notification_interval)
            .build()
    }
}

/// Supported CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect to the first OpenGlass device and print its GATT layout.
    Inspect,
    /// Trigger one photo and reassemble the chunked transfer.
    Photo(PhotoArgs),
    /// Stream video frames and report their sizes.
    Video(VideoArgs),
    /// Record PCM audio, remove DC offset and normalise it.
    Audio(AudioArgs),
    /// Read and follow the device initialisation status.
    Status(StatusArgs),
    /// Send a hotspot command and print the next status snapshot.
    Hotspot(HotspotArgs),
}

impl Command {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Inspect => "inspect",
            Self::Photo(_args) => "photo",
            Self::Video(_args) => "video",
            Self::Audio(_args) => "audio",
            Self::Status(_args) => "status",
            Self::Hotspot(_args) => "hotspot",
        }
    }
}

pub(crate) fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|error| error.to_string())
}
