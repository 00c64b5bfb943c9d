use std::io;

use anyhow::Result;
use owo_colors::OwoColorize;
use tracing::instrument;
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::cli::{Command, LogLevel, OutputFormat, audio, hotspot, inspect, photo, status, video};
use crate::hw::{DeviceSession, HardwareClient};
use crate::protocol::DEVICE_NAME_PREFIX;
use crate::telemetry;
use crate::terminal::{SystemTerminalClient, TerminalClient};

/// Session-level app helper for acquiring an OpenGlass connection.
pub struct SessionHandler {
    hardware_client: Box<dyn HardwareClient>,
    name_prefix: String,
}

impl SessionHandler {
    /// Creates a session handler using the default `OpenGlass` name prefix.
    ///
    /// ```
    /// let handler = openglass::SessionHandler::new(openglass::real_hardware_client());
    /// let _ = handler;
    /// ```
    #[must_use]
    pub fn new(hardware_client: Box<dyn HardwareClient>) -> Self {
        Self {
            hardware_client,
            name_prefix: DEVICE_NAME_PREFIX.to_string(),
        }
    }

    /// Overrides the BLE local-name prefix used when scanning for devices.
    ///
    /// ```
    /// let handler = openglass::SessionHandler::new(openglass::real_hardware_client())
    ///     .with_name_prefix("OpenGlass-Dev");
    /// let _ = handler;
    /// ```
    #[must_use]
    pub fn with_name_prefix(mut self, name_prefix: impl Into<String>) -> Self {
        self.name_prefix = name_prefix.into();
        self
    }

    /// Connects to the first matching OpenGlass peripheral.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery or connection fails, or if the device is
    /// missing a required endpoint.
    #[instrument(skip(self), level = "info", fields(name_prefix = %self.name_prefix))]
    pub async fn connect_first(self) -> Result<DeviceSession> {
        let span = tracing::Span::current();
        span.pb_set_message("Scanning for OpenGlass devices and connecting");
        span.pb_set_finish_message(&format!("{} Connected", "✓".green()));

        match self
            .hardware_client
            .connect_first_device(self.name_prefix.as_str())
            .await
        {
            Ok(session) => Ok(session),
            Err(error) => {
                span.pb_set_finish_message(&format!("{} Connection failed", "✗".red()));
                Err(error.into())
            }
        }
    }
}

/// Runs one CLI command against `hardware_client`, writing results to `out`.
///
/// Terminal detection uses the process's real standard streams.
///
/// ```
/// # async fn run() -> anyhow::Result<()> {
/// use clap::Parser;
///
/// let args = openglass::Args::try_parse_from([
///     "openglass",
///     "--fake",
///     "--fake-scan",
///     "hci0|AA:BB:CC|OpenGlass|-43",
///     "inspect",
/// ])?;
/// let log_level = args.log_level();
/// let (command, maybe_fake_args) = args.into_command_and_fake_args()?;
/// let hardware_client = match maybe_fake_args {
///     Some(fake_args) => openglass::fake_hardware_client(fake_args),
///     None => openglass::real_hardware_client(),
/// };
/// let mut out = Vec::new();
/// openglass::run(
///     command,
///     &mut out,
///     hardware_client,
///     log_level,
///     openglass::OutputFormat::Json,
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, BLE interaction fails, or
/// output writing fails.
pub async fn run<W>(
    command: Command,
    out: &mut W,
    hardware_client: Box<dyn HardwareClient>,
    log_level: Option<LogLevel>,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    run_with_clients(
        command,
        out,
        &SystemTerminalClient,
        hardware_client,
        log_level,
        output_format,
    )
    .await
}

/// Runs one CLI command with an injected terminal client.
///
/// ```
/// # async fn run() -> anyhow::Result<()> {
/// use clap::Parser;
///
/// struct FakeTerminal;
/// impl openglass::TerminalClient for FakeTerminal {
///     fn stdout_is_terminal(&self) -> bool { false }
///     fn stderr_is_terminal(&self) -> bool { false }
/// }
///
/// let args = openglass::Args::try_parse_from([
///     "openglass",
///     "--fake",
///     "--fake-scan",
///     "hci0|AA:BB:CC|OpenGlass|-43",
///     "status",
///     "--max-notifications",
///     "2",
/// ])?;
/// let (command, maybe_fake_args) = args.into_command_and_fake_args()?;
/// let hardware_client = match maybe_fake_args {
///     Some(fake_args) => openglass::fake_hardware_client(fake_args),
///     None => openglass::real_hardware_client(),
/// };
/// let mut out = Vec::new();
/// openglass::run_with_clients(
///     command,
///     &mut out,
///     &FakeTerminal,
///     hardware_client,
///     None,
///     openglass::OutputFormat::Pretty,
/// )
/// .await?;
/// assert!(String::from_utf8(out)?.contains("Current status: READY"));
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, BLE interaction fails, or
/// output writing fails.
#[instrument(
    skip(command, out, terminal_client, hardware_client),
    level = "info",
    fields(command = %command.name(), ?log_level, ?output_format)
)]
pub async fn run_with_clients<W>(
    command: Command,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    hardware_client: Box<dyn HardwareClient>,
    log_level: Option<LogLevel>,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    telemetry::initialise_tracing(
        "openglass",
        terminal_client.stderr_is_terminal(),
        log_level.map(LogLevel::as_level_filter),
    )?;

    match command {
        Command::Inspect => inspect::run(hardware_client, out, terminal_client, output_format).await,
        Command::Photo(args) => {
            photo::run(hardware_client, &args, out, terminal_client, output_format).await
        }
        Command::Video(args) => {
            video::run(hardware_client, &args, out, terminal_client, output_format).await
        }
        Command::Audio(args) => {
            audio::run(hardware_client, &args, out, terminal_client, output_format).await
        }
        Command::Status(args) => {
            status::run(hardware_client, &args, out, terminal_client, output_format).await
        }
        Command::Hotspot(args) => {
            hotspot::run(hardware_client, &args, out, terminal_client, output_format).await
        }
    }
}
