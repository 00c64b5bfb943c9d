use std::io;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::{Args, ValueEnum};
use serde::Serialize;
use tracing::{instrument, warn};

use crate::SessionHandler;
use crate::cli::command::parse_duration;
use crate::cli::ui::{HotspotView, Painter};
use crate::cli::{OutputFormat, close_session, interrupt_token, write_json};
use crate::handlers::{HotspotCommand, HotspotStatus};
use crate::hw::{
    DeviceSession, FoundDevice, HardwareClient, ListenRequest, NotificationFlow,
    NotificationRunSummary, WriteRequest,
};
use crate::notification::{NotificationHandler, NotifyEvent};
use crate::protocol::EndpointId;
use crate::terminal::TerminalClient;
use crate::utils::format_hex;

/// Hotspot operation requested on the command line.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum HotspotAction {
    Stop,
    Start,
    Toggle,
    /// Only query the current state.
    Status,
}

impl HotspotAction {
    fn command(self) -> HotspotCommand {
        match self {
            Self::Stop => HotspotCommand::Stop,
            Self::Start => HotspotCommand::Start,
            Self::Toggle => HotspotCommand::Toggle,
            Self::Status => HotspotCommand::GetStatus,
        }
    }
}

/// Arguments for the `hotspot` command.
#[derive(Debug, Args)]
pub struct HotspotArgs {
    #[arg(value_enum, default_value_t = HotspotAction::Status)]
    action: HotspotAction,
    /// Gives up when no status snapshot arrives within this time.
    #[arg(long, value_parser = parse_duration, default_value = "10s")]
    timeout: Duration,
}

impl HotspotArgs {
    /// Creates hotspot arguments for `action`.
    #[must_use]
    pub fn new(action: HotspotAction) -> Self {
        Self {
            action,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Hotspot snapshot received after a command.
#[derive(Debug, Serialize)]
pub(crate) struct HotspotReport {
    pub(crate) device: FoundDevice,
    pub(crate) command: HotspotCommand,
    pub(crate) status: HotspotStatus,
    pub(crate) run: NotificationRunSummary,
}

/// Executes the `hotspot` command.
#[instrument(skip(client, args, out, terminal_client), level = "info", fields(action = ?args.action, ?output_format))]
pub(crate) async fn run<W>(
    client: Box<dyn HardwareClient>,
    args: &HotspotArgs,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    let session = SessionHandler::new(client).connect_first().await?;
    let exchange_result = exchange(&session, args).await;
    let report = close_session(session, exchange_result).await?;

    match output_format {
        OutputFormat::Pretty => {
            let painter = Painter::new(terminal_client.stdout_is_terminal());
            writeln!(out, "{}", HotspotView::new(&report, &painter))?;
        }
        OutputFormat::Json => write_json(out, &report)?,
    }

    Ok(())
}

#[instrument(skip(session, args), level = "debug")]
async fn exchange(session: &DeviceSession, args: &HotspotArgs) -> Result<HotspotReport> {
    let command = args.action.command();
    let request = ListenRequest::builder()
        .endpoints(vec![EndpointId::HotspotStatus])
        .trigger(WriteRequest::new(EndpointId::HotspotControl, command.encode()))
        .build();
    let mut handler = NotificationHandler::default();
    let (cancel, _guard) = interrupt_token(Some(args.timeout));
    let run = session
        .run_notifications(&request, cancel, |notification| {
            match handler.handle(notification.endpoint, &notification.payload) {
                Ok(NotifyEvent::Hotspot(_status)) => NotificationFlow::Stop,
                Ok(_event) => NotificationFlow::Continue,
                Err(error) => {
                    warn!(
                        index = notification.index,
                        payload = %format_hex(&notification.payload),
                        %error,
                        "rejected hotspot notification"
                    );
                    NotificationFlow::Continue
                }
            }
        })
        .await?;

    let Some(status) = handler.latest_hotspot().cloned() else {
        bail!(
            "no hotspot status was received after `{command}` ({}, {} notification(s))",
            run.stop_reason(),
            run.received_notifications()
        );
    };

    Ok(HotspotReport {
        device: session.device().clone(),
        command,
        status,
        run,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(HotspotAction::Stop, [0x00])]
    #[case(HotspotAction::Start, [0x01])]
    #[case(HotspotAction::Toggle, [0x02])]
    #[case(HotspotAction::Status, [0x03])]
    fn actions_map_to_control_bytes(#[case] action: HotspotAction, #[case] expected: [u8; 1]) {
        assert_eq!(expected, action.command().encode());
    }
}
