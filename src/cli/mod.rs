pub(crate) mod audio;
pub(crate) mod command;
pub(crate) mod hotspot;
pub(crate) mod inspect;
pub(crate) mod photo;
pub(crate) mod status;
pub(crate) mod ui;
pub(crate) mod video;

use std::future;
use std::io;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tokio::time::sleep;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

use crate::hw::DeviceSession;

pub use self::audio::AudioArgs;
pub use self::command::{Args, Command, FakeArgs, LogLevel, OutputFormat};
pub use self::hotspot::{HotspotAction, HotspotArgs};
pub use self::photo::PhotoArgs;
pub use self::status::StatusArgs;
pub use self::video::VideoArgs;

/// Closes a session, surfacing a close failure only when the command succeeded.
pub(crate) async fn close_session<T>(session: DeviceSession, command_result: Result<T>) -> Result<T> {
    let close_result = session.close().await;

    if let Err(error) = close_result {
        if command_result.is_ok() {
            return Err(error.into());
        }
        tracing::trace!(?error, "failed to close session cleanly");
    }

    command_result
}

/// Returns a token cancelled on Ctrl+C or once `timeout` elapses.
///
/// The watcher task stops when the returned guard is dropped.
pub(crate) fn interrupt_token(timeout: Option<Duration>) -> (CancellationToken, DropGuard) {
    let token = CancellationToken::new();
    let watched = token.clone();

    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                debug!(?error, "Ctrl+C handler unavailable");
                future::pending::<()>().await;
            }
        };
        let deadline = async {
            match timeout {
                Some(timeout) => sleep(timeout).await,
                None => future::pending().await,
            }
        };

        tokio::select! {
            () = watched.cancelled() => {}
            () = ctrl_c => debug!("interrupted by Ctrl+C"),
            () = deadline => debug!(?timeout, "capture timeout elapsed"),
        }
        watched.cancel();
    });

    let guard = token.clone().drop_guard();
    (token, guard)
}

pub(crate) fn write_json(out: &mut impl io::Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
