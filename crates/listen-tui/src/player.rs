//! Playback actuator — drives an out-of-process media engine through single
//! byte commands written to its stdin.
//!
//! ```text
//!   Player::spawn()
//!         │
//!         ├── ControlPipe<ChildStdin>  ← send(cmd): one token byte + flush
//!         └── Child                    ← try_wait() liveness, wait() on shutdown
//! ```
//!
//! The player may exit on its own (stream error, user killed it). Writes that
//! fail because the pipe is gone are swallowed; anything else is an error.
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use listen_proto::config::PlayerConfig;
use listen_proto::playback::PlayerCommand;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, ChildStdin};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("player binary `{0}` not found")]
    NotFound(String),
    #[error("failed to spawn player: {0}")]
    Spawn(#[source] io::Error),
    #[error("player has no stdin")]
    NoStdin,
    #[error("player control pipe failed: {0}")]
    Io(#[from] io::Error),
}

/// True for failures that only mean "the other end is gone".
fn is_pipe_closed(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe | io::ErrorKind::InvalidInput
    )
}

// ── control pipe ──────────────────────────────────────────────────────────────

/// Write side of the player's control channel.
pub struct ControlPipe<W> {
    writer: Option<W>,
}

impl<W: AsyncWrite + Unpin> ControlPipe<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Some(writer),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    /// Write the command's token and flush. A closed pipe makes this a no-op.
    pub async fn send(&mut self, cmd: PlayerCommand) -> Result<(), PlayerError> {
        let Some(writer) = self.writer.as_mut() else {
            debug!("player: pipe closed, dropping {:?}", cmd);
            return Ok(());
        };
        let result = async {
            writer.write_all(&[cmd.token()]).await?;
            writer.flush().await
        }
        .await;
        match result {
            Ok(()) => {
                debug!("player: sent {:?}", cmd);
                Ok(())
            }
            Err(e) if is_pipe_closed(&e) => {
                info!("player: control pipe closed ({}), ignoring {:?}", e, cmd);
                self.writer = None;
                Ok(())
            }
            Err(e) => Err(PlayerError::Io(e)),
        }
    }

    /// Shut down and drop the writer so the player sees EOF.
    pub async fn close(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.shutdown().await {
                debug!("player: closing control pipe: {}", e);
            }
        }
    }
}

/// Anything that accepts player commands.
pub(crate) trait Actuator {
    async fn send_command(&mut self, cmd: PlayerCommand) -> Result<(), PlayerError>;

    /// True once the other end is known to be gone.
    fn exited(&mut self) -> bool;

    /// Ask the player to quit and release it.
    async fn stop(self) -> Result<(), PlayerError>;
}

impl<W: AsyncWrite + Unpin> Actuator for ControlPipe<W> {
    async fn send_command(&mut self, cmd: PlayerCommand) -> Result<(), PlayerError> {
        self.send(cmd).await
    }

    fn exited(&mut self) -> bool {
        self.is_closed()
    }

    async fn stop(mut self) -> Result<(), PlayerError> {
        let sent = self.send(PlayerCommand::Quit).await;
        self.close().await;
        sent
    }
}

// ── player process ────────────────────────────────────────────────────────────

pub struct Player {
    control: ControlPipe<ChildStdin>,
    process: Child,
    shutdown_grace: Duration,
}

impl Player {
    /// Start the media engine on `stream_url`.
    pub fn spawn(config: &PlayerConfig, stream_url: &str) -> Result<Self, PlayerError> {
        let binary = listen_proto::platform::find_player_binary(&config.binary)
            .ok_or_else(|| PlayerError::NotFound(config.binary.clone()))?;

        info!("player: spawning {:?} for {}", binary, stream_url);
        let mut process = tokio::process::Command::new(&binary)
            .arg("-really-quiet")
            .arg("-volume")
            .arg(config.default_volume.min(100).to_string())
            .arg("-volstep")
            .arg(config.volume_step.to_string())
            .args(&config.extra_args)
            .arg(stream_url)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(PlayerError::Spawn)?;
        info!("player: spawned process with pid {:?}", process.id());

        let stdin = process.stdin.take().ok_or(PlayerError::NoStdin)?;
        Ok(Self {
            control: ControlPipe::new(stdin),
            process,
            shutdown_grace: config.shutdown_grace(),
        })
    }

    pub async fn send(&mut self, cmd: PlayerCommand) -> Result<(), PlayerError> {
        self.control.send(cmd).await
    }

    /// `None` while running, the exit status once the process is gone.
    pub fn try_status(&mut self) -> Option<ExitStatus> {
        match self.process.try_wait() {
            Ok(None) => None,
            Ok(Some(status)) => {
                if let Some(code) = status.code() {
                    warn!("player process exited with code: {}", code);
                } else {
                    warn!("player process terminated by signal");
                }
                Some(status)
            }
            Err(e) => {
                warn!("player liveness check failed: {}", e);
                None
            }
        }
    }

    /// Quit, close stdin, wait for exit. Kills the process if it lingers.
    pub async fn shutdown(mut self) -> Result<ExitStatus, PlayerError> {
        if let Err(e) = self.control.send(PlayerCommand::Quit).await {
            warn!("player: quit command failed: {}", e);
        }
        self.control.close().await;

        match tokio::time::timeout(self.shutdown_grace, self.process.wait()).await {
            Ok(status) => {
                let status = status?;
                info!("player: exited with {}", status);
                Ok(status)
            }
            Err(_) => {
                warn!(
                    "player: still running {:?} after quit, killing",
                    self.shutdown_grace
                );
                self.process.kill().await?;
                Ok(self.process.wait().await?)
            }
        }
    }
}

impl Actuator for Player {
    async fn send_command(&mut self, cmd: PlayerCommand) -> Result<(), PlayerError> {
        self.send(cmd).await
    }

    fn exited(&mut self) -> bool {
        self.try_status().is_some()
    }

    async fn stop(self) -> Result<(), PlayerError> {
        let status = self.shutdown().await?;
        debug!("player shut down: {}", status);
        Ok(())
    }
}
