//! App — owns the process lifecycle.
//!
//! ```text
//!   App::run()
//!     ├── Player::spawn()                       media engine on the stream URL
//!     ├── terminal: raw mode + alternate screen
//!     ├── JoinSet
//!     │     ├── gateway    GatewayClient::run → StateManager::apply_metadata
//!     │     ├── render     run_reactive  (header, now playing)
//!     │     ├── cover      run_periodic  (cover art)
//!     │     └── footer     run_periodic  (animation)
//!     ├── key reader (blocking thread) → mpsc → input loop
//!     └── supervise(): keys → Player + StateManager; task failures; liveness
//! ```
//!
//! Teardown order: cancel token → background tasks joined → player shut
//! down → terminal restored.

use std::io::{self, Stdout, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use listen_proto::config::Config;
use ratatui::backend::CrosstermBackend;
use ratatui::crossterm::{
    cursor,
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::action::{action_for_key, Action};
use crate::components::cover::CoverArt;
use crate::components::footer::{Footer, Pattern};
use crate::components::header::Header;
use crate::components::now_playing::NowPlayingPanel;
use crate::components::Component;
use crate::gateway::GatewayClient;
use crate::player::{Actuator, Player, PlayerError};
use crate::render::{run_periodic, run_reactive, Surface};
use crate::screen::Screen;
use crate::state::{Phase, StateManager};

const KEY_POLL: Duration = Duration::from_millis(100);
const LIVENESS_PERIOD: Duration = Duration::from_secs(1);
const KEY_QUEUE: usize = 64;

type TaskResult = (&'static str, anyhow::Result<()>);

/// What the input loop does after an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Redraw,
    Quit,
}

/// Forward `action` to the player and record its effect in `state`.
///
/// The player is told first; the status only changes once the command went
/// out (or was swallowed by a closed pipe).
pub(crate) async fn dispatch<A: Actuator>(
    action: Action,
    player: &mut A,
    state: &StateManager,
) -> Result<Flow, PlayerError> {
    match action {
        Action::Quit => Ok(Flow::Quit),
        Action::Redraw => Ok(Flow::Redraw),
        other => {
            if let Some(cmd) = other.command() {
                player.send_command(cmd).await?;
                let status = state.apply_command(cmd);
                debug!("{:?} → {:?}", cmd, status);
            }
            Ok(Flow::Continue)
        }
    }
}

pub struct App {
    config: Config,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let player = Player::spawn(&self.config.player, self.config.stream_url())?;

        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        enter_screen(&mut stdout, restore_terminal)?;
        install_panic_hook();

        let result = self.run_inner(player, stdout).await;

        restore_terminal();
        result
    }

    async fn run_inner(self, player: Player, stdout: Stdout) -> anyhow::Result<()> {
        let cfg = &self.config;
        let screen = Arc::new(Screen::new(CrosstermBackend::new(stdout)));
        screen.clear()?;
        screen.hide_cursor()?;
        let surface = Surface {
            screen: Arc::clone(&screen),
            show_cover: cfg.render.show_cover,
        };

        let state = Arc::new(StateManager::new(
            cfg.player.default_volume,
            cfg.player.volume_step,
        ));
        let shutdown = CancellationToken::new();
        let mut tasks: JoinSet<TaskResult> = JoinSet::new();

        // ── Gateway ──────────────────────────────────────────────────────────
        {
            let state = Arc::clone(&state);
            let token = shutdown.clone();
            let mut client = GatewayClient::new(cfg.gateway.url());
            tasks.spawn(async move {
                let res = client
                    .run(move |event| {
                        state.apply_metadata(&event);
                    }, token)
                    .await;
                ("gateway", res.map_err(anyhow::Error::from))
            });
        }

        // ── Render loops ─────────────────────────────────────────────────────
        {
            let reactive: Vec<Box<dyn Component>> = vec![
                Box::new(Header::new(cfg.gateway.channel.label())),
                Box::new(NowPlayingPanel::new()),
            ];
            let fut = run_reactive(surface.clone(), Arc::clone(&state), reactive, shutdown.clone());
            tasks.spawn(async move { ("render", fut.await) });
        }
        if cfg.render.show_cover {
            let fut = run_periodic(
                surface.clone(),
                Arc::clone(&state),
                Box::new(CoverArt::new(shutdown.clone())),
                cfg.render.cover_interval(),
                shutdown.clone(),
            );
            tasks.spawn(async move { ("cover", fut.await) });
        }
        {
            let pattern = Pattern::random();
            info!("footer pattern: {:?}", pattern);
            let fut = run_periodic(
                surface.clone(),
                Arc::clone(&state),
                Box::new(Footer::new(pattern)),
                cfg.render.footer_interval(),
                shutdown.clone(),
            );
            tasks.spawn(async move { ("footer", fut.await) });
        }

        // ── Keyboard ─────────────────────────────────────────────────────────
        let (key_tx, key_rx) = mpsc::channel::<Event>(KEY_QUEUE);
        spawn_key_reader(key_tx, shutdown.clone());

        state.set_phase(Phase::Playing);
        info!("listen started on {}", cfg.gateway.channel.label());

        supervise(player, &*screen, &state, tasks, key_rx, shutdown).await
    }
}

/// Input loop plus teardown. Returns the first failure seen, if any.
///
/// Teardown order: phase set to quitting, token cancelled, every task joined,
/// then the player stopped.
pub(crate) async fn supervise<A, B>(
    mut player: A,
    screen: &Screen<B>,
    state: &StateManager,
    mut tasks: JoinSet<TaskResult>,
    mut keys: mpsc::Receiver<Event>,
    shutdown: CancellationToken,
) -> anyhow::Result<()>
where
    A: Actuator,
    B: ratatui::backend::Backend,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let mut liveness = tokio::time::interval(LIVENESS_PERIOD);
    liveness.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut failure: Option<anyhow::Error> = None;

    loop {
        tokio::select! {
            Some(joined) = tasks.join_next() => {
                failure = Some(match joined {
                    Ok((name, Ok(()))) => anyhow!("{} task stopped unexpectedly", name),
                    Ok((name, Err(e))) => e.context(format!("{} task failed", name)),
                    Err(e) => anyhow!("background task panicked: {}", e),
                });
                break;
            }

            ev = keys.recv() => {
                let Some(ev) = ev else {
                    failure = Some(anyhow!("keyboard input closed"));
                    break;
                };
                match ev {
                    Event::Key(key) => {
                        let Some(action) = action_for_key(key) else {
                            continue;
                        };
                        match dispatch(action, &mut player, state).await {
                            Ok(Flow::Continue) => {}
                            Ok(Flow::Redraw) => redraw(screen, state),
                            Ok(Flow::Quit) => {
                                info!("quit requested");
                                break;
                            }
                            Err(e) => {
                                failure = Some(e.into());
                                break;
                            }
                        }
                    }
                    Event::Resize(w, h) => {
                        debug!("terminal resized to {}x{}", w, h);
                        redraw(screen, state);
                    }
                    _ => {}
                }
            }

            _ = liveness.tick() => {
                if state.phase() != Phase::PlayerExited && player.exited() {
                    state.set_playing(false);
                    state.set_phase(Phase::PlayerExited);
                }
            }
        }
    }

    // ── Teardown ─────────────────────────────────────────────────────────────
    if let Some(e) = &failure {
        error!("shutting down after failure: {:#}", e);
    }
    state.set_phase(Phase::Quitting);
    shutdown.cancel();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((name, Ok(()))) => debug!("{} task finished", name),
            Ok((name, Err(e))) => {
                warn!("{} task failed during shutdown: {:#}", name, e);
                failure.get_or_insert(e);
            }
            Err(e) => warn!("background task panicked: {}", e),
        }
    }
    if let Err(e) = player.stop().await {
        warn!("player shutdown failed: {}", e);
    }

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn redraw<B>(screen: &Screen<B>, state: &StateManager)
where
    B: ratatui::backend::Backend,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    if let Err(e) = screen.clear() {
        warn!("clearing screen failed: {}", e);
    }
    state.request_redraw();
}

/// Read terminal events on a blocking thread. Polls with a short timeout so
/// the thread notices shutdown even when no key is pressed.
fn spawn_key_reader(tx: mpsc::Sender<Event>, shutdown: CancellationToken) {
    tokio::task::spawn_blocking(move || {
        while !shutdown.is_cancelled() {
            match event::poll(KEY_POLL) {
                Ok(true) => match event::read() {
                    Ok(ev) => {
                        if tx.blocking_send(ev).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("key reader: {}", e);
                        break;
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    warn!("key reader: {}", e);
                    break;
                }
            }
        }
        debug!("key reader stopped");
    });
}

/// Switch `out` to the alternate screen with the cursor hidden. On failure
/// `undo` runs before the error is returned.
fn enter_screen<W: Write>(out: &mut W, undo: impl FnOnce()) -> io::Result<()> {
    let entered = execute!(out, EnterAlternateScreen, cursor::Hide);
    if entered.is_err() {
        undo();
    }
    entered
}

/// Leave raw mode and the alternate screen. Safe to call more than once.
pub fn restore_terminal() {
    if let Err(e) = disable_raw_mode() {
        warn!("disable_raw_mode: {}", e);
    }
    if let Err(e) = execute!(io::stdout(), LeaveAlternateScreen, cursor::Show) {
        warn!("leaving alternate screen: {}", e);
    }
}

fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        restore_terminal();
        previous(info);
    }));
}
