//! Render loops.
//!
//! - `run_reactive` repaints its components when the state revision moves.
//! - `run_periodic` ticks and repaints one component on a fixed period,
//!   whether or not anything changed.
//!
//! Each component paints only its own region, so the loops never need to
//! coordinate beyond the screen lock.

use std::sync::Arc;
use std::time::Duration;

use ratatui::backend::Backend;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::components::Component;
use crate::screen::{regions, Screen};
use crate::state::{Snapshot, StateManager};

/// Where a loop paints: the shared screen plus the layout switch.
pub struct Surface<B: Backend> {
    pub screen: Arc<Screen<B>>,
    pub show_cover: bool,
}

impl<B: Backend> Clone for Surface<B> {
    fn clone(&self) -> Self {
        Self {
            screen: Arc::clone(&self.screen),
            show_cover: self.show_cover,
        }
    }
}

impl<B> Surface<B>
where
    B: Backend,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    pub fn paint(&self, component: &mut dyn Component, snapshot: &Snapshot) -> anyhow::Result<()> {
        // Recomputed every time so a resize takes effect on the next paint.
        let layout = regions(self.screen.area()?, self.show_cover);
        let area = component.id().area(&layout);
        self.screen
            .paint(area, |buf| component.draw(area, buf, snapshot))
    }
}

/// Repaint `components` after state changes until shutdown. Changes already
/// covered by an earlier paint are skipped.
///
/// On shutdown the latest state is painted one last time, so a final phase
/// change made just before cancelling still reaches the screen.
pub async fn run_reactive<B>(
    surface: Surface<B>,
    state: Arc<StateManager>,
    mut components: Vec<Box<dyn Component>>,
    shutdown: CancellationToken,
) -> anyhow::Result<()>
where
    B: Backend,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let mut changes = state.subscribe();
    // Rev of the last snapshot on screen. A burst of changes is painted once.
    let mut painted = 0;
    let mut paint_all = |components: &mut Vec<Box<dyn Component>>, force: bool| -> anyhow::Result<()> {
        let snapshot = state.snapshot();
        if !force && snapshot.rev == painted {
            trace!("rev {} already painted", snapshot.rev);
            return Ok(());
        }
        for c in components.iter_mut() {
            surface.paint(c.as_mut(), &snapshot)?;
        }
        painted = snapshot.rev;
        Ok(())
    };

    paint_all(&mut components, true)?;
    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                paint_all(&mut components, true)?;
                debug!("reactive render loop stopped");
                return Ok(());
            }

            change = changes.recv() => match change {
                Ok(change) => {
                    debug!("redraw after {:?}", change);
                    paint_all(&mut components, false)?;
                }
                Err(RecvError::Lagged(n)) => {
                    warn!("render loop lagged by {} changes", n);
                    paint_all(&mut components, false)?;
                }
                Err(RecvError::Closed) => return Ok(()),
            },
        }
    }
}

/// Tick and repaint `component` every `period` until shutdown.
pub async fn run_periodic<B>(
    surface: Surface<B>,
    state: Arc<StateManager>,
    mut component: Box<dyn Component>,
    period: Duration,
    shutdown: CancellationToken,
) -> anyhow::Result<()>
where
    B: Backend,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                debug!("{:?} render loop stopped", component.id());
                return Ok(());
            }
            _ = ticker.tick() => {}
        }
        let snapshot = state.snapshot();
        component.tick(&snapshot);
        surface.paint(component.as_mut(), &snapshot)?;
    }
}
