//! Component trait — the interface every screen region implements.
//!
//! - Components own their local state and render themselves.
//! - Components receive a `Snapshot` of the shared state; they never mutate it.
//! - Each component is driven by exactly one render loop.

use ratatui::{buffer::Buffer, layout::Rect};

use crate::screen::RegionId;
use crate::state::Snapshot;

pub mod cover;
pub mod footer;
pub mod header;
pub mod now_playing;

pub trait Component: Send {
    /// Which region this component paints.
    fn id(&self) -> RegionId;

    /// Called once per period by periodic loops, before `draw`.
    fn tick(&mut self, _snapshot: &Snapshot) {}

    /// Render into `buf`, whose area is exactly `area`.
    fn draw(&mut self, area: Rect, buf: &mut Buffer, snapshot: &Snapshot);
}
