//! Footer — a small looping animation next to the key hints.
//!
//! The pattern is picked once at startup. The frame counter advances only
//! while audio is playing, so a paused stream freezes the animation.

use rand::seq::SliceRandom;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use crate::{
    components::Component,
    screen::RegionId,
    state::Snapshot,
    theme::{C_ACCENT, C_KEY_HINT, C_MUTED},
};

/// The frame counter wraps here. Divisible by every pattern's period.
pub const FRAME_MODULUS: u64 = 840;

const BARS: [&str; 8] = ["▁", "▂", "▃", "▄", "▅", "▆", "▇", "█"];
const HINTS: &str = " q quit  ␣ pause  m mute  +/- volume ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// A sine-like ripple moving right.
    Wave,
    /// Bars bouncing at different speeds.
    Equalizer,
    /// A single note sliding back and forth.
    Bounce,
}

impl Pattern {
    pub const ALL: [Pattern; 3] = [Pattern::Wave, Pattern::Equalizer, Pattern::Bounce];

    pub fn random() -> Self {
        *Self::ALL
            .choose(&mut rand::thread_rng())
            .unwrap_or(&Pattern::Wave)
    }

    /// One cell of the pattern at `frame`, `col` cells from the left.
    fn cell(self, frame: u64, col: u64, width: u64) -> &'static str {
        match self {
            Pattern::Wave => {
                // Triangle wave over 14 steps, shifted one step per column.
                let t = (frame + FRAME_MODULUS - col % FRAME_MODULUS) % 14;
                let level = if t < 7 { t } else { 14 - t };
                BARS[level as usize]
            }
            Pattern::Equalizer => {
                let speed = 1 + (col * 7 + 3) % 5;
                let t = (frame * speed / 2 + col * 3) % 14;
                let level = if t < 7 { t } else { 14 - t };
                BARS[level as usize]
            }
            Pattern::Bounce => {
                let span = width.max(1);
                let t = frame % (2 * span);
                let pos = if t < span { t } else { 2 * span - 1 - t };
                if pos == col {
                    "♪"
                } else {
                    "·"
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Animation {
    pub pattern: Pattern,
    frame: u64,
}

impl Animation {
    pub fn new(pattern: Pattern) -> Self {
        Self { pattern, frame: 0 }
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn advance(&mut self) {
        self.frame = (self.frame + 1) % FRAME_MODULUS;
    }

    pub fn render_strip(&self, width: u16) -> String {
        let width = width as u64;
        (0..width)
            .map(|col| self.pattern.cell(self.frame, col, width))
            .collect()
    }
}

pub struct Footer {
    animation: Animation,
}

impl Footer {
    pub fn new(pattern: Pattern) -> Self {
        Self {
            animation: Animation::new(pattern),
        }
    }
}

impl Component for Footer {
    fn id(&self) -> RegionId {
        RegionId::Footer
    }

    fn tick(&mut self, snapshot: &Snapshot) {
        if snapshot.playback.playing {
            self.animation.advance();
        }
    }

    fn draw(&mut self, area: Rect, buf: &mut Buffer, snapshot: &Snapshot) {
        let hints = if (area.width as usize) > HINTS.chars().count() + 8 {
            HINTS
        } else {
            ""
        };
        let strip_width = area.width.saturating_sub(hints.chars().count() as u16);
        let strip_color = if snapshot.playback.playing {
            C_ACCENT
        } else {
            C_MUTED
        };
        let line = Line::from(vec![
            Span::styled(
                self.animation.render_strip(strip_width),
                Style::default().fg(strip_color),
            ),
            Span::styled(hints, Style::default().fg(C_KEY_HINT)),
        ]);
        Paragraph::new(line).render(area, buf);
    }
}
