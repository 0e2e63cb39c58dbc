//! Header component — one reversed row with the client phase, centered.
//!
//! Redrawn by the reactive loop whenever the phase changes.

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use unicode_width::UnicodeWidthStr;

use crate::{
    components::Component,
    screen::RegionId,
    state::{Phase, Snapshot},
    theme::{style_header, C_ERROR},
};

pub struct Header {
    channel: &'static str,
}

impl Header {
    pub fn new(channel: &'static str) -> Self {
        Self { channel }
    }

    fn text(&self, phase: &Phase) -> String {
        format!("{} - listen · {}", phase.label(), self.channel)
    }
}

impl Component for Header {
    fn id(&self) -> RegionId {
        RegionId::Header
    }

    fn draw(&mut self, area: Rect, buf: &mut Buffer, snapshot: &Snapshot) {
        let mut style = style_header();
        if snapshot.phase == Phase::PlayerExited {
            style = style.bg(C_ERROR);
        }
        let text = self.text(&snapshot.phase);
        // Fill the whole row so the bar spans the screen even when text is short.
        let pad = (area.width as usize).saturating_sub(text.width()) / 2;
        let line = Line::from(vec![
            Span::styled(" ".repeat(pad), style),
            Span::styled(text, style),
            Span::styled(" ".repeat(area.width as usize), style),
        ]);
        buf.set_style(area, style);
        Paragraph::new(line)
            .alignment(Alignment::Left)
            .render(area, buf);
    }
}
