//! Now-playing panel — title, artist, album, playback indicator and volume.
//!
//! Redrawn by the reactive loop after every track or playback change.

use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};

use listen_proto::playback::{PlaybackStatus, MAX_VOLUME};
use listen_proto::track::NowPlaying;

use crate::{
    components::Component,
    screen::RegionId,
    state::Snapshot,
    theme::{
        style_default, style_muted, style_secondary, style_title, C_ALBUM, C_ARTIST, C_PAUSED,
        C_PLAYING, C_VOLUME_EMPTY, C_VOLUME_FILL,
    },
};

const VOLUME_BAR_WIDTH: usize = 20;

pub struct NowPlayingPanel;

impl NowPlayingPanel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NowPlayingPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for NowPlayingPanel {
    fn id(&self) -> RegionId {
        RegionId::Info
    }

    fn draw(&mut self, area: Rect, buf: &mut Buffer, snapshot: &Snapshot) {
        let inner = Rect {
            x: area.x.saturating_add(2).min(area.right()),
            y: area.y.saturating_add(1).min(area.bottom()),
            width: area.width.saturating_sub(3),
            height: area.height.saturating_sub(1),
        };
        let mut lines = track_lines(&snapshot.now_playing);
        lines.push(Line::default());
        lines.push(status_line(&snapshot.playback));
        if let Some(extra) = details_line(&snapshot.now_playing) {
            lines.push(extra);
        }
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .render(inner, buf);
    }
}

fn track_lines(np: &NowPlaying) -> Vec<Line<'static>> {
    vec![
        Line::from(vec![
            Span::styled("♪ ", style_secondary()),
            Span::styled(np.title.clone(), style_title()),
        ]),
        Line::from(vec![
            Span::styled("  ", style_default()),
            Span::styled(np.artist.clone(), Style::default().fg(C_ARTIST)),
        ]),
        Line::from(vec![
            Span::styled("  ", style_default()),
            Span::styled(
                np.album.clone(),
                Style::default().fg(C_ALBUM).add_modifier(Modifier::ITALIC),
            ),
        ]),
    ]
}

fn status_line(status: &PlaybackStatus) -> Line<'static> {
    let (icon, label, color) = if status.playing {
        ("▶", "playing", C_PLAYING)
    } else {
        ("⏸", "paused ", C_PAUSED)
    };
    let filled = volume_cells(status.volume, VOLUME_BAR_WIDTH);
    let fill_color = if status.muted { C_VOLUME_EMPTY } else { C_VOLUME_FILL };

    let mut spans = vec![
        Span::styled(format!("{} {}", icon, label), Style::default().fg(color)),
        Span::styled("   vol ", style_secondary()),
        Span::styled("█".repeat(filled), Style::default().fg(fill_color)),
        Span::styled(
            "░".repeat(VOLUME_BAR_WIDTH - filled),
            Style::default().fg(C_VOLUME_EMPTY),
        ),
        Span::styled(format!(" {:>3}%", status.volume), style_default()),
    ];
    if status.muted {
        spans.push(Span::styled(
            "  muted",
            style_muted().add_modifier(Modifier::BOLD),
        ));
    }
    Line::from(spans)
}

fn details_line(np: &NowPlaying) -> Option<Line<'static>> {
    let mut parts = Vec::new();
    if let Some(n) = np.listeners {
        parts.push(format!("{} listening", n));
    }
    if let Some(start) = np.started_at {
        parts.push(format!("on air since {}", format_start(start)));
    }
    if let Some(d) = np.duration {
        parts.push(format_duration(d));
    }
    if parts.is_empty() {
        return None;
    }
    Some(Line::from(Span::styled(parts.join(" · "), style_muted())))
}

/// Number of filled cells for `volume` on a bar `width` cells wide.
pub fn volume_cells(volume: u8, width: usize) -> usize {
    let volume = volume.min(MAX_VOLUME) as usize;
    (volume * width + (MAX_VOLUME as usize) / 2) / MAX_VOLUME as usize
}

fn format_start(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%H:%M").to_string()
}

pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}
