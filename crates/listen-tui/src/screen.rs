//! Screen — a terminal backend shared by several independent painters.
//!
//! Each render loop owns one region. `paint` renders that region into a
//! scratch buffer and writes only its cells to the backend while holding the
//! screen lock, so painters never interleave output and never touch each
//! other's cells.

use std::sync::{Mutex, MutexGuard, PoisonError};

use ratatui::backend::Backend;
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Rect};
use unicode_width::UnicodeWidthStr;

/// Static region assignment for one terminal size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Regions {
    pub header: Rect,
    pub cover: Rect,
    pub info: Rect,
    pub footer: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionId {
    Header,
    Cover,
    Info,
    Footer,
}

impl RegionId {
    pub fn area(self, regions: &Regions) -> Rect {
        match self {
            RegionId::Header => regions.header,
            RegionId::Cover => regions.cover,
            RegionId::Info => regions.info,
            RegionId::Footer => regions.footer,
        }
    }
}

/// Header on top, footer at the bottom, cover art left of the track info.
///
/// The cover is two columns per row so that half-block pixels come out square.
pub fn regions(area: Rect, show_cover: bool) -> Regions {
    let rows = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .split(area);
    let body = rows[1];

    let cover_width = if show_cover && body.height >= 4 {
        (body.height.saturating_mul(2)).min(body.width / 2)
    } else {
        0
    };
    let cols = Layout::horizontal([Constraint::Length(cover_width), Constraint::Min(0)]).split(body);

    Regions {
        header: rows[0],
        cover: cols[0],
        info: cols[1],
        footer: rows[2],
    }
}

pub struct Screen<B: Backend> {
    backend: Mutex<B>,
}

impl<B> Screen<B>
where
    B: Backend,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    pub fn new(backend: B) -> Self {
        Self {
            backend: Mutex::new(backend),
        }
    }

    fn lock(&self) -> MutexGuard<'_, B> {
        self.backend.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Full terminal area.
    pub fn area(&self) -> anyhow::Result<Rect> {
        let size = self.lock().size()?;
        Ok(Rect::new(0, 0, size.width, size.height))
    }

    /// Render `area` with `render` and write exactly those cells.
    pub fn paint<F>(&self, area: Rect, render: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut Buffer),
    {
        if area.is_empty() {
            return Ok(());
        }
        let mut buf = Buffer::empty(area);
        render(&mut buf);

        // Cells covered by the right half of a wide glyph are left to the glyph.
        let mut cells = Vec::with_capacity(area.area() as usize);
        for y in area.top()..area.bottom() {
            let mut covered = 0usize;
            for x in area.left()..area.right() {
                let cell = &buf[(x, y)];
                if covered > 0 {
                    covered -= 1;
                    continue;
                }
                covered = cell.symbol().width().saturating_sub(1);
                cells.push((x, y, cell));
            }
        }

        let mut backend = self.lock();
        backend.draw(cells.into_iter())?;
        backend.flush()?;
        Ok(())
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        let mut backend = self.lock();
        backend.clear()?;
        backend.flush()?;
        Ok(())
    }

    pub fn hide_cursor(&self) -> anyhow::Result<()> {
        self.lock().hide_cursor()?;
        Ok(())
    }

    /// Direct access to the backend, e.g. to inspect a test backend.
    pub fn with_backend<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
        f(&mut self.lock())
    }
}
