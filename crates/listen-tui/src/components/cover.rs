//! Cover art — the current album image drawn with half-block glyphs.
//!
//! Every cell shows two vertically stacked pixels: `▀` in the upper pixel's
//! colour over a background of the lower pixel's colour. Images are fetched
//! in the background when the track's cover URL changes; a failed fetch
//! keeps whatever was on screen before.

use std::time::Duration;

use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Style},
    text::Line,
    widgets::{Paragraph, Widget},
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    components::Component,
    screen::RegionId,
    state::Snapshot,
    theme::{style_muted, style_secondary},
};

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);
const UPPER_HALF: &str = "▀";

#[derive(Debug, thiserror::Error)]
pub enum CoverError {
    #[error("cover request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("cover image could not be decoded: {0}")]
    Decode(#[from] image::ImageError),
}

type Fetched = (String, Result<DynamicImage, CoverError>);

pub struct CoverArt {
    http: reqwest::Client,
    /// URL of the cover currently shown or being fetched.
    requested: Option<String>,
    image: Option<DynamicImage>,
    /// `image` resized for the last area it was drawn into.
    scaled: Option<(Rect, RgbImage)>,
    done_tx: mpsc::UnboundedSender<Fetched>,
    done_rx: mpsc::UnboundedReceiver<Fetched>,
    /// In-flight downloads are abandoned once this fires.
    shutdown: CancellationToken,
}

impl CoverArt {
    pub fn new(shutdown: CancellationToken) -> Self {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_default();
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        Self {
            http,
            requested: None,
            image: None,
            scaled: None,
            done_tx,
            done_rx,
            shutdown,
        }
    }

    fn fetch(&self, url: String) -> JoinHandle<()> {
        info!("cover: fetching {}", url);
        let http = self.http.clone();
        let done = self.done_tx.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!("cover: fetch of {} abandoned", url);
                    return;
                }
                res = download(&http, &url) => res,
            };
            // The component may be gone already during shutdown.
            let _ = done.send((url, result));
        })
    }

    fn collect_finished(&mut self) {
        while let Ok((url, result)) = self.done_rx.try_recv() {
            if self.requested.as_deref() != Some(url.as_str()) {
                debug!("cover: discarding stale image {}", url);
                continue;
            }
            match result {
                Ok(img) => {
                    debug!("cover: loaded {}x{} from {}", img.width(), img.height(), url);
                    self.image = Some(img);
                    self.scaled = None;
                }
                Err(e) => warn!("cover: {} ({})", e, url),
            }
        }
    }

    fn scaled_for(&mut self, area: Rect) -> Option<&RgbImage> {
        let img = self.image.as_ref()?;
        let stale = !matches!(&self.scaled, Some((a, _)) if *a == area);
        if stale {
            let resized = img
                .resize(
                    area.width as u32,
                    area.height as u32 * 2,
                    FilterType::Triangle,
                )
                .to_rgb8();
            self.scaled = Some((area, resized));
        }
        self.scaled.as_ref().map(|(_, img)| img)
    }
}

impl Component for CoverArt {
    fn id(&self) -> RegionId {
        RegionId::Cover
    }

    fn tick(&mut self, snapshot: &Snapshot) {
        self.collect_finished();

        let wanted = snapshot.now_playing.cover.as_ref();
        if wanted == self.requested.as_ref() {
            return;
        }
        self.requested = wanted.cloned();
        match wanted {
            Some(url) => {
                self.fetch(url.clone());
            }
            None => {
                self.image = None;
                self.scaled = None;
            }
        }
    }

    fn draw(&mut self, area: Rect, buf: &mut Buffer, _snapshot: &Snapshot) {
        match self.scaled_for(area) {
            Some(img) => paint_half_blocks(img, area, buf),
            None => paint_placeholder(area, buf),
        }
    }
}

async fn download(http: &reqwest::Client, url: &str) -> Result<DynamicImage, CoverError> {
    let bytes = http
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    Ok(image::load_from_memory(&bytes)?)
}

/// Draw `img` centred in `area`, two image rows per terminal row.
pub fn paint_half_blocks(img: &RgbImage, area: Rect, buf: &mut Buffer) {
    let cols = (img.width() as u16).min(area.width);
    let rows = (img.height().div_ceil(2) as u16).min(area.height);
    let left = area.x + (area.width - cols) / 2;
    let top = area.y + (area.height - rows) / 2;

    for row in 0..rows {
        let py = row as u32 * 2;
        for col in 0..cols {
            let px = col as u32;
            let upper = img.get_pixel(px, py);
            let lower = if py + 1 < img.height() {
                img.get_pixel(px, py + 1)
            } else {
                upper
            };
            buf[(left + col, top + row)]
                .set_symbol(UPPER_HALF)
                .set_fg(Color::Rgb(upper[0], upper[1], upper[2]))
                .set_bg(Color::Rgb(lower[0], lower[1], lower[2]));
        }
    }
}

fn paint_placeholder(area: Rect, buf: &mut Buffer) {
    let pad = area.height.saturating_sub(2) / 2;
    let mut lines = vec![Line::default(); pad as usize];
    lines.push(Line::styled("♪", style_secondary()));
    lines.push(Line::styled("No cover", style_muted()));
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default())
        .render(area, buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use image::Rgb;
    use listen_proto::playback::PlaybackStatus;
    use listen_proto::track::NowPlaying;

    use crate::state::Phase;

    fn snapshot(cover: Option<&str>) -> Snapshot {
        Snapshot {
            now_playing: Arc::new(NowPlaying {
                cover: cover.map(str::to_string),
                ..NowPlaying::loading()
            }),
            playback: PlaybackStatus::default(),
            phase: Phase::Playing,
            rev: 1,
        }
    }

    fn checkerboard(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |_, y| {
            if y % 2 == 0 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        })
    }

    #[test]
    fn test_half_blocks_pair_rows() {
        let area = Rect::new(0, 0, 4, 2);
        let mut buf = Buffer::empty(area);
        paint_half_blocks(&checkerboard(4, 4), area, &mut buf);
        for y in 0..2 {
            for x in 0..4 {
                let cell = &buf[(x, y)];
                assert_eq!(cell.symbol(), UPPER_HALF);
                assert_eq!(cell.fg, Color::Rgb(255, 0, 0));
                assert_eq!(cell.bg, Color::Rgb(0, 0, 255));
            }
        }
    }

    #[test]
    fn test_odd_height_repeats_last_row() {
        let area = Rect::new(0, 0, 2, 2);
        let mut buf = Buffer::empty(area);
        paint_half_blocks(&checkerboard(2, 3), area, &mut buf);
        assert_eq!(buf[(0, 1)].fg, Color::Rgb(255, 0, 0));
        assert_eq!(buf[(0, 1)].bg, Color::Rgb(255, 0, 0));
    }

    #[test]
    fn test_small_image_is_centred() {
        let area = Rect::new(10, 5, 6, 4);
        let mut buf = Buffer::empty(area);
        paint_half_blocks(&checkerboard(2, 2), area, &mut buf);
        assert_eq!(buf[(12, 6)].symbol(), UPPER_HALF);
        assert_eq!(buf[(13, 6)].symbol(), UPPER_HALF);
        assert_eq!(buf[(10, 5)].symbol(), " ");
        assert_eq!(buf[(14, 6)].symbol(), " ");
    }

    #[test]
    fn test_placeholder_without_cover() {
        let area = Rect::new(0, 0, 12, 6);
        let mut buf = Buffer::empty(area);
        let mut cover = CoverArt::new(CancellationToken::new());
        let snap = snapshot(None);
        cover.tick(&snap);
        cover.draw(area, &mut buf, &snap);
        let text: String = (0..area.height)
            .flat_map(|y| (0..area.width).map(move |x| (x, y)))
            .map(|pos| buf[pos].symbol().to_string())
            .collect();
        assert!(text.contains("No cover"));
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_image() {
        let mut cover = CoverArt::new(CancellationToken::new());
        cover.requested = Some("http://a/1.png".to_string());
        cover
            .done_tx
            .send((
                "http://a/1.png".to_string(),
                Ok(DynamicImage::ImageRgb8(checkerboard(4, 4))),
            ))
            .unwrap();
        cover.collect_finished();
        assert!(cover.image.is_some());

        let err = image::load_from_memory(b"not an image").unwrap_err();
        cover
            .done_tx
            .send(("http://a/1.png".to_string(), Err(CoverError::Decode(err))))
            .unwrap();
        cover.collect_finished();
        assert!(cover.image.is_some());
    }

    #[tokio::test]
    async fn test_stale_results_are_discarded() {
        let mut cover = CoverArt::new(CancellationToken::new());
        cover.requested = Some("http://a/new.png".to_string());
        cover
            .done_tx
            .send((
                "http://a/old.png".to_string(),
                Ok(DynamicImage::ImageRgb8(checkerboard(2, 2))),
            ))
            .unwrap();
        cover.collect_finished();
        assert!(cover.image.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_abandons_pending_fetch() {
        // Accepts the connection and never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/cover.png", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (_tcp, _) = listener.accept().await.unwrap();
            std::future::pending::<()>().await;
        });

        let shutdown = CancellationToken::new();
        let mut cover = CoverArt::new(shutdown.clone());
        let fetch = cover.fetch(url);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!fetch.is_finished());

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), fetch)
            .await
            .expect("fetch outlived shutdown")
            .unwrap();
        assert!(cover.done_rx.try_recv().is_err());
        server.abort();
    }

    #[test]
    fn test_scaled_image_fits_area() {
        let mut cover = CoverArt::new(CancellationToken::new());
        cover.image = Some(DynamicImage::ImageRgb8(checkerboard(300, 300)));
        let area = Rect::new(0, 0, 20, 10);
        let img = cover.scaled_for(area).unwrap();
        assert!(img.width() <= 20);
        assert!(img.height() <= 20);
    }
}
