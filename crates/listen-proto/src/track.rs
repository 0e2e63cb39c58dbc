//! Track updates and the now-playing record built from them.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::gateway::MetadataEvent;

/// Event kinds that carry a new current track.
pub const TRACK_EVENT_KINDS: &[&str] = &["TRACK_UPDATE", "TRACK_UPDATE_REQUEST"];

/// Joins contributing artist names, in payload order.
pub const ARTIST_SEPARATOR: &str = "  ";
pub const ARTIST_MISSING: &str = "Unknown artist";
pub const ALBUM_MISSING: &str = "No album";
pub const LOADING: &str = "Loading…";

pub const COVER_BASE_URL: &str = "https://cdn.listen.moe/covers";

#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("malformed track payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("track payload has no title")]
    MissingTitle,
}

#[derive(Debug, Clone, Deserialize)]
struct TrackPayload {
    song: SongPayload,
    #[serde(default, rename = "startTime")]
    start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    listeners: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
struct SongPayload {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    artists: Vec<NamedPayload>,
    #[serde(default)]
    albums: Vec<NamedPayload>,
    #[serde(default)]
    duration: Option<u64>,
}

/// Artists and albums share this shape.
#[derive(Debug, Clone, Deserialize)]
struct NamedPayload {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "nameRomaji")]
    name_romaji: Option<String>,
    #[serde(default)]
    image: Option<String>,
}

impl NamedPayload {
    fn display_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(self.name_romaji.as_deref().filter(|n| !n.is_empty()))
    }
}

/// What the screen shows for the current track.
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub title: String,
    pub album: String,
    pub artist: String,
    /// Cover image URL, when the album has one.
    pub cover: Option<String>,
    pub listeners: Option<u32>,
    pub started_at: Option<DateTime<Utc>>,
    pub duration: Option<Duration>,
}

impl NowPlaying {
    /// Placeholder shown until the first track update arrives.
    pub fn loading() -> Self {
        Self {
            title: LOADING.to_string(),
            album: LOADING.to_string(),
            artist: LOADING.to_string(),
            cover: None,
            listeners: None,
            started_at: None,
            duration: None,
        }
    }

    /// Build a record from a metadata event.
    ///
    /// Returns `Ok(None)` for events that do not announce a track (queue
    /// updates, notifications, …) and `Err` when a track event is malformed.
    pub fn from_event(event: &MetadataEvent) -> Result<Option<Self>, TrackError> {
        match event.kind.as_deref() {
            Some(kind) if TRACK_EVENT_KINDS.contains(&kind) => {}
            _ => return Ok(None),
        }
        let payload = TrackPayload::deserialize(&event.data)?;
        Self::from_payload(payload).map(Some)
    }

    fn from_payload(payload: TrackPayload) -> Result<Self, TrackError> {
        let song = payload.song;
        let title = song.title.ok_or(TrackError::MissingTitle)?;

        let names: Vec<&str> = song
            .artists
            .iter()
            .filter_map(NamedPayload::display_name)
            .collect();
        let artist = if names.is_empty() {
            ARTIST_MISSING.to_string()
        } else {
            names.join(ARTIST_SEPARATOR)
        };

        let (album, cover) = match song.albums.first() {
            Some(first) => (
                first.display_name().unwrap_or(ALBUM_MISSING).to_string(),
                first
                    .image
                    .as_deref()
                    .filter(|i| !i.is_empty())
                    .map(cover_url),
            ),
            None => (ALBUM_MISSING.to_string(), None),
        };

        Ok(Self {
            title,
            album,
            artist,
            cover,
            listeners: payload.listeners,
            started_at: payload.start_time,
            duration: song.duration.filter(|d| *d > 0).map(Duration::from_secs),
        })
    }
}

impl Default for NowPlaying {
    fn default() -> Self {
        Self::loading()
    }
}

pub fn cover_url(image: &str) -> String {
    format!("{}/{}", COVER_BASE_URL, image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn track_event(song: serde_json::Value) -> MetadataEvent {
        MetadataEvent {
            kind: Some("TRACK_UPDATE".to_string()),
            data: json!({ "song": song, "listeners": 321, "startTime": "2024-05-01T12:30:00.000Z" }),
        }
    }

    #[test]
    fn test_two_artists_one_album() {
        let ev = track_event(json!({
            "title": "Song",
            "artists": [{ "name": "A" }, { "name": "B" }],
            "albums": [{ "name": "X", "image": "x.jpg" }],
            "duration": 215
        }));
        let np = NowPlaying::from_event(&ev).unwrap().unwrap();
        assert_eq!(np.title, "Song");
        assert_eq!(np.album, "X");
        assert_eq!(np.artist, "A  B");
        assert_eq!(np.cover.as_deref(), Some("https://cdn.listen.moe/covers/x.jpg"));
        assert_eq!(np.listeners, Some(321));
        assert_eq!(np.duration, Some(Duration::from_secs(215)));
        assert!(np.started_at.is_some());
    }

    #[test]
    fn test_empty_lists_use_fallbacks() {
        let ev = track_event(json!({ "title": "Lonely", "artists": [], "albums": [] }));
        let np = NowPlaying::from_event(&ev).unwrap().unwrap();
        assert_eq!(np.artist, ARTIST_MISSING);
        assert_eq!(np.album, ALBUM_MISSING);
        assert_eq!(np.cover, None);
    }

    #[test]
    fn test_only_first_album_is_used() {
        let ev = track_event(json!({
            "title": "t",
            "artists": [{ "name": "Solo" }],
            "albums": [{ "name": "First", "image": null }, { "name": "Second", "image": "2.png" }]
        }));
        let np = NowPlaying::from_event(&ev).unwrap().unwrap();
        assert_eq!(np.album, "First");
        assert_eq!(np.artist, "Solo");
        assert_eq!(np.cover, None);
    }

    #[test]
    fn test_romaji_fallback_for_unnamed_entries() {
        let ev = track_event(json!({
            "title": "t",
            "artists": [{ "name": null, "nameRomaji": "Romaji" }, { "name": "Kanji" }],
            "albums": [{ "nameRomaji": "Album R" }]
        }));
        let np = NowPlaying::from_event(&ev).unwrap().unwrap();
        assert_eq!(np.artist, "Romaji  Kanji");
        assert_eq!(np.album, "Album R");
    }

    #[test]
    fn test_non_track_events_are_ignored() {
        let ev = MetadataEvent {
            kind: Some("QUEUE_UPDATE".to_string()),
            data: json!({ "amount": 3 }),
        };
        assert!(NowPlaying::from_event(&ev).unwrap().is_none());
        let ev = MetadataEvent {
            kind: None,
            data: json!({}),
        };
        assert!(NowPlaying::from_event(&ev).unwrap().is_none());
    }

    #[test]
    fn test_malformed_track_events_are_errors() {
        let no_song = MetadataEvent {
            kind: Some("TRACK_UPDATE".to_string()),
            data: json!({ "listeners": 4 }),
        };
        assert!(matches!(
            NowPlaying::from_event(&no_song),
            Err(TrackError::Malformed(_))
        ));

        let no_title = track_event(json!({ "artists": [] }));
        assert!(matches!(
            NowPlaying::from_event(&no_title),
            Err(TrackError::MissingTitle)
        ));

        let bad_artists = track_event(json!({ "title": "t", "artists": "nope" }));
        assert!(NowPlaying::from_event(&bad_artists).is_err());
    }

    #[test]
    fn test_loading_placeholder() {
        let np = NowPlaying::default();
        assert_eq!(np.title, LOADING);
        assert_eq!(np.cover, None);
    }
}
