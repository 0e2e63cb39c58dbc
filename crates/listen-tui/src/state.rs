//! StateManager — the now-playing record and playback status shared between
//! the gateway dispatch path, the input loop and every render loop.
//!
//! Writers replace whole values under a write lock, so a reader sees either
//! the previous value or the next one, never a mix. After each write a
//! `StateChange` goes out on a broadcast channel; the reactive render loop
//! redraws once per notification.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use listen_proto::gateway::MetadataEvent;
use listen_proto::playback::{PlaybackStatus, PlayerCommand};
use listen_proto::track::NowPlaying;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const CHANGE_CAPACITY: usize = 256;

/// What changed. Receivers re-read the state; the variant is a hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    Track,
    Playback,
    Phase,
    /// No data changed, but every region should be painted again.
    Redraw,
}

/// Coarse lifecycle of the client, shown in the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Playing,
    PlayerExited,
    Quitting,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Starting => "Initializing...",
            Phase::Playing => "Playing",
            Phase::PlayerExited => "Player exited",
            Phase::Quitting => "Quitting...",
        }
    }
}

/// Consistent-per-field copy handed to renderers.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub now_playing: Arc<NowPlaying>,
    pub playback: PlaybackStatus,
    pub phase: Phase,
    pub rev: u64,
}

pub struct StateManager {
    now_playing: RwLock<Arc<NowPlaying>>,
    playback: RwLock<PlaybackStatus>,
    phase: RwLock<Phase>,
    volume_step: u8,
    rev: AtomicU64,
    changes: broadcast::Sender<StateChange>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl StateManager {
    pub fn new(default_volume: u8, volume_step: u8) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            now_playing: RwLock::new(Arc::new(NowPlaying::loading())),
            playback: RwLock::new(PlaybackStatus::new(default_volume)),
            phase: RwLock::new(Phase::Starting),
            volume_step,
            rev: AtomicU64::new(1),
            changes,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.changes.subscribe()
    }

    pub fn now_playing(&self) -> Arc<NowPlaying> {
        Arc::clone(&read(&self.now_playing))
    }

    pub fn playback(&self) -> PlaybackStatus {
        *read(&self.playback)
    }

    pub fn phase(&self) -> Phase {
        read(&self.phase).clone()
    }

    pub fn rev(&self) -> u64 {
        self.rev.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            now_playing: self.now_playing(),
            playback: self.playback(),
            phase: self.phase(),
            rev: self.rev(),
        }
    }

    /// Replace the current track wholesale.
    pub fn set_now_playing(&self, track: NowPlaying) {
        {
            let mut slot = write(&self.now_playing);
            *slot = Arc::new(track);
        }
        self.publish(StateChange::Track);
    }

    /// Gateway dispatch: replace the record when `event` announces a track.
    ///
    /// Returns `true` when the record changed. Malformed track events are
    /// dropped and the previous record stays.
    pub fn apply_metadata(&self, event: &MetadataEvent) -> bool {
        match NowPlaying::from_event(event) {
            Ok(Some(track)) => {
                info!("now playing: {} / {}", track.title, track.artist);
                self.set_now_playing(track);
                true
            }
            Ok(None) => {
                debug!("ignoring gateway event {:?}", event.kind);
                false
            }
            Err(e) => {
                warn!("dropping track event: {}", e);
                false
            }
        }
    }

    /// Apply a user command to the playback status. Returns the new status.
    pub fn apply_command(&self, cmd: PlayerCommand) -> PlaybackStatus {
        let next = {
            let mut status = write(&self.playback);
            *status = status.apply(cmd, self.volume_step);
            *status
        };
        self.publish(StateChange::Playback);
        next
    }

    pub fn set_playing(&self, playing: bool) {
        {
            let mut status = write(&self.playback);
            status.playing = playing;
        }
        self.publish(StateChange::Playback);
    }

    pub fn set_phase(&self, phase: Phase) {
        {
            let mut slot = write(&self.phase);
            *slot = phase;
        }
        self.publish(StateChange::Phase);
    }

    pub fn request_redraw(&self) {
        self.publish(StateChange::Redraw);
    }

    fn publish(&self, change: StateChange) {
        let rev = self.rev.fetch_add(1, Ordering::AcqRel) + 1;
        // No subscribers is fine (e.g. before the render loops start).
        if self.changes.send(change).is_err() {
            debug!("state change {:?} rev={} had no listeners", change, rev);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    fn track(i: usize) -> NowPlaying {
        NowPlaying {
            title: format!("title-{}", i),
            album: format!("album-{}", i),
            artist: format!("artist-{}", i),
            cover: Some(format!("cover-{}", i)),
            ..NowPlaying::loading()
        }
    }

    #[test]
    fn test_starts_with_placeholders() {
        let state = StateManager::new(100, 5);
        let snap = state.snapshot();
        assert_eq!(*snap.now_playing, NowPlaying::loading());
        assert_eq!(snap.playback.volume, 100);
        assert_eq!(snap.phase, Phase::Starting);
    }

    #[test]
    fn test_every_mutation_is_announced_once() {
        let state = StateManager::new(50, 5);
        let mut rx = state.subscribe();

        state.set_now_playing(track(1));
        state.apply_command(PlayerCommand::VolumeUp);
        state.set_phase(Phase::Playing);
        state.request_redraw();

        assert_eq!(rx.try_recv().unwrap(), StateChange::Track);
        assert_eq!(rx.try_recv().unwrap(), StateChange::Playback);
        assert_eq!(rx.try_recv().unwrap(), StateChange::Phase);
        assert_eq!(rx.try_recv().unwrap(), StateChange::Redraw);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_apply_command_uses_configured_step() {
        let state = StateManager::new(98, 5);
        assert_eq!(state.apply_command(PlayerCommand::VolumeUp).volume, 100);
        assert_eq!(state.apply_command(PlayerCommand::VolumeDown).volume, 95);
        let muted = state.apply_command(PlayerCommand::ToggleMute);
        assert!(muted.muted);
        assert_eq!(state.playback(), muted);
    }

    fn track_event(data: serde_json::Value) -> MetadataEvent {
        MetadataEvent {
            kind: Some("TRACK_UPDATE".to_string()),
            data,
        }
    }

    #[test]
    fn test_track_event_replaces_record() {
        let state = StateManager::new(100, 5);
        let mut rx = state.subscribe();
        let changed = state.apply_metadata(&track_event(serde_json::json!({
            "song": {
                "title": "Song",
                "artists": [{ "name": "A" }, { "name": "B" }],
                "albums": [{ "name": "X", "image": "x.jpg" }]
            }
        })));
        assert!(changed);
        let np = state.now_playing();
        assert_eq!(np.title, "Song");
        assert_eq!(np.artist, "A  B");
        assert_eq!(np.album, "X");
        assert_eq!(np.cover.as_deref(), Some("https://cdn.listen.moe/covers/x.jpg"));
        assert_eq!(rx.try_recv().unwrap(), StateChange::Track);
    }

    #[test]
    fn test_malformed_event_keeps_previous_record() {
        let state = StateManager::new(100, 5);
        state.set_now_playing(track(7));
        let mut rx = state.subscribe();

        assert!(!state.apply_metadata(&track_event(serde_json::json!({ "listeners": 3 }))));
        assert!(!state.apply_metadata(&MetadataEvent {
            kind: Some("QUEUE_UPDATE".to_string()),
            data: serde_json::json!({ "song": { "title": "not a track" } }),
        }));

        assert_eq!(*state.now_playing(), track(7));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_rev_increases_with_writes() {
        let state = StateManager::new(50, 5);
        let before = state.rev();
        state.set_playing(false);
        assert!(state.rev() > before);
        assert!(!state.playback().playing);
    }

    #[test]
    fn test_readers_never_see_a_torn_record() {
        let state = Arc::new(StateManager::new(100, 5));
        let stop = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let state = Arc::clone(&state);
                let stop = Arc::clone(&stop);
                std::thread::spawn(move || {
                    let mut seen = 0usize;
                    while !stop.load(Ordering::Relaxed) {
                        let np = state.now_playing();
                        if np.title == listen_proto::track::LOADING {
                            continue;
                        }
                        let n = np.title.trim_start_matches("title-");
                        assert_eq!(np.album, format!("album-{}", n));
                        assert_eq!(np.artist, format!("artist-{}", n));
                        assert_eq!(np.cover.as_deref(), Some(format!("cover-{}", n).as_str()));
                        seen += 1;
                    }
                    seen
                })
            })
            .collect();

        for i in 0..5_000 {
            state.set_now_playing(track(i));
        }
        stop.store(true, Ordering::Relaxed);

        for r in readers {
            r.join().unwrap();
        }
        assert_eq!(state.now_playing().title, "title-4999");
    }
}
