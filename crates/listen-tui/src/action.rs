//! Action enum — what a key press asks the client to do.

use listen_proto::playback::PlayerCommand;
use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    VolumeUp,
    VolumeDown,
    ToggleMute,
    TogglePause,
    Redraw,
}

impl Action {
    /// The player command behind this action, if it has one.
    pub fn command(self) -> Option<PlayerCommand> {
        match self {
            Action::VolumeUp => Some(PlayerCommand::VolumeUp),
            Action::VolumeDown => Some(PlayerCommand::VolumeDown),
            Action::ToggleMute => Some(PlayerCommand::ToggleMute),
            Action::TogglePause => Some(PlayerCommand::TogglePause),
            Action::Quit | Action::Redraw => None,
        }
    }
}

/// Map a key event to an action. Releases and unbound keys map to `None`.
pub fn action_for_key(key: KeyEvent) -> Option<Action> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => Some(Action::Quit),
        KeyCode::Char('l') if ctrl => Some(Action::Redraw),
        _ if ctrl => None,

        KeyCode::Char('q') | KeyCode::Esc | KeyCode::End => Some(Action::Quit),
        KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Char('0') | KeyCode::Up => {
            Some(Action::VolumeUp)
        }
        KeyCode::Char('-') | KeyCode::Char('9') | KeyCode::Down => Some(Action::VolumeDown),
        KeyCode::Char('m') => Some(Action::ToggleMute),
        KeyCode::Char(' ') | KeyCode::Char('p') | KeyCode::Enter => Some(Action::TogglePause),
        KeyCode::Char('r') => Some(Action::Redraw),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_quit_keys() {
        for code in [KeyCode::Char('q'), KeyCode::Esc, KeyCode::End] {
            assert_eq!(action_for_key(key(code)), Some(Action::Quit));
        }
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(action_for_key(ctrl_c), Some(Action::Quit));
    }

    #[test]
    fn test_volume_keys() {
        for code in [
            KeyCode::Char('+'),
            KeyCode::Char('='),
            KeyCode::Char('0'),
            KeyCode::Up,
        ] {
            assert_eq!(action_for_key(key(code)), Some(Action::VolumeUp));
        }
        for code in [KeyCode::Char('-'), KeyCode::Char('9'), KeyCode::Down] {
            assert_eq!(action_for_key(key(code)), Some(Action::VolumeDown));
        }
    }

    #[test]
    fn test_toggle_keys() {
        assert_eq!(action_for_key(key(KeyCode::Char('m'))), Some(Action::ToggleMute));
        for code in [KeyCode::Char(' '), KeyCode::Char('p'), KeyCode::Enter] {
            assert_eq!(action_for_key(key(code)), Some(Action::TogglePause));
        }
    }

    #[test]
    fn test_redraw_and_unbound() {
        assert_eq!(action_for_key(key(KeyCode::Char('r'))), Some(Action::Redraw));
        let ctrl_l = KeyEvent::new(KeyCode::Char('l'), KeyModifiers::CONTROL);
        assert_eq!(action_for_key(ctrl_l), Some(Action::Redraw));
        assert_eq!(action_for_key(key(KeyCode::Char('x'))), None);
        let ctrl_q = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL);
        assert_eq!(action_for_key(ctrl_q), None);
    }

    #[test]
    fn test_release_events_are_ignored() {
        let mut ev = key(KeyCode::Char('q'));
        ev.kind = KeyEventKind::Release;
        assert_eq!(action_for_key(ev), None);
    }

    #[test]
    fn test_commands() {
        assert_eq!(Action::VolumeUp.command(), Some(PlayerCommand::VolumeUp));
        assert_eq!(Action::TogglePause.command(), Some(PlayerCommand::TogglePause));
        assert_eq!(Action::Quit.command(), None);
        assert_eq!(Action::Redraw.command(), None);
    }
}
