//! evdev key events to raw key strings
//!
//! The tracker works on the case-preserved string a key-down produces, the
//! same value a browser reports as `KeyboardEvent.key`. evdev only reports
//! physical key codes, so this module keeps the modifier state needed to
//! recover that string:
//!
//! - letters are upper-case when exactly one of Shift and Caps Lock is active
//! - digits and symbols take their US-layout shifted form while Shift is held
//! - non-character keys map to their browser names (`"Enter"`, `"Shift"`, ...)
//!
//! Presses (value 1) and auto-repeats (value 2) produce a key; releases
//! (value 0) only update modifier state.

use std::collections::HashSet;

use evdev::{EventType, InputEvent, Key};

/// Key event values as reported by evdev
pub mod event_value {
    pub const RELEASE: i32 = 0;
    pub const PRESS: i32 = 1;
    pub const REPEAT: i32 = 2;
}

/// Modifier state of one keyboard
#[derive(Debug, Default)]
pub struct KeyboardState {
    /// Left and right Shift are tracked separately so releasing one while
    /// the other is held keeps the keyboard shifted
    held_shift: HashSet<Key>,
    caps_lock: bool,
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a known Caps Lock state, e.g. the keyboard's LED when the
    /// device is opened.
    pub fn with_caps_lock(caps_lock: bool) -> Self {
        Self {
            caps_lock,
            ..Self::default()
        }
    }

    pub fn shift_held(&self) -> bool {
        !self.held_shift.is_empty()
    }

    pub fn caps_lock(&self) -> bool {
        self.caps_lock
    }

    /// Feed one input event; returns the raw key for key-downs.
    ///
    /// Non-key events (sync, misc scan codes, LEDs) are ignored.
    pub fn process(&mut self, event: &InputEvent) -> Option<String> {
        if event.event_type() != EventType::KEY {
            return None;
        }
        self.key_event(Key::new(event.code()), event.value())
    }

    /// Feed one key transition; returns the raw key for presses and repeats.
    pub fn key_event(&mut self, key: Key, value: i32) -> Option<String> {
        let is_shift = matches!(key, Key::KEY_LEFTSHIFT | Key::KEY_RIGHTSHIFT);

        match value {
            event_value::RELEASE => {
                if is_shift {
                    self.held_shift.remove(&key);
                }
                None
            }
            event_value::PRESS | event_value::REPEAT => {
                if is_shift {
                    self.held_shift.insert(key);
                }
                if key == Key::KEY_CAPSLOCK && value == event_value::PRESS {
                    self.caps_lock = !self.caps_lock;
                }
                self.raw_key(key)
            }
            _ => None,
        }
    }

    fn raw_key(&self, key: Key) -> Option<String> {
        if let Some(letter) = letter(key) {
            let upper = self.shift_held() != self.caps_lock;
            let ch = if upper {
                letter.to_ascii_uppercase()
            } else {
                letter
            };
            return Some(ch.to_string());
        }

        if let Some((plain, shifted)) = symbol(key) {
            let ch = if self.shift_held() { shifted } else { plain };
            return Some(ch.to_string());
        }

        named(key).map(|name| name.to_string())
    }
}

fn letter(key: Key) -> Option<char> {
    let ch = match key {
        Key::KEY_A => 'a',
        Key::KEY_B => 'b',
        Key::KEY_C => 'c',
        Key::KEY_D => 'd',
        Key::KEY_E => 'e',
        Key::KEY_F => 'f',
        Key::KEY_G => 'g',
        Key::KEY_H => 'h',
        Key::KEY_I => 'i',
        Key::KEY_J => 'j',
        Key::KEY_K => 'k',
        Key::KEY_L => 'l',
        Key::KEY_M => 'm',
        Key::KEY_N => 'n',
        Key::KEY_O => 'o',
        Key::KEY_P => 'p',
        Key::KEY_Q => 'q',
        Key::KEY_R => 'r',
        Key::KEY_S => 's',
        Key::KEY_T => 't',
        Key::KEY_U => 'u',
        Key::KEY_V => 'v',
        Key::KEY_W => 'w',
        Key::KEY_X => 'x',
        Key::KEY_Y => 'y',
        Key::KEY_Z => 'z',
        _ => return None,
    };
    Some(ch)
}

/// Digits and symbols as (plain, shifted) on a US layout
fn symbol(key: Key) -> Option<(char, char)> {
    let pair = match key {
        Key::KEY_1 => ('1', '!'),
        Key::KEY_2 => ('2', '@'),
        Key::KEY_3 => ('3', '#'),
        Key::KEY_4 => ('4', '$'),
        Key::KEY_5 => ('5', '%'),
        Key::KEY_6 => ('6', '^'),
        Key::KEY_7 => ('7', '&'),
        Key::KEY_8 => ('8', '*'),
        Key::KEY_9 => ('9', '('),
        Key::KEY_0 => ('0', ')'),
        Key::KEY_MINUS => ('-', '_'),
        Key::KEY_EQUAL => ('=', '+'),
        Key::KEY_LEFTBRACE => ('[', '{'),
        Key::KEY_RIGHTBRACE => (']', '}'),
        Key::KEY_SEMICOLON => (';', ':'),
        Key::KEY_APOSTROPHE => ('\'', '"'),
        Key::KEY_GRAVE => ('`', '~'),
        Key::KEY_BACKSLASH => ('\\', '|'),
        Key::KEY_COMMA => (',', '<'),
        Key::KEY_DOT => ('.', '>'),
        Key::KEY_SLASH => ('/', '?'),
        Key::KEY_SPACE => (' ', ' '),
        _ => return None,
    };
    Some(pair)
}

fn named(key: Key) -> Option<&'static str> {
    let name = match key {
        Key::KEY_ENTER | Key::KEY_KPENTER => "Enter",
        Key::KEY_ESC => "Escape",
        Key::KEY_TAB => "Tab",
        Key::KEY_BACKSPACE => "Backspace",
        Key::KEY_DELETE => "Delete",
        Key::KEY_INSERT => "Insert",
        Key::KEY_HOME => "Home",
        Key::KEY_END => "End",
        Key::KEY_PAGEUP => "PageUp",
        Key::KEY_PAGEDOWN => "PageDown",
        Key::KEY_UP => "ArrowUp",
        Key::KEY_DOWN => "ArrowDown",
        Key::KEY_LEFT => "ArrowLeft",
        Key::KEY_RIGHT => "ArrowRight",
        Key::KEY_CAPSLOCK => "CapsLock",
        Key::KEY_LEFTSHIFT | Key::KEY_RIGHTSHIFT => "Shift",
        Key::KEY_LEFTCTRL | Key::KEY_RIGHTCTRL => "Control",
        Key::KEY_LEFTALT => "Alt",
        Key::KEY_RIGHTALT => "AltGraph",
        Key::KEY_LEFTMETA | Key::KEY_RIGHTMETA => "Meta",
        Key::KEY_F1 => "F1",
        Key::KEY_F2 => "F2",
        Key::KEY_F3 => "F3",
        Key::KEY_F4 => "F4",
        Key::KEY_F5 => "F5",
        Key::KEY_F6 => "F6",
        Key::KEY_F7 => "F7",
        Key::KEY_F8 => "F8",
        Key::KEY_F9 => "F9",
        Key::KEY_F10 => "F10",
        Key::KEY_F11 => "F11",
        Key::KEY_F12 => "F12",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_value::{PRESS, RELEASE, REPEAT};

    #[test]
    fn test_plain_letter() {
        let mut state = KeyboardState::new();
        assert_eq!(state.key_event(Key::KEY_A, PRESS), Some("a".to_string()));
        assert_eq!(state.key_event(Key::KEY_A, RELEASE), None);
    }

    #[test]
    fn test_shifted_letter() {
        let mut state = KeyboardState::new();
        assert_eq!(
            state.key_event(Key::KEY_LEFTSHIFT, PRESS),
            Some("Shift".to_string())
        );
        assert_eq!(state.key_event(Key::KEY_L, PRESS), Some("L".to_string()));
        state.key_event(Key::KEY_LEFTSHIFT, RELEASE);
        assert_eq!(state.key_event(Key::KEY_L, PRESS), Some("l".to_string()));
    }

    #[test]
    fn test_shift_held_until_both_sides_released() {
        let mut state = KeyboardState::new();
        state.key_event(Key::KEY_LEFTSHIFT, PRESS);
        state.key_event(Key::KEY_RIGHTSHIFT, PRESS);
        state.key_event(Key::KEY_LEFTSHIFT, RELEASE);
        assert!(state.shift_held());
        assert_eq!(state.key_event(Key::KEY_A, PRESS), Some("A".to_string()));

        state.key_event(Key::KEY_RIGHTSHIFT, RELEASE);
        assert!(!state.shift_held());
    }

    #[test]
    fn test_caps_lock_toggles_and_inverts_with_shift() {
        let mut state = KeyboardState::new();
        state.key_event(Key::KEY_CAPSLOCK, PRESS);
        state.key_event(Key::KEY_CAPSLOCK, RELEASE);
        assert!(state.caps_lock());
        assert_eq!(state.key_event(Key::KEY_A, PRESS), Some("A".to_string()));

        state.key_event(Key::KEY_LEFTSHIFT, PRESS);
        assert_eq!(state.key_event(Key::KEY_A, PRESS), Some("a".to_string()));
        state.key_event(Key::KEY_LEFTSHIFT, RELEASE);

        state.key_event(Key::KEY_CAPSLOCK, PRESS);
        assert!(!state.caps_lock());
        assert_eq!(state.key_event(Key::KEY_A, PRESS), Some("a".to_string()));
    }

    #[test]
    fn test_starts_with_caps_lock_on() {
        let mut state = KeyboardState::with_caps_lock(true);
        assert_eq!(state.key_event(Key::KEY_A, PRESS), Some("A".to_string()));

        state.key_event(Key::KEY_LEFTSHIFT, PRESS);
        assert_eq!(state.key_event(Key::KEY_A, PRESS), Some("a".to_string()));
        state.key_event(Key::KEY_LEFTSHIFT, RELEASE);

        state.key_event(Key::KEY_CAPSLOCK, PRESS);
        assert_eq!(state.key_event(Key::KEY_A, PRESS), Some("a".to_string()));
    }

    #[test]
    fn test_caps_lock_repeat_does_not_toggle() {
        let mut state = KeyboardState::new();
        state.key_event(Key::KEY_CAPSLOCK, PRESS);
        state.key_event(Key::KEY_CAPSLOCK, REPEAT);
        state.key_event(Key::KEY_CAPSLOCK, REPEAT);
        assert!(state.caps_lock());
    }

    #[test]
    fn test_caps_lock_does_not_shift_symbols() {
        let mut state = KeyboardState::new();
        state.key_event(Key::KEY_CAPSLOCK, PRESS);
        assert_eq!(state.key_event(Key::KEY_1, PRESS), Some("1".to_string()));

        state.key_event(Key::KEY_RIGHTSHIFT, PRESS);
        assert_eq!(state.key_event(Key::KEY_1, PRESS), Some("!".to_string()));
        assert_eq!(state.key_event(Key::KEY_SLASH, PRESS), Some("?".to_string()));
    }

    #[test]
    fn test_repeat_produces_key() {
        let mut state = KeyboardState::new();
        state.key_event(Key::KEY_A, PRESS);
        assert_eq!(state.key_event(Key::KEY_A, REPEAT), Some("a".to_string()));
    }

    #[test]
    fn test_named_keys() {
        let mut state = KeyboardState::new();
        assert_eq!(state.key_event(Key::KEY_ENTER, PRESS), Some("Enter".to_string()));
        assert_eq!(state.key_event(Key::KEY_SPACE, PRESS), Some(" ".to_string()));
        assert_eq!(state.key_event(Key::KEY_UP, PRESS), Some("ArrowUp".to_string()));
        assert_eq!(state.key_event(Key::KEY_MUTE, PRESS), None);
    }

    #[test]
    fn test_process_ignores_non_key_events() {
        let mut state = KeyboardState::new();
        let syn = InputEvent::new(EventType::SYNCHRONIZATION, 0, 0);
        assert_eq!(state.process(&syn), None);

        let press = InputEvent::new(EventType::KEY, Key::KEY_Q.code(), PRESS);
        assert_eq!(state.process(&press), Some("q".to_string()));
    }
}
