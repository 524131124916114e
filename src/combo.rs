//! Hotkey combination parsing
//!
//! Turns text like `Ctrl+Shift+F5` or `Mouse4` into a [`Combo`] of
//! modifiers plus one trigger key or mouse button, and matches live rdev
//! input against it.

use rdev::{Button, Key};
use std::fmt;
use std::str::FromStr;

use crate::ClickerError;

/// Modifier keys held alongside the trigger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Update from a key press/release; returns true if `key` was a modifier
    pub fn update(&mut self, key: Key, pressed: bool) -> bool {
        match key {
            Key::ControlLeft | Key::ControlRight => self.ctrl = pressed,
            Key::ShiftLeft | Key::ShiftRight => self.shift = pressed,
            Key::Alt | Key::AltGr => self.alt = pressed,
            Key::MetaLeft | Key::MetaRight => self.meta = pressed,
            _ => return false,
        }
        true
    }

    fn without(mut self, key: Key) -> Self {
        self.update(key, false);
        self
    }
}

/// What completes the combination
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trigger {
    Key(Key),
    Button(Button),
}

/// A parsed hotkey combination
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Combo {
    pub modifiers: Modifiers,
    pub trigger: Trigger,
}

impl Combo {
    /// Parse combo text. Tokens are separated by `+`, case-insensitive.
    pub fn parse(text: &str) -> Result<Self, ClickerError> {
        let invalid = || ClickerError::InvalidCombo(text.to_string());

        let parts: Vec<&str> = text.split('+').map(str::trim).collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid());
        }

        // A lone modifier is the trigger itself
        if let [single] = parts.as_slice() {
            let trigger = parse_trigger(single)
                .or_else(|| modifier_key(single).map(Trigger::Key))
                .ok_or_else(invalid)?;
            return Ok(Self {
                modifiers: Modifiers::default(),
                trigger,
            });
        }

        let mut modifiers = Modifiers::default();
        let mut trigger = None;
        for part in parts {
            if let Some(key) = modifier_key(part) {
                modifiers.update(key, true);
            } else if trigger.is_none() {
                trigger = Some(parse_trigger(part).ok_or_else(invalid)?);
            } else {
                return Err(invalid());
            }
        }

        Ok(Self {
            modifiers,
            trigger: trigger.ok_or_else(invalid)?,
        })
    }

    /// Does a key press with `held` modifiers complete this combo?
    pub fn matches_key(&self, key: Key, held: Modifiers) -> bool {
        match self.trigger {
            Trigger::Key(trigger) => {
                same_key(trigger, key) && held.without(key) == self.modifiers
            }
            Trigger::Button(_) => false,
        }
    }

    /// Does a mouse button press with `held` modifiers complete this combo?
    pub fn matches_button(&self, button: Button, held: Modifiers) -> bool {
        match self.trigger {
            Trigger::Button(trigger) => trigger == button && held == self.modifiers,
            Trigger::Key(_) => false,
        }
    }

    /// Is this the key or button that completes the combo, regardless of
    /// modifiers? Used for release edges.
    pub fn is_trigger_key(&self, key: Key) -> bool {
        matches!(self.trigger, Trigger::Key(trigger) if same_key(trigger, key))
    }

    pub fn is_trigger_button(&self, button: Button) -> bool {
        matches!(self.trigger, Trigger::Button(trigger) if trigger == button)
    }
}

impl FromStr for Combo {
    type Err = ClickerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Combo::parse(s)
    }
}

impl fmt::Display for Combo {
    /// Canonical text, used as the dispatch key
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.ctrl {
            write!(f, "Ctrl+")?;
        }
        if self.modifiers.shift {
            write!(f, "Shift+")?;
        }
        if self.modifiers.alt {
            write!(f, "Alt+")?;
        }
        if self.modifiers.meta {
            write!(f, "Meta+")?;
        }
        match self.trigger {
            Trigger::Key(key) => f.write_str(&key_name(normalize(key))),
            Trigger::Button(Button::Middle) => f.write_str("Mouse3"),
            Trigger::Button(Button::Unknown(8)) => f.write_str("Mouse4"),
            Trigger::Button(Button::Unknown(9)) => f.write_str("Mouse5"),
            Trigger::Button(other) => write!(f, "{:?}", other),
        }
    }
}

/// Name of `key` that [`Combo::parse`] reads back as the same key
fn key_name(key: Key) -> String {
    const CHARS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-=,./;`";
    if let Some(c) = CHARS.chars().find(|&c| single_char_key(c) == Some(key)) {
        return c.to_string();
    }

    let name = match key {
        Key::ControlLeft => "Ctrl",
        Key::ShiftLeft => "Shift",
        Key::Alt => "Alt",
        Key::MetaLeft => "Meta",
        Key::F1 => "F1",
        Key::F2 => "F2",
        Key::F3 => "F3",
        Key::F4 => "F4",
        Key::F5 => "F5",
        Key::F6 => "F6",
        Key::F7 => "F7",
        Key::F8 => "F8",
        Key::F9 => "F9",
        Key::F10 => "F10",
        Key::F11 => "F11",
        Key::F12 => "F12",
        Key::Escape => "Escape",
        Key::Return => "Enter",
        Key::Space => "Space",
        Key::Tab => "Tab",
        Key::Backspace => "Backspace",
        Key::Delete => "Delete",
        Key::Insert => "Insert",
        Key::Home => "Home",
        Key::End => "End",
        Key::PageUp => "PageUp",
        Key::PageDown => "PageDown",
        Key::UpArrow => "Up",
        Key::DownArrow => "Down",
        Key::LeftArrow => "Left",
        Key::RightArrow => "Right",
        Key::PrintScreen => "PrintScreen",
        Key::ScrollLock => "ScrollLock",
        Key::Pause => "Pause",
        Key::NumLock => "NumLock",
        Key::CapsLock => "CapsLock",
        other => return format!("{:?}", other),
    };
    name.to_string()
}

/// Fold left/right variants together
fn normalize(key: Key) -> Key {
    match key {
        Key::ControlRight => Key::ControlLeft,
        Key::ShiftRight => Key::ShiftLeft,
        Key::MetaRight => Key::MetaLeft,
        Key::AltGr => Key::Alt,
        other => other,
    }
}

fn same_key(a: Key, b: Key) -> bool {
    normalize(a) == normalize(b)
}

fn modifier_key(token: &str) -> Option<Key> {
    let key = match token.to_uppercase().as_str() {
        "CTRL" | "CONTROL" | "CMDORCTRL" | "COMMANDORCONTROL" => Key::ControlLeft,
        "SHIFT" => Key::ShiftLeft,
        "ALT" | "OPTION" => Key::Alt,
        "META" | "SUPER" | "WIN" | "WINDOWS" | "CMD" | "COMMAND" => Key::MetaLeft,
        _ => return None,
    };
    Some(key)
}

fn parse_trigger(token: &str) -> Option<Trigger> {
    let upper = token.to_uppercase();

    if let Some(button) = parse_button(&upper) {
        return Some(Trigger::Button(button));
    }

    let mut chars = upper.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return single_char_key(c).map(Trigger::Key);
    }

    let key = match upper.as_str() {
        "F1" => Key::F1,
        "F2" => Key::F2,
        "F3" => Key::F3,
        "F4" => Key::F4,
        "F5" => Key::F5,
        "F6" => Key::F6,
        "F7" => Key::F7,
        "F8" => Key::F8,
        "F9" => Key::F9,
        "F10" => Key::F10,
        "F11" => Key::F11,
        "F12" => Key::F12,
        "ESCAPE" | "ESC" => Key::Escape,
        "RETURN" | "ENTER" => Key::Return,
        "SPACE" => Key::Space,
        "TAB" => Key::Tab,
        "BACKSPACE" | "BACK" => Key::Backspace,
        "DELETE" | "DEL" => Key::Delete,
        "INSERT" | "INS" => Key::Insert,
        "HOME" => Key::Home,
        "END" => Key::End,
        "PAGEUP" | "PGUP" => Key::PageUp,
        "PAGEDOWN" | "PGDN" | "PGDOWN" => Key::PageDown,
        "ARROWUP" | "UP" => Key::UpArrow,
        "ARROWDOWN" | "DOWN" => Key::DownArrow,
        "ARROWLEFT" | "LEFT" => Key::LeftArrow,
        "ARROWRIGHT" | "RIGHT" => Key::RightArrow,
        "PRINTSCREEN" | "PRTSC" | "PRINT" => Key::PrintScreen,
        "SCROLLLOCK" => Key::ScrollLock,
        "PAUSE" | "BREAK" => Key::Pause,
        "NUMLOCK" => Key::NumLock,
        "CAPSLOCK" | "CAPS" => Key::CapsLock,
        _ => return None,
    };
    Some(Trigger::Key(key))
}

fn parse_button(upper: &str) -> Option<Button> {
    let button = match upper {
        "MOUSEMIDDLE" | "MOUSEBUTTON3" | "MOUSE3" | "MB3" | "MIDDLECLICK" => Button::Middle,
        // X11 numbers the side buttons 8 and 9
        "MOUSEBUTTON4" | "MOUSE4" | "MB4" => Button::Unknown(8),
        "MOUSEBUTTON5" | "MOUSE5" | "MB5" => Button::Unknown(9),
        _ => return None,
    };
    Some(button)
}

fn single_char_key(c: char) -> Option<Key> {
    let key = match c {
        'A' => Key::KeyA,
        'B' => Key::KeyB,
        'C' => Key::KeyC,
        'D' => Key::KeyD,
        'E' => Key::KeyE,
        'F' => Key::KeyF,
        'G' => Key::KeyG,
        'H' => Key::KeyH,
        'I' => Key::KeyI,
        'J' => Key::KeyJ,
        'K' => Key::KeyK,
        'L' => Key::KeyL,
        'M' => Key::KeyM,
        'N' => Key::KeyN,
        'O' => Key::KeyO,
        'P' => Key::KeyP,
        'Q' => Key::KeyQ,
        'R' => Key::KeyR,
        'S' => Key::KeyS,
        'T' => Key::KeyT,
        'U' => Key::KeyU,
        'V' => Key::KeyV,
        'W' => Key::KeyW,
        'X' => Key::KeyX,
        'Y' => Key::KeyY,
        'Z' => Key::KeyZ,
        '0' => Key::Num0,
        '1' => Key::Num1,
        '2' => Key::Num2,
        '3' => Key::Num3,
        '4' => Key::Num4,
        '5' => Key::Num5,
        '6' => Key::Num6,
        '7' => Key::Num7,
        '8' => Key::Num8,
        '9' => Key::Num9,
        '-' => Key::Minus,
        '=' => Key::Equal,
        ',' => Key::Comma,
        '.' => Key::Dot,
        '/' => Key::Slash,
        ';' => Key::SemiColon,
        '`' => Key::BackQuote,
        _ => return None,
    };
    Some(key)
}
