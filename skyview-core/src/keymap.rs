//! Key-binding table.
//!
//! Bindings are written `[ctrl-][alt-][shift-]<key>` where `<key>` is a single
//! character or one of the named keys (`space`, `tab`, `backtab`, `enter`,
//! `esc`, `up`, `down`, `left`, `right`, `pgup`, `pgdn`, `home`, `end`,
//! `backspace`, `delete`, `f1`..`f12`). The same key may serve several
//! actions; the focused view decides which one applies.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyName {
    Char(char),
    Space,
    Tab,
    BackTab,
    Enter,
    Esc,
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Home,
    End,
    Backspace,
    Delete,
    F(u8),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyBinding {
    pub key: KeyName,
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyBindingError {
    #[error("unknown action '{0}'")]
    UnknownAction(String),
    #[error("cannot parse key binding '{0}'")]
    Unparsable(String),
}

impl KeyBinding {
    pub const fn plain(key: KeyName) -> Self {
        Self {
            key,
            ctrl: false,
            alt: false,
            shift: false,
        }
    }

    pub const fn ch(c: char) -> Self {
        Self::plain(KeyName::Char(c))
    }

    pub const fn ctrl(c: char) -> Self {
        Self {
            ctrl: true,
            ..Self::ch(c)
        }
    }

    pub const fn alt(c: char) -> Self {
        Self {
            alt: true,
            ..Self::ch(c)
        }
    }

    /// Shift on a character is carried by the character itself.
    pub fn normalized(mut self) -> Self {
        if let KeyName::Char(c) = self.key {
            if self.shift {
                self.key = KeyName::Char(c.to_ascii_uppercase());
            }
            self.shift = false;
        }
        if self.key == KeyName::Char(' ') {
            self.key = KeyName::Space;
        }
        if self.key == KeyName::Tab && self.shift {
            self.key = KeyName::BackTab;
            self.shift = false;
        }
        self
    }
}

impl FromStr for KeyBinding {
    type Err = KeyBindingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || KeyBindingError::Unparsable(s.to_string());
        let mut rest = s.trim();
        let mut binding = KeyBinding::plain(KeyName::Esc);
        loop {
            let lower = rest.to_ascii_lowercase();
            if lower.starts_with("ctrl-") && rest.len() > 5 {
                binding.ctrl = true;
                rest = &rest[5..];
            } else if lower.starts_with("alt-") && rest.len() > 4 {
                binding.alt = true;
                rest = &rest[4..];
            } else if lower.starts_with("shift-") && rest.len() > 6 {
                binding.shift = true;
                rest = &rest[6..];
            } else {
                break;
            }
        }

        let mut chars = rest.chars();
        binding.key = match (chars.next(), chars.next()) {
            (Some(c), None) => KeyName::Char(c),
            (None, _) => return Err(err()),
            _ => match rest.to_ascii_lowercase().as_str() {
                "space" => KeyName::Space,
                "tab" => KeyName::Tab,
                "backtab" => KeyName::BackTab,
                "enter" | "return" => KeyName::Enter,
                "esc" | "escape" => KeyName::Esc,
                "up" => KeyName::Up,
                "down" => KeyName::Down,
                "left" => KeyName::Left,
                "right" => KeyName::Right,
                "pgup" | "pageup" => KeyName::PageUp,
                "pgdn" | "pagedown" => KeyName::PageDown,
                "home" => KeyName::Home,
                "end" => KeyName::End,
                "backspace" => KeyName::Backspace,
                "delete" | "del" => KeyName::Delete,
                f if f.starts_with('f') => {
                    let n: u8 = f[1..].parse().map_err(|_| err())?;
                    if !(1..=12).contains(&n) {
                        return Err(err());
                    }
                    KeyName::F(n)
                }
                _ => return Err(err()),
            },
        };
        Ok(binding.normalized())
    }
}

impl fmt::Display for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            f.write_str("ctrl-")?;
        }
        if self.alt {
            f.write_str("alt-")?;
        }
        if self.shift {
            f.write_str("shift-")?;
        }
        match self.key {
            KeyName::Char(c) => write!(f, "{c}"),
            KeyName::Space => f.write_str("space"),
            KeyName::Tab => f.write_str("tab"),
            KeyName::BackTab => f.write_str("backtab"),
            KeyName::Enter => f.write_str("enter"),
            KeyName::Esc => f.write_str("esc"),
            KeyName::Up => f.write_str("up"),
            KeyName::Down => f.write_str("down"),
            KeyName::Left => f.write_str("left"),
            KeyName::Right => f.write_str("right"),
            KeyName::PageUp => f.write_str("pgup"),
            KeyName::PageDown => f.write_str("pgdn"),
            KeyName::Home => f.write_str("home"),
            KeyName::End => f.write_str("end"),
            KeyName::Backspace => f.write_str("backspace"),
            KeyName::Delete => f.write_str("delete"),
            KeyName::F(n) => write!(f, "f{n}"),
        }
    }
}

macro_rules! actions {
    ($($variant:ident => $name:literal, $binding:expr, $help:literal;)*) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Action {
            $($variant,)*
        }

        impl Action {
            pub const ALL: &'static [Action] = &[$(Action::$variant,)*];

            /// Name used in the `keymap` section of the config file.
            pub fn name(&self) -> &'static str {
                match self {
                    $(Action::$variant => $name,)*
                }
            }

            pub fn help(&self) -> &'static str {
                match self {
                    $(Action::$variant => $help,)*
                }
            }

            pub fn default_binding(&self) -> KeyBinding {
                match self {
                    $(Action::$variant => $binding,)*
                }
            }
        }
    };
}

actions! {
    Help => "help", KeyBinding::ch('?'), "toggle help";
    Back => "back", KeyBinding::plain(KeyName::Esc), "close overlay / back to catalogue";
    QuickSwitcher => "quick_switcher", KeyBinding { ctrl: true, ..KeyBinding::plain(KeyName::Space) }, "quick service switcher";
    PageList => "page_list", KeyBinding::ctrl('p'), "page list";
    ProfilePicker => "profile_picker", KeyBinding::ctrl('a'), "switch profile";
    ClearTable => "clear_table", KeyBinding::ctrl('x'), "clear table";
    Find => "find", KeyBinding::ch('/'), "find";
    Confirm => "confirm", KeyBinding::plain(KeyName::Enter), "select / confirm";
    Quit => "quit", KeyBinding::ctrl('c'), "quit";
    PrevPage => "prev_page", KeyBinding::alt('['), "previous page";
    NextPage => "next_page", KeyBinding::alt(']'), "next page";
    Reload => "reload", KeyBinding::ch('r'), "reset and reload";
    LoadMore => "load_more", KeyBinding::ch('n'), "load more";
    FocusDown => "focus_down", KeyBinding::ctrl('j'), "focus next pane";
    FocusUp => "focus_up", KeyBinding::ctrl('k'), "focus previous pane";
    FocusLeft => "focus_left", KeyBinding::ctrl('h'), "focus previous pane";
    FocusRight => "focus_right", KeyBinding::ctrl('l'), "focus next pane";
    GrowSplit => "grow_split", KeyBinding::alt('j'), "grow split";
    ShrinkSplit => "shrink_split", KeyBinding::alt('k'), "shrink split";
    ResetSplit => "reset_split", KeyBinding::alt('0'), "reset split";
    Left => "left", KeyBinding::ch('h'), "left";
    Down => "down", KeyBinding::ch('j'), "down";
    Up => "up", KeyBinding::ch('k'), "up";
    Right => "right", KeyBinding::ch('l'), "right";
    LineStart => "line_start", KeyBinding::ch('^'), "start of line";
    LineEnd => "line_end", KeyBinding::ch('$'), "end of line";
    Top => "top", KeyBinding::ch('g'), "top";
    Bottom => "bottom", KeyBinding::ch('G'), "bottom";
    NextMatch => "next_match", KeyBinding::ch('n'), "next match";
    PrevMatch => "prev_match", KeyBinding::ch('N'), "previous match";
    NextField => "next_field", KeyBinding::plain(KeyName::Tab), "next field";
    PrevField => "prev_field", KeyBinding::plain(KeyName::BackTab), "previous field";
    Scan => "scan", KeyBinding::ch('s'), "scan";
    Query => "query", KeyBinding::ch('q'), "query";
    RunQuery => "run_query", KeyBinding::ctrl('e'), "run query";
    Copy => "copy", KeyBinding::ch('y'), "copy";
    PageUp => "page_up", KeyBinding::ctrl('u'), "page up";
    PageDown => "page_down", KeyBinding::ctrl('d'), "page down";
    WordLeft => "word_left", KeyBinding::ch('b'), "word left";
    WordRight => "word_right", KeyBinding::ch('w'), "word right";
    Undo => "undo", KeyBinding::ch('u'), "undo";
    Redo => "redo", KeyBinding::ctrl('r'), "redo";
    InsertMode => "insert_mode", KeyBinding::ch('i'), "insert mode";
    Invoke => "invoke", KeyBinding::ch('i'), "invoke function";
    Download => "download", KeyBinding::ch('d'), "download object";
    ParentPrefix => "parent_prefix", KeyBinding::plain(KeyName::Backspace), "up one prefix";
    ToggleSelect => "toggle_select", KeyBinding::plain(KeyName::Space), "toggle selection";
    TimeRange => "time_range", KeyBinding::ch('t'), "query time range";
}

impl FromStr for Action {
    type Err = KeyBindingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .iter()
            .copied()
            .find(|a| a.name() == s.trim())
            .ok_or_else(|| KeyBindingError::UnknownAction(s.trim().to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyMap {
    bindings: BTreeMap<Action, KeyBinding>,
}

impl Default for KeyMap {
    fn default() -> Self {
        Self {
            bindings: Action::ALL
                .iter()
                .map(|a| (*a, a.default_binding()))
                .collect(),
        }
    }
}

impl KeyMap {
    /// Defaults with `overrides` (action name → binding) applied.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Result<Self, KeyBindingError> {
        let mut map = Self::default();
        for (action, binding) in overrides {
            map.bindings.insert(action.parse()?, binding.parse()?);
        }
        Ok(map)
    }

    pub fn binding(&self, action: Action) -> KeyBinding {
        self.bindings
            .get(&action)
            .copied()
            .unwrap_or_else(|| action.default_binding())
    }

    /// Does `key` trigger `action`?
    pub fn is(&self, action: Action, key: &KeyBinding) -> bool {
        self.binding(action) == key.normalized()
    }

    pub fn actions_for(&self, key: &KeyBinding) -> Vec<Action> {
        let key = key.normalized();
        self.bindings
            .iter()
            .filter(|(_, b)| **b == key)
            .map(|(a, _)| *a)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Action, KeyBinding)> + '_ {
        self.bindings.iter().map(|(a, b)| (*a, *b))
    }
}
