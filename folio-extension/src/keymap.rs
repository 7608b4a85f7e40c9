//! Key bindings.
//!
//! Key names follow the `Mod-Shift-a` convention: modifiers joined by `-`,
//! then the key. `Mod` means `Meta` on macOS and `Ctrl` elsewhere. Names are
//! normalized so that every spelling of a binding compares equal.

use crate::error::{ExtensionError, ExtensionResult};
use crate::state::EditorState;
use folio_transform::Transaction;
use std::fmt;
use std::sync::Arc;

/// An editor command: returns a transaction when it applies.
pub type Command = Arc<dyn Fn(&EditorState) -> Option<Transaction> + Send + Sync>;

/// An ordered set of key bindings.
#[derive(Clone, Default)]
pub struct Keymap {
    bindings: Vec<(String, Command)>,
}

impl Keymap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `key` to a command, replacing an earlier binding of the same key.
    #[must_use]
    pub fn bind<F>(self, key: impl Into<String>, command: F) -> Self
    where
        F: Fn(&EditorState) -> Option<Transaction> + Send + Sync + 'static,
    {
        self.bind_command(key, Arc::new(command))
    }

    #[must_use]
    pub fn bind_command(mut self, key: impl Into<String>, command: Command) -> Self {
        let key = key.into();
        match self.bindings.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = command,
            None => self.bindings.push((key, command)),
        }
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Rewrites every key to its normalized form.
    pub fn normalize(&self, mac: bool) -> ExtensionResult<Keymap> {
        let mut normalized = Keymap::new();
        for (key, command) in &self.bindings {
            normalized = normalized.bind_command(normalize_key_name(key, mac)?, Arc::clone(command));
        }
        Ok(normalized)
    }

    /// Runs the command bound to `key`, which must already be normalized.
    pub fn handle(&self, key: &str, state: &EditorState) -> Option<Transaction> {
        let (_, command) = self.bindings.iter().find(|(k, _)| k == key)?;
        command(state)
    }
}

impl fmt::Debug for Keymap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}

/// Normalizes a key name to `Shift-Meta-Ctrl-Alt-<key>` order.
///
/// `Space` becomes `" "`, and a trailing `-` after a separator names the
/// minus key itself (`Mod--`).
pub fn normalize_key_name(name: &str, mac: bool) -> ExtensionResult<String> {
    let (modifiers, key) = if name == "-" {
        ("", "-")
    } else if let Some(mods) = name.strip_suffix("--") {
        (mods, "-")
    } else {
        name.rsplit_once('-').unwrap_or(("", name))
    };
    let key = if key == "Space" { " " } else { key };

    let (mut alt, mut ctrl, mut shift, mut meta) = (false, false, false, false);
    for modifier in modifiers.split('-').filter(|m| !m.is_empty()) {
        match modifier.to_ascii_lowercase().as_str() {
            "cmd" | "meta" | "m" => meta = true,
            "a" | "alt" => alt = true,
            "c" | "ctrl" | "control" => ctrl = true,
            "s" | "shift" => shift = true,
            "mod" if mac => meta = true,
            "mod" => ctrl = true,
            _ => {
                return Err(ExtensionError::InvalidKey {
                    key: name.to_string(),
                    modifier: modifier.to_string(),
                })
            }
        }
    }

    let mut result = String::new();
    for (on, prefix) in [(shift, "Shift-"), (meta, "Meta-"), (ctrl, "Ctrl-"), (alt, "Alt-")] {
        if on {
            result.push_str(prefix);
        }
    }
    result.push_str(key);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifiers_are_reordered() {
        assert_eq!(normalize_key_name("Alt-Shift-x", false).unwrap(), "Shift-Alt-x");
        assert_eq!(normalize_key_name("Ctrl-Cmd-x", false).unwrap(), "Meta-Ctrl-x");
    }

    #[test]
    fn minus_key_survives_splitting() {
        assert_eq!(normalize_key_name("Mod--", false).unwrap(), "Ctrl--");
        assert_eq!(normalize_key_name("-", true).unwrap(), "-");
    }
}
