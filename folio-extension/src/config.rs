//! Editor configuration.

use serde::{Deserialize, Serialize};

/// Editor-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Whether `Mod-` in key bindings means `Meta-` (macOS) rather than `Ctrl-`.
    pub mac: bool,
    /// Maximum number of characters before the cursor that input rules inspect.
    pub input_rule_lookbehind: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            mac: false,
            input_rule_lookbehind: 500,
        }
    }
}
