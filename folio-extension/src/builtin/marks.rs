use crate::commands::toggle_mark;
use crate::extension::MarkExtension;
use crate::input_rules::{mark_input_rule, InputRule};
use crate::keymap::Keymap;
use folio_model::{AttrSpec, Attrs, MarkSpec, MarkType};
use serde_json::json;
use std::sync::Arc;

/// A mark extension with delimiter rules and toggle keys.
fn delimited(name: &str, spec: MarkSpec, patterns: &'static [&'static str], keys: &'static [&'static str]) -> MarkExtension {
    MarkExtension::new(name, spec)
        .input_rules(move |ty| patterns.iter().map(|p| mark_input_rule(p, ty)).collect())
        .keymap(move |ty| {
            keys.iter()
                .fold(Keymap::new(), |keymap, key| keymap.bind_command(*key, toggle_mark(ty, None)))
        })
}

pub fn bold() -> MarkExtension {
    delimited(
        "bold",
        MarkSpec::new(),
        &[r"(?:\*\*)([^*]+)(?:\*\*)$"],
        &["Mod-b", "Mod-B"],
    )
}

pub fn italic() -> MarkExtension {
    delimited(
        "italic",
        MarkSpec::new(),
        &[r"(?:^|[^_])(_([^_]+)_)$", r"(?:^|[^*])(\*([^*]+)\*)$"],
        &["Mod-i", "Mod-I"],
    )
}

pub fn underline() -> MarkExtension {
    delimited("underline", MarkSpec::new(), &[r"(?:__)([^_]+)(?:__)$"], &["Mod-u"])
}

pub fn strikethrough() -> MarkExtension {
    delimited(
        "strikethrough",
        MarkSpec::new(),
        &[r"(?:~~)([^~]+)(?:~~)$"],
        &["Shift-Mod-s"],
    )
}

pub fn highlight() -> MarkExtension {
    delimited("highlight", MarkSpec::new(), &[r"(?:==)([^=]+)(?:==)$"], &["Mod-Ctrl-h"])
}

/// Inline code. Excludes every other mark.
pub fn code() -> MarkExtension {
    delimited(
        "code",
        MarkSpec::new().excludes("_"),
        &[r"(?:^|[^`])(`([^`]+)`)$"],
        &["Mod-`"],
    )
}

/// Links. Typing `[text](https://…)` or `<https://…>` creates one.
pub fn link() -> MarkExtension {
    let spec = MarkSpec::new()
        .attr("href", AttrSpec::with_default(""))
        .inclusive(false);
    MarkExtension::new("link", spec).input_rules(|ty| {
        Ok(vec![
            link_rule(r"\[(.+)\]\((https?://\S+)\)$", ty, 1, 2)?,
            link_rule(r"<(https?://\S+)>$", ty, 1, 1)?,
        ])
    })
}

/// Replaces the match with the text of group `text`, linked to group `href`.
fn link_rule(pattern: &str, ty: &Arc<MarkType>, text: usize, href: usize) -> crate::ExtensionResult<InputRule> {
    let ty = Arc::clone(ty);
    InputRule::new(pattern, move |state, m, start, end| {
        let label = m.get(text)?;
        let attrs: Attrs = serde_json::from_value(json!({ "href": m.get(href)? })).ok()?;
        let mark = ty.create(Some(&attrs)).ok()?;
        let node = state.schema().text(label, Vec::new()).ok()?;
        let mut tr = state.tr();
        tr.replace_with(start, end, vec![node]).ok()?;
        tr.add_mark(start, start + label.chars().count(), &mark).ok()?;
        Some(tr)
    })
}
