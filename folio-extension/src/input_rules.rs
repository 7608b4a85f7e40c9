//! Input rules: patterns matched against text as it is typed.
//!
//! When text is typed, the text before the cursor in the current textblock
//! (plus the typed text) is matched against every rule in order. The first
//! rule whose handler returns a transaction wins; the typed text itself is
//! then not inserted unless the handler inserted it.

use crate::commands::wrap_range;
use crate::error::{ExtensionError, ExtensionResult};
use crate::state::EditorState;
use folio_model::{Attrs, MarkType, NodeType};
use folio_transform::Transaction;
use regex::{Captures, Regex};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Character standing in for non-text inline nodes in matched text.
const LEAF_TEXT: &str = "\u{fffc}";

/// Builds the edit for a matched rule, given the state, the match, and the
/// range the match covers in the document.
pub type RuleHandler =
    Arc<dyn Fn(&EditorState, &RuleMatch, usize, usize) -> Option<Transaction> + Send + Sync>;

/// Computes node or mark attributes from a match.
pub type AttrsFromMatch = Arc<dyn Fn(&RuleMatch) -> Option<Attrs> + Send + Sync>;

/// A pattern and the edit it triggers.
#[derive(Clone)]
pub struct InputRule {
    pattern: Regex,
    handler: RuleHandler,
}

impl InputRule {
    /// Compiles a rule. Patterns should end in `$` so they only match text
    /// ending at the cursor.
    pub fn new<F>(pattern: &str, handler: F) -> ExtensionResult<Self>
    where
        F: Fn(&EditorState, &RuleMatch, usize, usize) -> Option<Transaction> + Send + Sync + 'static,
    {
        let pattern = Regex::new(pattern).map_err(|source| ExtensionError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            pattern,
            handler: Arc::new(handler),
        })
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }
}

impl fmt::Debug for InputRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InputRule").field(&self.pattern.as_str()).finish()
    }
}

/// The groups of a successful match, owned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    groups: Vec<Option<String>>,
}

impl RuleMatch {
    pub fn new(groups: Vec<Option<String>>) -> Self {
        Self { groups }
    }

    fn from_captures(captures: &Captures<'_>) -> Self {
        Self::new(
            captures
                .iter()
                .map(|group| group.map(|m| m.as_str().to_string()))
                .collect(),
        )
    }

    /// The whole matched text.
    pub fn full(&self) -> &str {
        self.get(0).unwrap_or_default()
    }

    /// Group `index`, if it participated in the match.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.groups.get(index).and_then(|g| g.as_deref())
    }

    /// Number of groups, counting the whole match.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Matches `text`, about to replace `from..to`, against the rules.
///
/// Rules never fire inside code blocks. `lookbehind` caps how much of the
/// textblock before the cursor is inspected.
pub fn run_input_rules(
    rules: &[InputRule],
    state: &EditorState,
    from: usize,
    to: usize,
    text: &str,
    lookbehind: usize,
) -> ExtensionResult<Option<Transaction>> {
    let rfrom = state.doc().resolve(from)?;
    let parent = rfrom.parent();
    if parent.ty().spec().code || !parent.inline_content() {
        return Ok(None);
    }
    let offset = rfrom.parent_offset();
    let mut text_before = parent
        .content()
        .text_between(offset.saturating_sub(lookbehind), offset, "", LEAF_TEXT);
    text_before.push_str(text);
    let text_len = text.chars().count();

    for rule in rules {
        let Some(captures) = rule.pattern.captures(&text_before) else {
            continue;
        };
        let matched = RuleMatch::from_captures(&captures);
        let match_len = matched.full().chars().count();
        if match_len < text_len {
            continue;
        }
        let Some(start) = from.checked_sub(match_len - text_len) else {
            continue;
        };
        if let Some(tr) = (rule.handler)(state, &matched, start, to) {
            debug!(pattern = rule.pattern.as_str(), start, end = to, "input rule fired");
            return Ok(Some(tr));
        }
    }
    Ok(None)
}

/// Char index of the first occurrence of `needle` in `haystack`.
fn char_find(haystack: &str, needle: &str) -> Option<usize> {
    haystack.find(needle).map(|b| haystack[..b].chars().count())
}

/// Char index of the last occurrence of `needle` in `haystack`.
fn char_rfind(haystack: &str, needle: &str) -> Option<usize> {
    haystack.rfind(needle).map(|b| haystack[..b].chars().count())
}

/// A rule that applies a mark to delimited text, removing the delimiters.
///
/// The last group of the pattern is the text to mark; the group before it
/// (or the whole match) is the delimited span. The rule does nothing in
/// textblocks that disallow `ty`, or when the span already carries a mark
/// that excludes `ty`.
pub fn mark_input_rule(pattern: &str, ty: &Arc<MarkType>) -> ExtensionResult<InputRule> {
    mark_input_rule_with_attrs(pattern, ty, Arc::new(|_: &RuleMatch| None))
}

/// Like [`mark_input_rule`], with mark attributes taken from the match.
pub fn mark_input_rule_with_attrs(
    pattern: &str,
    ty: &Arc<MarkType>,
    attrs: AttrsFromMatch,
) -> ExtensionResult<InputRule> {
    let ty = Arc::clone(ty);
    InputRule::new(pattern, move |state, matched, start, end| {
        if !state.doc().resolve(start).ok()?.parent().ty().allows_mark(ty.name()) {
            return None;
        }
        let mark = ty.create(attrs(matched).as_ref()).ok()?;
        let mut tr = state.tr();
        let last = matched.len().checked_sub(1)?;
        let (mut mark_start, mut mark_end) = (start, end);

        if let Some(text) = matched.get(last).filter(|t| !t.is_empty() && last > 0) {
            let span = matched.get(last - 1)?;
            let match_start = start + char_find(matched.full(), span)?;
            let match_end = match_start + span.chars().count() - 1;
            let text_start = match_start + char_rfind(span, text)?;
            let text_end = text_start + text.chars().count();

            let mut excluded = false;
            state.doc().nodes_between(start, end, |node, pos, _, _| {
                excluded |= node
                    .marks()
                    .iter()
                    .any(|m| m.ty().excludes(&ty) && pos + node.node_size() > match_start);
                !excluded
            });
            if excluded {
                return None;
            }

            if text_end < match_end {
                tr.delete(text_end, match_end).ok()?;
            }
            if text_start > match_start {
                tr.delete(match_start, text_start).ok()?;
            }
            mark_start = match_start;
            mark_end = mark_start + text.chars().count();
        }

        tr.add_mark(mark_start, mark_end, &mark).ok()?;
        tr.remove_stored_mark(&mark);
        Some(tr)
    })
}

/// A rule that turns the textblock where the match occurs into `ty`.
pub fn textblock_type_input_rule(
    pattern: &str,
    ty: &Arc<NodeType>,
    attrs: AttrsFromMatch,
) -> ExtensionResult<InputRule> {
    let ty = Arc::clone(ty);
    InputRule::new(pattern, move |state, matched, start, end| {
        let rstart = state.doc().resolve(start).ok()?;
        let depth = rstart.depth().checked_sub(1)?;
        let grandparent = rstart.node(depth);
        if !grandparent.can_replace_with(rstart.index(depth), rstart.index_after(depth), &ty) {
            return None;
        }
        let block = rstart.before(rstart.depth());
        let attrs = attrs(matched);
        let mut tr = state.tr();
        tr.delete(start, end).ok()?;
        tr.set_node_markup(block, Some(&ty), attrs.as_ref(), None).ok()?;
        Some(tr)
    })
}

/// A rule that wraps the textblock where the match occurs in `ty`.
pub fn wrapping_input_rule(
    pattern: &str,
    ty: &Arc<NodeType>,
    attrs: AttrsFromMatch,
) -> ExtensionResult<InputRule> {
    let ty = Arc::clone(ty);
    InputRule::new(pattern, move |state, matched, start, end| {
        let attrs = attrs(matched);
        let mut tr = state.tr();
        tr.delete(start, end).ok()?;
        wrap_range(&mut tr, start, start, &ty, attrs.as_ref())?;
        Some(tr)
    })
}
