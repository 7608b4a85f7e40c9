//! The stock extensions of a folio document: a title followed by blocks,
//! the usual inline formatting, and a placeholder plugin.

mod marks;
mod nodes;
mod placeholder;

pub use marks::{bold, code, highlight, italic, link, strikethrough, underline};
pub use nodes::{
    blockquote, bullet_list, code_block, doc, hard_break, heading, image_block, list_item, math_inline,
    ordered_list, paragraph, text, title, todo_list, video_block, CodeBlockIds, EnsureTrailingParagraph,
};
pub use placeholder::{placeholder, Placeholder, BODY_PLACEHOLDER, TITLE_PLACEHOLDER};

use crate::extension::Extension;

/// Every built-in extension, with `doc` content `title block+`.
pub fn default_extensions() -> Vec<Extension> {
    vec![
        placeholder().into(),
        doc("title block+").into(),
        text().into(),
        title().into(),
        paragraph().into(),
        heading().into(),
        blockquote().into(),
        todo_list().into(),
        ordered_list().into(),
        bullet_list().into(),
        list_item().into(),
        code_block().into(),
        image_block().into(),
        video_block().into(),
        math_inline().into(),
        hard_break().into(),
        bold().into(),
        italic().into(),
        underline().into(),
        strikethrough().into(),
        highlight().into(),
        code().into(),
        link().into(),
    ]
}
