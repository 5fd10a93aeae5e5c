//! Splitting a comment body into header blocks.
//!
//! A header is an unindented line ending in `:`. The indented lines below it
//! form its body:
//!
//! ```text
//! Request body (application/json):
//!   $ref: CreateUser
//!
//! Response 200:
//!   $ref: User
//! ```
//!
//! Directive headers may also carry a one-line body after the colon, as in
//! `Response 204: $empty`.

use crate::error::{Error, Result};

/// Key under which text before the first header is stored.
pub const DESC: &str = "desc";

/// Directive keywords allowed to carry their body on the header line.
const INLINE_HEADERS: &[&str] = &["Path", "Query", "Form", "Request body", "Response"];

/// One header and the text beneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Header line verbatim, including the trailing `:`
    pub header: String,
    /// Body lines with their indentation preserved
    pub body: String,
    /// 1-based line of the header within the comment
    pub line: usize,
}

/// Header blocks in the order they appear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blocks(Vec<Block>);

impl Blocks {
    /// Body of the first block with this header.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|b| b.header == header)
            .map(|b| b.body.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Split a comment into blocks.
///
/// The text before the first header is stored under [`DESC`], and only when
/// it is non-blank. Every other header must have at least one non-blank body
/// line, else [`Error::EmptyHeader`].
pub fn get_blocks(comment: &str) -> Result<Blocks> {
    let mut blocks = Vec::new();
    let mut current = Block {
        header: DESC.to_string(),
        body: String::new(),
        line: 1,
    };
    let mut lines: Vec<&str> = Vec::new();

    for (i, line) in comment.lines().enumerate() {
        let indented = line.starts_with(' ') || line.starts_with('\t');
        let blank = line.trim().is_empty();

        if !indented && !blank {
            if let Some((header, inline)) = split_header(line) {
                finish(&mut blocks, current, &lines)?;
                current = Block {
                    header,
                    body: String::new(),
                    line: i + 1,
                };
                lines = inline.into_iter().collect();
                continue;
            }
            if current.header != DESC {
                return Err(Error::Syntax(format!(
                    "line {}: text after {:?} must be indented: {:?}",
                    i + 1,
                    current.header,
                    line
                )));
            }
        }
        lines.push(line);
    }
    finish(&mut blocks, current, &lines)?;

    Ok(Blocks(blocks))
}

/// Whether an unindented line opens a block.
pub(crate) fn is_header(line: &str) -> bool {
    split_header(line).is_some()
}

/// Recognise a header line, returning it and any body text on the same line.
fn split_header(line: &str) -> Option<(String, Option<&str>)> {
    let trimmed = line.trim_end();
    if trimmed.ends_with(':') {
        return Some((trimmed.to_string(), None));
    }
    if !INLINE_HEADERS.iter().any(|k| trimmed.starts_with(k)) {
        return None;
    }
    let (head, rest) = trimmed.split_once(": ")?;
    let rest = rest.trim();
    if rest.is_empty() {
        return None;
    }
    Some((format!("{}:", head), Some(rest)))
}

fn finish(blocks: &mut Vec<Block>, mut block: Block, lines: &[&str]) -> Result<()> {
    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());
    let body = match (start, end) {
        (Some(s), Some(e)) => lines[s..=e].join("\n"),
        _ => String::new(),
    };

    if body.is_empty() {
        if block.header == DESC {
            return Ok(());
        }
        return Err(Error::EmptyHeader(block.header));
    }
    block.body = body;
    blocks.push(block);
    Ok(())
}
