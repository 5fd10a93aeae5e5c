use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use syn::spanned::Spanned;

/// AST (Abstract Syntax Tree) parser for Rust source files.
///
/// The `AstParser` uses the `syn` crate to parse Rust source code into an abstract syntax tree,
/// from which doc comments and type declarations are read.
///
/// # Example
///
/// ```no_run
/// use openapi_from_comments::parser::AstParser;
/// use std::path::Path;
///
/// let parsed = AstParser::parse_file(Path::new("src/main.rs")).unwrap();
/// println!("Parsed {} items", parsed.syntax_tree.items.len());
/// ```
pub struct AstParser;

/// A successfully parsed Rust file with its abstract syntax tree.
#[derive(Debug)]
pub struct ParsedFile {
    /// Path to the source file
    pub path: PathBuf,
    /// The parsed abstract syntax tree
    pub syntax_tree: syn::File,
}

/// The doc comment attached to one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocComment {
    /// Comment text with the common indentation removed
    pub text: String,
    /// 1-based line of the first doc line in the file
    pub line: usize,
}

impl AstParser {
    /// Parses a single Rust source file into an AST.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The file contains invalid Rust syntax
    pub fn parse_file(path: &Path) -> Result<ParsedFile> {
        debug!("Parsing file: {}", path.display());

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        let syntax_tree = syn::parse_file(&content)
            .with_context(|| format!("Failed to parse Rust syntax in file: {}", path.display()))?;

        debug!("Successfully parsed file: {}", path.display());

        Ok(ParsedFile {
            path: path.to_path_buf(),
            syntax_tree,
        })
    }
}

/// Collect the `#[doc]` attributes of an item into one comment.
///
/// Returns `None` when the item has no doc lines.
pub fn doc_comment(attrs: &[syn::Attribute]) -> Option<DocComment> {
    let mut lines = Vec::new();
    let mut first_line = None;

    for attr in attrs {
        if !attr.path().is_ident("doc") {
            continue;
        }
        let syn::Meta::NameValue(nv) = &attr.meta else {
            continue;
        };
        let syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Str(s),
            ..
        }) = &nv.value
        else {
            continue;
        };
        if first_line.is_none() {
            first_line = Some(attr.span().start().line);
        }
        let value = s.value();
        lines.extend(value.lines().map(str::to_string));
    }

    let line = first_line?;
    Some(DocComment {
        text: dedent(&lines),
        line: line.max(1),
    })
}

/// Doc text of an item, as plain prose.
pub fn doc_text(attrs: &[syn::Attribute]) -> String {
    doc_comment(attrs)
        .map(|d| d.text.trim().to_string())
        .unwrap_or_default()
}

/// Remove the indentation shared by all non-blank lines.
///
/// Only ASCII spaces and tabs count as indentation; other whitespace is kept
/// as part of the line.
pub fn dedent<S: AsRef<str>>(lines: &[S]) -> String {
    let indent = lines
        .iter()
        .map(AsRef::as_ref)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .map(|l| {
            let l = l.as_ref();
            if l.trim().is_empty() {
                ""
            } else {
                &l[indent..]
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
