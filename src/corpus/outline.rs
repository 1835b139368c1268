//! Structural document outlines built from the markdown AST.
//!
//! An outline is the optional structural hint the rest of the crate consumes:
//! it cheaply identifies code sections (authoritative for code exclusion) and
//! inline image nodes (candidate occurrences the scanners merge with their own
//! regex passes). Hints are a capability, not a given; callers must handle
//! [`StructuralHints::Absent`] and fall back to manual scanning.

use std::ops::Range;

use markdown::{mdast::Node, to_mdast, ParseOptions};

/// Structural hints for one document: either an AST-derived outline or nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuralHints {
    Present(DocOutline),
    Absent,
}

impl StructuralHints {
    /// Builds hints for a document. Parse failures degrade to `Absent` rather
    /// than erroring; the manual fallbacks cover the document instead.
    pub fn of(text: &str) -> StructuralHints {
        match DocOutline::parse(text) {
            Some(outline) => StructuralHints::Present(outline),
            None => StructuralHints::Absent,
        }
    }
}

/// A region of lines the AST reports as code (fenced or indented block).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeSection {
    /// First line of the block, zero-based, inclusive.
    pub start_line: usize,
    /// Last line of the block, zero-based, inclusive.
    pub end_line: usize,
}

/// An inline image node reported by the AST, with its byte span in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHint {
    pub url: String,
    pub alt: String,
    pub offsets: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocOutline {
    pub code_sections: Vec<CodeSection>,
    pub images: Vec<ImageHint>,
}

impl DocOutline {
    pub fn parse(text: &str) -> Option<DocOutline> {
        let ast = to_mdast(text, &ParseOptions::default()).ok()?;
        let mut outline = DocOutline::default();

        traverse(&ast, &mut outline);

        Some(outline)
    }

    pub fn in_code_section(&self, line_idx: usize) -> bool {
        self.code_sections
            .iter()
            .any(|section| section.start_line <= line_idx && line_idx <= section.end_line)
    }
}

fn traverse(node: &Node, outline: &mut DocOutline) {
    match node {
        Node::Code(code) => {
            if let Some(position) = &code.position {
                // unist points are 1-based
                outline.code_sections.push(CodeSection {
                    start_line: position.start.line.saturating_sub(1),
                    end_line: position.end.line.saturating_sub(1),
                });
            }
        }
        Node::Image(image) => {
            if let Some(position) = &image.position {
                outline.images.push(ImageHint {
                    url: image.url.clone(),
                    alt: image.alt.clone(),
                    offsets: position.start.offset..position.end.offset,
                });
            }
        }
        _ => {
            if let Some(children) = node.children() {
                for child in children {
                    traverse(child, outline);
                }
            }
        }
    }
}
