//! Corpus-wide discovery of image references.
//!
//! `find_references` answers "who references this asset": it scans every
//! document, merges structural (AST image node) hits with the regex passes
//! for every link format, filters out code spans, and emits occurrences
//! deduplicated by exact position. Results are ephemeral and recomputed on
//! every call; nothing here mutates the corpus.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::codespan;
use crate::config::Settings;
use crate::corpus::{AssetId, Corpus, Span, StructuralHints};
use crate::syntax::{self, LinkFormat};

/// One non-code occurrence of an asset link in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub format: LinkFormat,
    /// The matched token exactly as written.
    pub raw: String,
    /// The link target exactly as written (bare name, relative, or full path).
    pub target_raw: String,
    /// The corpus-resolved identity the target refers to.
    pub asset: AssetId,
    pub display_text: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub file: PathBuf,
    pub line: u32,
    pub start_col: u32,
    pub end_col: u32,
}

/// Finds every occurrence of `target` across the corpus, ordered by file
/// then position. The `(file, line, start_col, end_col)` key is unique in
/// the result even when the structural pass and a regex pass both discover
/// the same token.
pub fn find_references(
    corpus: &Corpus,
    settings: &Settings,
    target: &AssetId,
) -> Vec<ImageReference> {
    corpus
        .doc_paths()
        .into_par_iter()
        .flat_map_iter(|doc| scan_doc(corpus, settings, doc, target))
        .collect()
}

/// Scans one document: structural image hints and regex passes merged into
/// a single position-keyed map before emission.
fn scan_doc(
    corpus: &Corpus,
    settings: &Settings,
    doc: &Path,
    target: &AssetId,
) -> Vec<ImageReference> {
    let Some(rope) = corpus.rope(doc) else {
        return vec![];
    };
    let text = rope.to_string();
    let lines: Vec<String> = text.lines().map(String::from).collect();
    let hints = StructuralHints::of(&text);

    let mut occurrences: BTreeMap<(u32, u32, u32), ImageReference> = BTreeMap::new();

    // Structural pass: image nodes the AST reported, all markdown-format.
    if let StructuralHints::Present(outline) = &hints {
        for hint in &outline.images {
            let span = Span::from_byte_range(rope, hint.offsets.clone());
            if span.start.line != span.end.line {
                continue; // a multi-line token never survives a line rewrite anyway
            }
            let line_idx = span.start.line as usize;
            let Some(line) = lines.get(line_idx) else {
                continue;
            };
            let line_start_byte = rope.line_to_byte(line_idx);
            let cols = (
                hint.offsets.start - line_start_byte,
                hint.offsets.end - line_start_byte,
            );

            if !settings.references_in_codeblocks
                && codespan::is_excluded(line_idx, line, Some(cols), &hints, Some(&lines))
            {
                continue;
            }
            if !corpus.resolves_to(&hint.url, doc, target) {
                continue;
            }

            let key = (span.start.line, span.start.character, span.end.character);
            occurrences.entry(key).or_insert_with(|| ImageReference {
                format: LinkFormat::Markdown,
                raw: text[hint.offsets.clone()].to_string(),
                target_raw: hint.url.clone(),
                asset: target.clone(),
                display_text: (!hint.alt.is_empty()).then(|| hint.alt.clone()),
                width: None,
                height: None,
                file: doc.to_path_buf(),
                line: span.start.line,
                start_col: span.start.character,
                end_col: span.end.character,
            });
        }
    }

    // Manual pass: every format, line by line. Tokens the structural pass
    // already accounted for land on the same position key and are dropped.
    for (line_idx, line) in lines.iter().enumerate() {
        for token in syntax::scan_line(line) {
            if !settings.references_in_codeblocks
                && codespan::is_excluded(
                    line_idx,
                    line,
                    Some((token.start, token.end)),
                    &hints,
                    Some(&lines),
                )
            {
                continue;
            }
            if !corpus.resolves_to(&token.link.target, doc, target) {
                continue;
            }

            let start_col = line[..token.start].chars().count() as u32;
            let end_col = line[..token.end].chars().count() as u32;
            let key = (line_idx as u32, start_col, end_col);

            occurrences.entry(key).or_insert_with(|| ImageReference {
                format: token.format,
                raw: token.raw(line).to_string(),
                target_raw: token.link.target.clone(),
                asset: target.clone(),
                display_text: token.link.display_text.clone(),
                width: token.link.width,
                height: token.link.height,
                file: doc.to_path_buf(),
                line: line_idx as u32,
                start_col,
                end_col,
            });
        }
    }

    occurrences.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_vault_dir;
    use std::collections::HashSet;
    use std::fs;

    fn corpus_with(files: &[(&str, &str)]) -> (tempfile::TempDir, Corpus) {
        let (temp_dir, vault_dir) = create_test_vault_dir();
        for (name, content) in files {
            if let Some(parent) = vault_dir.join(name).parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(vault_dir.join(name), content).unwrap();
        }
        let corpus = Corpus::scan(&Settings::default(), &vault_dir).unwrap();
        (temp_dir, corpus)
    }

    #[test]
    fn finds_all_formats_for_one_asset() {
        let (_tmp, corpus) = corpus_with(&[
            ("photo.png", "x"),
            (
                "doc.md",
                "![[photo.png|cap]]\n\n![alt](photo.png)\n\n<img src=\"photo.png\" width=\"50\">\n",
            ),
        ]);

        let refs = find_references(&corpus, &Settings::default(), &AssetId::new("photo.png"));
        let formats: Vec<LinkFormat> = refs.iter().map(|r| r.format).collect();
        assert_eq!(
            formats,
            vec![LinkFormat::WikiEmbed, LinkFormat::Markdown, LinkFormat::Html]
        );
        assert_eq!(refs[0].display_text.as_deref(), Some("cap"));
        assert_eq!(refs[2].width, Some(50));
    }

    #[test]
    fn positions_are_never_duplicated() {
        // The markdown image is discovered both structurally (AST node) and
        // by the regex pass; it must surface once.
        let (_tmp, corpus) = corpus_with(&[
            ("photo.png", "x"),
            ("doc.md", "![alt](photo.png) and ![alt2](photo.png)\n"),
        ]);

        let refs = find_references(&corpus, &Settings::default(), &AssetId::new("photo.png"));
        assert_eq!(refs.len(), 2);

        let keys: HashSet<(&PathBuf, u32, u32, u32)> = refs
            .iter()
            .map(|r| (&r.file, r.line, r.start_col, r.end_col))
            .collect();
        assert_eq!(keys.len(), refs.len(), "position keys must be unique");
    }

    #[test]
    fn bare_relative_and_vault_forms_resolve_to_one_asset() {
        let (_tmp, corpus) = corpus_with(&[
            ("images/photo.png", "x"),
            (
                "notes/doc.md",
                "![[photo.png]]\n![a](../images/photo.png)\n![b](images/photo.png)\n",
            ),
        ]);

        let refs = find_references(
            &corpus,
            &Settings::default(),
            &AssetId::new("images/photo.png"),
        );
        assert_eq!(refs.len(), 3);
        assert!(refs.iter().all(|r| r.asset == AssetId::new("images/photo.png")));
        // Raw targets differ even though the identity is the same.
        let raws: HashSet<&str> = refs.iter().map(|r| r.target_raw.as_str()).collect();
        assert_eq!(raws.len(), 3);
    }

    #[test]
    fn code_fences_and_inline_code_are_not_references() {
        let (_tmp, corpus) = corpus_with(&[
            ("photo.png", "x"),
            (
                "doc.md",
                "```\n![[photo.png]]\n```\n\n`![[photo.png]]`\n\n![[photo.png]]\n",
            ),
        ]);

        let refs = find_references(&corpus, &Settings::default(), &AssetId::new("photo.png"));
        assert_eq!(refs.len(), 1, "only the unfenced occurrence counts");
        assert_eq!(refs[0].line, 6);
    }

    #[test]
    fn codeblock_references_count_when_setting_enabled() {
        let (_tmp, corpus) = corpus_with(&[
            ("photo.png", "x"),
            ("doc.md", "```\n![[photo.png]]\n```\n"),
        ]);

        let settings = Settings {
            references_in_codeblocks: true,
            ..Default::default()
        };
        let refs = find_references(&corpus, &settings, &AssetId::new("photo.png"));
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn other_assets_do_not_match() {
        let (_tmp, corpus) = corpus_with(&[
            ("photo.png", "x"),
            ("other.png", "x"),
            ("doc.md", "![[other.png]]\n"),
        ]);

        let refs = find_references(&corpus, &Settings::default(), &AssetId::new("photo.png"));
        assert!(refs.is_empty());
    }
}
