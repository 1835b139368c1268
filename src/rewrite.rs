//! Rename-triggered rewriting of image references.
//!
//! `rewrite_references` runs a two-pass sweep per document: a cheap textual
//! filter picks candidate lines containing the old path or display name,
//! then each candidate token is parsed, resolved against the old identity,
//! and rebuilt with the new target. Display text and size survive untouched
//! unless they are themselves the thing being renamed, and the written path
//! style is preserved: a bare file name stays bare, a relative path is
//! recomputed against the referencing document, a full vault path becomes
//! the new full vault path.
//!
//! Documents are processed strictly sequentially; a read or write failure on
//! one document is logged and skipped, never fatal. `handle_rename` wraps
//! the sweep with the [`RenameGuard`] so overlapping notifications for one
//! transition trigger at most one pass.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::codespan;
use crate::config::Settings;
use crate::corpus::{AssetId, Corpus, StructuralHints};
use crate::guard::{RenameGuard, RenameTransition};
use crate::syntax;

/// Per-file outcome of one rewrite pass. `updated_files` counts documents,
/// not occurrences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub updated_files: u32,
    pub touched: BTreeSet<PathBuf>,
}

/// Runs a guarded rewrite for one observed rename. Returns `None` when the
/// guard rejects the transition as a near-duplicate notification; the caller
/// must not retry.
pub fn handle_rename(
    corpus: &mut Corpus,
    settings: &Settings,
    guard: &mut RenameGuard,
    transition: &RenameTransition,
) -> Option<RewriteOutcome> {
    if !guard.admit(&transition.old, &transition.new) {
        debug!(
            old = %transition.old,
            new = %transition.new,
            "duplicate rename notification suppressed"
        );
        return None;
    }

    let outcome = rewrite_references(
        corpus,
        settings,
        &transition.old,
        &transition.new,
        &transition.old_name,
        &transition.new_name,
    );
    debug!(
        old = %transition.old,
        new = %transition.new,
        updated_files = outcome.updated_files,
        "rewrote references"
    );
    Some(outcome)
}

/// Rewrites every occurrence of `old` across the corpus to point at `new`.
pub fn rewrite_references(
    corpus: &mut Corpus,
    settings: &Settings,
    old: &AssetId,
    new: &AssetId,
    old_name: &str,
    new_name: &str,
) -> RewriteOutcome {
    let mut outcome = RewriteOutcome::default();

    let needles = candidate_needles(old, old_name);
    let docs: Vec<PathBuf> = corpus.doc_paths().into_iter().cloned().collect();

    for doc in docs {
        let text = match corpus.read_doc(&doc) {
            Ok(text) => text,
            Err(err) => {
                warn!(doc = %doc.display(), %err, "skipping unreadable document");
                continue;
            }
        };

        if !needles.iter().any(|needle| text.contains(needle.as_str())) {
            continue;
        }

        let rewritten =
            rewrite_doc_text(corpus, settings, &doc, &text, old, new, old_name, new_name, &needles);
        if rewritten == text {
            continue;
        }

        match corpus.write_doc(&doc, &rewritten) {
            Ok(()) => {
                outcome.updated_files += 1;
                outcome.touched.insert(doc);
            }
            Err(err) => {
                warn!(doc = %doc.display(), %err, "failed to write rewritten document");
            }
        }
    }

    outcome
}

/// The cheap pass-1 filter: lines must contain one of these before any
/// per-format parsing happens. The percent-encoded file name covers links
/// written with `%20` escapes.
fn candidate_needles(old: &AssetId, old_name: &str) -> Vec<String> {
    let mut needles = vec![old.vault_path()];
    if let Some(file_name) = old.file_name() {
        needles.push(file_name.to_string());
        if file_name.contains(' ') {
            needles.push(file_name.replace(' ', "%20"));
        }
    }
    if !old_name.is_empty() && !needles.iter().any(|n| n == old_name) {
        needles.push(old_name.to_string());
    }
    needles
}

#[allow(clippy::too_many_arguments)]
fn rewrite_doc_text(
    corpus: &Corpus,
    settings: &Settings,
    doc: &Path,
    text: &str,
    old: &AssetId,
    new: &AssetId,
    old_name: &str,
    new_name: &str,
    needles: &[String],
) -> String {
    let all_lines: Vec<String> = text.lines().map(String::from).collect();
    let hints = StructuralHints::of(text);

    let mut out = String::with_capacity(text.len());

    for (line_idx, segment) in text.split_inclusive('\n').enumerate() {
        let (body, ending) = match segment.strip_suffix('\n') {
            Some(rest) => match rest.strip_suffix('\r') {
                Some(rest) => (rest, "\r\n"),
                None => (rest, "\n"),
            },
            None => (segment, ""),
        };

        if needles.iter().any(|needle| body.contains(needle.as_str())) {
            match rewrite_line(
                corpus, settings, doc, line_idx, body, &hints, &all_lines, old, new, old_name,
                new_name,
            ) {
                Some(rewritten) => out.push_str(&rewritten),
                None => out.push_str(body),
            }
        } else {
            out.push_str(body);
        }
        out.push_str(ending);
    }

    out
}

/// Rewrites every matching occurrence on one line. The search restarts after
/// each substitution since offsets shift; already-rewritten tokens no longer
/// resolve to the old identity, so the loop terminates.
#[allow(clippy::too_many_arguments)]
fn rewrite_line(
    corpus: &Corpus,
    settings: &Settings,
    doc: &Path,
    line_idx: usize,
    body: &str,
    hints: &StructuralHints,
    all_lines: &[String],
    old: &AssetId,
    new: &AssetId,
    old_name: &str,
    new_name: &str,
) -> Option<String> {
    let mut line = body.to_string();
    let mut search_from = 0usize;
    let mut changed = false;

    loop {
        let token = syntax::scan_line(&line).into_iter().find(|token| {
            token.start >= search_from
                && (settings.references_in_codeblocks
                    || !codespan::is_excluded(
                        line_idx,
                        &line,
                        Some((token.start, token.end)),
                        hints,
                        Some(all_lines),
                    ))
                && corpus.resolves_to(&token.link.target, doc, old)
        });
        let Some(token) = token else { break };

        let mut link = token.link.clone();
        link.target = restyle_target(&token.link.target, doc, old, new);
        if link.display_text.as_deref() == Some(old_name) {
            link.display_text = Some(new_name.to_string());
        }

        let replacement = syntax::build(token.format, &link, token.html.as_ref());
        line.replace_range(token.start..token.end, &replacement);
        search_from = token.start + replacement.len();
        changed = true;
    }

    changed.then_some(line)
}

/// Produces the new target text in the same style the old link used.
fn restyle_target(target_raw: &str, doc: &Path, old: &AssetId, new: &AssetId) -> String {
    let decoded = urlencoding::decode(target_raw)
        .map_or_else(|_| target_raw.to_string(), |d| d.to_string());

    // A root-level asset's bare name *is* its full vault path; full-path
    // style wins there so the link follows the asset into its new folder.
    if decoded == old.vault_path() {
        return new.vault_path();
    }

    if !decoded.contains('/') {
        return new.file_name().unwrap_or_default().to_string();
    }

    if decoded.starts_with("./") || decoded.starts_with("../") {
        let doc_dir = doc.parent().unwrap_or(Path::new(""));
        if let Some(relative) = pathdiff::diff_paths(new.as_path(), doc_dir) {
            let mut slash = to_slash(&relative);
            if decoded.starts_with("./") && !slash.starts_with("../") {
                slash.insert_str(0, "./");
            }
            return slash;
        }
    }

    new.vault_path()
}

fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect::<Vec<_>>()
        .join("/")
}
