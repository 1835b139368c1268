//! Code exclusion: deciding whether a candidate link occurrence sits inside
//! code and must not be counted or rewritten.
//!
//! The checks run in a fixed order. The inline-backtick check always runs
//! first. When a structural outline is available its code-section verdict is
//! authoritative; otherwise a manual fence scan over the full document lines
//! decides. With neither available the answer is "not excluded" — finding a
//! real reference beats missing one.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::corpus::StructuralHints;

static INLINE_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`[^`]+`").unwrap());

/// Whether the candidate at `candidate_cols` (byte offsets within `line`,
/// when known) on line `line_idx` lies inside code.
pub fn is_excluded(
    line_idx: usize,
    line: &str,
    candidate_cols: Option<(usize, usize)>,
    hints: &StructuralHints,
    all_lines: Option<&[String]>,
) -> bool {
    if is_inline_code(line, candidate_cols) {
        return true;
    }

    match hints {
        StructuralHints::Present(outline) => outline.in_code_section(line_idx),
        StructuralHints::Absent => match all_lines {
            Some(lines) => inside_fence(lines, line_idx),
            None => false,
        },
    }
}

/// Inline-code check: the whole line wrapped in one pair of backticks, or
/// the candidate columns covered by a backtick-delimited span.
fn is_inline_code(line: &str, candidate_cols: Option<(usize, usize)>) -> bool {
    let trimmed = line.trim();
    if trimmed.len() >= 2
        && trimmed.starts_with('`')
        && trimmed.ends_with('`')
        && trimmed.matches('`').count() == 2
    {
        return true;
    }

    if let Some((start, end)) = candidate_cols {
        return INLINE_CODE_RE
            .find_iter(line)
            .any(|span| span.start() <= start && end <= span.end());
    }

    false
}

/// Manual fallback: scan from the top of the document tracking fence
/// open/close state. A fence marker is three or more backticks or tildes;
/// a closing marker must repeat the opening fence character at least three
/// times.
fn inside_fence(lines: &[String], line_idx: usize) -> bool {
    let mut open: Option<char> = None;

    for line in lines.iter().take(line_idx) {
        let trimmed = line.trim_start();
        let Some(fence_char) = trimmed.chars().next().filter(|c| *c == '`' || *c == '~') else {
            continue;
        };
        let run = trimmed.chars().take_while(|c| *c == fence_char).count();
        if run < 3 {
            continue;
        }

        match open {
            None => open = Some(fence_char),
            Some(open_char) if open_char == fence_char => open = None,
            Some(_) => {}
        }
    }

    open.is_some()
}
