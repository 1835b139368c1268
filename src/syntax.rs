//! Parsing and construction of image link tokens.
//!
//! Three independent syntaxes embed assets in vault documents:
//!
//! - wiki links, embedded `![[photo.png|caption|800x600]]` or bare
//!   `[[photo.png]]`, with `|`-separated trailing segments;
//! - markdown inline images `![caption](photo.png)`;
//! - HTML `<img src="photo.png" alt="caption" width="800">` tags.
//!
//! Parsers here are pure text functions: they extract `{target, display
//! text, width, height}` from a single token and the builders perform the
//! inverse. `build(parse(x))` is not guaranteed byte-identical to `x`
//! (segment order and whitespace normalize) but always re-parses to the
//! same field values.

use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkFormat {
    WikiEmbed,
    WikiBare,
    Markdown,
    Html,
}

/// The fields common to every image link format.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageLink {
    pub target: String,
    pub display_text: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// One image link token located on a line, with byte offsets into that line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineToken {
    pub format: LinkFormat,
    pub start: usize,
    pub end: usize,
    pub link: ImageLink,
    /// Present for HTML tokens only; carries the attributes not modeled by
    /// [`ImageLink`] so rebuilding can preserve them.
    pub html: Option<HtmlTag>,
}

impl LineToken {
    pub fn raw<'a>(&self, line: &'a str) -> &'a str {
        &line[self.start..self.end]
    }
}

static WIKI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[(?<inner>[^\[\]]+)\]\]").unwrap());

static MD_IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[(?<display>[^\[\]]*)\]\(<?(?<target>[^()]+?)>?\)").unwrap());

static HTML_IMG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<img\b[^<>]*>").unwrap());

static HTML_ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)(?<name>[a-z][a-z0-9-]*)\s*=\s*(?:"(?<dq>[^"]*)"|'(?<sq>[^']*)'|(?<uq>[^\s"'=<>`]+))"#,
    )
    .unwrap()
});

static SIZE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?<w>\d+)(?:x(?<h>\d+))?$").unwrap());

/// Remote and inline-data targets are never vault assets.
fn is_external_target(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://") || target.starts_with("data:")
}

/// Parses the inside of a wiki link (`path|segment|segment`).
///
/// Segment classification is positional: the first segment is always the
/// path; of the rest, the first `NNN` or `NNNxNNN` segment is the size and
/// the first other segment is the display text; extras are dropped. A
/// purely numeric caption is therefore read as a width (see
/// `parses_numeric_caption_as_size`).
pub fn parse_wiki_inner(inner: &str) -> ImageLink {
    let mut segments = inner.split('|');

    let target = segments.next().unwrap_or_default().trim().to_string();
    let mut display_text: Option<String> = None;
    let mut width: Option<u32> = None;
    let mut height: Option<u32> = None;

    for segment in segments {
        let segment = segment.trim();
        if let Some(captures) = SIZE_RE.captures(segment) {
            if width.is_none() {
                width = captures.name("w").and_then(|w| w.as_str().parse().ok());
                height = captures.name("h").and_then(|h| h.as_str().parse().ok());
                continue;
            }
        }
        if display_text.is_none() && !segment.is_empty() {
            display_text = Some(segment.to_string());
        }
    }

    ImageLink {
        target,
        display_text,
        width,
        height,
    }
}

/// Builds a wiki token in canonical order: path, display text, size.
pub fn build_wiki(link: &ImageLink, embed: bool) -> String {
    let mut out = String::new();
    if embed {
        out.push('!');
    }
    out.push_str("[[");
    out.push_str(&link.target);

    if let Some(display) = link.display_text.as_deref().filter(|d| !d.is_empty()) {
        out.push('|');
        out.push_str(display);
    }

    match (link.width, link.height) {
        (Some(w), Some(h)) => out.push_str(&format!("|{}x{}", w, h)),
        (Some(w), None) => out.push_str(&format!("|{}", w)),
        _ => {}
    }

    out.push_str("]]");
    out
}

/// Builds a markdown inline image. Spaces in the target are percent-encoded
/// so the token survives markdown parsing.
pub fn build_markdown(link: &ImageLink) -> String {
    format!(
        "![{}]({})",
        link.display_text.as_deref().unwrap_or_default(),
        link.target.replace(' ', "%20")
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    Double,
    Single,
    Unquoted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlAttr {
    pub name: String,
    pub value: String,
    pub quote: Quote,
}

/// A parsed `<img>` tag: every attribute in source order plus the
/// self-closing style, so the builder can leave untouched attributes alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlTag {
    pub attrs: Vec<HtmlAttr>,
    pub self_closing: bool,
}

impl HtmlTag {
    pub fn parse(raw: &str) -> Option<HtmlTag> {
        if !raw.to_ascii_lowercase().starts_with("<img") {
            return None;
        }

        let attrs = HTML_ATTR_RE
            .captures_iter(raw)
            .map(|captures| {
                let name = captures.name("name").map_or("", |m| m.as_str()).to_string();
                let (value, quote) = match (
                    captures.name("dq"),
                    captures.name("sq"),
                    captures.name("uq"),
                ) {
                    (Some(v), _, _) => (v.as_str().to_string(), Quote::Double),
                    (_, Some(v), _) => (v.as_str().to_string(), Quote::Single),
                    // An unquoted value glued to `/>` keeps the slash out.
                    (_, _, Some(v)) => (
                        v.as_str().trim_end_matches('/').to_string(),
                        Quote::Unquoted,
                    ),
                    _ => (String::new(), Quote::Unquoted),
                };
                HtmlAttr { name, value, quote }
            })
            .collect::<Vec<_>>();

        Some(HtmlTag {
            attrs,
            self_closing: raw.trim_end().ends_with("/>"),
        })
    }

    pub fn get(&self, name: &str) -> Option<&HtmlAttr> {
        self.attrs
            .iter()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
    }

    /// Sets an attribute's value in place, preserving its quote style, or
    /// appends a double-quoted attribute if it was absent.
    pub fn set(&mut self, name: &str, value: &str) {
        match self
            .attrs
            .iter_mut()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
        {
            Some(attr) => attr.value = value.to_string(),
            None => self.attrs.push(HtmlAttr {
                name: name.to_string(),
                value: value.to_string(),
                quote: Quote::Double,
            }),
        }
    }

    pub fn to_image_link(&self) -> Option<ImageLink> {
        let src = self.get("src")?.value.clone();
        let display_text = self
            .get("alt")
            .map(|attr| attr.value.clone())
            .filter(|alt| !alt.is_empty());
        let width = self.get("width").and_then(|attr| attr.value.trim().parse().ok());
        let height = self.get("height").and_then(|attr| attr.value.trim().parse().ok());

        Some(ImageLink {
            target: src,
            display_text,
            width,
            height,
        })
    }
}

/// Re-emits an `<img>` tag. Known attributes come first (src, alt, width,
/// height), then any other original attributes in their original order;
/// quote styles and the self-closing style are preserved.
pub fn build_html(tag: &HtmlTag) -> String {
    const CANONICAL: [&str; 4] = ["src", "alt", "width", "height"];

    let mut out = String::from("<img");

    for name in CANONICAL {
        if let Some(attr) = tag.get(name) {
            push_attr(&mut out, attr);
        }
    }
    for attr in &tag.attrs {
        if !CANONICAL
            .iter()
            .any(|name| attr.name.eq_ignore_ascii_case(name))
        {
            push_attr(&mut out, attr);
        }
    }

    out.push_str(if tag.self_closing { " />" } else { ">" });
    out
}

fn push_attr(out: &mut String, attr: &HtmlAttr) {
    out.push(' ');
    out.push_str(&attr.name);
    out.push('=');
    match attr.quote {
        Quote::Double => {
            out.push('"');
            out.push_str(&attr.value);
            out.push('"');
        }
        Quote::Single => {
            out.push('\'');
            out.push_str(&attr.value);
            out.push('\'');
        }
        Quote::Unquoted => out.push_str(&attr.value),
    }
}

/// Rebuilds a token from its parsed fields, by format.
pub fn build(format: LinkFormat, link: &ImageLink, html: Option<&HtmlTag>) -> String {
    match format {
        LinkFormat::WikiEmbed => build_wiki(link, true),
        LinkFormat::WikiBare => build_wiki(link, false),
        LinkFormat::Markdown => build_markdown(link),
        LinkFormat::Html => match html {
            Some(tag) => {
                let mut tag = tag.clone();
                tag.set("src", &link.target);
                if let Some(display) = &link.display_text {
                    tag.set("alt", display);
                }
                build_html(&tag)
            }
            None => {
                let mut tag = HtmlTag {
                    attrs: vec![],
                    self_closing: false,
                };
                tag.set("src", &link.target);
                if let Some(display) = &link.display_text {
                    tag.set("alt", display);
                }
                if let Some(w) = link.width {
                    tag.set("width", &w.to_string());
                }
                if let Some(h) = link.height {
                    tag.set("height", &h.to_string());
                }
                build_html(&tag)
            }
        },
    }
}

/// Finds every image link token on one line, all formats merged, ordered by
/// start offset. Overlapping matches keep the earliest token (a bare wiki
/// match inside an embed never surfaces separately: the `!` prefix folds the
/// match into the embed token). External http/https/data targets are skipped.
pub fn scan_line(line: &str) -> Vec<LineToken> {
    let mut tokens: Vec<LineToken> = vec![];

    for m in WIKI_RE.captures_iter(line) {
        let full = m.get(0).expect("regex match has a whole");
        let inner = m.name("inner").map_or("", |i| i.as_str());
        let link = parse_wiki_inner(inner);
        if link.target.is_empty() || is_external_target(&link.target) {
            continue;
        }

        let embedded = full.start() > 0 && line.as_bytes()[full.start() - 1] == b'!';
        tokens.push(LineToken {
            format: if embedded {
                LinkFormat::WikiEmbed
            } else {
                LinkFormat::WikiBare
            },
            start: if embedded {
                full.start() - 1
            } else {
                full.start()
            },
            end: full.end(),
            link,
            html: None,
        });
    }

    for m in MD_IMAGE_RE.captures_iter(line) {
        let full = m.get(0).expect("regex match has a whole");
        let target = m.name("target").map_or("", |t| t.as_str()).trim();
        if target.is_empty() || is_external_target(target) {
            continue;
        }

        let display = m.name("display").map_or("", |d| d.as_str());
        tokens.push(LineToken {
            format: LinkFormat::Markdown,
            start: full.start(),
            end: full.end(),
            link: ImageLink {
                target: target.to_string(),
                display_text: (!display.is_empty()).then(|| display.to_string()),
                width: None,
                height: None,
            },
            html: None,
        });
    }

    for m in HTML_IMG_RE.find_iter(line) {
        let Some(tag) = HtmlTag::parse(m.as_str()) else {
            continue;
        };
        let Some(link) = tag.to_image_link() else {
            continue; // an <img> without src references nothing
        };
        if is_external_target(&link.target) {
            continue;
        }

        tokens.push(LineToken {
            format: LinkFormat::Html,
            start: m.start(),
            end: m.end(),
            link,
            html: Some(tag),
        });
    }

    tokens.sort_by_key(|token| (token.start, token.end));

    // Drop any token starting inside an earlier one.
    let mut deduped: Vec<LineToken> = vec![];
    for token in tokens {
        if deduped
            .last()
            .is_some_and(|previous| token.start < previous.end)
        {
            continue;
        }
        deduped.push(token);
    }
    deduped
}
