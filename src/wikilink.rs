//! Wikilink extraction and target normalization.
//!
//! A wikilink is a `[[Target]]` or `[[Target|Alias]]` inline reference
//! from one note to another. Embedded images use the same bracket
//! syntax prefixed with `!` and are excluded here (see
//! [`crate::image_ref`]).

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // [[target]] or [[target|alias]]; the preceding-`!` exclusion for
    // image embeds is an explicit byte check since the regex crate has
    // no lookbehind.
    static ref WIKILINK_RE: Regex = Regex::new(r"\[\[([^\]]+)\]\]").unwrap();
}

/// Extract normalized wikilink targets from markdown content.
///
/// Order of occurrence is preserved and duplicates are kept; callers
/// that create edges are idempotent per target anyway.
///
/// ```rust
/// use notegraph::wikilink::extract_wikilinks;
/// let links = extract_wikilinks("[[A]] ![[A.png]] [[B|alias]]");
/// assert_eq!(links, vec!["A.md", "B.md"]);
/// ```
pub fn extract_wikilinks(content: &str) -> Vec<String> {
    if content.trim().is_empty() {
        return Vec::new();
    }

    let bytes = content.as_bytes();
    let mut links = Vec::new();

    for caps in WIKILINK_RE.captures_iter(content) {
        let whole = caps.get(0).unwrap();
        if whole.start() > 0 && bytes[whole.start() - 1] == b'!' {
            // ![[...]] is an embedded image, not a wikilink
            continue;
        }

        let mut target = caps.get(1).unwrap().as_str().trim();

        // [[note|alias]] — only the part before the pipe is the target
        if let Some(pipe) = target.find('|') {
            target = target[..pipe].trim();
        }

        if target.is_empty() {
            continue;
        }

        links.push(normalize_file_name(target));
    }

    links
}

/// Normalize a wikilink target into the stored file name used for
/// resolution.
///
/// Strips any directory prefix (both `/` and `\` separators) and
/// appends a `.md` suffix unless one is already present
/// (case-insensitive).
///
/// ```rust
/// use notegraph::wikilink::normalize_file_name;
/// assert_eq!(normalize_file_name("folder/Note"), "Note.md");
/// ```
pub fn normalize_file_name(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        return String::new();
    }

    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    if base.to_lowercase().ends_with(".md") {
        base.to_string()
    } else {
        format!("{base}.md")
    }
}
