//! Embedded image reference extraction.
//!
//! Notes embed images with `![[file.png]]` or `![[file.png|300]]`
//! (optional display size after the pipe). Only file names with a
//! known image extension are returned.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref IMAGE_RE: Regex = Regex::new(r"!\[\[([^\]|]+)(?:\|[^\]]*)?\]\]").unwrap();
}

const IMAGE_EXTENSIONS: [&str; 7] = [
    ".png", ".jpg", ".jpeg", ".gif", ".bmp", ".webp", ".svg",
];

/// Extract image file names referenced via the embedded syntax.
///
/// Returns raw (non-path) file names in order of first occurrence;
/// duplicates are preserved — the caller deduplicates via its
/// existence check.
pub fn extract_image_references(content: &str) -> Vec<String> {
    if content.is_empty() {
        return Vec::new();
    }

    IMAGE_RE
        .captures_iter(content)
        .filter_map(|caps| {
            let name = caps.get(1).unwrap().as_str().trim();
            is_image_file(name).then(|| name.to_string())
        })
        .collect()
}

fn is_image_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_embedded_images() {
        let refs = extract_image_references("text ![[diagram.png]] more ![[photo.jpg]]");
        assert_eq!(refs, vec!["diagram.png", "photo.jpg"]);
    }

    #[test]
    fn strips_size_suffix() {
        let refs = extract_image_references("![[chart.webp|400]]");
        assert_eq!(refs, vec!["chart.webp"]);
    }

    #[test]
    fn ignores_non_image_embeds_and_plain_links() {
        assert!(extract_image_references("![[notes.pdf]] [[Other]]").is_empty());
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert_eq!(
            extract_image_references("![[Shot.PNG]]"),
            vec!["Shot.PNG"]
        );
    }

    #[test]
    fn keeps_duplicates() {
        let refs = extract_image_references("![[a.png]] ![[a.png]]");
        assert_eq!(refs, vec!["a.png", "a.png"]);
    }
}
