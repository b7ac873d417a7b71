//! Filename normalisation: mojibake repair and character sanitisation.
//!
//! ## Why the repair step exists
//!
//! Browsers and multipart parsers disagree about filename encodings. A
//! UTF-8 name that took a round trip through a latin-1 decode arrives as
//! mojibake: `отчет.docx` becomes `Ð¾Ñ‚Ñ‡ÐµÑ‚.docx`. The telltale is the
//! marker characters `Ð`, `â`, `Ã` — the latin-1 readings of UTF-8 lead
//! bytes. When a marker is present and every character fits in a single
//! byte, we re-interpret those bytes as UTF-8.
//!
//! This is a heuristic compatibility shim, kept isolated in
//! [`repair_encoding`]: a name that legitimately contains a marker
//! character can misfire. The robust fix is for the upload boundary to
//! declare the encoding; until then this recovers the common case and
//! degrades to a no-op when the byte reinterpretation is not valid UTF-8.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// Characters that almost never appear in honest filenames but always
/// appear when UTF-8 Cyrillic or accented text is mis-decoded as latin-1.
const MOJIBAKE_MARKERS: [char; 3] = ['Ð', 'â', 'Ã'];

/// Everything outside ASCII word characters, Cyrillic, hyphens, and
/// whitespace.
///
/// The word class is deliberately ASCII-only: a Unicode `\w` would let
/// the mojibake marker characters themselves survive sanitisation, and a
/// surviving marker makes the repair heuristic fire again on the next
/// pass — breaking idempotency.
static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9A-Za-z_Ѐ-ӿ\-\s]").expect("valid sanitiser pattern"));

/// Whitespace runs, collapsed to a single underscore.
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Undo a latin-1 round trip if the name looks mis-decoded.
///
/// Returns the input unchanged when no marker is present, when any
/// character is outside the single-byte range, or when the reinterpreted
/// bytes are not valid UTF-8.
pub fn repair_encoding(name: &str) -> String {
    let suspicious = name.chars().any(|c| MOJIBAKE_MARKERS.contains(&c));
    if !suspicious || name.chars().any(|c| c as u32 > 0xFF) {
        return name.to_string();
    }

    // Each char is the latin-1 reading of one original byte.
    let bytes: Vec<u8> = name.chars().map(|c| c as u32 as u8).collect();
    match String::from_utf8(bytes) {
        Ok(repaired) => repaired,
        Err(_) => name.to_string(),
    }
}

/// Derive a filesystem-safe base name from an original filename.
///
/// Repairs the encoding, strips the extension, then keeps ASCII word
/// characters, Cyrillic letters, and hyphens; whitespace runs collapse to
/// one `_` and every other character becomes `_`.
///
/// Idempotent: sanitising an already-sanitised name is a no-op.
pub fn sanitize_base_name(original_name: &str) -> String {
    let repaired = repair_encoding(original_name);

    let stem = Path::new(&repaired)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| repaired.clone());

    let cleaned = DISALLOWED.replace_all(&stem, "_");
    WHITESPACE.replace_all(&cleaned, "_").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ascii_passes_through() {
        assert_eq!(sanitize_base_name("report-final.pdf"), "report-final");
    }

    #[test]
    fn cyrillic_is_preserved() {
        assert_eq!(sanitize_base_name("отчет 2024.docx"), "отчет_2024");
    }

    #[test]
    fn special_characters_become_underscores() {
        assert_eq!(sanitize_base_name("a&b(c)!.png"), "a_b_c__");
        assert_eq!(sanitize_base_name("invoice #42.pdf"), "invoice__42");
    }

    #[test]
    fn whitespace_collapses_to_single_underscore() {
        assert_eq!(sanitize_base_name("my   big\tfile.jpg"), "my_big_file");
    }

    #[test]
    fn mojibake_cyrillic_is_repaired() {
        // "отчет" in UTF-8, each byte read back as latin-1.
        let mangled = "Ð¾Ñ\u{82}Ñ\u{87}ÐµÑ\u{82}.docx";
        assert_eq!(sanitize_base_name(mangled), "отчет");
    }

    #[test]
    fn repair_leaves_invalid_reinterpretation_alone() {
        // Marker present but byte view is not valid UTF-8.
        assert_eq!(repair_encoding("Ðabc"), "Ðabc");
    }

    #[test]
    fn repair_skips_names_with_wide_chars() {
        // Contains a marker AND a char above U+00FF: cannot be a latin-1
        // round trip, so it must not be touched.
        let name = "Ð-документ";
        assert_eq!(repair_encoding(name), name);
    }

    #[test]
    fn marker_characters_do_not_survive_sanitisation() {
        // If a marker made it through, the repair heuristic would fire
        // again on the sanitised name and change it.
        let once = sanitize_base_name("Ðª€");
        assert_eq!(once, "___");
        assert_eq!(sanitize_base_name(&once), once);
    }

    #[test]
    fn non_cyrillic_wide_letters_are_replaced() {
        assert_eq!(sanitize_base_name("café 文件.pdf"), "caf____");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let inputs = [
            "report-final.pdf",
            "отчет 2024.docx",
            "a&b(c)!.png",
            "Ð¾Ñ\u{82}Ñ\u{87}ÐµÑ\u{82}.docx",
            "Ðabc",
            "Ðª€",
            "café 文件.pdf",
            "   ",
            "",
            "weird..name..pdf",
        ];
        for input in inputs {
            let once = sanitize_base_name(input);
            let twice = sanitize_base_name(&once);
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn output_contains_only_allowed_classes() {
        let out = sanitize_base_name("Ð¾Ñ\u{82}Ñ\u{87}ÐµÑ\u{82} (v2) #final!.docx");
        assert!(
            out.chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '-'),
            "unexpected char in {out:?}"
        );
    }
}
