//! Filename conventions: parsing raw names into subject + slot, and naming
//! the derivatives the pipeline writes.
//!
//! ## Raw names
//!
//! A slotted raw file looks like `[Bride_]<name><sep><slot>.<ext>`:
//!
//! - `Bride_Aish_1.jpg` → subject `aish`, slot 1
//! - `Raadhya Reception 2.mov` → subject `raadhya reception`, slot 2
//! - `Collection_4.png` → the collection subject, slot 4
//!
//! The name is ASCII letters, digits and spaces (shortest match), the
//! separator is any run of underscores and whitespace, and matching is
//! case-insensitive. Anything else is unmatched.
//!
//! ## Derivatives
//!
//! Outputs are always written lowercase with the `bride_` prefix
//! (`bride_aish_1.avif`, `bride_aish_2.mp4`, `bride_aish_2_poster.avif`) or,
//! for single-file uploads, the `upload_` prefix. [`is_derivative`] is the
//! one place that recognizes them; both the classifier's skip rules and the
//! raw-beats-derivative resolution go through it.

use crate::types::MediaKind;

/// Prefix of every batch-generated derivative (always lowercase on disk).
pub const DERIVATIVE_PREFIX: &str = "bride_";

/// Prefix of derivatives produced by the upload endpoint.
pub const UPLOAD_PREFIX: &str = "upload_";

/// Marker for poster outputs; raw files containing it are never ingested.
pub const POSTER_MARKER: &str = "poster";

/// Subject name that routes a file into the collection instead of a group.
pub const COLLECTION_SUBJECT: &str = "collection";

/// Extensions a derivative can carry. `webp` covers derivatives written by
/// earlier versions of the pipeline.
const DERIVATIVE_EXTENSIONS: &[&str] = &["avif", "webp", "mp4"];

/// Extension of poster derivatives.
const POSTER_EXTENSION: &str = "avif";

/// A raw filename that addresses a (subject, slot) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    /// Normalized subject: trimmed and lowercased.
    pub subject: String,
    /// 1-based slot index as written in the filename.
    pub slot: u32,
    /// True when the subject is the literal word `collection`.
    pub is_collection: bool,
}

/// Parse a filename against the slotted naming convention.
///
/// Returns `None` for names that do not follow it. Slot 0 parses; callers
/// decide what it addresses.
pub fn parse_name(filename: &str) -> Option<ParsedName> {
    // The prefix is optional: with it stripped first, then the whole name,
    // so `Bride_5.jpg` still parses as subject "bride".
    let stripped = strip_prefix_ignore_case(filename, DERIVATIVE_PREFIX);
    stripped
        .and_then(match_slotted)
        .or_else(|| match_slotted(filename))
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &s[prefix.len()..])
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c.is_whitespace()
}

fn is_separator(c: char) -> bool {
    c == '_' || c.is_whitespace()
}

/// Match `<name><sep><digits>.` at the start of `s`, taking the shortest
/// name that lets the rest match.
fn match_slotted(s: &str) -> Option<ParsedName> {
    for (idx, c) in s.char_indices() {
        if !is_name_char(c) {
            return None;
        }
        let name_end = idx + c.len_utf8();
        if let Some(slot) = match_slot_suffix(&s[name_end..]) {
            let subject = s[..name_end].trim().to_lowercase();
            if subject.is_empty() {
                return None;
            }
            return Some(ParsedName {
                is_collection: subject == COLLECTION_SUBJECT,
                subject,
                slot,
            });
        }
    }
    None
}

/// Match `<sep>+<digits>+.` at the start of `rest`, returning the slot.
fn match_slot_suffix(rest: &str) -> Option<u32> {
    let after_sep = rest.trim_start_matches(is_separator);
    if after_sep.len() == rest.len() {
        return None;
    }
    let digits_len = after_sep
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(after_sep.len());
    if digits_len == 0 || !after_sep[digits_len..].starts_with('.') {
        return None;
    }
    after_sep[..digits_len].parse().ok()
}

/// Lowercased extension of a filename, without the dot.
pub fn extension_of(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    (!stem.is_empty() && !ext.is_empty()).then(|| ext.to_ascii_lowercase())
}

/// Whether `filename` is an output this pipeline (or the upload endpoint)
/// generated, as opposed to a raw source.
///
/// Derivatives are always written with a lowercase prefix, so
/// `Bride_A_1.jpg` is raw while `bride_A_1.webp` is a derivative.
pub fn is_derivative(filename: &str) -> bool {
    let prefixed = filename.starts_with(DERIVATIVE_PREFIX) || filename.starts_with(UPLOAD_PREFIX);
    prefixed
        && extension_of(filename)
            .is_some_and(|ext| DERIVATIVE_EXTENSIONS.contains(&ext.as_str()))
}

/// Outputs of the upload endpoint. They belong to the manifest, not to any
/// subject slot.
pub fn is_upload_output(filename: &str) -> bool {
    filename.starts_with(UPLOAD_PREFIX) && is_derivative(filename)
}

/// Camera-default names (`IMG_0007.jpg`) carry no subject.
pub fn is_camera_name(filename: &str) -> bool {
    filename
        .get(..4)
        .is_some_and(|head| head.eq_ignore_ascii_case("img_"))
}

/// Filename of the derivative for a subject slot.
pub fn derivative_name(subject: &str, slot: u32, kind: MediaKind) -> String {
    format!(
        "{DERIVATIVE_PREFIX}{subject}_{slot}.{}",
        kind.derivative_extension()
    )
}

/// Filename of the derivative for an uploaded file.
pub fn upload_name(id: u64, kind: MediaKind) -> String {
    format!("{UPLOAD_PREFIX}{id}.{}", kind.derivative_extension())
}

/// Poster filename belonging to a video derivative:
/// `bride_aish_2.mp4` → `bride_aish_2_poster.avif`.
pub fn poster_name(video_derivative: &str) -> String {
    let stem = video_derivative
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(video_derivative);
    format!("{stem}_{POSTER_MARKER}.{POSTER_EXTENSION}")
}
