//! Encoding normalization for raw ONIX sources.
//!
//! Real-world ONIX feeds frequently contain bytes and references that abort XML
//! tokenization before a single product can be read:
//!
//! - **Stray Latin-1 / Windows-1252 bytes** inside an otherwise UTF-8 file
//!   (`caf\xE9`), transcoded here to their UTF-8 form
//! - **Named ISO-Latin entities** (`&eacute;`, `&rsquo;`) that are only defined by
//!   the ONIX DTD, which is never loaded; rewritten as numeric references
//! - **Truncated multi-byte sequences**, references to characters XML forbids,
//!   raw control characters and bare ampersands; dropped or escaped when
//!   filtering is enabled
//! - **Leading byte order marks**, removed so element offsets count from the
//!   first byte of markup
//!
//! Normalization is a required precondition for legacy feeds and runs once, before
//! any reader exists. Large files can be processed in parallel blocks with
//! [`rayon`]; block boundaries are newline-aligned (see
//! [`boundary_scanner`](crate::boundary_scanner)) so the parallel output is
//! byte-identical to the sequential output. Files are streamed through the same
//! blocks into a temporary file, so memory use does not grow with file size.

use crate::boundary_scanner::{ChunkBoundaryScanner, DEFAULT_CHUNK_SIZE};
use crate::error::Result;
use encoding_rs::WINDOWS_1252;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::ops::AddAssign;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

const BYTE_ORDER_MARK: char = '\u{feff}';

/// HTML/ISO 8879 names for U+00A0 through U+00FF, in code point order.
const LATIN1_ENTITY_NAMES: [&str; 96] = [
    "nbsp", "iexcl", "cent", "pound", "curren", "yen", "brvbar", "sect", "uml", "copy", "ordf",
    "laquo", "not", "shy", "reg", "macr", "deg", "plusmn", "sup2", "sup3", "acute", "micro",
    "para", "middot", "cedil", "sup1", "ordm", "raquo", "frac14", "frac12", "frac34", "iquest",
    "Agrave", "Aacute", "Acirc", "Atilde", "Auml", "Aring", "AElig", "Ccedil", "Egrave", "Eacute",
    "Ecirc", "Euml", "Igrave", "Iacute", "Icirc", "Iuml", "ETH", "Ntilde", "Ograve", "Oacute",
    "Ocirc", "Otilde", "Ouml", "times", "Oslash", "Ugrave", "Uacute", "Ucirc", "Uuml", "Yacute",
    "THORN", "szlig", "agrave", "aacute", "acirc", "atilde", "auml", "aring", "aelig", "ccedil",
    "egrave", "eacute", "ecirc", "euml", "igrave", "iacute", "icirc", "iuml", "eth", "ntilde",
    "ograve", "oacute", "ocirc", "otilde", "ouml", "divide", "oslash", "ugrave", "uacute", "ucirc",
    "uuml", "yacute", "thorn", "yuml",
];

/// Named entities outside Latin-1 that commonly appear in publisher text.
const EXTENDED_ENTITIES: [(&str, u32); 33] = [
    ("OElig", 338),
    ("oelig", 339),
    ("Scaron", 352),
    ("scaron", 353),
    ("Yuml", 376),
    ("fnof", 402),
    ("circ", 710),
    ("tilde", 732),
    ("ensp", 8194),
    ("emsp", 8195),
    ("thinsp", 8201),
    ("zwnj", 8204),
    ("zwj", 8205),
    ("lrm", 8206),
    ("rlm", 8207),
    ("ndash", 8211),
    ("mdash", 8212),
    ("lsquo", 8216),
    ("rsquo", 8217),
    ("sbquo", 8218),
    ("ldquo", 8220),
    ("rdquo", 8221),
    ("bdquo", 8222),
    ("dagger", 8224),
    ("Dagger", 8225),
    ("bull", 8226),
    ("hellip", 8230),
    ("permil", 8240),
    ("prime", 8242),
    ("lsaquo", 8249),
    ("rsaquo", 8250),
    ("euro", 8364),
    ("trade", 8482),
];

/// Entities every XML parser understands without a DTD.
const PREDEFINED_ENTITIES: [&str; 5] = ["amp", "lt", "gt", "quot", "apos"];

lazy_static! {
    static ref ENTITY_PATTERN: Regex =
        Regex::new(r"&(#[xX][0-9A-Fa-f]{1,8};|#[0-9]{1,10};|[A-Za-z][A-Za-z0-9]{0,31};)?")
            .expect("entity pattern is valid");
    static ref ENTITY_TABLE: HashMap<&'static str, u32> = {
        let mut table = HashMap::with_capacity(LATIN1_ENTITY_NAMES.len() + EXTENDED_ENTITIES.len());
        for (code_point, name) in (0xA0u32..).zip(LATIN1_ENTITY_NAMES.iter()) {
            table.insert(*name, code_point);
        }
        for (name, code_point) in EXTENDED_ENTITIES {
            table.insert(name, code_point);
        }
        table
    };
}

/// Options controlling a normalization pass.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Drop or escape content that cannot be repaired instead of keeping it
    pub filter_bad_encodings: bool,
    /// Apply Unicode NFC composition to the repaired text
    pub compose_unicode: bool,
    /// Process the input in parallel newline-aligned blocks
    pub parallel: bool,
    /// Target block size for parallel processing
    pub chunk_size: usize,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            filter_bad_encodings: false,
            compose_unicode: false,
            parallel: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl NormalizeOptions {
    /// Enable or disable filtering of unrepairable content.
    #[must_use]
    pub fn with_filter(mut self, filter: bool) -> Self {
        self.filter_bad_encodings = filter;
        self
    }

    /// Enable or disable parallel block processing.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set the target block size for parallel processing.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Enable or disable NFC composition.
    #[must_use]
    pub fn with_composition(mut self, compose: bool) -> Self {
        self.compose_unicode = compose;
        self
    }
}

/// Counts of what a normalization pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// Stray single bytes transcoded from Windows-1252
    pub transcoded_bytes: usize,
    /// Bytes of truncated multi-byte sequences removed
    pub dropped_bytes: usize,
    /// Named entities rewritten as numeric references
    pub entities_rewritten: usize,
    /// References, control characters and ampersands removed or escaped
    pub references_filtered: usize,
    /// Byte order marks removed from the start of the input
    pub byte_order_marks: usize,
}

impl NormalizeReport {
    /// Whether the pass changed anything.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        *self == NormalizeReport::default()
    }
}

impl AddAssign for NormalizeReport {
    fn add_assign(&mut self, other: Self) {
        self.transcoded_bytes += other.transcoded_bytes;
        self.dropped_bytes += other.dropped_bytes;
        self.entities_rewritten += other.entities_rewritten;
        self.references_filtered += other.references_filtered;
        self.byte_order_marks += other.byte_order_marks;
    }
}

/// Normalize raw feed bytes sequentially.
///
/// The result is always valid UTF-8 and never starts with a byte order mark.
///
/// # Examples
///
/// ```
/// use onix_feed::encoding::{normalize_bytes, NormalizeOptions};
///
/// let (text, report) = normalize_bytes(b"Caf\xE9 &eacute;", &NormalizeOptions::default());
/// assert_eq!(text, "Caf\u{e9} &#233;");
/// assert_eq!(report.transcoded_bytes, 1);
/// assert_eq!(report.entities_rewritten, 1);
/// ```
#[must_use]
pub fn normalize_bytes(input: &[u8], options: &NormalizeOptions) -> (String, NormalizeReport) {
    let (mut text, mut report) = normalize_block(input, options);
    strip_byte_order_marks(&mut text, &mut report);
    (text, report)
}

/// Normalize raw feed bytes in parallel newline-aligned blocks.
///
/// Produces exactly the same output as [`normalize_bytes`].
#[must_use]
pub fn normalize_bytes_parallel(
    input: &[u8],
    options: &NormalizeOptions,
) -> (String, NormalizeReport) {
    let (mut text, mut report) = normalize_block_parallel(input, options);
    strip_byte_order_marks(&mut text, &mut report);
    (text, report)
}

/// Normalize an in-memory text buffer in place.
///
/// The buffer is already valid UTF-8, so only reference rewriting, filtering,
/// composition and byte order mark removal apply. The buffer is left untouched
/// when nothing changes.
pub fn normalize_text(text: &mut String, options: &NormalizeOptions) -> NormalizeReport {
    let mut report = NormalizeReport::default();
    let mut rewritten = rewrite_references(text, options, &mut report);
    strip_byte_order_marks(&mut rewritten, &mut report);
    if rewritten != *text {
        *text = rewritten;
    }
    report
}

/// Normalize a feed file in place.
///
/// The file is read in newline-aligned blocks of `chunk_size` bytes (times the
/// number of worker threads when parallel) and written to a temporary file in
/// the same directory, which replaces the original only when normalization
/// changed its content.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read or written.
pub fn normalize_file(path: &Path, options: &NormalizeOptions) -> Result<NormalizeReport> {
    let block_size = if options.parallel {
        options.chunk_size.saturating_mul(rayon::current_num_threads())
    } else {
        options.chunk_size
    };

    let mut input = BufReader::new(File::open(path)?);
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut output = BufWriter::new(NamedTempFile::new_in(directory)?);

    let mut report = NormalizeReport::default();
    let mut block = Vec::new();
    let mut changed = false;
    let mut first = true;

    while read_block(&mut input, &mut block, block_size)? {
        let (mut text, block_report) = if options.parallel {
            normalize_block_parallel(&block, options)
        } else {
            normalize_block(&block, options)
        };
        report += block_report;
        if first {
            strip_byte_order_marks(&mut text, &mut report);
            first = false;
        }

        changed |= text.as_bytes() != block.as_slice();
        output.write_all(text.as_bytes())?;
    }

    if changed {
        let temporary = output.into_inner().map_err(std::io::IntoInnerError::into_error)?;
        temporary.as_file().sync_all()?;
        temporary
            .as_file()
            .set_permissions(std::fs::metadata(path)?.permissions())?;
        temporary.persist(path).map_err(|e| e.error)?;
    }

    debug!(
        path = %path.display(),
        rewritten = changed,
        transcoded = report.transcoded_bytes,
        dropped = report.dropped_bytes,
        entities = report.entities_rewritten,
        filtered = report.references_filtered,
        byte_order_marks = report.byte_order_marks,
        "normalized feed file"
    );
    Ok(report)
}

/// Fill `block` with whole lines until it holds at least `target` bytes or the
/// input ends. Returns whether anything was read.
fn read_block(input: &mut impl BufRead, block: &mut Vec<u8>, target: usize) -> Result<bool> {
    block.clear();
    while block.len() < target.max(1) {
        if input.read_until(b'\n', block)? == 0 {
            break;
        }
    }
    Ok(!block.is_empty())
}

fn normalize_block(input: &[u8], options: &NormalizeOptions) -> (String, NormalizeReport) {
    let mut report = NormalizeReport::default();
    let repaired = repair_utf8(input, options.filter_bad_encodings, &mut report);
    let text = rewrite_references(&repaired, options, &mut report);
    (text, report)
}

fn normalize_block_parallel(
    input: &[u8],
    options: &NormalizeOptions,
) -> (String, NormalizeReport) {
    use rayon::prelude::*;

    let mut scanner = ChunkBoundaryScanner::new(options.chunk_size);
    let chunks = scanner.scan(input);

    let results: Vec<(String, NormalizeReport)> = chunks
        .par_iter()
        .map(|&(offset, length)| normalize_block(&input[offset..offset + length], options))
        .collect();

    let mut text = String::with_capacity(input.len());
    let mut report = NormalizeReport::default();
    for (chunk, chunk_report) in results {
        text.push_str(&chunk);
        report += chunk_report;
    }
    (text, report)
}

/// Remove byte order marks from the start of repaired text.
fn strip_byte_order_marks(text: &mut String, report: &mut NormalizeReport) {
    let marks = text.chars().take_while(|&c| c == BYTE_ORDER_MARK).count();
    if marks > 0 {
        text.drain(..marks * BYTE_ORDER_MARK.len_utf8());
        report.byte_order_marks += marks;
    }
}

/// Turn arbitrary bytes into UTF-8, transcoding stray bytes as Windows-1252.
///
/// An invalid sequence of two or more bytes is a multi-byte character cut short;
/// it is dropped when filtering, transcoded byte-by-byte otherwise.
fn repair_utf8(input: &[u8], filter: bool, report: &mut NormalizeReport) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                output.push_str(valid);
                break;
            },
            Err(error) => {
                let valid_up_to = error.valid_up_to();
                // The prefix was just validated by from_utf8
                output.push_str(&String::from_utf8_lossy(&rest[..valid_up_to]));

                let bad_len = error.error_len().unwrap_or(rest.len() - valid_up_to);
                let bad = &rest[valid_up_to..valid_up_to + bad_len];
                let truncated = error.error_len().map_or(true, |len| len > 1);

                if truncated && filter {
                    report.dropped_bytes += bad.len();
                } else {
                    let (decoded, _) = WINDOWS_1252.decode_without_bom_handling(bad);
                    output.push_str(&decoded);
                    report.transcoded_bytes += bad.len();
                }
                rest = &rest[valid_up_to + bad_len..];
            },
        }
    }

    output
}

/// Rewrite entity references and, when filtering, strip what XML cannot carry.
fn rewrite_references(
    text: &str,
    options: &NormalizeOptions,
    report: &mut NormalizeReport,
) -> String {
    let filter = options.filter_bad_encodings;
    let mut entities = 0;
    let mut filtered = 0;

    let rewritten = ENTITY_PATTERN.replace_all(text, |caps: &Captures| {
        let Some(reference) = caps.get(1).map(|m| m.as_str()) else {
            // Bare ampersand
            if filter {
                filtered += 1;
                return "&amp;".to_string();
            }
            return "&".to_string();
        };

        if let Some(numeric) = reference.strip_prefix('#') {
            let digits = numeric.trim_end_matches(';');
            let code_point = match digits.strip_prefix(&['x', 'X'][..]) {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => digits.parse::<u32>().ok(),
            };
            if filter && !code_point.is_some_and(is_xml_char) {
                filtered += 1;
                return String::new();
            }
            return caps[0].to_string();
        }

        let name = reference.trim_end_matches(';');
        if PREDEFINED_ENTITIES.contains(&name) {
            return caps[0].to_string();
        }
        if let Some(code_point) = ENTITY_TABLE.get(name) {
            entities += 1;
            return format!("&#{code_point};");
        }
        if filter {
            filtered += 1;
            return format!("&amp;{reference}");
        }
        caps[0].to_string()
    });

    let mut output = if filter {
        let mut kept = String::with_capacity(rewritten.len());
        for c in rewritten.chars() {
            if is_xml_char(u32::from(c)) {
                kept.push(c);
            } else {
                filtered += 1;
            }
        }
        kept
    } else {
        rewritten.into_owned()
    };

    if options.compose_unicode {
        output = output.nfc().collect();
    }

    report.entities_rewritten += entities;
    report.references_filtered += filtered;
    output
}

/// Whether a code point is allowed in an XML 1.0 document.
fn is_xml_char(code_point: u32) -> bool {
    matches!(
        code_point,
        0x9 | 0xA | 0xD | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x1_0000..=0x10_FFFF
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filtering() -> NormalizeOptions {
        NormalizeOptions::default().with_filter(true)
    }

    #[test]
    fn test_valid_utf8_is_untouched() {
        let input = "<Text>Café &amp; crème</Text>";
        let (text, report) = normalize_bytes(input.as_bytes(), &NormalizeOptions::default());
        assert_eq!(text, input);
        assert!(report.is_clean());
    }

    #[test]
    fn test_stray_latin1_bytes_are_transcoded() {
        let input = b"Fran\xE7ais \x93quoted\x94";
        let (text, report) = normalize_bytes(input, &NormalizeOptions::default());
        assert_eq!(text, "Fran\u{e7}ais \u{201c}quoted\u{201d}");
        assert_eq!(report.transcoded_bytes, 3);
    }

    #[test]
    fn test_truncated_sequence_dropped_when_filtering() {
        // E2 82 is the start of a three-byte sequence cut short by 'A'
        let input = b"x\xE2\x82Ay";
        let (kept, _) = normalize_bytes(input, &NormalizeOptions::default());
        assert_eq!(kept, "x\u{e2}\u{201a}Ay");

        let (filtered, report) = normalize_bytes(input, &filtering());
        assert_eq!(filtered, "xAy");
        assert_eq!(report.dropped_bytes, 2);
    }

    #[test]
    fn test_truncated_tail_dropped_when_filtering() {
        let (text, report) = normalize_bytes(b"end\xC3", &filtering());
        assert_eq!(text, "end");
        assert_eq!(report.dropped_bytes, 1);
    }

    #[test]
    fn test_named_entities_become_numeric() {
        let mut text = String::from("&eacute;t&eacute; &ndash; &rsquo;s &nbsp;");
        let report = normalize_text(&mut text, &NormalizeOptions::default());
        assert_eq!(text, "&#233;t&#233; &#8211; &#8217;s &#160;");
        assert_eq!(report.entities_rewritten, 5);
    }

    #[test]
    fn test_predefined_entities_are_kept() {
        let mut text = String::from("&lt;b&gt; &amp; &quot;x&quot; &apos;");
        let report = normalize_text(&mut text, &filtering());
        assert_eq!(text, "&lt;b&gt; &amp; &quot;x&quot; &apos;");
        assert!(report.is_clean());
    }

    #[test]
    fn test_bare_ampersand_escaped_when_filtering() {
        let mut text = String::from("AT&T &unknown; &#233;");
        normalize_text(&mut text, &NormalizeOptions::default());
        assert_eq!(text, "AT&T &unknown; &#233;");

        let report = normalize_text(&mut text, &filtering());
        assert_eq!(text, "AT&amp;T &amp;unknown; &#233;");
        assert_eq!(report.references_filtered, 2);
    }

    #[test]
    fn test_invalid_character_references_dropped_when_filtering() {
        let mut text = String::from("a&#x1A;b&#0;c&#xD800;d&#65;");
        let report = normalize_text(&mut text, &filtering());
        assert_eq!(text, "abcd&#65;");
        assert_eq!(report.references_filtered, 3);
    }

    #[test]
    fn test_control_characters_dropped_when_filtering() {
        let (text, report) = normalize_bytes(b"a\x01b\tc\x0Bd", &filtering());
        assert_eq!(text, "ab\tcd");
        assert_eq!(report.references_filtered, 2);
    }

    #[test]
    fn test_nfc_composition() {
        let options = NormalizeOptions::default().with_composition(true);
        let (text, _) = normalize_bytes("e\u{301}".as_bytes(), &options);
        assert_eq!(text, "\u{e9}");
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut input = Vec::new();
        for i in 0..200 {
            input.extend_from_slice(format!("<Text>line {i} caf").as_bytes());
            input.push(0xE9);
            input.extend_from_slice(b" &eacute; AT&T \xE2\x82</Text>\n");
        }
        let options = filtering().with_chunk_size(97);

        let sequential = normalize_bytes(&input, &options);
        let parallel = normalize_bytes_parallel(&input, &options);
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_leading_byte_order_mark_removed() {
        let (text, report) = normalize_bytes(b"\xEF\xBB\xBF<a>x</a>", &NormalizeOptions::default());
        assert_eq!(text, "<a>x</a>");
        assert_eq!(report.byte_order_marks, 1);

        let mut text = String::from("\u{feff}<a>\u{feff}</a>");
        let report = normalize_text(&mut text, &NormalizeOptions::default());
        assert_eq!(text, "<a>\u{feff}</a>");
        assert_eq!(report.byte_order_marks, 1);
    }

    #[test]
    fn test_byte_order_mark_after_newline_is_kept_in_parallel() {
        let input = "\u{feff}<a>\n\u{feff}b\n</a>\n".as_bytes();
        let options = NormalizeOptions::default().with_chunk_size(1);

        let (parallel, report) = normalize_bytes_parallel(input, &options);
        assert_eq!(parallel, "<a>\n\u{feff}b\n</a>\n");
        assert_eq!(report.byte_order_marks, 1);
        assert_eq!(normalize_bytes(input, &options).0, parallel);
    }

    #[test]
    fn test_file_blocks_match_whole_buffer() {
        let mut input = b"\xEF\xBB\xBF".to_vec();
        for i in 0..50 {
            input.extend_from_slice(format!("<Text>{i} caf").as_bytes());
            input.push(0xE9);
            input.extend_from_slice(b" &eacute;</Text>\n");
        }
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), &input).unwrap();

        for parallel in [false, true] {
            let options = NormalizeOptions::default().with_chunk_size(16).with_parallel(parallel);
            let (expected, expected_report) = normalize_bytes(&input, &options);

            std::fs::write(file.path(), &input).unwrap();
            let report = normalize_file(file.path(), &options).unwrap();
            assert_eq!(std::fs::read_to_string(file.path()).unwrap(), expected);
            assert_eq!(report, expected_report);
            assert_eq!(report.byte_order_marks, 1);
        }
    }

    #[test]
    fn test_read_block_ends_on_newline() {
        let mut input = std::io::Cursor::new(b"ab\ncdef\ng".to_vec());
        let mut block = Vec::new();

        assert!(read_block(&mut input, &mut block, 2).unwrap());
        assert_eq!(block, b"ab\n");
        assert!(read_block(&mut input, &mut block, 2).unwrap());
        assert_eq!(block, b"cdef\n");
        assert!(read_block(&mut input, &mut block, 2).unwrap());
        assert_eq!(block, b"g");
        assert!(!read_block(&mut input, &mut block, 2).unwrap());
    }

    #[test]
    fn test_normalize_file_in_place() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"<a>caf\xE9 &eacute;</a>\n").unwrap();

        let report = normalize_file(file.path(), &NormalizeOptions::default()).unwrap();
        assert_eq!(report.transcoded_bytes, 1);
        assert_eq!(
            std::fs::read_to_string(file.path()).unwrap(),
            "<a>caf\u{e9} &#233;</a>\n"
        );
    }
}
