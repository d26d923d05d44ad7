#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Minimal single-page PDF encoder for capacity reports.
//!
//! Renders an ordered list of text lines into a self-contained PDF 1.4 file
//! without any external document library. The output always holds exactly
//! five objects:
//!
//! 1. document catalog
//! 2. page tree (one kid)
//! 3. US-Letter page referencing font `/F1` and the content stream
//! 4. built-in Helvetica Type1 font (not embedded)
//! 5. content stream drawing each line at a fixed left margin, advancing
//!    downwards by a fixed leading
//!
//! followed by a cross-reference table whose offsets are computed by
//! [`writer::PdfWriter`]. The output is a pure function of the input lines.

pub mod writer;

use writer::PdfWriter;

/// Font size in points used for every line.
pub const FONT_SIZE: u32 = 12;

/// Horizontal position of the text block, in points from the left edge.
pub const LEFT_MARGIN: u32 = 50;

/// Baseline of the first line, in points from the bottom edge.
pub const TOP_OFFSET: u32 = 760;

/// Vertical distance between consecutive baselines.
pub const LINE_ADVANCE: u32 = 16;

/// US-Letter media box.
const MEDIA_BOX: &str = "[0 0 612 792]";

/// Prepares a line for a PDF string literal.
///
/// Backslash and parentheses are escaped. The built-in Helvetica font only
/// covers ASCII here, so Serbian Latin letters are transliterated
/// (`Č` to `C`, `đ` to `dj`) and any other non-ASCII character becomes `?`.
/// The result is always ASCII.
#[must_use]
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' | '(' | ')' => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_ascii() => out.push(c),
            c => out.push_str(ascii_fallback(c)),
        }
    }
    out
}

const fn ascii_fallback(c: char) -> &'static str {
    match c {
        'č' | 'ć' => "c",
        'Č' | 'Ć' => "C",
        'š' => "s",
        'Š' => "S",
        'ž' => "z",
        'Ž' => "Z",
        'đ' => "dj",
        'Đ' => "Dj",
        _ => "?",
    }
}

/// Builds the page content stream: one `Tj` per line inside a single text
/// object.
fn content_stream<S: AsRef<str>>(lines: &[S]) -> String {
    let mut stream = format!("BT\n/F1 {FONT_SIZE} Tf\n{LEFT_MARGIN} {TOP_OFFSET} Td\n");
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            stream.push_str(&format!("0 -{LINE_ADVANCE} Td\n"));
        }
        stream.push('(');
        stream.push_str(&escape_text(line.as_ref()));
        stream.push_str(") Tj\n");
    }
    stream.push_str("ET");
    stream
}

/// Renders `lines` as a single-page PDF document.
#[must_use]
pub fn render_document<S: AsRef<str>>(lines: &[S]) -> Vec<u8> {
    let content = content_stream(lines);

    let mut writer = PdfWriter::new();
    let catalog = writer.add_object("<< /Type /Catalog /Pages 2 0 R >>");
    writer.add_object("<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    writer.add_object(&format!(
        "<< /Type /Page /Parent 2 0 R /MediaBox {MEDIA_BOX} \
         /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"
    ));
    writer.add_object("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>");
    writer.add_stream(content.as_bytes());

    let bytes = writer.finish(catalog);
    log::debug!(
        "Rendered {} line(s) into a {} byte PDF",
        lines.len(),
        bytes.len()
    );
    bytes
}
