//! Object table and cross-reference bookkeeping.
//!
//! Objects are serialized into their own buffers first. [`PdfWriter::finish`]
//! then concatenates them behind the file header, recording the byte offset
//! at which each `N 0 obj` line starts, and emits the xref table and trailer
//! from those recorded offsets.

/// File header line.
pub const HEADER: &[u8] = b"%PDF-1.4\n";

/// The mandatory free entry at the head of every xref table.
const FREE_ENTRY: &[u8] = b"0000000000 65535 f \n";

/// Collects indirect objects and assembles the final file.
#[derive(Debug, Default)]
pub struct PdfWriter {
    objects: Vec<Vec<u8>>,
}

impl PdfWriter {
    /// Creates an empty writer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            objects: Vec::new(),
        }
    }

    /// Number of objects added so far.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Adds an object whose body is a dictionary or other direct value.
    ///
    /// Returns the object number assigned to it (1-based, in insertion
    /// order).
    pub fn add_object(&mut self, body: &str) -> u32 {
        self.push(body.as_bytes().to_vec())
    }

    /// Adds a stream object with a `/Length` dictionary computed from the
    /// byte length of `content`.
    pub fn add_stream(&mut self, content: &[u8]) -> u32 {
        let mut body = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(b"\nendstream");
        self.push(body)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn push(&mut self, body: Vec<u8>) -> u32 {
        self.objects.push(body);
        self.objects.len() as u32
    }

    /// Assembles header, objects, xref table, and trailer.
    ///
    /// `root` is the object number of the document catalog.
    #[must_use]
    pub fn finish(self, root: u32) -> Vec<u8> {
        let body_len: usize = self.objects.iter().map(|o| o.len() + 32).sum();
        let mut out = Vec::with_capacity(HEADER.len() + body_len + 64 + 20 * self.objects.len());
        out.extend_from_slice(HEADER);

        let mut offsets = Vec::with_capacity(self.objects.len());
        for (idx, body) in self.objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n", idx + 1).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref_pos = out.len();
        let size = offsets.len() + 1;
        out.extend_from_slice(format!("xref\n0 {size}\n").as_bytes());
        out.extend_from_slice(FREE_ENTRY);
        for offset in &offsets {
            out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        out.extend_from_slice(format!("trailer\n<< /Size {size} /Root {root} 0 R >>\n").as_bytes());
        out.extend_from_slice(format!("startxref\n{xref_pos}\n%%EOF").as_bytes());

        out
    }
}
