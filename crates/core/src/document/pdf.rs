//! Minimal PDF 1.4 object writer.
//!
//! Output is a pure function of the input: streams are stored uncompressed, object
//! numbers are assigned in call order and no creation date or random file id is
//! written.

use std::fmt::Write as _;

use crate::layout::block::Color;
use crate::layout::metrics::Font;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectId(pub usize);

impl ObjectId {
    pub fn reference(self) -> String {
        format!("{} 0 R", self.0)
    }
}

#[derive(Debug, Default)]
pub struct PdfWriter {
    objects: Vec<Option<Vec<u8>>>,
}

impl PdfWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an object number to be filled later with [`PdfWriter::set`].
    pub fn reserve(&mut self) -> ObjectId {
        self.objects.push(None);
        ObjectId(self.objects.len())
    }

    pub fn set(&mut self, id: ObjectId, body: Vec<u8>) {
        if let Some(slot) = self.objects.get_mut(id.0 - 1) {
            *slot = Some(body);
        }
    }

    pub fn add(&mut self, body: impl Into<Vec<u8>>) -> ObjectId {
        let id = self.reserve();
        self.set(id, body.into());
        id
    }

    /// `entries` are the dictionary keys other than `/Length`.
    pub fn add_stream(&mut self, entries: &str, data: &[u8]) -> ObjectId {
        self.add(stream_object(entries, data))
    }

    pub fn finish(self, root: ObjectId, info: ObjectId) -> Vec<u8> {
        let mut out: Vec<u8> = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
        let mut offsets = Vec::with_capacity(self.objects.len());
        for (index, body) in self.objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
            out.extend_from_slice(body.as_deref().unwrap_or(b"null"));
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref_offset = out.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", self.objects.len() + 1);
        for offset in offsets {
            let _ = writeln!(xref, "{offset:010} 00000 n ");
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root {} /Info {} >>\nstartxref\n{xref_offset}\n%%EOF\n",
            self.objects.len() + 1,
            root.reference(),
            info.reference()
        );
        out.extend_from_slice(xref.as_bytes());
        out
    }
}

pub fn stream_object(entries: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + entries.len() + 48);
    let entries = entries.trim();
    let header = if entries.is_empty() {
        format!("<< /Length {} >>\nstream\n", data.len())
    } else {
        format!("<< {entries} /Length {} >>\nstream\n", data.len())
    };
    body.extend_from_slice(header.as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(b"\nendstream");
    body
}

/// Formats a coordinate with at most two decimals and no trailing zeros.
pub fn num(value: f32) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    let text = format!("{rounded:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// A PDF literal string in WinAnsi encoding, with delimiters escaped.
pub fn literal(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + 2);
    out.push(b'(');
    for ch in text.chars() {
        let byte = win_ansi(ch);
        if matches!(byte, b'(' | b')' | b'\\') {
            out.push(b'\\');
        }
        out.push(byte);
    }
    out.push(b')');
    out
}

/// Maps a char onto WinAnsiEncoding; unmappable chars become `?`.
pub fn win_ansi(ch: char) -> u8 {
    match ch {
        ' '..='~' => ch as u8,
        '\u{00A0}'..='\u{00FF}' => ch as u32 as u8,
        '\u{20AC}' => 0x80,
        '\u{2026}' => 0x85,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{2122}' => 0x99,
        '\t' => b' ',
        _ => b'?',
    }
}

/// Builder for one page content stream.
#[derive(Debug, Default)]
pub struct ContentStream {
    buf: Vec<u8>,
}

impl ContentStream {
    pub fn new() -> Self {
        Self::default()
    }

    fn op(&mut self, text: &str) {
        self.buf.extend_from_slice(text.as_bytes());
        self.buf.push(b'\n');
    }

    fn fill_color(&mut self, color: Color) {
        self.op(&format!("{} rg", rgb(color)));
    }

    fn stroke_color(&mut self, color: Color) {
        self.op(&format!("{} RG", rgb(color)));
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        self.fill_color(color);
        self.op(&format!("{} {} {} {} re f", num(x), num(y), num(width), num(height)));
    }

    pub fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32, line: f32, color: Color) {
        self.stroke_color(color);
        self.op(&format!("{} w", num(line)));
        self.op(&format!("{} {} {} {} re S", num(x), num(y), num(width), num(height)));
    }

    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Color) {
        self.stroke_color(color);
        self.op(&format!("{} w", num(width)));
        self.op(&format!("{} {} m {} {} l S", num(from.0), num(from.1), num(to.0), num(to.1)));
    }

    pub fn text(&mut self, x: f32, baseline: f32, font: Font, size: f32, color: Color, text: &str) {
        if text.is_empty() {
            return;
        }
        self.fill_color(color);
        self.op("BT");
        self.op(&format!("/{} {} Tf", font.resource_name(), num(size)));
        self.op(&format!("{} {} Td", num(x), num(baseline)));
        self.buf.extend_from_slice(&literal(text));
        self.op(" Tj");
        self.op("ET");
    }

    pub fn image(&mut self, name: &str, x: f32, y: f32, width: f32, height: f32) {
        self.op("q");
        self.op(&format!("{} 0 0 {} {} {} cm", num(width), num(height), num(x), num(y)));
        self.op(&format!("/{name} Do"));
        self.op("Q");
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

fn rgb(color: Color) -> String {
    let channel = |value: u8| num(f32::from(value) / 255.0);
    format!("{} {} {}", channel(color.r), channel(color.g), channel(color.b))
}
