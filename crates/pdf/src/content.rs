//! Page content stream rewriting.
//!
//! Text erasure walks the operators while tracking the CTM and the text
//! matrices, estimates a box for every glyph and blanks the glyphs that
//! land inside a band. The original streams are left in place and wrapped
//! by a leading `q` stream and a trailing stream that restores the state
//! and paints the fills.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use rmhf_core::{BandRect, CoreError, Result};

use crate::redaction::FillColor;
use crate::scan::{self, Segment};

type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Fraction of the font size below the baseline counted as glyph area.
const DESCENT: f32 = 0.2;
const ASCENT: f32 = 0.8;

fn multiply(m: &Matrix, n: &Matrix) -> Matrix {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

fn translate(tx: f32, ty: f32) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

fn transform(m: &Matrix, x: f32, y: f32) -> (f32, f32) {
    (x * m[0] + y * m[2] + m[4], x * m[1] + y * m[3] + m[5])
}

fn number(obj: &Object) -> Option<f32> {
    obj.as_float().ok()
}

fn matrix_operands(operands: &[Object]) -> Option<Matrix> {
    match operands {
        [a, b, c, d, e, f] => Some([
            number(a)?,
            number(b)?,
            number(c)?,
            number(d)?,
            number(e)?,
            number(f)?,
        ]),
        _ => None,
    }
}

/// Estimated advance of one byte, in units of the font size.
fn estimate_glyph_width(byte: u8) -> f32 {
    if byte < 128 {
        0.55
    } else {
        1.0
    }
}

/// Graphics state entries that influence where glyphs land.
#[derive(Debug, Clone, Copy)]
struct GraphicsState {
    ctm: Matrix,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    leading: f32,
    horizontal_scale: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: IDENTITY,
            font_size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            leading: 0.0,
            horizontal_scale: 1.0,
        }
    }
}

struct TextWalker<'a> {
    bands: &'a [BandRect],
    erase: bool,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    hits: usize,
}

impl<'a> TextWalker<'a> {
    fn new(bands: &'a [BandRect], erase: bool) -> Self {
        Self {
            bands,
            erase,
            state: GraphicsState::default(),
            stack: Vec::new(),
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            hits: 0,
        }
    }

    fn next_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = multiply(&translate(tx, ty), &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn glyph_in_band(&self, width: f32) -> bool {
        let trm = multiply(&self.text_matrix, &self.state.ctm);
        let size = self.state.font_size;
        let corners = [
            transform(&trm, 0.0, -DESCENT * size),
            transform(&trm, width, -DESCENT * size),
            transform(&trm, 0.0, ASCENT * size),
            transform(&trm, width, ASCENT * size),
        ];
        let (mut x0, mut y0) = corners[0];
        let (mut x1, mut y1) = corners[0];
        for (x, y) in &corners[1..] {
            x0 = x0.min(*x);
            y0 = y0.min(*y);
            x1 = x1.max(*x);
            y1 = y1.max(*y);
        }
        self.bands
            .iter()
            .any(|b| x0 < b.x1 && b.x0 < x1 && y0 < b.y1 && b.y0 < y1)
    }

    /// Shows one string, returning the bytes to keep in the stream.
    fn show(&mut self, bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(bytes.len());
        for &byte in bytes {
            let state = self.state;
            let width = estimate_glyph_width(byte) * state.font_size * state.horizontal_scale;
            if byte != b' ' && self.glyph_in_band(width) {
                self.hits += 1;
                out.push(if self.erase { b' ' } else { byte });
            } else {
                out.push(byte);
            }
            let mut advance = estimate_glyph_width(byte) * state.font_size + state.char_spacing;
            if byte == b' ' {
                advance += state.word_spacing;
            }
            self.text_matrix = multiply(
                &translate(advance * state.horizontal_scale, 0.0),
                &self.text_matrix,
            );
        }
        out
    }

    fn show_operand(&mut self, operand: Option<&Object>) -> Option<Object> {
        match operand {
            Some(Object::String(bytes, format)) => {
                let kept = self.show(bytes);
                Some(Object::String(kept, *format))
            }
            _ => None,
        }
    }

    fn show_array(&mut self, items: &[Object]) -> Vec<Object> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Object::String(bytes, format) => {
                    let kept = self.show(bytes);
                    out.push(Object::String(kept, *format));
                }
                other => {
                    if let Some(n) = number(other) {
                        let tx = -n / 1000.0 * self.state.font_size * self.state.horizontal_scale;
                        self.text_matrix = multiply(&translate(tx, 0.0), &self.text_matrix);
                    }
                    out.push(other.clone());
                }
            }
        }
        out
    }

    fn step(&mut self, mut op: Operation) -> Operation {
        match op.operator.as_str() {
            "q" => self.stack.push(self.state),
            "Q" => {
                if let Some(saved) = self.stack.pop() {
                    self.state = saved;
                }
            }
            "cm" => {
                if let Some(m) = matrix_operands(&op.operands) {
                    self.state.ctm = multiply(&m, &self.state.ctm);
                }
            }
            "BT" => {
                self.text_matrix = IDENTITY;
                self.line_matrix = IDENTITY;
            }
            "Tm" => {
                if let Some(m) = matrix_operands(&op.operands) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "Td" | "TD" => {
                if let [tx, ty] = op.operands.as_slice() {
                    if let (Some(tx), Some(ty)) = (number(tx), number(ty)) {
                        if op.operator == "TD" {
                            self.state.leading = -ty;
                        }
                        self.next_line(tx, ty);
                    }
                }
            }
            "T*" => self.next_line(0.0, -self.state.leading),
            "TL" => {
                if let Some(v) = op.operands.first().and_then(number) {
                    self.state.leading = v;
                }
            }
            "Tc" => {
                if let Some(v) = op.operands.first().and_then(number) {
                    self.state.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = op.operands.first().and_then(number) {
                    self.state.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = op.operands.first().and_then(number) {
                    self.state.horizontal_scale = v / 100.0;
                }
            }
            "Tf" => {
                if let Some(size) = op.operands.get(1).and_then(number) {
                    self.state.font_size = size.abs();
                }
            }
            "Tj" => {
                if let Some(kept) = self.show_operand(op.operands.first()) {
                    op.operands[0] = kept;
                }
            }
            "'" => {
                self.next_line(0.0, -self.state.leading);
                if let Some(kept) = self.show_operand(op.operands.first()) {
                    op.operands[0] = kept;
                }
            }
            "\"" => {
                if op.operands.len() >= 3 {
                    if let Some(aw) = number(&op.operands[0]) {
                        self.state.word_spacing = aw;
                    }
                    if let Some(ac) = number(&op.operands[1]) {
                        self.state.char_spacing = ac;
                    }
                    self.next_line(0.0, -self.state.leading);
                    if let Some(kept) = self.show_operand(op.operands.get(2)) {
                        op.operands[2] = kept;
                    }
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    let kept = self.show_array(items);
                    op.operands[0] = Object::Array(kept);
                }
            }
            _ => {}
        }
        op
    }
}

/// One stream of a page's /Contents, decoded from its filters.
pub struct ContentPart {
    pub id: ObjectId,
    pub data: Vec<u8>,
}

/// The content streams of a page, in drawing order.
///
/// A page without /Contents has no parts.
pub fn page_parts(doc: &Document, page_id: ObjectId) -> Result<Vec<ContentPart>> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|e| CoreError::io("read page dictionary", e))?;
    let ids = match page.get(b"Contents") {
        Err(_) => return Ok(Vec::new()),
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => references(items)?,
            Ok(_) => vec![*id],
            Err(e) => return Err(CoreError::io("read page content", e)),
        },
        Ok(Object::Array(items)) => references(items)?,
        Ok(_) => {
            return Err(CoreError::io_message(
                "read page content",
                "/Contents is neither a stream reference nor an array",
            ))
        }
    };

    ids.into_iter()
        .map(|id| {
            let stream = doc
                .get_object(id)
                .and_then(Object::as_stream)
                .map_err(|e| CoreError::io("read page content", e))?;
            Ok(ContentPart {
                id,
                data: stream_bytes(stream)?,
            })
        })
        .collect()
}

fn references(items: &[Object]) -> Result<Vec<ObjectId>> {
    items
        .iter()
        .map(|item| {
            item.as_reference()
                .map_err(|e| CoreError::io("read page content", e))
        })
        .collect()
}

/// Every content stream of a page joined into one buffer.
pub fn page_content(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    for part in page_parts(doc, page_id)? {
        data.extend(part.data);
        data.push(b'\n');
    }
    Ok(data)
}

fn stream_bytes(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.get(b"Filter").is_err() {
        return Ok(stream.content.clone());
    }
    stream
        .decompressed_content()
        .map_err(|e| CoreError::io("decompress page content", e))
}

pub fn decode(data: &[u8]) -> Result<Content> {
    Content::decode(data).map_err(|e| CoreError::io("decode page content", e))
}

pub fn encode(content: &Content) -> Result<Vec<u8>> {
    content
        .encode()
        .map_err(|e| CoreError::io("encode page content", e))
}

/// Runs `walker` over one stream.
///
/// Inline images pass through untouched. An operator run is only rebuilt
/// when a glyph in it was blanked; every other byte is kept as it was.
/// Returns the rebuilt stream, or `None` when nothing changed.
fn walk_stream(walker: &mut TextWalker, data: &[u8]) -> Result<Option<Vec<u8>>> {
    let segments =
        scan::split_content(data).map_err(|e| CoreError::io_message("parse page content", e))?;
    let mut out = Vec::with_capacity(data.len());
    let mut changed = false;

    for segment in segments {
        let (bytes, operators) = match segment {
            Segment::InlineImage(bytes) => {
                out.extend_from_slice(bytes);
                continue;
            }
            Segment::Operators { bytes, operators } => (bytes, operators),
        };
        if operators == 0 {
            out.extend_from_slice(bytes);
            continue;
        }

        let decoded = decode(bytes)?;
        if decoded.operations.len() != operators {
            return Err(CoreError::io_message(
                "parse page content",
                format!(
                    "parsed {} of {} operators",
                    decoded.operations.len(),
                    operators
                ),
            ));
        }

        let before = walker.hits;
        let operations: Vec<Operation> = decoded
            .operations
            .into_iter()
            .map(|op| walker.step(op))
            .collect();
        if walker.erase && walker.hits > before {
            out.push(b'\n');
            out.extend(encode(&Content { operations })?);
            out.push(b'\n');
            changed = true;
        } else {
            out.extend_from_slice(bytes);
        }
    }

    Ok(changed.then_some(out))
}

/// Blanks glyphs that intersect any of `bands` (absolute user space).
///
/// `streams` are the content streams of one page in order; text state
/// carries over from one to the next. Returns, per stream, the rewritten
/// bytes or `None` if the stream is unchanged, and the number of glyphs
/// blanked.
pub fn erase_text(streams: &[&[u8]], bands: &[BandRect]) -> Result<(Vec<Option<Vec<u8>>>, usize)> {
    let mut walker = TextWalker::new(bands, true);
    let rewritten = streams
        .iter()
        .map(|data| walk_stream(&mut walker, data))
        .collect::<Result<Vec<_>>>()?;
    Ok((rewritten, walker.hits))
}

/// Counts non-blank glyphs that intersect any of `bands`.
pub fn count_text(streams: &[&[u8]], bands: &[BandRect]) -> Result<usize> {
    let mut walker = TextWalker::new(bands, false);
    for data in streams {
        walk_stream(&mut walker, data)?;
    }
    Ok(walker.hits)
}

/// Closes the `q` opened before the original content and paints each
/// rectangle in its own isolated state.
pub fn fill_stream(fills: &[(BandRect, FillColor)]) -> Result<Vec<u8>> {
    let mut operations = Vec::with_capacity(3 + fills.len() * 3);
    operations.push(Operation::new("Q", vec![]));
    operations.push(Operation::new("q", vec![]));
    for (rect, fill) in fills {
        operations.push(Operation::new(
            "rg",
            vec![Object::Real(fill.r), Object::Real(fill.g), Object::Real(fill.b)],
        ));
        operations.push(Operation::new(
            "re",
            vec![
                Object::Real(rect.x0),
                Object::Real(rect.y0),
                Object::Real(rect.width()),
                Object::Real(rect.height()),
            ],
        ));
        operations.push(Operation::new("f", vec![]));
    }
    operations.push(Operation::new("Q", vec![]));

    let mut data = b"\n".to_vec();
    data.extend(encode(&Content { operations })?);
    Ok(data)
}

/// Erases text under the fills and paints them over the page.
///
/// The page's /Contents becomes `[q, original streams..., fills]`. Streams
/// holding no erased glyph stay the very same objects; a stream with
/// erased glyphs is replaced by a new object so other pages sharing it are
/// not affected. Returns the number of glyphs erased.
pub fn redact_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    fills: &[(BandRect, FillColor)],
) -> Result<usize> {
    let parts = page_parts(doc, page_id)?;
    let bands: Vec<BandRect> = fills.iter().map(|(rect, _)| *rect).collect();
    let streams: Vec<&[u8]> = parts.iter().map(|part| part.data.as_slice()).collect();
    let (rewritten, glyphs) = erase_text(&streams, &bands)?;

    let mut contents = Vec::with_capacity(parts.len() + 2);
    let open = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    contents.push(Object::Reference(open));
    for (part, data) in parts.iter().zip(rewritten) {
        let id = match data {
            Some(data) => doc.add_object(Stream::new(Dictionary::new(), data)),
            None => part.id,
        };
        contents.push(Object::Reference(id));
    }
    let close = doc.add_object(Stream::new(Dictionary::new(), fill_stream(fills)?));
    contents.push(Object::Reference(close));

    let page = doc
        .get_object_mut(page_id)
        .and_then(|obj| obj.as_dict_mut())
        .map_err(|e| CoreError::io("update page dictionary", e))?;
    page.set("Contents", Object::Array(contents));
    Ok(glyphs)
}
