//! # PDF Serializer
//!
//! Takes the finished page canvases and writes a PDF 1.7 file.
//!
//! The writer produces raw bytes itself. A flashcard sheet only needs a
//! small part of PDF: stroked rectangles, single-line text in two fonts and
//! RGB images.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- catalog, page tree, fonts, images, pages, streams
//! 2 0 obj ... endobj
//! ...
//! xref                <- cross-reference table (byte offsets of each object)
//! trailer             <- points to the root object
//! %%EOF
//! ```
//!
//! ## Fonts
//!
//! Every page references `/F0` (regular) and `/F1` (bold). Standard fonts
//! are plain Type1 references with WinAnsi encoding. A TrueType face is
//! embedded as CIDFontType2 with Identity-H encoding: FontFile2,
//! FontDescriptor, CIDFont, ToUnicode CMap and the Type0 root. When bold
//! falls back to the regular face, the font file is written only once.
//!
//! Canvas coordinates are already PDF user space, so no flipping happens
//! here.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as FmtWrite; // for write! on String
use std::io::Write as IoWrite; // for write! on Vec<u8>
use std::sync::Arc;

use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::canvas::{DrawCommand, PageCanvas};
use crate::error::{CardgridError, Result};
use crate::font::{EmbeddedFont, FontContext, FontFace, FontRole};
use crate::image_fit::ResolvedImage;
use crate::model::{Color, Metadata};

const PRODUCER: &str = concat!("cardgrid ", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Default)]
pub struct PdfWriter;

/// Glyph mapping of one embedded font, used to encode text as glyph ids.
struct EmbedData {
    char_to_gid: BTreeMap<char, u16>,
}

/// Tracks allocated PDF objects during writing.
struct PdfBuilder {
    objects: Vec<PdfObject>,
    /// Font role -> Type0/Type1 object id, in `/F{index}` order.
    font_objects: Vec<(FontRole, usize)>,
    embedded: BTreeMap<FontRole, EmbedData>,
    /// FontFile2 streams already written, keyed by the shared font bytes.
    font_files: Vec<(Arc<Vec<u8>>, usize)>,
}

struct PdfObject {
    data: Vec<u8>,
}

impl PdfBuilder {
    fn new() -> Self {
        Self {
            objects: Vec::new(),
            font_objects: Vec::new(),
            embedded: BTreeMap::new(),
            font_files: Vec::new(),
        }
    }

    /// Append an object and return its id.
    fn push(&mut self, data: Vec<u8>) -> usize {
        let id = self.objects.len();
        self.objects.push(PdfObject { data });
        id
    }

    /// Append a Flate-compressed stream object.
    fn push_stream(&mut self, dict_entries: &str, raw: &[u8]) -> usize {
        let compressed = compress_to_vec_zlib(raw, 6);
        let mut data: Vec<u8> = Vec::new();
        let _ = write!(
            data,
            "<< {}/Length {} /Filter /FlateDecode >>\nstream\n",
            dict_entries,
            compressed.len()
        );
        data.extend_from_slice(&compressed);
        data.extend_from_slice(b"\nendstream");
        self.push(data)
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write the canvases, one PDF page each, to a byte vector.
    pub fn write(
        &self,
        pages: &[PageCanvas],
        metadata: &Metadata,
        fonts: &FontContext,
    ) -> Result<Vec<u8>> {
        let mut builder = PdfBuilder::new();

        // 0 = free entry, 1 = Catalog, 2 = Pages; everything else follows.
        builder.push(Vec::new());
        builder.push(Vec::new());
        builder.push(Vec::new());

        self.register_fonts(&mut builder, pages, fonts)?;
        let font_resources = Self::build_font_resource_dict(&builder.font_objects);

        let mut page_obj_ids: Vec<usize> = Vec::with_capacity(pages.len());
        for page in pages {
            let image_ids = Self::register_images(&mut builder, page);
            let content = self.build_content_stream(page, &builder);
            let content_obj_id = builder.push_stream("", content.as_bytes());

            let mut resources = format!("/Font << {} >>", font_resources);
            if !image_ids.is_empty() {
                let xobjects = image_ids
                    .iter()
                    .enumerate()
                    .map(|(i, id)| format!("/Im{} {} 0 R", i, id))
                    .collect::<Vec<_>>()
                    .join(" ");
                let _ = write!(resources, " /XObject << {} >>", xobjects);
            }

            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << {} >> >>",
                page.width, page.height, content_obj_id, resources
            );
            page_obj_ids.push(builder.push(page_dict.into_bytes()));
        }

        builder.objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();

        let kids: String = page_obj_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        builder.objects[2].data = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_obj_ids.len()
        )
        .into_bytes();

        let mut info = String::from("<< ");
        if let Some(ref title) = metadata.title {
            let _ = write!(info, "/Title {} ", Self::text_string(title));
        }
        if let Some(ref author) = metadata.author {
            let _ = write!(info, "/Author {} ", Self::text_string(author));
        }
        let _ = write!(info, "/Producer ({}) >>", PRODUCER);
        let info_obj_id = builder.push(info.into_bytes());

        Ok(self.serialize(&builder, info_obj_id))
    }

    /// Build the content stream for one page.
    fn build_content_stream(&self, page: &PageCanvas, builder: &PdfBuilder) -> String {
        let mut stream = String::new();
        let mut image_index = 0usize;

        for command in page.commands() {
            match command {
                DrawCommand::StrokeRect {
                    rect,
                    color,
                    line_width,
                } => {
                    let _ = write!(
                        stream,
                        "q\n{} RG\n{:.2} w\n{:.2} {:.2} {:.2} {:.2} re\nS\nQ\n",
                        Self::color_components(color),
                        line_width,
                        rect.x,
                        rect.y,
                        rect.width,
                        rect.height
                    );
                }

                DrawCommand::Text {
                    x,
                    y,
                    text,
                    role,
                    size,
                    color,
                } => {
                    let font_index = builder
                        .font_objects
                        .iter()
                        .position(|(r, _)| r == role)
                        .unwrap_or(0);
                    let encoded = match builder.embedded.get(role) {
                        Some(embed) => Self::encode_glyph_ids(text, &embed.char_to_gid),
                        None => Self::encode_winansi(text),
                    };
                    let _ = write!(
                        stream,
                        "BT\n{} rg\n/F{} {:.1} Tf\n{:.2} {:.2} Td\n{} Tj\nET\n",
                        Self::color_components(color),
                        font_index,
                        size,
                        x,
                        y,
                        encoded
                    );
                }

                DrawCommand::Image { rect, .. } => {
                    let _ = write!(
                        stream,
                        "q\n{:.4} 0 0 {:.4} {:.2} {:.2} cm\n/Im{} Do\nQ\n",
                        rect.width, rect.height, rect.x, rect.y, image_index
                    );
                    image_index += 1;
                }
            }
        }

        stream
    }

    fn color_components(color: &Color) -> String {
        format!("{:.3} {:.3} {:.3}", color.r, color.g, color.b)
    }

    /// Register `/F0` (regular) and `/F1` (bold). Embedded faces only get
    /// glyph mappings for the characters the pages actually use.
    fn register_fonts(
        &self,
        builder: &mut PdfBuilder,
        pages: &[PageCanvas],
        fonts: &FontContext,
    ) -> Result<()> {
        let mut used: BTreeMap<FontRole, BTreeSet<char>> = BTreeMap::new();
        for page in pages {
            for command in page.commands() {
                if let DrawCommand::Text { text, role, .. } = command {
                    used.entry(*role).or_default().extend(text.chars());
                }
            }
        }

        for role in FontRole::ALL {
            let obj_id = match fonts.face(role) {
                FontFace::Standard(std_font) => {
                    let dict = format!(
                        "<< /Type /Font /Subtype /Type1 /BaseFont /{} \
                         /Encoding /WinAnsiEncoding >>",
                        std_font.pdf_name()
                    );
                    builder.push(dict.into_bytes())
                }
                FontFace::Embedded(font) => {
                    let chars = used.remove(&role).unwrap_or_default();
                    Self::write_embedded_font_objects(builder, role, font, &chars)?
                }
            };
            builder.font_objects.push((role, obj_id));
        }
        Ok(())
    }

    /// Write the CIDFont objects for an embedded TrueType face and return
    /// the id of the Type0 root dictionary.
    fn write_embedded_font_objects(
        builder: &mut PdfBuilder,
        role: FontRole,
        font: &EmbeddedFont,
        used_chars: &BTreeSet<char>,
    ) -> Result<usize> {
        let face = ttf_parser::Face::parse(&font.data, 0).map_err(|e| {
            CardgridError::Font(format!("Failed to parse TTF data for '{}': {}", font.family, e))
        })?;

        let units_per_em = face.units_per_em();
        let scale = 1000.0 / units_per_em as f64;
        let pdf_font_name = Self::sanitize_font_name(&font.family, role);

        let char_to_gid: BTreeMap<char, u16> = used_chars
            .iter()
            .filter_map(|&ch| font.metrics.glyph_ids.get(&ch).map(|&gid| (ch, gid)))
            .collect();

        // 1. FontFile2, shared between roles that use the same bytes
        let cached = builder
            .font_files
            .iter()
            .find(|(data, _)| Arc::ptr_eq(data, &font.data))
            .map(|(_, id)| *id);
        let fontfile2_id = match cached {
            Some(id) => id,
            None => {
                let id = builder.push_stream(&format!("/Length1 {} ", font.data.len()), &font.data);
                builder.font_files.push((Arc::clone(&font.data), id));
                id
            }
        };

        // 2. FontDescriptor
        let bbox = face.global_bounding_box();
        let cap_height = face.capital_height().unwrap_or(face.ascender()) as f64 * scale;
        let stem_v = match role {
            FontRole::Bold => 120,
            FontRole::Regular => 80,
        };
        let descriptor = format!(
            "<< /Type /FontDescriptor /FontName /{} /Flags 4 \
             /FontBBox [{} {} {} {}] /ItalicAngle 0 \
             /Ascent {} /Descent {} /CapHeight {} /StemV {} \
             /FontFile2 {} 0 R >>",
            pdf_font_name,
            (bbox.x_min as f64 * scale) as i32,
            (bbox.y_min as f64 * scale) as i32,
            (bbox.x_max as f64 * scale) as i32,
            (bbox.y_max as f64 * scale) as i32,
            (face.ascender() as f64 * scale) as i32,
            (face.descender() as f64 * scale) as i32,
            cap_height as i32,
            stem_v,
            fontfile2_id,
        );
        let descriptor_id = builder.push(descriptor.into_bytes());

        // 3. CIDFont
        let default_width = face
            .glyph_hor_advance(ttf_parser::GlyphId(0))
            .map(|adv| (adv as f64 * scale) as u32)
            .unwrap_or(1000);
        let cidfont = format!(
            "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{} \
             /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> \
             /FontDescriptor {} 0 R /DW {} /W {} \
             /CIDToGIDMap /Identity >>",
            pdf_font_name,
            descriptor_id,
            default_width,
            Self::build_w_array(&char_to_gid, &face),
        );
        let cidfont_id = builder.push(cidfont.into_bytes());

        // 4. ToUnicode
        let cmap = Self::build_tounicode_cmap(&char_to_gid, &pdf_font_name);
        let tounicode_id = builder.push_stream("", cmap.as_bytes());

        // 5. Type0 root
        let type0 = format!(
            "<< /Type /Font /Subtype /Type0 /BaseFont /{} \
             /Encoding /Identity-H /DescendantFonts [{} 0 R] \
             /ToUnicode {} 0 R >>",
            pdf_font_name, cidfont_id, tounicode_id,
        );
        let type0_id = builder.push(type0.into_bytes());

        builder.embedded.insert(role, EmbedData { char_to_gid });
        Ok(type0_id)
    }

    /// Image XObjects for one page, in drawing order.
    fn register_images(builder: &mut PdfBuilder, page: &PageCanvas) -> Vec<usize> {
        page.commands()
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Image { image, .. } => Some(Self::write_image_xobject(builder, image)),
                _ => None,
            })
            .collect()
    }

    /// Write an RGB image XObject, preceded by its SMask when it has alpha.
    fn write_image_xobject(builder: &mut PdfBuilder, image: &ResolvedImage) -> usize {
        let smask_ref = image
            .alpha
            .as_ref()
            .map(|alpha| {
                let dict = format!(
                    "/Type /XObject /Subtype /Image /Width {} /Height {} \
                     /ColorSpace /DeviceGray /BitsPerComponent 8 ",
                    image.width_px, image.height_px
                );
                let smask_id = builder.push_stream(&dict, alpha);
                format!("/SMask {} 0 R ", smask_id)
            })
            .unwrap_or_default();

        let dict = format!(
            "/Type /XObject /Subtype /Image /Width {} /Height {} \
             /ColorSpace /DeviceRGB /BitsPerComponent 8 {}",
            image.width_px, image.height_px, smask_ref
        );
        builder.push_stream(&dict, &image.rgb)
    }

    /// Per-glyph widths for the CIDFont: `[gid [width] gid [width] ...]`.
    fn build_w_array(char_to_gid: &BTreeMap<char, u16>, face: &ttf_parser::Face) -> String {
        let scale = 1000.0 / face.units_per_em() as f64;
        let gids: BTreeSet<u16> = char_to_gid.values().copied().collect();

        let mut result = String::from("[");
        for gid in gids {
            let advance = face
                .glyph_hor_advance(ttf_parser::GlyphId(gid))
                .unwrap_or(0);
            let _ = write!(result, " {} [{}]", gid, (advance as f64 * scale) as u32);
        }
        result.push_str(" ]");
        result
    }

    /// ToUnicode CMap so text can be copied out of the PDF.
    fn build_tounicode_cmap(char_to_gid: &BTreeMap<char, u16>, font_name: &str) -> String {
        let mut gid_to_char: Vec<(u16, char)> =
            char_to_gid.iter().map(|(&ch, &gid)| (gid, ch)).collect();
        gid_to_char.sort();
        gid_to_char.dedup_by_key(|(gid, _)| *gid);

        let mut cmap = String::new();
        cmap.push_str("/CIDInit /ProcSet findresource begin\n");
        cmap.push_str("12 dict begin\n");
        cmap.push_str("begincmap\n");
        cmap.push_str("/CIDSystemInfo\n");
        cmap.push_str("<< /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
        let _ = writeln!(cmap, "/CMapName /{}-UTF16 def", font_name);
        cmap.push_str("/CMapType 2 def\n");
        cmap.push_str("1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

        // At most 100 entries per bfchar block
        for chunk in gid_to_char.chunks(100) {
            let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
            for &(gid, ch) in chunk {
                let mut units = [0u16; 2];
                let hex: String = ch
                    .encode_utf16(&mut units)
                    .iter()
                    .map(|u| format!("{:04X}", u))
                    .collect();
                let _ = writeln!(cmap, "<{:04X}> <{}>", gid, hex);
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str("endcmap\n");
        cmap.push_str("CMapName currentdict /CMap defineresource pop\n");
        cmap.push_str("end\nend\n");
        cmap
    }

    /// PDF name for an embedded face: the family stripped to safe
    /// characters, with `-Bold` for the bold role.
    fn sanitize_font_name(family: &str, role: FontRole) -> String {
        let mut name: String = family
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        if name.is_empty() {
            name = "CustomFont".to_string();
        }
        if role == FontRole::Bold && !name.ends_with("-Bold") {
            name.push_str("-Bold");
        }
        name
    }

    fn build_font_resource_dict(font_objects: &[(FontRole, usize)]) -> String {
        font_objects
            .iter()
            .enumerate()
            .map(|(i, (_, obj_id))| format!("/F{} {} 0 R", i, obj_id))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Hex string of 2-byte glyph ids. Characters missing from the font
    /// map to glyph 0.
    fn encode_glyph_ids(text: &str, char_to_gid: &BTreeMap<char, u16>) -> String {
        let mut hex = String::with_capacity(text.len() * 4 + 2);
        hex.push('<');
        for ch in text.chars() {
            let gid = char_to_gid.get(&ch).copied().unwrap_or(0);
            let _ = write!(hex, "{:04X}", gid);
        }
        hex.push('>');
        hex
    }

    /// Literal string in WinAnsi. Unmappable characters become `?`.
    fn encode_winansi(text: &str) -> String {
        let mut out = String::with_capacity(text.len() + 2);
        out.push('(');
        for ch in text.chars() {
            let b = Self::unicode_to_winansi(ch).unwrap_or(b'?');
            match b {
                b'\\' => out.push_str("\\\\"),
                b'(' => out.push_str("\\("),
                b')' => out.push_str("\\)"),
                0x20..=0x7E => out.push(b as char),
                _ => {
                    let _ = write!(out, "\\{:03o}", b);
                }
            }
        }
        out.push(')');
        out
    }

    /// Info dictionary string: a literal for ASCII, UTF-16BE hex otherwise.
    fn text_string(s: &str) -> String {
        if s.is_ascii() {
            return format!("({})", Self::escape_pdf_string(s));
        }
        let mut hex = String::from("<FEFF");
        for unit in s.encode_utf16() {
            let _ = write!(hex, "{:04X}", unit);
        }
        hex.push('>');
        hex
    }

    /// Escape special characters in a PDF string.
    fn escape_pdf_string(s: &str) -> String {
        s.replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)")
    }

    /// Map a Unicode codepoint to a WinAnsiEncoding byte value.
    ///
    /// WinAnsiEncoding is Windows-1252: 0x20..=0x7E and 0xA0..=0xFF map
    /// directly, 0x80..=0x9F holds quotes, dashes and a few letters.
    fn unicode_to_winansi(ch: char) -> Option<u8> {
        let cp = ch as u32;
        if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
            return Some(cp as u8);
        }
        match cp {
            0x20AC => Some(0x80), // Euro sign
            0x201A => Some(0x82),
            0x0192 => Some(0x83),
            0x201E => Some(0x84),
            0x2026 => Some(0x85), // Ellipsis
            0x2020 => Some(0x86),
            0x2021 => Some(0x87),
            0x02C6 => Some(0x88),
            0x2030 => Some(0x89),
            0x0160 => Some(0x8A), // Š
            0x2039 => Some(0x8B),
            0x0152 => Some(0x8C), // Œ
            0x017D => Some(0x8E), // Ž
            0x2018 => Some(0x91),
            0x2019 => Some(0x92),
            0x201C => Some(0x93),
            0x201D => Some(0x94),
            0x2022 => Some(0x95), // Bullet
            0x2013 => Some(0x96), // En dash
            0x2014 => Some(0x97), // Em dash
            0x02DC => Some(0x98),
            0x2122 => Some(0x99),
            0x0161 => Some(0x9A), // š
            0x203A => Some(0x9B),
            0x0153 => Some(0x9C), // œ
            0x017E => Some(0x9E), // ž
            0x0178 => Some(0x9F), // Ÿ
            _ => None,
        }
    }

    /// Serialize all objects into the final PDF byte stream.
    fn serialize(&self, builder: &PdfBuilder, info_obj_id: usize) -> Vec<u8> {
        let mut output: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = vec![0; builder.objects.len()];

        output.extend_from_slice(b"%PDF-1.7\n");
        output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

        for (i, obj) in builder.objects.iter().enumerate().skip(1) {
            offsets[i] = output.len();
            let _ = write!(output, "{} 0 obj\n", i);
            output.extend_from_slice(&obj.data);
            output.extend_from_slice(b"\nendobj\n\n");
        }

        let xref_offset = output.len();
        let _ = write!(output, "xref\n0 {}\n", builder.objects.len());
        let _ = write!(output, "0000000000 65535 f \n");
        for offset in offsets.iter().skip(1) {
            let _ = write!(output, "{:010} 00000 n \n", offset);
        }

        let _ = write!(
            output,
            "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            builder.objects.len(),
            info_obj_id,
            xref_offset
        );

        output
    }
}
