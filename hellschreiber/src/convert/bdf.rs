//! BDF bitmap fonts.
//!
//! Each `BITMAP` row is a hex word with the leftmost pixel in the most
//! significant bit. Glyphs are placed with a margin inside a square canvas.

use std::io::BufRead;

use encoding_rs::{
    EUC_JP,
    SHIFT_JIS,
};

use crate::{
    convert::Error,
    font::FontTable,
};

/// Hex digits of a row that fit into the packing word.
const MAX_ROW_DIGITS: usize = u64::BITS as usize / 4;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BdfGlyph {
    pub encoding: u32,
    /// Hex rows, top row first.
    pub rows: Vec<String>,
}

#[derive(Clone, Copy, Debug)]
pub struct BdfOptions {
    pub glyph_width: usize,
    pub glyph_height: usize,
    pub canvas: usize,
    pub offset: usize,
}

impl Default for BdfOptions {
    fn default() -> Self {
        Self {
            glyph_width: 12,
            glyph_height: 12,
            canvas: 14,
            offset: 1,
        }
    }
}

/// Reads all glyphs that have a non-negative encoding and bitmap data.
pub fn parse(reader: impl BufRead) -> Result<Vec<BdfGlyph>, Error> {
    let mut glyphs = vec![];
    let mut encoding: Option<u32> = None;
    let mut rows = vec![];
    let mut in_bitmap = false;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim_end();

        if line.starts_with("STARTCHAR") {
            encoding = None;
            rows.clear();
            in_bitmap = false;
        }
        else if line.starts_with("ENCODING") {
            encoding = line
                .split_whitespace()
                .nth(1)
                .and_then(|value| value.parse::<i64>().ok())
                .and_then(|value| u32::try_from(value).ok());
        }
        else if line == "BITMAP" {
            in_bitmap = true;
        }
        else if line == "ENDCHAR" {
            match encoding.take() {
                Some(encoding) if !rows.is_empty() => {
                    glyphs.push(BdfGlyph {
                        encoding,
                        rows: std::mem::take(&mut rows),
                    });
                }
                _ => rows.clear(),
            }
            in_bitmap = false;
        }
        else if in_bitmap {
            let row = line.trim();
            if !row.is_empty() && row.chars().all(|c| c.is_ascii_hexdigit()) {
                rows.push(row.to_owned());
            }
        }
    }

    tracing::debug!(glyphs = glyphs.len(), "Parsed BDF font");

    Ok(glyphs)
}

/// Packs a glyph's rows into canvas columns, bit 0 being the bottom pixel.
pub fn glyph_to_columns(glyph: &BdfGlyph, options: &BdfOptions) -> Vec<u32> {
    let mut columns = vec![0u32; options.canvas];

    // the first row decides the bitmap width
    let bitmap_width = glyph
        .rows
        .first()
        .map_or(options.glyph_width, |row| row.len() * 4);

    // only the leftmost `glyph_width` pixels are used
    let digits = options.glyph_width.div_ceil(4).min(MAX_ROW_DIGITS);

    for (r, row) in glyph.rows.iter().take(options.glyph_height).enumerate() {
        let prefix = row.get(..row.len().min(digits)).unwrap_or(row);
        let Ok(word) = u64::from_str_radix(prefix, 16)
        else {
            tracing::warn!(encoding = glyph.encoding, row = %row, "Invalid BITMAP row");
            continue;
        };
        let row_width = prefix.len() * 4;

        for c in 0..row_width.min(bitmap_width).min(options.glyph_width) {
            let shift = u32::try_from(row_width - 1 - c).unwrap_or(u32::MAX);
            if word.checked_shr(shift).unwrap_or_default() & 1 == 0 {
                continue;
            }

            let x = options.offset + c;
            let Some(y) = options
                .canvas
                .checked_sub(1 + options.offset + r)
            else {
                continue;
            };
            if x < options.canvas && y < u32::BITS as usize {
                columns[x] |= 1 << y;
            }
        }
    }

    columns
}

/// Maps a BDF encoding to a character.
///
/// Single byte values are taken as is. Larger values are tried as JIS X 0208
/// (through EUC-JP), then as Shift_JIS, then as a Unicode code point.
pub fn decode_encoding(encoding: u32) -> Option<char> {
    if encoding <= 0xff {
        return char::from_u32(encoding);
    }

    if encoding <= 0xffff {
        let [hi, lo] = (encoding as u16).to_be_bytes();

        let decoded = decode_single(EUC_JP.decode_without_bom_handling_and_without_replacement(&[
            hi | 0x80,
            lo | 0x80,
        ]));
        if decoded.is_some() {
            return decoded;
        }

        let decoded =
            decode_single(SHIFT_JIS.decode_without_bom_handling_and_without_replacement(&[hi, lo]));
        if decoded.is_some() {
            return decoded;
        }
    }

    char::from_u32(encoding)
}

fn decode_single(decoded: Option<std::borrow::Cow<'_, str>>) -> Option<char> {
    decoded?.chars().next()
}

/// Converts parsed glyphs into a table of `canvas` columns.
pub fn to_table(glyphs: &[BdfGlyph], options: &BdfOptions) -> Result<FontTable, Error> {
    let mut table = FontTable::new(options.canvas)?;

    for glyph in glyphs {
        match decode_encoding(glyph.encoding) {
            Some(character) => table.insert(character, glyph_to_columns(glyph, options)),
            None => {
                tracing::debug!(encoding = glyph.encoding, "Skipping BDF glyph without a character");
            }
        }
    }

    if table.is_empty() {
        return Err(Error::NoGlyphs);
    }

    tracing::debug!(glyphs = table.len(), "Converted BDF font");

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FONT: &str = "\
STARTFONT 2.1
FONT -misc-test
CHARS 3
STARTCHAR A
ENCODING 65
BBX 12 12 0 0
BITMAP
800
000
001
ENDCHAR
STARTCHAR negative
ENCODING -1
BITMAP
FFF
ENDCHAR
STARTCHAR kanji
ENCODING 12396
BITMAP
zz
ENDCHAR
ENDFONT
";

    #[test]
    fn skips_negative_encodings_and_non_hex_rows() {
        let glyphs = parse(FONT.as_bytes()).unwrap();
        assert_eq!(
            glyphs,
            vec![BdfGlyph {
                encoding: 65,
                rows: vec!["800".into(), "000".into(), "001".into()],
            }]
        );
    }

    #[test]
    fn places_bitmap_inside_margin() {
        let glyph = BdfGlyph {
            encoding: 65,
            rows: vec!["800".into(), "000".into(), "001".into()],
        };
        let columns = glyph_to_columns(&glyph, &BdfOptions::default());

        assert_eq!(columns.len(), 14);
        // top left pixel: column 1, row 1 from the top
        assert_eq!(columns[1], 1 << 12);
        // third row, rightmost of 12 columns
        assert_eq!(columns[12], 1 << 10);
        assert_eq!(columns[0], 0);
        assert_eq!(columns[13], 0);
    }

    #[test]
    fn wide_rows_keep_their_leftmost_pixels() {
        // 160 bits per row, more than any integer holds
        let mut row = "8".to_owned();
        row.push_str(&"0".repeat(38));
        row.push('1');
        let glyph = BdfGlyph {
            encoding: 65,
            rows: vec![row],
        };
        let columns = glyph_to_columns(&glyph, &BdfOptions::default());

        assert_eq!(columns[1], 1 << 12);
        assert_eq!(columns.iter().filter(|column| **column != 0).count(), 1);
    }

    #[test]
    fn decodes_jis_encodings() {
        assert_eq!(decode_encoding(0x41), Some('A'));
        // JIS X 0208 0x2422 is hiragana A
        assert_eq!(decode_encoding(0x2422), Some('あ'));
        // JIS X 0208 0x3441 is 漢
        assert_eq!(decode_encoding(0x3441), Some('漢'));
    }

    #[test]
    fn converts_to_table() {
        let glyphs = parse(FONT.as_bytes()).unwrap();
        let table = to_table(&glyphs, &BdfOptions::default()).unwrap();
        assert_eq!(table.width(), 14);
        assert_eq!(table.get('A').unwrap().column(1), 1 << 12);
    }

    #[test]
    fn empty_font_is_an_error() {
        assert!(matches!(
            to_table(&[], &BdfOptions::default()),
            Err(Error::NoGlyphs)
        ));
    }
}
