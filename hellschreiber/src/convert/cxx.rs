//! C/C++ font sources.
//!
//! Two layouts are understood: tables of `{ key, { columns... } }` entries,
//! where the values already are columns, and plain streams of row words
//! inside brace blocks, a fixed number of rows per glyph.

use std::collections::BTreeMap;

use crate::{
    convert::{
        Error,
        rows_to_columns,
    },
    font::FontTable,
    glyph::{
        GLYPH_WIDTH,
        PIXEL_HEIGHT,
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Token<'a> {
    Hex(&'a str),
    Decimal(&'a str),
}

impl Token<'_> {
    fn parse<T: TryFrom<u64>>(&self) -> Option<T> {
        let value = match self {
            Token::Hex(digits) => u64::from_str_radix(digits, 16).ok()?,
            Token::Decimal(digits) => digits.parse::<u64>().ok()?,
        };
        T::try_from(value).ok()
    }

    fn is_hex(&self) -> bool {
        matches!(self, Token::Hex(_))
    }
}

/// Numeric literals in `text`: whole words that are either `0x` followed by
/// hex digits, or only decimal digits.
fn numeric_tokens(text: &str) -> Vec<Token<'_>> {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter_map(|word| {
            if let Some(digits) = word
                .strip_prefix("0x")
                .or_else(|| word.strip_prefix("0X"))
            {
                (!digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit()))
                    .then_some(Token::Hex(digits))
            }
            else {
                (!word.is_empty() && word.chars().all(|c| c.is_ascii_digit()))
                    .then_some(Token::Decimal(word))
            }
        })
        .collect()
}

#[derive(Debug)]
enum Skip {
    /// Not an entry. Scanning resumes right after the opening brace.
    NotAnEntry(&'static str),
    /// A well-formed entry with unusable content. Scanning resumes after it.
    Entry { reason: &'static str, end: usize },
}

struct Entry {
    character: char,
    values: Vec<u32>,
    end: usize,
}

fn skip_whitespace(text: &str, mut position: usize) -> usize {
    while let Some(c) = text[position..].chars().next() {
        if !c.is_whitespace() {
            break;
        }
        position += c.len_utf8();
    }
    position
}

enum Key {
    Quoted(String),
    CodePoint(String),
}

fn parse_key(text: &str, position: usize) -> Result<(Key, usize), Skip> {
    let rest = &text[position..];

    if let Some(quoted) = rest.strip_prefix('\'') {
        let mut key = String::new();
        let mut escaped = false;
        for (offset, c) in quoted.char_indices() {
            if escaped {
                key.push(c);
                escaped = false;
            }
            else if c == '\\' {
                escaped = true;
            }
            else if c == '\'' {
                return Ok((Key::Quoted(key), position + 1 + offset + 1));
            }
            else {
                key.push(c);
            }
        }
        Err(Skip::NotAnEntry("unterminated quoted key"))
    }
    else {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits == 0 {
            return Err(Skip::NotAnEntry("unrecognized key"));
        }
        Ok((
            Key::CodePoint(rest[..digits].to_owned()),
            position + digits,
        ))
    }
}

fn expect(text: &str, position: usize, expected: char, reason: &'static str) -> Result<usize, Skip> {
    let position = skip_whitespace(text, position);
    if text[position..].starts_with(expected) {
        Ok(position + 1)
    }
    else {
        Err(Skip::NotAnEntry(reason))
    }
}

/// Index of the brace closing the one at `open`.
fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, byte) in text.as_bytes()[open..].iter().enumerate() {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parses the entry whose opening brace is at `open`.
fn parse_entry(text: &str, open: usize) -> Result<Entry, Skip> {
    let position = skip_whitespace(text, open + 1);
    let (key, position) = parse_key(text, position)?;
    let position = expect(text, position, ',', "expected ',' after key")?;
    let inner_open = expect(text, position, '{', "expected '{' before values")? - 1;
    let inner_close =
        matching_brace(text, inner_open).ok_or(Skip::NotAnEntry("unterminated values"))?;
    let end = inner_close;

    let tokens = numeric_tokens(&text[inner_open + 1..inner_close]);
    if tokens.is_empty() {
        return Err(Skip::Entry {
            reason: "no numeric values",
            end,
        });
    }
    let values = tokens
        .iter()
        .map(|token| token.parse::<u32>())
        .collect::<Option<Vec<u32>>>()
        .ok_or(Skip::Entry {
            reason: "value out of range",
            end,
        })?;

    let character = match key {
        Key::Quoted(key) => {
            let mut chars = key.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(c),
                _ => None,
            }
        }
        Key::CodePoint(digits) => digits.parse::<u32>().ok().and_then(char::from_u32),
    }
    .ok_or(Skip::Entry {
        reason: "key is not a single character",
        end,
    })?;

    Ok(Entry {
        character,
        values,
        end,
    })
}

/// Scans `{ key, { values... } }` entries.
///
/// Keys are quoted characters (backslash escapes the next character) or
/// decimal code points. Values are hex (`0x`) or decimal literals. Anything
/// else is skipped.
pub fn parse_entries(text: &str) -> Result<BTreeMap<char, Vec<u32>>, Error> {
    let mut entries = BTreeMap::new();
    let mut position = 0;
    let mut skipped = 0usize;

    while let Some(offset) = text[position..].find('{') {
        let open = position + offset;

        match parse_entry(text, open) {
            Ok(entry) => {
                entries.insert(entry.character, entry.values);
                position = entry.end + 1;
            }
            Err(Skip::NotAnEntry(reason)) => {
                tracing::trace!(open, reason, "Not an entry");
                position = open + 1;
            }
            Err(Skip::Entry { reason, end }) => {
                tracing::debug!(open, reason, "Skipping entry");
                skipped += 1;
                position = end + 1;
            }
        }
    }

    tracing::debug!(parsed = entries.len(), skipped, "Parsed font entries");

    if entries.is_empty() {
        return Err(Error::NoGlyphs);
    }
    Ok(entries)
}

/// Builds a table from column entries. The widest entry sets the width.
pub fn entries_to_table(entries: BTreeMap<char, Vec<u32>>) -> Result<FontTable, Error> {
    let width = entries
        .values()
        .map(|values| values.len())
        .max()
        .unwrap_or_default()
        .max(1);
    Ok(FontTable::from_entries(width, entries)?)
}

#[derive(Clone, Copy, Debug)]
pub struct RowStreamOptions {
    /// Row words per glyph.
    pub rows: usize,
    /// Columns per glyph.
    pub cols: usize,
    /// Code point of the first glyph.
    pub start: u32,
}

impl Default for RowStreamOptions {
    fn default() -> Self {
        Self {
            rows: PIXEL_HEIGHT,
            cols: GLYPH_WIDTH,
            start: 32,
        }
    }
}

/// Row words from every `{...}` block, or from the whole text if there are
/// none. Hex literals win over decimal ones within a block.
fn row_words(text: &str) -> Vec<u64> {
    fn words(text: &str) -> Vec<u64> {
        let tokens = numeric_tokens(text);
        let prefer_hex = tokens.iter().any(Token::is_hex);
        tokens
            .iter()
            .filter(|token| token.is_hex() == prefer_hex)
            .filter_map(|token| token.parse::<u64>())
            .collect()
    }

    let mut numbers = vec![];
    let mut position = 0;
    while let Some(offset) = text[position..].find('{') {
        let open = position + offset;
        let Some(length) = text[open + 1..].find('}')
        else {
            break;
        };
        let close = open + 1 + length;
        numbers.extend(words(&text[open + 1..close]));
        position = close + 1;
    }

    if numbers.is_empty() {
        numbers = words(text);
    }
    numbers
}

/// Converts a stream of row words into a table, `options.rows` words per
/// glyph, glyph `i` being code point `options.start + i`.
pub fn parse_row_stream(text: &str, options: &RowStreamOptions) -> Result<FontTable, Error> {
    if options.rows == 0 {
        return Err(Error::InvalidHeight { height: 0 });
    }

    let words = row_words(text);
    if words.is_empty() {
        return Err(Error::NoGlyphs);
    }

    let mut table = FontTable::new(options.cols)?;
    for (index, rows) in words.chunks(options.rows).enumerate() {
        let columns = rows_to_columns(rows, options.cols, options.rows)?;
        let code_point = u32::try_from(index)
            .ok()
            .and_then(|index| options.start.checked_add(index))
            .and_then(char::from_u32);

        match code_point {
            Some(character) => table.insert(character, columns),
            None => tracing::debug!(index, "Skipping glyph without a valid code point"),
        }
    }

    tracing::debug!(glyphs = table.len(), "Converted row stream");

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
// glyph table
static fntchr feldfat[] = {
    { ' ', { 0x0000, 0x0000 } },
    { '\'', { 0x0001, 0x0002 } },
    { 65, { 0x3ffc, 16383 } },
    { 'B', { } },
    { 'CD', { 0x1 } },
};
"#;

    #[test]
    fn parses_quoted_and_numeric_keys() {
        let entries = parse_entries(SOURCE).unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[&' '], vec![0, 0]);
        assert_eq!(entries[&'\''], vec![1, 2]);
        assert_eq!(entries[&'A'], vec![0x3ffc, 16383]);
        assert!(!entries.contains_key(&'B'));
    }

    #[test]
    fn no_entries_is_an_error() {
        assert!(matches!(
            parse_entries("int x = { 1, 2 };"),
            Err(Error::NoGlyphs)
        ));
    }

    #[test]
    fn entries_become_a_table() {
        let table = entries_to_table(parse_entries(SOURCE).unwrap()).unwrap();
        assert_eq!(table.width(), 2);
        assert_eq!(table.get('A').unwrap().columns(), &[0x3ffc, 16383]);
    }

    #[test]
    fn row_stream_maps_glyphs_from_start() {
        let source = "const unsigned short font[] = { 0x8, 0x0 };\nconst unsigned short more[] = { 0x1, 0x1 };";
        let options = RowStreamOptions {
            rows: 2,
            cols: 4,
            start: 65,
        };
        let table = parse_row_stream(source, &options).unwrap();

        assert_eq!(table.len(), 2);
        // top left pixel of 'A'
        assert_eq!(table.get('A').unwrap().columns(), &[0b10, 0, 0, 0]);
        // right column fully set in 'B'
        assert_eq!(table.get('B').unwrap().columns(), &[0, 0, 0, 0b11]);
    }

    #[test]
    fn row_stream_falls_back_to_decimal_and_pads_last_glyph() {
        let table = parse_row_stream(
            "{ 8, 8, 8 }",
            &RowStreamOptions {
                rows: 2,
                cols: 4,
                start: 32,
            },
        )
        .unwrap();

        assert_eq!(table.get(' ').unwrap().columns(), &[0b11, 0, 0, 0]);
        assert_eq!(table.get('!').unwrap().columns(), &[0b10, 0, 0, 0]);
    }
}
