//! Character to glyph tables.
//!
//! Tables are stored as JSON objects mapping a one-character string to the
//! list of its columns:
//!
//! ```json
//! { "A": [16380, 16382, 195, 195, 16382, 16380, 0] }
//! ```

use std::{
    collections::{
        BTreeMap,
        HashMap,
    },
    fs::File,
    io::{
        BufReader,
        BufWriter,
        Read,
        Write,
    },
    path::Path,
};

use crate::glyph::Glyph;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("font table io error")]
    Io(#[from] std::io::Error),
    #[error("malformed font table")]
    Json(#[from] serde_json::Error),
    #[error("font table width must be at least 1")]
    ZeroWidth,
}

#[derive(Clone, Debug)]
pub struct FontTable {
    width: usize,
    glyphs: HashMap<char, Glyph>,
}

impl FontTable {
    pub fn new(width: usize) -> Result<Self, Error> {
        if width == 0 {
            return Err(Error::ZeroWidth);
        }
        Ok(Self {
            width,
            glyphs: HashMap::new(),
        })
    }

    /// Table that only knows the space character.
    pub fn space_only(width: usize) -> Result<Self, Error> {
        let mut table = Self::new(width)?;
        table.insert(' ', []);
        Ok(table)
    }

    pub fn from_entries<I, C>(width: usize, entries: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (char, C)>,
        C: IntoIterator<Item = u32>,
    {
        let mut table = Self::new(width)?;
        for (character, columns) in entries {
            table.insert(character, columns);
        }
        Ok(table)
    }

    /// Inserts a glyph, normalizing it to the table width.
    pub fn insert(&mut self, character: char, columns: impl IntoIterator<Item = u32>) {
        self.glyphs
            .insert(character, Glyph::new(columns, self.width));
    }

    #[inline]
    pub fn get(&self, character: char) -> Option<&Glyph> {
        self.glyphs.get(&character)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, &Glyph)> {
        self.glyphs.iter().map(|(character, glyph)| (*character, glyph))
    }

    /// Re-normalizes every glyph to `width`.
    pub fn with_width(self, width: usize) -> Result<Self, Error> {
        if width == 0 {
            return Err(Error::ZeroWidth);
        }
        if width == self.width {
            return Ok(self);
        }
        Ok(Self {
            width,
            glyphs: self
                .glyphs
                .into_iter()
                .map(|(character, glyph)| (character, glyph.resized(width)))
                .collect(),
        })
    }

    /// Reads a table. Without an explicit `width` the widest glyph in the
    /// source determines the table width.
    pub fn from_reader(reader: impl Read, width: Option<usize>) -> Result<Self, Error> {
        let raw: BTreeMap<String, Vec<u32>> = serde_json::from_reader(reader)?;

        let width = width.unwrap_or_else(|| {
            raw.values()
                .map(|columns| columns.len())
                .max()
                .unwrap_or_default()
                .max(1)
        });

        let mut table = Self::new(width)?;
        for (key, columns) in raw {
            let mut chars = key.chars();
            match (chars.next(), chars.next()) {
                (Some(character), None) => table.insert(character, columns),
                _ => tracing::warn!(?key, "Skipping font table key that is not a single character"),
            }
        }

        tracing::debug!(width = table.width, glyphs = table.len(), "Loaded font table");

        Ok(table)
    }

    pub fn from_path(path: impl AsRef<Path>, width: Option<usize>) -> Result<Self, Error> {
        tracing::debug!(path = %path.as_ref().display(), "Loading font table from file");
        Self::from_reader(BufReader::new(File::open(path)?), width)
    }

    pub fn to_writer(&self, writer: impl Write) -> Result<(), Error> {
        let sorted: BTreeMap<String, &[u32]> = self
            .glyphs
            .iter()
            .map(|(character, glyph)| (character.to_string(), glyph.columns()))
            .collect();
        serde_json::to_writer_pretty(writer, &sorted)?;
        Ok(())
    }

    pub fn to_path(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        tracing::debug!(path = %path.as_ref().display(), "Writing font table to file");
        let mut writer = BufWriter::new(File::create(path)?);
        self.to_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableKind {
    Primary,
    Secondary,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lookup<'a> {
    Found {
        glyph: &'a Glyph,
        table: TableKind,
        /// The case variant that matched.
        key: char,
    },
    Blank,
}

impl<'a> Lookup<'a> {
    pub fn glyph(&self) -> Option<&'a Glyph> {
        match self {
            Lookup::Found { glyph, .. } => Some(glyph),
            Lookup::Blank => None,
        }
    }
}

/// The active pair of font tables.
///
/// ASCII characters are looked up in the primary table first and fall back to
/// the secondary table. Everything else only uses the secondary table. Both
/// tables are normalized to the same width.
#[derive(Clone, Debug)]
pub struct FontSet {
    width: usize,
    primary: Option<FontTable>,
    secondary: Option<FontTable>,
}

impl FontSet {
    pub fn new(width: usize) -> Result<Self, Error> {
        if width == 0 {
            return Err(Error::ZeroWidth);
        }
        Ok(Self {
            width,
            primary: None,
            secondary: None,
        })
    }

    pub fn with_primary(mut self, table: FontTable) -> Result<Self, Error> {
        self.primary = Some(table.with_width(self.width)?);
        Ok(self)
    }

    pub fn with_secondary(mut self, table: FontTable) -> Result<Self, Error> {
        self.secondary = Some(table.with_width(self.width)?);
        Ok(self)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn primary(&self) -> Option<&FontTable> {
        self.primary.as_ref()
    }

    pub fn secondary(&self) -> Option<&FontTable> {
        self.secondary.as_ref()
    }

    pub fn lookup(&self, character: char) -> Lookup<'_> {
        let candidates = case_variants(character);

        let tables: &[(Option<&FontTable>, TableKind)] = if character.is_ascii() {
            &[
                (self.primary.as_ref(), TableKind::Primary),
                (self.secondary.as_ref(), TableKind::Secondary),
            ]
        }
        else {
            &[(self.secondary.as_ref(), TableKind::Secondary)]
        };

        for (table, kind) in tables {
            let Some(table) = table
            else {
                continue;
            };

            for key in candidates.iter().flatten() {
                if let Some(glyph) = table.get(*key) {
                    return Lookup::Found {
                        glyph,
                        table: *kind,
                        key: *key,
                    };
                }
            }
        }

        tracing::warn!(
            ?character,
            code_point = format_args!("U+{:04X}", u32::from(character)),
            "Character not found in any font table"
        );
        Lookup::Blank
    }
}

/// The character itself, then its upper-case and lower-case forms, where
/// those are single characters.
fn case_variants(character: char) -> [Option<char>; 3] {
    fn single(mut iter: impl Iterator<Item = char>) -> Option<char> {
        match (iter.next(), iter.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        }
    }

    [
        Some(character),
        single(character.to_uppercase()),
        single(character.to_lowercase()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(width: usize, entries: &[(char, u32)]) -> FontTable {
        FontTable::from_entries(
            width,
            entries
                .iter()
                .map(|(character, column)| (*character, [*column])),
        )
        .unwrap()
    }

    #[test]
    fn lower_case_entry_resolves_upper_case_input() {
        let fonts = FontSet::new(3)
            .unwrap()
            .with_primary(table(3, &[('a', 7)]))
            .unwrap();

        let Lookup::Found { glyph, table, key } = fonts.lookup('A')
        else {
            panic!("expected 'A' to resolve");
        };
        assert_eq!(glyph.columns(), &[7, 0, 0]);
        assert_eq!(table, TableKind::Primary);
        assert_eq!(key, 'a');
    }

    #[test]
    fn ascii_tries_every_variant_in_primary_before_secondary() {
        let fonts = FontSet::new(1)
            .unwrap()
            .with_primary(table(1, &[('q', 1)]))
            .unwrap()
            .with_secondary(table(1, &[('Q', 2)]))
            .unwrap();

        assert_eq!(fonts.lookup('Q').glyph().unwrap().columns(), &[1]);
    }

    #[test]
    fn ascii_falls_back_to_secondary() {
        let fonts = FontSet::new(1)
            .unwrap()
            .with_primary(table(1, &[(' ', 0)]))
            .unwrap()
            .with_secondary(table(1, &[('k', 5)]))
            .unwrap();

        let lookup = fonts.lookup('K');
        assert!(matches!(
            lookup,
            Lookup::Found {
                table: TableKind::Secondary,
                key: 'k',
                ..
            }
        ));
    }

    #[test]
    fn non_ascii_never_uses_primary() {
        let fonts = FontSet::new(1)
            .unwrap()
            .with_primary(table(1, &[('é', 1)]))
            .unwrap();

        assert_eq!(fonts.lookup('é'), Lookup::Blank);
    }

    #[test]
    fn non_ascii_uses_case_variants_in_secondary() {
        let fonts = FontSet::new(1)
            .unwrap()
            .with_secondary(table(1, &[('ä', 3)]))
            .unwrap();

        assert_eq!(fonts.lookup('Ä').glyph().unwrap().columns(), &[3]);
        assert_eq!(fonts.lookup('あ'), Lookup::Blank);
    }

    #[test]
    fn tables_are_normalized_to_set_width() {
        let fonts = FontSet::new(4)
            .unwrap()
            .with_secondary(table(2, &[('x', 9)]))
            .unwrap();

        assert_eq!(fonts.lookup('x').glyph().unwrap().columns(), &[9, 0, 0, 0]);
    }

    #[test]
    fn zero_width_is_rejected() {
        assert!(matches!(FontTable::new(0), Err(Error::ZeroWidth)));
        assert!(matches!(FontSet::new(0), Err(Error::ZeroWidth)));
    }

    #[test]
    fn reads_json_and_infers_width() {
        let json = r#"{ "A": [1, 2, 3], "B": [4], "toolong": [1] }"#;
        let table = FontTable::from_reader(json.as_bytes(), None).unwrap();

        assert_eq!(table.width(), 3);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get('B').unwrap().columns(), &[4, 0, 0]);
    }

    #[test]
    fn json_round_trip_keeps_columns() {
        let original = FontTable::from_entries(
            4,
            [('A', vec![0x3ffc, 0x0183, 0x3ffc, 0]), ('漢', vec![1, 2, 4, 8])],
        )
        .unwrap();

        let mut buffer = vec![];
        original.to_writer(&mut buffer).unwrap();
        let reloaded = FontTable::from_reader(buffer.as_slice(), None).unwrap();

        assert_eq!(reloaded.width(), 4);
        for (character, glyph) in original.iter() {
            assert_eq!(reloaded.get(character), Some(glyph));
        }
    }
}
