//! Glyph table export for web front-ends.

use std::{
    collections::BTreeMap,
    fs::File,
    io::{
        BufWriter,
        Write,
    },
    path::Path,
};

use crate::{
    convert::Error,
    font::FontTable,
};

/// Writes `table` as a TypeScript module exporting `GLYPHS`, a map from
/// character to hex columns. Keys are sorted.
pub fn to_typescript(table: &FontTable, mut writer: impl Write) -> Result<(), Error> {
    let sorted: BTreeMap<char, &[u32]> = table
        .iter()
        .map(|(character, glyph)| (character, glyph.columns()))
        .collect();

    writeln!(writer, "export const GLYPHS: {{ [key: string]: number[] }} = {{")?;
    for (character, columns) in sorted {
        let columns = columns
            .iter()
            .map(|column| format!("0x{column:04x}"))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(writer, "  '{}': [{columns}],", character.escape_default())?;
    }
    writeln!(writer, "}};")?;
    Ok(())
}

pub fn to_typescript_path(table: &FontTable, path: impl AsRef<Path>) -> Result<(), Error> {
    tracing::debug!(path = %path.as_ref().display(), "Exporting glyph table");
    let mut writer = BufWriter::new(File::create(path)?);
    to_typescript(table, &mut writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exports_sorted_hex_columns() {
        let table =
            FontTable::from_entries(2, [('b', vec![0x3fff, 0]), ('\'', vec![1, 2])]).unwrap();

        let mut output = vec![];
        to_typescript(&table, &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "export const GLYPHS: { [key: string]: number[] } = {\n  '\\'': [0x0001, 0x0002],\n  'b': [0x3fff, 0x0000],\n};\n"
        );
    }
}
