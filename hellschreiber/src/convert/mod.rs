//! Offline converters from external bitmap fonts into [`FontTable`]s.
//!
//! [`FontTable`]: crate::font::FontTable

pub mod bdf;
pub mod cxx;
pub mod export;

use crate::glyph::MAX_PIXEL_HEIGHT;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error")]
    Io(#[from] std::io::Error),
    #[error("font table error")]
    Font(#[from] crate::font::Error),
    #[error("no glyphs found in source")]
    NoGlyphs,
    #[error("invalid glyph height {height}, expected 1 to {MAX_PIXEL_HEIGHT} rows")]
    InvalidHeight { height: usize },
}

/// Converts row-major bitmap words into columns.
///
/// `rows[0]` is the top row. In each row word the leftmost pixel is the
/// highest used bit. Rows are right-aligned to `max(bit length, cols)`, so
/// data left-aligned in wider words still lands at column 0. Missing rows
/// are blank, excess rows are dropped.
pub fn rows_to_columns(rows: &[u64], cols: usize, height: usize) -> Result<Vec<u32>, Error> {
    if height == 0 || height > MAX_PIXEL_HEIGHT {
        return Err(Error::InvalidHeight { height });
    }

    let rows = &rows[..rows.len().min(height)];
    let max_bit_length = rows
        .iter()
        .map(|row| (u64::BITS - row.leading_zeros()) as usize)
        .max()
        .unwrap_or_default();
    let effective_width = max_bit_length.max(cols);

    let columns = (0..cols)
        .map(|x| {
            let source_bit = u32::try_from(effective_width - 1 - x).unwrap_or(u32::MAX);
            rows.iter()
                .enumerate()
                .filter(|(_, row)| row.checked_shr(source_bit).unwrap_or_default() & 1 != 0)
                .fold(0u32, |column, (y, _)| column | 1 << (height - 1 - y))
        })
        .collect();

    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_left_pixel_becomes_high_bit_of_first_column() {
        let rows = [0b100, 0b000, 0b001];
        let columns = rows_to_columns(&rows, 3, 3).unwrap();
        assert_eq!(columns, vec![0b100, 0, 0b001]);
    }

    #[test]
    fn wide_rows_are_right_aligned_to_their_bit_length() {
        // 16 bit words with the glyph in the top 14 bits
        let rows = [0x8000u64];
        let columns = rows_to_columns(&rows, 14, 1).unwrap();
        assert_eq!(columns[0], 1);
        assert!(columns[1..].iter().all(|column| *column == 0));
    }

    #[test]
    fn missing_rows_are_blank() {
        let columns = rows_to_columns(&[0b1], 1, 4).unwrap();
        assert_eq!(columns, vec![0b1000]);
    }

    #[test]
    fn rejects_invalid_height() {
        assert!(matches!(
            rows_to_columns(&[], 4, 0),
            Err(Error::InvalidHeight { height: 0 })
        ));
        assert!(rows_to_columns(&[], 4, 33).is_err());
    }
}
