//! Column-encoded character bitmaps.
//!
//! A glyph is a left-to-right sequence of columns. Each column is an integer
//! whose low bits are the pixels of that column, bit 0 being the bottom pixel.

use std::fmt::{
    self,
    Display,
};

/// Pixels per column.
pub const PIXEL_HEIGHT: usize = 14;

/// Columns per glyph of the default font tables.
pub const GLYPH_WIDTH: usize = 14;

/// Tallest column an `u32` can hold.
pub const MAX_PIXEL_HEIGHT: usize = u32::BITS as usize;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Glyph {
    columns: Box<[u32]>,
}

impl Glyph {
    /// Creates a glyph with exactly `width` columns.
    ///
    /// Missing columns are filled with blank columns on the right, excess
    /// columns are dropped.
    pub fn new(columns: impl IntoIterator<Item = u32>, width: usize) -> Self {
        let columns = columns
            .into_iter()
            .chain(std::iter::repeat(0))
            .take(width)
            .collect();
        Self { columns }
    }

    pub fn blank(width: usize) -> Self {
        Self {
            columns: vec![0; width].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn columns(&self) -> &[u32] {
        &self.columns
    }

    /// Column `x`, or a blank column if `x` is past the right edge.
    #[inline]
    pub fn column(&self, x: usize) -> u32 {
        self.columns.get(x).copied().unwrap_or_default()
    }

    /// Whether the pixel at column `x`, row `y` (counted from the bottom) is
    /// set.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        y < MAX_PIXEL_HEIGHT && (self.column(x) >> y) & 1 != 0
    }

    pub fn is_blank(&self) -> bool {
        self.columns.iter().all(|column| *column == 0)
    }

    /// Same glyph normalized to another width.
    pub fn resized(&self, width: usize) -> Self {
        Self::new(self.columns.iter().copied(), width)
    }

    /// Renders the glyph as text, top row first.
    pub fn display(&self, height: usize) -> DisplayGlyph<'_> {
        DisplayGlyph {
            glyph: self,
            height,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct DisplayGlyph<'a> {
    glyph: &'a Glyph,
    height: usize,
}

impl Display for DisplayGlyph<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in (0..self.height).rev() {
            write!(f, "{y:2} ")?;
            for x in 0..self.glyph.width() {
                f.write_str(if self.glyph.pixel(x, y) { "■" } else { "□" })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_short_glyphs_on_the_right() {
        let glyph = Glyph::new([0x1, 0x2], 5);
        assert_eq!(glyph.columns(), &[0x1, 0x2, 0, 0, 0]);
    }

    #[test]
    fn truncates_long_glyphs() {
        let glyph = Glyph::new([1, 2, 3, 4, 5, 6], 4);
        assert_eq!(glyph.columns(), &[1, 2, 3, 4]);
    }

    #[test]
    fn pixels_count_from_the_bottom() {
        let glyph = Glyph::new([0b101], 1);
        assert!(glyph.pixel(0, 0));
        assert!(!glyph.pixel(0, 1));
        assert!(glyph.pixel(0, 2));
        assert!(!glyph.pixel(1, 0));
        assert!(!glyph.pixel(0, 40));
    }

    #[test]
    fn display_puts_top_row_first() {
        let glyph = Glyph::new([0b01, 0b10], 2);
        let rendered = glyph.display(2).to_string();
        assert_eq!(rendered, " 1 □■\n 0 ■□\n");
    }
}
