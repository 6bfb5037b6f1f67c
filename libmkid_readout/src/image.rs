//! The accumulating photon-count image, one wall-clock second per slice.

use std::io::Write;
use std::path::Path;

use super::constants::{IMAGE_BYTES, XPIX, YPIX};

/// A dense XPIX x YPIX grid of photon counters, column-major (`image[x][y]`).
///
/// Cells saturate at 65535 rather than wrapping; a saturated increment sets a
/// flag so the flush path can report the slice as clipped.
#[derive(Debug, Clone)]
pub struct CountImage {
    counts: Vec<u16>,
    saturated: bool,
}

impl Default for CountImage {
    fn default() -> Self {
        Self::new()
    }
}

impl CountImage {
    pub fn new() -> Self {
        Self {
            counts: vec![0; XPIX * YPIX],
            saturated: false,
        }
    }

    /// Count one photon. Coordinates are taken modulo the detector extent,
    /// matching the board firmware which can emit x == XPIX on the seam.
    pub fn record(&mut self, xcoord: u16, ycoord: u16) {
        let idx = (xcoord as usize % XPIX) * YPIX + (ycoord as usize % YPIX);
        match self.counts[idx].checked_add(1) {
            Some(count) => self.counts[idx] = count,
            None => self.saturated = true,
        }
    }

    pub fn cell(&self, xcoord: usize, ycoord: usize) -> u16 {
        self.counts[(xcoord % XPIX) * YPIX + (ycoord % YPIX)]
    }

    /// Total photons in the slice. Equals the number of data words recorded,
    /// short of any saturated cells.
    pub fn sum(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }

    /// True once any cell has clipped at 65535 since the last clear.
    pub fn saturated(&self) -> bool {
        self.saturated
    }

    /// Zero every cell for the next accumulation second.
    pub fn clear(&mut self) {
        self.counts.fill(0);
        self.saturated = false;
    }

    /// The on-disk representation: XPIX * YPIX cells, column-major,
    /// little-endian u16. Always exactly [`IMAGE_BYTES`] bytes.
    pub fn as_le_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(IMAGE_BYTES);
        for count in &self.counts {
            bytes.extend_from_slice(&count.to_le_bytes());
        }
        bytes
    }

    /// Write the slice to disk as a raw `.img` file.
    pub fn write_to(&self, path: &Path) -> Result<(), std::io::Error> {
        let mut file = std::fs::File::create(path)?;
        file.write_all(&self.as_le_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_sums() {
        let mut image = CountImage::new();
        for _ in 0..100 {
            image.record(25, 39);
        }
        assert_eq!(image.cell(25, 39), 100);
        assert_eq!(image.sum(), 100);
        assert!(!image.saturated());
    }

    #[test]
    fn coordinates_wrap_at_extent() {
        let mut image = CountImage::new();
        image.record(XPIX as u16, 39);
        assert_eq!(image.cell(0, 39), 1);
        image.record(7, YPIX as u16);
        assert_eq!(image.cell(7, 0), 1);
    }

    #[test]
    fn saturates_instead_of_wrapping() {
        let mut image = CountImage::new();
        for _ in 0..=u16::MAX as u32 + 10 {
            image.record(0, 0);
        }
        assert_eq!(image.cell(0, 0), u16::MAX);
        assert!(image.saturated());
        image.clear();
        assert!(!image.saturated());
        assert_eq!(image.sum(), 0);
    }

    #[test]
    fn le_bytes_layout() {
        let mut image = CountImage::new();
        image.record(0, 1); // second cell of the first column
        image.record(1, 0); // first cell of the second column
        let bytes = image.as_le_bytes();
        assert_eq!(bytes.len(), IMAGE_BYTES);
        assert_eq!(u16::from_le_bytes([bytes[2], bytes[3]]), 1);
        let col1 = YPIX * 2;
        assert_eq!(u16::from_le_bytes([bytes[col1], bytes[col1 + 1]]), 1);
    }

    #[test]
    fn writes_fixed_size_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0.img");
        let image = CountImage::new();
        image.write_to(&path).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), IMAGE_BYTES as u64);
    }
}
