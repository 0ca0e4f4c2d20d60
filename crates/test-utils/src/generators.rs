//! Test data generators for creating synthetic rainfall-like grids.
//!
//! These generators create predictable, verifiable test data patterns
//! that can be used across the test suite.

/// Creates a grid counting up from 1 in row-major order.
///
/// A 3x3 grid is `[[1, 2, 3], [4, 5, 6], [7, 8, 9]]`, which makes sums and
/// means easy to verify by hand.
///
/// # Example
///
/// ```
/// use test_utils::create_sequence_grid;
///
/// let grid = create_sequence_grid(3, 3);
/// assert_eq!(grid, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
/// ```
pub fn create_sequence_grid(width: usize, height: usize) -> Vec<f32> {
    (1..=width * height).map(|v| v as f32).collect()
}

/// Creates a grid with precipitation-like values (mostly 0, some positive).
///
/// # Arguments
///
/// * `width` - Number of columns
/// * `height` - Number of rows
/// * `seed` - Seed value for deterministic generation
///
/// # Returns
///
/// A `Vec<f32>` with precipitation values in mm.
pub fn create_precipitation_grid(width: usize, height: usize, seed: u32) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let hash = simple_hash(col as u32, row as u32, seed);
            // Most values are 0 (dry), some are up to 50mm
            let precip = if hash % 4 == 0 {
                (hash % 5000) as f32 / 100.0
            } else {
                0.0
            };
            data.push(precip);
        }
    }
    data
}

/// Simple deterministic hash for reproducible test data.
fn simple_hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_mul(31).wrapping_add(x);
    h = h.wrapping_mul(31).wrapping_add(y);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}

/// Creates a grid filled with a constant value.
pub fn create_constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

/// Replaces the given (col, row) cells of a row-major grid with `nodata`.
pub fn with_nodata_cells(
    mut data: Vec<f32>,
    width: usize,
    cells: &[(usize, usize)],
    nodata: f32,
) -> Vec<f32> {
    for &(col, row) in cells {
        let idx = row * width + col;
        if col < width && idx < data.len() {
            data[idx] = nodata;
        }
    }
    data
}
