//! # Card Grid Tracks
//!
//! Track math for the fixed card grid: equal-size columns and rows separated
//! by a constant gap, inside a uniform page margin.
//!
//! Reading order runs top-to-bottom, but PDF space grows upward from the
//! bottom-left corner. [`row_origin_y`] is the single place where a
//! reading-order row becomes a y coordinate; everything else in the crate
//! goes through it.

/// Size of one of `count` equal tracks that share `available` space with
/// `gap` between neighbours.
///
/// `count` must be at least 1.
pub fn equal_track_size(available: f64, gap: f64, count: usize) -> f64 {
    let total_gap = if count > 1 {
        gap * (count - 1) as f64
    } else {
        0.0
    };
    (available - total_gap) / count as f64
}

/// Offset of track `index` from the start of the content box.
pub fn track_offset(index: usize, size: f64, gap: f64) -> f64 {
    index as f64 * (size + gap)
}

/// Convert a reading-order row (0 = topmost) into a bottom-up row
/// (0 = lowest on the page).
pub fn bottom_up_row(row: usize, rows: usize) -> usize {
    debug_assert!(row < rows, "row {} outside grid of {} rows", row, rows);
    rows - 1 - row
}

/// Bottom edge of the card in reading-order `row`.
///
/// Row 0 gets the largest y of the page; the last row sits on the bottom
/// margin.
pub fn row_origin_y(row: usize, rows: usize, margin: f64, card_height: f64, gap: f64) -> f64 {
    margin + track_offset(bottom_up_row(row, rows), card_height, gap)
}

/// Left edge of the card in `column`.
pub fn column_origin_x(column: usize, margin: f64, card_width: f64, gap: f64) -> f64 {
    margin + track_offset(column, card_width, gap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_tracks_fill_available_space() {
        let size = equal_track_size(300.0, 10.0, 3);
        assert!((size - 280.0 / 3.0).abs() < 1e-9);
        let total = 3.0 * size + 2.0 * 10.0;
        assert!((total - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_track_ignores_gap() {
        assert_eq!(equal_track_size(120.0, 50.0, 1), 120.0);
    }

    #[test]
    fn test_bottom_up_row_reverses_order() {
        assert_eq!(bottom_up_row(0, 3), 2);
        assert_eq!(bottom_up_row(1, 3), 1);
        assert_eq!(bottom_up_row(2, 3), 0);
        assert_eq!(bottom_up_row(0, 1), 0);
    }

    #[test]
    fn test_row_zero_is_highest() {
        let ys: Vec<f64> = (0..4)
            .map(|row| row_origin_y(row, 4, 20.0, 100.0, 5.0))
            .collect();
        assert_eq!(ys, vec![335.0, 230.0, 125.0, 20.0]);
        assert!(ys.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_column_origin() {
        assert_eq!(column_origin_x(0, 12.0, 50.0, 2.0), 12.0);
        assert_eq!(column_origin_x(2, 12.0, 50.0, 2.0), 116.0);
    }
}
