//! Box blur utilities for the height grid.

use crate::grid::Grid;

/// Apply a single 3x3 box blur pass. Columns wrap; rows past the top or
/// bottom edge reuse the edge row. Reads `field`, writes `out`.
pub fn blur_pass(field: &Grid, out: &mut Grid) {
    let size = field.size();
    for y in 0..size {
        for x in 0..size {
            let mut sum = 0.0;
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    sum += field.get_wrapped(x as i64 + dx, y as i64 + dy);
                }
            }
            out.set(x, y, sum / 9.0);
        }
    }
}

/// Run `passes` blur passes in place, ping-ponging through one scratch grid.
pub fn smooth(field: &mut Grid, passes: usize) {
    if passes == 0 {
        return;
    }
    let mut scratch = Grid::new(field.size(), 0.0);
    for _ in 0..passes {
        blur_pass(field, &mut scratch);
        std::mem::swap(field, &mut scratch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn constant_field_is_unchanged() {
        let mut field = Grid::new(8, 0.4);
        smooth(&mut field, 3);
        assert!(field.as_slice().iter().all(|&v| (v - 0.4).abs() < 1e-6));
    }

    #[test]
    fn spike_spreads_to_wrapped_neighbours() {
        let mut field = Grid::new(8, 0.0);
        field.set(0, 4, 9.0);
        smooth(&mut field, 1);
        assert!((field.get(0, 4) - 1.0).abs() < 1e-6);
        assert!((field.get(7, 4) - 1.0).abs() < 1e-6);
        assert!((field.get(1, 5) - 1.0).abs() < 1e-6);
        assert_eq!(field.get(2, 4), 0.0);
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(5)]
    fn passes_reduce_variation(#[case] passes: usize) {
        let mut field = Grid::from_fn(16, |x, y| ((x * 7 + y * 13) % 5) as f32);
        let (lo0, hi0) = field.min_max();
        smooth(&mut field, passes);
        let (lo, hi) = field.min_max();
        assert!(hi - lo < hi0 - lo0);
    }

    #[test]
    fn result_does_not_depend_on_scan_order() {
        // a symmetric input must stay symmetric under x mirroring
        let mut field = Grid::from_fn(8, |x, y| if x == 3 || x == 4 { y as f32 } else { 0.0 });
        smooth(&mut field, 2);
        for y in 0..8 {
            for x in 0..8 {
                let mirrored = (7 + 8 - x) % 8;
                assert!((field.get(x, y) - field.get(mirrored, y)).abs() < 1e-5);
            }
        }
    }
}
