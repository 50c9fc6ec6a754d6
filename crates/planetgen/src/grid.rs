/// Square row-major scalar grid.
///
/// The x axis wraps (the grid is a cylinder), the y axis clamps. Every
/// stage of the pipeline reads and writes through this topology.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    size: usize,
    data: Vec<f32>,
}

impl Grid {
    pub fn new(size: usize, fill: f32) -> Self {
        Self {
            size,
            data: vec![fill; size * size],
        }
    }

    pub fn from_fn(size: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(size * size);
        for y in 0..size {
            for x in 0..size {
                data.push(f(x, y));
            }
        }
        Self { size, data }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.size + x
    }

    #[inline]
    pub fn coords(&self, index: usize) -> (usize, usize) {
        (index % self.size, index / self.size)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.size + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        self.data[y * self.size + x] = value;
    }

    /// Reads with x wrapped and y clamped, for signed neighbour offsets.
    #[inline]
    pub fn get_wrapped(&self, x: i64, y: i64) -> f32 {
        let n = self.size as i64;
        let wx = x.rem_euclid(n) as usize;
        let cy = y.clamp(0, n - 1) as usize;
        self.data[cy * self.size + wx]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Indices of the 4-neighbourhood of a cell; the x neighbours wrap,
    /// cells on the top and bottom rows simply have fewer neighbours.
    pub fn neighbors4(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        let (x, y) = self.coords(index);
        let n = self.size;
        let left = if x == 0 { n - 1 } else { x - 1 };
        let right = if x + 1 == n { 0 } else { x + 1 };
        [
            Some(self.index(left, y)),
            Some(self.index(right, y)),
            (y > 0).then(|| self.index(x, y - 1)),
            (y + 1 < n).then(|| self.index(x, y + 1)),
        ]
        .into_iter()
        .flatten()
    }

    /// Bilinear sample at fractional grid coordinates.
    pub fn sample(&self, fx: f32, fy: f32) -> f32 {
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let v00 = self.get_wrapped(x0, y0);
        let v10 = self.get_wrapped(x0 + 1, y0);
        let v01 = self.get_wrapped(x0, y0 + 1);
        let v11 = self.get_wrapped(x0 + 1, y0 + 1);

        v00 * (1.0 - tx) * (1.0 - ty) + v10 * tx * (1.0 - ty) + v01 * (1.0 - tx) * ty + v11 * tx * ty
    }

    /// Bilinear sample at `u, v ∈ [0, 1]`.
    pub fn sample_uv(&self, u: f32, v: f32) -> f32 {
        let scale = (self.size - 1) as f32;
        self.sample(u.clamp(0.0, 1.0) * scale, v.clamp(0.0, 1.0) * scale)
    }

    pub fn min_max(&self) -> (f32, f32) {
        self.data
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }

    /// Rescales values into `[0, 1]`. A flat grid becomes all zeros.
    pub fn normalize(&mut self) {
        let (lo, hi) = self.min_max();
        let range = hi - lo;
        if !range.is_finite() || range <= f32::EPSILON {
            self.data.fill(0.0);
            return;
        }
        for v in &mut self.data {
            *v = (*v - lo) / range;
        }
    }

    /// Replaces non-finite values with `fallback` and clamps into `[lo, hi]`.
    /// Returns how many cells were not finite.
    pub fn sanitize(&mut self, lo: f32, hi: f32, fallback: f32) -> usize {
        let mut fixed = 0;
        for v in &mut self.data {
            if !v.is_finite() {
                *v = fallback;
                fixed += 1;
            }
            *v = v.clamp(lo, hi);
        }
        fixed
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ramp(size: usize) -> Grid {
        Grid::from_fn(size, |x, y| (x + y * size) as f32)
    }

    #[rstest]
    #[case(-1, 0, 3.0)]
    #[case(4, 0, 0.0)]
    #[case(0, -5, 0.0)]
    #[case(1, 9, 13.0)]
    fn wrapped_reads(#[case] x: i64, #[case] y: i64, #[case] expected: f32) {
        assert_eq!(ramp(4).get_wrapped(x, y), expected);
    }

    #[test]
    fn neighbors_wrap_horizontally_only() {
        let grid = Grid::new(4, 0.0);
        let mut corner: Vec<usize> = grid.neighbors4(grid.index(0, 0)).collect();
        corner.sort();
        assert_eq!(corner, vec![1, 3, 4]);

        let mut inner: Vec<usize> = grid.neighbors4(grid.index(1, 1)).collect();
        inner.sort();
        assert_eq!(inner, vec![1, 4, 6, 9]);
    }

    #[test]
    fn bilinear_sample_interpolates() {
        let grid = ramp(4);
        assert!((grid.sample(0.5, 0.0) - 0.5).abs() < 1e-6);
        assert!((grid.sample(1.0, 1.5) - 7.0).abs() < 1e-6);
        assert!((grid.sample_uv(1.0, 1.0) - 15.0).abs() < 1e-6);
    }

    #[test]
    fn normalize_maps_to_unit_range() {
        let mut grid = ramp(4);
        grid.normalize();
        assert_eq!(grid.min_max(), (0.0, 1.0));

        let mut flat = Grid::new(4, 3.0);
        flat.normalize();
        assert_eq!(flat.min_max(), (0.0, 0.0));
    }

    #[test]
    fn sanitize_replaces_non_finite() {
        let mut grid = Grid::new(2, 0.5);
        grid.set(0, 0, f32::NAN);
        grid.set(1, 1, 7.0);
        assert_eq!(grid.sanitize(0.0, 1.0, 0.25), 1);
        assert_eq!(grid.get(0, 0), 0.25);
        assert_eq!(grid.get(1, 1), 1.0);
        assert!(grid.is_finite());
    }
}
