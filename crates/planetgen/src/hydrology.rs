//! Priority-Flood drainage (Barnes et al. 2014) with single-neighbour flow
//! accumulation.
//!
//! The top and bottom rows and every cell at or below sea level act as
//! outlets. Flooding inward from them yields a depression-filled surface in
//! which every cell drains along a path of non-increasing filled height.
//! Flow is then routed to one already-flooded neighbour per cell, so the
//! drainage graph cannot contain cycles.

use crate::config::HydrologyConfig;
use crate::constants::*;
use crate::grid::Grid;
use log::debug;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Clone, Copy, Debug)]
struct HeapItem {
    height: f32,
    idx: usize,
}

impl PartialEq for HeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapItem {}

impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed so `BinaryHeap` pops the lowest height first; ties go to the
// lower index to keep the flood order deterministic.
impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .height
            .total_cmp(&self.height)
            .then_with(|| other.idx.cmp(&self.idx))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrainageCell {
    pub filled_height: f32,
    /// Neighbour this cell drains into; `None` for outlets.
    pub flow_target: Option<usize>,
    /// Number of cells draining through this one, itself included.
    pub accumulated_flow: f32,
}

#[derive(Debug, Clone)]
pub struct Drainage {
    pub cells: Vec<DrainageCell>,
    /// Cell indices in the order the flood popped them.
    pub order: Vec<usize>,
}

impl Drainage {
    /// Flood, route and accumulate over `height`.
    pub fn compute(height: &Grid, sea_level: f32) -> Self {
        let (filled, is_outlet, order) = priority_flood(height, sea_level);

        let mut rank = vec![0usize; height.len()];
        for (r, &idx) in order.iter().enumerate() {
            rank[idx] = r;
        }

        let mut cells: Vec<DrainageCell> = (0..height.len())
            .map(|idx| DrainageCell {
                filled_height: filled[idx],
                flow_target: if is_outlet[idx] {
                    None
                } else {
                    height
                        .neighbors4(idx)
                        .filter(|&n| rank[n] < rank[idx])
                        .min_by(|&a, &b| filled[a].total_cmp(&filled[b]).then_with(|| rank[a].cmp(&rank[b])))
                },
                accumulated_flow: 1.0,
            })
            .collect();

        // Targets were flooded earlier, so walking the flood order backwards
        // finishes every cell before its target.
        for &idx in order.iter().rev() {
            if let Some(target) = cells[idx].flow_target {
                let flow = cells[idx].accumulated_flow;
                cells[target].accumulated_flow += flow;
            }
        }

        Self { cells, order }
    }

    pub fn max_flow(&self) -> f32 {
        self.cells.iter().map(|c| c.accumulated_flow).fold(0.0, f32::max)
    }

    /// Number of flow steps from `start` to an outlet, or `None` if the walk
    /// exceeds the cell count (which would mean a cycle).
    pub fn path_length(&self, start: usize) -> Option<usize> {
        let mut current = start;
        for steps in 0..=self.cells.len() {
            match self.cells[current].flow_target {
                None => return Some(steps),
                Some(next) => current = next,
            }
        }
        None
    }
}

/// Returns filled heights, the outlet mask and the pop order.
fn priority_flood(height: &Grid, sea_level: f32) -> (Vec<f32>, Vec<bool>, Vec<usize>) {
    let size = height.size();
    let total = height.len();
    let heights = height.as_slice();

    let mut filled = heights.to_vec();
    let mut visited = vec![false; total];
    let mut is_outlet = vec![false; total];
    let mut order = Vec::with_capacity(total);
    let mut heap = BinaryHeap::with_capacity(total);

    for idx in 0..total {
        let (_, y) = height.coords(idx);
        if y == 0 || y + 1 == size || heights[idx] <= sea_level {
            visited[idx] = true;
            is_outlet[idx] = true;
            heap.push(HeapItem { height: heights[idx], idx });
        }
    }

    while let Some(HeapItem { height: h_cur, idx }) = heap.pop() {
        order.push(idx);
        for n in height.neighbors4(idx) {
            if visited[n] {
                continue;
            }
            visited[n] = true;
            let new_h = heights[n].max(h_cur);
            filled[n] = new_h;
            heap.push(HeapItem { height: new_h, idx: n });
        }
    }

    (filled, is_outlet, order)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HydrologyStats {
    pub ocean_cells: usize,
    pub lake_cells: usize,
    pub river_cells: usize,
}

/// Water layers produced alongside the carved height field.
pub struct WaterLayers {
    /// Lake/river/ocean coverage in `[0, 1]`.
    pub intensity: Grid,
    /// Level of the water body at each cell; the terrain height on dry land.
    pub surface: Grid,
    pub stats: HydrologyStats,
}

/// Classifies water and carves channels into `height` in place.
pub fn resolve(height: &mut Grid, config: &HydrologyConfig) -> WaterLayers {
    let size = height.size();
    let sea_level = config.sea_level;
    let drainage = Drainage::compute(height, sea_level);
    let max_flow = drainage.max_flow().max(1.0);

    let mut intensity = Grid::new(size, 0.0);
    let mut surface = Grid::new(size, 0.0);
    let mut stats = HydrologyStats::default();

    for (idx, cell) in drainage.cells.iter().enumerate() {
        let (x, y) = height.coords(idx);
        let h = height.get(x, y);

        let ocean: f32 = if cell.filled_height <= sea_level { 1.0 } else { 0.0 };

        let depth = cell.filled_height - h;
        let lake = if depth > config.lake_threshold {
            (depth / (config.lake_threshold * LAKE_FULL_DEPTH)).min(1.0)
        } else {
            0.0
        };

        let normalized_flow = cell.accumulated_flow / max_flow;
        let river = if normalized_flow > RIVER_FLOW_THRESHOLD {
            normalized_flow.powf(RIVER_FLOW_EXPONENT)
        } else {
            0.0
        };

        if ocean > 0.0 {
            stats.ocean_cells += 1;
        } else if lake > 0.0 {
            stats.lake_cells += 1;
        } else if river > 0.0 {
            stats.river_cells += 1;
        }

        let water = ocean.max(lake).max(river).clamp(0.0, 1.0);
        let level = if water > 0.0 { cell.filled_height.max(sea_level) } else { h };

        intensity.set(x, y, water);
        surface.set(x, y, level);
        height.set(x, y, (h - config.river_depth_scale * water).clamp(0.0, 1.0));
    }

    debug!(
        "Hydrology: {} ocean, {} lake, {} river cells (max flow {max_flow})",
        stats.ocean_cells, stats.lake_cells, stats.river_cells
    );

    WaterLayers {
        intensity,
        surface,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hydrology_config() -> HydrologyConfig {
        HydrologyConfig {
            sea_level: 0.1,
            river_depth_scale: 0.05,
            lake_threshold: 0.01,
            water_threshold: 0.3,
        }
    }

    /// Bowl around (8, 8) on a slope draining to the top row.
    fn basin(size: usize) -> Grid {
        Grid::from_fn(size, |x, y| {
            let slope = 0.2 + 0.6 * y as f32 / size as f32;
            let dx = x as f32 - 8.0;
            let dy = y as f32 - 8.0;
            if dx * dx + dy * dy < 6.0 { slope - 0.2 } else { slope }
        })
    }

    #[test]
    fn heap_pops_lowest_first() {
        let mut heap = BinaryHeap::new();
        for (height, idx) in [(0.5, 0), (0.1, 1), (0.3, 2), (0.1, 3)] {
            heap.push(HeapItem { height, idx });
        }
        let popped: Vec<usize> = std::iter::from_fn(|| heap.pop().map(|i| i.idx)).collect();
        assert_eq!(popped, vec![1, 3, 2, 0]);
    }

    #[test]
    fn depression_fills_to_spill_height() {
        let mut grid = Grid::new(8, 0.5);
        grid.set(4, 4, 0.2);
        let drainage = Drainage::compute(&grid, 0.0);
        assert!((drainage.cells[grid.index(4, 4)].filled_height - 0.5).abs() < 1e-6);
    }

    #[test]
    fn every_cell_is_flooded_once() {
        let grid = basin(24);
        let drainage = Drainage::compute(&grid, 0.1);
        let mut seen = vec![0; grid.len()];
        for &idx in &drainage.order {
            seen[idx] += 1;
        }
        assert!(seen.iter().all(|&n| n == 1));
    }

    #[test]
    fn flow_graph_is_acyclic_and_monotone() {
        let grid = basin(24);
        let drainage = Drainage::compute(&grid, 0.1);
        for idx in 0..grid.len() {
            assert!(drainage.path_length(idx).is_some(), "cell {idx} never reaches an outlet");
            if let Some(target) = drainage.cells[idx].flow_target {
                assert!(drainage.cells[target].filled_height <= drainage.cells[idx].filled_height);
            }
        }
    }

    #[test]
    fn accumulated_flow_counts_all_cells() {
        let grid = basin(16);
        let drainage = Drainage::compute(&grid, 0.0);
        let at_outlets: f32 = drainage
            .cells
            .iter()
            .filter(|c| c.flow_target.is_none())
            .map(|c| c.accumulated_flow)
            .sum();
        assert_eq!(at_outlets, grid.len() as f32);
    }

    #[test]
    fn basin_becomes_lake_and_water_is_bounded() {
        let mut grid = basin(24);
        let original = grid.clone();
        let layers = resolve(&mut grid, &hydrology_config());

        assert!(layers.stats.lake_cells > 0);
        assert!(layers.intensity.as_slice().iter().all(|&w| (0.0..=1.0).contains(&w)));
        assert_eq!(layers.intensity.get(8, 8), 1.0);
        assert!(layers.surface.get(8, 8) > original.get(8, 8));
        assert!(grid.get(8, 8) < original.get(8, 8), "water cells are carved");
    }

    #[test]
    fn cells_below_sea_level_are_ocean() {
        let mut grid = Grid::from_fn(16, |x, _| if x < 4 { 0.05 } else { 0.6 });
        let config = hydrology_config();
        let layers = resolve(&mut grid, &config);
        assert_eq!(layers.intensity.get(1, 8), 1.0);
        assert_eq!(layers.surface.get(1, 8), config.sea_level);
        assert_eq!(layers.stats.ocean_cells, 4 * 16);
    }

    #[test]
    fn dry_land_keeps_its_height() {
        let mut grid = basin(24);
        let original = grid.clone();
        let mut config = hydrology_config();
        config.sea_level = 0.0;
        let layers = resolve(&mut grid, &config);
        for idx in 0..grid.len() {
            let (x, y) = grid.coords(idx);
            if layers.intensity.get(x, y) == 0.0 {
                assert_eq!(grid.get(x, y), original.get(x, y));
                assert_eq!(layers.surface.get(x, y), original.get(x, y));
            }
        }
    }
}
