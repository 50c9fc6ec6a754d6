use crate::constants::*;
use crate::planet::PlanetSurface;
use crate::sampler::sanitize_direction;
use glam::Vec3;
use log::{debug, warn};
use std::collections::HashMap;

/// Raw mesh data that can be used by any rendering engine
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    /// Water intensity per vertex, `[0, 1]`.
    pub water: Vec<f32>,
    /// Polar ice coverage per vertex, `[0, 1]`.
    pub ice: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Build the displaced planet mesh from a finished surface.
    ///
    /// An icosahedron is subdivided face by face, the resulting triangle soup
    /// is welded, and every vertex is pushed out to
    /// `base_radius + (height - sea_level) * height_scale`.
    pub fn from_surface(surface: &PlanetSurface) -> Self {
        let config = surface.config();
        let level = config.mesh.subdivision_level;

        let soup = subdivided_icosahedron(level);
        let (unit_positions, indices) = weld_vertices(&soup, WELD_TOLERANCE);
        debug!(
            "Welded icosphere level {level}: {} -> {} vertices",
            soup.len(),
            unit_positions.len()
        );

        let base_radius = config.mesh.base_radius;
        let ice_threshold = config.mesh.ice_cap_latitude_threshold;
        let water_threshold = config.hydrology.water_threshold;

        let mut positions = Vec::with_capacity(unit_positions.len());
        let mut water = Vec::with_capacity(unit_positions.len());
        let mut ice = Vec::with_capacity(unit_positions.len());
        let mut repaired = 0usize;

        for p in &unit_positions {
            let dir = sanitize_direction(*p);
            let sample = surface.water_at(dir);

            let mut pos = dir * surface.radius_at(dir);
            if !pos.is_finite() {
                pos = dir * base_radius;
                repaired += 1;
            }

            positions.push(pos);
            water.push(sample.water_intensity);
            ice.push(if sample.water_intensity > water_threshold {
                0.0
            } else {
                ice_coverage(dir, ice_threshold)
            });
        }

        if repaired > 0 {
            warn!("Replaced {repaired} non-finite vertex positions");
        }

        let normals = smooth_normals(&positions, &indices);

        MeshData {
            positions: positions.iter().map(|p| p.to_array()).collect(),
            normals: normals.iter().map(|n| n.to_array()).collect(),
            water,
            ice,
            indices,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// True when no position, normal or attribute is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.positions.iter().flatten().all(|v| v.is_finite())
            && self.normals.iter().flatten().all(|v| v.is_finite())
            && self.water.iter().all(|v| v.is_finite())
            && self.ice.iter().all(|v| v.is_finite())
    }

    pub fn water_vertex_count(&self, threshold: f32) -> usize {
        self.water.iter().filter(|&&w| w > threshold).count()
    }

    /// Dry vertices that are not covered by ice.
    pub fn land_vertex_count(&self, threshold: f32) -> usize {
        self.water
            .iter()
            .zip(&self.ice)
            .filter(|&(&w, &i)| w <= threshold && i < 0.5)
            .count()
    }
}

/// Vertex count of a welded icosphere after `level` midpoint subdivisions.
pub fn icosphere_vertex_count(level: u32) -> usize {
    10 * 4usize.pow(level) + 2
}

/// Ice ramps in over `ICE_RAMP` below the latitude threshold.
fn ice_coverage(dir: Vec3, threshold: f32) -> f32 {
    ((dir.y.abs() - (threshold - ICE_RAMP)) / ICE_RAMP).clamp(0.0, 1.0)
}

const ICOSAHEDRON_FACES: [[usize; 3]; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

fn icosahedron_vertices() -> [Vec3; 12] {
    let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
    [
        Vec3::new(-1.0, t, 0.0),
        Vec3::new(1.0, t, 0.0),
        Vec3::new(-1.0, -t, 0.0),
        Vec3::new(1.0, -t, 0.0),
        Vec3::new(0.0, -1.0, t),
        Vec3::new(0.0, 1.0, t),
        Vec3::new(0.0, -1.0, -t),
        Vec3::new(0.0, 1.0, -t),
        Vec3::new(t, 0.0, -1.0),
        Vec3::new(t, 0.0, 1.0),
        Vec3::new(-t, 0.0, -1.0),
        Vec3::new(-t, 0.0, 1.0),
    ]
    .map(Vec3::normalize)
}

/// Subdivides every icosahedron face independently and returns an unindexed
/// triangle list on the unit sphere (three vertices per triangle, shared
/// corners duplicated).
pub fn subdivided_icosahedron(level: u32) -> Vec<Vec3> {
    let base = icosahedron_vertices();
    let mut soup = Vec::with_capacity(60 * 4usize.pow(level));
    for [a, b, c] in ICOSAHEDRON_FACES {
        subdivide(base[a], base[b], base[c], level, &mut soup);
    }
    soup
}

fn subdivide(a: Vec3, b: Vec3, c: Vec3, level: u32, out: &mut Vec<Vec3>) {
    if level == 0 {
        out.extend_from_slice(&[a, b, c]);
        return;
    }
    let ab = ((a + b) * 0.5).normalize();
    let bc = ((b + c) * 0.5).normalize();
    let ca = ((c + a) * 0.5).normalize();
    subdivide(a, ab, ca, level - 1, out);
    subdivide(b, bc, ab, level - 1, out);
    subdivide(c, ca, bc, level - 1, out);
    subdivide(ab, bc, ca, level - 1, out);
}

/// Merges vertices closer than `tolerance`.
///
/// Vertices are hashed into buckets of side `tolerance`; a vertex is merged
/// into the first earlier vertex found within `tolerance` in its own or an
/// adjacent bucket, and keeps that vertex's position. Returns the welded
/// positions and, for every input vertex, its index into them.
pub fn weld_vertices(positions: &[Vec3], tolerance: f32) -> (Vec<Vec3>, Vec<u32>) {
    let key = |p: Vec3| {
        let q = (p / tolerance).round();
        (q.x as i64, q.y as i64, q.z as i64)
    };

    let mut buckets: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
    let mut welded: Vec<Vec3> = Vec::new();
    let mut remap = Vec::with_capacity(positions.len());

    for &p in positions {
        let (kx, ky, kz) = key(p);
        let mut found = None;
        'search: for dz in -1..=1 {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let Some(candidates) = buckets.get(&(kx + dx, ky + dy, kz + dz)) else {
                        continue;
                    };
                    if let Some(&idx) = candidates
                        .iter()
                        .find(|&&idx| welded[idx as usize].distance(p) <= tolerance)
                    {
                        found = Some(idx);
                        break 'search;
                    }
                }
            }
        }

        let idx = found.unwrap_or_else(|| {
            let idx = welded.len() as u32;
            welded.push(p);
            buckets.entry((kx, ky, kz)).or_default().push(idx);
            idx
        });
        remap.push(idx);
    }

    (welded, remap)
}

/// Area-weighted vertex normals. Vertices with no usable faces fall back to
/// their radial direction.
pub fn smooth_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut accum = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let n = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        if !n.is_finite() {
            continue;
        }
        accum[a] += n;
        accum[b] += n;
        accum[c] += n;
    }
    accum
        .iter()
        .zip(positions)
        .map(|(n, p)| n.try_normalize().unwrap_or_else(|| sanitize_direction(*p)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 12)]
    #[case(1, 42)]
    #[case(2, 162)]
    #[case(3, 642)]
    #[case(5, 10242)]
    fn welded_count_matches_formula(#[case] level: u32, #[case] expected: usize) {
        let soup = subdivided_icosahedron(level);
        assert_eq!(soup.len(), 60 * 4usize.pow(level));
        let (welded, remap) = weld_vertices(&soup, WELD_TOLERANCE);
        assert_eq!(welded.len(), expected);
        assert_eq!(icosphere_vertex_count(level), expected);
        assert_eq!(remap.len(), soup.len());
    }

    #[test]
    fn welded_vertices_stay_within_tolerance() {
        let soup = subdivided_icosahedron(2);
        let (welded, remap) = weld_vertices(&soup, WELD_TOLERANCE);
        for (p, &idx) in soup.iter().zip(&remap) {
            assert!(welded[idx as usize].distance(*p) <= WELD_TOLERANCE);
        }
    }

    #[test]
    fn weld_merges_near_duplicates() {
        let points = [Vec3::X, Vec3::X + Vec3::splat(1e-6), Vec3::Y, Vec3::X * 1.1];
        let (welded, remap) = weld_vertices(&points, 1e-5);
        assert_eq!(welded.len(), 3);
        assert_eq!(remap, vec![0, 0, 1, 2]);
    }

    #[test]
    fn faces_wind_outward() {
        let soup = subdivided_icosahedron(1);
        for tri in soup.chunks_exact(3) {
            let n = (tri[1] - tri[0]).cross(tri[2] - tri[0]);
            let center = (tri[0] + tri[1] + tri[2]) / 3.0;
            assert!(n.dot(center) > 0.0);
        }
    }

    #[test]
    fn sphere_normals_are_radial() {
        let soup = subdivided_icosahedron(3);
        let (positions, indices) = weld_vertices(&soup, WELD_TOLERANCE);
        let normals = smooth_normals(&positions, &indices);
        for (n, p) in normals.iter().zip(&positions) {
            assert!(n.dot(*p) > 0.99);
        }
    }

    #[test]
    fn isolated_vertex_falls_back_to_direction() {
        let positions = [Vec3::new(0.0, 2.0, 0.0)];
        let normals = smooth_normals(&positions, &[]);
        assert_eq!(normals[0], Vec3::Y);
    }

    #[rstest]
    #[case(0.0, 0.9, 0.0)]
    #[case(1.0, 0.9, 1.0)]
    #[case(0.88, 0.9, 0.5)]
    fn ice_ramps_near_pole(#[case] y: f32, #[case] threshold: f32, #[case] expected: f32) {
        let dir = Vec3::new((1.0 - y * y).sqrt(), y, 0.0);
        assert!((ice_coverage(dir, threshold) - expected).abs() < 1e-4);
    }
}
