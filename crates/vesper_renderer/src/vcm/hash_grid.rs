//! Uniform hash grid for range queries around camera vertices.
//!
//! Cells are twice the search radius wide, so a query sphere overlaps at
//! most the 2x2x2 block of cells nearest to its center.

use vesper_math::{Aabb, IVec3, Vec3};

/// Spatial index over a fixed set of points.
#[derive(Clone, Debug)]
pub struct HashGrid {
    bbox_min: Vec3,
    inv_cell_size: f32,
    radius_sqr: f32,
    /// Point indices sorted by cell
    indices: Vec<u32>,
    /// Exclusive end of each cell's range in `indices`
    cell_ends: Vec<u32>,
}

impl HashGrid {
    /// Build a grid over `positions` for queries of the given radius.
    pub fn build(positions: &[Vec3], radius: f32) -> Self {
        let bounds = positions
            .iter()
            .fold(Aabb::EMPTY, |bbox, &p| bbox.include_point(p));
        let bbox_min = if positions.is_empty() { Vec3::ZERO } else { bounds.min() };

        let cell_size = radius * 2.0;
        let mut grid = Self {
            bbox_min,
            inv_cell_size: 1.0 / cell_size,
            radius_sqr: radius * radius,
            indices: vec![0; positions.len()],
            cell_ends: vec![0; positions.len().max(1)],
        };

        // Counting sort of points into cells
        let cells: Vec<usize> = positions.iter().map(|&p| grid.cell_index_of(p)).collect();
        for &cell in &cells {
            grid.cell_ends[cell] += 1;
        }
        let mut sum = 0;
        for end in grid.cell_ends.iter_mut() {
            let count = *end;
            *end = sum;
            sum += count;
        }
        // cell_ends now holds range starts; filling advances them to ends
        for (i, &cell) in cells.iter().enumerate() {
            let slot = grid.cell_ends[cell];
            grid.indices[slot as usize] = i as u32;
            grid.cell_ends[cell] += 1;
        }

        log::debug!(
            "Built hash grid over {} points, radius {:.5}",
            positions.len(),
            radius
        );
        grid
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Call `visit` with the index of every point within the radius of
    /// `query`. `positions` must be the slice the grid was built from.
    pub fn for_each_in_radius(&self, positions: &[Vec3], query: Vec3, mut visit: impl FnMut(usize)) {
        if self.indices.is_empty() {
            return;
        }

        let dist_min = query - self.bbox_min;
        // Outside the point bounds by more than the radius
        if dist_min.min_element() < -self.cell_size() {
            return;
        }

        let cell_pt = dist_min * self.inv_cell_size;
        let coord_f = cell_pt.floor();
        let frac = cell_pt - coord_f;
        let base = IVec3::new(
            coord_f.x as i32 - (frac.x < 0.5) as i32,
            coord_f.y as i32 - (frac.y < 0.5) as i32,
            coord_f.z as i32 - (frac.z < 0.5) as i32,
        );

        let mut visited = [usize::MAX; 8];
        for j in 0..8 {
            let coord = base + IVec3::new((j & 1) as i32, ((j >> 1) & 1) as i32, ((j >> 2) & 1) as i32);
            let cell = self.cell_index(coord);
            // Several coordinates may hash to the same cell
            if visited[..j].contains(&cell) {
                continue;
            }
            visited[j] = cell;

            let (start, end) = self.cell_range(cell);
            for &index in &self.indices[start..end] {
                let index = index as usize;
                if positions[index].distance_squared(query) <= self.radius_sqr {
                    visit(index);
                }
            }
        }
    }

    fn cell_size(&self) -> f32 {
        1.0 / self.inv_cell_size
    }

    fn cell_range(&self, cell: usize) -> (usize, usize) {
        let start = if cell == 0 { 0 } else { self.cell_ends[cell - 1] };
        (start as usize, self.cell_ends[cell] as usize)
    }

    fn cell_index_of(&self, p: Vec3) -> usize {
        let coord = ((p - self.bbox_min) * self.inv_cell_size).floor();
        self.cell_index(IVec3::new(coord.x as i32, coord.y as i32, coord.z as i32))
    }

    /// Optimized Spatial Hashing for Collision Detection of Deformable Objects
    fn cell_index(&self, coord: IVec3) -> usize {
        let x = coord.x as u32;
        let y = coord.y as u32;
        let z = coord.z as u32;
        let hash = x.wrapping_mul(73_856_093) ^ y.wrapping_mul(19_349_663) ^ z.wrapping_mul(83_492_791);
        hash as usize % self.cell_ends.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_points(n: usize, seed: u64) -> Vec<Vec3> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| Vec3::new(rng.gen(), rng.gen(), rng.gen()) * 2.0 - Vec3::ONE)
            .collect()
    }

    #[test]
    fn test_query_matches_brute_force() {
        let points = random_points(2000, 42);
        let radius = 0.1;
        let grid = HashGrid::build(&points, radius);
        assert_eq!(grid.len(), 2000);

        let queries = random_points(100, 7);
        for &q in &queries {
            let mut found = Vec::new();
            grid.for_each_in_radius(&points, q, |i| found.push(i));
            found.sort_unstable();

            let expected: Vec<usize> = (0..points.len())
                .filter(|&i| points[i].distance_squared(q) <= radius * radius)
                .collect();
            assert_eq!(found, expected);
        }
    }

    #[test]
    fn test_empty_grid() {
        let grid = HashGrid::build(&[], 0.5);
        assert!(grid.is_empty());
        let mut hits = 0;
        grid.for_each_in_radius(&[], Vec3::ZERO, |_| hits += 1);
        assert_eq!(hits, 0);
    }

    #[test]
    fn test_far_query_finds_nothing() {
        let points = random_points(50, 3);
        let grid = HashGrid::build(&points, 0.05);
        let mut hits = 0;
        grid.for_each_in_radius(&points, Vec3::splat(-10.0), |_| hits += 1);
        assert_eq!(hits, 0);
    }

    #[test]
    fn test_each_point_reported_once() {
        // Coincident points in a single cell
        let points = vec![Vec3::splat(0.25); 5];
        let grid = HashGrid::build(&points, 0.5);
        let mut found = Vec::new();
        grid.for_each_in_radius(&points, Vec3::splat(0.3), |i| found.push(i));
        found.sort_unstable();
        assert_eq!(found, vec![0, 1, 2, 3, 4]);
    }
}
