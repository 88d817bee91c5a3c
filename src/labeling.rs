//! Connected-component labeling of fluid-filled cells,
//! and extraction of the individual regions ("blobs") found.

use fixedbitset as fb;

use crate::grid::{GridError, HexGrid};

/// Region labels for the cells of a grid whose scalar value
/// falls within a threshold range.
///
/// Produced by [`label_regions`]. Labels are contiguous from 0;
/// every thresholded cell carries exactly one label
/// and cells outside the range carry none.
#[derive(Clone, Debug)]
pub struct Labeling {
    /// Region id per grid cell, `None` outside the threshold range.
    region_of: Vec<Option<u32>>,
    region_count: usize,
}

impl Labeling {
    /// Get the number of distinct regions found.
    #[inline]
    pub fn region_count(&self) -> usize {
        self.region_count
    }

    /// Get the region id of a cell, or `None` if the cell
    /// was outside the threshold range.
    #[inline]
    pub fn region_of(&self, cell: usize) -> Option<u32> {
        self.region_of[cell]
    }

    /// Extract the subset of cells labeled with the given region id.
    ///
    /// Pure with respect to the labeling: repeated extraction
    /// of the same region yields an identical subset.
    pub fn blob(&self, region: u32) -> Blob {
        let mut cells = fb::FixedBitSet::with_capacity(self.region_of.len());
        for (cell, label) in self.region_of.iter().enumerate() {
            if *label == Some(region) {
                cells.insert(cell);
            }
        }
        Blob { region, cells }
    }

    /// Iterate over all regions as [`Blob`]s, in ascending region id order.
    pub fn blobs(&self) -> impl Iterator<Item = Blob> + '_ {
        (0..self.region_count as u32).map(|region| self.blob(region))
    }
}

/// The set of cells belonging to one connected fluid region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    region: u32,
    /// Cell indices into the full grid.
    cells: fb::FixedBitSet,
}

impl Blob {
    /// Get the region id this blob was extracted for.
    #[inline]
    pub fn region_id(&self) -> u32 {
        self.region
    }

    /// Iterate over the grid cell indices in this blob, in ascending order.
    #[inline]
    pub fn cells(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells.ones()
    }

    /// Get the number of cells in this blob.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.count_ones(..)
    }

    /// Check if the blob contains no cells.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check whether a grid cell belongs to this blob.
    #[inline]
    pub fn contains(&self, cell: usize) -> bool {
        self.cells.contains(cell)
    }
}

/// Threshold a per-cell scalar field to the inclusive range `[lo, hi]`
/// and assign a region id to each connected group of cells that passes.
///
/// Two cells are connected if they share at least one corner point
/// (26-connectivity on a structured grid,
/// matching the point-shared connectivity of the mesh).
///
/// An empty thresholded subset yields zero regions, not an error.
pub fn label_regions(
    grid: &HexGrid,
    field: &str,
    (lo, hi): (f64, f64),
) -> Result<Labeling, GridError> {
    let values = grid.cell_scalar(field)?;
    let in_range = |cell: usize| values[cell] >= lo && values[cell] <= hi;

    let mut region_of: Vec<Option<u32>> = vec![None; grid.cell_count()];
    let mut region_count = 0u32;
    // reused BFS frontier; region_of doubles as the visited set
    let mut frontier: Vec<usize> = Vec::new();

    for seed in 0..grid.cell_count() {
        if region_of[seed].is_some() || !in_range(seed) {
            continue;
        }
        let region = region_count;
        region_count += 1;

        region_of[seed] = Some(region);
        frontier.push(seed);
        while let Some(cell) = frontier.pop() {
            for neighbor in grid.cell_point_neighbors(cell) {
                if region_of[neighbor].is_none() && in_range(neighbor) {
                    region_of[neighbor] = Some(region);
                    frontier.push(neighbor);
                }
            }
        }
    }

    Ok(Labeling {
        region_of,
        region_count: region_count as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{filled_cube_grid, two_blob_grid};
    use crate::Vec3;

    #[test]
    fn separated_slabs_get_two_regions() {
        let grid = two_blob_grid();
        let labeling = label_regions(&grid, "VOF", (1.0, 1.0)).unwrap();
        assert_eq!(labeling.region_count(), 2);

        // labels partition the thresholded cells exactly
        let vof = grid.cell_scalar("VOF").unwrap();
        for cell in 0..grid.cell_count() {
            match labeling.region_of(cell) {
                Some(region) => {
                    assert_eq!(vof[cell], 1.0);
                    assert!((region as usize) < labeling.region_count());
                }
                None => assert_eq!(vof[cell], 0.0),
            }
        }

        // region 0 is the one seeded at the lowest cell index
        assert_eq!(labeling.region_of(0), Some(0));

        let sizes: Vec<usize> = labeling.blobs().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![27, 27]);
    }

    #[test]
    fn extraction_is_idempotent() {
        let grid = two_blob_grid();
        let labeling = label_regions(&grid, "VOF", (1.0, 1.0)).unwrap();
        let first = labeling.blob(1);
        let again = labeling.blob(1);
        assert_eq!(first, again);
        assert!(first.cells().all(|c| labeling.region_of(c) == Some(1)));
    }

    #[test]
    fn empty_threshold_yields_zero_regions() {
        let mut grid = filled_cube_grid(2, Vec3::zeros());
        grid.set_cell_scalar("VOF", vec![0.0; grid.cell_count()])
            .unwrap();
        let labeling = label_regions(&grid, "VOF", (1.0, 1.0)).unwrap();
        assert_eq!(labeling.region_count(), 0);
        assert_eq!(labeling.blobs().count(), 0);
    }

    #[test]
    fn diagonal_cells_are_connected() {
        // two cells touching only at one corner point
        // belong to the same region under point-shared connectivity
        let mut grid = crate::HexGrid::new([2, 2, 1], Vec3::zeros(), Vec3::repeat(1.0));
        grid.set_cell_scalar("VOF", vec![1.0, 0.0, 0.0, 1.0]).unwrap();
        let labeling = label_regions(&grid, "VOF", (1.0, 1.0)).unwrap();
        assert_eq!(labeling.region_count(), 1);
        assert_eq!(labeling.blob(0).len(), 2);
    }

    #[test]
    fn missing_field_is_an_error() {
        let grid = crate::HexGrid::new([2, 2, 2], Vec3::zeros(), Vec3::repeat(1.0));
        assert!(label_regions(&grid, "VOF", (1.0, 1.0)).is_err());
    }
}
