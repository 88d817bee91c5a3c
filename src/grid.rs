//! The structured hexahedral grid that blob analysis runs on.
//!
//! A [`HexGrid`] is a uniform axis-aligned grid of hexahedral cells
//! with named scalar fields attached per point (cell corner) and per cell.
//! Grids are constructed programmatically;
//! parsing simulation output files into one
//! is the job of an external loader (see [`GridSource`][crate::GridSource]).

use std::collections::HashMap;

use itertools::iproduct;

use crate::Vec3;

/// Name of the per-cell volume field expected by the moment computation.
///
/// Attached by the loader, or derived from the grid spacing
/// with [`HexGrid::compute_cell_volumes`].
pub const VOLUME_FIELD: &str = "volume";

/// Error in accessing or attaching grid fields.
#[derive(thiserror::Error, Debug)]
pub enum GridError {
    /// A per-point scalar field was requested but has not been attached.
    #[error("missing point field `{name}`")]
    MissingPointField {
        /// Name of the requested field.
        name: String,
    },
    /// A per-cell scalar field was requested but has not been attached.
    #[error("missing cell field `{name}`")]
    MissingCellField {
        /// Name of the requested field.
        name: String,
    },
    /// An attached scalar array does not have one value per point / per cell.
    #[error("field `{name}` has {got} values, expected {expected}")]
    FieldLengthMismatch {
        /// Name of the offending field.
        name: String,
        /// Length of the array that was given.
        got: usize,
        /// Length the grid requires.
        expected: usize,
    },
}

/// A uniform structured grid of hexahedral (box-shaped) cells.
///
/// Cells and points are identified by flat indices
/// in x-fastest, z-slowest order.
/// Each cell has 8 corner points shared with its neighbors.
#[derive(Clone, Debug)]
pub struct HexGrid {
    /// Number of cells along each axis.
    cell_dims: [usize; 3],
    /// Coordinate of the point with index 0 (the minimum corner).
    origin: Vec3,
    /// Cell edge length along each axis.
    spacing: Vec3,
    point_fields: HashMap<String, Vec<f64>>,
    cell_fields: HashMap<String, Vec<f64>>,
}

impl HexGrid {
    /// Construct a grid of `cell_dims` cells
    /// with its minimum corner at `origin`
    /// and the given cell edge lengths.
    ///
    /// # Panics
    ///
    /// Panics if any dimension is zero or any spacing component is not positive.
    pub fn new(cell_dims: [usize; 3], origin: Vec3, spacing: Vec3) -> Self {
        assert!(
            cell_dims.iter().all(|d| *d > 0),
            "Grid must have at least one cell per axis"
        );
        assert!(
            spacing.iter().all(|s| *s > 0.),
            "Grid spacing must be positive"
        );
        Self {
            cell_dims,
            origin,
            spacing,
            point_fields: HashMap::new(),
            cell_fields: HashMap::new(),
        }
    }

    /// Get the number of cells along each axis.
    #[inline]
    pub fn cell_dims(&self) -> [usize; 3] {
        self.cell_dims
    }

    /// Get the number of points along each axis (one more than cells).
    #[inline]
    pub fn point_dims(&self) -> [usize; 3] {
        self.cell_dims.map(|d| d + 1)
    }

    /// Get the total number of cells in the grid.
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cell_dims.iter().product()
    }

    /// Get the total number of points in the grid.
    #[inline]
    pub fn point_count(&self) -> usize {
        self.point_dims().iter().product()
    }

    #[inline]
    fn cell_index(&self, [i, j, k]: [usize; 3]) -> usize {
        let [ni, nj, _] = self.cell_dims;
        i + ni * (j + nj * k)
    }

    #[inline]
    fn cell_ijk(&self, cell: usize) -> [usize; 3] {
        let [ni, nj, _] = self.cell_dims;
        [cell % ni, (cell / ni) % nj, cell / (ni * nj)]
    }

    #[inline]
    fn point_index(&self, [i, j, k]: [usize; 3]) -> usize {
        let [pi, pj, _] = self.point_dims();
        i + pi * (j + pj * k)
    }

    #[inline]
    fn point_ijk(&self, point: usize) -> [usize; 3] {
        let [pi, pj, _] = self.point_dims();
        [point % pi, (point / pi) % pj, point / (pi * pj)]
    }

    /// Get the coordinate of a point.
    #[inline]
    pub fn point_coordinate(&self, point: usize) -> Vec3 {
        let [i, j, k] = self.point_ijk(point);
        self.origin
            + self
                .spacing
                .component_mul(&Vec3::new(i as f64, j as f64, k as f64))
    }

    /// Get the coordinate of a cell's center.
    #[inline]
    pub fn cell_center(&self, cell: usize) -> Vec3 {
        let [i, j, k] = self.cell_ijk(cell);
        self.origin
            + self.spacing.component_mul(&Vec3::new(
                i as f64 + 0.5,
                j as f64 + 0.5,
                k as f64 + 0.5,
            ))
    }

    /// Get the ids of the 8 corner points of a cell.
    pub fn cell_corner_ids(&self, cell: usize) -> [usize; 8] {
        let [i, j, k] = self.cell_ijk(cell);
        [
            self.point_index([i, j, k]),
            self.point_index([i + 1, j, k]),
            self.point_index([i, j + 1, k]),
            self.point_index([i + 1, j + 1, k]),
            self.point_index([i, j, k + 1]),
            self.point_index([i + 1, j, k + 1]),
            self.point_index([i, j + 1, k + 1]),
            self.point_index([i + 1, j + 1, k + 1]),
        ]
    }

    /// Get the volume of a cell: the attached [`VOLUME_FIELD`] value if present,
    /// otherwise the geometric volume from the grid spacing.
    #[inline]
    pub fn cell_volume(&self, cell: usize) -> f64 {
        match self.cell_fields.get(VOLUME_FIELD) {
            Some(volumes) => volumes[cell],
            None => self.spacing.product(),
        }
    }

    /// Iterate over the cells sharing at least one corner point with `cell`
    /// (up to 26 of them), not including `cell` itself.
    pub fn cell_point_neighbors(&self, cell: usize) -> impl Iterator<Item = usize> + '_ {
        let [i, j, k] = self.cell_ijk(cell);
        let [ni, nj, nk] = self.cell_dims;
        iproduct!(-1isize..=1, -1isize..=1, -1isize..=1)
            .filter(|&(dk, dj, di)| (di, dj, dk) != (0, 0, 0))
            .filter_map(move |(dk, dj, di)| {
                let ci = i.checked_add_signed(di)?;
                let cj = j.checked_add_signed(dj)?;
                let ck = k.checked_add_signed(dk)?;
                (ci < ni && cj < nj && ck < nk).then(|| self.cell_index([ci, cj, ck]))
            })
    }

    /// Attach a per-point scalar field, replacing any previous field of that name.
    pub fn set_point_scalar(&mut self, name: &str, values: Vec<f64>) -> Result<(), GridError> {
        if values.len() != self.point_count() {
            return Err(GridError::FieldLengthMismatch {
                name: name.to_string(),
                got: values.len(),
                expected: self.point_count(),
            });
        }
        self.point_fields.insert(name.to_string(), values);
        Ok(())
    }

    /// Attach a per-cell scalar field, replacing any previous field of that name.
    pub fn set_cell_scalar(&mut self, name: &str, values: Vec<f64>) -> Result<(), GridError> {
        if values.len() != self.cell_count() {
            return Err(GridError::FieldLengthMismatch {
                name: name.to_string(),
                got: values.len(),
                expected: self.cell_count(),
            });
        }
        self.cell_fields.insert(name.to_string(), values);
        Ok(())
    }

    /// Get a per-point scalar field by name.
    pub fn point_scalar(&self, name: &str) -> Result<&[f64], GridError> {
        self.point_fields
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| GridError::MissingPointField {
                name: name.to_string(),
            })
    }

    /// Get a per-cell scalar field by name.
    pub fn cell_scalar(&self, name: &str) -> Result<&[f64], GridError> {
        self.cell_fields
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| GridError::MissingCellField {
                name: name.to_string(),
            })
    }

    /// Check whether a per-cell scalar field is attached.
    #[inline]
    pub fn has_cell_scalar(&self, name: &str) -> bool {
        self.cell_fields.contains_key(name)
    }

    /// Derive a per-point scalar field from a per-cell one of the same name
    /// by averaging each point's adjacent cells (1 to 8 of them
    /// depending on the point's position in the grid).
    ///
    /// This is how corner volume fractions are obtained
    /// for the sub-cell weighting in [`moments`][crate::moments].
    pub fn interpolate_cells_to_points(&mut self, name: &str) -> Result<(), GridError> {
        let values = self
            .cell_fields
            .get(name)
            .ok_or_else(|| GridError::MissingCellField {
                name: name.to_string(),
            })?;

        let [ni, nj, nk] = self.cell_dims;
        let mut point_values = vec![0.0; self.point_count()];
        for (point, out) in point_values.iter_mut().enumerate() {
            let [i, j, k] = self.point_ijk(point);
            let mut sum = 0.0;
            let mut count = 0usize;
            // adjacent cell indices per axis are {i - 1, i} clamped to the grid
            for ck in k.saturating_sub(1)..=k.min(nk - 1) {
                for cj in j.saturating_sub(1)..=j.min(nj - 1) {
                    for ci in i.saturating_sub(1)..=i.min(ni - 1) {
                        sum += values[self.cell_index([ci, cj, ck])];
                        count += 1;
                    }
                }
            }
            *out = sum / count as f64;
        }

        self.point_fields.insert(name.to_string(), point_values);
        Ok(())
    }

    /// Attach the [`VOLUME_FIELD`] cell field computed from the grid spacing,
    /// unless the loader already supplied one.
    pub fn compute_cell_volumes(&mut self) {
        if !self.has_cell_scalar(VOLUME_FIELD) {
            let volume = self.spacing.product();
            self.cell_fields
                .insert(VOLUME_FIELD.to_string(), vec![volume; self.cell_count()]);
        }
    }
}

//
// test grids
//

/// A fully filled cube of `n^3` cells with edge length 1
/// and its minimum corner at `origin`, VOF attached.
/// Shared by tests across modules.
#[cfg(test)]
pub(crate) fn filled_cube_grid(n: usize, origin: Vec3) -> HexGrid {
    let mut grid = HexGrid::new([n; 3], origin, Vec3::repeat(1.0 / n as f64));
    let vof = vec![1.0; grid.cell_count()];
    grid.set_cell_scalar("VOF", vof).expect("length is correct");
    grid
}

/// A 7x3x3 grid with two fluid slabs separated by one empty slab of cells,
/// giving exactly two connected regions.
#[cfg(test)]
pub(crate) fn two_blob_grid() -> HexGrid {
    let mut grid = HexGrid::new([7, 3, 3], Vec3::new(1., 1., 1.), Vec3::repeat(1.0));
    let vof: Vec<f64> = (0..grid.cell_count())
        .map(|c| if c % 7 == 3 { 0.0 } else { 1.0 })
        .collect();
    grid.set_cell_scalar("VOF", vof).expect("length is correct");
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn corner_ids_match_coordinates() {
        let grid = HexGrid::new([3, 2, 2], Vec3::new(1., 2., 3.), Vec3::new(0.5, 1.0, 2.0));

        // every corner of every cell is exactly half a spacing away
        // from the cell center along each axis
        for cell in 0..grid.cell_count() {
            let center = grid.cell_center(cell);
            for corner in grid.cell_corner_ids(cell) {
                let offset = grid.point_coordinate(corner) - center;
                for axis in 0..3 {
                    assert_abs_diff_eq!(offset[axis].abs(), 0.5 * [0.5, 1.0, 2.0][axis]);
                }
            }
        }

        // corners of the first cell, spelled out
        let corners = grid.cell_corner_ids(0);
        assert_eq!(grid.point_coordinate(corners[0]), Vec3::new(1., 2., 3.));
        assert_eq!(grid.point_coordinate(corners[7]), Vec3::new(1.5, 3., 5.));
    }

    #[test]
    fn point_neighbors_stay_in_bounds() {
        let grid = HexGrid::new([2, 2, 2], Vec3::zeros(), Vec3::repeat(1.0));
        // a corner cell of a 2x2x2 grid has all other cells as neighbors
        let neighbors: Vec<usize> = grid.cell_point_neighbors(0).collect();
        assert_eq!(neighbors.len(), 7);
        assert!(!neighbors.contains(&0));

        let big = HexGrid::new([4, 4, 4], Vec3::zeros(), Vec3::repeat(1.0));
        let interior = big.cell_index([1, 1, 1]);
        assert_eq!(big.cell_point_neighbors(interior).count(), 26);
    }

    #[test]
    fn corner_interpolation_averages_adjacent_cells() {
        // two cells along x with values 0 and 1:
        // the shared face's points average to 0.5, outer points keep their cell's value
        let mut grid = HexGrid::new([2, 1, 1], Vec3::zeros(), Vec3::repeat(1.0));
        grid.set_cell_scalar("VOF", vec![0.0, 1.0]).unwrap();
        grid.interpolate_cells_to_points("VOF").unwrap();

        let vof = grid.point_scalar("VOF").unwrap();
        for point in 0..grid.point_count() {
            let x = grid.point_coordinate(point).x;
            let expected = match x as usize {
                0 => 0.0,
                1 => 0.5,
                2 => 1.0,
                _ => unreachable!(),
            };
            assert_abs_diff_eq!(vof[point], expected);
        }
    }

    #[test]
    fn missing_and_mismatched_fields_are_errors() {
        let mut grid = HexGrid::new([2, 2, 2], Vec3::zeros(), Vec3::repeat(1.0));

        assert!(matches!(
            grid.cell_scalar("VOF"),
            Err(GridError::MissingCellField { .. })
        ));
        assert!(matches!(
            grid.interpolate_cells_to_points("VOF"),
            Err(GridError::MissingCellField { .. })
        ));
        assert!(matches!(
            grid.set_cell_scalar("VOF", vec![1.0; 7]),
            Err(GridError::FieldLengthMismatch { expected: 8, .. })
        ));
        assert!(matches!(
            grid.set_point_scalar("VOF", vec![1.0; 8]),
            Err(GridError::FieldLengthMismatch { expected: 27, .. })
        ));
    }

    #[test]
    fn cell_volumes_respect_loader_data() {
        let mut grid = HexGrid::new([2, 1, 1], Vec3::zeros(), Vec3::new(0.5, 2.0, 1.0));
        grid.compute_cell_volumes();
        assert_abs_diff_eq!(grid.cell_volume(0), 1.0);

        // a volume field supplied by the loader is not overwritten
        let mut grid = HexGrid::new([2, 1, 1], Vec3::zeros(), Vec3::repeat(1.0));
        grid.set_cell_scalar(VOLUME_FIELD, vec![2.0, 3.0]).unwrap();
        grid.compute_cell_volumes();
        assert_abs_diff_eq!(grid.cell_volume(1), 3.0);
    }
}
