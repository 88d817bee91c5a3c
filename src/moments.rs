//! Per-blob physical moments: volume-weighted centers of mass
//! and inertia tensors, with sub-cell correction
//! for partially filled interface cells.
//!
//! Each blob cell contributes a point mass `vof * volume`
//! located at a *weighted coordinate* that accounts for where
//! the fluid sits inside the cell. Three coordinate schemes
//! are computed in parallel (see [`WeightingScheme`]);
//! all of them share the same mass weighting,
//! so centers of mass and inertia tensors are mutually consistent
//! within a scheme.

use itertools::izip;

use crate::{
    grid::{GridError, HexGrid, VOLUME_FIELD},
    labeling::Blob,
    Mat3, Vec3,
};

/// The coordinate scheme a blob statistic was computed under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WeightingScheme {
    /// The raw cell-center coordinate, no sub-cell correction.
    Center,
    /// Volume-fraction-weighted geometric mean of the cell's corner coordinates
    /// (component-wise, via log-space averaging).
    /// Requires strictly positive corner coordinates.
    Geometric,
    /// Volume-fraction-weighted arithmetic mean of the cell's corner coordinates.
    Arithmetic,
}

/// Reference point for the arithmetic scheme's inertia tensor.
///
/// The reference implementation computes the arithmetic-scheme inertia
/// about the *geometric* scheme's center of mass
/// while every other quantity in that scheme is arithmetic.
/// This is preserved as the default rather than silently corrected;
/// pick [`OwnCom`][Self::OwnCom] for the self-consistent variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ArithmeticReference {
    /// The geometric scheme's center of mass, as in the reference tool.
    /// Falls back to the arithmetic center of mass
    /// when the geometric scheme is unavailable.
    #[default]
    GeometricCom,
    /// The arithmetic scheme's own center of mass.
    OwnCom,
}

/// Error in computing blob moments.
#[derive(thiserror::Error, Debug)]
pub enum MomentError {
    /// The blob's total weighted volume is zero,
    /// so no center of mass exists.
    #[error("degenerate blob {region}: total weighted volume is zero")]
    DegenerateBlob {
        /// Region id of the offending blob.
        region: u32,
    },
    /// A required grid field was missing or malformed.
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// The six independent components of a symmetric inertia tensor.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InertiaTensor {
    /// Moment about the x axis.
    pub ixx: f64,
    /// Moment about the y axis.
    pub iyy: f64,
    /// Moment about the z axis.
    pub izz: f64,
    /// xy product of inertia.
    pub ixy: f64,
    /// xz product of inertia.
    pub ixz: f64,
    /// yz product of inertia.
    pub iyz: f64,
}

impl InertiaTensor {
    /// Add one point mass `m` at offset `r` from the reference point.
    #[inline]
    fn accumulate(&mut self, m: f64, r: Vec3) {
        self.ixx += m * (r.y * r.y + r.z * r.z);
        self.iyy += m * (r.x * r.x + r.z * r.z);
        self.izz += m * (r.x * r.x + r.y * r.y);
        self.ixy -= m * r.x * r.y;
        self.ixz -= m * r.x * r.z;
        self.iyz -= m * r.y * r.z;
    }

    /// Expand the six stored components into a full symmetric matrix.
    pub fn to_matrix(&self) -> Mat3 {
        Mat3::new(
            self.ixx, self.ixy, self.ixz, //
            self.ixy, self.iyy, self.iyz, //
            self.ixz, self.iyz, self.izz,
        )
    }
}

/// A center of mass and the inertia tensor taken about the scheme's
/// reference point (see [`ArithmeticReference`] for the one exception
/// to "about its own center of mass").
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SchemeMoments {
    /// Volume-fraction-weighted average position of the blob.
    pub com: Vec3,
    /// Point-mass inertia tensor of the blob.
    pub inertia: InertiaTensor,
}

/// Moments of one blob under all three weighting schemes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlobMoments {
    /// Raw cell-center scheme.
    pub center: SchemeMoments,
    /// Arithmetic corner-weighting scheme (the one usually persisted).
    pub arithmetic: SchemeMoments,
    /// Geometric corner-weighting scheme.
    /// `None` if a corner coordinate was not strictly positive,
    /// which breaks the log-space mean; the other schemes are unaffected.
    pub geometric: Option<SchemeMoments>,
}

impl BlobMoments {
    /// Get the moments for one scheme,
    /// `None` if the geometric scheme was unavailable.
    pub fn scheme(&self, scheme: WeightingScheme) -> Option<&SchemeMoments> {
        match scheme {
            WeightingScheme::Center => Some(&self.center),
            WeightingScheme::Arithmetic => Some(&self.arithmetic),
            WeightingScheme::Geometric => self.geometric.as_ref(),
        }
    }
}

/// Compute the center of mass and inertia tensor of one blob
/// under all three weighting schemes.
///
/// Expects the grid to carry `vof_field` both per cell
/// and per point (corner-interpolated,
/// see [`HexGrid::interpolate_cells_to_points`]),
/// plus the per-cell [`VOLUME_FIELD`].
///
/// A blob whose total weighted volume is zero
/// yields [`MomentError::DegenerateBlob`]; a fabricated center
/// is never returned.
pub fn compute_blob_moments(
    grid: &HexGrid,
    blob: &Blob,
    vof_field: &str,
    reference: ArithmeticReference,
) -> Result<BlobMoments, MomentError> {
    let cell_vof = grid.cell_scalar(vof_field)?;
    let corner_vof = grid.point_scalar(vof_field)?;
    let volumes = grid.cell_scalar(VOLUME_FIELD)?;

    // weighted coordinates and masses, one entry per blob cell
    let n = blob.len();
    let mut masses: Vec<f64> = Vec::with_capacity(n);
    let mut center_coords: Vec<Vec3> = Vec::with_capacity(n);
    let mut arith_coords: Vec<Vec3> = Vec::with_capacity(n);
    let mut geom_coords: Vec<Vec3> = Vec::with_capacity(n);
    let mut geom_valid = true;

    for cell in blob.cells() {
        let vof = cell_vof[cell];
        let center = grid.cell_center(cell);
        masses.push(vof * volumes[cell]);
        center_coords.push(center);

        if vof == 1.0 {
            // a fully filled cell needs no correction under either scheme
            arith_coords.push(center);
            if geom_valid {
                geom_coords.push(center);
            }
            continue;
        }

        let mut cvof_sum = 0.0;
        let mut weighted = Vec3::zeros();
        let mut log_weighted = Vec3::zeros();
        let mut corners_positive = true;
        for corner in grid.cell_corner_ids(cell) {
            let cvof = corner_vof[corner];
            let coord = grid.point_coordinate(corner);
            cvof_sum += cvof;
            weighted += cvof * coord;
            if geom_valid && corners_positive {
                if coord.iter().all(|c| *c > 0.0) {
                    log_weighted += cvof * coord.map(f64::ln);
                } else {
                    corners_positive = false;
                }
            }
        }

        if cvof_sum == 0.0 {
            // no fluid at any corner means zero mass for this cell;
            // keep the raw center so a 0/0 coordinate can't poison the sums
            arith_coords.push(center);
            if geom_valid {
                geom_coords.push(center);
            }
            continue;
        }

        arith_coords.push(weighted / cvof_sum);
        if geom_valid {
            if corners_positive {
                geom_coords.push((log_weighted / cvof_sum).map(f64::exp));
            } else {
                log::warn!(
                    "blob {}: non-positive corner coordinate at cell {}, \
                     geometric scheme unavailable",
                    blob.region_id(),
                    cell
                );
                geom_valid = false;
                geom_coords.clear();
            }
        }
    }

    let total_mass: f64 = masses.iter().sum();
    if total_mass == 0.0 {
        return Err(MomentError::DegenerateBlob {
            region: blob.region_id(),
        });
    }

    let com = |coords: &[Vec3]| -> Vec3 {
        izip!(coords, &masses).map(|(c, m)| *m * c).sum::<Vec3>() / total_mass
    };
    let inertia = |coords: &[Vec3], about: Vec3| -> InertiaTensor {
        let mut tensor = InertiaTensor::default();
        for (coord, m) in izip!(coords, &masses) {
            tensor.accumulate(*m, coord - about);
        }
        tensor
    };

    let center_com = com(&center_coords);
    let center = SchemeMoments {
        com: center_com,
        inertia: inertia(&center_coords, center_com),
    };

    let geometric = geom_valid.then(|| {
        let geom_com = com(&geom_coords);
        SchemeMoments {
            com: geom_com,
            inertia: inertia(&geom_coords, geom_com),
        }
    });

    let arith_com = com(&arith_coords);
    let arith_about = match reference {
        ArithmeticReference::GeometricCom => geometric.as_ref().map_or(arith_com, |g| g.com),
        ArithmeticReference::OwnCom => arith_com,
    };
    let arithmetic = SchemeMoments {
        com: arith_com,
        inertia: inertia(&arith_coords, arith_about),
    };

    Ok(BlobMoments {
        center,
        arithmetic,
        geometric,
    })
}
