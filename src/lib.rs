//! Per-blob physical statistics for volume-of-fluid (VOF) simulation output.
//!
//! Given a structured hexahedral grid with a per-cell volume-fraction field,
//! this crate labels connected fluid regions ("blobs")
//! and computes for each blob a volume-weighted center of mass
//! and inertia tensor, with sub-cell weighting of partially filled
//! interface cells derived from corner-interpolated volume fractions.
//! Results accumulate into a delimited table, one row per (timestep, blob).
//!
//! Loading simulation output into a [`HexGrid`] is the caller's job
//! (see the [`GridSource`] trait); this crate only does the analysis.
//!
//! ```
//! use vofblob::{pipeline, AnalysisOptions, HexGrid, StatsTable, Vec3};
//!
//! // a 4x4x4-cell unit cube, fully filled with fluid
//! let mut grid = HexGrid::new([4, 4, 4], Vec3::new(1., 1., 1.), Vec3::repeat(0.25));
//! grid.set_cell_scalar("VOF", vec![1.0; grid.cell_count()])?;
//!
//! let mut table = StatsTable::new();
//! pipeline::analyze_timestep(0, &mut grid, &AnalysisOptions::default(), &mut table)?;
//! // one connected region, hence one row
//! assert_eq!(table.len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]

pub mod grid;
#[doc(inline)]
pub use grid::{GridError, HexGrid};

pub mod labeling;
#[doc(inline)]
pub use labeling::{label_regions, Blob, Labeling};

pub mod moments;
#[doc(inline)]
pub use moments::{
    compute_blob_moments, ArithmeticReference, BlobMoments, InertiaTensor, MomentError,
    SchemeMoments, WeightingScheme,
};

pub mod table;
#[doc(inline)]
pub use table::{StatsRow, StatsTable};

pub mod pipeline;
#[doc(inline)]
pub use pipeline::{AnalysisError, AnalysisOptions, GridSource, PipelineError};

// nalgebra re-exports of common types for convenience

pub use nalgebra as na;
/// Type alias for a 3D `nalgebra` vector.
pub type Vec3 = na::Vector3<f64>;
/// Type alias for a 3x3 `nalgebra` matrix.
pub type Mat3 = na::Matrix3<f64>;
