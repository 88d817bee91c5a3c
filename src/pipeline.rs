//! The timestep-by-timestep analysis driver:
//! corner interpolation, region labeling, per-blob moments,
//! one table row per blob.

use crate::{
    grid::{GridError, HexGrid},
    labeling::label_regions,
    moments::{compute_blob_moments, ArithmeticReference, MomentError, WeightingScheme},
    table::{StatsRow, StatsTable},
};

/// Options controlling blob discovery
/// and which statistics are persisted to the table.
#[derive(Clone, Debug)]
pub struct AnalysisOptions {
    /// Name of the per-cell volume fraction field. Default `"VOF"`.
    pub vof_field: String,
    /// Inclusive range of volume fraction that seeds connectivity.
    /// Default `(1.0, 1.0)`, i.e. only fully fluid-filled cells.
    pub threshold: (f64, f64),
    /// Which weighting scheme's statistics end up in the table.
    /// Default [`Arithmetic`][WeightingScheme::Arithmetic],
    /// matching the reference tool; the other two schemes
    /// are always computed and can be persisted instead.
    pub persist_scheme: WeightingScheme,
    /// Reference point used for the arithmetic scheme's inertia tensor.
    pub arithmetic_reference: ArithmeticReference,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            vof_field: "VOF".to_string(),
            threshold: (1.0, 1.0),
            persist_scheme: WeightingScheme::Arithmetic,
            arithmetic_reference: ArithmeticReference::default(),
        }
    }
}

/// Error that aborts the analysis of one timestep.
///
/// Local to the timestep: the caller is expected to log it
/// and move on to the next grid (as [`run`] does).
#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    /// The grid is missing a required field or carries a malformed one.
    /// Defaults are never silently substituted.
    #[error("malformed grid: {0}")]
    Grid(#[from] GridError),
}

/// A collaborator that supplies one grid per timestep,
/// e.g. by parsing simulation output files.
///
/// A [`load`][Self::load] failure is treated as fatal by [`run`]:
/// no grid means no data for the timestep at all.
pub trait GridSource {
    /// Error produced when a grid cannot be supplied.
    type Error: std::error::Error + 'static;

    /// Get the number of timesteps this source can supply.
    fn timestep_count(&self) -> usize;

    /// Load the grid for one timestep,
    /// with the volume fraction field attached per cell.
    fn load(&mut self, tstep: usize) -> Result<HexGrid, Self::Error>;
}

/// Fatal pipeline failure: the grid source could not supply a timestep's grid.
#[derive(thiserror::Error, Debug)]
#[error("grid source failed at timestep {tstep}")]
pub struct PipelineError<E: std::error::Error + 'static> {
    /// The timestep whose grid could not be loaded.
    pub tstep: usize,
    /// The loader's own error.
    #[source]
    pub source: E,
}

/// Analyze one timestep's grid and append one row per blob to the table.
///
/// Derives corner volume fractions and cell volumes if needed,
/// labels connected regions, and computes moments per blob.
/// Returns the number of rows appended;
/// a timestep with no thresholded cells appends none and is not an error.
///
/// Blob-local failures (degenerate blobs,
/// an unavailable geometric scheme when it was the one requested)
/// are logged and skipped so they never block sibling blobs.
pub fn analyze_timestep(
    tstep: usize,
    grid: &mut HexGrid,
    options: &AnalysisOptions,
    table: &mut StatsTable,
) -> Result<usize, AnalysisError> {
    grid.compute_cell_volumes();
    grid.interpolate_cells_to_points(&options.vof_field)?;
    let labeling = label_regions(grid, &options.vof_field, options.threshold)?;

    let mut appended = 0;
    for blob in labeling.blobs() {
        let moments = match compute_blob_moments(
            grid,
            &blob,
            &options.vof_field,
            options.arithmetic_reference,
        ) {
            Ok(moments) => moments,
            Err(MomentError::DegenerateBlob { region }) => {
                log::warn!("timestep {tstep}: skipping degenerate blob {region}");
                continue;
            }
            Err(MomentError::Grid(e)) => return Err(e.into()),
        };
        let Some(stats) = moments.scheme(options.persist_scheme) else {
            log::warn!(
                "timestep {tstep}: blob {}: {:?} scheme unavailable, row skipped",
                blob.region_id(),
                options.persist_scheme
            );
            continue;
        };
        table.push(StatsRow::new(tstep, blob.region_id(), stats));
        appended += 1;
    }

    log::debug!(
        "timestep {tstep}: {} regions, {appended} rows",
        labeling.region_count()
    );
    Ok(appended)
}

/// Analyze every timestep the source can supply, in order,
/// and return the accumulated table.
///
/// A timestep whose grid is malformed is logged and skipped;
/// a grid source failure aborts the whole run.
pub fn run<S: GridSource>(
    source: &mut S,
    options: &AnalysisOptions,
) -> Result<StatsTable, PipelineError<S::Error>> {
    let mut table = StatsTable::new();
    for tstep in 0..source.timestep_count() {
        let mut grid = source
            .load(tstep)
            .map_err(|source| PipelineError { tstep, source })?;
        if let Err(e) = analyze_timestep(tstep, &mut grid, options, &mut table) {
            log::error!("timestep {tstep} skipped: {e}");
        }
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vec3;
    use approx::assert_relative_eq;

    /// A 10x2x2-cell grid of spacing 0.5 holding three well-separated
    /// 2x2x2-cell unit cubes of fluid (at cell columns 0-1, 4-5 and 8-9).
    fn three_cube_grid(origin: Vec3) -> HexGrid {
        let mut grid = HexGrid::new([10, 2, 2], origin, Vec3::repeat(0.5));
        let vof: Vec<f64> = (0..grid.cell_count())
            .map(|cell| {
                let column = cell % 10;
                if matches!(column, 0 | 1 | 4 | 5 | 8 | 9) {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();
        grid.set_cell_scalar("VOF", vof).unwrap();
        grid
    }

    #[derive(Debug, thiserror::Error)]
    #[error("simulated loader failure")]
    struct SourceFailed;

    struct CubeSource {
        /// timestep at which `load` fails, if any
        fail_at: Option<usize>,
        /// timestep at which the grid comes without a VOF field, if any
        malformed_at: Option<usize>,
    }

    impl GridSource for CubeSource {
        type Error = SourceFailed;

        fn timestep_count(&self) -> usize {
            2
        }

        fn load(&mut self, tstep: usize) -> Result<HexGrid, SourceFailed> {
            if self.fail_at == Some(tstep) {
                return Err(SourceFailed);
            }
            // shift the second timestep so the two produce distinct rows
            let origin = Vec3::new(1.0 + 0.25 * tstep as f64, 1.0, 1.0);
            let mut grid = three_cube_grid(origin);
            if self.malformed_at == Some(tstep) {
                grid = HexGrid::new([10, 2, 2], origin, Vec3::repeat(0.5));
            }
            Ok(grid)
        }
    }

    #[test]
    fn empty_timestep_appends_no_rows() {
        let mut grid = HexGrid::new([3, 3, 3], Vec3::new(1., 1., 1.), Vec3::repeat(1.0));
        grid.set_cell_scalar("VOF", vec![0.0; grid.cell_count()])
            .unwrap();
        let mut table = StatsTable::new();
        let appended =
            analyze_timestep(0, &mut grid, &AnalysisOptions::default(), &mut table).unwrap();
        assert_eq!(appended, 0);
        assert!(table.is_empty());
    }

    #[test]
    fn missing_vof_field_aborts_the_timestep() {
        let mut grid = HexGrid::new([2, 2, 2], Vec3::new(1., 1., 1.), Vec3::repeat(1.0));
        let mut table = StatsTable::new();
        let result = analyze_timestep(0, &mut grid, &AnalysisOptions::default(), &mut table);
        assert!(matches!(result, Err(AnalysisError::Grid(_))));
        assert!(table.is_empty());
    }

    #[test]
    fn two_timesteps_of_three_cubes_match_analytic_moments() {
        let mut source = CubeSource {
            fail_at: None,
            malformed_at: None,
        };
        let table = run(&mut source, &AnalysisOptions::default()).unwrap();
        assert_eq!(table.len(), 6);

        // each cube: 8 cells of volume 0.125 at VOF 1, so unit mass;
        // discrete point-mass inertia of an n=2 unit cube is
        // m * s^2 * (n^2 - 1) / (6 n^2) = 1/8 on the diagonal
        let expected_diagonal = 0.125;
        for (r, row) in table.rows().iter().enumerate() {
            let tstep = r / 3;
            let blob = (r % 3) as u32;
            assert_eq!(row.tstep, tstep);
            assert_eq!(row.blob, blob);

            let expected_com = Vec3::new(
                1.0 + 0.25 * tstep as f64 + 0.5 + 2.0 * blob as f64,
                1.5,
                1.5,
            );
            assert_relative_eq!(row.com_x, expected_com.x, epsilon = 1e-9);
            assert_relative_eq!(row.com_y, expected_com.y, epsilon = 1e-9);
            assert_relative_eq!(row.com_z, expected_com.z, epsilon = 1e-9);

            assert_relative_eq!(row.ixx, expected_diagonal, epsilon = 1e-9);
            assert_relative_eq!(row.iyy, expected_diagonal, epsilon = 1e-9);
            assert_relative_eq!(row.izz, expected_diagonal, epsilon = 1e-9);
            assert_relative_eq!(row.ixy, 0.0, epsilon = 1e-9);
            assert_relative_eq!(row.ixz, 0.0, epsilon = 1e-9);
            assert_relative_eq!(row.iyz, 0.0, epsilon = 1e-9);
        }

        // serialized form: header plus six rows
        let mut buffer: Vec<u8> = Vec::new();
        table.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.lines().count(), 7);
        assert!(text.starts_with("tstep,blob,COM_x,"));
    }

    #[test]
    fn malformed_timestep_does_not_block_the_next() {
        let mut source = CubeSource {
            fail_at: None,
            malformed_at: Some(0),
        };
        let table = run(&mut source, &AnalysisOptions::default()).unwrap();
        // only timestep 1 produced rows
        assert_eq!(table.len(), 3);
        assert!(table.rows().iter().all(|row| row.tstep == 1));
    }

    #[test]
    fn loader_failure_is_fatal() {
        let mut source = CubeSource {
            fail_at: Some(1),
            malformed_at: None,
        };
        let result = run(&mut source, &AnalysisOptions::default());
        let err = result.expect_err("loader failure should abort the run");
        assert_eq!(err.tstep, 1);
    }
}
