//! Accumulation and serialization of per-blob statistics rows.
//!
//! Rows arrive timestep-major, blob-minor and are only serialized once,
//! at the end of a run; the table itself is append-only.

use std::io;

use serde::Serialize;

use crate::moments::SchemeMoments;

/// One blob's statistics for one timestep.
///
/// Serializes under the header
/// `tstep,blob,COM_x,COM_y,COM_z,Ixx,Iyy,Izz,Ixy,Ixz,Iyz`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StatsRow {
    /// Timestep index.
    pub tstep: usize,
    /// Region id of the blob within its timestep.
    pub blob: u32,
    /// Center of mass, x component.
    #[serde(rename = "COM_x")]
    pub com_x: f64,
    /// Center of mass, y component.
    #[serde(rename = "COM_y")]
    pub com_y: f64,
    /// Center of mass, z component.
    #[serde(rename = "COM_z")]
    pub com_z: f64,
    /// Inertia tensor, xx component.
    #[serde(rename = "Ixx")]
    pub ixx: f64,
    /// Inertia tensor, yy component.
    #[serde(rename = "Iyy")]
    pub iyy: f64,
    /// Inertia tensor, zz component.
    #[serde(rename = "Izz")]
    pub izz: f64,
    /// Inertia tensor, xy component.
    #[serde(rename = "Ixy")]
    pub ixy: f64,
    /// Inertia tensor, xz component.
    #[serde(rename = "Ixz")]
    pub ixz: f64,
    /// Inertia tensor, yz component.
    #[serde(rename = "Iyz")]
    pub iyz: f64,
}

impl StatsRow {
    /// Flatten one scheme's moments into a row.
    pub fn new(tstep: usize, blob: u32, moments: &SchemeMoments) -> Self {
        Self {
            tstep,
            blob,
            com_x: moments.com.x,
            com_y: moments.com.y,
            com_z: moments.com.z,
            ixx: moments.inertia.ixx,
            iyy: moments.inertia.iyy,
            izz: moments.inertia.izz,
            ixy: moments.inertia.ixy,
            ixz: moments.inertia.ixz,
            iyz: moments.inertia.iyz,
        }
    }
}

/// An append-only table of blob statistics,
/// one row per (timestep, blob).
#[derive(Clone, Debug, Default)]
pub struct StatsTable {
    rows: Vec<StatsRow>,
}

impl StatsTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one row. Rows are kept in insertion order.
    #[inline]
    pub fn push(&mut self, row: StatsRow) {
        self.rows.push(row);
    }

    /// Get the rows accumulated so far.
    #[inline]
    pub fn rows(&self) -> &[StatsRow] {
        &self.rows
    }

    /// Get the number of rows in the table.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Serialize the table as comma-delimited UTF-8 text,
    /// header line first.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> csv::Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}
