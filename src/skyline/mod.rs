//! Skyline algebra: piecewise-constant rates that vary stepwise in time.
//!
//! A "skyline" quantity is specified by a sequence of values plus the
//! strictly increasing, positive times at which the value changes; lookups
//! are right-continuous steps. The module provides the scalar
//! [`SkylineParameter`], the [`SkylineVector`] of parameters, and the
//! [`SkylineMatrix`] of vectors, all closed under elementwise `+`, `-`,
//! `*`, `/` with broadcasting across ranks:
//!
//! * scalar ⊕ vector/matrix applies the scalar to every entry;
//! * vector ⊕ matrix broadcasts one entry per row when the lengths match
//!   the row count, else one entry per column;
//! * same-shape operands combine elementwise.
//!
//! Results carry the sorted union of the operands' change times and are
//! canonicalized (runs of equal adjacent values collapse) on construction.
//!
//! The [`skyline_vector`] and [`skyline_matrix`] factories are the only
//! intended entry points from configuration data: they accept scalars,
//! parameters, entry lists, or ready-made values via [`VectorSpec`] and
//! [`MatrixSpec`] and check the requested shape.
//!
//! # Examples
//!
//! ```
//! use treesim::{skyline_matrix, SkylineParameter};
//!
//! // A 3x2 matrix of constant fives has no change times.
//! let m = skyline_matrix(5.0, 3, 2).unwrap();
//! assert_eq!(m.num_rows(), 3);
//! assert_eq!(m.num_cols(), 2);
//! assert!(m.change_times().is_empty());
//!
//! // Broadcasting against a stepwise scalar merges its change times in.
//! let step = SkylineParameter::new(vec![1.0, 2.0], vec![4.0]).unwrap();
//! let scaled = m * step;
//! assert_eq!(scaled.change_times(), vec![4.0]);
//! assert_eq!(scaled.get(0, 0).value_at_time(4.0), 10.0);
//! ```

mod matrix;
mod parameter;
mod vector;

pub use matrix::SkylineMatrix;
pub use parameter::{skyline_parameter, ParameterSpec, SkylineParameter};
pub use vector::SkylineVector;

use serde::Deserialize;

use crate::TreesimError;

/// The config form of a [`SkylineVector`]: a scalar broadcast to the
/// requested length, a list of per-entry parameter specs, or an existing
/// parameter/vector.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum VectorSpec {
    /// One constant broadcast to every entry.
    Scalar(f64),
    /// One spec per entry.
    Entries(Vec<ParameterSpec>),
    /// One parameter broadcast to every entry.
    #[serde(skip)]
    Parameter(SkylineParameter),
    /// An already-built vector, length-checked and passed through.
    #[serde(skip)]
    Vector(SkylineVector),
}

impl From<f64> for VectorSpec {
    fn from(value: f64) -> Self {
        VectorSpec::Scalar(value)
    }
}

impl From<SkylineParameter> for VectorSpec {
    fn from(param: SkylineParameter) -> Self {
        VectorSpec::Parameter(param)
    }
}

impl From<SkylineVector> for VectorSpec {
    fn from(vector: SkylineVector) -> Self {
        VectorSpec::Vector(vector)
    }
}

impl From<Vec<f64>> for VectorSpec {
    fn from(values: Vec<f64>) -> Self {
        VectorSpec::Entries(values.into_iter().map(ParameterSpec::from).collect())
    }
}

impl From<Vec<SkylineParameter>> for VectorSpec {
    fn from(params: Vec<SkylineParameter>) -> Self {
        VectorSpec::Entries(params.into_iter().map(ParameterSpec::from).collect())
    }
}

/// The config form of a [`SkylineMatrix`]: a scalar or parameter broadcast
/// to every entry, a vector broadcast one entry per row, nested entry
/// specs, or an existing matrix.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum MatrixSpec {
    /// One constant broadcast to every entry.
    Scalar(f64),
    /// One spec per entry, row by row.
    Rows(Vec<Vec<ParameterSpec>>),
    /// One parameter broadcast to every entry.
    #[serde(skip)]
    Parameter(SkylineParameter),
    /// One entry per row, broadcast across that row.
    #[serde(skip)]
    PerRow(SkylineVector),
    /// An already-built matrix, shape-checked and passed through.
    #[serde(skip)]
    Matrix(SkylineMatrix),
}

impl From<f64> for MatrixSpec {
    fn from(value: f64) -> Self {
        MatrixSpec::Scalar(value)
    }
}

impl From<SkylineParameter> for MatrixSpec {
    fn from(param: SkylineParameter) -> Self {
        MatrixSpec::Parameter(param)
    }
}

impl From<SkylineVector> for MatrixSpec {
    fn from(vector: SkylineVector) -> Self {
        MatrixSpec::PerRow(vector)
    }
}

impl From<SkylineMatrix> for MatrixSpec {
    fn from(matrix: SkylineMatrix) -> Self {
        MatrixSpec::Matrix(matrix)
    }
}

impl From<Vec<Vec<f64>>> for MatrixSpec {
    fn from(rows: Vec<Vec<f64>>) -> Self {
        MatrixSpec::Rows(
            rows.into_iter()
                .map(|row| row.into_iter().map(ParameterSpec::from).collect())
                .collect(),
        )
    }
}

/// Resolve a config-level spec into a [`SkylineVector`] of length `len`.
///
/// # Errors
///
/// [`TreesimError::Config`] when `len` is zero, an entry list has the
/// wrong length, or an entry spec is malformed.
pub fn skyline_vector(
    spec: impl Into<VectorSpec>,
    len: usize,
) -> Result<SkylineVector, TreesimError> {
    if len == 0 {
        return Err(TreesimError::config(
            "a skyline vector needs at least one entry",
        ));
    }
    match spec.into() {
        VectorSpec::Scalar(v) => SkylineVector::splat(SkylineParameter::constant(v), len),
        VectorSpec::Parameter(param) => SkylineVector::splat(param, len),
        VectorSpec::Entries(specs) => {
            if specs.len() != len {
                return Err(TreesimError::config(format!(
                    "expected {len} vector entries, got {}",
                    specs.len()
                )));
            }
            let params = specs
                .into_iter()
                .map(|spec| skyline_parameter(spec))
                .collect::<Result<Vec<_>, _>>()?;
            SkylineVector::new(params)
        }
        VectorSpec::Vector(vector) => {
            if vector.len() != len {
                return Err(TreesimError::config(format!(
                    "expected a vector of length {len}, got length {}",
                    vector.len()
                )));
            }
            Ok(vector)
        }
    }
}

/// Resolve a config-level spec into a `num_rows` x `num_cols`
/// [`SkylineMatrix`].
///
/// # Errors
///
/// [`TreesimError::Config`] when either dimension is zero or the spec does
/// not fit the requested shape.
pub fn skyline_matrix(
    spec: impl Into<MatrixSpec>,
    num_rows: usize,
    num_cols: usize,
) -> Result<SkylineMatrix, TreesimError> {
    if num_rows == 0 || num_cols == 0 {
        return Err(TreesimError::config(
            "a skyline matrix needs at least one row and one column",
        ));
    }
    match spec.into() {
        MatrixSpec::Scalar(v) => {
            SkylineMatrix::splat(SkylineParameter::constant(v), num_rows, num_cols)
        }
        MatrixSpec::Parameter(param) => SkylineMatrix::splat(param, num_rows, num_cols),
        MatrixSpec::PerRow(vector) => {
            if vector.len() != num_rows {
                return Err(TreesimError::config(format!(
                    "cannot broadcast a vector of length {} to matrix shape {num_rows}x{num_cols}",
                    vector.len()
                )));
            }
            let rows = vector
                .iter()
                .map(|param| SkylineVector::splat(param.clone(), num_cols))
                .collect::<Result<Vec<_>, _>>()?;
            SkylineMatrix::new(rows)
        }
        MatrixSpec::Rows(rows) => {
            if rows.len() != num_rows {
                return Err(TreesimError::config(format!(
                    "expected {num_rows} matrix rows, got {}",
                    rows.len()
                )));
            }
            let rows = rows
                .into_iter()
                .map(|row| skyline_vector(VectorSpec::Entries(row), num_cols))
                .collect::<Result<Vec<_>, _>>()?;
            SkylineMatrix::new(rows)
        }
        MatrixSpec::Matrix(matrix) => {
            if matrix.num_rows() != num_rows || matrix.num_cols() != num_cols {
                return Err(TreesimError::config(format!(
                    "expected a {num_rows}x{num_cols} matrix, got {}x{}",
                    matrix.num_rows(),
                    matrix.num_cols()
                )));
            }
            Ok(matrix)
        }
    }
}
