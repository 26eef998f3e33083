use crate::skyline::parameter::SkylineParameter;
use crate::skyline::vector::SkylineVector;
use crate::TreesimError;

/// A rows-by-cols grid of [`SkylineParameter`]s.
///
/// Stored as rows of equal-length [`SkylineVector`]s. Matrices combine
/// elementwise with matrices of the same shape and broadcast against
/// vectors, parameters and `f64`s on either side. A vector operand whose
/// length equals the number of rows is applied one entry per row; a vector
/// whose length equals the number of columns is applied one entry per
/// column. For square matrices the row interpretation wins.
///
/// # Panics
///
/// The arithmetic operators panic on a shape mismatch: matrix operands of
/// different shapes, or a vector operand matching neither dimension.
#[derive(Clone, Debug, PartialEq)]
pub struct SkylineMatrix {
    rows: Vec<SkylineVector>,
}

impl SkylineMatrix {
    /// Build a matrix from its rows.
    ///
    /// # Errors
    ///
    /// [`TreesimError::Config`] when there are no rows or the rows have
    /// different lengths.
    pub fn new(rows: Vec<SkylineVector>) -> Result<Self, TreesimError> {
        if rows.is_empty() {
            return Err(TreesimError::config("a skyline matrix needs at least one row"));
        }
        let width = rows[0].len();
        if rows.iter().any(|row| row.len() != width) {
            return Err(TreesimError::config(format!(
                "all rows of a skyline matrix must have the same length (got {:?})",
                rows.iter().map(SkylineVector::len).collect::<Vec<_>>()
            )));
        }
        Ok(Self { rows })
    }

    /// A matrix whose entries all equal `param`.
    pub fn splat(
        param: SkylineParameter,
        num_rows: usize,
        num_cols: usize,
    ) -> Result<Self, TreesimError> {
        if num_rows == 0 || num_cols == 0 {
            return Err(TreesimError::config(
                "a skyline matrix needs at least one row and one column",
            ));
        }
        let row = SkylineVector::splat(param, num_cols)?;
        Ok(Self {
            rows: vec![row; num_rows],
        })
    }

    /// The number of rows.
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// The number of columns.
    pub fn num_cols(&self) -> usize {
        self.rows[0].len()
    }

    /// The rows of the matrix.
    pub fn rows(&self) -> &[SkylineVector] {
        &self.rows
    }

    /// The row at `index`.
    pub fn row(&self, index: usize) -> &SkylineVector {
        &self.rows[index]
    }

    /// The entry at (`row`, `col`).
    pub fn get(&self, row: usize, col: usize) -> &SkylineParameter {
        &self.rows[row][col]
    }

    /// Sorted union of the entries' change times.
    pub fn change_times(&self) -> Vec<f64> {
        let mut times: Vec<f64> = self
            .rows
            .iter()
            .flat_map(|row| row.change_times())
            .collect();
        times.sort_by(f64::total_cmp);
        times.dedup();
        times
    }

    /// The grid of entry values at `time`, row by row.
    ///
    /// # Panics
    ///
    /// Panics if `time` is negative.
    pub fn value_at_time(&self, time: f64) -> Vec<Vec<f64>> {
        self.rows.iter().map(|row| row.value_at_time(time)).collect()
    }

    /// Whether every entry is identically zero.
    pub fn is_zero(&self) -> bool {
        self.rows.iter().all(SkylineVector::is_zero)
    }

    pub(crate) fn combine(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> Self {
        assert!(
            self.num_rows() == other.num_rows() && self.num_cols() == other.num_cols(),
            "cannot operate on skyline matrices of different shapes \
             ({}x{} vs {}x{})",
            self.num_rows(),
            self.num_cols(),
            other.num_rows(),
            other.num_cols()
        );
        Self {
            rows: self
                .rows
                .iter()
                .zip(other.rows.iter())
                .map(|(a, b)| a.combine(b, &f))
                .collect(),
        }
    }

    // Row-count matches take precedence over column-count matches, so a
    // square matrix broadcasts a same-length vector one entry per row.
    pub(crate) fn combine_vector(
        &self,
        vector: &SkylineVector,
        f: impl Fn(f64, f64) -> f64,
    ) -> Self {
        if vector.len() == self.num_rows() {
            Self {
                rows: self
                    .rows
                    .iter()
                    .enumerate()
                    .map(|(i, row)| row.combine_param(&vector[i], &f))
                    .collect(),
            }
        } else if vector.len() == self.num_cols() {
            Self {
                rows: self.rows.iter().map(|row| row.combine(vector, &f)).collect(),
            }
        } else {
            panic!(
                "cannot broadcast a skyline vector of length {} to matrix shape {}x{}",
                vector.len(),
                self.num_rows(),
                self.num_cols()
            );
        }
    }

    pub(crate) fn combine_param(
        &self,
        param: &SkylineParameter,
        f: impl Fn(f64, f64) -> f64,
    ) -> Self {
        Self {
            rows: self
                .rows
                .iter()
                .map(|row| row.combine_param(param, &f))
                .collect(),
        }
    }
}

impl_skyline_ops!(
    SkylineMatrix,
    SkylineMatrix,
    SkylineMatrix,
    |a: SkylineMatrix, b: SkylineMatrix, f: fn(f64, f64) -> f64| a.combine(&b, f)
);
impl_skyline_ops!(
    SkylineMatrix,
    SkylineVector,
    SkylineMatrix,
    |a: SkylineMatrix, b: SkylineVector, f: fn(f64, f64) -> f64| a.combine_vector(&b, f)
);
impl_skyline_ops!(
    SkylineVector,
    SkylineMatrix,
    SkylineMatrix,
    |a: SkylineVector, b: SkylineMatrix, f: fn(f64, f64) -> f64| b
        .combine_vector(&a, move |x, y| f(y, x))
);
impl_skyline_ops!(
    SkylineMatrix,
    SkylineParameter,
    SkylineMatrix,
    |a: SkylineMatrix, b: SkylineParameter, f: fn(f64, f64) -> f64| a.combine_param(&b, f)
);
impl_skyline_ops!(
    SkylineParameter,
    SkylineMatrix,
    SkylineMatrix,
    |a: SkylineParameter, b: SkylineMatrix, f: fn(f64, f64) -> f64| b
        .combine_param(&a, move |x, y| f(y, x))
);
impl_skyline_ops!(
    SkylineMatrix,
    f64,
    SkylineMatrix,
    |a: SkylineMatrix, b: f64, f: fn(f64, f64) -> f64| a
        .combine_param(&SkylineParameter::constant(b), f)
);
impl_skyline_ops!(
    f64,
    SkylineMatrix,
    SkylineMatrix,
    |a: f64, b: SkylineMatrix, f: fn(f64, f64) -> f64| b
        .combine_param(&SkylineParameter::constant(a), move |x, y| f(y, x))
);
