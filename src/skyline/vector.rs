use crate::skyline::parameter::SkylineParameter;
use crate::TreesimError;

/// An ordered sequence of [`SkylineParameter`]s.
///
/// The vector's change-time set is the sorted union of its entries' change
/// times; its value at a time is the vector of entry values at that time.
/// Vectors combine elementwise with vectors of the same length and
/// broadcast against parameters and `f64`s on either side.
///
/// # Panics
///
/// The arithmetic operators panic when both operands are vectors of
/// different lengths.
#[derive(Clone, Debug, PartialEq)]
pub struct SkylineVector {
    params: Vec<SkylineParameter>,
}

impl SkylineVector {
    /// Build a vector from its entries.
    ///
    /// # Errors
    ///
    /// [`TreesimError::Config`] when `params` is empty.
    pub fn new(params: Vec<SkylineParameter>) -> Result<Self, TreesimError> {
        if params.is_empty() {
            return Err(TreesimError::config(
                "a skyline vector needs at least one entry",
            ));
        }
        Ok(Self { params })
    }

    /// A vector of `len` copies of `param`.
    pub fn splat(param: SkylineParameter, len: usize) -> Result<Self, TreesimError> {
        if len == 0 {
            return Err(TreesimError::config(
                "a skyline vector needs at least one entry",
            ));
        }
        Ok(Self {
            params: vec![param; len],
        })
    }

    /// Build a vector from per-segment values plus shared change times.
    ///
    /// `value[i]` is the whole vector on segment `i`; entry `j` of the
    /// result steps through `value[0][j], value[1][j], ..` over time.
    ///
    /// # Errors
    ///
    /// [`TreesimError::Config`] on segment/change-time length mismatch,
    /// ragged segments, or invalid change times.
    pub fn from_piecewise(
        value: Vec<Vec<f64>>,
        change_times: Vec<f64>,
    ) -> Result<Self, TreesimError> {
        if value.len() != change_times.len() + 1 {
            return Err(TreesimError::config(format!(
                "`value` must have exactly one more segment than `change_times` \
                 (got {} segments and {} change times)",
                value.len(),
                change_times.len()
            )));
        }
        let width = value[0].len();
        if width == 0 {
            return Err(TreesimError::config(
                "a skyline vector needs at least one entry",
            ));
        }
        if value.iter().any(|segment| segment.len() != width) {
            return Err(TreesimError::config(format!(
                "all segments must have the same length (got {:?})",
                value.iter().map(Vec::len).collect::<Vec<_>>()
            )));
        }
        let mut params = Vec::with_capacity(width);
        for j in 0..width {
            let column = value.iter().map(|segment| segment[j]).collect();
            params.push(SkylineParameter::new(column, change_times.clone())?);
        }
        Self::new(params)
    }

    /// The number of entries.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// The entries of the vector.
    pub fn params(&self) -> &[SkylineParameter] {
        &self.params
    }

    /// Iterate over the entries.
    pub fn iter(&self) -> std::slice::Iter<'_, SkylineParameter> {
        self.params.iter()
    }

    /// Sorted union of the entries' change times.
    pub fn change_times(&self) -> Vec<f64> {
        let mut times: Vec<f64> = self
            .params
            .iter()
            .flat_map(|p| p.change_times().iter().copied())
            .collect();
        times.sort_by(f64::total_cmp);
        times.dedup();
        times
    }

    /// The vector of entry values at `time`.
    ///
    /// # Panics
    ///
    /// Panics if `time` is negative.
    pub fn value_at_time(&self, time: f64) -> Vec<f64> {
        self.params.iter().map(|p| p.value_at_time(time)).collect()
    }

    /// Whether every entry is identically zero.
    pub fn is_zero(&self) -> bool {
        self.params.iter().all(SkylineParameter::is_zero)
    }

    pub(crate) fn combine(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> Self {
        assert_eq!(
            self.len(),
            other.len(),
            "cannot operate on skyline vectors of different lengths"
        );
        Self {
            params: self
                .params
                .iter()
                .zip(other.params.iter())
                .map(|(a, b)| a.combine(b, &f))
                .collect(),
        }
    }

    pub(crate) fn combine_param(
        &self,
        param: &SkylineParameter,
        f: impl Fn(f64, f64) -> f64,
    ) -> Self {
        Self {
            params: self.params.iter().map(|p| p.combine(param, &f)).collect(),
        }
    }
}

impl std::ops::Index<usize> for SkylineVector {
    type Output = SkylineParameter;

    fn index(&self, index: usize) -> &Self::Output {
        &self.params[index]
    }
}

impl<'a> IntoIterator for &'a SkylineVector {
    type Item = &'a SkylineParameter;
    type IntoIter = std::slice::Iter<'a, SkylineParameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl_skyline_ops!(
    SkylineVector,
    SkylineVector,
    SkylineVector,
    |a: SkylineVector, b: SkylineVector, f: fn(f64, f64) -> f64| a.combine(&b, f)
);
impl_skyline_ops!(
    SkylineVector,
    SkylineParameter,
    SkylineVector,
    |a: SkylineVector, b: SkylineParameter, f: fn(f64, f64) -> f64| a.combine_param(&b, f)
);
impl_skyline_ops!(
    SkylineParameter,
    SkylineVector,
    SkylineVector,
    |a: SkylineParameter, b: SkylineVector, f: fn(f64, f64) -> f64| b
        .combine_param(&a, move |x, y| f(y, x))
);
impl_skyline_ops!(
    SkylineVector,
    f64,
    SkylineVector,
    |a: SkylineVector, b: f64, f: fn(f64, f64) -> f64| a
        .combine_param(&SkylineParameter::constant(b), f)
);
impl_skyline_ops!(
    f64,
    SkylineVector,
    SkylineVector,
    |a: f64, b: SkylineVector, f: fn(f64, f64) -> f64| b
        .combine_param(&SkylineParameter::constant(a), move |x, y| f(y, x))
);
