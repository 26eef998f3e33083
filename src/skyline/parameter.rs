use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::TreesimError;

/// A piecewise-constant, right-continuous function of time.
///
/// The parameter holds values `v_0, .., v_k` and strictly increasing,
/// positive change times `t_1 < .. < t_k`; `v_i` applies on the interval
/// `[t_i, t_{i+1})` with `t_0 = 0` and `t_{k+1} = +inf`. Instances are
/// always in canonical form: runs of equal adjacent values are collapsed
/// at construction, so structural equality is semantic equality.
///
/// Parameters are closed under `+`, `-`, `*` and `/` with other parameters
/// and with `f64` on either side; the result's change times are the merged
/// change times of the operands.
///
/// # Examples
///
/// ```
/// use treesim::SkylineParameter;
///
/// let a = SkylineParameter::new(vec![3.0, 5.0], vec![1.0]).unwrap();
/// let b = SkylineParameter::new(vec![2.0, 4.0, 1.0], vec![1.0, 3.0]).unwrap();
/// let ab = a * b;
/// assert_eq!(ab.value_at_time(0.0), 6.0);
/// assert_eq!(ab.value_at_time(1.0), 20.0);
/// assert_eq!(ab.value_at_time(3.0), 5.0);
/// assert_eq!(ab.change_times(), &[1.0, 3.0]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct SkylineParameter {
    value: Vec<f64>,
    change_times: Vec<f64>,
}

impl SkylineParameter {
    /// A parameter that holds `value` at every time.
    pub fn constant(value: f64) -> Self {
        Self {
            value: vec![value],
            change_times: Vec::new(),
        }
    }

    /// Build a stepwise parameter from values plus change times.
    ///
    /// # Errors
    ///
    /// [`TreesimError::Config`] when `value` does not have exactly one more
    /// element than `change_times`, or when the change times are not
    /// positive and strictly increasing.
    pub fn new(value: Vec<f64>, change_times: Vec<f64>) -> Result<Self, TreesimError> {
        if value.len() != change_times.len() + 1 {
            return Err(TreesimError::config(format!(
                "`value` must have exactly one more element than `change_times` \
                 (got {} values and {} change times)",
                value.len(),
                change_times.len()
            )));
        }
        if let Some(first) = change_times.first() {
            if !(*first > 0.0) {
                return Err(TreesimError::config(format!(
                    "change times must be positive (got {first})"
                )));
            }
        }
        for pair in change_times.windows(2) {
            if !(pair[1] > pair[0]) {
                return Err(TreesimError::config(format!(
                    "change times must be strictly increasing (got {} followed by {})",
                    pair[0], pair[1]
                )));
            }
        }
        Ok(Self::canonical(value, change_times))
    }

    // Collapse runs of equal adjacent values together with the change time
    // separating them. Callers guarantee shape and ordering.
    fn canonical(value: Vec<f64>, change_times: Vec<f64>) -> Self {
        let mut out_value = Vec::with_capacity(value.len());
        let mut out_times = Vec::with_capacity(change_times.len());
        out_value.push(value[0]);
        for (v, t) in value[1..].iter().zip(change_times.iter()) {
            if *v != out_value[out_value.len() - 1] {
                out_value.push(*v);
                out_times.push(*t);
            }
        }
        Self {
            value: out_value,
            change_times: out_times,
        }
    }

    /// The values of the parameter, one per segment.
    pub fn value(&self) -> &[f64] {
        &self.value
    }

    /// The times at which the parameter changes value.
    pub fn change_times(&self) -> &[f64] {
        &self.change_times
    }

    /// Whether the parameter never changes value.
    pub fn is_constant(&self) -> bool {
        self.change_times.is_empty()
    }

    /// Whether every value of the parameter is zero.
    pub fn is_zero(&self) -> bool {
        self.value.iter().all(|v| *v == 0.0)
    }

    /// The value of the parameter at `time`.
    ///
    /// The lookup is a right-continuous step: at a change time the new
    /// value already applies.
    ///
    /// # Panics
    ///
    /// Panics if `time` is negative.
    pub fn value_at_time(&self, time: f64) -> f64 {
        assert!(time >= 0.0, "time must be non-negative (got {time})");
        let segment = self.change_times.partition_point(|t| *t <= time);
        self.value[segment]
    }

    /// The first change time strictly greater than `time`, if any.
    pub fn next_change_time(&self, time: f64) -> Option<f64> {
        self.change_times.iter().copied().find(|t| *t > time)
    }

    pub(crate) fn combine(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> Self {
        let mut times =
            Vec::with_capacity(self.change_times.len() + other.change_times.len());
        times.extend_from_slice(&self.change_times);
        times.extend_from_slice(&other.change_times);
        times.sort_by(f64::total_cmp);
        times.dedup();
        let mut value = Vec::with_capacity(times.len() + 1);
        value.push(f(self.value_at_time(0.0), other.value_at_time(0.0)));
        for t in &times {
            value.push(f(self.value_at_time(*t), other.value_at_time(*t)));
        }
        Self::canonical(value, times)
    }
}

impl_skyline_ops!(
    SkylineParameter,
    SkylineParameter,
    SkylineParameter,
    |a: SkylineParameter, b: SkylineParameter, f: fn(f64, f64) -> f64| a.combine(&b, f)
);
impl_skyline_ops!(
    SkylineParameter,
    f64,
    SkylineParameter,
    |a: SkylineParameter, b: f64, f: fn(f64, f64) -> f64| a
        .combine(&SkylineParameter::constant(b), f)
);
impl_skyline_ops!(
    f64,
    SkylineParameter,
    SkylineParameter,
    |a: f64, b: SkylineParameter, f: fn(f64, f64) -> f64| SkylineParameter::constant(a)
        .combine(&b, f)
);

impl Serialize for SkylineParameter {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.is_constant() {
            serializer.serialize_f64(self.value[0])
        } else {
            let mut state = serializer.serialize_struct("SkylineParameter", 2)?;
            state.serialize_field("value", &self.value)?;
            state.serialize_field("change_times", &self.change_times)?;
            state.end()
        }
    }
}

impl<'de> Deserialize<'de> for SkylineParameter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let spec = ParameterSpec::deserialize(deserializer)?;
        skyline_parameter(spec).map_err(serde::de::Error::custom)
    }
}

/// The serial/config form of a [`SkylineParameter`]: a bare scalar or a
/// `{value, change_times}` object.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum ParameterSpec {
    /// A constant rate.
    Constant(f64),
    /// A stepwise rate given as values plus change times.
    Piecewise {
        value: Vec<f64>,
        change_times: Vec<f64>,
    },
    /// An already-built parameter, passed through unchanged.
    #[serde(skip)]
    Resolved(SkylineParameter),
}

impl From<f64> for ParameterSpec {
    fn from(value: f64) -> Self {
        ParameterSpec::Constant(value)
    }
}

impl From<SkylineParameter> for ParameterSpec {
    fn from(param: SkylineParameter) -> Self {
        ParameterSpec::Resolved(param)
    }
}

/// Resolve a config-level spec into a canonical [`SkylineParameter`].
///
/// # Errors
///
/// [`TreesimError::Config`] when a piecewise spec violates the shape or
/// ordering invariants.
pub fn skyline_parameter(
    spec: impl Into<ParameterSpec>,
) -> Result<SkylineParameter, TreesimError> {
    match spec.into() {
        ParameterSpec::Constant(v) => Ok(SkylineParameter::constant(v)),
        ParameterSpec::Piecewise {
            value,
            change_times,
        } => SkylineParameter::new(value, change_times),
        ParameterSpec::Resolved(param) => Ok(param),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructor_collapses_duplicate_runs() {
        let p = SkylineParameter::new(vec![3.0, 5.0, 5.0], vec![1.0, 2.0]).unwrap();
        assert_eq!(p.value(), &[3.0, 5.0]);
        assert_eq!(p.change_times(), &[1.0]);

        let p = SkylineParameter::new(vec![5.0, 5.0, 5.0], vec![1.0, 2.0]).unwrap();
        assert_eq!(p.value(), &[5.0]);
        assert!(p.is_constant());
    }

    #[test]
    fn test_lookup_is_right_continuous() {
        let p = SkylineParameter::new(vec![5.0, 2.0, 3.0], vec![1.0, 2.0]).unwrap();
        assert_eq!(p.value_at_time(0.5), 5.0);
        assert_eq!(p.value_at_time(1.0), 2.0);
        assert_eq!(p.value_at_time(2.0), 3.0);
        assert_eq!(p.value_at_time(100.0), 3.0);
    }

    #[test]
    fn test_constant_round_trips_through_serde() {
        let p = SkylineParameter::constant(2.0);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "2.0");
        let back: SkylineParameter = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
