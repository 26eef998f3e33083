//! Parameterization factories for named birth-death models.
//!
//! Each factory assembles a fully configured [`Model`] with its events
//! registered; rate algebra between the published parameterizations (
//! reproduction numbers, periods, proportions) and the canonical
//! birth/death/sampling/migration rates is carried out on skyline values,
//! so stepwise parameters propagate through every derived rate.
//!
//! # Examples
//!
//! ```
//! use treesim::models;
//!
//! // Single-type birth-death with incomplete sampling.
//! let model = models::bd(2.0, 2.0, 0.5).unwrap();
//! assert_eq!(model.events().len(), 3);
//!
//! // The derived transmission rate is R * (1 / infectious period).
//! let birth = model.events()[0].rate().unwrap();
//! assert_eq!(birth.value_at_time(0.0), 1.0);
//! ```

use std::collections::BTreeMap;

use crate::events::{Birth, Death, Event, Firings, Migration, Sampling, Transmission};
use crate::skyline::{
    skyline_matrix, skyline_parameter, skyline_vector, MatrixSpec, ParameterSpec,
    SkylineMatrix, VectorSpec,
};
use crate::state::{Model, StateFilter};
use crate::TreesimError;

/// Label of the infectious population in the epidemiological models.
pub const INFECTIOUS_STATE: &str = "I";
/// Label of the exposed population in the BDEI model.
pub const EXPOSED_STATE: &str = "E";
/// Label of the superspreader population in the BDSS model.
pub const SUPERSPREADER_STATE: &str = "S";
/// Model-metadata key holding the remaining susceptibles of an SIR run.
pub const SUSCEPTIBLES_KEY: &str = "susceptibles";

fn off_diagonal(
    spec: MatrixSpec,
    num_states: usize,
) -> Result<SkylineMatrix, TreesimError> {
    if num_states < 2 {
        return Err(TreesimError::config(
            "rates among states need at least two states",
        ));
    }
    skyline_matrix(spec, num_states, num_states - 1)
}

fn check_init_state(states: &[&str], init_state: &str) -> Result<(), TreesimError> {
    if !states.contains(&init_state) {
        return Err(TreesimError::config(format!(
            "unknown initial state {init_state:?} (expected one of {states:?})"
        )));
    }
    Ok(())
}

/// The canonical multi-type birth-death-sampling model.
///
/// One birth, death and sampling event per state; optional migrations and
/// cross-state births for every ordered pair of distinct states. The
/// matrices are laid out with one row per source state and one column per
/// *other* state, in state order.
pub fn canonical(
    states: &[&str],
    init_state: &str,
    birth_rates: impl Into<VectorSpec>,
    death_rates: impl Into<VectorSpec>,
    sampling_rates: impl Into<VectorSpec>,
    remove_after_sampling: bool,
    migration_rates: Option<MatrixSpec>,
    birth_rates_among_states: Option<MatrixSpec>,
) -> Result<Model, TreesimError> {
    let num_states = states.len();
    if num_states == 0 {
        return Err(TreesimError::config("a model needs at least one state"));
    }
    check_init_state(states, init_state)?;

    let birth_rates = skyline_vector(birth_rates, num_states)?;
    let death_rates = skyline_vector(death_rates, num_states)?;
    let sampling_rates = skyline_vector(sampling_rates, num_states)?;

    let mut model = Model::new(init_state);
    for (i, &state) in states.iter().enumerate() {
        model.add_event(Event::stochastic(
            birth_rates[i].clone(),
            Birth::new(state, state),
        )?);
        model.add_event(Event::stochastic(
            death_rates[i].clone(),
            Death::new(Some(StateFilter::exact(state))),
        )?);
        model.add_event(Event::stochastic(
            sampling_rates[i].clone(),
            Sampling::new(Some(StateFilter::exact(state)), remove_after_sampling),
        )?);
    }

    if let Some(spec) = migration_rates {
        let rates = off_diagonal(spec, num_states)?;
        for (i, &state) in states.iter().enumerate() {
            for (j, target) in states.iter().copied().filter(|t| *t != state).enumerate() {
                model.add_event(Event::stochastic(
                    rates.get(i, j).clone(),
                    Migration::new(Some(StateFilter::exact(state)), target),
                )?);
            }
        }
    }

    if let Some(spec) = birth_rates_among_states {
        let rates = off_diagonal(spec, num_states)?;
        for (i, &state) in states.iter().enumerate() {
            for (j, target) in states.iter().copied().filter(|t| *t != state).enumerate() {
                model.add_event(Event::stochastic(
                    rates.get(i, j).clone(),
                    Birth::new(state, target),
                )?);
            }
        }
    }

    Ok(model)
}

/// The epidemiological parameterization, reduced to [`canonical`] via
///
/// * `birth = R * b`,
/// * `sampling = b * p`,
/// * `death = b - sampling`,
/// * `cross-birth = R_cross * b` (per source row),
///
/// with `b` the become-uninfectious rates and sampling-with-removal.
pub fn epidemiological(
    states: &[&str],
    init_state: &str,
    reproduction_numbers: impl Into<VectorSpec>,
    become_uninfectious_rates: impl Into<VectorSpec>,
    sampling_proportions: impl Into<VectorSpec>,
    migration_rates: Option<MatrixSpec>,
    reproduction_numbers_among_states: Option<MatrixSpec>,
) -> Result<Model, TreesimError> {
    let num_states = states.len();
    if num_states == 0 {
        return Err(TreesimError::config("a model needs at least one state"));
    }

    let reproduction_numbers = skyline_vector(reproduction_numbers, num_states)?;
    let become_uninfectious = skyline_vector(become_uninfectious_rates, num_states)?;
    let sampling_proportions = skyline_vector(sampling_proportions, num_states)?;

    let birth_rates = reproduction_numbers * become_uninfectious.clone();
    let sampling_rates = become_uninfectious.clone() * sampling_proportions;
    let death_rates = become_uninfectious.clone() - sampling_rates.clone();
    let cross_births = match reproduction_numbers_among_states {
        Some(spec) => Some(MatrixSpec::from(
            off_diagonal(spec, num_states)? * become_uninfectious,
        )),
        None => None,
    };

    canonical(
        states,
        init_state,
        birth_rates,
        death_rates,
        sampling_rates,
        true,
        migration_rates,
        cross_births,
    )
}

/// The fossilized-birth-death parameterization, reduced to [`canonical`]
/// via
///
/// * `birth = diversification / (1 - turnover)`,
/// * `death = turnover * birth`,
/// * `sampling = p * death`,
/// * `cross-birth = cross-diversification + death` (per source row),
///
/// with sampling-without-removal.
pub fn fbd(
    states: &[&str],
    init_state: &str,
    diversification: impl Into<VectorSpec>,
    turnover: impl Into<VectorSpec>,
    sampling_proportions: impl Into<VectorSpec>,
    migration_rates: Option<MatrixSpec>,
    diversification_between_states: Option<MatrixSpec>,
) -> Result<Model, TreesimError> {
    let num_states = states.len();
    if num_states == 0 {
        return Err(TreesimError::config("a model needs at least one state"));
    }

    let diversification = skyline_vector(diversification, num_states)?;
    let turnover = skyline_vector(turnover, num_states)?;
    let sampling_proportions = skyline_vector(sampling_proportions, num_states)?;

    let birth_rates = diversification / (1.0 - turnover.clone());
    let death_rates = turnover * birth_rates.clone();
    let sampling_rates = sampling_proportions * death_rates.clone();
    let cross_births = match diversification_between_states {
        Some(spec) => Some(MatrixSpec::from(
            off_diagonal(spec, num_states)? + death_rates.clone(),
        )),
        None => None,
    };

    canonical(
        states,
        init_state,
        birth_rates,
        death_rates,
        sampling_rates,
        false,
        migration_rates,
        cross_births,
    )
}

/// Single-type birth-death: one infectious state `I`, with
/// `become_uninfectious = 1 / infectious_period`.
pub fn bd(
    reproduction_number: impl Into<ParameterSpec>,
    infectious_period: impl Into<ParameterSpec>,
    sampling_proportion: impl Into<ParameterSpec>,
) -> Result<Model, TreesimError> {
    let reproduction_number = skyline_parameter(reproduction_number)?;
    let infectious_period = skyline_parameter(infectious_period)?;
    let sampling_proportion = skyline_parameter(sampling_proportion)?;
    epidemiological(
        &[INFECTIOUS_STATE],
        INFECTIOUS_STATE,
        reproduction_number,
        1.0 / infectious_period,
        sampling_proportion,
        None,
        None,
    )
}

/// Birth-death with an exposed (non-infectious, unsampled) compartment.
///
/// States `E` and `I`: incubation ends via migration `E -> I` at rate
/// `1 / incubation_period`; infectious lineages transmit via cross-births
/// `I -> (I, E)` at rate `R / infectious_period`; sampling happens in `I`
/// only.
pub fn bdei(
    init_state: &str,
    reproduction_number: impl Into<ParameterSpec>,
    infectious_period: impl Into<ParameterSpec>,
    incubation_period: impl Into<ParameterSpec>,
    sampling_proportion: impl Into<ParameterSpec>,
) -> Result<Model, TreesimError> {
    let states = [EXPOSED_STATE, INFECTIOUS_STATE];
    check_init_state(&states, init_state)?;

    let reproduction_number = skyline_parameter(reproduction_number)?;
    let infectious_period = skyline_parameter(infectious_period)?;
    let incubation_period = skyline_parameter(incubation_period)?;
    let sampling_proportion = skyline_parameter(sampling_proportion)?;

    epidemiological(
        &states,
        init_state,
        0.0,
        VectorSpec::Entries(vec![0.0.into(), (1.0 / infectious_period).into()]),
        VectorSpec::Entries(vec![0.0.into(), sampling_proportion.into()]),
        Some(MatrixSpec::Rows(vec![
            vec![(1.0 / incubation_period).into()],
            vec![0.0.into()],
        ])),
        Some(MatrixSpec::Rows(vec![
            vec![0.0.into()],
            vec![reproduction_number.into()],
        ])),
    )
}

/// Birth-death with superspreading.
///
/// States `I` and `S`; the overall reproduction number is apportioned by
/// the superspreading ratio `r` and superspreader fraction `f` as
///
/// * `R_IS = R * f / (1 + r*f - f)`,
/// * `R_SI = (R - r * R_IS) * r`,
/// * `R_S = r * R_IS`,
/// * `R_I = R_SI / r`.
pub fn bdss(
    init_state: &str,
    reproduction_number: impl Into<ParameterSpec>,
    infectious_period: impl Into<ParameterSpec>,
    superspreading_ratio: impl Into<ParameterSpec>,
    superspreaders_proportion: impl Into<ParameterSpec>,
    sampling_proportion: impl Into<ParameterSpec>,
) -> Result<Model, TreesimError> {
    let states = [INFECTIOUS_STATE, SUPERSPREADER_STATE];
    check_init_state(&states, init_state)?;

    let reproduction_number = skyline_parameter(reproduction_number)?;
    let infectious_period = skyline_parameter(infectious_period)?;
    let r_ss = skyline_parameter(superspreading_ratio)?;
    let f_ss = skyline_parameter(superspreaders_proportion)?;
    let sampling_proportion = skyline_parameter(sampling_proportion)?;

    let r_is = reproduction_number.clone() * f_ss.clone()
        / (1.0 + r_ss.clone() * f_ss.clone() - f_ss);
    let r_si = (reproduction_number - r_ss.clone() * r_is.clone()) * r_ss.clone();
    let r_s = r_ss.clone() * r_is.clone();
    let r_i = r_si.clone() / r_ss;

    epidemiological(
        &states,
        init_state,
        VectorSpec::Entries(vec![r_i.into(), r_s.into()]),
        1.0 / infectious_period,
        sampling_proportion,
        None,
        Some(MatrixSpec::Rows(vec![vec![r_is.into()], vec![r_si.into()]])),
    )
}

/// The density-dependent SIR model with a finite susceptible pool.
///
/// A single infectious state seeded with one lineage; transmission
/// propensity scales with the remaining susceptibles tracked in the model
/// metadata, recovery removes a lineage, and sampling removes the sampled
/// lineage.
pub fn sir(
    transmission_rate: impl Into<ParameterSpec>,
    recovery_rate: impl Into<ParameterSpec>,
    sampling_rate: impl Into<ParameterSpec>,
    susceptibles: u64,
) -> Result<Model, TreesimError> {
    let mut metadata = BTreeMap::new();
    metadata.insert(SUSCEPTIBLES_KEY.to_string(), susceptibles as f64);
    let mut model = Model::with_metadata(INFECTIOUS_STATE, metadata);
    model.add_event(Event::stochastic(
        skyline_parameter(transmission_rate)?,
        Transmission::new(INFECTIOUS_STATE, SUSCEPTIBLES_KEY),
    )?);
    model.add_event(Event::stochastic(
        skyline_parameter(recovery_rate)?,
        Death::new(Some(StateFilter::exact(INFECTIOUS_STATE))),
    )?);
    model.add_event(Event::stochastic(
        skyline_parameter(sampling_rate)?,
        Sampling::new(Some(StateFilter::exact(INFECTIOUS_STATE)), true),
    )?);
    Ok(model)
}

/// A scheduled sampling sweep over the active lineages in `state` (or all
/// of them) at each of `times`.
pub fn timed_sampling(
    times: Vec<f64>,
    state: Option<StateFilter>,
    firings: Firings,
    removal: bool,
) -> Result<Event, TreesimError> {
    Event::timed(times, firings, Sampling::new(state, removal))
}

/// A scheduled death sweep over the active lineages in `state` (or all of
/// them) at each of `times`.
pub fn timed_death(
    times: Vec<f64>,
    state: Option<StateFilter>,
    firings: Firings,
) -> Result<Event, TreesimError> {
    Event::timed(times, firings, Death::new(state))
}
