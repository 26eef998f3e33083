//! Polymorphic stochastic and scheduled events.
//!
//! A stochastic event pairs a skyline rate with a [`Reaction`]; its
//! instantaneous propensity is `rate(t) * reactant_combinations(state)`
//! and firing times are drawn from the exponential clock of the current
//! constant rate segment. The draw is never carried across a rate
//! boundary: when the clamped firing time lands on one of the event's own
//! change times nothing is applied and the clock is re-drawn on the new
//! segment, which keeps the process unbiased under stepwise rates.
//!
//! A scheduled ([`TimedEvent`]) event fires deterministically at each of
//! its prescribed times instead, applying a configured number of firings
//! drawn without replacement.

use serde::Deserialize;

use crate::skyline::SkylineParameter;
use crate::state::{Model, StateFilter};
use crate::{NodeId, TreesimError};

/// Behavior of a stochastic event.
pub trait Reaction: Send {
    /// Combinatorial multiplicity of the reaction at current population
    /// sizes.
    fn reactant_combinations(&self, model: &Model) -> usize;

    /// Mutate the state; invoked when and only when the event fires.
    fn apply(&self, model: &mut Model) -> Result<(), TreesimError>;
}

/// Behavior of a scheduled event.
pub trait TimedReaction: Send {
    /// Upper bound on firings at the current state.
    fn max_firings(&self, model: &Model) -> usize;

    /// Apply `firings` repetitions at the current instant.
    fn apply_firings(&self, model: &mut Model, firings: usize) -> Result<(), TreesimError>;
}

/// How many times a scheduled event fires per fire time: an absolute
/// count (capped at `max_firings`) or a fraction of `max_firings`,
/// rounded down.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(untagged)]
pub enum Firings {
    Count(usize),
    Fraction(f64),
}

/// One registered event of a model.
pub enum Event {
    Stochastic(StochasticEvent),
    Timed(TimedEvent),
}

impl Event {
    /// A stochastic event with the given rate and reaction.
    ///
    /// # Errors
    ///
    /// [`TreesimError::Config`] when the rate takes a negative value.
    pub fn stochastic(
        rate: SkylineParameter,
        reaction: impl Reaction + 'static,
    ) -> Result<Self, TreesimError> {
        Ok(Event::Stochastic(StochasticEvent::new(
            rate,
            Box::new(reaction),
        )?))
    }

    /// A scheduled event firing at each of `times`.
    ///
    /// # Errors
    ///
    /// [`TreesimError::Config`] when a fire time is negative or a
    /// fractional firing count is outside `[0, 1]`.
    pub fn timed(
        times: Vec<f64>,
        firings: Firings,
        reaction: impl TimedReaction + 'static,
    ) -> Result<Self, TreesimError> {
        Ok(Event::Timed(TimedEvent::new(
            times,
            firings,
            Box::new(reaction),
        )?))
    }

    /// The skyline rate of a stochastic event.
    pub fn rate(&self) -> Option<&SkylineParameter> {
        match self {
            Event::Stochastic(event) => Some(event.rate()),
            Event::Timed(_) => None,
        }
    }

    /// The fire times of a scheduled event.
    pub fn fire_times(&self) -> Option<&[f64]> {
        match self {
            Event::Stochastic(_) => None,
            Event::Timed(event) => Some(event.fire_times()),
        }
    }

    /// The next time this event fires strictly after the model's current
    /// time, or `None` when it never will.
    pub fn next_firing_time(&self, model: &mut Model) -> Result<Option<f64>, TreesimError> {
        match self {
            Event::Stochastic(event) => event.next_firing_time(model),
            Event::Timed(event) => Ok(event.next_firing_time(model)),
        }
    }

    /// Apply the event at the model's current time.
    pub fn apply(&self, model: &mut Model) -> Result<(), TreesimError> {
        match self {
            Event::Stochastic(event) => event.apply(model),
            Event::Timed(event) => event.apply(model),
        }
    }
}

/// A reaction firing from the exponential clock of a skyline rate.
pub struct StochasticEvent {
    rate: SkylineParameter,
    reaction: Box<dyn Reaction + Send>,
}

impl StochasticEvent {
    /// # Errors
    ///
    /// [`TreesimError::Config`] when the rate takes a negative value.
    pub fn new(
        rate: SkylineParameter,
        reaction: Box<dyn Reaction + Send>,
    ) -> Result<Self, TreesimError> {
        if rate.value().iter().any(|v| *v < 0.0) {
            return Err(TreesimError::config(format!(
                "event rates must be non-negative (got {:?})",
                rate.value()
            )));
        }
        Ok(Self { rate, reaction })
    }

    /// The skyline rate of the event.
    pub fn rate(&self) -> &SkylineParameter {
        &self.rate
    }

    /// Draw the next firing time for the current constant rate segment.
    ///
    /// Zero propensity yields the next rate change time, so the clock
    /// re-anchors where the rate (or the population) may turn the event
    /// back on; otherwise the exponential draw is clamped to the boundary.
    pub fn next_firing_time(&self, model: &mut Model) -> Result<Option<f64>, TreesimError> {
        let now = model.current_time();
        let next_change = self.rate.next_change_time(now);
        let propensity =
            self.rate.value_at_time(now) * self.reaction.reactant_combinations(model) as f64;
        if propensity == 0.0 {
            return Ok(next_change);
        }
        let firing = now + model.sample_exp(propensity)?;
        Ok(Some(match next_change {
            Some(change) => firing.min(change),
            None => firing,
        }))
    }

    /// Apply the reaction, unless the current time is one of the rate's
    /// own change times (a pure re-draw anchor).
    pub fn apply(&self, model: &mut Model) -> Result<(), TreesimError> {
        if self.rate.change_times().contains(&model.current_time()) {
            return Ok(());
        }
        self.reaction.apply(model)
    }
}

/// A reaction firing deterministically at prescribed times.
pub struct TimedEvent {
    times: Vec<f64>,
    firings: Firings,
    reaction: Box<dyn TimedReaction + Send>,
}

impl TimedEvent {
    /// # Errors
    ///
    /// [`TreesimError::Config`] when a fire time is negative or a
    /// fractional firing count is outside `[0, 1]`.
    pub fn new(
        mut times: Vec<f64>,
        firings: Firings,
        reaction: Box<dyn TimedReaction + Send>,
    ) -> Result<Self, TreesimError> {
        if times.iter().any(|t| *t < 0.0) {
            return Err(TreesimError::config("fire times must be non-negative"));
        }
        if let Firings::Fraction(fraction) = firings {
            if !(0.0..=1.0).contains(&fraction) {
                return Err(TreesimError::config(format!(
                    "a fractional firing count must lie in [0, 1] (got {fraction})"
                )));
            }
        }
        times.sort_by(f64::total_cmp);
        Ok(Self {
            times,
            firings,
            reaction,
        })
    }

    /// The sorted fire times of the event.
    pub fn fire_times(&self) -> &[f64] {
        &self.times
    }

    /// The first fire time strictly after the model's current time.
    pub fn next_firing_time(&self, model: &Model) -> Option<f64> {
        let now = model.current_time();
        self.times.iter().copied().find(|t| *t > now)
    }

    /// Apply the configured number of firings at the current instant.
    pub fn apply(&self, model: &mut Model) -> Result<(), TreesimError> {
        let max_firings = self.reaction.max_firings(model);
        let firings = match self.firings {
            Firings::Count(count) => count.min(max_firings),
            Firings::Fraction(fraction) => (fraction * max_firings as f64).floor() as usize,
        };
        self.reaction.apply_firings(model, firings)
    }
}

/// A reaction drawing one active lineage (optionally filtered by state).
///
/// `impl_single_reactant_event!` derives both the stochastic and the
/// scheduled contract from this trait: the multiplicity is the filtered
/// active count, a stochastic firing draws one lineage uniformly, and a
/// scheduled firing draws the requested number without replacement.
pub trait SingleReactant: Send {
    /// The state filter restricting eligible lineages, if any.
    fn filter(&self) -> Option<&StateFilter>;

    /// Apply the reaction to one drawn lineage.
    fn apply_to_node(&self, model: &mut Model, node: NodeId) -> Result<(), TreesimError>;
}

/// Remove one active lineage (death / recovery / extinction).
pub struct Death {
    state: Option<StateFilter>,
}

impl Death {
    pub fn new(state: Option<StateFilter>) -> Self {
        Self { state }
    }
}

impl SingleReactant for Death {
    fn filter(&self) -> Option<&StateFilter> {
        self.state.as_ref()
    }

    fn apply_to_node(&self, model: &mut Model, node: NodeId) -> Result<(), TreesimError> {
        model.remove(node)
    }
}

impl_single_reactant_event!(Death);

/// Move one active lineage into a target state.
pub struct Migration {
    state: Option<StateFilter>,
    target_state: String,
}

impl Migration {
    pub fn new(state: Option<StateFilter>, target_state: impl Into<String>) -> Self {
        Self {
            state,
            target_state: target_state.into(),
        }
    }
}

impl SingleReactant for Migration {
    fn filter(&self) -> Option<&StateFilter> {
        self.state.as_ref()
    }

    fn apply_to_node(&self, model: &mut Model, node: NodeId) -> Result<(), TreesimError> {
        model.migrate(node, &self.target_state)?;
        Ok(())
    }
}

impl_single_reactant_event!(Migration);

/// Collect one active lineage as a sample.
///
/// With `removal` the lineage ends at the sample. Without it the lineage
/// survives: a zero-length child branch is split off and sampled, so the
/// pruned tree gets a named sampled leaf coincident in time with its
/// ancestor.
pub struct Sampling {
    state: Option<StateFilter>,
    removal: bool,
}

impl Sampling {
    pub fn new(state: Option<StateFilter>, removal: bool) -> Self {
        Self { state, removal }
    }
}

impl SingleReactant for Sampling {
    fn filter(&self) -> Option<&StateFilter> {
        self.state.as_ref()
    }

    fn apply_to_node(&self, model: &mut Model, node: NodeId) -> Result<(), TreesimError> {
        if self.removal {
            model.sample(node)
        } else {
            let state = model.state_of(node)?;
            let (_stem, sample) = model.birth_from(node, &state)?;
            model.sample(sample)
        }
    }
}

impl_single_reactant_event!(Sampling);

/// Branch one lineage in `parent_state` into a new child in
/// `child_state`.
pub struct Birth {
    child_state: String,
    parent: StateFilter,
}

impl Birth {
    pub fn new(parent_state: impl Into<String>, child_state: impl Into<String>) -> Self {
        Self {
            child_state: child_state.into(),
            parent: StateFilter::Exact(parent_state.into()),
        }
    }
}

impl Reaction for Birth {
    fn reactant_combinations(&self, model: &Model) -> usize {
        model.count_active_nodes(Some(&self.parent))
    }

    fn apply(&self, model: &mut Model) -> Result<(), TreesimError> {
        let parent = model.draw_active_node(Some(&self.parent))?;
        model.birth_from(parent, &self.child_state)?;
        Ok(())
    }
}

/// Density-dependent transmission: an infectious lineage converts one of
/// a finite pool of susceptibles into a new infectious lineage.
///
/// The multiplicity is `susceptibles_remaining * infectious_count`; each
/// firing decrements the susceptible pool held in the model's scratch
/// metadata.
pub struct Transmission {
    infectious_state: String,
    susceptibles_key: String,
    infectious: StateFilter,
}

impl Transmission {
    pub fn new(infectious_state: impl Into<String>, susceptibles_key: impl Into<String>) -> Self {
        let infectious_state = infectious_state.into();
        Self {
            infectious: StateFilter::Exact(infectious_state.clone()),
            infectious_state,
            susceptibles_key: susceptibles_key.into(),
        }
    }
}

impl Reaction for Transmission {
    fn reactant_combinations(&self, model: &Model) -> usize {
        let susceptibles = model
            .metadata_value(&self.susceptibles_key)
            .unwrap_or(0.0)
            .max(0.0) as usize;
        susceptibles * model.count_active_nodes(Some(&self.infectious))
    }

    fn apply(&self, model: &mut Model) -> Result<(), TreesimError> {
        let susceptibles = model
            .metadata_value(&self.susceptibles_key)
            .ok_or_else(|| {
                TreesimError::state(format!(
                    "missing {:?} in the model metadata",
                    self.susceptibles_key
                ))
            })?;
        model.set_metadata(self.susceptibles_key.clone(), susceptibles - 1.0);
        let parent = model.draw_active_node(Some(&self.infectious))?;
        model.birth_from(parent, &self.infectious_state)?;
        Ok(())
    }
}
