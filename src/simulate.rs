//! The simulation driver: repeated attempts of the Gillespie loop until a
//! tree satisfying the stop and acceptance conditions is produced.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value};

use crate::state::Model;
use crate::tree::Tree;
use crate::TreesimError;

/// Stop conditions for a simulation.
///
/// At least one of `n_leaves` (target number of sampled lineages) and
/// `max_time` (simulation horizon) must be set. `timeout` bounds the wall
/// clock across all attempts; on expiry [`TreesimError::Timeout`] is
/// raised rather than retried.
#[derive(Clone, Debug, Default)]
pub struct SimulateConfig {
    pub n_leaves: Option<usize>,
    pub max_time: Option<f64>,
    pub timeout: Option<f64>,
}

type Acceptance = Box<dyn Fn(&Tree) -> bool>;
type TreeLogger = Box<dyn Fn(&Tree) -> Map<String, Value>>;
type ModelLogger = Box<dyn Fn(&Model) -> Map<String, Value>>;

/// A configured driver for [`Model`] runs.
pub struct Simulator {
    n_leaves: Option<usize>,
    max_time: Option<f64>,
    timeout: Option<f64>,
    acceptance: Option<Acceptance>,
    tree_logs: Option<TreeLogger>,
    model_logs: Option<ModelLogger>,
}

impl Simulator {
    /// # Errors
    ///
    /// [`TreesimError::Config`] when neither `n_leaves` nor `max_time`
    /// is set — the loop would have no stop condition.
    pub fn new(config: SimulateConfig) -> Result<Self, TreesimError> {
        if config.n_leaves.is_none() && config.max_time.is_none() {
            return Err(TreesimError::config(
                "at least one of `n_leaves` and `max_time` must be set",
            ));
        }
        Ok(Self {
            n_leaves: config.n_leaves,
            max_time: config.max_time,
            timeout: config.timeout,
            acceptance: None,
            tree_logs: None,
            model_logs: None,
        })
    }

    /// Only accept trees for which `accept` returns `true`; rejected
    /// attempts are retried.
    pub fn acceptance_criterion(mut self, accept: impl Fn(&Tree) -> bool + 'static) -> Self {
        self.acceptance = Some(Box::new(accept));
        self
    }

    /// Collect scalar metadata from the pruned tree of a successful run.
    pub fn tree_logs(mut self, logs: impl Fn(&Tree) -> Map<String, Value> + 'static) -> Self {
        self.tree_logs = Some(Box::new(logs));
        self
    }

    /// Collect scalar metadata from the final model state of a
    /// successful run.
    pub fn model_logs(mut self, logs: impl Fn(&Model) -> Map<String, Value> + 'static) -> Self {
        self.model_logs = Some(Box::new(logs));
        self
    }

    /// Run attempts until one produces an acceptable pruned tree.
    ///
    /// Each attempt resets the model and advances it event by event until
    /// no candidate time remains, the horizon is reached, or enough
    /// lineages were sampled. Attempts whose process died out, whose
    /// pruned tree is empty, or which fail the acceptance criterion are
    /// rejected and retried with the RNG stream continuing where it left
    /// off.
    ///
    /// # Errors
    ///
    /// [`TreesimError::Timeout`] when the wall-clock budget runs out, or
    /// any event-application failure.
    pub fn run(&self, model: &mut Model) -> Result<(Tree, Map<String, Value>), TreesimError> {
        let start = Instant::now();
        let mut attempts: u64 = 0;
        loop {
            attempts += 1;
            self.check_timeout(start)?;
            model.reset();
            while model.step(self.max_time)?
                && self.n_leaves.map_or(true, |target| model.n_sampled() < target)
            {
                self.check_timeout(start)?;
            }

            if let Some(target) = self.n_leaves {
                if model.n_sampled() < target {
                    log::debug!(
                        "attempt {attempts}: process ended with {} of {target} samples, retrying",
                        model.n_sampled()
                    );
                    continue;
                }
            }

            let tree = match model.get_sampled_tree()? {
                Some(tree) => tree,
                None => {
                    log::debug!(
                        "attempt {attempts}: no sampled lineage survived pruning, retrying"
                    );
                    continue;
                }
            };

            if let Some(accept) = &self.acceptance {
                if !accept(&tree) {
                    log::debug!(
                        "attempt {attempts}: tree rejected by the acceptance criterion, retrying"
                    );
                    continue;
                }
            }

            let mut metadata = Map::new();
            if let Some(logs) = &self.tree_logs {
                metadata.extend(logs(&tree));
            }
            if let Some(logs) = &self.model_logs {
                metadata.extend(logs(model));
            }
            log::info!(
                "generated a tree with {} sampled leaves after {attempts} attempt(s)",
                model.n_sampled()
            );
            return Ok((tree, metadata));
        }
    }

    fn check_timeout(&self, start: Instant) -> Result<(), TreesimError> {
        if let Some(limit) = self.timeout {
            let elapsed = start.elapsed().as_secs_f64();
            if elapsed > limit {
                log::warn!("simulation timed out after {elapsed:.3}s");
                return Err(TreesimError::Timeout { seconds: elapsed });
            }
        }
        Ok(())
    }
}

/// Simulate one sampled tree from a configured model.
///
/// Convenience wrapper around [`Simulator`] without acceptance criterion
/// or loggers.
///
/// # Examples
///
/// ```
/// use treesim::models;
/// use treesim::{simulate_tree, SimulateConfig};
///
/// let mut model = models::bd(2.0, 2.0, 0.5).unwrap();
/// model.set_seed(0);
/// let config = SimulateConfig {
///     n_leaves: Some(5),
///     ..SimulateConfig::default()
/// };
/// let (tree, _metadata) = simulate_tree(&mut model, config).unwrap();
/// let root = tree.root().unwrap();
/// assert_eq!(tree.num_leaves(root), 5);
/// ```
pub fn simulate_tree(
    model: &mut Model,
    config: SimulateConfig,
) -> Result<(Tree, Map<String, Value>), TreesimError> {
    Simulator::new(config)?.run(model)
}

/// Derive independent worker seeds from one master seed.
///
/// The core itself is single-threaded; embarrassingly parallel callers
/// hand each worker its own seed and run one simulation per worker.
pub fn spawn_seeds(master_seed: u64, count: usize) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(master_seed);
    (0..count).map(|_| rng.gen()).collect()
}
