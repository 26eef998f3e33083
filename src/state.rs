//! Simulation state: the growing forest, the active-lineage index and the
//! bookkeeping every event mutates.

use std::collections::{BTreeMap, HashMap, HashSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp};
use regex::Regex;
use serde_json::Value;

use crate::events::Event;
use crate::metadata::STATE_KEY;
use crate::tree::{NodeTraversalOrder, Tree};
use crate::{NodeId, TreesimError};

/// A filter over population labels.
///
/// Events restrict themselves to lineages whose state label either equals
/// a literal or fully matches a regular expression; `None` in the model
/// methods below means "all active lineages".
#[derive(Clone, Debug)]
pub enum StateFilter {
    /// Matches one literal state label.
    Exact(String),
    /// Matches labels on a full regex match.
    Pattern(Regex),
}

impl StateFilter {
    /// Filter for one literal state label.
    pub fn exact(state: impl Into<String>) -> Self {
        StateFilter::Exact(state.into())
    }

    /// Filter for labels fully matching `pattern`.
    ///
    /// # Errors
    ///
    /// [`TreesimError::Config`] when the pattern does not compile.
    pub fn pattern(pattern: &str) -> Result<Self, TreesimError> {
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
            TreesimError::config(format!("invalid state pattern {pattern:?}: {e}"))
        })?;
        Ok(StateFilter::Pattern(regex))
    }

    /// Whether `state` passes the filter.
    pub fn matches(&self, state: &str) -> bool {
        match self {
            StateFilter::Exact(literal) => literal == state,
            StateFilter::Pattern(regex) => regex.is_match(state),
        }
    }
}

fn passes(filter: Option<&StateFilter>, state: &str) -> bool {
    filter.map_or(true, |f| f.matches(state))
}

// Swap-remove vector plus reverse index: O(1) insertion, removal and
// uniform selection. Iteration order is deterministic given the RNG.
#[derive(Debug, Default)]
struct ActiveBucket {
    ids: Vec<NodeId>,
    positions: HashMap<NodeId, usize>,
}

impl ActiveBucket {
    fn insert(&mut self, id: NodeId) {
        self.positions.insert(id, self.ids.len());
        self.ids.push(id);
    }

    fn remove(&mut self, id: NodeId) -> bool {
        match self.positions.remove(&id) {
            Some(position) => {
                self.ids.swap_remove(position);
                if let Some(moved) = self.ids.get(position) {
                    self.positions.insert(*moved, position);
                }
                true
            }
            None => false,
        }
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

/// The evolving state of one simulation.
///
/// A model owns its forest, its per-state index of active lineages, its
/// pseudorandom generator and its registered events; nothing is shared or
/// global, so models can be moved freely across threads one at a time.
///
/// Time only moves forward. A node is created "active" (no branch length)
/// and is *fixed* exactly once, at which point its branch length becomes
/// the span from its parent's fixation time to the current time and it
/// leaves the active index.
pub struct Model {
    init_state: String,
    init_metadata: BTreeMap<String, f64>,
    events: Vec<Event>,
    rng: StdRng,
    current_time: f64,
    next_node_id: u64,
    tree: Tree,
    root: NodeId,
    active: BTreeMap<String, ActiveBucket>,
    sampled: HashSet<String>,
    node_times: HashMap<NodeId, f64>,
    metadata: BTreeMap<String, f64>,
}

impl Model {
    /// A model whose seed lineage starts in `init_state`.
    pub fn new(init_state: impl Into<String>) -> Self {
        Self::with_metadata(init_state, BTreeMap::new())
    }

    /// A model with auxiliary scalar state (e.g. remaining susceptibles)
    /// restored on every [`reset`](Model::reset).
    pub fn with_metadata(
        init_state: impl Into<String>,
        init_metadata: BTreeMap<String, f64>,
    ) -> Self {
        let mut model = Self {
            init_state: init_state.into(),
            init_metadata,
            events: Vec::new(),
            rng: StdRng::from_entropy(),
            current_time: 0.0,
            next_node_id: 0,
            tree: Tree::new(),
            root: NodeId::from(0),
            active: BTreeMap::new(),
            sampled: HashSet::new(),
            node_times: HashMap::new(),
            metadata: BTreeMap::new(),
        };
        model.reset();
        model
    }

    /// Re-seed the instance RNG for reproducible runs.
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Register an event; it survives every reset.
    pub fn add_event(&mut self, event: Event) {
        self.events.push(event);
    }

    /// The registered events, in registration order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Clear all run state and re-seed the forest with a single active
    /// root lineage in the initial state.
    ///
    /// Registered events and the RNG stream are kept.
    pub fn reset(&mut self) {
        self.current_time = 0.0;
        self.next_node_id = 0;
        self.tree = Tree::new();
        self.active.clear();
        self.sampled.clear();
        self.node_times.clear();
        self.metadata = self.init_metadata.clone();
        let init_state = self.init_state.clone();
        self.root = self.get_new_node(&init_state);
    }

    /// The current simulation time.
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// The root of the (unpruned) forest.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The growing, unpruned forest.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Names of the lineages collected as samples so far.
    pub fn sampled_names(&self) -> &HashSet<String> {
        &self.sampled
    }

    /// How many samples have been collected so far.
    pub fn n_sampled(&self) -> usize {
        self.sampled.len()
    }

    /// The absolute time at which `node` was fixed, if it has been.
    pub fn node_time(&self, node: NodeId) -> Option<f64> {
        self.node_times.get(&node).copied()
    }

    /// The auxiliary scalar state of the run.
    pub fn metadata(&self) -> &BTreeMap<String, f64> {
        &self.metadata
    }

    /// Read one auxiliary scalar.
    pub fn metadata_value(&self, key: &str) -> Option<f64> {
        self.metadata.get(key).copied()
    }

    /// Write one auxiliary scalar.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: f64) {
        self.metadata.insert(key.into(), value);
    }

    /// Create a new active leaf in `state` and index it.
    ///
    /// Nodes are named `"<id>|<state>"` with a monotonically increasing
    /// positive id; the reserved `"state"` metadata key is set.
    pub fn get_new_node(&mut self, state: &str) -> NodeId {
        self.next_node_id += 1;
        let name = format!("{}|{}", self.next_node_id, state);
        let id = self.tree.add_node(name);
        self.tree
            .node_mut(id)
            .metadata_mut()
            .insert(STATE_KEY.to_string(), Value::String(state.to_string()));
        self.active.entry(state.to_string()).or_default().insert(id);
        id
    }

    pub(crate) fn state_of(&self, node: NodeId) -> Result<String, TreesimError> {
        self.tree
            .node(node)
            .state()
            .map(str::to_string)
            .ok_or_else(|| {
                TreesimError::state(format!(
                    "node {} has no state label",
                    self.tree.node(node).name()
                ))
            })
    }

    /// Fix `node`: set its branch length to the span from its parent's
    /// fixation time to now and drop it from the active index.
    ///
    /// # Errors
    ///
    /// [`TreesimError::State`] when the node was already fixed.
    pub fn fix(&mut self, node: NodeId) -> Result<(), TreesimError> {
        if self.tree.node(node).branch_length().is_some() {
            return Err(TreesimError::state(format!(
                "node {} has already been fixed",
                self.tree.node(node).name()
            )));
        }
        let parent_time = match self.tree.node(node).parent() {
            Some(parent) => self.node_times.get(&parent).copied().ok_or_else(|| {
                TreesimError::state(format!(
                    "the parent of node {} was never fixed",
                    self.tree.node(node).name()
                ))
            })?,
            None => 0.0,
        };
        let state = self.state_of(node)?;
        let length = self.current_time - parent_time;
        self.tree.node_mut(node).set_branch_length(length);
        self.node_times.insert(node, self.current_time);
        let removed = self
            .active
            .get_mut(&state)
            .map_or(false, |bucket| bucket.remove(node));
        if !removed {
            return Err(TreesimError::state(format!(
                "node {} was not in the active index",
                self.tree.node(node).name()
            )));
        }
        Ok(())
    }

    /// Fix `node` and attach a single new active child in `new_state`,
    /// continuing the lineage.
    pub fn stem(&mut self, node: NodeId, new_state: &str) -> Result<NodeId, TreesimError> {
        self.fix(node)?;
        let stem = self.get_new_node(new_state);
        self.tree.add_child(node, stem)?;
        Ok(stem)
    }

    /// Fix `node` with no continuation (death).
    pub fn remove(&mut self, node: NodeId) -> Result<(), TreesimError> {
        self.fix(node)
    }

    /// Move the lineage of `node` into `new_state`.
    pub fn migrate(&mut self, node: NodeId, new_state: &str) -> Result<NodeId, TreesimError> {
        self.stem(node, new_state)
    }

    /// Branch `parent` into a new active child in `child_state` plus a
    /// stem continuing the parent's own state; returns `(stem, child)`.
    pub fn birth_from(
        &mut self,
        parent: NodeId,
        child_state: &str,
    ) -> Result<(NodeId, NodeId), TreesimError> {
        let parent_state = self.state_of(parent)?;
        let child = self.get_new_node(child_state);
        self.tree.add_child(parent, child)?;
        let stem = self.stem(parent, &parent_state)?;
        Ok((stem, child))
    }

    /// Record `node`'s name as sampled and fix it.
    pub fn sample(&mut self, node: NodeId) -> Result<(), TreesimError> {
        self.sampled
            .insert(self.tree.node(node).name().to_string());
        self.fix(node)
    }

    /// The ids of the active lineages passing `filter`.
    pub fn get_active_nodes(&self, filter: Option<&StateFilter>) -> Vec<NodeId> {
        self.active
            .iter()
            .filter(|(state, _)| passes(filter, state))
            .flat_map(|(_, bucket)| bucket.ids.iter().copied())
            .collect()
    }

    /// How many active lineages pass `filter`.
    pub fn count_active_nodes(&self, filter: Option<&StateFilter>) -> usize {
        self.active
            .iter()
            .filter(|(state, _)| passes(filter, state))
            .map(|(_, bucket)| bucket.len())
            .sum()
    }

    /// Draw one active lineage passing `filter` uniformly at random.
    ///
    /// # Errors
    ///
    /// [`TreesimError::State`] when no active lineage passes the filter.
    pub fn draw_active_node(
        &mut self,
        filter: Option<&StateFilter>,
    ) -> Result<NodeId, TreesimError> {
        let total = self.count_active_nodes(filter);
        if total == 0 {
            return Err(TreesimError::state("drew from an empty active set"));
        }
        let mut remaining = self.rng.gen_range(0..total);
        for (state, bucket) in &self.active {
            if !passes(filter, state) {
                continue;
            }
            if remaining < bucket.len() {
                return Ok(bucket.ids[remaining]);
            }
            remaining -= bucket.len();
        }
        Err(TreesimError::state("active index out of sync"))
    }

    /// Draw `count` distinct active lineages passing `filter`, without
    /// replacement.
    ///
    /// # Errors
    ///
    /// [`TreesimError::State`] when fewer than `count` lineages qualify.
    pub fn draw_active_nodes(
        &mut self,
        filter: Option<&StateFilter>,
        count: usize,
    ) -> Result<Vec<NodeId>, TreesimError> {
        let mut pool = self.get_active_nodes(filter);
        if count > pool.len() {
            return Err(TreesimError::state(format!(
                "drew {count} lineages from an active set of {}",
                pool.len()
            )));
        }
        for i in 0..count {
            let j = self.rng.gen_range(i..pool.len());
            pool.swap(i, j);
        }
        pool.truncate(count);
        Ok(pool)
    }

    pub(crate) fn sample_exp(&mut self, rate: f64) -> Result<f64, TreesimError> {
        let distribution = Exp::new(rate).map_err(|_| {
            TreesimError::state(format!("invalid exponential rate {rate}"))
        })?;
        Ok(distribution.sample(&mut self.rng))
    }

    /// Advance to the next firing time and apply every event that fires
    /// at that instant. Returns `false` when the run is over: either no
    /// candidate time remains or the horizon `max_time` was reached.
    ///
    /// # Errors
    ///
    /// Propagates event-application failures.
    pub fn step(&mut self, max_time: Option<f64>) -> Result<bool, TreesimError> {
        // The event list is detached for the duration of the step so that
        // events can borrow the model mutably.
        let events = std::mem::take(&mut self.events);
        let result = self.step_with(&events, max_time);
        self.events = events;
        result
    }

    fn step_with(
        &mut self,
        events: &[Event],
        max_time: Option<f64>,
    ) -> Result<bool, TreesimError> {
        let mut firing_times = Vec::with_capacity(events.len());
        for event in events {
            firing_times.push(event.next_firing_time(self)?);
        }

        let mut next = max_time;
        for time in firing_times.iter().flatten() {
            next = Some(match next {
                Some(best) => best.min(*time),
                None => *time,
            });
        }
        let next = match next {
            Some(next) => next,
            None => return Ok(false),
        };

        self.current_time = next;
        for (event, time) in events.iter().zip(&firing_times) {
            if *time == Some(next) {
                event.apply(self)?;
            }
        }

        Ok(max_time != Some(next))
    }

    /// The pruned tree induced by all sampled lineages, or `None` when no
    /// sample survives.
    ///
    /// The result is an independently owned copy rooted at the original
    /// seed: subtrees without sampled descendants are dropped and unary
    /// internal nodes are contracted, their branch lengths summed into
    /// the surviving child.
    pub fn get_sampled_tree(&self) -> Result<Option<Tree>, TreesimError> {
        if self.tree.is_empty() {
            return Ok(None);
        }
        let mut tree = self.tree.extract(self.root);
        let mut root = match tree.root() {
            Some(root) => root,
            None => return Ok(None),
        };
        let order: Vec<NodeId> = tree.traverse(root, NodeTraversalOrder::Postorder).collect();
        for id in order {
            let node = tree.node(id);
            if node.is_leaf() && !self.sampled.contains(node.name()) {
                match node.parent() {
                    None => return Ok(None),
                    Some(parent) => tree.remove_child(parent, id)?,
                }
            } else if node.children().len() == 1 {
                let child = node.children()[0];
                let parent = node.parent();
                tree.update_parent(child, parent)?;
                let contracted = tree.node(id).branch_length().unwrap_or(0.0);
                let child_node = tree.node_mut(child);
                let combined = child_node.branch_length().unwrap_or(0.0) + contracted;
                child_node.set_branch_length(combined);
                match parent {
                    None => root = child,
                    Some(parent) => tree.remove_child(parent, id)?,
                }
            }
        }
        Ok(Some(tree.extract(root)))
    }
}
