//! Stochastic simulation of sampled phylogenetic trees.
//!
//! `treesim` implements a continuous-time Markov chain simulator for
//! birth/death/sampling/migration processes whose rates are
//! piecewise-constant ("skyline") functions of time, plus the skyline
//! algebra those rates live in. A simulation grows a forest of lineages
//! event by event, collects samples, and finally prunes the forest down
//! to the tree induced by the sampled lineages.
//!
//! The main entry points:
//!
//! * [`skyline`] — skyline scalars/vectors/matrices with elementwise
//!   arithmetic and broadcasting;
//! * [`models`] — factories for the named parameterizations (canonical,
//!   epidemiological, FBD, BD, BDEI, BDSS, SIR);
//! * [`simulate_tree`] — the driver running attempts until an acceptable
//!   tree is produced;
//! * [`newick`] — serialization of the resulting trees.
//!
//! # Examples
//!
//! ```
//! use treesim::models;
//! use treesim::newick::to_newick;
//! use treesim::{simulate_tree, SimulateConfig};
//!
//! // A birth-death model with reproduction number 2, mean infectious
//! // period 2 and sampling proportion 0.5.
//! let mut model = models::bd(2.0, 2.0, 0.5).unwrap();
//! model.set_seed(42);
//!
//! let config = SimulateConfig {
//!     n_leaves: Some(10),
//!     ..SimulateConfig::default()
//! };
//! let (tree, _metadata) = simulate_tree(&mut model, config).unwrap();
//!
//! let root = tree.root().unwrap();
//! assert_eq!(tree.num_leaves(root), 10);
//! let newick = to_newick(&tree).unwrap();
//! assert!(newick.ends_with(';'));
//! ```

mod _macros;

pub mod error;
pub mod events;
pub mod metadata;
pub mod models;
pub mod newick;
mod newtypes;
pub mod prelude;
pub mod simulate;
pub mod skyline;
pub mod state;
pub mod tree;

pub use streaming_iterator::StreamingIterator;

pub use error::TreesimError;
pub use events::{
    Birth, Death, Event, Firings, Migration, Reaction, Sampling, SingleReactant,
    StochasticEvent, TimedEvent, TimedReaction, Transmission,
};
pub use metadata::{Metadata, STATE_KEY};
pub use newick::NewickError;
pub use newtypes::NodeId;
pub use simulate::{simulate_tree, spawn_seeds, SimulateConfig, Simulator};
pub use skyline::{
    skyline_matrix, skyline_parameter, skyline_vector, MatrixSpec, ParameterSpec,
    SkylineMatrix, SkylineParameter, SkylineVector, VectorSpec,
};
pub use state::{Model, StateFilter};
pub use tree::{NodeTraversalOrder, Tree, TreeNode};
