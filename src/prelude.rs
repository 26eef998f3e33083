//! Export commonly-used types and traits

pub use crate::StreamingIterator;
pub use {
    crate::Event, crate::Firings, crate::Model, crate::NodeId, crate::NodeTraversalOrder,
    crate::SimulateConfig, crate::SkylineMatrix, crate::SkylineParameter, crate::SkylineVector,
    crate::StateFilter, crate::Tree, crate::TreesimError,
};
