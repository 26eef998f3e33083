//! Strongly-typed ids into tree arenas.

/// A node ID
///
/// This is an integer referring to a slot of a [``Tree``](crate::Tree)
/// arena. Parent/child links between nodes are stored as `NodeId` values
/// rather than references, so trees stay freely mutable and copyable.
///
/// # Examples
///
/// These examples illustrate using this type as something "integer-like".
///
/// ```
/// use treesim::NodeId;
///
/// let y: NodeId = NodeId::from(1);
/// assert_eq!(y.as_usize(), 1);
///
/// let z: NodeId = NodeId::from(1);
/// assert_eq!(y, z);
/// assert!(y < NodeId::from(2));
///
/// assert_eq!(format!("{}", y), "1".to_string());
/// assert_eq!(format!("{:?}", y), "NodeId(1)".to_string());
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, std::hash::Hash)]
pub struct NodeId(usize);

impl_id_traits!(NodeId);
