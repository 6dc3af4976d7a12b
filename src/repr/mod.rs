//! Model representation: trees and the forest that owns them.

mod forest;
mod tree;

pub use forest::Forest;
pub use tree::{MutableTree, NodeId, Tree};
