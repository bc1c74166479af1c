mod binary_op;
mod operand;
mod predicate;
mod selection;

pub use binary_op::*;
pub use operand::*;
pub use predicate::*;
pub use selection::*;

use std::fmt::Debug;

/// Node kind the core tree does not know about.
///
/// The join planner refuses to guess which paths an extension touches and reports it instead.
pub trait Extension: Debug + Send + Sync {
    fn kind(&self) -> &str;
}
