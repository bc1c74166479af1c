mod as_value;
mod builder;
mod entity;
mod expression;
mod instance;
mod join;
mod materializer;
mod path;
mod planner;
mod property;
mod query;
mod registry;
mod relations;
mod resolve;
mod row;
mod util;
mod value;

pub use ::anyhow::Context;
pub use as_value::*;
pub use builder::*;
pub use entity::*;
pub use expression::*;
pub use instance::*;
pub use join::*;
pub use materializer::*;
pub use path::*;
pub use planner::*;
pub use property::*;
pub use query::*;
pub use registry::*;
pub use relations::*;
pub use resolve::*;
pub use row::*;
pub use util::*;
pub use value::*;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
