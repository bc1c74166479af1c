#![allow(dead_code)]
mod customer;
mod library;
mod shop;

pub use customer::*;
pub use library::*;
pub use shop::*;

use keel::{RowLabeled, Value};
use log::LevelFilter;
use std::env;

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Labeled row out of `(column, value)` pairs.
pub fn row<const N: usize>(columns: [(&str, Value); N]) -> RowLabeled {
    columns.into_iter().collect()
}
