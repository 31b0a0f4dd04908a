//! # Spec Module
//!
//! The typed contract model and its construction.
//!
//! [`build`] takes an already parsed contract mapping; [`from_yaml_str`],
//! [`from_json_str`] and [`load_contract`] parse text or files first. The
//! resulting [`Document`] is immutable and can be shared between threads.

mod build;
mod load;
mod types;

pub use load::*;
pub use types::*;
