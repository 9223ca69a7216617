//! Workflow input parsing and run configuration.

pub mod config;
pub mod dax_parser;
pub mod yaml_parser;

pub use config::{read_parameters, Parameters};
pub use dax_parser::parse_dax;
pub use yaml_parser::parse_yaml;
