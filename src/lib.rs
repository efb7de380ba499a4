pub mod cli;
pub mod collector;
pub mod commands;
pub mod error;
pub mod features;
pub mod genotype;
pub mod handles;
pub mod locus;
pub mod math;
pub mod mixture;
pub mod pipeline;
pub mod readers;
pub mod region;
pub mod regression;
pub mod util;
