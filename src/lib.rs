pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod novelty;
pub mod report;
pub mod store;
pub mod util;
