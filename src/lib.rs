pub mod call_filter;
pub mod cli;
pub mod cluster_connector;
pub mod cluster_finder;
pub mod containers;
pub mod coverage_reconciler;
pub mod errors;
pub mod ingester;
pub mod interval_intersector;
pub mod result_writer;
pub mod svtype_arbiter;
pub mod utils;
pub mod window_processor;
