pub mod clients;
pub mod common;
pub mod completions;
pub mod export;
pub mod visits;
