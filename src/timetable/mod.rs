pub mod archive;
pub mod audit;
pub mod config;
pub mod fetch;
pub mod fingerprint;
pub mod listing;
pub mod naming;
pub mod paths;
pub mod render;
pub mod revision_index;
pub mod rotate;
pub mod selector;
pub mod sync;
pub mod util;
