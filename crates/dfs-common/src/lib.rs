pub mod config;
pub mod error;
pub mod mapreduce;
pub mod record;

pub use config::{load_config, Config};
pub use error::DfsError;
pub use mapreduce::{resolve_job, MapReduceJob};
