#[macro_use]
extern crate log;

pub mod model_file;
pub mod service;
pub mod vectors;

use lazy_static::lazy_static;
use std::path::PathBuf;
use std::str::FromStr;

lazy_static! {
    pub static ref MODEL_PATH: Option<PathBuf> =
        std::env::var_os("WORDSIM_MODEL").map(PathBuf::from);
    pub static ref PORT: u16 = env_or("WORDSIM_PORT", 8080);
    pub static ref TOP_N: usize = env_or("WORDSIM_TOP_N", 10);
    pub static ref EXCLUDE_SELF: bool = env_or("WORDSIM_EXCLUDE_SELF", false);
    pub static ref PARALLEL_THRESHOLD: usize = env_or("WORDSIM_PARALLEL_THRESHOLD", 50_000);
    pub static ref SHARD_ROWS: usize = env_or("WORDSIM_SHARD_ROWS", 4096);
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{}={:?} is not valid, using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}
