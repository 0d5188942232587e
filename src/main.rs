use anyhow::{anyhow, Result};
use dotenv::dotenv;
use env_logger::Builder;
use log::{info, LevelFilter};
use std::sync::Arc;
use std::time::Instant;
use wordsim::model_file::match_file;
use wordsim::service::routes;
use wordsim::vectors::KeyedVectors;
use wordsim::{MODEL_PATH, PORT};

#[tokio::main]
async fn main() -> Result<()> {
    // read .env
    dotenv().ok();

    // init logger
    let log_level = std::env::var("RUST_LOG").unwrap_or_default();

    if log_level == "debug" {
        Builder::new()
            .filter(None, LevelFilter::Off)
            .filter(Some("wordsim::vectors"), LevelFilter::Debug)
            .filter(Some("wordsim"), LevelFilter::Debug)
            .init();
    } else if log_level == "info" {
        Builder::new()
            .filter(None, LevelFilter::Off)
            .filter(Some("wordsim::vectors"), LevelFilter::Info)
            .filter(Some("wordsim"), LevelFilter::Info)
            .init();
    } else {
        env_logger::init();
    }

    // load vectors
    let model_path = MODEL_PATH
        .clone()
        .ok_or_else(|| anyhow!("WORDSIM_MODEL is not set"))?;
    let file = match_file(model_path);
    info!("loading {}", file);
    let start = Instant::now();
    let model = tokio::task::spawn_blocking(move || -> Result<KeyedVectors> { file.into() }).await??;
    let elapsed = start.elapsed().as_secs_f64();
    info!(
        "vectors loaded in {}s, len: {}, dim: {}",
        elapsed,
        model.len(),
        model.dim()
    );

    let model = Arc::new(model);
    info!("server running at port: {}", *PORT);
    warp::serve(routes(model)).run(([0, 0, 0, 0], *PORT)).await;

    Ok(())
}
