use std::error::Error;
use std::process;

use dotenv::dotenv;
use ems_server::{server, Config};
use log::error;

#[tokio::main]
async fn main() {
    // Load .env file
    dotenv().ok();

    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();

    if let Err(e) = server::run(config).await {
        error!("{}", e);
        let mut source = e.source();
        while let Some(cause) = source {
            error!("  caused by: {}", cause);
            source = cause.source();
        }
        process::exit(1);
    }
}
