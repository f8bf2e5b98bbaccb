/// Crawl entrypoint: one sequential pass over every configured station,
/// one CSV append per city, final report to stdout.

use std::path::Path;

use aqmon_service::logging::{self, LogLevel};
use aqmon_service::stations::CrawlerConfig;
use aqmon_service::{crawl, model::Reading};

const CONFIG_PATH: &str = "cities.toml";

fn main() {
    if let Err(e) = run() {
        eprintln!("Error occurred: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    logging::init_logger(LogLevel::Info, None, false);

    let config_path = Path::new(CONFIG_PATH);
    let mut cfg = if config_path.exists() {
        CrawlerConfig::load(config_path)?
    } else {
        CrawlerConfig::builtin()
    };

    // The token comes from the environment (.env) when set; the config
    // file value is the fallback.
    if let Ok(token) = std::env::var("AQICN_API_TOKEN") {
        cfg.api_token = token;
    }

    println!("Starting Air Quality Data Crawler...");
    println!(
        "Current local time: {}",
        crawl::local_now(&cfg).format("%Y-%m-%d %H:%M:%S %:z")
    );

    let client = reqwest::blocking::Client::new();
    let results = crawl::crawl_all_cities(&cfg, &client)?;

    let readings: Vec<&Reading> = results.iter().flat_map(|b| b.readings.iter()).collect();
    let successful = readings.iter().filter(|r| r.is_success()).count();
    logging::log_crawl_summary(readings.len(), successful, readings.len() - successful);

    println!("\nCrawled data:");
    println!("{}", crawl::render_report(&results)?);

    Ok(())
}
