//! Subscriber setup for this binary. Mirrors `game_core::logger::init`'s `RUST_LOG`
//! parsing, pared down to a stderr-only formatter: this crate has no file sink, and
//! stdout is reserved for requested command output.

use tracing_subscriber::filter::LevelFilter;

pub fn init() {
    let level = std::env::var("RUST_LOG")
        .map(|e| match e.as_str() {
            "error" | "ERROR" => LevelFilter::ERROR,
            "warn" | "WARN" => LevelFilter::WARN,
            "info" | "INFO" => LevelFilter::INFO,
            "debug" | "DEBUG" => LevelFilter::DEBUG,
            "trace" | "TRACE" => LevelFilter::TRACE,
            "off" | "OFF" => LevelFilter::OFF,
            _ => LevelFilter::INFO,
        })
        .unwrap_or(LevelFilter::INFO);

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}
