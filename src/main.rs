use crate::cli::run;

pub mod cli;
pub mod config;
pub mod discovery;
pub mod domain;
pub mod http;
pub mod storage;

fn main() {
    if let Err(e) = run() {
        eprintln!("bandscrape: {e:#}");
        std::process::exit(1);
    }
}
