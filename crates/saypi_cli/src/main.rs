//! CLI smoke entry point.
//!
//! # Responsibility
//! - Open a store and print one owner's mood listing.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `saypi_cli [DB_PATH] [OWNER]`. Without `DB_PATH` an in-memory
//! store is used. Setting `SAYPI_LOG_DIR` (absolute) enables file logs.

use saypi_core::{init_logging, ListQuery, LoggingConfig, SayService, Store, StoreConfig};
use std::process::ExitCode;

const DEFAULT_OWNER: &str = "smoke";
const LOG_DIR_ENV: &str = "SAYPI_LOG_DIR";

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let path = args.next();
    let owner = args.next().unwrap_or_else(|| DEFAULT_OWNER.to_string());

    println!("saypi_core ping={}", saypi_core::ping());
    println!("saypi_core version={}", saypi_core::core_version());

    if let Some(dir) = std::env::var_os(LOG_DIR_ENV) {
        let mut config = LoggingConfig::new(dir);
        config.duplicate_to_stderr = true;
        if let Err(err) = init_logging(&config) {
            eprintln!("saypi_cli logging disabled: {err}");
        }
    }

    match run(path.as_deref(), &owner) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("saypi_cli error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(path: Option<&str>, owner: &str) -> Result<(), String> {
    let store = match path {
        Some(path) => Store::open(&StoreConfig::new(path)),
        None => Store::open_in_memory(),
    }
    .map_err(|err| err.to_string())?;
    let service = SayService::with_defaults(store);

    let mut query = ListQuery::first(saypi_core::repo::listing::MAX_LIST_LIMIT);
    loop {
        let page = service
            .list_moods(owner, &query)
            .map_err(|err| format!("{} ({})", err, err.code()))?;
        for mood in &page.items {
            println!(
                "mood name={} eyes={:?} tongue={:?} tier={:?}",
                mood.name, mood.eyes, mood.tongue, mood.tier
            );
        }
        match page.last_cursor() {
            Some(last) if page.has_more => query = ListQuery::after(last, query.limit),
            _ => break,
        }
    }
    Ok(())
}
