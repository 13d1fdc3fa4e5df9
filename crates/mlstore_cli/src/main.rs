//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `mlstore_core` linkage and
//!   open the configured store file.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `mlstore_cli [classid [userid]]`

use mlstore_core::{init_logging_from, open_db_with, store_config, SqliteProjectStore};
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("mlstore_cli error={err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = store_config()?;
    init_logging_from(config)?;

    println!("mlstore_core version={}", mlstore_core::core_version());
    println!("mlstore_core schema={}", mlstore_core::schema_version());

    let conn = open_db_with(&config.db_path, config.busy_timeout())?;
    println!("mlstore_core db={}", config.db_path.display());

    let mut args = std::env::args().skip(1);
    if let Some(classid) = args.next() {
        let store = SqliteProjectStore::sqlite(&conn)?;
        match args.next() {
            Some(userid) => println!(
                "class={} user={} projects={}",
                classid,
                userid,
                store.count_projects_by_user_id(&userid, &classid)?
            ),
            None => println!(
                "class={} projects={}",
                classid,
                store.count_projects_by_class_id(&classid)?
            ),
        }
    }

    Ok(())
}
