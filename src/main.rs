//! openapi-from-comments - Command-line tool for generating OpenAPI documentation.
//!
//! Scans one or more crates for doc comments that start with an endpoint
//! line such as `GET /users/:id`, resolves the types they reference, and
//! prints (or writes) an OpenAPI 3 document.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-comments [OPTIONS] [PATHS]...
//! ```
//!
//! # Examples
//!
//! Generate YAML documentation:
//! ```bash
//! openapi-from-comments ./my-api -o openapi.yaml
//! ```
//!
//! Generate JSON documentation with a config file:
//! ```bash
//! openapi-from-comments ./my-api -c api.yaml -f json -o openapi.json
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_from_comments::cli;

fn main() -> Result<()> {
    // Parse once for the verbose flag, then validate after the logger is up
    let args_for_verbose = cli::CliArgs::parse();

    let log_level = if args_for_verbose.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .init();

    info!("openapi-from-comments starting...");

    let args = cli::parse_args_from_parsed(args_for_verbose)?;
    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
