use crate::collector::collect;
use crate::config::{Config, Output};
use crate::openapi_builder::build_document;
use crate::serializer::{serialize, write_to_file};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::{debug, info};
use std::path::PathBuf;

/// Generate an OpenAPI document from endpoint directives in Rust doc comments
#[derive(Parser, Debug)]
#[command(name = "openapi-from-comments")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Crate directories to scan (defaults to the current directory)
    #[arg(value_name = "PATHS")]
    pub paths: Vec<PathBuf>,

    /// YAML configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_path: Option<PathBuf>,

    /// Output format, overriding the configuration
    #[arg(short = 'f', long = "format", value_enum)]
    pub output_format: Option<OutputFormat>,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

impl From<OutputFormat> for Output {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Yaml => Output::Openapi3Yaml,
            OutputFormat::Json => Output::Openapi3Json,
        }
    }
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(mut args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if args.paths.is_empty() {
        args.paths.push(PathBuf::from("."));
    }

    for path in &args.paths {
        if !path.exists() {
            anyhow::bail!("Path does not exist: {}", path.display());
        }
        if !path.is_dir() {
            anyhow::bail!("Path is not a directory: {}", path.display());
        }
        info!("Source root: {}", path.display());
    }

    if let Some(ref config) = args.config_path {
        info!("Config file: {}", config.display());
    }
    if let Some(ref output) = args.output_path {
        info!("Output file: {}", output.display());
    } else {
        info!("Output: stdout");
    }

    Ok(args)
}

/// Load the configuration, with command-line flags applied over it.
pub fn load_config(args: &CliArgs) -> Result<Config> {
    let mut config = match &args.config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(format) = args.output_format {
        config.output = format.into();
    }
    Ok(config)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting OpenAPI document generation...");
    let config = load_config(&args)?;

    let program = collect(&args.paths, &config)?;
    if program.endpoints.is_empty() {
        log::warn!("No documented endpoints found");
    }

    info!("Building OpenAPI document...");
    let document = build_document(&program, &config);

    info!("Serializing to {:?} format...", config.output);
    let content = serialize(&document, config.output)?;

    if let Some(output_path) = &args.output_path {
        write_to_file(&content, output_path)?;
        info!("Successfully wrote OpenAPI document to {}", output_path.display());
    } else {
        println!("{}", content);
    }

    info!("Generation complete!");
    info!("  - Endpoints: {}", program.endpoints.len());
    info!("  - Schemas: {}", document.components.map_or(0, |c| c.schemas.len()));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_flags() {
        let args = CliArgs::try_parse_from([
            "openapi-from-comments",
            "-c",
            "api.yaml",
            "-f",
            "json",
            "-o",
            "out.json",
            "-v",
            "a",
            "b",
        ])
        .unwrap();
        assert_eq!(args.paths, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(args.config_path, Some(PathBuf::from("api.yaml")));
        assert_eq!(args.output_format, Some(OutputFormat::Json));
        assert_eq!(args.output_path, Some(PathBuf::from("out.json")));
        assert!(args.verbose);
    }

    #[test]
    fn test_invalid_format_is_rejected() {
        assert!(CliArgs::try_parse_from(["openapi-from-comments", "-f", "html"]).is_err());
    }

    #[test]
    fn test_paths_are_validated() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("lib.rs");
        fs::write(&file, "").unwrap();

        let args = CliArgs::try_parse_from(["x", temp_dir.path().to_str().unwrap()]).unwrap();
        assert!(parse_args_from_parsed(args).is_ok());

        let args = CliArgs::try_parse_from(["x", file.to_str().unwrap()]).unwrap();
        let err = parse_args_from_parsed(args).unwrap_err();
        assert!(err.to_string().contains("not a directory"));

        let missing = temp_dir.path().join("missing");
        let args = CliArgs::try_parse_from(["x", missing.to_str().unwrap()]).unwrap();
        assert!(parse_args_from_parsed(args).unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn test_default_path() {
        let args = parse_args_from_parsed(CliArgs::try_parse_from(["x"]).unwrap()).unwrap();
        assert_eq!(args.paths, vec![PathBuf::from(".")]);
    }

    #[test]
    fn test_format_flag_overrides_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("api.yaml");
        fs::write(&config_path, "title: Shop\noutput: openapi3-yaml\n").unwrap();

        let args = CliArgs::try_parse_from(["x", "-c", config_path.to_str().unwrap(), "-f", "json"]).unwrap();
        let config = load_config(&args).unwrap();
        assert_eq!(config.title, "Shop");
        assert_eq!(config.output, Output::Openapi3Json);

        let args = CliArgs::try_parse_from(["x", "-c", config_path.to_str().unwrap()]).unwrap();
        assert_eq!(load_config(&args).unwrap().output, Output::Openapi3Yaml);
    }
}
