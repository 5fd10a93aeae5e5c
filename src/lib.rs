//! openapi-from-comments - OpenAPI documents from endpoint directives in doc comments.
//!
//! Handlers are documented with a small directive language in ordinary doc
//! comments:
//!
//! ```text
//! /// GET /users/:id users
//! /// Fetch one user.
//! ///
//! /// Path:
//! ///   id: The user ID {integer, required}
//! ///
//! /// Response 200:
//! ///   $ref: models.User
//! /// Response 404: $empty
//! ```
//!
//! Types named by `$ref` are looked up across the modules of the scanned
//! crates and turned into schemas by walking their fields, following nested
//! types, generics and aliases.
//!
//! # Architecture
//!
//! 1. [`scanner`] - Recursively scans source roots for Rust files
//! 2. [`parser`] - Parses files with `syn` and extracts doc comments
//! 3. [`blocks`] and [`tags`] - Split comments into sections and `{..}` tags
//! 4. [`docparse`] - Turns a comment into [`program::Endpoint`]s
//! 5. [`type_resolver`] - Finds declarations by name across modules
//! 6. [`schema_generator`] - Converts declarations to schemas, filling the reference table
//! 7. [`collector`] - Drives one run over a set of crates
//! 8. [`openapi_builder`] - Constructs the OpenAPI document
//! 9. [`serializer`] - Serializes the document to YAML or JSON
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_comments::{
//!     collector::collect, config::Config, openapi_builder::build_document,
//!     serializer::serialize_yaml,
//! };
//! use std::path::PathBuf;
//!
//! let config = Config::default();
//! let program = collect(&[PathBuf::from("./my-api")], &config).unwrap();
//! let document = build_document(&program, &config);
//! println!("{}", serialize_yaml(&document).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module which provides a complete CLI application.

pub mod attrs;
pub mod blocks;
pub mod cli;
pub mod collector;
pub mod config;
pub mod docparse;
pub mod error;
pub mod openapi_builder;
pub mod parser;
pub mod program;
pub mod scanner;
pub mod schema_generator;
pub mod serializer;
pub mod tags;
pub mod type_expr;
pub mod type_resolver;
