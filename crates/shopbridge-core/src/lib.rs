//! Shopbridge Core Library
//!
//! This crate provides the core functionality for Shopbridge:
//! - Schema discovery from sample records
//! - Heuristic auto-mapping between two schemas
//! - Transformer definitions and the transform interpreter
//! - Connector capabilities (fetch/push) and file connectors
//! - Project configuration
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Discover   │────▶│  Auto-Map   │────▶│ Transformer │────▶│  Transform  │
//! │  (Schema)   │     │ (Mappings)  │     │  (Program)  │     │  (Records)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use shopbridge_core::{Transformer, discover_schema, generate_mappings};
//!
//! let source = discover_schema("products", &shop_records, 10);
//! let target = discover_schema("listings", &market_records, 10);
//! let transformer = Transformer::new("products_to_listings")
//!     .with_mappings(generate_mappings(&source, &target, 0.7));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coerce;
pub mod config;
pub mod connection;
pub mod connectors;
pub mod error;
pub mod interpreter;
pub mod mapping;
pub mod path;
pub mod schema;
pub mod transforms;

pub use config::{Config, ProjectConfig};
pub use connection::Connection;
pub use connectors::{Fetch, Push, Query};
pub use error::{Error, Result};
pub use interpreter::TransformEngine;
pub use mapping::generate_mappings;
pub use schema::{FieldDefinition, FieldType, Schema, discover_schema};
pub use transforms::{FieldMapping, Function, Transformer};

/// A record as exchanged with connectors: an arbitrarily nested JSON value
pub type Record = serde_json::Value;
