//! Deterministic translation of Cisco ASA object definitions into
//! `generic_import_export` XML.
//!
//! # Pipeline
//!
//! 1. [`lexer`] splits text into statements, dropping blanks and `!` comments
//!    while keeping original line numbers.
//! 2. [`block`] groups statements under `object network` / `object service`
//!    headers.
//! 3. [`classify`] resolves each block to a host, subnet, address range,
//!    FQDN, or service, or rejects it with a typed error.
//! 4. [`registry`] hands out a stable `db_key` per `(namespace, name)`.
//! 5. [`render`] writes the export document.
//!
//! [`pipeline`] runs these in order and collects per-block failures so that
//! one bad object never costs the rest of the batch.
//!
//! # Examples
//!
//! ```
//! use asa_objconv::config::ConvertConfig;
//! use asa_objconv::pipeline::Translator;
//! use asa_objconv::registry::{IdentifierRegistry, KeySpace};
//!
//! let config = ConvertConfig::default();
//! let registry = IdentifierRegistry::in_memory(config.db_key_start, KeySpace::PerNamespace);
//! let result = Translator::new(&registry, &config)
//!     .translate("object network T3 range 185.188.32.0 185.188.35.255")
//!     .expect("in-memory registry cannot fail");
//! assert!(result.document.contains(r#"ip_range="185.188.32.0-185.188.35.255""#));
//! ```

pub mod block;
pub mod classify;
pub mod config;
pub mod inspect;
pub mod lexer;
pub mod pipeline;
pub mod registry;
pub mod render;
pub mod report;
