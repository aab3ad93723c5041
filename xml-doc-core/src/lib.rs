//! Ordered XML element trees plus the quick-xml backed reader and writer that
//! higher-level exporters build on.

pub mod parser;
pub mod tree;
pub mod writer;

pub use parser::{parse, parse_file, parse_str, ParseError};
pub use tree::XmlNode;
pub use writer::{write_file, write_string, write_with_options, WriteError, WriteOptions};
