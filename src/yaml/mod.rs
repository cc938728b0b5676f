//! YAML handling: configuration documents, key locations, and report rendering

pub mod diagnostics;
pub mod document;
pub mod locate;

pub use diagnostics::{format_report, YamlSyntaxError};
pub use document::Document;
pub use locate::{KeyLocations, Location};
