//! `spreadmart-io`: Branch extracts in, audit artifacts out.

pub mod artifacts;
pub mod bundle;
pub mod csv;
pub mod error;
pub mod source;
pub mod split;
pub mod xlsx;

pub use artifacts::{write_json_report, write_report, ReportFormat};
pub use bundle::bundle;
pub use error::IoError;
pub use source::{read_source, read_sources};
pub use split::split_by_column;
