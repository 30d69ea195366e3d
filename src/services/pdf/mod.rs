//! Printable export

mod service;

pub use service::{PageMapping, PdfExportOptions, PdfExportService};
