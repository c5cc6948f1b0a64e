pub mod csv;
pub mod report;

pub use csv::{result_header, ResultExporter};
pub use report::RunReport;
