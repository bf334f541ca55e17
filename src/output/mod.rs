pub mod csv_log;
pub mod dashboard;
pub mod diagnostics;
