pub mod config;
pub mod domain;
pub mod driver;
pub mod error;
pub mod report;
pub mod telemetry;

pub use config::Config;
pub use driver::LoadDriver;
pub use error::LoadError;
pub use report::RunReport;
