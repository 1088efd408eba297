//! Office document to PDF conversion by supervising a headless LibreOffice.
//!
//! [`LibreOfficeEngine`] runs one `soffice --convert-to pdf` per call, holds it
//! to a deadline and, on any failure, kills the engine and removes the
//! residual `.tmp` / `.pdf#` files it leaves behind. The [`handlers`] module
//! exposes the same conversion over HTTP.

pub mod config;
pub mod engines;
pub mod error;
pub mod handlers;

pub use config::{ConverterConfig, DeadlinePolicy};
pub use engines::{cleanup_temp, EngineSupervisor, FilterMode, LibreOfficeEngine};
pub use error::{AppError, Result};
