mod cleanup;
mod filter;
mod libreoffice;
mod supervisor;

pub use cleanup::cleanup_temp;
pub use filter::FilterMode;
pub use libreoffice::LibreOfficeEngine;
pub use supervisor::EngineSupervisor;
