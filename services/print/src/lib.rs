//! Label printing for the LabTrac client
//!
//! Renders inventory labels on the backend and sends them to the user's
//! default printer through a local print agent.

pub mod dispatcher;
pub mod error;
pub mod models;
pub mod provider;

pub use dispatcher::{MAX_BULK_SELECTION, PrintDispatcher, STATUS_COMMAND};
pub use error::{PrintError, PrintResult};
pub use models::{ConnectionKind, LabelItem, PrinterDescriptor};
pub use provider::{BrowserPrintProvider, PrinterProvider};
