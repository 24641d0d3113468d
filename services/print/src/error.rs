//! Custom error types for label printing

use api::ApiError;
use thiserror::Error;

/// One variant per point where a print can fail
#[derive(Error, Debug)]
pub enum PrintError {
    /// The backend could not render the label
    #[error("Label payload could not be generated: {0}")]
    LabelUnavailable(#[source] ApiError),

    /// The backend has no default printer, or could not be asked for it
    #[error("No default printer configured")]
    NoDefaultPrinter {
        #[source]
        source: Option<ApiError>,
    },

    /// The local print agent is not running or not reachable
    #[error("Print agent unavailable: {0}")]
    SdkUnavailable(String),

    /// No discovered device matches the requested identifier
    #[error("Printer {0} not found")]
    PrinterNotFound(String),

    /// The device reported a failure, message passed through verbatim
    #[error("Printer error: {0}")]
    Device(String),

    /// The print agent has not been allowed to talk to this device
    #[error("Printer is not authorized in the print agent settings")]
    DeviceNotAuthorized,

    /// A bulk selection outside 1..=50 items
    #[error("Select between 1 and {max} items to print, got {count}")]
    SelectionOutOfRange { count: usize, max: usize },

    /// A bulk print stopped at the first failing item
    #[error("Bulk print stopped at item {item_id} after {printed} labels: {source}")]
    BulkAborted {
        printed: usize,
        item_id: i64,
        #[source]
        source: Box<PrintError>,
    },

    /// Saving the default printer failed
    #[error("Default printer could not be saved: {0}")]
    SaveFailed(#[source] ApiError),
}

impl PrintError {
    /// Backend error behind this failure, if any
    ///
    /// Lets callers hand authentication failures to the session controller.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            PrintError::LabelUnavailable(e) | PrintError::SaveFailed(e) => Some(e),
            PrintError::NoDefaultPrinter { source } => source.as_ref(),
            PrintError::BulkAborted { source, .. } => source.api_error(),
            _ => None,
        }
    }
}

/// Type alias for print results
pub type PrintResult<T> = Result<T, PrintError>;
