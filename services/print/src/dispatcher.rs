//! Label print dispatch
//!
//! A print is four steps, each its own failure point: render the label on
//! the backend, look up the default printer, find that printer among the
//! discovered devices and send the label to it. Nothing is retried and no
//! other printer is ever substituted.

use std::ops::RangeInclusive;
use std::sync::Arc;

use api::ApiClient;
use tracing::{debug, info, warn};

use crate::error::{PrintError, PrintResult};
use crate::models::{ConnectionKind, LabelItem, PrinterDescriptor};
use crate::provider::PrinterProvider;

/// Largest selection accepted by [`PrintDispatcher::bulk_print`]
pub const MAX_BULK_SELECTION: usize = 50;

const BULK_SELECTION: RangeInclusive<usize> = 1..=MAX_BULK_SELECTION;

/// ZPL host status query used to test a printer
pub const STATUS_COMMAND: &str = "~HQES";

/// Reply of the print agent for a device the user has not allowed yet
const UNAUTHORIZED_DEVICE: &str = "Unauthorized device detected";

/// Sends labels rendered by the backend to the user's default printer
#[derive(Clone)]
pub struct PrintDispatcher {
    api: ApiClient,
    provider: Arc<dyn PrinterProvider>,
}

impl PrintDispatcher {
    pub fn new(api: ApiClient, provider: Arc<dyn PrinterProvider>) -> Self {
        Self { api, provider }
    }

    /// Print one label on the default printer
    pub async fn print_label(&self, item: &LabelItem) -> PrintResult<()> {
        let label = self
            .api
            .print_item(&item.to_request())
            .await
            .map_err(PrintError::LabelUnavailable)?;

        let uid = self.default_printer_uid().await?;
        let device = self.find_device(&uid).await?;

        self.provider.send(&device, &label.zpl_string).await?;
        info!(
            "Printed label for item {} ({}) on {}",
            item.id, item.inventory_item_id, device.name
        );
        Ok(())
    }

    /// Print labels one at a time, in order, stopping at the first failure
    ///
    /// Returns the number of labels printed. Selections outside 1..=50 items
    /// are rejected before anything is sent.
    pub async fn bulk_print(&self, items: &[LabelItem]) -> PrintResult<usize> {
        if !BULK_SELECTION.contains(&items.len()) {
            return Err(PrintError::SelectionOutOfRange {
                count: items.len(),
                max: MAX_BULK_SELECTION,
            });
        }

        for (printed, item) in items.iter().enumerate() {
            if let Err(e) = self.print_label(item).await {
                warn!("Bulk print stopped at item {}: {}", item.id, e);
                return Err(PrintError::BulkAborted {
                    printed,
                    item_id: item.id,
                    source: Box::new(e),
                });
            }
        }

        info!("Bulk printed {} labels", items.len());
        Ok(items.len())
    }

    /// Printers that can be chosen as default (USB and network only)
    pub async fn available_printers(&self) -> PrintResult<Vec<PrinterDescriptor>> {
        let printers = self.provider.discover().await?;
        Ok(printers
            .into_iter()
            .filter(|p| matches!(p.kind(), ConnectionKind::Usb | ConnectionKind::Network))
            .collect())
    }

    /// The default printer identifier configured on the backend
    pub async fn default_printer_uid(&self) -> PrintResult<String> {
        let printer = self
            .api
            .default_printer()
            .await
            .map_err(|e| PrintError::NoDefaultPrinter { source: Some(e) })?;

        printer
            .uid()
            .map(str::to_string)
            .ok_or(PrintError::NoDefaultPrinter { source: None })
    }

    pub async fn save_default_printer(&self, uid: &str) -> PrintResult<()> {
        self.api
            .set_default_printer(uid)
            .await
            .map_err(PrintError::SaveFailed)?;
        info!("Default printer set to {}", uid);
        Ok(())
    }

    /// Query the status of a selectable printer; returns its raw reply
    pub async fn test_connectivity(&self, uid: &str) -> PrintResult<String> {
        let printer = self
            .available_printers()
            .await?
            .into_iter()
            .find(|p| p.matches(uid))
            .ok_or_else(|| PrintError::PrinterNotFound(uid.to_string()))?;

        match self.provider.send_then_read(&printer, STATUS_COMMAND).await {
            Ok(reply) => {
                info!("Printer {} answered the status query", printer.name);
                Ok(reply)
            }
            Err(PrintError::Device(message)) if message.contains(UNAUTHORIZED_DEVICE) => {
                Err(PrintError::DeviceNotAuthorized)
            }
            Err(e) => Err(e),
        }
    }

    async fn find_device(&self, uid: &str) -> PrintResult<PrinterDescriptor> {
        let devices = self.provider.discover().await?;
        debug!("Looking for printer {} among {} devices", uid, devices.len());

        devices
            .into_iter()
            .find(|device| device.matches(uid))
            .ok_or_else(|| PrintError::PrinterNotFound(uid.to_string()))
    }
}
