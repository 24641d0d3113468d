//! Access to local printers
//!
//! [`PrinterProvider`] is the seam between the dispatcher and whatever talks
//! to the hardware. [`BrowserPrintProvider`] drives the Zebra Browser Print
//! agent, which listens on localhost and relays to USB and network printers.

use async_trait::async_trait;
use reqwest::Response;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{PrintError, PrintResult};
use crate::models::{AvailableDevices, PrinterDescriptor};

/// Device discovery and raw command transport
#[async_trait]
pub trait PrinterProvider: Send + Sync {
    /// List the printers currently reachable
    async fn discover(&self) -> PrintResult<Vec<PrinterDescriptor>>;

    /// Send a command and return the device's reply
    async fn send_then_read(
        &self,
        device: &PrinterDescriptor,
        command: &str,
    ) -> PrintResult<String>;

    /// Send a payload without waiting for a reply
    async fn send(&self, device: &PrinterDescriptor, payload: &str) -> PrintResult<()>;
}

#[derive(Serialize)]
struct WriteRequest<'a> {
    device: &'a PrinterDescriptor,
    data: &'a str,
}

#[derive(Serialize)]
struct ReadRequest<'a> {
    device: &'a PrinterDescriptor,
}

/// Client for the Browser Print agent's HTTP interface
#[derive(Debug, Clone)]
pub struct BrowserPrintProvider {
    http: reqwest::Client,
    base_url: String,
}

impl BrowserPrintProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http_client(reqwest::Client::new(), base_url)
    }

    pub fn with_http_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Post to a device endpoint; failures are reported by the device
    async fn post_device<T>(&self, path: &str, body: &T) -> PrintResult<Response>
    where
        T: Serialize + Sync,
    {
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| PrintError::SdkUnavailable(e.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let message = response.text().await.unwrap_or_default();
        warn!("Print agent {} failed with {}: {}", path, status, message);
        Err(PrintError::Device(if message.is_empty() {
            status.to_string()
        } else {
            message
        }))
    }
}

#[async_trait]
impl PrinterProvider for BrowserPrintProvider {
    async fn discover(&self) -> PrintResult<Vec<PrinterDescriptor>> {
        let response = self
            .http
            .get(self.url("/available"))
            .send()
            .await
            .and_then(Response::error_for_status)
            .map_err(|e| PrintError::SdkUnavailable(e.to_string()))?;

        let devices: AvailableDevices = response
            .json()
            .await
            .map_err(|e| PrintError::SdkUnavailable(format!("Unreadable device list: {}", e)))?;

        debug!("Print agent reported {} printers", devices.printer.len());
        Ok(devices.printer)
    }

    async fn send_then_read(
        &self,
        device: &PrinterDescriptor,
        command: &str,
    ) -> PrintResult<String> {
        self.send(device, command).await?;
        let response = self.post_device("/read", &ReadRequest { device }).await?;
        response
            .text()
            .await
            .map_err(|e| PrintError::Device(e.to_string()))
    }

    async fn send(&self, device: &PrinterDescriptor, payload: &str) -> PrintResult<()> {
        debug!("Sending {} bytes to {}", payload.len(), device.name);
        self.post_device(
            "/write",
            &WriteRequest {
                device,
                data: payload,
            },
        )
        .await?;
        Ok(())
    }
}
