//! Printer devices and printable items

use api::models::PrintItemRequest;
use serde::{Deserialize, Serialize};

/// How a printer is attached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    Usb,
    Network,
    Other,
}

/// A device reported by the local print agent
///
/// Sent back verbatim when addressing the device, so unknown fields must
/// survive the round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterDescriptor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub connection: String,
    #[serde(default)]
    pub device_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PrinterDescriptor {
    pub fn kind(&self) -> ConnectionKind {
        match self.connection.to_ascii_lowercase().as_str() {
            "usb" => ConnectionKind::Usb,
            "network" => ConnectionKind::Network,
            _ => ConnectionKind::Other,
        }
    }

    /// Whether `id` names this device by unique id or connection string
    pub fn matches(&self, id: &str) -> bool {
        !id.is_empty() && (self.uid == id || self.connection == id)
    }
}

/// Devices listed by the print agent's `/available` endpoint
#[derive(Debug, Default, Deserialize)]
pub(crate) struct AvailableDevices {
    #[serde(default)]
    pub printer: Vec<PrinterDescriptor>,
}

/// An inventory item to print a label for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelItem {
    pub id: i64,
    pub inventory_item_id: String,
    pub name: String,
    /// Resolved location name
    pub location: String,
}

impl LabelItem {
    pub fn new(
        id: i64,
        inventory_item_id: impl Into<String>,
        name: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            id,
            inventory_item_id: inventory_item_id.into(),
            name: name.into(),
            location: location.into(),
        }
    }

    pub(crate) fn to_request(&self) -> PrintItemRequest {
        PrintItemRequest {
            item_id: self.id,
            inventory_item_id: self.inventory_item_id.clone(),
            name: self.name.clone(),
            location: self.location.clone(),
        }
    }
}
