//! Request and response payloads exchanged with the backend

use serde::{Deserialize, Serialize};

/// Request for user login
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response for user login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub jwt: String,
}

/// The authenticated user, as returned by `/system/user/current-user`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: i64,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub user_role: Option<String>,
}

/// Printer configured server-side as the label target
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultPrinter {
    #[serde(default)]
    pub default_printer_uid: Option<String>,
}

impl DefaultPrinter {
    /// The configured identifier, ignoring blank values
    pub fn uid(&self) -> Option<&str> {
        self.default_printer_uid
            .as_deref()
            .map(str::trim)
            .filter(|uid| !uid.is_empty())
    }
}

/// Request to change the default printer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDefaultPrinter {
    pub default_printer_uid: String,
}

/// Request for a rendered label
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintItemRequest {
    pub item_id: i64,
    pub inventory_item_id: String,
    pub name: String,
    pub location: String,
}

/// Rendered label in the printer's command language
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelPayload {
    pub zpl_string: String,
}
