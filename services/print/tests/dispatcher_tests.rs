//! Print dispatch against a stubbed backend and a fake printer provider

use std::sync::Arc;

use api::ApiClient;
use async_trait::async_trait;
use common::{MemoryStore, StoreHandle, keys};
use parking_lot::Mutex;
use print::{
    MAX_BULK_SELECTION, LabelItem, PrintDispatcher, PrintError, PrintResult, PrinterDescriptor,
    PrinterProvider, STATUS_COMMAND,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LABEL: &str = "^XA...^XZ";

#[derive(Default)]
struct FakeProvider {
    devices: Vec<PrinterDescriptor>,
    read_error: Option<String>,
    fail_after: Option<usize>,
    discovered: Mutex<usize>,
    sent: Mutex<Vec<(String, String)>>,
}

impl FakeProvider {
    fn with_devices(devices: &[(&str, &str)]) -> Self {
        Self {
            devices: devices
                .iter()
                .map(|(uid, connection)| printer(uid, connection))
                .collect(),
            ..Self::default()
        }
    }

    fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }

    fn discovered(&self) -> usize {
        *self.discovered.lock()
    }
}

#[async_trait]
impl PrinterProvider for FakeProvider {
    async fn discover(&self) -> PrintResult<Vec<PrinterDescriptor>> {
        *self.discovered.lock() += 1;
        Ok(self.devices.clone())
    }

    async fn send_then_read(
        &self,
        device: &PrinterDescriptor,
        command: &str,
    ) -> PrintResult<String> {
        if let Some(message) = &self.read_error {
            return Err(PrintError::Device(message.clone()));
        }
        self.sent.lock().push((device.uid.clone(), command.to_string()));
        Ok("PRINTER STATUS\r\n ERRORS: 0 00000000 00000000".to_string())
    }

    async fn send(&self, device: &PrinterDescriptor, payload: &str) -> PrintResult<()> {
        let mut sent = self.sent.lock();
        if self.fail_after.is_some_and(|limit| sent.len() >= limit) {
            return Err(PrintError::Device("Paper out".to_string()));
        }
        sent.push((device.uid.clone(), payload.to_string()));
        Ok(())
    }
}

fn printer(uid: &str, connection: &str) -> PrinterDescriptor {
    serde_json::from_value(json!({
        "name": format!("Printer {uid}"),
        "uid": uid,
        "connection": connection,
        "deviceType": "printer"
    }))
    .expect("valid descriptor")
}

fn item(id: i64) -> LabelItem {
    LabelItem::new(id, format!("SOL-{id:04}"), "Sodium chloride", "Cabinet A")
}

async fn backend(default_printer: serde_json::Value) -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let tab = StoreHandle::new(Arc::new(MemoryStore::new()));
    tab.set(keys::TOKEN, "abc.def.ghi").await.unwrap();

    Mock::given(method("POST"))
        .and(path("/api/system/print/item"))
        .and(header("Authorization", "Bearer abc.def.ghi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "zplString": LABEL })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/system/print/default-printer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(default_printer))
        .mount(&server)
        .await;

    let api = ApiClient::new(format!("{}/api", server.uri()), tab);
    (server, api)
}

fn dispatcher(api: ApiClient, provider: &Arc<FakeProvider>) -> PrintDispatcher {
    PrintDispatcher::new(api, provider.clone())
}

#[tokio::test]
async fn test_label_reaches_default_printer_once() {
    let (_server, api) = backend(json!({ "defaultPrinterUid": "ZEBRA-1" })).await;
    let provider = Arc::new(FakeProvider::with_devices(&[
        ("OTHER-9", "usb"),
        ("ZEBRA-1", "network"),
    ]));

    dispatcher(api, &provider)
        .print_label(&item(7))
        .await
        .expect("label printed");

    assert_eq!(
        provider.sent(),
        vec![("ZEBRA-1".to_string(), LABEL.to_string())]
    );
}

#[tokio::test]
async fn test_default_printer_matched_by_connection_string() {
    let (_server, api) = backend(json!({ "defaultPrinterUid": "tcp://10.0.0.5:9100" })).await;
    let provider = Arc::new(FakeProvider::with_devices(&[("ZEBRA-1", "tcp://10.0.0.5:9100")]));

    dispatcher(api, &provider).print_label(&item(1)).await.unwrap();
    assert_eq!(provider.sent().len(), 1);
}

#[tokio::test]
async fn test_missing_default_printer_never_falls_back() {
    let (_server, api) = backend(json!({ "defaultPrinterUid": "ZEBRA-1" })).await;
    let provider = Arc::new(FakeProvider::with_devices(&[("OTHER-9", "usb")]));

    let result = dispatcher(api, &provider).print_label(&item(7)).await;
    assert!(matches!(result, Err(PrintError::PrinterNotFound(uid)) if uid == "ZEBRA-1"));
    assert!(provider.sent().is_empty());
}

#[tokio::test]
async fn test_unconfigured_default_printer() {
    let (_server, api) = backend(json!({ "defaultPrinterUid": "  " })).await;
    let provider = Arc::new(FakeProvider::with_devices(&[("ZEBRA-1", "usb")]));

    let result = dispatcher(api, &provider).print_label(&item(7)).await;
    assert!(matches!(
        result,
        Err(PrintError::NoDefaultPrinter { source: None })
    ));
    assert_eq!(provider.discovered(), 0);
}

#[tokio::test]
async fn test_label_failure_stops_before_printer_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/system/print/item"))
        .respond_with(ResponseTemplate::new(500).set_body_string("template missing"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/system/print/default-printer"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let tab = StoreHandle::new(Arc::new(MemoryStore::new()));
    let api = ApiClient::new(format!("{}/api", server.uri()), tab);
    let provider = Arc::new(FakeProvider::with_devices(&[("ZEBRA-1", "usb")]));

    let result = dispatcher(api, &provider).print_label(&item(7)).await;
    assert!(matches!(result, Err(PrintError::LabelUnavailable(_))));
    assert_eq!(provider.discovered(), 0);
}

#[tokio::test]
async fn test_bulk_selection_bounds_checked_before_any_call() {
    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let tab = StoreHandle::new(Arc::new(MemoryStore::new()));
    let api = ApiClient::new(format!("{}/api", server.uri()), tab);
    let provider = Arc::new(FakeProvider::with_devices(&[("ZEBRA-1", "usb")]));
    let dispatcher = dispatcher(api, &provider);

    for count in [0, MAX_BULK_SELECTION + 1] {
        let items: Vec<_> = (0..count as i64).map(item).collect();
        let result = dispatcher.bulk_print(&items).await;
        assert!(matches!(
            result,
            Err(PrintError::SelectionOutOfRange { count: c, max: 50 }) if c == count
        ));
    }
    assert_eq!(provider.discovered(), 0);
    assert!(provider.sent().is_empty());
}

#[tokio::test]
async fn test_bulk_accepts_one_and_fifty_items() {
    let (_server, api) = backend(json!({ "defaultPrinterUid": "ZEBRA-1" })).await;
    let provider = Arc::new(FakeProvider::with_devices(&[("ZEBRA-1", "usb")]));
    let dispatcher = dispatcher(api, &provider);

    assert_eq!(dispatcher.bulk_print(&[item(1)]).await.unwrap(), 1);

    let items: Vec<_> = (1..=MAX_BULK_SELECTION as i64).map(item).collect();
    assert_eq!(dispatcher.bulk_print(&items).await.unwrap(), 50);
    assert_eq!(provider.sent().len(), 51);
}

#[tokio::test]
async fn test_bulk_stops_at_first_failure() {
    let (_server, api) = backend(json!({ "defaultPrinterUid": "ZEBRA-1" })).await;
    let provider = Arc::new(FakeProvider {
        fail_after: Some(2),
        ..FakeProvider::with_devices(&[("ZEBRA-1", "usb")])
    });

    let items: Vec<_> = (1..=5).map(item).collect();
    let result = dispatcher(api, &provider).bulk_print(&items).await;

    match result {
        Err(PrintError::BulkAborted {
            printed,
            item_id,
            source,
        }) => {
            assert_eq!(printed, 2);
            assert_eq!(item_id, 3);
            assert!(matches!(*source, PrintError::Device(ref m) if m == "Paper out"));
        }
        other => panic!("expected bulk abort, got {other:?}"),
    }
    assert_eq!(provider.sent().len(), 2);
}

#[tokio::test]
async fn test_available_printers_only_lists_usb_and_network() {
    let (_server, api) = backend(json!({})).await;
    let provider = Arc::new(FakeProvider::with_devices(&[
        ("A", "usb"),
        ("B", "driver"),
        ("C", "network"),
    ]));

    let uids: Vec<_> = dispatcher(api, &provider)
        .available_printers()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.uid)
        .collect();
    assert_eq!(uids, ["A", "C"]);
}

#[tokio::test]
async fn test_connectivity_sends_status_query() {
    let (_server, api) = backend(json!({})).await;
    let provider = Arc::new(FakeProvider::with_devices(&[("ZEBRA-1", "usb")]));

    let reply = dispatcher(api, &provider)
        .test_connectivity("ZEBRA-1")
        .await
        .unwrap();
    assert!(reply.contains("PRINTER STATUS"));
    assert_eq!(
        provider.sent(),
        vec![("ZEBRA-1".to_string(), STATUS_COMMAND.to_string())]
    );
}

#[tokio::test]
async fn test_connectivity_reports_unauthorized_device() {
    let (_server, api) = backend(json!({})).await;
    let provider = Arc::new(FakeProvider {
        read_error: Some("Unauthorized device detected: ZD421".to_string()),
        ..FakeProvider::with_devices(&[("ZEBRA-1", "usb")])
    });
    let dispatcher = dispatcher(api, &provider);

    let result = dispatcher.test_connectivity("ZEBRA-1").await;
    assert!(matches!(result, Err(PrintError::DeviceNotAuthorized)));

    let result = dispatcher.test_connectivity("ZEBRA-2").await;
    assert!(matches!(result, Err(PrintError::PrinterNotFound(_))));
}

#[tokio::test]
async fn test_save_default_printer() {
    let (server, api) = backend(json!({})).await;
    Mock::given(method("PATCH"))
        .and(path("/api/system/print/default-printer"))
        .and(body_json(json!({ "defaultPrinterUid": "ZEBRA-1" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let provider = Arc::new(FakeProvider::default());

    dispatcher(api, &provider)
        .save_default_printer("ZEBRA-1")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_auth_failure_is_exposed_to_callers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/system/print/item"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let tab = StoreHandle::new(Arc::new(MemoryStore::new()));
    let api = ApiClient::new(format!("{}/api", server.uri()), tab);
    let provider = Arc::new(FakeProvider::default());

    let error = dispatcher(api, &provider)
        .print_label(&item(1))
        .await
        .unwrap_err();
    assert!(error.api_error().is_some_and(|e| e.is_auth_failure()));
}
