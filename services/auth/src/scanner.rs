//! Barcode scanning input
//!
//! Hand-held scanners act as keyboards that type a URL very quickly and end
//! with Enter. Keys arriving in a fast burst are collected; a slow key starts
//! a new scan. Scanning is only active while a session is authenticated.

use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use regex::Regex;
use tracing::debug;

/// Maximum gap between two keys of the same scan
pub const SCAN_BURST_GAP: Duration = Duration::from_millis(50);

/// Feature flag gating scan input, shared between the session and the listener
#[derive(Debug, Clone, Default)]
pub struct ScanningFlag(Arc<AtomicBool>);

impl ScanningFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn disable(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A key press as seen by the scan listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanKey {
    /// A printable character
    Char(char),
    Enter,
    /// Modifiers, navigation and other non-printable keys
    Other,
}

/// Accumulates scanner keystrokes into complete scans
#[derive(Debug)]
pub struct ScanBuffer {
    flag: ScanningFlag,
    buffer: String,
    last_input: Option<Instant>,
}

impl ScanBuffer {
    pub fn new(flag: ScanningFlag) -> Self {
        Self {
            flag,
            buffer: String::new(),
            last_input: None,
        }
    }

    /// Feed one key received at `at`; returns the scanned URL on Enter
    pub fn feed(&mut self, key: ScanKey, at: Instant) -> Option<String> {
        if !self.flag.is_enabled() {
            return None;
        }

        let gap = self.last_input.map(|last| at.saturating_duration_since(last));
        self.last_input = Some(at);

        match key {
            ScanKey::Enter => {
                let scanned = std::mem::take(&mut self.buffer);
                let scanned = scanned.trim();
                if scanned.is_empty() {
                    return None;
                }
                let url = normalize_scanned_url(scanned);
                debug!("Scanned {}", url);
                Some(url)
            }
            ScanKey::Char(c) => {
                match gap {
                    Some(gap) if gap < SCAN_BURST_GAP => self.buffer.push(c),
                    _ => {
                        self.buffer.clear();
                        self.buffer.push(c);
                    }
                }
                None
            }
            ScanKey::Other => None,
        }
    }
}

/// Prefix `https://` unless the scan already carries an http(s) scheme
pub fn normalize_scanned_url(scanned: &str) -> String {
    static SCHEME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = SCHEME_REGEX
        .get_or_init(|| Regex::new(r"(?i)^https?://").expect("Failed to compile scheme regex"));

    if regex.is_match(scanned) {
        scanned.to_string()
    } else {
        format!("https://{}", scanned)
    }
}
