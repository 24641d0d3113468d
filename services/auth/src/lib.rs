//! Session lifecycle for the LabTrac client
//!
//! Decides whether a tab is logged in, ends the session when its token
//! expires and keeps every tab sharing the session store in agreement about
//! logouts.

pub mod broadcast;
pub mod error;
pub mod jwt;
pub mod scanner;
pub mod session;
pub mod validation;

pub use broadcast::{AuthBroadcast, Subscription};
pub use error::{SessionError, SessionResult};
pub use scanner::{ScanBuffer, ScanKey, ScanningFlag};
pub use session::{
    Clock, LogoutReason, Route, SessionController, SessionOptions, SessionPhase, SessionSnapshot,
    SystemClock,
};
