//! Session lifecycle controller
//!
//! Owns the decision of whether this tab is logged in. A valid session arms a
//! single expiry timer; expiry, an explicit logout and a logout signalled by
//! another tab all converge on the same logout routine.
//!
//! ```text
//! Anonymous --activate(valid)--> Authenticated --arm--> ExpiringScheduled
//!     ^                                                        |
//!     +------- logout / timer / remote signal / auth failure --+
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use api::{ApiClient, ApiError};
use common::{StoreHandle, TabId, keys};
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::broadcast::{AuthBroadcast, Subscription};
use crate::error::{SessionError, SessionResult};
use crate::jwt;
use crate::scanner::ScanningFlag;
use crate::validation::validate_credentials;

/// Longest delay ever handed to the expiry timer
const MAX_EXPIRY_DELAY: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

/// Source of wall-clock time used to judge token expiry
pub trait Clock: Send + Sync {
    /// Seconds since the epoch, with sub-second precision
    fn now_secs(&self) -> f64;
}

/// The system wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> f64 {
        jwt::now_secs()
    }
}

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Anonymous,
    Authenticated,
    /// Authenticated with the expiry timer armed
    ExpiringScheduled,
}

/// Surface the application should show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Landing,
}

/// Read-only view of the session published to observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub username: String,
    pub route: Route,
}

impl SessionSnapshot {
    fn anonymous() -> Self {
        Self {
            phase: SessionPhase::Anonymous,
            username: String::new(),
            route: Route::Login,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.phase != SessionPhase::Anonymous
    }
}

/// Why the logout routine ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// Explicit logout command
    UserRequested,
    /// The expiry timer fired
    Expired,
    /// The stored token was malformed or expired
    InvalidToken,
    /// The backend rejected the bearer token
    Unauthorized,
    /// Login failed after the token was stored
    LoginAborted,
    /// Another tab logged out
    Remote,
}

impl LogoutReason {
    /// Whether sibling tabs must be told about this logout
    pub fn broadcasts(self) -> bool {
        !matches!(self, LogoutReason::Remote | LogoutReason::LoginAborted)
    }
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            LogoutReason::UserRequested => "user requested",
            LogoutReason::Expired => "session expired",
            LogoutReason::InvalidToken => "invalid token",
            LogoutReason::Unauthorized => "rejected by backend",
            LogoutReason::LoginAborted => "login aborted",
            LogoutReason::Remote => "logged out in another tab",
        };
        f.write_str(reason)
    }
}

/// Tunables of a controller
#[derive(Clone)]
pub struct SessionOptions {
    pub clock: Arc<dyn Clock>,
    /// End sessions this long before the token actually expires
    pub expiry_leeway: Duration,
    /// Feature flag switched on while authenticated
    pub scanning: ScanningFlag,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            expiry_leeway: Duration::ZERO,
            scanning: ScanningFlag::new(),
        }
    }
}

struct ArmedTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

struct Inner {
    /// Held for the whole of every lifecycle transition
    transitions: AsyncMutex<()>,
    store: StoreHandle,
    broadcast: AuthBroadcast,
    options: SessionOptions,
    state: watch::Sender<SessionSnapshot>,
    timer: Mutex<Option<ArmedTimer>>,
    generations: AtomicU64,
    remote: Mutex<Option<Subscription>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.get_mut().take() {
            timer.handle.abort();
        }
    }
}

/// Session lifecycle controller of one tab
///
/// Cloning yields another handle onto the same controller. The expiry timer
/// and the remote logout listener stop once the last handle is dropped.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    pub fn new(store: StoreHandle, options: SessionOptions) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::anonymous());
        Self {
            inner: Arc::new(Inner {
                transitions: AsyncMutex::new(()),
                broadcast: AuthBroadcast::new(store.clone()),
                store,
                options,
                state,
                timer: Mutex::new(None),
                generations: AtomicU64::new(0),
                remote: Mutex::new(None),
            }),
        }
    }

    pub fn tab(&self) -> TabId {
        self.inner.store.tab()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.borrow().clone()
    }

    /// Observe every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    pub fn username(&self) -> String {
        self.inner.state.borrow().username.clone()
    }

    pub fn scanning(&self) -> &ScanningFlag {
        &self.inner.options.scanning
    }

    /// Whether an expiry timer is currently armed
    pub fn has_pending_expiry(&self) -> bool {
        self.inner.timer.lock().is_some()
    }

    /// Start the controller for a freshly loaded tab
    ///
    /// Listens for logouts in other tabs, then restores the session from the
    /// stored token: no token leaves the tab anonymous, a valid one arms the
    /// expiry timer and an invalid one runs the logout routine.
    pub async fn mount(&self) -> SessionResult<SessionSnapshot> {
        self.listen_for_remote_logout();
        let _transition = self.inner.transitions.lock().await;

        let Some(token) = self.inner.store.get(keys::TOKEN).await? else {
            debug!("Tab {} mounted without a stored session", self.tab());
            return Ok(self.snapshot());
        };

        match self.remaining_lifetime(&token) {
            Some(remaining) => self.enter_authenticated(remaining).await?,
            None => self.end_locked(LogoutReason::InvalidToken).await,
        }
        Ok(self.snapshot())
    }

    /// Stop listening for remote logouts and disarm the expiry timer
    pub fn unmount(&self) {
        self.disarm();
        self.inner.remote.lock().take();
    }

    /// Log in against the backend and start the session
    pub async fn login(
        &self,
        api: &ApiClient,
        username: &str,
        password: &str,
    ) -> SessionResult<SessionSnapshot> {
        validate_credentials(username, password).map_err(SessionError::InvalidInput)?;

        info!("Login attempt for user: {}", username);
        let response = api.login(username, password).await.map_err(|e| {
            if e.is_auth_failure() {
                SessionError::InvalidCredentials
            } else {
                SessionError::Api(e)
            }
        })?;

        // The stored token authenticates the user lookup, so both happen
        // inside the transition that activates the session
        let _transition = self.inner.transitions.lock().await;
        self.inner.store.set(keys::TOKEN, &response.jwt).await?;

        if let Err(e) = self.record_user(api, username).await {
            warn!("Login for {} aborted: {}", username, e);
            self.end_locked(LogoutReason::LoginAborted).await;
            return Err(e);
        }

        self.activate_locked().await
    }

    async fn record_user(&self, api: &ApiClient, username: &str) -> SessionResult<()> {
        let user = api.current_user().await?;
        self.inner
            .store
            .set(keys::USER_ID, &user.id.to_string())
            .await?;
        self.inner.store.set(keys::USER_NAME, username).await?;
        Ok(())
    }

    /// Start the session for the token already in the store
    ///
    /// An unreadable or expired token runs the logout routine and yields
    /// [`SessionError::InvalidToken`].
    pub async fn activate(&self) -> SessionResult<SessionSnapshot> {
        let _transition = self.inner.transitions.lock().await;
        self.activate_locked().await
    }

    async fn activate_locked(&self) -> SessionResult<SessionSnapshot> {
        let token = self.inner.store.get(keys::TOKEN).await?;
        match token.as_deref().and_then(|t| self.remaining_lifetime(t)) {
            Some(remaining) => {
                self.enter_authenticated(remaining).await?;
                Ok(self.snapshot())
            }
            None => {
                self.end_locked(LogoutReason::InvalidToken).await;
                Err(SessionError::InvalidToken)
            }
        }
    }

    /// Explicit logout command
    pub async fn logout(&self) {
        self.end(LogoutReason::UserRequested).await;
    }

    /// Log out when a backend call shows the token is no longer accepted
    ///
    /// Returns whether the session was ended.
    pub async fn handle_api_error(&self, error: &ApiError) -> bool {
        if !error.is_auth_failure() {
            return false;
        }
        self.end(LogoutReason::Unauthorized).await;
        true
    }

    /// Time left before the session must end, `None` if it already has
    fn remaining_lifetime(&self, token: &str) -> Option<Duration> {
        let claims = jwt::decode(token)?;
        let now = self.inner.options.clock.now_secs();
        if claims.is_expired_at(now) {
            return None;
        }

        let remaining = claims
            .exp
            .and_then(|exp| Duration::try_from_secs_f64(exp - now).ok())
            .unwrap_or(MAX_EXPIRY_DELAY)
            .min(MAX_EXPIRY_DELAY);

        remaining
            .checked_sub(self.inner.options.expiry_leeway)
            .filter(|left| !left.is_zero())
    }

    async fn enter_authenticated(&self, remaining: Duration) -> SessionResult<()> {
        let username = self
            .inner
            .store
            .get(keys::USER_NAME)
            .await?
            .unwrap_or_default();

        self.inner.options.scanning.enable();
        self.inner.state.send_modify(|state| {
            state.phase = SessionPhase::Authenticated;
            state.username = username;
            state.route = Route::Landing;
        });

        self.arm(remaining);
        info!(
            "Tab {} authenticated, session ends in {:.0}s",
            self.tab(),
            remaining.as_secs_f64()
        );
        Ok(())
    }

    /// Arm the expiry timer, replacing any previous one
    fn arm(&self, remaining: Duration) {
        // Monotonic deadline computed once; wall-clock jumps do not move it
        let deadline = Instant::now() + remaining;
        let generation = self.inner.generations.fetch_add(1, Ordering::SeqCst);
        let weak = Arc::downgrade(&self.inner);

        let mut slot = self.inner.timer.lock();
        if let Some(previous) = slot.take() {
            debug!("Replacing expiry timer #{}", previous.generation);
            previous.handle.abort();
        }

        let handle = tokio::spawn(async move {
            time::sleep_until(deadline).await;

            let Some(inner) = weak.upgrade() else {
                return;
            };
            let session = SessionController { inner };
            let _transition = session.inner.transitions.lock().await;
            {
                // A transition that ran while this task waited may have re-armed
                let mut slot = session.inner.timer.lock();
                if slot.as_ref().map(|timer| timer.generation) != Some(generation) {
                    debug!("Expiry timer #{} is stale", generation);
                    return;
                }
                // Detach rather than abort: this task runs the logout itself
                slot.take();
            }

            session.end_locked(LogoutReason::Expired).await;
        });

        *slot = Some(ArmedTimer { generation, handle });
        drop(slot);

        self.inner
            .state
            .send_modify(|state| state.phase = SessionPhase::ExpiringScheduled);
    }

    fn disarm(&self) {
        if let Some(timer) = self.inner.timer.lock().take() {
            debug!("Disarming expiry timer #{}", timer.generation);
            timer.handle.abort();
        }
    }

    fn listen_for_remote_logout(&self) {
        let mut remote = self.inner.remote.lock();
        if remote.is_some() {
            return;
        }

        let weak = Arc::downgrade(&self.inner);
        *remote = Some(self.inner.broadcast.on_external_logout(move || {
            let weak = weak.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    SessionController { inner }.end(LogoutReason::Remote).await;
                }
            }
        }));
    }

    async fn end(&self, reason: LogoutReason) {
        let _transition = self.inner.transitions.lock().await;
        self.end_locked(reason).await;
    }

    /// The logout routine, run with the transition lock held
    ///
    /// Idempotent and best-effort: a failing step is logged and the remaining
    /// steps still run.
    async fn end_locked(&self, reason: LogoutReason) {
        self.disarm();

        for key in keys::SESSION_FIELDS {
            if let Err(e) = self.inner.store.remove(key).await {
                warn!("Failed to clear {} during logout: {}", key, e);
            }
        }

        // Dependent features must be off before anyone sees the anonymous state
        self.inner.options.scanning.disable();
        self.inner.state.send_modify(|state| {
            state.phase = SessionPhase::Anonymous;
            state.username.clear();
        });

        if reason.broadcasts() {
            if let Err(e) = self.inner.broadcast.signal_logout().await {
                warn!("Failed to signal logout to other tabs: {}", e);
            }
        }

        self.inner
            .state
            .send_modify(|state| state.route = Route::Login);
        info!("Tab {} logged out: {}", self.tab(), reason);
    }
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("tab", &self.tab())
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}
