//! View-state adapters
//!
//! Thin state holders between the gateway and the presentation layer. Each
//! adapter exposes one [`LoadState`] that screens render from, and a
//! `refresh`-style operation that replaces it.
//!
//! Refreshes are guarded by a generation counter: a refresh that was
//! superseded by a newer one discards its result instead of overwriting
//! fresher state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::api::{ApiClient, Outcome};
use crate::history::HistoryBuilder;
use crate::models::{HistoryEntry, Route, User};
use crate::session::SessionStore;

/// User-facing messages for the common failure modes
pub mod messages {
    pub const SESSION_EXPIRED: &str = "Session expired. Please log in again.";
    pub const LOGIN_REQUIRED: &str = "Please log in to view your history.";
    pub const NO_ROUTES: &str = "No routes available.";
    pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
    pub const SIGNUP_FAILED: &str = "Sign up failed";
    pub const LOAD_FAILED: &str = "Something went wrong. Please try again.";
}

/// What a screen should render right now
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    Idle,
    Loading,
    Ready(T),
    Failed(String),
    Unauthorized,
}

impl<T> LoadState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }
}

/// Generation-guarded state slot shared by the refreshable adapters
struct Slot<T> {
    state: RwLock<LoadState<T>>,
    generation: AtomicU64,
}

impl<T: Clone> Slot<T> {
    fn new() -> Self {
        Self {
            state: RwLock::new(LoadState::Idle),
            generation: AtomicU64::new(0),
        }
    }

    /// Bump the generation, claiming it for a new refresh
    fn claim(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Store `state` unless a newer refresh has claimed the slot since
    async fn commit(&self, claimed: u64, state: LoadState<T>) -> bool {
        let mut slot = self.state.write().await;
        if self.generation.load(Ordering::SeqCst) != claimed {
            tracing::debug!(claimed, "discarding superseded refresh result");
            return false;
        }
        *slot = state;
        true
    }

    async fn current(&self) -> LoadState<T> {
        self.state.read().await.clone()
    }
}

/// Authentication state: restore on start, login/register/logout.
pub struct AuthView {
    api: Arc<ApiClient>,
    session: Arc<SessionStore>,
    state: RwLock<LoadState<User>>,
}

impl AuthView {
    pub fn new(api: Arc<ApiClient>, session: Arc<SessionStore>) -> Self {
        Self {
            api,
            session,
            state: RwLock::new(LoadState::Idle),
        }
    }

    pub async fn state(&self) -> LoadState<User> {
        self.state.read().await.clone()
    }

    pub async fn current_user(&self) -> Option<User> {
        match self.state().await {
            LoadState::Ready(user) => Some(user),
            _ => None,
        }
    }

    /// Restore the persisted session at process start
    pub async fn initialize(&self) {
        let state = match self.session.restore().await {
            Some(user) => LoadState::Ready(user),
            None => LoadState::Idle,
        };
        *self.state.write().await = state;
    }

    /// Log in and persist the session on success. Returns the user on
    /// success; a rejected credential surfaces as a failure message, not as
    /// the unauthorized state (there is no session to expire yet).
    pub async fn login(&self, email: &str, password: &str) -> Option<User> {
        *self.state.write().await = LoadState::Loading;
        let outcome = self.api.login(email, password).await;
        self.finish(outcome, messages::INVALID_CREDENTIALS).await
    }

    /// Register and persist the session on success
    pub async fn register(&self, email: &str, password: &str) -> Option<User> {
        *self.state.write().await = LoadState::Loading;
        let outcome = self.api.register(email, password).await;
        self.finish(outcome, messages::SIGNUP_FAILED).await
    }

    async fn finish(&self, outcome: Outcome<User>, rejection: &str) -> Option<User> {
        match outcome {
            Outcome::Data(user) => {
                self.session.persist(Some(&user)).await;
                *self.state.write().await = LoadState::Ready(user.clone());
                Some(user)
            }
            Outcome::Unauthorized | Outcome::Failure => {
                *self.state.write().await = LoadState::Failed(rejection.to_string());
                None
            }
        }
    }

    /// Clear the session and return to the signed-out state
    pub async fn logout(&self) {
        self.session.clear().await;
        *self.state.write().await = LoadState::Idle;
    }
}

/// Route-list state for the browse screen
pub struct RoutesView {
    api: Arc<ApiClient>,
    slot: Slot<Vec<Route>>,
}

impl RoutesView {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            slot: Slot::new(),
        }
    }

    pub async fn state(&self) -> LoadState<Vec<Route>> {
        self.slot.current().await
    }

    pub async fn refresh(&self) {
        let claimed = self.slot.claim();
        self.slot.commit(claimed, LoadState::Loading).await;

        let state = match self.api.list_routes().await {
            Outcome::Data(routes) if routes.is_empty() => {
                LoadState::Failed(messages::NO_ROUTES.to_string())
            }
            Outcome::Data(routes) => LoadState::Ready(routes),
            Outcome::Unauthorized => LoadState::Unauthorized,
            Outcome::Failure => LoadState::Failed(messages::LOAD_FAILED.to_string()),
        };
        self.slot.commit(claimed, state).await;
    }
}

/// History state for the history screen
pub struct HistoryView {
    builder: HistoryBuilder,
    session: Arc<SessionStore>,
    slot: Slot<Vec<HistoryEntry>>,
}

impl HistoryView {
    pub fn new(builder: HistoryBuilder, session: Arc<SessionStore>) -> Self {
        Self {
            builder,
            session,
            slot: Slot::new(),
        }
    }

    pub async fn state(&self) -> LoadState<Vec<HistoryEntry>> {
        self.slot.current().await
    }

    /// Rebuild the history for the signed-in user. Without a session the
    /// screen asks for a login; an unauthorized response from any fetch
    /// surfaces as the unauthorized state.
    pub async fn refresh(&self) {
        let claimed = self.slot.claim();

        let username = match self.session.restore().await {
            Some(user) => user.email,
            None => {
                self.slot
                    .commit(claimed, LoadState::Failed(messages::LOGIN_REQUIRED.to_string()))
                    .await;
                return;
            }
        };

        self.slot.commit(claimed, LoadState::Loading).await;

        let state = match self.builder.build(&username).await {
            Outcome::Data(entries) => LoadState::Ready(entries),
            Outcome::Unauthorized => LoadState::Unauthorized,
            Outcome::Failure => LoadState::Failed(messages::LOAD_FAILED.to_string()),
        };
        self.slot.commit(claimed, state).await;
    }
}
