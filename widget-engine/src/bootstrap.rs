use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use widget_core::screen::Screen;
use widget_core::types::{ContactSessionId, OrganizationId};

use crate::router::RouterStore;
use crate::traits::{ContactSessionValidator, OrganizationValidator, ValidationOutcome};

pub const MSG_STARTING: &str = "Starting up...";
pub const MSG_FINDING_ORGANIZATION: &str = "Finding organization...";
pub const MSG_VALIDATING_SESSION: &str = "Validating session...";

pub const ERR_ORGANIZATION_REQUIRED: &str = "Organization ID is required";
pub const ERR_ORGANIZATION_FAILED: &str = "Organization validation failed";
pub const ERR_SESSION_FAILED: &str = "Contact session validation failed";
pub const ERR_GENERIC: &str = "Something went wrong";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapPhase {
    Organization,
    Session,
    // Reserved: widget settings and voice warm-up are not part of start-up yet.
    Settings,
    VapiInit,
    Done,
}

/// Progress of one bootstrap step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The phase finished and the sequencer moved on.
    Advanced(BootstrapPhase),
    /// Terminal screen reached.
    Routed(Screen),
    /// Error screen shown; the sequencer will not continue.
    Halted,
    /// An async result arrived after its inputs or phase were superseded.
    Stale,
    /// Nothing to do for the current inputs (already dispatched, finished,
    /// or waiting on storage).
    Idle,
}

/// Where [`BootstrapSequencer::run`] stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Routed { screen: Screen, session_valid: bool },
    Failed { message: String },
    Pending { phase: BootstrapPhase },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootstrapSnapshot {
    pub phase: BootstrapPhase,
    pub session_valid: bool,
    pub loading_messages: Vec<String>,
}

impl BootstrapSnapshot {
    /// The current status line.
    pub fn loading_message(&self) -> Option<&str> {
        self.loading_messages.last().map(String::as_str)
    }
}

// The inputs a phase was dispatched for. A phase runs at most once per key.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PhaseKey {
    Organization(OrganizationId),
    Session(OrganizationId, ContactSessionId),
}

#[derive(Debug)]
struct Inner {
    phase: BootstrapPhase,
    organization_id: Option<OrganizationId>,
    session_valid: bool,
    loading_messages: Vec<String>,
    dispatched: Option<PhaseKey>,
    halted: bool,
    routed: Option<Screen>,

    // Captured by every async dispatch; a result is applied only if the token
    // is unchanged when it resolves.
    token: u64,
}

impl Inner {
    fn new(organization_id: Option<OrganizationId>) -> Self {
        Self {
            phase: BootstrapPhase::Organization,
            organization_id,
            session_valid: false,
            loading_messages: vec![MSG_STARTING.to_string()],
            dispatched: None,
            halted: false,
            routed: None,
            token: 0,
        }
    }

    fn advance(&mut self, phase: BootstrapPhase) {
        log::info!("bootstrap phase: {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
        self.dispatched = None;
    }
}

/// Drives widget start-up: organization -> contact session -> first screen.
///
/// Cheap to clone; clones share progress. Calling [`step`](Self::step) or
/// [`run`](Self::run) again with unchanged inputs never repeats a validator
/// call.
#[derive(Clone)]
pub struct BootstrapSequencer {
    inner: Arc<Mutex<Inner>>,
    router: RouterStore,
    organizations: Arc<dyn OrganizationValidator>,
    sessions: Arc<dyn ContactSessionValidator>,
}

impl BootstrapSequencer {
    pub fn new(
        router: RouterStore,
        organization_id: Option<OrganizationId>,
        organizations: Arc<dyn OrganizationValidator>,
        sessions: Arc<dyn ContactSessionValidator>,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::new(organization_id))),
            router,
            organizations,
            sessions,
        }
    }

    /// Updates the organization input (e.g. the embed query changed).
    ///
    /// Only takes effect before the organization phase has succeeded; an
    /// in-flight validation for the previous value is discarded when it lands.
    pub async fn set_organization_id(&self, organization_id: Option<OrganizationId>) {
        let mut inner = self.inner.lock().await;
        if inner.organization_id == organization_id {
            return;
        }
        if inner.phase != BootstrapPhase::Organization {
            log::debug!("organization changed after validation; keeping the validated one");
            return;
        }
        inner.organization_id = organization_id;
        inner.dispatched = None;
        inner.token = inner.token.wrapping_add(1);
    }

    pub async fn snapshot(&self) -> BootstrapSnapshot {
        let inner = self.inner.lock().await;
        BootstrapSnapshot {
            phase: inner.phase,
            session_valid: inner.session_valid,
            loading_messages: inner.loading_messages.clone(),
        }
    }

    /// Steps until the sequencer routes, halts, or cannot make progress.
    pub async fn run(&self) -> BootstrapOutcome {
        loop {
            match self.step().await {
                StepOutcome::Advanced(_) => continue,
                StepOutcome::Routed(_) | StepOutcome::Halted | StepOutcome::Stale | StepOutcome::Idle => {
                    break;
                }
            }
        }
        self.outcome().await
    }

    pub async fn outcome(&self) -> BootstrapOutcome {
        let inner = self.inner.lock().await;
        if let Some(screen) = inner.routed {
            return BootstrapOutcome::Routed {
                screen,
                session_valid: inner.session_valid,
            };
        }
        if inner.halted {
            let message = self
                .router
                .state()
                .error_message
                .unwrap_or_else(|| ERR_GENERIC.to_string());
            return BootstrapOutcome::Failed { message };
        }
        BootstrapOutcome::Pending { phase: inner.phase }
    }

    /// Runs the current phase once for the current inputs.
    pub async fn step(&self) -> StepOutcome {
        let phase = {
            let inner = self.inner.lock().await;
            if inner.halted || inner.routed.is_some() {
                return StepOutcome::Idle;
            }
            inner.phase
        };

        match phase {
            BootstrapPhase::Organization => self.organization_step().await,
            BootstrapPhase::Session => self.session_step().await,
            BootstrapPhase::Settings | BootstrapPhase::VapiInit => {
                let mut inner = self.inner.lock().await;
                inner.advance(BootstrapPhase::Done);
                StepOutcome::Advanced(BootstrapPhase::Done)
            }
            BootstrapPhase::Done => self.done_step().await,
        }
    }

    async fn organization_step(&self) -> StepOutcome {
        let (organization_id, token) = {
            let mut inner = self.inner.lock().await;
            let Some(organization_id) = inner.organization_id.clone() else {
                self.halt(&mut inner, ERR_ORGANIZATION_REQUIRED.to_string());
                return StepOutcome::Halted;
            };

            let key = PhaseKey::Organization(organization_id.clone());
            if inner.dispatched.as_ref() == Some(&key) {
                return StepOutcome::Idle;
            }
            inner.dispatched = Some(key);
            inner.token = inner.token.wrapping_add(1);
            inner.loading_messages.push(MSG_FINDING_ORGANIZATION.to_string());
            (organization_id, inner.token)
        };

        let result = self.organizations.validate(&organization_id).await;

        let mut inner = self.inner.lock().await;
        if !self.is_current(&inner, token, BootstrapPhase::Organization) {
            log::debug!("discarding stale organization result for {organization_id}");
            return StepOutcome::Stale;
        }

        match rejection(result, ERR_ORGANIZATION_FAILED) {
            None => {
                self.router.set_organization_id(organization_id);
                inner.advance(BootstrapPhase::Session);
                StepOutcome::Advanced(BootstrapPhase::Session)
            }
            Some(message) => {
                self.halt(&mut inner, message);
                StepOutcome::Halted
            }
        }
    }

    async fn session_step(&self) -> StepOutcome {
        let (key, contact_session_id, token) = {
            let mut inner = self.inner.lock().await;
            let Some(organization_id) = inner.organization_id.clone() else {
                return StepOutcome::Idle;
            };

            if !self.router.storage_available() {
                log::info!("no session storage in this context; waiting");
                return StepOutcome::Idle;
            }

            let Some(contact_session_id) = self.router.state().contact_session_id else {
                inner.session_valid = false;
                inner.advance(BootstrapPhase::Done);
                return StepOutcome::Advanced(BootstrapPhase::Done);
            };

            let key = PhaseKey::Session(organization_id, contact_session_id.clone());
            if inner.dispatched.as_ref() == Some(&key) {
                return StepOutcome::Idle;
            }
            inner.dispatched = Some(key.clone());
            inner.token = inner.token.wrapping_add(1);
            inner.loading_messages.push(MSG_VALIDATING_SESSION.to_string());
            (key, contact_session_id, inner.token)
        };

        let result = self.sessions.validate(&contact_session_id).await;

        let mut inner = self.inner.lock().await;
        if !self.is_current(&inner, token, BootstrapPhase::Session)
            || inner.dispatched.as_ref() != Some(&key)
        {
            log::debug!("discarding stale contact session result for {contact_session_id}");
            return StepOutcome::Stale;
        }

        match rejection(result, ERR_SESSION_FAILED) {
            None => {
                inner.session_valid = true;
                inner.advance(BootstrapPhase::Done);
                self.router.set_contact_session_id(contact_session_id);
                StepOutcome::Advanced(BootstrapPhase::Done)
            }
            Some(message) => {
                self.halt(&mut inner, message);
                StepOutcome::Halted
            }
        }
    }

    async fn done_step(&self) -> StepOutcome {
        let mut inner = self.inner.lock().await;
        let screen = if inner.session_valid {
            Screen::Selection
        } else {
            Screen::Auth
        };
        inner.routed = Some(screen);
        self.router.navigate(screen);
        StepOutcome::Routed(screen)
    }

    fn is_current(&self, inner: &Inner, token: u64, phase: BootstrapPhase) -> bool {
        inner.token == token
            && inner.phase == phase
            && !inner.halted
            && self.router.screen() != Screen::Error
    }

    fn halt(&self, inner: &mut Inner, message: String) {
        log::warn!("bootstrap halted in {:?}: {message}", inner.phase);
        inner.halted = true;
        self.router.fail(message);
    }
}

/// `None` when the collaborator accepted; otherwise the message to show.
fn rejection(
    result: anyhow::Result<ValidationOutcome>,
    fallback: &'static str,
) -> Option<String> {
    match result {
        Ok(outcome) if outcome.valid => None,
        Ok(outcome) => Some(
            outcome
                .reason
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| ERR_GENERIC.to_string()),
        ),
        Err(e) => {
            let message = e.to_string();
            if message.trim().is_empty() {
                Some(fallback.to_string())
            } else {
                Some(message)
            }
        }
    }
}
