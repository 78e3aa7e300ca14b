//! HTTP API for the math tutor

mod assets;
mod handlers;
mod types;

pub use handlers::create_router;

use crate::auth::CredentialVerifier;
use crate::context::ContextStore;
use crate::tutor::{LlmClient, Tutor};
use std::sync::Arc;

/// Tutor with its collaborators erased, as shared by the handlers
pub type DynTutor = Tutor<Arc<dyn ContextStore>, Arc<dyn LlmClient>>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub tutor: Arc<DynTutor>,
    pub credentials: Arc<dyn CredentialVerifier>,
}

impl AppState {
    pub fn new(tutor: DynTutor, credentials: Arc<dyn CredentialVerifier>) -> Self {
        Self {
            tutor: Arc::new(tutor),
            credentials,
        }
    }
}
