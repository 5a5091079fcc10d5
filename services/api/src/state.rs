//! Shared Application State

use crate::broker::SessionBroker;
use receptionist_core::ReceptionistService;
use std::sync::Arc;

/// Created once at startup and shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub receptionist: Arc<ReceptionistService>,
    pub broker: Arc<dyn SessionBroker>,
}
