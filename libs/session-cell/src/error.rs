use thiserror::Error;

use shared_models::PortalError;

use crate::models::SessionStatus;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No active consultation")]
    NoActiveConsultation,

    #[error("No eligible next appointment in the queue")]
    NoEligibleNext,

    #[error("Invalid session transition from {from} to {to}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    #[error(transparent)]
    Backend(#[from] PortalError),
}
