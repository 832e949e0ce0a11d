use shared::{domain::Role, error::MarketError};

use crate::session::Session;

/// Why a protected view refused entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeniedReason {
    NoToken,
    WrongRole,
}

/// Admission decision for a protected view. On `Denied` the caller must
/// redirect to the unauthenticated entry view and surface the notice; no
/// partial rendering of the protected view is permitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Allowed(Session),
    Denied(DeniedReason),
}

impl Admission {
    /// Maps a denial onto the error taxonomy, for call sites that gate a
    /// fetch rather than a whole view.
    pub fn into_result(self, required_role: Role) -> Result<Session, MarketError> {
        match self {
            Admission::Allowed(session) => Ok(session),
            Admission::Denied(DeniedReason::NoToken) => Err(MarketError::Unauthenticated),
            Admission::Denied(DeniedReason::WrongRole) => {
                Err(MarketError::forbidden(access_denied_notice(required_role)))
            }
        }
    }
}

/// The single reusable admission check, applied before any protected view is
/// constructed. Runs synchronously on every entry because the session can be
/// cleared by a logout performed in another view.
pub fn admit(session: Option<&Session>, required_role: Role) -> Admission {
    match session {
        None => Admission::Denied(DeniedReason::NoToken),
        Some(session) if session.role != required_role => {
            Admission::Denied(DeniedReason::WrongRole)
        }
        Some(session) => Admission::Allowed(session.clone()),
    }
}

/// User-visible notice shown alongside the redirect on denial.
pub fn access_denied_notice(required_role: Role) -> String {
    format!("Access denied. Please log in as a {required_role} to view this page.")
}
