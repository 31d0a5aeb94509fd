//! Security-audit events, emitted under the `audit` tracing target so they can
//! be routed separately from request logs (`RUST_LOG=audit=info`).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEvent {
    MissingToken,
    InvalidToken,
    PrivilegeDenied,
    StoreUnavailable,
    AdminAccess,
    SigninSucceeded,
    SigninFailed,
    Signout,
    GrantAdded,
    GrantRevoked,
}

impl AuditEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEvent::MissingToken => "missing_token",
            AuditEvent::InvalidToken => "invalid_token",
            AuditEvent::PrivilegeDenied => "privilege_denied",
            AuditEvent::StoreUnavailable => "store_unavailable",
            AuditEvent::AdminAccess => "admin_access",
            AuditEvent::SigninSucceeded => "signin_succeeded",
            AuditEvent::SigninFailed => "signin_failed",
            AuditEvent::Signout => "signout",
            AuditEvent::GrantAdded => "grant_added",
            AuditEvent::GrantRevoked => "grant_revoked",
        }
    }

    fn is_failure(&self) -> bool {
        !matches!(
            self,
            AuditEvent::AdminAccess
                | AuditEvent::SigninSucceeded
                | AuditEvent::Signout
                | AuditEvent::GrantAdded
                | AuditEvent::GrantRevoked
        )
    }
}

pub fn record(event: AuditEvent, subject: Option<&str>, detail: &str) {
    let subject = subject.unwrap_or("-");
    if event.is_failure() {
        tracing::warn!(target: "audit", event = event.as_str(), subject, "{}", detail);
    } else {
        tracing::info!(target: "audit", event = event.as_str(), subject, "{}", detail);
    }
}
