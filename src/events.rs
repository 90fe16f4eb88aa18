//! Security Event Logging
//!
//! Provides structured logging for the security-relevant events of the
//! session lifecycle: credential checks, token issuance, supersession,
//! revocation, and request gating.
//!
//! # Usage
//!
//! ```ignore
//! use portcullis::{security_event, SecurityEvent};
//!
//! // Log a successful login
//! security_event!(
//!     SecurityEvent::AuthenticationSuccess,
//!     principal = %principal,
//!     "User authenticated"
//! );
//!
//! // Log a gate rejection
//! security_event!(
//!     SecurityEvent::AccessDenied,
//!     reason = "token_expired",
//!     "Request rejected"
//! );
//! ```
//!
//! Log statements carry principal ids and token previews, never full
//! tokens or password material.

use std::fmt;

/// Security event kinds raised by this crate.
///
/// Events are grouped into categories for filtering and carry a fixed
/// severity that selects the tracing level they are emitted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEvent {
    // Authentication events
    /// Successful credential check and token issuance
    AuthenticationSuccess,
    /// Failed login attempt (unknown user or wrong password)
    AuthenticationFailure,
    /// User-initiated logout
    Logout,
    /// Session token saved to the store
    SessionCreated,
    /// A presented token no longer matches the stored one
    SessionSuperseded,
    /// Stored session removed (logout or account revocation)
    SessionDestroyed,

    // Authorization events
    /// Request admitted by the session gate
    AccessGranted,
    /// Request rejected by the session gate
    AccessDenied,

    // User management events
    /// Password changed and session rotated
    PasswordChanged,

    // Infrastructure events
    /// Session store unreachable or timed out; requests fail closed
    StoreUnavailable,
}

impl SecurityEvent {
    /// Get the event category for filtering/grouping
    pub fn category(&self) -> &'static str {
        match self {
            Self::AuthenticationSuccess
            | Self::AuthenticationFailure
            | Self::Logout
            | Self::SessionCreated
            | Self::SessionSuperseded
            | Self::SessionDestroyed => "authentication",

            Self::AccessGranted
            | Self::AccessDenied => "authorization",

            Self::PasswordChanged => "user_management",

            Self::StoreUnavailable => "infrastructure",
        }
    }

    /// Get the severity level for the event
    pub fn severity(&self) -> Severity {
        match self {
            // Critical - immediate attention required
            Self::StoreUnavailable => Severity::Critical,

            // High - security-relevant failures
            Self::AuthenticationFailure
            | Self::AccessDenied => Severity::High,

            // Medium - important state changes
            Self::AuthenticationSuccess
            | Self::SessionSuperseded
            | Self::PasswordChanged => Severity::Medium,

            // Low - routine operations
            Self::Logout
            | Self::SessionCreated
            | Self::SessionDestroyed
            | Self::AccessGranted => Severity::Low,
        }
    }

    /// Get the event name as a string
    pub fn name(&self) -> &'static str {
        match self {
            Self::AuthenticationSuccess => "authentication_success",
            Self::AuthenticationFailure => "authentication_failure",
            Self::Logout => "logout",
            Self::SessionCreated => "session_created",
            Self::SessionSuperseded => "session_superseded",
            Self::SessionDestroyed => "session_destroyed",
            Self::AccessGranted => "access_granted",
            Self::AccessDenied => "access_denied",
            Self::PasswordChanged => "password_changed",
            Self::StoreUnavailable => "store_unavailable",
        }
    }
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Routine operations
    Low,
    /// Important state changes
    Medium,
    /// Security-relevant failures
    High,
    /// Immediate attention required
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Log a security event with structured fields.
///
/// # Required Fields
///
/// The macro automatically includes:
/// - `security_event`: Event type name
/// - `category`: Event category
/// - `severity`: Event severity level
///
/// # Examples
///
/// ```ignore
/// security_event!(
///     SecurityEvent::AuthenticationSuccess,
///     principal = %principal,
///     "User authenticated"
/// );
///
/// security_event!(
///     SecurityEvent::StoreUnavailable,
///     error = %err,
///     "Session store call failed"
/// );
/// ```
#[macro_export]
macro_rules! security_event {
    ($event:expr, $($field:tt)*) => {{
        let event = $event;
        let severity = event.severity();
        let category = event.category();
        let event_name = event.name();

        match severity {
            $crate::events::Severity::Critical => {
                ::tracing::error!(
                    security_event = event_name,
                    category = category,
                    severity = "critical",
                    $($field)*
                );
            }
            $crate::events::Severity::High => {
                ::tracing::warn!(
                    security_event = event_name,
                    category = category,
                    severity = "high",
                    $($field)*
                );
            }
            $crate::events::Severity::Medium => {
                ::tracing::info!(
                    security_event = event_name,
                    category = category,
                    severity = "medium",
                    $($field)*
                );
            }
            $crate::events::Severity::Low => {
                ::tracing::debug!(
                    security_event = event_name,
                    category = category,
                    severity = "low",
                    $($field)*
                );
            }
        }
    }};
}

pub use security_event;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_categories() {
        assert_eq!(SecurityEvent::AuthenticationSuccess.category(), "authentication");
        assert_eq!(SecurityEvent::AccessDenied.category(), "authorization");
        assert_eq!(SecurityEvent::PasswordChanged.category(), "user_management");
        assert_eq!(SecurityEvent::StoreUnavailable.category(), "infrastructure");
    }

    #[test]
    fn test_event_severity() {
        assert_eq!(SecurityEvent::StoreUnavailable.severity(), Severity::Critical);
        assert_eq!(SecurityEvent::AuthenticationFailure.severity(), Severity::High);
        assert_eq!(SecurityEvent::SessionSuperseded.severity(), Severity::Medium);
        assert_eq!(SecurityEvent::SessionCreated.severity(), Severity::Low);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_event_name() {
        assert_eq!(SecurityEvent::AuthenticationSuccess.name(), "authentication_success");
        assert_eq!(SecurityEvent::SessionSuperseded.name(), "session_superseded");
    }
}
