//! Error handlers
//!
//! Maps errors onto the reply line a client sees.

use crate::error::types::{RegistryError, SessionError};
use crate::protocol::responses;
use log::{debug, warn};
use std::net::SocketAddr;

/// Reply line for a rejected username.
pub fn error_to_reply(err: &RegistryError) -> &'static str {
    match err {
        RegistryError::EmptyName => responses::NAME_EMPTY,
        RegistryError::NameTaken(_) => responses::NAME_TAKEN,
        RegistryError::NameTooLong { .. } => responses::NAME_TOO_LONG,
        RegistryError::Full(_) => responses::ROOM_FULL,
    }
}

/// Whether the session may prompt again after this rejection.
pub fn is_retryable(err: &RegistryError) -> bool {
    !matches!(err, RegistryError::Full(_))
}

/// Log a session-ending error. Peer resets are routine and stay at debug.
pub fn handle_session_error(peer: &SocketAddr, err: &SessionError) {
    match err {
        SessionError::Closed => debug!("Session {} lost its output channel", peer),
        SessionError::Io(e)
            if matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::BrokenPipe
            ) =>
        {
            debug!("Session {} reset by peer: {}", peer, e)
        }
        SessionError::Io(e) => warn!("Session {} ended with I/O error: {}", peer, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_rejection_has_a_distinct_reply() {
        let replies = [
            error_to_reply(&RegistryError::EmptyName),
            error_to_reply(&RegistryError::NameTaken("alice".into())),
            error_to_reply(&RegistryError::NameTooLong { len: 40, max: 32 }),
            error_to_reply(&RegistryError::Full(64)),
        ];

        for (i, a) in replies.iter().enumerate() {
            assert_ne!(*a, responses::WELCOME);
            assert_ne!(*a, responses::ACCEPT);
            for b in &replies[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_only_full_room_is_final() {
        assert!(is_retryable(&RegistryError::EmptyName));
        assert!(is_retryable(&RegistryError::NameTaken("bob".into())));
        assert!(!is_retryable(&RegistryError::Full(1)));
    }
}
