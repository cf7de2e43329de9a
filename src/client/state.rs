//! Module `state`
//!
//! Per-connection session state: lifecycle phase, the negotiated username and
//! the addresses of the socket it runs on.

use std::net::SocketAddr;

use log::debug;

/// Lifecycle phase of one session. Phases only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    Connecting,
    NegotiatingName,
    Chatting,
    Closing,
    Closed,
}

/// Represents one connected chat client.
pub struct Client {
    peer_addr: SocketAddr,
    local_addr: Option<SocketAddr>,
    username: Option<String>,
    joined_at: Option<i64>,
    state: SessionState,
}

impl Client {
    pub fn new(peer_addr: SocketAddr, local_addr: Option<SocketAddr>) -> Self {
        Self {
            peer_addr,
            local_addr,
            username: None,
            joined_at: None,
            state: SessionState::Connecting,
        }
    }

    // --------------------
    // Getter methods
    // --------------------

    pub fn peer_addr(&self) -> &SocketAddr {
        &self.peer_addr
    }

    /// Server-side address of this connection.
    pub fn local_addr(&self) -> Option<&SocketAddr> {
        self.local_addr.as_ref()
    }

    /// Username, once negotiation has succeeded.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Join time in epoch millis, once negotiation has succeeded.
    pub fn joined_at(&self) -> Option<i64> {
        self.joined_at
    }

    #[cfg(test)]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True until the session starts closing.
    pub fn is_connected(&self) -> bool {
        self.state < SessionState::Closing
    }

    // --------------------
    // Transitions
    // --------------------

    /// Streams are set up; start asking for a name.
    pub fn begin_negotiation(&mut self) {
        self.advance(SessionState::NegotiatingName);
    }

    /// Records the accepted username and moves to chatting.
    ///
    /// The username is set once; later calls keep the first name.
    pub fn accept_username(&mut self, username: String, joined_at: i64) {
        if self.username.is_none() {
            self.username = Some(username);
            self.joined_at = Some(joined_at);
        }
        self.advance(SessionState::Chatting);
    }

    /// Marks the session as closing. Returns false if it already was.
    pub fn begin_closing(&mut self) -> bool {
        if !self.is_connected() {
            return false;
        }
        self.advance(SessionState::Closing);
        true
    }

    pub fn mark_closed(&mut self) {
        self.advance(SessionState::Closed);
    }

    fn advance(&mut self, next: SessionState) {
        if next > self.state {
            debug!("Session {}: {:?} -> {:?}", self.peer_addr, self.state, next);
            self.state = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Client {
        Client::new("127.0.0.1:50000".parse().unwrap(), None)
    }

    #[test]
    fn test_lifecycle_moves_forward() {
        let mut client = client();
        assert_eq!(client.state(), SessionState::Connecting);
        assert!(client.is_connected());

        client.begin_negotiation();
        assert_eq!(client.state(), SessionState::NegotiatingName);

        client.accept_username("alice".into(), 1_000);
        assert_eq!(client.state(), SessionState::Chatting);
        assert_eq!(client.username(), Some("alice"));
        assert_eq!(client.joined_at(), Some(1_000));

        assert!(client.begin_closing());
        assert!(!client.is_connected());
        client.mark_closed();
        assert_eq!(client.state(), SessionState::Closed);
    }

    #[test]
    fn test_closing_happens_once() {
        let mut client = client();
        assert!(client.begin_closing());
        assert!(!client.begin_closing());

        client.begin_negotiation();
        assert_eq!(client.state(), SessionState::Closing);
    }

    #[test]
    fn test_username_is_set_once() {
        let mut client = client();
        client.accept_username("alice".into(), 1);
        client.accept_username("mallory".into(), 2);
        assert_eq!(client.username(), Some("alice"));
        assert_eq!(client.joined_at(), Some(1));
    }

    #[test]
    fn test_unnamed_session_has_no_username() {
        let mut client = client();
        client.begin_negotiation();
        client.begin_closing();
        assert_eq!(client.username(), None);
    }
}
