use log::debug;

/// Lifecycle of an [`RspSession`](super::RspSession).
///
/// ```text
/// Listening -> Connected -> Idle <-> Executing
///                             |
///                             v
///                        Disconnected -> Listening
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for a client to connect.
    Listening,
    /// A client connected, no packets exchanged yet.
    Connected,
    /// The target is stopped and the session is waiting for a packet.
    Idle,
    /// The target is being resumed on behalf of the client.
    Executing,
    /// The client went away (or was sent away).
    Disconnected,
}

impl SessionState {
    fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;

        matches!(
            (self, next),
            (Listening, Connected)
                | (Connected, Idle)
                | (Idle, Executing)
                | (Executing, Idle)
                | (Connected | Idle | Executing, Disconnected)
                | (Disconnected, Listening)
        )
    }
}

/// Tracks the current [`SessionState`], logging every change.
#[derive(Debug)]
pub struct StateTracker {
    state: SessionState,
    log: bool,
}

impl StateTracker {
    pub fn new(log: bool) -> StateTracker {
        StateTracker {
            state: SessionState::Listening,
            log,
        }
    }

    pub fn get(&self) -> SessionState {
        self.state
    }

    pub fn transition(&mut self, next: SessionState) {
        if self.state == next {
            return;
        }

        if !self.state.can_transition_to(next) {
            debug!("unexpected transition: {:?} --> {:?}", self.state, next);
        } else if self.log {
            debug!("transition: {:?} --> {:?}", self.state, next);
        }
        self.state = next;
    }
}
