use crate::tabs::TabId;

/// Lifecycle of the system-wide singleton recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Starting,
    Recording,
    Stopping,
}

/// The coordinator's local view of the active session.
///
/// This is deliberately advisory: the coordinator may be torn down and
/// recreated between gestures, so start/stop decisions re-derive truth
/// from the context registry instead of this struct. It exists to drive
/// the monitoring safety net and the indicator.
#[derive(Debug, Clone)]
pub struct Session {
    pub status: SessionStatus,
    pub target_tab: Option<TabId>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            status: SessionStatus::Idle,
            target_tab: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status != SessionStatus::Idle
    }

    pub fn reset(&mut self) {
        self.status = SessionStatus::Idle;
        self.target_tab = None;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_idle() {
        let session = Session::new();
        assert_eq!(session.status, SessionStatus::Idle);
        assert!(!session.is_active());
        assert!(session.target_tab.is_none());
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let mut session = Session::new();
        session.status = SessionStatus::Recording;
        session.target_tab = Some(TabId(3));
        assert!(session.is_active());

        session.reset();
        assert!(!session.is_active());
        assert!(session.target_tab.is_none());
    }
}
