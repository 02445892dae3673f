//! Broker connection state and reconnect policy

use std::time::Duration;

/// Where the link is in its connect cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Decides how long to wait before the next connect attempt
pub trait RetryPolicy: Send + Sync {
    /// Delay before attempt number `attempt` (1-based, counted since the last
    /// successful connect). `None` gives up.
    fn next_delay(&self, attempt: u32) -> Option<Duration>;
}

/// Same delay every time, never gives up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl RetryPolicy for FixedDelay {
    fn next_delay(&self, _attempt: u32) -> Option<Duration> {
        Some(self.delay)
    }
}

/// Connection state machine; pure, the link feeds it events
pub struct ConnectionMachine {
    state: ConnectionState,
    failed_attempts: u32,
    policy: Box<dyn RetryPolicy>,
}

impl ConnectionMachine {
    pub fn new(policy: Box<dyn RetryPolicy>) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            failed_attempts: 0,
            policy,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Consecutive failures since the last successful connect
    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    pub fn on_connecting(&mut self) {
        if self.state == ConnectionState::Disconnected {
            self.state = ConnectionState::Connecting;
        }
    }

    pub fn on_connected(&mut self) {
        self.state = ConnectionState::Connected;
        self.failed_attempts = 0;
    }

    /// Connection lost or attempt failed; returns the wait before retrying
    pub fn on_error(&mut self) -> Option<Duration> {
        self.state = ConnectionState::Disconnected;
        self.failed_attempts = self.failed_attempts.saturating_add(1);
        self.policy.next_delay(self.failed_attempts)
    }
}

impl std::fmt::Debug for ConnectionMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionMachine")
            .field("state", &self.state)
            .field("failed_attempts", &self.failed_attempts)
            .finish()
    }
}
