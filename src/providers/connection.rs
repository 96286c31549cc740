use std::time::Duration;

/// Lifecycle of the streaming connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// What the listener should do after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    Stay,
    Reconnect { delay: Duration, attempt: u32 },
    GiveUp,
}

/// Capped exponential backoff with a bounded number of attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1u32 << exponent);
        delay.min(self.max_delay)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_attempts: 5,
        }
    }
}

/// Reconnect state machine
///
/// `disconnected -> connecting -> connected`; transport failures move to
/// `error`; abnormal closes schedule a reconnect until attempts run out.
/// An open socket alone does not reset the attempt count, only a connection
/// that delivered data (`healthy`). Normal closes and `stop` never reconnect.
#[derive(Debug, Clone)]
pub struct ConnectionMachine {
    state: ConnectionState,
    attempts: u32,
    stopped: bool,
    policy: ReconnectPolicy,
}

impl ConnectionMachine {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempts: 0,
            stopped: false,
            policy,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Reconnect attempts made since the last healthy connection
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Begin (re)connecting; false once stopped
    pub fn connect(&mut self) -> bool {
        if self.stopped {
            return false;
        }
        self.state = ConnectionState::Connecting;
        true
    }

    pub fn opened(&mut self) {
        if self.stopped {
            return;
        }
        self.state = ConnectionState::Connected;
    }

    /// The connection delivered data
    pub fn healthy(&mut self) {
        if self.state == ConnectionState::Connected {
            self.attempts = 0;
        }
    }

    pub fn transport_error(&mut self) {
        if self.stopped {
            return;
        }
        self.state = ConnectionState::Error;
    }

    pub fn closed(&mut self, normal: bool) -> NextStep {
        if normal || self.stopped {
            self.state = ConnectionState::Disconnected;
            return NextStep::Stay;
        }

        if self.attempts >= self.policy.max_attempts {
            self.state = ConnectionState::Error;
            return NextStep::GiveUp;
        }

        self.attempts += 1;
        if self.state != ConnectionState::Error {
            self.state = ConnectionState::Disconnected;
        }
        NextStep::Reconnect {
            delay: self.policy.delay_for(self.attempts),
            attempt: self.attempts,
        }
    }

    /// Intentional teardown
    pub fn stop(&mut self) {
        self.stopped = true;
        self.state = ConnectionState::Disconnected;
    }
}
