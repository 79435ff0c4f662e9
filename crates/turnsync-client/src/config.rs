//! Client and network-peer configuration.

use std::time::Duration;

use crate::ClientError;

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

/// Settings for a [`Transport`](crate::Transport).
///
/// Start from `ClientConfig::default()` and override what you need.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// The lobby this client belongs to. Forms the first half of every
    /// session key, so it must be non-empty and free of `:`.
    pub namespace: String,

    /// Seats to request when the master has to set a game up.
    pub num_players: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_owned(),
            num_players: 2,
        }
    }
}

impl ClientConfig {
    /// Creates a config for `namespace` with default seating.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Sets the number of seats sent with sync requests.
    #[must_use]
    pub fn with_num_players(mut self, num_players: usize) -> Self {
        self.num_players = num_players;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ClientError> {
        if self.num_players == 0 {
            return Err(ClientError::InvalidConfig(
                "num_players must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SocketConfig
// ---------------------------------------------------------------------------

/// Settings for the network peer, [`SocketMaster`](crate::SocketMaster).
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// Master URL, e.g. `ws://127.0.0.1:8000`.
    pub url: String,

    /// First re-dial delay after a failed dial or a dropped link.
    pub reconnect_base: Duration,

    /// Ceiling for the doubling re-dial delay.
    pub reconnect_max: Duration,
}

impl SocketConfig {
    /// Creates a config for `url` with default backoff (250ms up to 10s).
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_base: Duration::from_millis(250),
            reconnect_max: Duration::from_secs(10),
        }
    }

    /// Sets the first re-dial delay.
    #[must_use]
    pub fn with_reconnect_base(mut self, delay: Duration) -> Self {
        self.reconnect_base = delay;
        self
    }

    /// Sets the re-dial delay ceiling.
    #[must_use]
    pub fn with_reconnect_max(mut self, delay: Duration) -> Self {
        self.reconnect_max = delay;
        self
    }

    /// Delay before re-dial number `attempt` (0-based), before jitter:
    /// `reconnect_base * 2^attempt`, capped at `reconnect_max`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.reconnect_base
            .saturating_mul(factor)
            .min(self.reconnect_max)
    }
}
