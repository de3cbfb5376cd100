use std::time::Duration;

use biomewire_transport::IpcConfig;
use serde::{Deserialize, Serialize};

/// Client configuration.
///
/// A `None` timeout waits forever, which is how the generators have
/// historically been driven. The defaults bound both.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Limit on connecting and, for IPC, on waiting for the generator to
    /// attach.
    pub connect_timeout: Option<Duration>,
    /// Limit on one request, from the first send attempt to the decoded
    /// reply.
    pub request_timeout: Option<Duration>,
    /// Stream settings used by [`connect_ipc`](crate::RemoteWorldClientBuilder::connect_ipc).
    pub ipc: IpcConfig,
}

impl ClientConfig {
    /// No deadlines anywhere.
    pub fn unbounded() -> Self {
        Self {
            connect_timeout: None,
            request_timeout: None,
            ipc: IpcConfig::default(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(10)),
            request_timeout: Some(Duration::from_secs(30)),
            ipc: IpcConfig::default(),
        }
    }
}
