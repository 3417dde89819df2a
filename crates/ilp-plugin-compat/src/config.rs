use serde::Deserialize;

/// Settings for adapters created by a [`PluginRegistry`](crate::PluginRegistry).
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct AdapterConfig {
    /// Where to send payments that are not for an account on the local ledger.
    /// Defaults to the first connector the ledger reports.
    pub default_connector: Option<String>,
    /// Answer `peer.config` requests from the ledger info instead of sending them.
    pub answer_ildcp_locally: bool,
    /// Pass incoming v1 messages to the data handler.
    pub forward_requests: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        AdapterConfig {
            default_connector: None,
            answer_ildcp_locally: true,
            forward_requests: true,
        }
    }
}
