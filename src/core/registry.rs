use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;

use crate::core::error::UeflowError;
use crate::core::template::MSIN_WIDTH;

/// Result of one registry poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionView {
    Available(HashSet<String>),
    /// The registry could not be asked; not the same as "no sessions".
    Unavailable,
}

impl SessionView {
    pub fn sessions(&self) -> Option<&HashSet<String>> {
        match self {
            SessionView::Available(sessions) => Some(sessions),
            SessionView::Unavailable => None,
        }
    }
}

/// Source of the identities the core network currently holds a session for.
pub trait SessionRegistry {
    fn query(&self) -> SessionView;

    /// Best-effort set of active SUPIs; empty when the registry is unreachable.
    fn active_sessions(&self) -> HashSet<String> {
        match self.query() {
            SessionView::Available(sessions) => sessions,
            SessionView::Unavailable => HashSet::new(),
        }
    }
}

/// `imsi-<plmn><msin>` with the MSIN zero-padded to ten digits.
pub fn supi_for(plmn: &str, msin: u64) -> String {
    format!("imsi-{plmn}{msin:0width$}", width = MSIN_WIDTH)
}

#[derive(Debug, Deserialize)]
struct SessionsResponse {
    #[serde(default)]
    sessions: Option<Vec<SessionEntry>>,
}

#[derive(Debug, Deserialize)]
struct SessionEntry {
    #[serde(default)]
    supi: Option<String>,
}

pub fn parse_sessions(body: &[u8]) -> Result<HashSet<String>, serde_json::Error> {
    let response: SessionsResponse = serde_json::from_slice(body)?;
    Ok(response
        .sessions
        .unwrap_or_default()
        .into_iter()
        .filter_map(|entry| entry.supi)
        .filter(|supi| !supi.is_empty())
        .collect())
}

/// Polls the SMF debug endpoint over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSessionRegistry {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpSessionRegistry {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, UeflowError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn fetch(&self) -> Result<HashSet<String>, UeflowError> {
        let response = self.client.get(&self.url).send()?.error_for_status()?;
        let body = response.bytes()?;
        Ok(parse_sessions(&body)?)
    }
}

impl SessionRegistry for HttpSessionRegistry {
    fn query(&self) -> SessionView {
        match self.fetch() {
            Ok(sessions) => SessionView::Available(sessions),
            Err(e) => {
                tracing::debug!(url = %self.url, error = %e, "session registry unavailable");
                SessionView::Unavailable
            }
        }
    }
}
