use log::{debug, warn};

use crate::config::{Language, MapConfig, RouteDistance};
use crate::data::geo::EventMap;
use crate::errors::{IngestError, Result};
use crate::ingest;

/// One selector state: which course document the viewer wants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub language: Language,
    pub distance: RouteDistance,
}

/// Handle for one in-flight fetch. Completing a session with a ticket
/// that is no longer the latest one has no effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    seq: u64,
    url: String,
}

impl FetchTicket {
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Serializes selection changes against their asynchronous fetches.
///
/// Every `begin` invalidates all earlier tickets, so when the viewer
/// flips the selector twice, whichever fetch finishes is only applied if
/// it belongs to the newest selection. Slow responses for old selections
/// are discarded instead of overwriting newer state.
pub struct MapSession {
    client: reqwest::Client,
    config: MapConfig,
    issued: u64,
    current: Option<EventMap>,
    last_error: Option<IngestError>,
}

impl MapSession {
    /// Panics when the TLS backend cannot be initialized, like
    /// `reqwest::Client::new` does.
    pub fn new(config: MapConfig) -> MapSession {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout())
            .build()
            .expect("failed to initialize HTTP client");
        MapSession {
            client,
            config,
            issued: 0,
            current: None,
            last_error: None,
        }
    }

    /// The most recently applied map, if the latest completion succeeded.
    pub fn current(&self) -> Option<&EventMap> {
        self.current.as_ref()
    }

    pub fn last_error(&self) -> Option<&IngestError> {
        self.last_error.as_ref()
    }

    /// Start a fetch for a selection. Returns `None` when the config has
    /// no URL for it, otherwise a ticket that supersedes all earlier ones.
    pub fn begin(&mut self, selection: Selection) -> Option<FetchTicket> {
        let url = self
            .config
            .url_for(selection.language, selection.distance)?
            .to_string();
        self.issued += 1;
        debug!(seq = self.issued, url = url.as_str(); "selection fetch started");
        Some(FetchTicket {
            seq: self.issued,
            url,
        })
    }

    /// Apply a finished fetch. Returns whether the result was taken;
    /// results for superseded tickets are dropped unseen.
    pub fn complete(&mut self, ticket: &FetchTicket, result: Result<EventMap>) -> bool {
        if ticket.seq != self.issued {
            debug!(seq = ticket.seq, issued = self.issued; "discarding stale fetch result");
            return false;
        }
        match result {
            Ok(map) => {
                self.current = Some(map);
                self.last_error = None;
            }
            Err(err) => {
                warn!(url = ticket.url.as_str(), error = err.to_string(); "map fetch failed");
                self.current = None;
                self.last_error = Some(err);
            }
        }
        true
    }

    /// Fetch and apply one selection end to end.
    pub async fn refresh(&mut self, selection: Selection) -> bool {
        let ticket = match self.begin(selection) {
            Some(ticket) => ticket,
            None => {
                warn!(
                    language = selection.language.to_string(),
                    distance = selection.distance.to_string();
                    "no document url configured for selection"
                );
                return false;
            }
        };
        let client = self.client.clone();
        let result = ingest::ingest_url(&client, ticket.url()).await;
        self.complete(&ticket, result)
    }
}
