//! Map session state.
//!
//! Holds the data the map view shows: the situation collection, the active
//! filter, the latest trip and the matches between them. Every fetch is
//! announced with [`MapSession::begin_search`] or
//! [`MapSession::begin_reference_load`]; only the response carrying the
//! latest ticket of its kind may update state, and only once. Issuing a
//! ticket changes nothing else, so a request that never resolves leaves the
//! session as it was.

use geojson::FeatureCollection;
use log::{debug, info, warn};

use crate::error::Result;
use crate::feature::collection_of;
use crate::filters::{split_by_geometry, FeatureFilter};
use crate::matching::{find_matches, MatchConfig, MatchOutcome};
use crate::trip::TripResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RequestKind {
    Trip,
    Reference,
}

/// Identifies one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SearchTicket {
    kind: RequestKind,
    seq: u64,
}

impl SearchTicket {
    /// Sequence number, increasing per request kind.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// What happened to a resolved request.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchResolution {
    /// State was updated and re-matched.
    Applied(MatchOutcome),
    /// The backend found no route; previous state kept.
    NoRoute,
    /// A newer request of the same kind was issued; response ignored.
    Superseded,
}

/// Explicit application state for the map view.
#[derive(Debug, Default)]
pub struct MapSession {
    config: MatchConfig,
    filter: FeatureFilter,
    reference: Option<FeatureCollection>,
    trip: Option<FeatureCollection>,
    outcome: Option<MatchOutcome>,
    trip_seq: u64,
    reference_seq: u64,
    // Last sequence number that resolved, per kind
    trip_resolved: u64,
    reference_resolved: u64,
}

impl MapSession {
    /// # Errors
    /// [`crate::MatchError::InvalidConfig`] for a non-positive tolerance.
    pub fn new(config: MatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn filter(&self) -> &FeatureFilter {
        &self.filter
    }

    /// Full situation collection, before filtering.
    pub fn reference(&self) -> Option<&FeatureCollection> {
        self.reference.as_ref()
    }

    pub fn trip(&self) -> Option<&FeatureCollection> {
        self.trip.as_ref()
    }

    /// Result of the last successful match, if any.
    pub fn outcome(&self) -> Option<&MatchOutcome> {
        self.outcome.as_ref()
    }

    /// Situations passing the active filter.
    pub fn visible_reference(&self) -> Option<FeatureCollection> {
        self.reference.as_ref().map(|r| self.filter.apply(r))
    }

    /// Announce a trip search.
    pub fn begin_search(&mut self) -> SearchTicket {
        self.trip_seq += 1;
        debug!("Issued trip search #{}", self.trip_seq);
        SearchTicket {
            kind: RequestKind::Trip,
            seq: self.trip_seq,
        }
    }

    /// Announce a situation data load (initial load or filter change).
    pub fn begin_reference_load(&mut self) -> SearchTicket {
        self.reference_seq += 1;
        debug!("Issued reference load #{}", self.reference_seq);
        SearchTicket {
            kind: RequestKind::Reference,
            seq: self.reference_seq,
        }
    }

    /// True if `ticket` is the most recent of its kind.
    pub fn is_current(&self, ticket: SearchTicket) -> bool {
        match ticket.kind {
            RequestKind::Trip => ticket.seq == self.trip_seq,
            RequestKind::Reference => ticket.seq == self.reference_seq,
        }
    }

    /// True if `ticket` is current and has not resolved yet.
    fn is_pending(&self, ticket: SearchTicket) -> bool {
        let resolved = match ticket.kind {
            RequestKind::Trip => self.trip_resolved,
            RequestKind::Reference => self.reference_resolved,
        };
        self.is_current(ticket) && ticket.seq > resolved
    }

    fn mark_resolved(&mut self, ticket: SearchTicket) {
        match ticket.kind {
            RequestKind::Trip => self.trip_resolved = ticket.seq,
            RequestKind::Reference => self.reference_resolved = ticket.seq,
        }
    }

    /// Apply a trip search response.
    ///
    /// A ticket resolves once; delivering it again reports
    /// [`SearchResolution::Superseded`].
    ///
    /// # Errors
    /// Malformed trip or reference features; state is left unchanged.
    pub fn resolve_search(
        &mut self,
        ticket: SearchTicket,
        response: TripResponse,
    ) -> Result<SearchResolution> {
        if ticket.kind != RequestKind::Trip || !self.is_pending(ticket) {
            info!("Ignoring superseded or resolved trip search #{}", ticket.seq);
            return Ok(SearchResolution::Superseded);
        }

        let Some(trip) = response.into_collection()? else {
            info!("Trip search #{} found no route", ticket.seq);
            self.mark_resolved(ticket);
            return Ok(SearchResolution::NoRoute);
        };

        let outcome = self.match_against(Some(&trip), self.reference.as_ref())?;
        self.mark_resolved(ticket);
        self.trip = Some(trip);
        self.outcome = Some(outcome.clone());
        Ok(SearchResolution::Applied(outcome))
    }

    /// Record a failed request. Returns whether it was the current one.
    pub fn fail_search(&mut self, ticket: SearchTicket) -> bool {
        let current = self.is_current(ticket);
        if current {
            warn!("Request #{} failed, keeping previous state", ticket.seq);
        }
        current
    }

    /// Replace the situation collection with a load response.
    ///
    /// `filter` is the filter the load was requested with; it becomes the
    /// active filter together with the collection.
    pub fn resolve_reference(
        &mut self,
        ticket: SearchTicket,
        filter: FeatureFilter,
        reference: FeatureCollection,
    ) -> Result<SearchResolution> {
        if ticket.kind != RequestKind::Reference || !self.is_pending(ticket) {
            info!("Ignoring superseded or resolved reference load #{}", ticket.seq);
            return Ok(SearchResolution::Superseded);
        }

        let previous = std::mem::replace(&mut self.filter, filter);
        match self.replace_reference(reference) {
            Ok(outcome) => {
                self.mark_resolved(ticket);
                Ok(SearchResolution::Applied(outcome))
            }
            Err(e) => {
                self.filter = previous;
                Err(e)
            }
        }
    }

    /// Replace the situation collection wholesale and re-match.
    pub fn replace_reference(&mut self, reference: FeatureCollection) -> Result<MatchOutcome> {
        let outcome = self.match_against(self.trip.as_ref(), Some(&reference))?;
        self.reference = Some(reference);
        self.outcome = Some(outcome.clone());
        Ok(outcome)
    }

    /// Change the active filter and re-match against the visible situations.
    pub fn set_filter(&mut self, filter: FeatureFilter) -> Result<MatchOutcome> {
        let previous = std::mem::replace(&mut self.filter, filter);
        match self.match_against(self.trip.as_ref(), self.reference.as_ref()) {
            Ok(outcome) => {
                self.outcome = Some(outcome.clone());
                Ok(outcome)
            }
            Err(e) => {
                self.filter = previous;
                Err(e)
            }
        }
    }

    /// Match `trip` against the Point situations that pass the filter.
    fn match_against(
        &self,
        trip: Option<&FeatureCollection>,
        reference: Option<&FeatureCollection>,
    ) -> Result<MatchOutcome> {
        let points = reference.map(|r| {
            let visible = self.filter.apply(r);
            let (points, _) = split_by_geometry(&visible);
            collection_of(points.into_iter().cloned().collect())
        });
        find_matches(trip, points.as_ref(), &self.config)
    }
}
