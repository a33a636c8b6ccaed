//! Metric labels for the message pool.

use super::Error;
use prometheus_client::{
    encoding::{EncodeLabelSet, EncodeLabelValue},
    metrics::{counter::Counter, family::Family, gauge::Gauge},
    registry::Registry,
};
use std::sync::{Arc, Mutex, PoisonError};

/// What happened to an inbound vote or proposal.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum Outcome {
    Accepted,
    Duplicate,
    Conflicting,
    Invalid,
}

/// Inbound message labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct Inbound {
    pub outcome: Outcome,
}

impl Inbound {
    pub const fn accepted() -> &'static Self {
        &Self {
            outcome: Outcome::Accepted,
        }
    }

    pub const fn duplicate() -> &'static Self {
        &Self {
            outcome: Outcome::Duplicate,
        }
    }

    pub const fn conflicting() -> &'static Self {
        &Self {
            outcome: Outcome::Conflicting,
        }
    }

    pub const fn invalid() -> &'static Self {
        &Self {
            outcome: Outcome::Invalid,
        }
    }

    /// Classifies the result of an insertion.
    pub fn from_result(result: &Result<(), Error>) -> &'static Self {
        match result {
            Ok(()) => Self::accepted(),
            Err(Error::DuplicateVote { .. } | Error::DuplicateProposal(_)) => Self::duplicate(),
            Err(err) if err.is_equivocation() => Self::conflicting(),
            Err(_) => Self::invalid(),
        }
    }
}

/// Metrics maintained by the pool.
pub(super) struct Metrics {
    pub votes: Family<Inbound, Counter>,
    pub proposals: Family<Inbound, Counter>,
    pub tracked_heights: Gauge,
    pub evicted_heights: Counter,
}

impl Metrics {
    /// Creates the pool metrics and registers them in `registry`.
    ///
    /// A poisoned registry lock is recovered, so the metrics are always registered.
    pub fn init(registry: &Arc<Mutex<Registry>>) -> Self {
        let metrics = Self {
            votes: Family::default(),
            proposals: Family::default(),
            tracked_heights: Gauge::default(),
            evicted_heights: Counter::default(),
        };
        let mut registry = registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry.register("votes", "inbound votes", metrics.votes.clone());
        registry.register("proposals", "inbound proposals", metrics.proposals.clone());
        registry.register(
            "tracked_heights",
            "heights with cached messages",
            metrics.tracked_heights.clone(),
        );
        registry.register(
            "evicted_heights",
            "heights dropped after a block was sealed",
            metrics.evicted_heights.clone(),
        );
        metrics
    }
}
