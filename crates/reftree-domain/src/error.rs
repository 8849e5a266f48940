//! Error and warning types for reference resolution.

use std::fmt;

use thiserror::Error;

use crate::model::EntityId;

/// Errors returned by caller-supplied fetchers.
///
/// The resolver never propagates these to its own caller: a rejected fetch
/// is turned into a [`ResolveWarning::FetchRejected`] and the branch carries
/// on with zero results.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The fetcher refused or failed the request.
    #[error("{reason}")]
    Rejected { reason: String },

    /// The underlying transport failed (connection, status code, ...).
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The response could not be decoded into entities.
    #[error("decode error: {message}")]
    Decode { message: String },
}

impl FetchError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode {
            message: err.to_string(),
        }
    }
}

/// Result type for fetcher operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Which kind of fetch a warning refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchOrigin {
    /// The root fetch of a plan.
    Root,
    /// A reference node walked from parent relations.
    Reference,
    /// An auxiliary side fetch keyed off a result set's own ids.
    Side,
}

impl fmt::Display for FetchOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchOrigin::Root | FetchOrigin::Reference => f.write_str("fetch"),
            FetchOrigin::Side => f.write_str("side fetch"),
        }
    }
}

/// Non-fatal conditions reported while resolving a plan.
///
/// Each warning is logged through `tracing` when it is raised and collected
/// into the [`ResolveReport`](crate::resolver::ResolveReport).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveWarning {
    /// A plan entry has no fetcher bound to it.
    #[error("the {origin} of entity {entity} is not set")]
    MissingFetcher { origin: FetchOrigin, entity: String },

    /// A required relation is absent from a parent object.
    #[error(
        "the relation {relation} could not be found in object {}",
        .object.as_ref().map_or("<unknown>", EntityId::as_str)
    )]
    MissingRelation {
        relation: String,
        object: Option<EntityId>,
    },

    /// A fetch future completed with an error.
    #[error("the {origin} for entity {entity} returned an error: {reason}")]
    FetchRejected {
        origin: FetchOrigin,
        entity: String,
        reason: String,
    },

    /// A fetch completed without any result.
    #[error("the {origin} for entity {entity} returned no result")]
    EmptyResult { origin: FetchOrigin, entity: String },
}

impl ResolveWarning {
    /// Entity type the warning is about, when it names one.
    pub fn entity(&self) -> Option<&str> {
        match self {
            ResolveWarning::MissingFetcher { entity, .. }
            | ResolveWarning::FetchRejected { entity, .. }
            | ResolveWarning::EmptyResult { entity, .. } => Some(entity),
            ResolveWarning::MissingRelation { .. } => None,
        }
    }
}
