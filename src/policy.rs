//! Ordered-fallback selection of catalog sources.
//!
//! Each logical operation maps to a fixed list of steps. Steps are tried in
//! order and the first success wins; a failure only moves on to the next step
//! when that step lists the failure as a fall-through trigger. Lists tolerate
//! substitute data, single-movie lookups do not.
use std::future::Future;
use tracing::{debug, info, warn};

use crate::error::CatalogError;
use crate::sources::SourceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListPopular,
    Search,
    GetById,
}

/// Which sources the façade can reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// A primary credential is configured.
    Credentialed,
    /// No credential; public dataset then bundled samples.
    Anonymous,
    /// Everything goes through the edge proxy, which runs this policy itself.
    Proxied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Unavailable,
    NotFound,
    Missing,
    Empty,
}

impl Trigger {
    pub fn of(err: &CatalogError) -> Option<Trigger> {
        match err {
            CatalogError::UpstreamUnavailable(_) => Some(Trigger::Unavailable),
            CatalogError::NotFound => Some(Trigger::NotFound),
            CatalogError::ConfigurationMissing => Some(Trigger::Missing),
            CatalogError::SourceEmpty => Some(Trigger::Empty),
            CatalogError::SampleData(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub source: SourceKind,
    pub fall_through_on: &'static [Trigger],
}

const ANY_FAILURE: &[Trigger] = &[
    Trigger::Unavailable,
    Trigger::NotFound,
    Trigger::Missing,
    Trigger::Empty,
];

const PRIMARY_THEN_SAMPLE: &[Step] = &[
    Step {
        source: SourceKind::Primary,
        fall_through_on: ANY_FAILURE,
    },
    Step {
        source: SourceKind::Sample,
        fall_through_on: &[],
    },
];

const PRIMARY_ONLY: &[Step] = &[Step {
    source: SourceKind::Primary,
    fall_through_on: &[],
}];

// A secondary NotFound against a non-empty dataset is final.
const SECONDARY_THEN_SAMPLE: &[Step] = &[
    Step {
        source: SourceKind::Secondary,
        fall_through_on: &[Trigger::Empty],
    },
    Step {
        source: SourceKind::Sample,
        fall_through_on: &[],
    },
];

const PROXY_ONLY: &[Step] = &[Step {
    source: SourceKind::Proxy,
    fall_through_on: &[],
}];

pub fn plan(operation: Operation, mode: Mode) -> &'static [Step] {
    match (mode, operation) {
        (Mode::Credentialed, Operation::ListPopular | Operation::Search) => PRIMARY_THEN_SAMPLE,
        (Mode::Credentialed, Operation::GetById) => PRIMARY_ONLY,
        (Mode::Anonymous, _) => SECONDARY_THEN_SAMPLE,
        (Mode::Proxied, _) => PROXY_ONLY,
    }
}

/// Runs `steps` in order, calling `call` for each source until one succeeds
/// or a failure is not allowed to fall through.
pub async fn resolve<T, F, Fut>(
    operation: Operation,
    steps: &[Step],
    mut call: F,
) -> Result<T, CatalogError>
where
    F: FnMut(SourceKind) -> Fut,
    Fut: Future<Output = Result<T, CatalogError>>,
{
    let mut last_err = CatalogError::ConfigurationMissing;
    for (index, step) in steps.iter().enumerate() {
        debug!("{:?}: trying {} source", operation, step.source);
        let err = match call(step.source).await {
            Ok(value) => {
                if index > 0 {
                    info!("{:?} served by {} source after fallback", operation, step.source);
                }
                return Ok(value);
            }
            Err(err) => err,
        };
        let is_last = index + 1 == steps.len();
        let may_continue = Trigger::of(&err)
            .map(|t| step.fall_through_on.contains(&t))
            .unwrap_or(false);
        if is_last || !may_continue {
            debug!("{:?} stops at {} source: {}", operation, step.source, err);
            return Err(err);
        }
        warn!(
            "{:?} failed on {} source ({}), falling back",
            operation, step.source, err
        );
        last_err = err;
    }
    Err(last_err)
}
