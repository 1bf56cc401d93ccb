//! Validation and filter pipelines.
//!
//! Validation runs applicable validators by descending priority and stops at
//! the first one that reports errors. The asynchronous pipeline awaits each
//! validator in turn; validators are never run concurrently.
//!
//! Filters run in registration order against the aggregation result, each one
//! seeing the mutations of the previous one.

use crate::error::BusError;
use crate::metrics;
use courier_core::{
    AsyncFilter, AsyncValidator, Context, Filter, ResponseError, Responses, Validator,
};
use smallvec::SmallVec;
use std::cmp::Reverse;
use std::sync::Arc;

/// Errors of the first validator that rejects `request`, if any.
pub(crate) fn first_rejection<Req>(
    context: &Context,
    validators: &[Arc<dyn Validator<Req>>],
    request: &Req,
) -> Result<Option<Vec<ResponseError>>, BusError> {
    let ordered = by_priority(
        validators
            .iter()
            .map(|validator| &**validator)
            .filter(|validator| validator.is_applicable(context, request)),
        |validator| validator.priority(),
    );

    for validator in ordered {
        let errors = validator
            .validate(context, request)
            .map_err(|source| BusError::Validator {
                validator: validator.name(),
                source,
            })?;
        if !errors.is_empty() {
            return Ok(Some(rejected(validator.name(), errors)));
        }
    }

    Ok(None)
}

/// Asynchronous counterpart of [`first_rejection`].
pub(crate) async fn first_rejection_async<Req>(
    context: &Context,
    validators: &[Arc<dyn AsyncValidator<Req>>],
    request: &Req,
) -> Result<Option<Vec<ResponseError>>, BusError> {
    let ordered = by_priority(
        validators
            .iter()
            .map(|validator| &**validator)
            .filter(|validator| validator.is_applicable(context, request)),
        |validator| validator.priority(),
    );

    for validator in ordered {
        let errors = validator
            .validate(context, request)
            .await
            .map_err(|source| BusError::Validator {
                validator: validator.name(),
                source,
            })?;
        if !errors.is_empty() {
            return Ok(Some(rejected(validator.name(), errors)));
        }
    }

    Ok(None)
}

/// Apply every applicable filter to `responses`, in registration order.
pub(crate) fn apply_filters<Req, Res>(
    context: &Context,
    filters: &[Arc<dyn Filter<Req, Res>>],
    request: &Req,
    responses: &mut Responses<Res>,
) -> Result<(), BusError> {
    for filter in filters {
        if !filter.is_applicable(context, request) {
            continue;
        }
        filter
            .apply(context, request, responses)
            .map_err(|source| BusError::Filter {
                filter: filter.name(),
                source,
            })?;
    }
    Ok(())
}

/// Asynchronous counterpart of [`apply_filters`].
pub(crate) async fn apply_filters_async<Req, Res>(
    context: &Context,
    filters: &[Arc<dyn AsyncFilter<Req, Res>>],
    request: &Req,
    responses: &mut Responses<Res>,
) -> Result<(), BusError> {
    for filter in filters {
        if !filter.is_applicable(context, request) {
            continue;
        }
        filter
            .apply(context, request, responses)
            .await
            .map_err(|source| BusError::Filter {
                filter: filter.name(),
                source,
            })?;
    }
    Ok(())
}

// Stable sort: equal priorities keep registration order.
fn by_priority<'a, V, I, P>(validators: I, priority: P) -> SmallVec<[&'a V; 4]>
where
    V: ?Sized,
    I: Iterator<Item = &'a V>,
    P: Fn(&V) -> i32,
{
    let mut ordered: SmallVec<[&'a V; 4]> = validators.collect();
    ordered.sort_by_key(|validator| Reverse(priority(validator)));
    ordered
}

fn rejected(validator: &'static str, errors: Vec<ResponseError>) -> Vec<ResponseError> {
    metrics::counter!(metrics::VALIDATION_REJECTED_TOTAL).increment(1);
    tracing::debug!(validator, errors = errors.len(), "Request rejected by validator");
    errors
}
