//! Framework-agnostic request binding.
//!
//! An HTTP adapter implements [`RequestParts`] for its request type and calls
//! [`Binder::bind`] once per request: read body, unify parameters, validate,
//! enrich.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, instrument, warn};
use vobind_core::{
    unify, DefinitionError, EnrichmentHook, MultiValuePolicy, Schema, ValidationError, ValueObject,
};
use vobind_shared::{BindMetrics, BindOutcome, BindingConfig};

/// Raw request input supplied by the hosting framework.
#[cfg_attr(test, mockall::automock(type Error = std::io::Error;))]
pub trait RequestParts {
    /// Error raised while reading the body.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reads the whole request payload.
    fn read_body(&mut self) -> Result<Vec<u8>, Self::Error>;

    /// Path parameters, one value per name.
    fn path_params(&self) -> HashMap<String, String>;

    /// Query parameters, every supplied value in order.
    fn query_params(&self) -> HashMap<String, Vec<String>>;
}

/// Why a request could not be bound.
#[derive(Error, Debug)]
pub enum BindError<E>
where
    E: std::error::Error + 'static,
{
    /// The body could not be read.
    #[error("failed to read request body: {0}")]
    Body(#[source] E),

    /// The body exceeds the configured limit.
    #[error("request body of {size} bytes exceeds the limit of {limit} bytes")]
    BodyTooLarge {
        /// Size of the body that was read.
        size: usize,
        /// Configured limit.
        limit: usize,
    },

    /// Route and schema disagree; fails the same way on every request.
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// The request data was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl<E: std::error::Error + 'static> BindError<E> {
    /// Whether the request itself is at fault (bad-request class) rather than
    /// the server wiring.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, BindError::Definition(_))
    }

    fn outcome(&self) -> BindOutcome {
        match self {
            BindError::Body(_) => BindOutcome::BodyError,
            BindError::BodyTooLarge { .. } => BindOutcome::BodyTooLarge,
            BindError::Definition(_) => BindOutcome::DefinitionError,
            BindError::Validation(ValidationError::InvalidJson(_)) => BindOutcome::InvalidJson,
            BindError::Validation(ValidationError::Fields(_)) => BindOutcome::InvalidFields,
        }
    }
}

/// Binds requests of type `C` against one schema.
///
/// Built once at route registration and shared across request handlers.
pub struct Binder<C> {
    schema: Arc<Schema>,
    multi_value: MultiValuePolicy,
    max_body_bytes: usize,
    enrichment: EnrichmentHook<C>,
}

impl<C: RequestParts> Binder<C> {
    /// Creates a binder with the default [`BindingConfig`].
    pub fn new(schema: Schema) -> Self {
        Self::from_config(schema, &BindingConfig::default())
    }

    /// Creates a binder honoring `config`.
    pub fn from_config(schema: Schema, config: &BindingConfig) -> Self {
        Self {
            schema: Arc::new(schema),
            multi_value: config.multi_value,
            max_body_bytes: config.max_body_bytes,
            enrichment: EnrichmentHook::new(),
        }
    }

    /// Overrides the multi-valued query parameter policy.
    pub fn with_multi_value(mut self, policy: MultiValuePolicy) -> Self {
        self.multi_value = policy;
        self
    }

    /// The bound schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Hook applied to every successfully validated request; set it once.
    pub fn enrichment(&self) -> &EnrichmentHook<C> {
        &self.enrichment
    }

    /// Turns one request into a validated, enriched [`ValueObject`].
    #[instrument(skip(self, req), fields(fields = self.schema.len()))]
    pub fn bind(&self, req: &mut C) -> Result<ValueObject, BindError<C::Error>> {
        let start = Instant::now();
        let result = self.bind_inner(req);

        match &result {
            Ok(record) => {
                debug!(keys = record.len(), "request bound");
                BindMetrics::bind_finished(BindOutcome::Ok, start.elapsed());
            }
            Err(e) => {
                if let BindError::Validation(ValidationError::Fields(errors)) = e {
                    BindMetrics::field_errors(errors);
                }
                if e.is_client_error() {
                    debug!(error = %e, "request rejected");
                } else {
                    warn!(error = %e, "binder misconfigured");
                }
                BindMetrics::bind_finished(e.outcome(), start.elapsed());
            }
        }
        result
    }

    fn bind_inner(&self, req: &mut C) -> Result<ValueObject, BindError<C::Error>> {
        let body = req.read_body().map_err(BindError::Body)?;
        if body.len() > self.max_body_bytes {
            return Err(BindError::BodyTooLarge {
                size: body.len(),
                limit: self.max_body_bytes,
            });
        }

        let params = unify(&req.path_params(), &req.query_params(), self.multi_value)?;
        let mut record = self.schema.validate(&body, &params)?;

        self.enrichment.apply(req, &mut record);
        Ok(record)
    }
}

impl<C> std::fmt::Debug for Binder<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binder")
            .field("fields", &self.schema.len())
            .field("multi_value", &self.multi_value)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("enrichment", &self.enrichment)
            .finish()
    }
}
