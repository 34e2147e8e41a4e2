//! Dispatch glue between a caller and a [`Transform`].
//!
//! The runner builds request messages for local invocations, validates the
//! transform's declared signature before dispatch, runs the transform, and
//! converts its outcome into a wire [`MaltegoMessage`]: successes become
//! response messages and every error becomes an exception message the client
//! shows as a balloon instead of a crash.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::config::Config;
use crate::entity::Entity;
use crate::message::fields::encode_string_list;
use crate::message::{
    Field, Limits, MaltegoMessage, MaltegoTransformExceptionMessage,
    MaltegoTransformRequestMessage, MaltegoTransformResponseMessage, UiMessageType,
    LOCAL_ARGUMENTS,
};
use crate::transform::Transform;

/// Raised before dispatch when a transform declares an unsupported
/// signature. This is a configuration error, not a runtime one; it is never
/// converted into an exception message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformSignatureError {
    fixed_params: usize,
}

impl fmt::Display for TransformSignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transform entry points must accept either 2 or 3 fixed parameters or a trailing \
             variadic parameter ({} fixed parameters declared)",
            self.fixed_params
        )
    }
}

impl std::error::Error for TransformSignatureError {}

/// Protocol revision a transform entry point speaks: version 2 entry points
/// take a request and a response, version 3 additionally takes the
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformVersion {
    V2,
    V3,
}

impl TransformVersion {
    /// Classifies an entry point by its parameter shape. A variadic trailing
    /// parameter always selects version 3; otherwise exactly 2 or 3 fixed
    /// parameters are supported.
    pub fn detect(fixed_params: usize, variadic: bool) -> Result<Self, TransformSignatureError> {
        if variadic {
            return Ok(TransformVersion::V3);
        }
        match fixed_params {
            2 => Ok(TransformVersion::V2),
            3 => Ok(TransformVersion::V3),
            n => Err(TransformSignatureError { fixed_params: n }),
        }
    }
}

/// Builds the request message for a local transform invocation.
///
/// The program argument list travels in the reserved `canari.local.arguments`
/// transform field. Local runs are uncapped in practice, so the soft limit is
/// raised to match the hard limit.
pub fn build_request(
    entity_type: &str,
    value: &str,
    fields: impl IntoIterator<Item = Field>,
    arguments: &[String],
) -> MaltegoTransformRequestMessage {
    let mut entity = crate::message::RawEntity::new(entity_type, value);
    for field in fields {
        entity += field;
    }
    let mut request = MaltegoTransformRequestMessage::new();
    request += entity;
    request += Field::new(LOCAL_ARGUMENTS, encode_string_list(arguments));
    request.set_limits(Limits {
        soft: 10000,
        hard: 10000,
    });
    request
}

/// Runs a transform against a request and wraps the outcome in a wire
/// message.
///
/// Every error the transform raises is caught here and transmitted as an
/// exception message; dispatch itself never fails.
pub fn run_transform(
    transform: &dyn Transform,
    request: &MaltegoTransformRequestMessage,
    config: &Config,
) -> MaltegoMessage {
    debug!(transform = transform.name(), "dispatching transform");
    let response = MaltegoTransformResponseMessage::new();
    match transform.do_transform(request, response, config) {
        Ok(response) => {
            debug!(
                transform = transform.name(),
                entities = response.entities.len(),
                "transform completed"
            );
            MaltegoMessage::Response(response)
        }
        Err(exception) => {
            debug!(
                transform = transform.name(),
                error = %exception,
                "transform raised an exception"
            );
            MaltegoMessage::Exception(MaltegoTransformExceptionMessage::from(exception))
        }
    }
}

/// Scripting-friendly view of a transform response: entities realized
/// through the type registry and console messages grouped by severity.
#[derive(Debug, Default)]
pub struct TransformResult {
    entities: Vec<Entity>,
    messages: HashMap<UiMessageType, Vec<String>>,
}

impl TransformResult {
    pub fn from_response(response: &MaltegoTransformResponseMessage) -> Self {
        let entities = response
            .entities
            .iter()
            .cloned()
            .map(Entity::realize)
            .collect();
        let mut messages: HashMap<UiMessageType, Vec<String>> = HashMap::new();
        for message in &response.messages {
            messages
                .entry(message.message_type)
                .or_default()
                .push(message.message.clone());
        }
        Self { entities, messages }
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn messages(&self, message_type: UiMessageType) -> &[String] {
        self.messages
            .get(&message_type)
            .map_or(&[], Vec::as_slice)
    }
}
