//! # Canari: Maltego transform framework
//!
//! Canari implements the wire protocol between the Maltego client and a
//! transform: typed entities, the XML message envelope, and the dispatch
//! glue that turns a transform's outcome into a response or exception
//! message.
//!
//! ## Layers
//!
//! - **Field bindings** ([`message::fields`]): declarative, typed access to
//!   entity fields with wire codecs for strings, numbers, booleans, dates,
//!   time spans, enums, patterns, and arrays.
//! - **Entities** ([`entity`], [`entities`]): a global type registry, a
//!   generic [`Entity`](entity::Entity) facade, and the built-in `maltego`
//!   namespace catalog.
//! - **Messages** ([`message`]): request, response, and exception messages
//!   under the `MaltegoMessage` root, with XML rendering and parsing.
//! - **Transforms** ([`transform`], [`runner`]): the `do_transform` contract
//!   and the runner that dispatches requests and wraps errors for the wire.
//!
//! ## Example
//!
//! ```
//! use canari::entities::{register_builtins, IPv4Address};
//! use canari::entity::EntityClass;
//! use canari::message::{MaltegoMessage, MaltegoTransformResponseMessage};
//!
//! register_builtins();
//!
//! let mut response = MaltegoTransformResponseMessage::new();
//! response += IPv4Address::new("93.184.216.34").into_entity();
//! let xml = MaltegoMessage::Response(response).render().unwrap();
//! assert!(xml.contains("maltego.IPv4Address"));
//! ```

pub mod config;
pub mod entities;
pub mod entity;
pub mod message;
pub mod runner;
pub mod transform;

pub use config::{Config, ConfigError, ConfigValue};
pub use entities::register_builtins;
pub use entity::{Bookmark, Entity, EntityClass, EntityDescriptor, LinkColor, LinkLabel, LinkStyle};
pub use message::fields::{FieldBinding, TimeSpan, ValidationError};
pub use message::{
    Field, Label, Limits, MaltegoException, MaltegoMessage, MaltegoTransformExceptionMessage,
    MaltegoTransformRequestMessage, MaltegoTransformResponseMessage, MatchingRule, MessageError,
    RawEntity, UiMessage, UiMessageType,
};
pub use runner::{build_request, run_transform, TransformResult, TransformVersion};
pub use transform::Transform;
