//! Wire-level Maltego message envelope model.
//!
//! This module defines the containers exchanged between a transform and the
//! Maltego client: entity fields and labels, the raw on-wire entity shape,
//! request/response/exception messages, and the `MaltegoMessage` root that
//! wraps exactly one of them. The XML placement rules for these types live in
//! [`xml`]; the typed field access layer lives in [`fields`].

use std::cell::OnceCell;
use std::fmt;
use std::ops::AddAssign;

use indexmap::IndexMap;

use crate::entity::{Entity, EntityClass};

pub mod fields;
pub mod xml;

use fields::{decode_string_list, ValidationError};

/// Wire key under which the local runner passes program arguments to a
/// transform.
pub const LOCAL_ARGUMENTS: &str = "canari.local.arguments";

/// Error type for wire-level message operations.
///
/// Malformed XML is propagated to the caller; the message layer does not
/// attempt partial recovery from bad input.
#[derive(Debug)]
pub enum MessageError {
    Xml(quick_xml::Error),
    Attributes(quick_xml::events::attributes::AttrError),
    Io(std::io::Error),
    Utf8(std::str::Utf8Error),
    UnexpectedElement {
        expected: &'static str,
        found: String,
    },
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },
    InvalidValue {
        element: &'static str,
        value: String,
    },
    Malformed(String),
    Validation(ValidationError),
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageError::Xml(e) => write!(f, "XML error: {}", e),
            MessageError::Attributes(e) => write!(f, "XML attribute error: {}", e),
            MessageError::Io(e) => write!(f, "IO error: {}", e),
            MessageError::Utf8(e) => write!(f, "UTF-8 error: {}", e),
            MessageError::UnexpectedElement { expected, found } => {
                write!(f, "Unexpected element <{}>, expected <{}>", found, expected)
            }
            MessageError::MissingAttribute { element, attribute } => {
                write!(f, "Element <{}> is missing the {} attribute", element, attribute)
            }
            MessageError::InvalidValue { element, value } => {
                write!(f, "Element <{}> carries an invalid value: {:?}", element, value)
            }
            MessageError::Malformed(msg) => write!(f, "Malformed message: {}", msg),
            MessageError::Validation(e) => write!(f, "Validation error: {}", e),
        }
    }
}

impl std::error::Error for MessageError {}

impl From<quick_xml::Error> for MessageError {
    fn from(err: quick_xml::Error) -> Self {
        MessageError::Xml(err)
    }
}

impl From<quick_xml::events::attributes::AttrError> for MessageError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        MessageError::Attributes(err)
    }
}

impl From<std::io::Error> for MessageError {
    fn from(err: std::io::Error) -> Self {
        MessageError::Io(err)
    }
}

impl From<std::str::Utf8Error> for MessageError {
    fn from(err: std::str::Utf8Error) -> Self {
        MessageError::Utf8(err)
    }
}

impl From<ValidationError> for MessageError {
    fn from(err: ValidationError) -> Self {
        MessageError::Validation(err)
    }
}

/// Merge policy used by the Maltego client to decide whether two entities in
/// a graph are the same node.
///
/// Strict matching requires all fields plus the value to match; loose
/// matching compares the entity value alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchingRule {
    #[default]
    Strict,
    Loose,
}

impl MatchingRule {
    pub fn as_wire(self) -> &'static str {
        match self {
            MatchingRule::Strict => "strict",
            MatchingRule::Loose => "loose",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "strict" => Some(MatchingRule::Strict),
            "loose" => Some(MatchingRule::Loose),
            _ => None,
        }
    }
}

impl fmt::Display for MatchingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// A named key/value pair attached to an entity; additional source of input
/// for downstream transforms, distinct from the entity's primary value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub display_name: Option<String>,
    pub matching_rule: MatchingRule,
    /// Always stored as text on the wire.
    pub value: String,
}

impl Field {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            matching_rule: MatchingRule::Strict,
            value: value.into(),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_matching_rule(mut self, rule: MatchingRule) -> Self {
        self.matching_rule = rule;
        self
    }
}

/// Display-only annotation on an entity.
///
/// Labels are only transmitted in response messages and cannot be passed from
/// transform to transform as a source of input. The value travels as CDATA so
/// it may carry markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    pub value: String,
    pub label_type: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            label_type: "text/text".to_string(),
        }
    }

    pub fn with_type(mut self, label_type: impl Into<String>) -> Self {
        self.label_type = label_type.into();
        self
    }
}

/// The on-wire shape of an entity.
///
/// The typed [`Entity`](crate::entity::Entity) facade wraps exactly one
/// `RawEntity`. Field and label collections are keyed by name: inserting
/// under an existing name overwrites in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntity {
    pub entity_type: String,
    pub value: String,
    pub weight: u32,
    pub icon_url: Option<String>,
    pub fields: IndexMap<String, Field>,
    pub labels: IndexMap<String, Label>,
}

impl RawEntity {
    pub fn new(entity_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            value: value.into(),
            weight: 1,
            icon_url: None,
            fields: IndexMap::new(),
            labels: IndexMap::new(),
        }
    }
}

impl AddAssign<Field> for RawEntity {
    fn add_assign(&mut self, field: Field) {
        self.fields.insert(field.name.clone(), field);
    }
}

impl AddAssign<Label> for RawEntity {
    fn add_assign(&mut self, label: Label) {
        self.labels.insert(label.name.clone(), label);
    }
}

/// Soft and hard result-count caps for a transform request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub soft: u32,
    pub hard: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            soft: 500,
            hard: 10000,
        }
    }
}

/// Severity of a message shown in the Maltego transform output console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UiMessageType {
    FatalError,
    PartialError,
    Inform,
    Debug,
}

impl UiMessageType {
    pub fn as_wire(self) -> &'static str {
        match self {
            UiMessageType::FatalError => "FatalError",
            UiMessageType::PartialError => "PartialError",
            UiMessageType::Inform => "Inform",
            UiMessageType::Debug => "Debug",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "FatalError" => Some(UiMessageType::FatalError),
            "PartialError" => Some(UiMessageType::PartialError),
            "Inform" => Some(UiMessageType::Inform),
            "Debug" => Some(UiMessageType::Debug),
            _ => None,
        }
    }
}

/// A console message attached to a transform response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiMessage {
    pub message_type: UiMessageType,
    pub message: String,
}

impl UiMessage {
    pub fn new(message_type: UiMessageType, message: impl Into<String>) -> Self {
        Self {
            message_type,
            message: message.into(),
        }
    }

    pub fn inform(message: impl Into<String>) -> Self {
        Self::new(UiMessageType::Inform, message)
    }

    pub fn debug(message: impl Into<String>) -> Self {
        Self::new(UiMessageType::Debug, message)
    }

    pub fn partial_error(message: impl Into<String>) -> Self {
        Self::new(UiMessageType::PartialError, message)
    }

    pub fn fatal_error(message: impl Into<String>) -> Self {
        Self::new(UiMessageType::FatalError, message)
    }
}

/// Container for an exception transmitted back to the Maltego client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaltegoException {
    pub value: String,
    pub code: Option<i32>,
}

impl MaltegoException {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }
}

impl fmt::Display for MaltegoException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl std::error::Error for MaltegoException {}

impl From<ValidationError> for MaltegoException {
    fn from(err: ValidationError) -> Self {
        MaltegoException::new(err.message())
    }
}

impl From<String> for MaltegoException {
    fn from(value: String) -> Self {
        MaltegoException::new(value)
    }
}

impl From<&str> for MaltegoException {
    fn from(value: &str) -> Self {
        MaltegoException::new(value)
    }
}

/// Root container for the `Exception` elements of a failed transform run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MaltegoTransformExceptionMessage {
    pub exceptions: Vec<MaltegoException>,
}

impl MaltegoTransformExceptionMessage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl From<MaltegoException> for MaltegoTransformExceptionMessage {
    fn from(exception: MaltegoException) -> Self {
        Self {
            exceptions: vec![exception],
        }
    }
}

impl<E: Into<MaltegoException>> AddAssign<E> for MaltegoTransformExceptionMessage {
    fn add_assign(&mut self, exception: E) {
        self.exceptions.push(exception.into());
    }
}

/// A transform's output: console messages plus entities in graph layout
/// order.
///
/// Entity order is significant; entities appear in the rendered `Entities`
/// block in exactly the order they were appended.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MaltegoTransformResponseMessage {
    pub messages: Vec<UiMessage>,
    pub entities: Vec<RawEntity>,
}

impl MaltegoTransformResponseMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entity(&mut self, entity: impl Into<RawEntity>) {
        self.entities.push(entity.into());
    }

    pub fn add_message(&mut self, message: UiMessage) {
        self.messages.push(message);
    }
}

impl AddAssign<Entity> for MaltegoTransformResponseMessage {
    fn add_assign(&mut self, entity: Entity) {
        self.entities.push(entity.into_raw());
    }
}

impl AddAssign<RawEntity> for MaltegoTransformResponseMessage {
    fn add_assign(&mut self, entity: RawEntity) {
        self.entities.push(entity);
    }
}

impl AddAssign<UiMessage> for MaltegoTransformResponseMessage {
    fn add_assign(&mut self, message: UiMessage) {
        self.messages.push(message);
    }
}

/// The parameters carried by a transform request.
///
/// Local runs pass the program argument list through the reserved
/// [`LOCAL_ARGUMENTS`] transform field; remote runs pass an arbitrary
/// name-keyed field map (API keys and the like).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformParameters<'a> {
    Arguments(Vec<String>),
    Fields(&'a IndexMap<String, Field>),
}

/// A transform's input: entities, transform fields, and result limits.
#[derive(Debug, Clone, Default)]
pub struct MaltegoTransformRequestMessage {
    entities: Vec<RawEntity>,
    // Typed realizations are built once on first access; a request parsed
    // off the wire is never re-realized.
    realized: OnceCell<Vec<Entity>>,
    parameters: IndexMap<String, Field>,
    limits: Option<Limits>,
}

impl MaltegoTransformRequestMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a raw entity. Entities added after the typed view has been
    /// realized are not visible through [`entities`](Self::entities).
    pub fn add_entity(&mut self, entity: impl Into<RawEntity>) {
        self.entities.push(entity.into());
    }

    /// Inserts a transform parameter, keyed by field name.
    pub fn add_parameter(&mut self, field: Field) {
        self.parameters.insert(field.name.clone(), field);
    }

    pub fn set_limits(&mut self, limits: Limits) {
        self.limits = Some(limits);
    }

    pub fn limits(&self) -> Limits {
        self.limits.unwrap_or_default()
    }

    pub fn raw_entities(&self) -> &[RawEntity] {
        &self.entities
    }

    /// The request entities, realized into typed [`Entity`] values through
    /// the entity type registry. Unregistered wire types fall back to the
    /// Unknown entity. The realization is cached; repeated access does not
    /// re-resolve.
    pub fn entities(&self) -> &[Entity] {
        self.realized
            .get_or_init(|| self.entities.iter().cloned().map(Entity::realize).collect())
    }

    /// The first entity in the request, or a blank Unknown entity if the
    /// request carries none.
    pub fn entity(&self) -> Entity {
        match self.entities().first() {
            Some(entity) => entity.clone(),
            None => crate::entities::Unknown::new("").into_entity(),
        }
    }

    /// The transform parameters. When the reserved [`LOCAL_ARGUMENTS`] field
    /// is present its decoded argument list is returned instead of the raw
    /// field map.
    pub fn parameters(&self) -> TransformParameters<'_> {
        match self.parameters.get(LOCAL_ARGUMENTS) {
            Some(field) => TransformParameters::Arguments(decode_string_list(&field.value)),
            None => TransformParameters::Fields(&self.parameters),
        }
    }

    pub fn parameter_fields(&self) -> &IndexMap<String, Field> {
        &self.parameters
    }
}

impl AddAssign<Entity> for MaltegoTransformRequestMessage {
    fn add_assign(&mut self, entity: Entity) {
        self.add_entity(entity);
    }
}

impl AddAssign<RawEntity> for MaltegoTransformRequestMessage {
    fn add_assign(&mut self, entity: RawEntity) {
        self.add_entity(entity);
    }
}

impl AddAssign<Field> for MaltegoTransformRequestMessage {
    fn add_assign(&mut self, field: Field) {
        self.add_parameter(field);
    }
}

/// Root element for every message exchanged between the client and a
/// transform: exactly one of an exception, response, or request message.
#[derive(Debug, Clone)]
pub enum MaltegoMessage {
    Exception(MaltegoTransformExceptionMessage),
    Response(MaltegoTransformResponseMessage),
    Request(MaltegoTransformRequestMessage),
}

impl MaltegoMessage {
    /// Serializes the message as a UTF-8 XML fragment (no declaration).
    pub fn render(&self) -> Result<String, MessageError> {
        xml::render(self)
    }

    /// Parses a message from XML text.
    pub fn parse(xml_text: &str) -> Result<Self, MessageError> {
        xml::parse(xml_text)
    }

    /// Parses a message from UTF-8 XML bytes as read off a transport.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self, MessageError> {
        let text = std::str::from_utf8(bytes)?;
        xml::parse(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{register_builtins, Domain};
    use crate::entity::EntityClass;
    use crate::message::fields::encode_string_list;

    #[test]
    fn test_response_preserves_entity_order() {
        register_builtins();
        let mut response = MaltegoTransformResponseMessage::new();
        response += Domain::new("a.com").into_entity();
        response += Domain::new("b.com").into_entity();
        response += Domain::new("c.com").into_entity();

        let values: Vec<&str> = response.entities.iter().map(|e| e.value.as_str()).collect();
        assert_eq!(values, vec!["a.com", "b.com", "c.com"]);
    }

    #[test]
    fn test_exception_message_wraps_strings() {
        let mut message = MaltegoTransformExceptionMessage::new();
        message += MaltegoException::new("typed").with_code(600);
        message += "plain text";

        assert_eq!(message.exceptions.len(), 2);
        assert_eq!(message.exceptions[0].code, Some(600));
        assert_eq!(message.exceptions[1].value, "plain text");
        assert_eq!(message.exceptions[1].code, None);
    }

    #[test]
    fn test_request_local_arguments_round_trip() {
        let mut request = MaltegoTransformRequestMessage::new();
        let args = vec!["--flag".to_string(), "value".to_string()];
        request += Field::new(LOCAL_ARGUMENTS, encode_string_list(&args));

        match request.parameters() {
            TransformParameters::Arguments(decoded) => assert_eq!(decoded, args),
            TransformParameters::Fields(_) => panic!("expected argument list"),
        }
    }

    #[test]
    fn test_request_parameters_without_arguments() {
        let mut request = MaltegoTransformRequestMessage::new();
        request += Field::new("api.key", "s3cret");

        match request.parameters() {
            TransformParameters::Fields(fields) => {
                assert_eq!(fields.get("api.key").map(|f| f.value.as_str()), Some("s3cret"));
            }
            TransformParameters::Arguments(_) => panic!("expected field map"),
        }
    }

    #[test]
    fn test_empty_request_yields_blank_unknown_entity() {
        register_builtins();
        let request = MaltegoTransformRequestMessage::new();
        let entity = request.entity();
        assert_eq!(entity.entity_type(), "maltego.Unknown");
        assert_eq!(entity.descriptor().entity_type, "maltego.Unknown");
        assert_eq!(entity.value(), "");
    }

    #[test]
    fn test_limits_default() {
        let request = MaltegoTransformRequestMessage::new();
        assert_eq!(request.limits(), Limits { soft: 500, hard: 10000 });
    }

    #[test]
    fn test_raw_entity_merge_overwrites_by_name() {
        let mut raw = RawEntity::new("maltego.Phrase", "hello");
        raw += Field::new("lang", "en");
        raw += Field::new("lang", "de");
        raw += Label::new("note", "<b>hi</b>");

        assert_eq!(raw.fields.len(), 1);
        assert_eq!(raw.fields["lang"].value, "de");
        assert_eq!(raw.labels["note"].value, "<b>hi</b>");
    }
}
