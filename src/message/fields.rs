//! Typed field bindings for entity attributes.
//!
//! A [`FieldBinding`] declares how one entity attribute maps onto a wire
//! [`Field`]: the wire name, a legacy alias, display name, matching rule, and
//! whether the binding aliases the entity's primary value instead of a field.
//! Typed accessors decode with validation on read and type-check/encode on
//! write, mirroring the field kinds the Maltego client understands (string,
//! integer, long, float, boolean, date, datetime, time span, enum, regex,
//! color, array).
//!
//! Clearing follows the wire-empty rule: writing an empty string or a zero
//! number through a non-value binding removes the field from the payload
//! entirely; it is never serialized as an empty value. Booleans and
//! date-like values encode to non-empty text and therefore never clear.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use super::{Field, MatchingRule, RawEntity};

/// Error raised when a field value fails validation or coercion.
///
/// Recoverable at the call site; the runner converts it into a
/// `MaltegoException` for wire transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Callback run after every successful set, for derived field updates.
pub type FieldDecorator = fn(&mut RawEntity, &str);

/// Declarative binding of an entity attribute to a wire field.
#[derive(Debug, Clone, Copy)]
pub struct FieldBinding {
    name: &'static str,
    alias: Option<&'static str>,
    display_name: &'static str,
    matching_rule: MatchingRule,
    is_value: bool,
    decorator: Option<FieldDecorator>,
}

impl FieldBinding {
    pub const fn new(name: &'static str, display_name: &'static str) -> Self {
        Self {
            name,
            alias: None,
            display_name,
            matching_rule: MatchingRule::Strict,
            is_value: false,
            decorator: None,
        }
    }

    /// A binding that aliases the entity's primary value, bypassing the
    /// field map entirely.
    pub const fn value(name: &'static str, display_name: &'static str) -> Self {
        let mut binding = Self::new(name, display_name);
        binding.is_value = true;
        binding
    }

    /// Legacy wire name this binding also answers to.
    pub const fn with_alias(mut self, alias: &'static str) -> Self {
        self.alias = Some(alias);
        self
    }

    pub const fn loose(mut self) -> Self {
        self.matching_rule = MatchingRule::Loose;
        self
    }

    pub const fn with_decorator(mut self, decorator: FieldDecorator) -> Self {
        self.decorator = Some(decorator);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_value(&self) -> bool {
        self.is_value
    }

    /// Name used in validation error messages.
    fn label(&self) -> &'static str {
        if self.display_name.is_empty() {
            self.name
        } else {
            self.display_name
        }
    }

    /// Raw wire text for this binding: the entity value for value bindings,
    /// otherwise the field under `name` with fallback to `alias`. Missing
    /// fields read as `None`, never as a zero default.
    pub fn raw_get<'a>(&self, entity: &'a RawEntity) -> Option<&'a str> {
        if self.is_value {
            return Some(entity.value.as_str());
        }
        if let Some(field) = entity.fields.get(self.name) {
            return Some(field.value.as_str());
        }
        if let Some(alias) = self.alias {
            if let Some(field) = entity.fields.get(alias) {
                return Some(field.value.as_str());
            }
        }
        None
    }

    /// Writes encoded text through the binding. `wire_empty` values remove
    /// the field instead of storing empty text. At most one of name/alias is
    /// ever populated: updates go to whichever key already exists.
    fn write(&self, entity: &mut RawEntity, text: String, wire_empty: bool) {
        if self.is_value {
            entity.value = text.clone();
        } else if wire_empty {
            if entity.fields.shift_remove(self.name).is_none() {
                if let Some(alias) = self.alias {
                    entity.fields.shift_remove(alias);
                }
            }
        } else if let Some(field) = entity.fields.get_mut(self.name) {
            field.value = text.clone();
        } else if let Some(field) = self.alias.and_then(|a| entity.fields.get_mut(a)) {
            field.value = text.clone();
        } else {
            let mut field = Field::new(self.name, text.clone());
            if !self.display_name.is_empty() {
                field.display_name = Some(self.display_name.to_string());
            }
            field.matching_rule = self.matching_rule;
            entity.fields.insert(self.name.to_string(), field);
        }
        if let Some(decorator) = self.decorator {
            decorator(entity, &text);
        }
    }

    /// Removes the field regardless of current value (empties the entity
    /// value for value bindings).
    pub fn clear(&self, entity: &mut RawEntity) {
        self.write(entity, String::new(), true);
    }

    pub fn get_string(&self, entity: &RawEntity) -> Option<String> {
        self.raw_get(entity).map(str::to_string)
    }

    pub fn set_string(&self, entity: &mut RawEntity, value: impl Into<String>) {
        let text = value.into();
        let wire_empty = text.is_empty();
        self.write(entity, text, wire_empty);
    }

    pub fn get_integer(&self, entity: &RawEntity) -> Result<Option<i32>, ValidationError> {
        match self.raw_get(entity) {
            None => Ok(None),
            Some(text) => text.parse::<i32>().map(Some).map_err(|_| {
                ValidationError::new(format!(
                    "The field value ({:?}) set for field {:?} is not an integer.",
                    text,
                    self.label()
                ))
            }),
        }
    }

    pub fn set_integer(&self, entity: &mut RawEntity, value: i32) {
        self.write(entity, value.to_string(), value == 0);
    }

    pub fn get_long(&self, entity: &RawEntity) -> Result<Option<i64>, ValidationError> {
        match self.raw_get(entity) {
            None => Ok(None),
            Some(text) => text.parse::<i64>().map(Some).map_err(|_| {
                ValidationError::new(format!(
                    "The field value ({:?}) set for field {:?} is not a long integer.",
                    text,
                    self.label()
                ))
            }),
        }
    }

    pub fn set_long(&self, entity: &mut RawEntity, value: i64) {
        self.write(entity, value.to_string(), value == 0);
    }

    pub fn get_float(&self, entity: &RawEntity) -> Result<Option<f64>, ValidationError> {
        match self.raw_get(entity) {
            None => Ok(None),
            Some(text) => text.parse::<f64>().map(Some).map_err(|_| {
                ValidationError::new(format!(
                    "The field value ({:?}) set for field {:?} is not a float.",
                    text,
                    self.label()
                ))
            }),
        }
    }

    pub fn set_float(&self, entity: &mut RawEntity, value: f64) {
        self.write(entity, value.to_string(), value == 0.0);
    }

    /// Decodes by testing whether the text starts with `t` or equals `"1"`;
    /// anything else reads as `false`.
    pub fn get_boolean(&self, entity: &RawEntity) -> Option<bool> {
        self.raw_get(entity)
            .map(|text| text.starts_with('t') || text == "1")
    }

    /// Encodes as lowercase `"true"`/`"false"`. A `false` value is stored,
    /// not cleared; it encodes to non-empty text.
    pub fn set_boolean(&self, entity: &mut RawEntity, value: bool) {
        let text = if value { "true" } else { "false" };
        self.write(entity, text.to_string(), false);
    }

    pub fn get_date(&self, entity: &RawEntity) -> Result<Option<NaiveDate>, ValidationError> {
        match self.raw_get(entity) {
            None => Ok(None),
            Some(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map(Some)
                .map_err(|_| {
                    ValidationError::new(format!(
                        "The field value ({:?}) set for field {:?} is not a valid date. \
                         Date fields must have the following format: YYYY-MM-DD.",
                        text,
                        self.label()
                    ))
                }),
        }
    }

    pub fn set_date(&self, entity: &mut RawEntity, value: NaiveDate) {
        self.write(entity, value.format("%Y-%m-%d").to_string(), false);
    }

    pub fn get_datetime(
        &self,
        entity: &RawEntity,
    ) -> Result<Option<NaiveDateTime>, ValidationError> {
        match self.raw_get(entity) {
            None => Ok(None),
            Some(text) => NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                // %.f alone treats the fraction as optional; the wire
                // format requires it.
                .filter(|_| text.contains('.'))
                .map(Some)
                .ok_or_else(|| {
                    ValidationError::new(format!(
                        "The field value ({:?}) set for field {:?} is not a valid date time. \
                         Date time fields must have the following format: YYYY-MM-DD HH:MM:SS.MS.",
                        text,
                        self.label()
                    ))
                }),
        }
    }

    /// Microsecond precision, six digits, always present.
    pub fn set_datetime(&self, entity: &mut RawEntity, value: NaiveDateTime) {
        self.write(
            entity,
            value.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
            false,
        );
    }

    pub fn get_timespan(&self, entity: &RawEntity) -> Result<Option<TimeSpan>, ValidationError> {
        match self.raw_get(entity) {
            None => Ok(None),
            Some(text) => TimeSpan::from_str(text).map(Some).map_err(|_| {
                ValidationError::new(format!(
                    "The field value ({:?}) set for field {:?} is not a valid time span. \
                     Time spans must have the following format: DDd HHhMMmSS.MSs.",
                    text,
                    self.label()
                ))
            }),
        }
    }

    /// Accepts anything convertible into a [`TimeSpan`]; a plain
    /// `chrono::Duration` is upcast before encoding.
    pub fn set_timespan(&self, entity: &mut RawEntity, value: impl Into<TimeSpan>) {
        self.write(entity, value.into().to_string(), false);
    }
}

/// Fixed-choice string binding; both reads and writes must name one of the
/// configured choices.
#[derive(Debug, Clone, Copy)]
pub struct EnumFieldBinding {
    binding: FieldBinding,
    choices: &'static [&'static str],
}

impl EnumFieldBinding {
    pub const fn new(binding: FieldBinding, choices: &'static [&'static str]) -> Self {
        Self { binding, choices }
    }

    pub fn choices(&self) -> &'static [&'static str] {
        self.choices
    }

    pub fn get(&self, entity: &RawEntity) -> Result<Option<String>, ValidationError> {
        match self.binding.raw_get(entity) {
            None => Ok(None),
            Some(text) => {
                if !text.is_empty() && !self.choices.iter().any(|c| *c == text) {
                    return Err(self.choice_error(text));
                }
                Ok(Some(text.to_string()))
            }
        }
    }

    pub fn set(&self, entity: &mut RawEntity, value: &str) -> Result<(), ValidationError> {
        if !self.choices.iter().any(|c| *c == value) {
            return Err(self.choice_error(value));
        }
        self.binding.set_string(entity, value);
        Ok(())
    }

    fn choice_error(&self, value: &str) -> ValidationError {
        ValidationError::new(format!(
            "Invalid value ({:?}) set for field {:?}. Expected one of these values: {:?}.",
            value,
            self.binding.label(),
            self.choices
        ))
    }
}

#[derive(Clone, Copy)]
enum PatternKind {
    Pattern,
    Color,
}

/// Binding whose values must match a compiled pattern on both read and
/// write.
pub struct RegexFieldBinding {
    binding: FieldBinding,
    matcher: Regex,
    kind: PatternKind,
}

impl RegexFieldBinding {
    pub fn new(binding: FieldBinding, pattern: &str) -> Self {
        Self {
            binding,
            matcher: Regex::new(pattern).expect("valid field pattern"),
            kind: PatternKind::Pattern,
        }
    }

    /// A regex binding pre-configured for `#rrggbb` color values.
    pub fn color(binding: FieldBinding) -> Self {
        Self {
            binding,
            matcher: Regex::new("^#[0-9a-fA-F]{6}$").expect("valid color pattern"),
            kind: PatternKind::Color,
        }
    }

    // Anchored at the start only, like the client's field validators.
    fn matches(&self, value: &str) -> bool {
        self.matcher.find(value).is_some_and(|m| m.start() == 0)
    }

    pub fn get(&self, entity: &RawEntity) -> Result<Option<String>, ValidationError> {
        match self.binding.raw_get(entity) {
            None => Ok(None),
            Some(text) => {
                if !text.is_empty() && !self.matches(text) {
                    return Err(self.pattern_error(text));
                }
                Ok(Some(text.to_string()))
            }
        }
    }

    pub fn set(&self, entity: &mut RawEntity, value: &str) -> Result<(), ValidationError> {
        if !self.matches(value) {
            return Err(self.pattern_error(value));
        }
        self.binding.set_string(entity, value);
        Ok(())
    }

    fn pattern_error(&self, value: &str) -> ValidationError {
        match self.kind {
            PatternKind::Pattern => ValidationError::new(format!(
                "The field value ({:?}) set for field {:?} does not match the regular \
                 expression /{}/.",
                value,
                self.binding.label(),
                self.matcher.as_str()
            )),
            PatternKind::Color => ValidationError::new(format!(
                "The field value ({:?}) set for {:?} is not a valid color (i.e. #000000-#ffffff)",
                value,
                self.binding.label()
            )),
        }
    }
}

impl fmt::Debug for RegexFieldBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegexFieldBinding")
            .field("binding", &self.binding)
            .field("pattern", &self.matcher.as_str())
            .finish()
    }
}

/// Element type of an [`ArrayFieldBinding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayElementType {
    String,
    Integer,
    Float,
    Double,
    Boolean,
    Date,
}

impl ArrayElementType {
    pub fn as_str(self) -> &'static str {
        match self {
            ArrayElementType::String => "string",
            ArrayElementType::Integer => "integer",
            ArrayElementType::Float => "float",
            ArrayElementType::Double => "double",
            ArrayElementType::Boolean => "boolean",
            ArrayElementType::Date => "date",
        }
    }
}

impl fmt::Display for ArrayElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded array element.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
}

impl ArrayValue {
    fn encode(&self) -> String {
        match self {
            ArrayValue::String(s) => s.clone(),
            ArrayValue::Integer(i) => i.to_string(),
            ArrayValue::Float(f) => f.to_string(),
            ArrayValue::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            ArrayValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    fn is_of(&self, element_type: ArrayElementType) -> bool {
        matches!(
            (self, element_type),
            (ArrayValue::String(_), ArrayElementType::String)
                | (ArrayValue::Integer(_), ArrayElementType::Integer)
                | (ArrayValue::Float(_), ArrayElementType::Float)
                | (ArrayValue::Float(_), ArrayElementType::Double)
                | (ArrayValue::Boolean(_), ArrayElementType::Boolean)
                | (ArrayValue::Date(_), ArrayElementType::Date)
        )
    }
}

/// Comma-separated list binding; commas inside elements travel escaped as
/// `\,`.
#[derive(Debug, Clone, Copy)]
pub struct ArrayFieldBinding {
    binding: FieldBinding,
    element_type: ArrayElementType,
}

impl ArrayFieldBinding {
    pub const fn new(binding: FieldBinding, element_type: ArrayElementType) -> Self {
        Self {
            binding,
            element_type,
        }
    }

    pub fn get(&self, entity: &RawEntity) -> Result<Option<Vec<ArrayValue>>, ValidationError> {
        let Some(text) = self.binding.raw_get(entity) else {
            return Ok(None);
        };
        let mut values = Vec::new();
        for (index, element) in split_escaped(text).into_iter().enumerate() {
            values.push(self.decode_element(&element, index).map_err(|err| {
                ValidationError::new(format!(
                    "Failed to decode field {:?} value {:?} as a {} array: {}",
                    self.binding.label(),
                    text,
                    self.element_type,
                    err.message()
                ))
            })?);
        }
        Ok(Some(values))
    }

    fn decode_element(&self, element: &str, index: usize) -> Result<ArrayValue, ValidationError> {
        let decoded = match self.element_type {
            ArrayElementType::String => Some(ArrayValue::String(element.to_string())),
            ArrayElementType::Integer => element.parse::<i64>().ok().map(ArrayValue::Integer),
            ArrayElementType::Float | ArrayElementType::Double => {
                element.parse::<f64>().ok().map(ArrayValue::Float)
            }
            ArrayElementType::Boolean => {
                Some(ArrayValue::Boolean(element.starts_with('t') || element == "1"))
            }
            ArrayElementType::Date => NaiveDate::parse_from_str(element, "%Y-%m-%d")
                .ok()
                .map(ArrayValue::Date),
        };
        decoded.ok_or_else(|| {
            ValidationError::new(format!(
                "element {} ({:?}) is not a valid {}",
                index, element, self.element_type
            ))
        })
    }

    /// Every element must match the configured element type. An empty list
    /// clears the field per the wire-empty rule.
    pub fn set(&self, entity: &mut RawEntity, values: &[ArrayValue]) -> Result<(), ValidationError> {
        for value in values {
            if !value.is_of(self.element_type) {
                return Err(ValidationError::new(format!(
                    "The field value ({:?}) set for field {:?} is not of element type {}.",
                    value,
                    self.binding.label(),
                    self.element_type
                )));
            }
        }
        let text = join_escaped(values.iter().map(ArrayValue::encode));
        self.binding.set_string(entity, text);
        Ok(())
    }
}

/// Joins elements with commas, escaping embedded commas as `\,`.
pub fn join_escaped<I>(elements: I) -> String
where
    I: IntoIterator<Item = String>,
{
    elements
        .into_iter()
        .map(|e| e.replace(',', "\\,"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Splits comma-separated text, honoring `\,` escapes.
pub fn split_escaped(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&',') {
            current.push(',');
            chars.next();
        } else if c == ',' {
            out.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    out.push(current);
    out
}

/// Encodes a program argument list for the `canari.local.arguments` field.
pub fn encode_string_list(values: &[String]) -> String {
    join_escaped(values.iter().cloned())
}

/// Decodes a program argument list; empty text is an empty list.
pub fn decode_string_list(text: &str) -> Vec<String> {
    if text.is_empty() {
        Vec::new()
    } else {
        split_escaped(text)
    }
}

static TIMESPAN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)d (\d+)h(\d+)m(\d+)\.(\d+)s").expect("valid time span pattern"));

/// A normalized day/second/microsecond span with the Maltego wire rendering
/// `DDd HHhMMmSS.MSs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSpan {
    days: i64,
    seconds: i64,
    micros: i64,
}

impl TimeSpan {
    /// Builds a span, carrying excess microseconds into seconds and excess
    /// seconds into days.
    pub fn new(days: i64, seconds: i64, micros: i64) -> Self {
        let mut seconds = seconds + micros.div_euclid(1_000_000);
        let micros = micros.rem_euclid(1_000_000);
        let days = days + seconds.div_euclid(86_400);
        seconds = seconds.rem_euclid(86_400);
        Self {
            days,
            seconds,
            micros,
        }
    }

    pub fn from_duration(duration: Duration) -> Self {
        let total_micros = duration
            .num_microseconds()
            .unwrap_or_else(|| duration.num_milliseconds().saturating_mul(1000))
            .saturating_abs();
        Self::new(0, 0, total_micros)
    }

    pub fn to_duration(self) -> Duration {
        Duration::days(self.days)
            + Duration::seconds(self.seconds)
            + Duration::microseconds(self.micros)
    }

    pub fn days(&self) -> i64 {
        self.days
    }

    pub fn hours(&self) -> i64 {
        self.seconds / 3600
    }

    pub fn minutes(&self) -> i64 {
        self.seconds % 3600 / 60
    }

    pub fn seconds(&self) -> i64 {
        self.seconds % 60
    }

    pub fn microseconds(&self) -> i64 {
        self.micros
    }
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}d {}h{}m{}.{:03}s",
            self.days.abs(),
            self.hours(),
            self.minutes(),
            self.seconds(),
            self.micros
        )
    }
}

impl FromStr for TimeSpan {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid =
            || ValidationError::new("Time span must be in \"DDd HHhMMmSS.MSs\" format");
        let captures = TIMESPAN_PATTERN.captures(s).ok_or_else(invalid)?;
        let mut parts = [0i64; 5];
        for (slot, index) in parts.iter_mut().zip(1..=5) {
            *slot = captures
                .get(index)
                .ok_or_else(invalid)?
                .as_str()
                .parse::<i64>()
                .map_err(|_| invalid())?;
        }
        let [days, hours, minutes, seconds, micros] = parts;
        Ok(TimeSpan::new(
            days,
            hours * 3600 + minutes * 60 + seconds,
            micros,
        ))
    }
}

impl From<Duration> for TimeSpan {
    fn from(duration: Duration) -> Self {
        TimeSpan::from_duration(duration)
    }
}

impl From<TimeSpan> for Duration {
    fn from(span: TimeSpan) -> Self {
        span.to_duration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NICKNAME: FieldBinding = FieldBinding::new("person.nickname", "Nickname");
    const WHOIS: FieldBinding = FieldBinding::new("whois-info", "WHOIS Info").with_alias("whois");
    const PORT: FieldBinding = FieldBinding::new("port.number", "Port");
    const VALUE: FieldBinding = FieldBinding::value("fqdn", "Domain Name");

    fn entity() -> RawEntity {
        RawEntity::new("maltego.Phrase", "hello")
    }

    #[test]
    fn test_string_round_trip() {
        let mut e = entity();
        NICKNAME.set_string(&mut e, "ace");
        assert_eq!(NICKNAME.get_string(&e), Some("ace".to_string()));
        let field = &e.fields["person.nickname"];
        assert_eq!(field.display_name.as_deref(), Some("Nickname"));
        assert_eq!(field.matching_rule, MatchingRule::Strict);
    }

    #[test]
    fn test_missing_field_reads_none() {
        let e = entity();
        assert_eq!(NICKNAME.get_string(&e), None);
        assert_eq!(PORT.get_integer(&e), Ok(None));
    }

    #[test]
    fn test_value_binding_bypasses_fields() {
        let mut e = entity();
        VALUE.set_string(&mut e, "example.com");
        assert_eq!(e.value, "example.com");
        assert!(e.fields.is_empty());
        assert_eq!(VALUE.get_string(&e), Some("example.com".to_string()));
    }

    #[test]
    fn test_empty_string_clears_field() {
        let mut e = entity();
        NICKNAME.set_string(&mut e, "ace");
        NICKNAME.set_string(&mut e, "");
        assert!(e.fields.is_empty());
        assert_eq!(NICKNAME.get_string(&e), None);
    }

    #[test]
    fn test_zero_integer_clears_field() {
        let mut e = entity();
        PORT.set_integer(&mut e, 8080);
        assert_eq!(PORT.get_integer(&e), Ok(Some(8080)));
        PORT.set_integer(&mut e, 0);
        assert!(e.fields.is_empty());
    }

    #[test]
    fn test_false_boolean_is_stored_not_cleared() {
        let mut e = entity();
        let internal = FieldBinding::new("ipaddress.internal", "Internal");
        internal.set_boolean(&mut e, false);
        assert_eq!(e.fields["ipaddress.internal"].value, "false");
        assert_eq!(internal.get_boolean(&e), Some(false));
    }

    #[test]
    fn test_boolean_decode_law() {
        let mut e = entity();
        let b = FieldBinding::new("flag", "");
        b.set_string(&mut e, "1");
        assert_eq!(b.get_boolean(&e), Some(true));
        b.set_string(&mut e, "totally");
        assert_eq!(b.get_boolean(&e), Some(true));
        b.set_string(&mut e, "no");
        assert_eq!(b.get_boolean(&e), Some(false));
    }

    #[test]
    fn test_alias_fallback() {
        let mut e = entity();
        e += Field::new("whois", "ACME Corp");
        assert_eq!(WHOIS.get_string(&e), Some("ACME Corp".to_string()));

        // Updates land on the populated alias key; the primary name is
        // never added alongside it.
        WHOIS.set_string(&mut e, "ACME Inc");
        assert_eq!(e.fields.len(), 1);
        assert_eq!(e.fields["whois"].value, "ACME Inc");

        WHOIS.set_string(&mut e, "");
        assert!(e.fields.is_empty());
    }

    #[test]
    fn test_integer_decode_error_names_field_and_value() {
        let mut e = entity();
        PORT.set_string(&mut e, "not-a-number");
        let err = PORT.get_integer(&e).unwrap_err();
        assert!(err.message().contains("not-a-number"));
        assert!(err.message().contains("Port"));
    }

    #[test]
    fn test_date_round_trip() {
        let mut e = entity();
        let binding = FieldBinding::new("before", "Before");
        let date = NaiveDate::from_ymd_opt(2015, 7, 21).unwrap();
        binding.set_date(&mut e, date);
        assert_eq!(e.fields["before"].value, "2015-07-21");
        assert_eq!(binding.get_date(&e), Ok(Some(date)));
    }

    #[test]
    fn test_datetime_round_trip_six_digit_fraction() {
        let mut e = entity();
        let binding = FieldBinding::new("seen", "Last Seen");
        let stamp = NaiveDate::from_ymd_opt(2015, 7, 21)
            .unwrap()
            .and_hms_micro_opt(10, 4, 31, 7)
            .unwrap();
        binding.set_datetime(&mut e, stamp);
        assert_eq!(e.fields["seen"].value, "2015-07-21 10:04:31.000007");
        assert_eq!(binding.get_datetime(&e), Ok(Some(stamp)));
    }

    #[test]
    fn test_datetime_without_fraction_is_rejected() {
        let mut e = entity();
        let binding = FieldBinding::new("seen", "Last Seen");
        binding.set_string(&mut e, "2015-07-21 10:04:31");
        let err = binding.get_datetime(&e).unwrap_err();
        assert!(err.message().contains("YYYY-MM-DD HH:MM:SS.MS"));
    }

    #[test]
    fn test_timespan_normalizes_overflow() {
        // Two days plus one minute plus sixty extra seconds folds into two
        // whole minutes.
        let span = TimeSpan::new(2, 120, 0);
        assert_eq!(span.to_string(), "2d 0h2m0.000s");

        let from_duration =
            TimeSpan::from_duration(Duration::days(2) + Duration::seconds(60) + Duration::seconds(60));
        assert_eq!(from_duration.to_string(), "2d 0h2m0.000s");
    }

    #[test]
    fn test_timespan_parse() {
        let span: TimeSpan = "1d 2h3m4.000005s".parse().unwrap();
        assert_eq!(span.days(), 1);
        assert_eq!(span.hours(), 2);
        assert_eq!(span.minutes(), 3);
        assert_eq!(span.seconds(), 4);
        assert_eq!(span.microseconds(), 5);
        assert!("yesterday".parse::<TimeSpan>().is_err());
    }

    #[test]
    fn test_timespan_field_round_trip() {
        let mut e = entity();
        let binding = FieldBinding::new("uptime", "Uptime");
        binding.set_timespan(&mut e, Duration::days(2) + Duration::seconds(120));
        assert_eq!(e.fields["uptime"].value, "2d 0h2m0.000s");
        let decoded = binding.get_timespan(&e).unwrap().unwrap();
        assert_eq!(decoded.to_duration(), Duration::days(2) + Duration::seconds(120));
    }

    #[test]
    fn test_enum_rejects_unknown_choice() {
        let mut e = entity();
        const STYLE: EnumFieldBinding =
            EnumFieldBinding::new(FieldBinding::new("style", "Style"), &["0", "1", "2"]);
        assert!(STYLE.set(&mut e, "1").is_ok());
        assert_eq!(STYLE.get(&e), Ok(Some("1".to_string())));

        let err = STYLE.set(&mut e, "9").unwrap_err();
        assert!(err.message().contains("Expected one of these values"));
        // A failed set leaves the previous value untouched.
        assert_eq!(e.fields["style"].value, "1");
    }

    #[test]
    fn test_regex_validates_both_directions() {
        let mut e = entity();
        let binding = RegexFieldBinding::new(FieldBinding::new("build", "Build"), r"^\d+\.\d+$");
        assert!(binding.set(&mut e, "1.2").is_ok());

        let err = binding.set(&mut e, "1.2.3-rc").unwrap_err();
        assert!(err.message().contains(r"^\d+\.\d+$"));

        e.fields.get_mut("build").unwrap().value = "garbage".to_string();
        assert!(binding.get(&e).is_err());
    }

    #[test]
    fn test_color_rejects_names() {
        let mut e = entity();
        let binding = RegexFieldBinding::color(FieldBinding::new("link.color", "Color"));
        let err = binding.set(&mut e, "red").unwrap_err();
        assert!(err.message().contains("not a valid color"));
        assert!(e.fields.is_empty());

        assert!(binding.set(&mut e, "#00A2EB").is_ok());
    }

    #[test]
    fn test_array_escapes_commas() {
        let mut e = entity();
        const TAGS: ArrayFieldBinding =
            ArrayFieldBinding::new(FieldBinding::new("tags", "Tags"), ArrayElementType::String);
        TAGS.set(
            &mut e,
            &[
                ArrayValue::String("a,b".to_string()),
                ArrayValue::String("c".to_string()),
            ],
        )
        .unwrap();
        assert_eq!(e.fields["tags"].value, "a\\,b,c");

        let decoded = TAGS.get(&e).unwrap().unwrap();
        assert_eq!(
            decoded,
            vec![
                ArrayValue::String("a,b".to_string()),
                ArrayValue::String("c".to_string()),
            ]
        );
    }

    #[test]
    fn test_array_element_error_reports_index() {
        let mut e = entity();
        const PORTS: ArrayFieldBinding =
            ArrayFieldBinding::new(FieldBinding::new("ports", "Ports"), ArrayElementType::Integer);
        e += Field::new("ports", "80,eighty,8080");
        let err = PORTS.get(&e).unwrap_err();
        assert!(err.message().contains("element 1"));
        assert!(err.message().contains("integer"));
        assert!(err.message().contains("80,eighty,8080"));
    }

    #[test]
    fn test_array_type_mismatch_on_set() {
        let mut e = entity();
        const PORTS: ArrayFieldBinding =
            ArrayFieldBinding::new(FieldBinding::new("ports", "Ports"), ArrayElementType::Integer);
        let err = PORTS
            .set(&mut e, &[ArrayValue::String("80".to_string())])
            .unwrap_err();
        assert!(err.message().contains("element type integer"));
    }

    #[test]
    fn test_string_list_round_trip() {
        let args = vec!["--flag".to_string(), "a,b".to_string(), "value".to_string()];
        let encoded = encode_string_list(&args);
        assert_eq!(encoded, "--flag,a\\,b,value");
        assert_eq!(decode_string_list(&encoded), args);
        assert!(decode_string_list("").is_empty());
    }

    #[test]
    fn test_decorator_runs_once_per_successful_set() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        fn mirror(entity: &mut RawEntity, value: &str) {
            CALLS.fetch_add(1, Ordering::SeqCst);
            entity.labels.insert(
                "mirror".to_string(),
                crate::message::Label::new("mirror", value),
            );
        }

        const DECORATED: FieldBinding =
            FieldBinding::new("watched", "Watched").with_decorator(mirror);

        let mut e = entity();
        DECORATED.set_string(&mut e, "one");
        DECORATED.set_string(&mut e, "two");
        assert_eq!(CALLS.load(Ordering::SeqCst), 2);
        assert_eq!(e.labels["mirror"].value, "two");
    }
}
