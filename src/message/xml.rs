//! XML rendering and parsing for the Maltego message envelope.
//!
//! Placement rules: `Field` carries Name/DisplayName/MatchingRule as
//! attributes with its value as element text; `Label` carries Name/Type as
//! attributes with its value as CDATA so display markup travels unescaped;
//! `Entity` carries its type as a `Type` attribute with Value, Weight and
//! IconURL as child elements. Output is a UTF-8 XML fragment without a
//! declaration, matching what the Maltego client emits and accepts.
//!
//! The parser is lenient about elements it does not know (they are skipped
//! whole) and strict about everything else: malformed XML, missing required
//! attributes, and out-of-range values all surface as [`MessageError`].

use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::{
    Field, Label, Limits, MaltegoException, MaltegoMessage, MaltegoTransformExceptionMessage,
    MaltegoTransformRequestMessage, MaltegoTransformResponseMessage, MatchingRule, MessageError,
    RawEntity, UiMessage, UiMessageType,
};

const ROOT: &str = "MaltegoMessage";
const REQUEST: &str = "MaltegoTransformRequestMessage";
const RESPONSE: &str = "MaltegoTransformResponseMessage";
const EXCEPTION: &str = "MaltegoTransformExceptionMessage";

type XmlWriter = Writer<Vec<u8>>;

/// Serializes a message as a UTF-8 XML fragment.
pub fn render(message: &MaltegoMessage) -> Result<String, MessageError> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Start(BytesStart::new(ROOT)))?;
    match message {
        MaltegoMessage::Request(m) => write_request(&mut writer, m)?,
        MaltegoMessage::Response(m) => write_response(&mut writer, m)?,
        MaltegoMessage::Exception(m) => write_exception(&mut writer, m)?,
    }
    writer.write_event(Event::End(BytesEnd::new(ROOT)))?;
    let bytes = writer.into_inner();
    Ok(std::str::from_utf8(&bytes)?.to_owned())
}

fn write_text_element(writer: &mut XmlWriter, name: &str, text: &str) -> Result<(), MessageError> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_field(writer: &mut XmlWriter, field: &Field) -> Result<(), MessageError> {
    let mut start = BytesStart::new("Field");
    start.push_attribute(("Name", field.name.as_str()));
    if let Some(display_name) = &field.display_name {
        start.push_attribute(("DisplayName", display_name.as_str()));
    }
    start.push_attribute(("MatchingRule", field.matching_rule.as_wire()));
    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Text(BytesText::new(&field.value)))?;
    writer.write_event(Event::End(BytesEnd::new("Field")))?;
    Ok(())
}

fn write_label(writer: &mut XmlWriter, label: &Label) -> Result<(), MessageError> {
    let mut start = BytesStart::new("Label");
    start.push_attribute(("Name", label.name.as_str()));
    start.push_attribute(("Type", label.label_type.as_str()));
    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::CData(BytesCData::new(&label.value)))?;
    writer.write_event(Event::End(BytesEnd::new("Label")))?;
    Ok(())
}

fn write_entity(writer: &mut XmlWriter, entity: &RawEntity) -> Result<(), MessageError> {
    let mut start = BytesStart::new("Entity");
    start.push_attribute(("Type", entity.entity_type.as_str()));
    writer.write_event(Event::Start(start))?;
    write_text_element(writer, "Value", &entity.value)?;
    write_text_element(writer, "Weight", &entity.weight.to_string())?;
    if let Some(icon_url) = &entity.icon_url {
        write_text_element(writer, "IconURL", icon_url)?;
    }
    if !entity.fields.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("AdditionalFields")))?;
        for field in entity.fields.values() {
            write_field(writer, field)?;
        }
        writer.write_event(Event::End(BytesEnd::new("AdditionalFields")))?;
    }
    if !entity.labels.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("DisplayInformation")))?;
        for label in entity.labels.values() {
            write_label(writer, label)?;
        }
        writer.write_event(Event::End(BytesEnd::new("DisplayInformation")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("Entity")))?;
    Ok(())
}

fn write_response(
    writer: &mut XmlWriter,
    message: &MaltegoTransformResponseMessage,
) -> Result<(), MessageError> {
    writer.write_event(Event::Start(BytesStart::new(RESPONSE)))?;
    writer.write_event(Event::Start(BytesStart::new("UIMessages")))?;
    for ui_message in &message.messages {
        let mut start = BytesStart::new("UIMessage");
        start.push_attribute(("MessageType", ui_message.message_type.as_wire()));
        writer.write_event(Event::Start(start))?;
        writer.write_event(Event::Text(BytesText::new(&ui_message.message)))?;
        writer.write_event(Event::End(BytesEnd::new("UIMessage")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("UIMessages")))?;
    writer.write_event(Event::Start(BytesStart::new("Entities")))?;
    for entity in &message.entities {
        write_entity(writer, entity)?;
    }
    writer.write_event(Event::End(BytesEnd::new("Entities")))?;
    writer.write_event(Event::End(BytesEnd::new(RESPONSE)))?;
    Ok(())
}

fn write_request(
    writer: &mut XmlWriter,
    message: &MaltegoTransformRequestMessage,
) -> Result<(), MessageError> {
    writer.write_event(Event::Start(BytesStart::new(REQUEST)))?;
    writer.write_event(Event::Start(BytesStart::new("Entities")))?;
    for entity in message.raw_entities() {
        write_entity(writer, entity)?;
    }
    writer.write_event(Event::End(BytesEnd::new("Entities")))?;
    writer.write_event(Event::Start(BytesStart::new("TransformFields")))?;
    for field in message.parameter_fields().values() {
        write_field(writer, field)?;
    }
    writer.write_event(Event::End(BytesEnd::new("TransformFields")))?;
    let limits = message.limits();
    let mut limits_start = BytesStart::new("Limits");
    limits_start.push_attribute(("SoftLimit", limits.soft.to_string().as_str()));
    limits_start.push_attribute(("HardLimit", limits.hard.to_string().as_str()));
    writer.write_event(Event::Empty(limits_start))?;
    writer.write_event(Event::End(BytesEnd::new(REQUEST)))?;
    Ok(())
}

fn write_exception(
    writer: &mut XmlWriter,
    message: &MaltegoTransformExceptionMessage,
) -> Result<(), MessageError> {
    writer.write_event(Event::Start(BytesStart::new(EXCEPTION)))?;
    writer.write_event(Event::Start(BytesStart::new("Exceptions")))?;
    for exception in &message.exceptions {
        let mut start = BytesStart::new("Exception");
        if let Some(code) = exception.code {
            start.push_attribute(("code", code.to_string().as_str()));
        }
        writer.write_event(Event::Start(start))?;
        writer.write_event(Event::Text(BytesText::new(&exception.value)))?;
        writer.write_event(Event::End(BytesEnd::new("Exception")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("Exceptions")))?;
    writer.write_event(Event::End(BytesEnd::new(EXCEPTION)))?;
    Ok(())
}

/// Parses a message from XML text.
pub fn parse(text: &str) -> Result<MaltegoMessage, MessageError> {
    let mut parser = Parser {
        reader: Reader::from_str(text),
    };
    parser.expect_start(ROOT)?;
    let message = match parser.next()? {
        Event::Start(start) => match start.name().as_ref() {
            b"MaltegoTransformRequestMessage" => {
                MaltegoMessage::Request(parser.parse_request()?)
            }
            b"MaltegoTransformResponseMessage" => {
                MaltegoMessage::Response(parser.parse_response()?)
            }
            b"MaltegoTransformExceptionMessage" => {
                MaltegoMessage::Exception(parser.parse_exception()?)
            }
            name => {
                return Err(MessageError::UnexpectedElement {
                    expected: "MaltegoTransform{Request,Response,Exception}Message",
                    found: String::from_utf8_lossy(name).into_owned(),
                })
            }
        },
        Event::Empty(start) => match start.name().as_ref() {
            b"MaltegoTransformRequestMessage" => {
                MaltegoMessage::Request(MaltegoTransformRequestMessage::new())
            }
            b"MaltegoTransformResponseMessage" => {
                MaltegoMessage::Response(MaltegoTransformResponseMessage::new())
            }
            b"MaltegoTransformExceptionMessage" => {
                MaltegoMessage::Exception(MaltegoTransformExceptionMessage::new())
            }
            name => {
                return Err(MessageError::UnexpectedElement {
                    expected: "MaltegoTransform{Request,Response,Exception}Message",
                    found: String::from_utf8_lossy(name).into_owned(),
                })
            }
        },
        other => {
            return Err(unexpected(
                "MaltegoTransform{Request,Response,Exception}Message",
                &other,
            ))
        }
    };
    parser.expect_end(ROOT)?;
    Ok(message)
}

fn unexpected(expected: &'static str, event: &Event<'_>) -> MessageError {
    let found = match event {
        Event::Start(s) | Event::Empty(s) => {
            String::from_utf8_lossy(s.name().as_ref()).into_owned()
        }
        Event::End(e) => format!("/{}", String::from_utf8_lossy(e.name().as_ref())),
        Event::Eof => "end of input".to_string(),
        _ => "non-element content".to_string(),
    };
    MessageError::UnexpectedElement { expected, found }
}

fn attr(start: &BytesStart<'_>, name: &str) -> Result<Option<String>, MessageError> {
    for attribute in start.attributes() {
        let attribute = attribute?;
        if attribute.key.as_ref() == name.as_bytes() {
            return Ok(Some(attribute.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn required_attr(
    start: &BytesStart<'_>,
    element: &'static str,
    name: &'static str,
) -> Result<String, MessageError> {
    attr(start, name)?.ok_or(MessageError::MissingAttribute {
        element,
        attribute: name,
    })
}

struct Parser<'a> {
    reader: Reader<&'a [u8]>,
}

impl<'a> Parser<'a> {
    /// Next structural event. Text between elements (indentation) and
    /// comments, declarations and processing instructions are skipped.
    fn next(&mut self) -> Result<Event<'a>, MessageError> {
        loop {
            match self.reader.read_event()? {
                Event::Text(_)
                | Event::Comment(_)
                | Event::Decl(_)
                | Event::PI(_)
                | Event::DocType(_) => continue,
                event => return Ok(event),
            }
        }
    }

    fn expect_start(&mut self, tag: &'static str) -> Result<BytesStart<'a>, MessageError> {
        match self.next()? {
            Event::Start(start) if start.name().as_ref() == tag.as_bytes() => Ok(start),
            other => Err(unexpected(tag, &other)),
        }
    }

    fn expect_end(&mut self, tag: &'static str) -> Result<(), MessageError> {
        match self.next()? {
            Event::End(end) if end.name().as_ref() == tag.as_bytes() => Ok(()),
            other => Err(unexpected(tag, &other)),
        }
    }

    /// Skips an element this parser does not model, children included.
    fn skip(&mut self, start: &BytesStart<'_>) -> Result<(), MessageError> {
        self.reader.read_to_end(start.name())?;
        Ok(())
    }

    /// Accumulated character data (text and CDATA) up to the closing tag.
    fn read_text(&mut self, tag: &'static str) -> Result<String, MessageError> {
        let mut out = String::new();
        loop {
            match self.reader.read_event()? {
                Event::Text(text) => out.push_str(&text.unescape()?),
                Event::CData(cdata) => out.push_str(std::str::from_utf8(cdata.as_ref())?),
                Event::Comment(_) => {}
                Event::End(end) if end.name().as_ref() == tag.as_bytes() => return Ok(out),
                Event::Eof => {
                    return Err(MessageError::Malformed(format!(
                        "unexpected end of input inside <{}>",
                        tag
                    )))
                }
                other => return Err(unexpected(tag, &other)),
            }
        }
    }

    fn parse_field(&mut self, start: &BytesStart<'_>, empty: bool) -> Result<Field, MessageError> {
        let name = required_attr(start, "Field", "Name")?;
        let mut field = Field::new(name, "");
        if let Some(display_name) = attr(start, "DisplayName")? {
            field.display_name = Some(display_name);
        }
        if let Some(rule) = attr(start, "MatchingRule")? {
            field.matching_rule =
                MatchingRule::from_wire(&rule).ok_or(MessageError::InvalidValue {
                    element: "Field",
                    value: rule,
                })?;
        }
        if !empty {
            field.value = self.read_text("Field")?;
        }
        Ok(field)
    }

    fn parse_label(&mut self, start: &BytesStart<'_>, empty: bool) -> Result<Label, MessageError> {
        let name = required_attr(start, "Label", "Name")?;
        let mut label = Label::new(name, "");
        if let Some(label_type) = attr(start, "Type")? {
            label.label_type = label_type;
        }
        if !empty {
            label.value = self.read_text("Label")?;
        }
        Ok(label)
    }

    fn parse_entity(&mut self, start: &BytesStart<'_>) -> Result<RawEntity, MessageError> {
        let entity_type = required_attr(start, "Entity", "Type")?;
        let mut entity = RawEntity::new(entity_type, "");
        loop {
            match self.next()? {
                Event::Start(child) => match child.name().as_ref() {
                    b"Value" => entity.value = self.read_text("Value")?,
                    b"Weight" => {
                        let text = self.read_text("Weight")?;
                        entity.weight =
                            text.trim()
                                .parse::<u32>()
                                .map_err(|_| MessageError::InvalidValue {
                                    element: "Weight",
                                    value: text,
                                })?;
                    }
                    b"IconURL" => entity.icon_url = Some(self.read_text("IconURL")?),
                    b"AdditionalFields" => self.parse_fields_into(&mut entity)?,
                    b"DisplayInformation" => self.parse_labels_into(&mut entity)?,
                    _ => self.skip(&child)?,
                },
                Event::Empty(_) => {}
                Event::End(end) if end.name().as_ref() == b"Entity" => return Ok(entity),
                other => return Err(unexpected("Entity", &other)),
            }
        }
    }

    fn parse_fields_into(&mut self, entity: &mut RawEntity) -> Result<(), MessageError> {
        loop {
            match self.next()? {
                Event::Start(child) if child.name().as_ref() == b"Field" => {
                    let field = self.parse_field(&child, false)?;
                    *entity += field;
                }
                Event::Empty(child) if child.name().as_ref() == b"Field" => {
                    let field = self.parse_field(&child, true)?;
                    *entity += field;
                }
                Event::Start(child) => self.skip(&child)?,
                Event::Empty(_) => {}
                Event::End(end) if end.name().as_ref() == b"AdditionalFields" => return Ok(()),
                other => return Err(unexpected("AdditionalFields", &other)),
            }
        }
    }

    fn parse_labels_into(&mut self, entity: &mut RawEntity) -> Result<(), MessageError> {
        loop {
            match self.next()? {
                Event::Start(child) if child.name().as_ref() == b"Label" => {
                    let label = self.parse_label(&child, false)?;
                    *entity += label;
                }
                Event::Empty(child) if child.name().as_ref() == b"Label" => {
                    let label = self.parse_label(&child, true)?;
                    *entity += label;
                }
                Event::Start(child) => self.skip(&child)?,
                Event::Empty(_) => {}
                Event::End(end) if end.name().as_ref() == b"DisplayInformation" => return Ok(()),
                other => return Err(unexpected("DisplayInformation", &other)),
            }
        }
    }

    fn parse_entities(
        &mut self,
        entities: &mut Vec<RawEntity>,
    ) -> Result<(), MessageError> {
        loop {
            match self.next()? {
                Event::Start(child) if child.name().as_ref() == b"Entity" => {
                    entities.push(self.parse_entity(&child)?);
                }
                Event::Empty(child) if child.name().as_ref() == b"Entity" => {
                    let entity_type = required_attr(&child, "Entity", "Type")?;
                    entities.push(RawEntity::new(entity_type, ""));
                }
                Event::Start(child) => self.skip(&child)?,
                Event::Empty(_) => {}
                Event::End(end) if end.name().as_ref() == b"Entities" => return Ok(()),
                other => return Err(unexpected("Entities", &other)),
            }
        }
    }

    fn parse_response(&mut self) -> Result<MaltegoTransformResponseMessage, MessageError> {
        let mut message = MaltegoTransformResponseMessage::new();
        loop {
            match self.next()? {
                Event::Start(child) => match child.name().as_ref() {
                    b"UIMessages" => loop {
                        match self.next()? {
                            Event::Start(ui) if ui.name().as_ref() == b"UIMessage" => {
                                message.messages.push(self.parse_ui_message(&ui, false)?);
                            }
                            Event::Empty(ui) if ui.name().as_ref() == b"UIMessage" => {
                                message.messages.push(self.parse_ui_message(&ui, true)?);
                            }
                            Event::Start(other) => self.skip(&other)?,
                            Event::Empty(_) => {}
                            Event::End(end) if end.name().as_ref() == b"UIMessages" => break,
                            other => return Err(unexpected("UIMessages", &other)),
                        }
                    },
                    b"Entities" => self.parse_entities(&mut message.entities)?,
                    _ => self.skip(&child)?,
                },
                Event::Empty(_) => {}
                Event::End(end) if end.name().as_ref() == RESPONSE.as_bytes() => {
                    return Ok(message)
                }
                other => return Err(unexpected(RESPONSE, &other)),
            }
        }
    }

    fn parse_ui_message(
        &mut self,
        start: &BytesStart<'_>,
        empty: bool,
    ) -> Result<UiMessage, MessageError> {
        let type_text = required_attr(start, "UIMessage", "MessageType")?;
        let message_type =
            UiMessageType::from_wire(&type_text).ok_or(MessageError::InvalidValue {
                element: "UIMessage",
                value: type_text,
            })?;
        let text = if empty {
            String::new()
        } else {
            self.read_text("UIMessage")?
        };
        Ok(UiMessage::new(message_type, text))
    }

    fn parse_request(&mut self) -> Result<MaltegoTransformRequestMessage, MessageError> {
        let mut message = MaltegoTransformRequestMessage::new();
        loop {
            match self.next()? {
                Event::Start(child) => match child.name().as_ref() {
                    b"Entities" => {
                        let mut entities = Vec::new();
                        self.parse_entities(&mut entities)?;
                        for entity in entities {
                            message.add_entity(entity);
                        }
                    }
                    b"TransformFields" => loop {
                        match self.next()? {
                            Event::Start(field) if field.name().as_ref() == b"Field" => {
                                let field = self.parse_field(&field, false)?;
                                message.add_parameter(field);
                            }
                            Event::Empty(field) if field.name().as_ref() == b"Field" => {
                                let field = self.parse_field(&field, true)?;
                                message.add_parameter(field);
                            }
                            Event::Start(other) => self.skip(&other)?,
                            Event::Empty(_) => {}
                            Event::End(end) if end.name().as_ref() == b"TransformFields" => break,
                            other => return Err(unexpected("TransformFields", &other)),
                        }
                    },
                    b"Limits" => {
                        message.set_limits(parse_limits(&child)?);
                        self.skip(&child)?;
                    }
                    _ => self.skip(&child)?,
                },
                Event::Empty(child) if child.name().as_ref() == b"Limits" => {
                    message.set_limits(parse_limits(&child)?);
                }
                Event::Empty(_) => {}
                Event::End(end) if end.name().as_ref() == REQUEST.as_bytes() => {
                    return Ok(message)
                }
                other => return Err(unexpected(REQUEST, &other)),
            }
        }
    }

    fn parse_exception(&mut self) -> Result<MaltegoTransformExceptionMessage, MessageError> {
        let mut message = MaltegoTransformExceptionMessage::new();
        loop {
            match self.next()? {
                Event::Start(child) => match child.name().as_ref() {
                    b"Exceptions" => loop {
                        match self.next()? {
                            Event::Start(ex) if ex.name().as_ref() == b"Exception" => {
                                let mut exception =
                                    MaltegoException::new(String::new());
                                if let Some(code) = attr(&ex, "code")? {
                                    exception.code = Some(code.parse::<i32>().map_err(|_| {
                                        MessageError::InvalidValue {
                                            element: "Exception",
                                            value: code,
                                        }
                                    })?);
                                }
                                exception.value = self.read_text("Exception")?;
                                message.exceptions.push(exception);
                            }
                            Event::Start(other) => self.skip(&other)?,
                            Event::Empty(_) => {}
                            Event::End(end) if end.name().as_ref() == b"Exceptions" => break,
                            other => return Err(unexpected("Exceptions", &other)),
                        }
                    },
                    _ => self.skip(&child)?,
                },
                Event::Empty(_) => {}
                Event::End(end) if end.name().as_ref() == EXCEPTION.as_bytes() => {
                    return Ok(message)
                }
                other => return Err(unexpected(EXCEPTION, &other)),
            }
        }
    }
}

fn parse_limits(start: &BytesStart<'_>) -> Result<Limits, MessageError> {
    let mut limits = Limits::default();
    if let Some(soft) = attr(start, "SoftLimit")? {
        limits.soft = soft
            .parse::<u32>()
            .map_err(|_| MessageError::InvalidValue {
                element: "Limits",
                value: soft,
            })?;
    }
    if let Some(hard) = attr(start, "HardLimit")? {
        limits.hard = hard
            .parse::<u32>()
            .map_err(|_| MessageError::InvalidValue {
                element: "Limits",
                value: hard,
            })?;
    }
    Ok(limits)
}
