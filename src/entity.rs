//! Entity type descriptors, the global type registry, and the typed
//! [`Entity`] facade over the wire-level [`RawEntity`].
//!
//! Every entity type a transform wants realized by name must be registered
//! up front (builtins via [`crate::entities::register_builtins`]). Wire types
//! with no registered descriptor realize against the Unknown descriptor;
//! realization never fails.

use std::collections::HashMap;
use std::ops::AddAssign;
use std::sync::{PoisonError, RwLock};

use once_cell::sync::Lazy;
use tracing::debug;

use crate::message::fields::{EnumFieldBinding, FieldBinding, ValidationError};
use crate::message::{Field, Label, RawEntity};

/// Static description of one entity type: its wire type name, optional
/// legacy alias, namespace, and catalog category.
#[derive(Debug, PartialEq, Eq)]
pub struct EntityDescriptor {
    pub entity_type: &'static str,
    pub alias: Option<&'static str>,
    pub namespace: &'static str,
    pub category: Option<&'static str>,
}

static REGISTRY: Lazy<RwLock<HashMap<&'static str, &'static EntityDescriptor>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Registers a descriptor under its type name and, when present, its alias.
///
/// Aliases share the key space with type names. Registering the same key
/// twice is allowed and the last registration wins; callers are expected to
/// register at startup, before requests are realized.
pub fn register(descriptor: &'static EntityDescriptor) {
    debug!(entity_type = descriptor.entity_type, "registering entity type");
    let mut registry = REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
    registry.insert(descriptor.entity_type, descriptor);
    if let Some(alias) = descriptor.alias {
        registry.insert(alias, descriptor);
    }
}

/// Looks up a descriptor by type name or alias.
pub fn lookup(type_or_alias: &str) -> Option<&'static EntityDescriptor> {
    REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(type_or_alias)
        .copied()
}

/// Creates an entity of the named type, if the type is registered.
pub fn create(type_or_alias: &str, value: impl Into<String>) -> Option<Entity> {
    lookup(type_or_alias).map(|descriptor| Entity::new(descriptor, value))
}

/// Graph bookmark color. `NoColor` travels as `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bookmark {
    NoColor,
    Cyan,
    Green,
    Yellow,
    Orange,
    Red,
}

impl Bookmark {
    pub fn as_int(self) -> i32 {
        match self {
            Bookmark::NoColor => -1,
            Bookmark::Cyan => 0,
            Bookmark::Green => 1,
            Bookmark::Yellow => 2,
            Bookmark::Orange => 3,
            Bookmark::Red => 4,
        }
    }

    pub fn from_int(value: i32) -> Option<Self> {
        match value {
            -1 => Some(Bookmark::NoColor),
            0 => Some(Bookmark::Cyan),
            1 => Some(Bookmark::Green),
            2 => Some(Bookmark::Yellow),
            3 => Some(Bookmark::Orange),
            4 => Some(Bookmark::Red),
            _ => None,
        }
    }
}

/// Style of the link drawn to this entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStyle {
    Normal,
    Dashed,
    Dotted,
    DashDot,
}

impl LinkStyle {
    pub fn as_int(self) -> i32 {
        match self {
            LinkStyle::Normal => 0,
            LinkStyle::Dashed => 1,
            LinkStyle::Dotted => 2,
            LinkStyle::DashDot => 3,
        }
    }

    pub fn from_int(value: i32) -> Option<Self> {
        match value {
            0 => Some(LinkStyle::Normal),
            1 => Some(LinkStyle::Dashed),
            2 => Some(LinkStyle::Dotted),
            3 => Some(LinkStyle::DashDot),
            _ => None,
        }
    }
}

/// Link label visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkLabel {
    UseGlobalSetting,
    Show,
    Hide,
}

impl LinkLabel {
    pub fn as_int(self) -> i32 {
        match self {
            LinkLabel::UseGlobalSetting => 0,
            LinkLabel::Show => 1,
            LinkLabel::Hide => 2,
        }
    }

    pub fn from_int(value: i32) -> Option<Self> {
        match value {
            0 => Some(LinkLabel::UseGlobalSetting),
            1 => Some(LinkLabel::Show),
            2 => Some(LinkLabel::Hide),
            _ => None,
        }
    }
}

/// The link color palette the client accepts.
pub struct LinkColor;

impl LinkColor {
    pub const BLACK: &'static str = "#000000";
    pub const DARK_GRAY: &'static str = "#7F7F7F";
    pub const LIGHT_GRAY: &'static str = "#C3C3C3";
    pub const RED: &'static str = "#F4291A";
    pub const ORANGE: &'static str = "#FF810F";
    pub const DARK_GREEN: &'static str = "#30AF44";
    pub const NAVY_BLUE: &'static str = "#00A2EB";
    // Double hash carried as-is; the client's palette spells it this way
    // and strict matching would break against a corrected value.
    pub const MAGENTA: &'static str = "##A14DA7";
    pub const CYAN: &'static str = "#99D9EB";
    pub const LIME: &'static str = "#B9E500";
    pub const YELLOW: &'static str = "#FFE100";
    pub const PINK: &'static str = "#FEAFCA";

    pub const PALETTE: &'static [&'static str] = &[
        Self::BLACK,
        Self::DARK_GRAY,
        Self::LIGHT_GRAY,
        Self::RED,
        Self::ORANGE,
        Self::DARK_GREEN,
        Self::NAVY_BLUE,
        Self::MAGENTA,
        Self::CYAN,
        Self::LIME,
        Self::YELLOW,
        Self::PINK,
    ];
}

// Framework-reserved metadata fields. All use loose matching so graph
// metadata never affects entity merging. The link fields are string-choice
// fields: "0" is a stored value, not a clear. Only bookmark# is a true
// integer field subject to the wire-empty rule.
const NOTES: FieldBinding = FieldBinding::new("notes#", "").loose();
const BOOKMARK: FieldBinding = FieldBinding::new("bookmark#", "").loose();
const LINK_LABEL: FieldBinding = FieldBinding::new("link#maltego.link.label", "").loose();
const LINK_STYLE: FieldBinding = FieldBinding::new("link#maltego.link.style", "").loose();
const LINK_THICKNESS: FieldBinding = FieldBinding::new("link#maltego.link.thickness", "").loose();
const LINK_SHOW_LABEL: FieldBinding =
    FieldBinding::new("link#maltego.link.show-label", "").loose();
const LINK_COLOR: EnumFieldBinding = EnumFieldBinding::new(
    FieldBinding::new("link#maltego.link.color", "").loose(),
    LinkColor::PALETTE,
);

/// A typed entity: a wire [`RawEntity`] paired with its registered
/// descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    descriptor: &'static EntityDescriptor,
    raw: RawEntity,
}

impl Entity {
    pub fn new(descriptor: &'static EntityDescriptor, value: impl Into<String>) -> Self {
        Self {
            descriptor,
            raw: RawEntity::new(descriptor.entity_type, value),
        }
    }

    /// Pairs a wire entity with its registered descriptor. Unregistered
    /// types fall back to the Unknown descriptor; the raw entity keeps its
    /// original wire type either way.
    pub fn realize(raw: RawEntity) -> Self {
        let descriptor = match lookup(&raw.entity_type) {
            Some(descriptor) => descriptor,
            None => {
                debug!(
                    entity_type = %raw.entity_type,
                    "unregistered entity type, realizing as Unknown"
                );
                crate::entities::Unknown::descriptor()
            }
        };
        Self { descriptor, raw }
    }

    pub fn descriptor(&self) -> &'static EntityDescriptor {
        self.descriptor
    }

    /// The wire type, which may differ from the descriptor type for
    /// entities realized through the Unknown fallback.
    pub fn entity_type(&self) -> &str {
        &self.raw.entity_type
    }

    pub fn value(&self) -> &str {
        &self.raw.value
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.raw.value = value.into();
    }

    pub fn weight(&self) -> u32 {
        self.raw.weight
    }

    pub fn set_weight(&mut self, weight: u32) {
        self.raw.weight = weight;
    }

    pub fn icon_url(&self) -> Option<&str> {
        self.raw.icon_url.as_deref()
    }

    pub fn set_icon_url(&mut self, icon_url: impl Into<String>) {
        self.raw.icon_url = Some(icon_url.into());
    }

    pub fn raw(&self) -> &RawEntity {
        &self.raw
    }

    pub fn raw_mut(&mut self) -> &mut RawEntity {
        &mut self.raw
    }

    pub fn into_raw(self) -> RawEntity {
        self.raw
    }

    /// Field value by wire name, untyped.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.raw.fields.get(name).map(|f| f.value.as_str())
    }

    /// Inserts or overwrites a field with the given wire name and value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let field = Field::new(name, value);
        self.raw += field;
    }

    pub fn fields(&self) -> &indexmap::IndexMap<String, Field> {
        &self.raw.fields
    }

    pub fn labels(&self) -> &indexmap::IndexMap<String, Label> {
        &self.raw.labels
    }

    pub fn notes(&self) -> Option<String> {
        NOTES.get_string(&self.raw)
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        NOTES.set_string(&mut self.raw, notes);
    }

    pub fn bookmark(&self) -> Result<Option<Bookmark>, ValidationError> {
        match BOOKMARK.get_integer(&self.raw)? {
            None => Ok(None),
            Some(value) => Bookmark::from_int(value).map(Some).ok_or_else(|| {
                ValidationError::new(format!(
                    "The field value ({:?}) set for field \"bookmark#\" is not a valid bookmark.",
                    value
                ))
            }),
        }
    }

    /// Cyan travels as integer `0` and therefore clears the field; a Cyan
    /// bookmark reads back as unset.
    pub fn set_bookmark(&mut self, bookmark: Bookmark) {
        BOOKMARK.set_integer(&mut self.raw, bookmark.as_int());
    }

    pub fn link_label(&self) -> Option<String> {
        LINK_LABEL.get_string(&self.raw)
    }

    pub fn set_link_label(&mut self, label: impl Into<String>) {
        LINK_LABEL.set_string(&mut self.raw, label);
    }

    pub fn link_style(&self) -> Result<Option<LinkStyle>, ValidationError> {
        match LINK_STYLE.get_integer(&self.raw)? {
            None => Ok(None),
            Some(value) => LinkStyle::from_int(value).map(Some).ok_or_else(|| {
                ValidationError::new(format!(
                    "The field value ({:?}) set for field \"link#maltego.link.style\" is not a \
                     valid link style.",
                    value
                ))
            }),
        }
    }

    /// Encoded as a string choice, so `Normal` (`"0"`) is stored on the
    /// wire rather than cleared.
    pub fn set_link_style(&mut self, style: LinkStyle) {
        LINK_STYLE.set_string(&mut self.raw, style.as_int().to_string());
    }

    pub fn link_thickness(&self) -> Result<Option<i32>, ValidationError> {
        match LINK_THICKNESS.get_integer(&self.raw)? {
            None => Ok(None),
            Some(value) if (0..=5).contains(&value) => Ok(Some(value)),
            Some(value) => Err(Self::thickness_error(value)),
        }
    }

    pub fn set_link_thickness(&mut self, thickness: i32) -> Result<(), ValidationError> {
        if !(0..=5).contains(&thickness) {
            return Err(Self::thickness_error(thickness));
        }
        LINK_THICKNESS.set_string(&mut self.raw, thickness.to_string());
        Ok(())
    }

    fn thickness_error(value: i32) -> ValidationError {
        ValidationError::new(format!(
            "The field value ({:?}) set for field \"link#maltego.link.thickness\" is not in \
             the range 0-5.",
            value
        ))
    }

    pub fn link_show_label(&self) -> Result<Option<LinkLabel>, ValidationError> {
        match LINK_SHOW_LABEL.get_integer(&self.raw)? {
            None => Ok(None),
            Some(value) => LinkLabel::from_int(value).map(Some).ok_or_else(|| {
                ValidationError::new(format!(
                    "The field value ({:?}) set for field \"link#maltego.link.show-label\" is \
                     not a valid link label setting.",
                    value
                ))
            }),
        }
    }

    pub fn set_link_show_label(&mut self, setting: LinkLabel) {
        LINK_SHOW_LABEL.set_string(&mut self.raw, setting.as_int().to_string());
    }

    pub fn link_color(&self) -> Result<Option<String>, ValidationError> {
        LINK_COLOR.get(&self.raw)
    }

    /// The color must come from [`LinkColor::PALETTE`].
    pub fn set_link_color(&mut self, color: &str) -> Result<(), ValidationError> {
        LINK_COLOR.set(&mut self.raw, color)
    }
}

impl AddAssign<Field> for Entity {
    fn add_assign(&mut self, field: Field) {
        self.raw += field;
    }
}

impl AddAssign<Label> for Entity {
    fn add_assign(&mut self, label: Label) {
        self.raw += label;
    }
}

impl From<Entity> for RawEntity {
    fn from(entity: Entity) -> Self {
        entity.into_raw()
    }
}

/// Implemented by the typed entity structs in [`crate::entities`].
///
/// A typed entity is a newtype over [`Entity`] that exposes its fields
/// through [`FieldBinding`] accessors.
pub trait EntityClass: Sized {
    fn descriptor() -> &'static EntityDescriptor;

    fn from_entity(entity: Entity) -> Self;

    fn into_entity(self) -> Entity;

    fn new(value: impl Into<String>) -> Self {
        Self::from_entity(Entity::new(Self::descriptor(), value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::register_builtins;

    static CUSTOM: EntityDescriptor = EntityDescriptor {
        entity_type: "sniffles.Sergeant",
        alias: Some("Sarge"),
        namespace: "sniffles",
        category: None,
    };

    #[test]
    fn test_register_and_lookup_by_alias() {
        register(&CUSTOM);
        assert_eq!(lookup("sniffles.Sergeant"), Some(&CUSTOM));
        assert_eq!(lookup("Sarge"), Some(&CUSTOM));
        assert_eq!(lookup("sniffles.Private"), None);

        let entity = create("Sarge", "on duty").unwrap();
        assert_eq!(entity.entity_type(), "sniffles.Sergeant");
        assert_eq!(entity.value(), "on duty");
    }

    #[test]
    fn test_last_registration_wins() {
        static FIRST: EntityDescriptor = EntityDescriptor {
            entity_type: "dup.Type",
            alias: None,
            namespace: "dup",
            category: Some("first"),
        };
        static SECOND: EntityDescriptor = EntityDescriptor {
            entity_type: "dup.Type",
            alias: None,
            namespace: "dup",
            category: Some("second"),
        };
        register(&FIRST);
        register(&SECOND);
        assert_eq!(lookup("dup.Type").and_then(|d| d.category), Some("second"));
    }

    #[test]
    fn test_realize_unknown_type_never_fails() {
        register_builtins();
        let raw = RawEntity::new("acme.NotRegistered", "x");
        let entity = Entity::realize(raw);
        assert_eq!(entity.descriptor().entity_type, "maltego.Unknown");
        // The wire type is preserved for round-tripping.
        assert_eq!(entity.entity_type(), "acme.NotRegistered");
    }

    #[test]
    fn test_bookmark_round_trip() {
        register_builtins();
        let mut entity = create("maltego.Phrase", "hi").unwrap();
        entity.set_bookmark(Bookmark::Red);
        assert_eq!(entity.bookmark(), Ok(Some(Bookmark::Red)));
        assert_eq!(entity.raw().fields["bookmark#"].value, "4");
    }

    #[test]
    fn test_bookmark_cyan_clears_field() {
        register_builtins();
        let mut entity = create("maltego.Phrase", "hi").unwrap();
        entity.set_bookmark(Bookmark::Red);
        entity.set_bookmark(Bookmark::Cyan);
        assert_eq!(entity.bookmark(), Ok(None));
        assert!(!entity.raw().fields.contains_key("bookmark#"));
    }

    #[test]
    fn test_link_metadata_uses_loose_matching() {
        register_builtins();
        let mut entity = create("maltego.Phrase", "hi").unwrap();
        entity.set_link_style(LinkStyle::Dashed);
        entity.set_notes("observed twice");
        let fields = entity.fields();
        assert_eq!(
            fields["link#maltego.link.style"].matching_rule,
            crate::message::MatchingRule::Loose
        );
        assert_eq!(
            fields["notes#"].matching_rule,
            crate::message::MatchingRule::Loose
        );
    }

    #[test]
    fn test_link_style_normal_is_stored() {
        register_builtins();
        let mut entity = create("maltego.Phrase", "hi").unwrap();
        entity.set_link_style(LinkStyle::Normal);
        assert_eq!(entity.raw().fields["link#maltego.link.style"].value, "0");
        assert_eq!(entity.link_style(), Ok(Some(LinkStyle::Normal)));
    }

    #[test]
    fn test_link_thickness_zero_is_stored() {
        register_builtins();
        let mut entity = create("maltego.Phrase", "hi").unwrap();
        entity.set_link_thickness(0).unwrap();
        assert_eq!(
            entity.raw().fields["link#maltego.link.thickness"].value,
            "0"
        );
        assert_eq!(entity.link_thickness(), Ok(Some(0)));
    }

    #[test]
    fn test_link_show_label_global_setting_is_stored() {
        register_builtins();
        let mut entity = create("maltego.Phrase", "hi").unwrap();
        entity.set_link_show_label(LinkLabel::UseGlobalSetting);
        assert_eq!(
            entity.link_show_label(),
            Ok(Some(LinkLabel::UseGlobalSetting))
        );
    }

    #[test]
    fn test_link_color_palette_enforced() {
        register_builtins();
        let mut entity = create("maltego.Phrase", "hi").unwrap();
        assert!(entity.set_link_color("#123456").is_err());
        entity.set_link_color(LinkColor::NAVY_BLUE).unwrap();
        assert_eq!(
            entity.link_color(),
            Ok(Some(LinkColor::NAVY_BLUE.to_string()))
        );
    }

    #[test]
    fn test_link_thickness_range() {
        register_builtins();
        let mut entity = create("maltego.Phrase", "hi").unwrap();
        assert!(entity.set_link_thickness(6).is_err());
        entity.set_link_thickness(3).unwrap();
        assert_eq!(entity.link_thickness(), Ok(Some(3)));
    }
}
