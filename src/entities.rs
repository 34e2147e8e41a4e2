//! Built-in `maltego` namespace entity types.
//!
//! Each type is a thin newtype over [`Entity`] whose fields are declared as
//! [`FieldBinding`] constants and exposed through typed accessors. Call
//! [`register_builtins`] once at startup so wire entities realize against
//! these descriptors.

use std::ops::{Deref, DerefMut};
use std::sync::Once;

use chrono::NaiveDate;

use crate::entity::{register, Entity, EntityClass, EntityDescriptor};
use crate::message::fields::{FieldBinding, ValidationError};
use crate::message::RawEntity;

macro_rules! entity_class {
    ($(#[$meta:meta])* $name:ident, $ty:literal, $alias:expr, $ns:literal, $cat:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name(Entity);

        impl EntityClass for $name {
            fn descriptor() -> &'static EntityDescriptor {
                static DESCRIPTOR: EntityDescriptor = EntityDescriptor {
                    entity_type: $ty,
                    alias: $alias,
                    namespace: $ns,
                    category: $cat,
                };
                &DESCRIPTOR
            }

            fn from_entity(entity: Entity) -> Self {
                Self(entity)
            }

            fn into_entity(self) -> Entity {
                self.0
            }
        }

        impl Deref for $name {
            type Target = Entity;

            fn deref(&self) -> &Entity {
                &self.0
            }
        }

        impl DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Entity {
                &mut self.0
            }
        }

        impl From<$name> for Entity {
            fn from(entity: $name) -> Entity {
                entity.0
            }
        }

        impl From<$name> for RawEntity {
            fn from(entity: $name) -> RawEntity {
                entity.0.into_raw()
            }
        }
    };
}

entity_class!(
    /// Fallback type for wire entities whose type is not registered.
    Unknown,
    "maltego.Unknown",
    None,
    "maltego",
    None
);

entity_class!(
    Phrase,
    "maltego.Phrase",
    None,
    "maltego",
    Some("Personal")
);

impl Phrase {
    const TEXT: FieldBinding = FieldBinding::value("text", "Text");

    pub fn text(&self) -> Option<String> {
        Self::TEXT.get_string(self.raw())
    }

    pub fn set_text(&mut self, value: impl Into<String>) {
        Self::TEXT.set_string(self.raw_mut(), value);
    }
}

entity_class!(
    /// An internet domain. The primary value is the fully qualified domain
    /// name.
    Domain,
    "maltego.Domain",
    None,
    "maltego",
    Some("Infrastructure")
);

impl Domain {
    const FQDN: FieldBinding = FieldBinding::value("fqdn", "Domain Name");
    const WHOIS_INFO: FieldBinding =
        FieldBinding::new("whois-info", "WHOIS Info").with_alias("whois");

    pub fn fqdn(&self) -> Option<String> {
        Self::FQDN.get_string(self.raw())
    }

    pub fn set_fqdn(&mut self, value: impl Into<String>) {
        Self::FQDN.set_string(self.raw_mut(), value);
    }

    pub fn whois_info(&self) -> Option<String> {
        Self::WHOIS_INFO.get_string(self.raw())
    }

    pub fn set_whois_info(&mut self, value: impl Into<String>) {
        Self::WHOIS_INFO.set_string(self.raw_mut(), value);
    }
}

entity_class!(
    DNSName,
    "maltego.DNSName",
    None,
    "maltego",
    Some("Infrastructure")
);

impl DNSName {
    const FQDN: FieldBinding = FieldBinding::value("fqdn", "DNS Name");

    pub fn fqdn(&self) -> Option<String> {
        Self::FQDN.get_string(self.raw())
    }

    pub fn set_fqdn(&mut self, value: impl Into<String>) {
        Self::FQDN.set_string(self.raw_mut(), value);
    }
}

entity_class!(
    MXRecord,
    "maltego.MXRecord",
    None,
    "maltego",
    Some("Infrastructure")
);

impl MXRecord {
    const FQDN: FieldBinding = FieldBinding::value("fqdn", "DNS Name");
    const PRIORITY: FieldBinding = FieldBinding::new("mxrecord.priority", "Priority");

    pub fn fqdn(&self) -> Option<String> {
        Self::FQDN.get_string(self.raw())
    }

    pub fn set_fqdn(&mut self, value: impl Into<String>) {
        Self::FQDN.set_string(self.raw_mut(), value);
    }

    pub fn priority(&self) -> Result<Option<i32>, ValidationError> {
        Self::PRIORITY.get_integer(self.raw())
    }

    pub fn set_priority(&mut self, value: i32) {
        Self::PRIORITY.set_integer(self.raw_mut(), value);
    }
}

entity_class!(
    NSRecord,
    "maltego.NSRecord",
    None,
    "maltego",
    Some("Infrastructure")
);

impl NSRecord {
    const FQDN: FieldBinding = FieldBinding::value("fqdn", "DNS Name");

    pub fn fqdn(&self) -> Option<String> {
        Self::FQDN.get_string(self.raw())
    }

    pub fn set_fqdn(&mut self, value: impl Into<String>) {
        Self::FQDN.set_string(self.raw_mut(), value);
    }
}

entity_class!(
    /// An IPv4 address. `IPAddress` is the legacy wire alias older clients
    /// still send.
    IPv4Address,
    "maltego.IPv4Address",
    Some("IPAddress"),
    "maltego",
    Some("Infrastructure")
);

impl IPv4Address {
    const ADDRESS: FieldBinding = FieldBinding::value("ipv4-address", "IP Address");
    const INTERNAL: FieldBinding = FieldBinding::new("ipaddress.internal", "Internal");

    pub fn address(&self) -> Option<String> {
        Self::ADDRESS.get_string(self.raw())
    }

    pub fn set_address(&mut self, value: impl Into<String>) {
        Self::ADDRESS.set_string(self.raw_mut(), value);
    }

    pub fn internal(&self) -> Option<bool> {
        Self::INTERNAL.get_boolean(self.raw())
    }

    pub fn set_internal(&mut self, value: bool) {
        Self::INTERNAL.set_boolean(self.raw_mut(), value);
    }
}

entity_class!(
    Netblock,
    "maltego.Netblock",
    None,
    "maltego",
    Some("Infrastructure")
);

impl Netblock {
    const RANGE: FieldBinding = FieldBinding::value("ipv4-range", "IP Range");

    pub fn ipv4_range(&self) -> Option<String> {
        Self::RANGE.get_string(self.raw())
    }

    pub fn set_ipv4_range(&mut self, value: impl Into<String>) {
        Self::RANGE.set_string(self.raw_mut(), value);
    }
}

entity_class!(
    /// An autonomous system, identified by its number.
    AS,
    "maltego.AS",
    Some("ASNumber"),
    "maltego",
    Some("Infrastructure")
);

impl AS {
    const NUMBER: FieldBinding = FieldBinding::value("as.number", "AS Number");

    pub fn number(&self) -> Result<Option<i32>, ValidationError> {
        match self.value() {
            "" => Ok(None),
            text => text.parse::<i32>().map(Some).map_err(|_| {
                ValidationError::new(format!(
                    "The field value ({:?}) set for field \"AS Number\" is not an integer.",
                    text
                ))
            }),
        }
    }

    pub fn set_number(&mut self, value: i32) {
        Self::NUMBER.set_string(self.raw_mut(), value.to_string());
    }
}

entity_class!(
    Website,
    "maltego.Website",
    None,
    "maltego",
    Some("Infrastructure")
);

impl Website {
    const FQDN: FieldBinding = FieldBinding::value("fqdn", "Website");
    const SSL_ENABLED: FieldBinding = FieldBinding::new("website.ssl-enabled", "SSL Enabled");
    const PORTS: FieldBinding = FieldBinding::new("ports", "Ports");

    pub fn fqdn(&self) -> Option<String> {
        Self::FQDN.get_string(self.raw())
    }

    pub fn set_fqdn(&mut self, value: impl Into<String>) {
        Self::FQDN.set_string(self.raw_mut(), value);
    }

    pub fn ssl_enabled(&self) -> Option<bool> {
        Self::SSL_ENABLED.get_boolean(self.raw())
    }

    pub fn set_ssl_enabled(&mut self, value: bool) {
        Self::SSL_ENABLED.set_boolean(self.raw_mut(), value);
    }

    pub fn ports(&self) -> Result<Option<i32>, ValidationError> {
        Self::PORTS.get_integer(self.raw())
    }

    pub fn set_ports(&mut self, value: i32) {
        Self::PORTS.set_integer(self.raw_mut(), value);
    }
}

entity_class!(Url, "maltego.URL", None, "maltego", Some("Infrastructure"));

impl Url {
    const SHORT_TITLE: FieldBinding = FieldBinding::value("short-title", "Short title");
    const URL: FieldBinding = FieldBinding::new("url", "URL").with_alias("theurl");
    const TITLE: FieldBinding = FieldBinding::new("title", "Title").with_alias("fulltitle");

    pub fn short_title(&self) -> Option<String> {
        Self::SHORT_TITLE.get_string(self.raw())
    }

    pub fn set_short_title(&mut self, value: impl Into<String>) {
        Self::SHORT_TITLE.set_string(self.raw_mut(), value);
    }

    pub fn url(&self) -> Option<String> {
        Self::URL.get_string(self.raw())
    }

    pub fn set_url(&mut self, value: impl Into<String>) {
        Self::URL.set_string(self.raw_mut(), value);
    }

    pub fn title(&self) -> Option<String> {
        Self::TITLE.get_string(self.raw())
    }

    pub fn set_title(&mut self, value: impl Into<String>) {
        Self::TITLE.set_string(self.raw_mut(), value);
    }
}

entity_class!(
    Person,
    "maltego.Person",
    None,
    "maltego",
    Some("Personal")
);

impl Person {
    const FULLNAME: FieldBinding = FieldBinding::value("person.fullname", "Full Name");
    const LASTNAME: FieldBinding =
        FieldBinding::new("person.lastname", "Surname").with_alias("lastname");
    const FIRSTNAMES: FieldBinding =
        FieldBinding::new("person.firstnames", "First Names").with_alias("firstname");

    pub fn fullname(&self) -> Option<String> {
        Self::FULLNAME.get_string(self.raw())
    }

    pub fn set_fullname(&mut self, value: impl Into<String>) {
        Self::FULLNAME.set_string(self.raw_mut(), value);
    }

    pub fn lastname(&self) -> Option<String> {
        Self::LASTNAME.get_string(self.raw())
    }

    pub fn set_lastname(&mut self, value: impl Into<String>) {
        Self::LASTNAME.set_string(self.raw_mut(), value);
    }

    pub fn firstnames(&self) -> Option<String> {
        Self::FIRSTNAMES.get_string(self.raw())
    }

    pub fn set_firstnames(&mut self, value: impl Into<String>) {
        Self::FIRSTNAMES.set_string(self.raw_mut(), value);
    }
}

entity_class!(
    EmailAddress,
    "maltego.EmailAddress",
    None,
    "maltego",
    Some("Personal")
);

impl EmailAddress {
    const EMAIL: FieldBinding = FieldBinding::value("email", "Email Address");

    pub fn email(&self) -> Option<String> {
        Self::EMAIL.get_string(self.raw())
    }

    pub fn set_email(&mut self, value: impl Into<String>) {
        Self::EMAIL.set_string(self.raw_mut(), value);
    }
}

entity_class!(
    Location,
    "maltego.Location",
    None,
    "maltego",
    Some("Locations")
);

impl Location {
    const NAME: FieldBinding = FieldBinding::value("location.name", "Name");
    const CITY: FieldBinding = FieldBinding::new("city", "City");
    const COUNTRY_CODE: FieldBinding =
        FieldBinding::new("countrycode", "Country Code").with_alias("countrysc");
    const AREA: FieldBinding = FieldBinding::new("location.area", "Area").with_alias("area");
    const COUNTRY: FieldBinding = FieldBinding::new("country", "Country");
    const LONGITUDE: FieldBinding = FieldBinding::new("longitude", "Longitude").with_alias("long");
    const LATITUDE: FieldBinding = FieldBinding::new("latitude", "Latitude").with_alias("lat");
    const STREET_ADDRESS: FieldBinding = FieldBinding::new("streetaddress", "Street Address");
    const AREA_CODE: FieldBinding = FieldBinding::new("location.areacode", "Area Code");

    pub fn name(&self) -> Option<String> {
        Self::NAME.get_string(self.raw())
    }

    pub fn set_name(&mut self, value: impl Into<String>) {
        Self::NAME.set_string(self.raw_mut(), value);
    }

    pub fn city(&self) -> Option<String> {
        Self::CITY.get_string(self.raw())
    }

    pub fn set_city(&mut self, value: impl Into<String>) {
        Self::CITY.set_string(self.raw_mut(), value);
    }

    pub fn country_code(&self) -> Option<String> {
        Self::COUNTRY_CODE.get_string(self.raw())
    }

    pub fn set_country_code(&mut self, value: impl Into<String>) {
        Self::COUNTRY_CODE.set_string(self.raw_mut(), value);
    }

    pub fn area(&self) -> Option<String> {
        Self::AREA.get_string(self.raw())
    }

    pub fn set_area(&mut self, value: impl Into<String>) {
        Self::AREA.set_string(self.raw_mut(), value);
    }

    pub fn country(&self) -> Option<String> {
        Self::COUNTRY.get_string(self.raw())
    }

    pub fn set_country(&mut self, value: impl Into<String>) {
        Self::COUNTRY.set_string(self.raw_mut(), value);
    }

    pub fn longitude(&self) -> Result<Option<f64>, ValidationError> {
        Self::LONGITUDE.get_float(self.raw())
    }

    pub fn set_longitude(&mut self, value: f64) {
        Self::LONGITUDE.set_float(self.raw_mut(), value);
    }

    pub fn latitude(&self) -> Result<Option<f64>, ValidationError> {
        Self::LATITUDE.get_float(self.raw())
    }

    pub fn set_latitude(&mut self, value: f64) {
        Self::LATITUDE.set_float(self.raw_mut(), value);
    }

    pub fn street_address(&self) -> Option<String> {
        Self::STREET_ADDRESS.get_string(self.raw())
    }

    pub fn set_street_address(&mut self, value: impl Into<String>) {
        Self::STREET_ADDRESS.set_string(self.raw_mut(), value);
    }

    pub fn area_code(&self) -> Option<String> {
        Self::AREA_CODE.get_string(self.raw())
    }

    pub fn set_area_code(&mut self, value: impl Into<String>) {
        Self::AREA_CODE.set_string(self.raw_mut(), value);
    }
}

entity_class!(
    Banner,
    "maltego.Banner",
    None,
    "maltego",
    Some("Infrastructure")
);

impl Banner {
    const TEXT: FieldBinding = FieldBinding::value("banner.text", "Banner");

    pub fn text(&self) -> Option<String> {
        Self::TEXT.get_string(self.raw())
    }

    pub fn set_text(&mut self, value: impl Into<String>) {
        Self::TEXT.set_string(self.raw_mut(), value);
    }
}

entity_class!(
    Port,
    "maltego.Port",
    None,
    "maltego",
    Some("Infrastructure")
);

impl Port {
    // Port numbers travel as text; ranges like "80-443" are valid values.
    const NUMBER: FieldBinding = FieldBinding::value("port.number", "Ports");

    pub fn number(&self) -> Option<String> {
        Self::NUMBER.get_string(self.raw())
    }

    pub fn set_number(&mut self, value: impl Into<String>) {
        Self::NUMBER.set_string(self.raw_mut(), value);
    }
}

entity_class!(
    Service,
    "maltego.Service",
    None,
    "maltego",
    Some("Infrastructure")
);

impl Service {
    const NAME: FieldBinding = FieldBinding::value("service.name", "Description");
    const BANNER: FieldBinding = FieldBinding::new("banner.text", "Service Banner");
    const PORTS: FieldBinding = FieldBinding::new("port.number", "Ports");

    pub fn name(&self) -> Option<String> {
        Self::NAME.get_string(self.raw())
    }

    pub fn set_name(&mut self, value: impl Into<String>) {
        Self::NAME.set_string(self.raw_mut(), value);
    }

    pub fn banner(&self) -> Option<String> {
        Self::BANNER.get_string(self.raw())
    }

    pub fn set_banner(&mut self, value: impl Into<String>) {
        Self::BANNER.set_string(self.raw_mut(), value);
    }

    pub fn ports(&self) -> Option<String> {
        Self::PORTS.get_string(self.raw())
    }

    pub fn set_ports(&mut self, value: impl Into<String>) {
        Self::PORTS.set_string(self.raw_mut(), value);
    }
}

entity_class!(
    Vulnerability,
    "maltego.Vulnerability",
    Some("Vuln"),
    "maltego",
    Some("Penetration Testing")
);

impl Vulnerability {
    const ID: FieldBinding = FieldBinding::value("vulnerability.id", "ID");

    pub fn id(&self) -> Option<String> {
        Self::ID.get_string(self.raw())
    }

    pub fn set_id(&mut self, value: impl Into<String>) {
        Self::ID.set_string(self.raw_mut(), value);
    }
}

entity_class!(Hash, "maltego.Hash", None, "maltego", Some("Malware"));

impl Hash {
    const HASH: FieldBinding = FieldBinding::value("properties.hash", "Hash");
    const HASH_TYPE: FieldBinding = FieldBinding::new("type", "Hash Type");
    const OWNER: FieldBinding = FieldBinding::new("owner", "Owner");
    const BEFORE: FieldBinding = FieldBinding::new("before", "Before");
    const AFTER: FieldBinding = FieldBinding::new("after", "After");
    const INCLUDED_MEDIA_TYPES: FieldBinding =
        FieldBinding::new("includeMediaType", "Included Media Types");
    const EXCLUDED_MEDIA_TYPES: FieldBinding =
        FieldBinding::new("excludeMediaType", "Excluded Media Types");

    pub fn hash(&self) -> Option<String> {
        Self::HASH.get_string(self.raw())
    }

    pub fn set_hash(&mut self, value: impl Into<String>) {
        Self::HASH.set_string(self.raw_mut(), value);
    }

    pub fn hash_type(&self) -> Option<String> {
        Self::HASH_TYPE.get_string(self.raw())
    }

    pub fn set_hash_type(&mut self, value: impl Into<String>) {
        Self::HASH_TYPE.set_string(self.raw_mut(), value);
    }

    pub fn owner(&self) -> Option<String> {
        Self::OWNER.get_string(self.raw())
    }

    pub fn set_owner(&mut self, value: impl Into<String>) {
        Self::OWNER.set_string(self.raw_mut(), value);
    }

    pub fn before(&self) -> Result<Option<NaiveDate>, ValidationError> {
        Self::BEFORE.get_date(self.raw())
    }

    pub fn set_before(&mut self, value: NaiveDate) {
        Self::BEFORE.set_date(self.raw_mut(), value);
    }

    pub fn after(&self) -> Result<Option<NaiveDate>, ValidationError> {
        Self::AFTER.get_date(self.raw())
    }

    pub fn set_after(&mut self, value: NaiveDate) {
        Self::AFTER.set_date(self.raw_mut(), value);
    }

    pub fn included_media_types(&self) -> Option<String> {
        Self::INCLUDED_MEDIA_TYPES.get_string(self.raw())
    }

    pub fn set_included_media_types(&mut self, value: impl Into<String>) {
        Self::INCLUDED_MEDIA_TYPES.set_string(self.raw_mut(), value);
    }

    pub fn excluded_media_types(&self) -> Option<String> {
        Self::EXCLUDED_MEDIA_TYPES.get_string(self.raw())
    }

    pub fn set_excluded_media_types(&mut self, value: impl Into<String>) {
        Self::EXCLUDED_MEDIA_TYPES.set_string(self.raw_mut(), value);
    }
}

// Shared affiliation fields, mixed into every maltego.affiliation type.
const AFFILIATION_PERSON_NAME: FieldBinding = FieldBinding::value("person.name", "Name");
const AFFILIATION_UID: FieldBinding =
    FieldBinding::new("affiliation.uid", "UID").with_alias("uid");
const AFFILIATION_NETWORK: FieldBinding =
    FieldBinding::new("affiliation.network", "Network").with_alias("network");
const AFFILIATION_PROFILE_URL: FieldBinding =
    FieldBinding::new("affiliation.profile-url", "Profile URL").with_alias("profile_url");

/// Accessors common to the `maltego.affiliation` namespace: the person's
/// name (the entity value), account UID, network name, and profile URL.
pub trait AffiliationFields {
    fn affiliation(&self) -> &Entity;

    fn affiliation_mut(&mut self) -> &mut Entity;

    fn person_name(&self) -> Option<String> {
        AFFILIATION_PERSON_NAME.get_string(self.affiliation().raw())
    }

    fn set_person_name(&mut self, value: impl Into<String>)
    where
        Self: Sized,
    {
        AFFILIATION_PERSON_NAME.set_string(self.affiliation_mut().raw_mut(), value);
    }

    fn uid(&self) -> Option<String> {
        AFFILIATION_UID.get_string(self.affiliation().raw())
    }

    fn set_uid(&mut self, value: impl Into<String>)
    where
        Self: Sized,
    {
        AFFILIATION_UID.set_string(self.affiliation_mut().raw_mut(), value);
    }

    fn network(&self) -> Option<String> {
        AFFILIATION_NETWORK.get_string(self.affiliation().raw())
    }

    fn set_network(&mut self, value: impl Into<String>)
    where
        Self: Sized,
    {
        AFFILIATION_NETWORK.set_string(self.affiliation_mut().raw_mut(), value);
    }

    fn profile_url(&self) -> Option<String> {
        AFFILIATION_PROFILE_URL.get_string(self.affiliation().raw())
    }

    fn set_profile_url(&mut self, value: impl Into<String>)
    where
        Self: Sized,
    {
        AFFILIATION_PROFILE_URL.set_string(self.affiliation_mut().raw_mut(), value);
    }
}

macro_rules! affiliation_entity {
    ($(#[$meta:meta])* $name:ident, $ty:literal, $alias:expr) => {
        entity_class!(
            $(#[$meta])*
            $name,
            $ty,
            $alias,
            "maltego.affiliation",
            Some("Social Network")
        );

        impl AffiliationFields for $name {
            fn affiliation(&self) -> &Entity {
                &self.0
            }

            fn affiliation_mut(&mut self) -> &mut Entity {
                &mut self.0
            }
        }
    };
}

affiliation_entity!(
    Affiliation,
    "maltego.affiliation.Affiliation",
    None
);
affiliation_entity!(Bebo, "maltego.affiliation.Bebo", Some("AffiliationBebo"));
affiliation_entity!(
    Facebook,
    "maltego.affiliation.Facebook",
    Some("AffiliationFacebook")
);
affiliation_entity!(
    Flickr,
    "maltego.affiliation.Flickr",
    Some("AffiliationFlickr")
);
affiliation_entity!(
    Linkedin,
    "maltego.affiliation.Linkedin",
    Some("AffiliationLinkedin")
);
affiliation_entity!(
    MySpace,
    "maltego.affiliation.MySpace",
    Some("AffiliationMySpace")
);
affiliation_entity!(
    Orkut,
    "maltego.affiliation.Orkut",
    Some("AffiliationOrkut")
);
affiliation_entity!(
    Spock,
    "maltego.affiliation.Spock",
    Some("AffiliationSpock")
);
affiliation_entity!(
    Twitter,
    "maltego.affiliation.Twitter",
    Some("AffiliationTwitter")
);

impl Spock {
    const WEBSITES: FieldBinding = FieldBinding::new("spock.websites", "Listed Websites");

    pub fn websites(&self) -> Option<String> {
        Self::WEBSITES.get_string(self.raw())
    }

    pub fn set_websites(&mut self, value: impl Into<String>) {
        Self::WEBSITES.set_string(self.raw_mut(), value);
    }
}

impl Twitter {
    const NUMBER: FieldBinding = FieldBinding::new("twitter.number", "Twitter Number");
    const SCREEN_NAME: FieldBinding = FieldBinding::new("twitter.screen-name", "Screen Name");
    const FRIEND_COUNT: FieldBinding = FieldBinding::new("twitter.friendcount", "Friend Count");
    const FULLNAME: FieldBinding = FieldBinding::new("person.fullname", "Real Name");

    pub fn number(&self) -> Result<Option<i32>, ValidationError> {
        Self::NUMBER.get_integer(self.raw())
    }

    pub fn set_number(&mut self, value: i32) {
        Self::NUMBER.set_integer(self.raw_mut(), value);
    }

    pub fn screen_name(&self) -> Option<String> {
        Self::SCREEN_NAME.get_string(self.raw())
    }

    pub fn set_screen_name(&mut self, value: impl Into<String>) {
        Self::SCREEN_NAME.set_string(self.raw_mut(), value);
    }

    pub fn friend_count(&self) -> Result<Option<i32>, ValidationError> {
        Self::FRIEND_COUNT.get_integer(self.raw())
    }

    pub fn set_friend_count(&mut self, value: i32) {
        Self::FRIEND_COUNT.set_integer(self.raw_mut(), value);
    }

    pub fn fullname(&self) -> Option<String> {
        Self::FULLNAME.get_string(self.raw())
    }

    pub fn set_fullname(&mut self, value: impl Into<String>) {
        Self::FULLNAME.set_string(self.raw_mut(), value);
    }
}

/// Registers every built-in descriptor with the global entity registry.
/// Idempotent; safe to call from multiple entry points.
pub fn register_builtins() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        register(Unknown::descriptor());
        register(Phrase::descriptor());
        register(Domain::descriptor());
        register(DNSName::descriptor());
        register(MXRecord::descriptor());
        register(NSRecord::descriptor());
        register(IPv4Address::descriptor());
        register(Netblock::descriptor());
        register(AS::descriptor());
        register(Website::descriptor());
        register(Url::descriptor());
        register(Person::descriptor());
        register(EmailAddress::descriptor());
        register(Location::descriptor());
        register(Banner::descriptor());
        register(Port::descriptor());
        register(Service::descriptor());
        register(Vulnerability::descriptor());
        register(Hash::descriptor());
        register(Affiliation::descriptor());
        register(Bebo::descriptor());
        register(Facebook::descriptor());
        register(Flickr::descriptor());
        register(Linkedin::descriptor());
        register(MySpace::descriptor());
        register(Orkut::descriptor());
        register(Spock::descriptor());
        register(Twitter::descriptor());
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{create, lookup};

    #[test]
    fn test_value_field_is_entity_value() {
        register_builtins();
        let mut domain = Domain::new("example.com");
        assert_eq!(domain.fqdn(), Some("example.com".to_string()));
        domain.set_fqdn("example.org");
        assert_eq!(domain.value(), "example.org");
        assert!(domain.fields().is_empty());
    }

    #[test]
    fn test_alias_lookup_resolves_builtin() {
        register_builtins();
        assert_eq!(
            lookup("IPAddress").map(|d| d.entity_type),
            Some("maltego.IPv4Address")
        );
        assert_eq!(
            lookup("Vuln").map(|d| d.entity_type),
            Some("maltego.Vulnerability")
        );
        assert_eq!(
            lookup("ASNumber").map(|d| d.entity_type),
            Some("maltego.AS")
        );
        let entity = create("IPAddress", "10.0.0.1").unwrap();
        assert_eq!(entity.entity_type(), "maltego.IPv4Address");
    }

    #[test]
    fn test_domain_whois_alias_read() {
        register_builtins();
        let mut domain = Domain::new("example.com");
        // A value delivered under the legacy wire name reads through the
        // primary accessor.
        domain.set("whois", "ACME Corp");
        assert_eq!(domain.whois_info(), Some("ACME Corp".to_string()));
    }

    #[test]
    fn test_affiliation_fields_shared_across_family() {
        register_builtins();
        let mut twitter = Twitter::new("alice");
        twitter.set_uid("alice123");
        twitter.set_network("Twitter");
        twitter.set_screen_name("@alice");
        assert_eq!(twitter.person_name(), Some("alice".to_string()));
        assert_eq!(twitter.uid(), Some("alice123".to_string()));
        assert_eq!(twitter.get("affiliation.network"), Some("Twitter"));

        let mut facebook = Facebook::new("bob");
        facebook.set_profile_url("https://facebook.com/bob");
        assert_eq!(
            facebook.profile_url(),
            Some("https://facebook.com/bob".to_string())
        );
        assert_eq!(
            Facebook::descriptor().namespace,
            "maltego.affiliation"
        );
    }

    #[test]
    fn test_typed_entity_round_trips_through_registry() {
        register_builtins();
        let mut mx = MXRecord::new("mail.example.com");
        mx.set_priority(10);
        let raw = mx.into_entity().into_raw();

        let realized = Entity::realize(raw);
        assert_eq!(realized.descriptor().entity_type, "maltego.MXRecord");
        let mx = MXRecord::from_entity(realized);
        assert_eq!(mx.priority(), Ok(Some(10)));
        assert_eq!(mx.fqdn(), Some("mail.example.com".to_string()));
    }

    #[test]
    fn test_as_number_is_the_value() {
        register_builtins();
        let mut asn = AS::new("");
        asn.set_number(64512);
        assert_eq!(asn.value(), "64512");
        assert_eq!(asn.number(), Ok(Some(64512)));
    }

    #[test]
    fn test_website_boolean_field() {
        register_builtins();
        let mut site = Website::new("www.example.com");
        site.set_ssl_enabled(false);
        assert_eq!(site.ssl_enabled(), Some(false));
        assert_eq!(site.get("website.ssl-enabled"), Some("false"));
    }
}
