//! The transform contract.
//!
//! A transform receives a request message, populates a response message, and
//! returns it; any error it raises becomes an exception message on the wire
//! (see [`crate::runner`]). Metadata methods have defaults derived from the
//! transform's reverse-dotted name so a minimal implementation only supplies
//! `name` and `do_transform`.

use convert_case::{Case, Casing};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::Config;
use crate::entities::Unknown;
use crate::entity::{EntityClass, EntityDescriptor};
use crate::message::{
    MaltegoException, MaltegoTransformRequestMessage, MaltegoTransformResponseMessage,
};

static DIGIT_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]+)").expect("valid digit pattern"));
static LOWER_UPPER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z])([A-Z]+)").expect("valid case boundary pattern"));
static ACRONYM_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Z]+)([A-Z][a-z])").expect("valid acronym boundary pattern"));

/// Splits a camel-cased identifier into a spaced title, preserving acronym
/// casing: `FastNmap` becomes `Fast Nmap`, `DNSLookup` becomes `DNS Lookup`.
pub fn camel_to_title(s: &str) -> String {
    let spaced = DIGIT_RUNS.replace_all(s, " $1 ");
    let spaced = LOWER_UPPER.replace_all(&spaced, "$1 $2");
    let spaced = ACRONYM_WORD.replace_all(&spaced, "$1 $2");
    spaced.trim().to_string()
}

/// A Maltego transform.
pub trait Transform {
    /// Unique reverse-dotted identifier, e.g. `sploitego.FastNmap`. The
    /// leading segment names the transform package; the trailing segment is
    /// the transform's class-style name.
    fn name(&self) -> &str;

    /// The entry point. Parameters and settings arrive through `config` and
    /// the request; output entities and console messages are appended to
    /// `response`, which is returned on success.
    fn do_transform(
        &self,
        request: &MaltegoTransformRequestMessage,
        response: MaltegoTransformResponseMessage,
        config: &Config,
    ) -> Result<MaltegoTransformResponseMessage, MaltegoException>;

    /// Context-menu label. Defaults to the titled trailing name segment.
    fn display_name(&self) -> String {
        let class_name = self.name().rsplit('.').next().unwrap_or_default();
        camel_to_title(class_name)
    }

    /// Transform set shown in the client. Defaults to the titled package
    /// segment of the name.
    fn transform_set(&self) -> String {
        let package = self.name().split('.').next().unwrap_or_default();
        package.to_case(Case::Title)
    }

    fn description(&self) -> String {
        String::new()
    }

    fn author(&self) -> &str {
        ""
    }

    fn help_url(&self) -> &str {
        ""
    }

    /// The input entity type this transform accepts.
    fn input_type(&self) -> &'static EntityDescriptor {
        Unknown::descriptor()
    }

    fn deprecated(&self) -> bool {
        false
    }

    /// Whether the transform may run on an application server.
    fn remote(&self) -> bool {
        false
    }

    fn debug(&self) -> bool {
        false
    }

    /// Whether the transform requires privileged user access.
    fn superuser(&self) -> bool {
        false
    }

    /// Called when a local run is terminated before the transform finishes.
    fn on_terminate(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Domain;

    struct ToDnsName;

    impl Transform for ToDnsName {
        fn name(&self) -> &str {
            "sniffles.ToDNSName"
        }

        fn input_type(&self) -> &'static EntityDescriptor {
            Domain::descriptor()
        }

        fn do_transform(
            &self,
            _request: &MaltegoTransformRequestMessage,
            response: MaltegoTransformResponseMessage,
            _config: &Config,
        ) -> Result<MaltegoTransformResponseMessage, MaltegoException> {
            Ok(response)
        }
    }

    #[test]
    fn test_camel_to_title() {
        assert_eq!(camel_to_title("FastNmap"), "Fast Nmap");
        assert_eq!(camel_to_title("DNSLookup"), "DNS Lookup");
        assert_eq!(camel_to_title("Lookup2Stage"), "Lookup 2 Stage");
        assert_eq!(camel_to_title("WhoisLookup"), "Whois Lookup");
    }

    #[test]
    fn test_metadata_defaults_derive_from_name() {
        let transform = ToDnsName;
        assert_eq!(transform.display_name(), "To DNS Name");
        assert_eq!(transform.transform_set(), "Sniffles");
        assert_eq!(transform.input_type().entity_type, "maltego.Domain");
        assert!(!transform.deprecated());
        assert!(!transform.remote());
    }
}
