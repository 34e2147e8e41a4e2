//! End-to-end scenarios across the message, entity, and runner layers.

use std::sync::Once;

use canari::entities::{register_builtins, Domain, IPv4Address};
use canari::entity::{self, EntityClass, EntityDescriptor};
use canari::message::fields::{encode_string_list, FieldBinding, RegexFieldBinding, TimeSpan};
use canari::message::{
    Field, MaltegoMessage, MaltegoTransformRequestMessage, MaltegoTransformResponseMessage,
    RawEntity, TransformParameters, UiMessageType, LOCAL_ARGUMENTS,
};
use canari::runner::{build_request, run_transform, TransformResult};
use canari::transform::Transform;
use canari::{Config, MaltegoException};
use chrono::Duration;

fn setup() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
    register_builtins();
}

#[test]
fn test_domain_entity_renders_value_and_field() {
    setup();
    let mut domain = Domain::new("example.com");
    domain.set_whois_info("ACME Corp");

    let mut response = MaltegoTransformResponseMessage::new();
    response += domain.into_entity();
    let xml = MaltegoMessage::Response(response).render().unwrap();

    assert!(xml.contains("<Value>example.com</Value>"));
    assert!(xml.contains("Name=\"whois-info\""));
    assert!(xml.contains(">ACME Corp</Field>"));
}

#[test]
fn test_timespan_normalizes_excess_seconds() {
    setup();
    let span =
        TimeSpan::from_duration(Duration::days(2) + Duration::seconds(60) + Duration::seconds(60));
    assert_eq!(span.to_string(), "2d 0h2m0.000s");

    let binding = FieldBinding::new("uptime", "Uptime");
    let mut raw = RawEntity::new("maltego.Phrase", "host");
    binding.set_timespan(&mut raw, span);
    assert_eq!(raw.fields["uptime"].value, "2d 0h2m0.000s");
}

#[test]
fn test_color_field_rejects_named_color() {
    setup();
    let binding = RegexFieldBinding::color(FieldBinding::new("favorite.color", "Favorite Color"));
    let mut raw = RawEntity::new("maltego.Person", "Bob");

    let err = binding.set(&mut raw, "red").unwrap_err();
    assert!(err.message().contains("\"red\""));
    assert!(err.message().contains("#000000-#ffffff"));
    assert!(!raw.fields.contains_key("favorite.color"));

    binding.set(&mut raw, "#ff0000").unwrap();
    let err = binding.set(&mut raw, "crimson").unwrap_err();
    assert!(err.message().contains("crimson"));
    assert_eq!(raw.fields["favorite.color"].value, "#ff0000");
}

#[test]
fn test_parsed_ui_messages_group_by_type() {
    setup();
    let xml = r#"
        <MaltegoMessage>
          <MaltegoTransformResponseMessage>
            <UIMessages>
              <UIMessage MessageType="Debug">resolving</UIMessage>
              <UIMessage MessageType="FatalError">upstream unreachable</UIMessage>
            </UIMessages>
            <Entities/>
          </MaltegoTransformResponseMessage>
        </MaltegoMessage>
    "#;
    let response = match MaltegoMessage::parse(xml).unwrap() {
        MaltegoMessage::Response(response) => response,
        other => panic!("expected response, got {:?}", other),
    };

    let result = TransformResult::from_response(&response);
    assert_eq!(result.messages(UiMessageType::Debug), ["resolving"]);
    assert_eq!(
        result.messages(UiMessageType::FatalError),
        ["upstream unreachable"]
    );
    assert!(result.messages(UiMessageType::Inform).is_empty());
}

#[test]
fn test_alias_collision_resolves_to_last_registration() {
    setup();
    static FIRST: EntityDescriptor = EntityDescriptor {
        entity_type: "acme.OldVulnerability",
        alias: Some("SharedVuln"),
        namespace: "acme",
        category: None,
    };
    static SECOND: EntityDescriptor = EntityDescriptor {
        entity_type: "acme.NewVulnerability",
        alias: Some("SharedVuln"),
        namespace: "acme",
        category: None,
    };
    entity::register(&FIRST);
    entity::register(&SECOND);

    assert_eq!(
        entity::lookup("SharedVuln").map(|d| d.entity_type),
        Some("acme.NewVulnerability")
    );
    // Both remain independently resolvable by their own type strings.
    assert_eq!(
        entity::lookup("acme.OldVulnerability").map(|d| d.entity_type),
        Some("acme.OldVulnerability")
    );
    assert_eq!(
        entity::lookup("acme.NewVulnerability").map(|d| d.entity_type),
        Some("acme.NewVulnerability")
    );
}

#[test]
fn test_local_arguments_surface_as_argument_list() {
    setup();
    let args = vec!["--flag".to_string(), "value".to_string()];
    let mut request = MaltegoTransformRequestMessage::new();
    request += Field::new(LOCAL_ARGUMENTS, encode_string_list(&args));

    match request.parameters() {
        TransformParameters::Arguments(decoded) => assert_eq!(decoded, args),
        TransformParameters::Fields(_) => panic!("expected decoded argument list"),
    }
}

struct ToIpAddress;

impl Transform for ToIpAddress {
    fn name(&self) -> &str {
        "sniffles.ToIPAddress"
    }

    fn input_type(&self) -> &'static EntityDescriptor {
        Domain::descriptor()
    }

    fn do_transform(
        &self,
        request: &MaltegoTransformRequestMessage,
        mut response: MaltegoTransformResponseMessage,
        config: &Config,
    ) -> Result<MaltegoTransformResponseMessage, MaltegoException> {
        let domain = request.entity();
        if domain.value().is_empty() {
            return Err(MaltegoException::new("Expected a domain name as input."));
        }
        let mut ip = IPv4Address::new("93.184.216.34");
        if let Some(mark) = config.get("sniffles.resolver.mark-internal") {
            if mark.as_bool() == Some(true) {
                ip.set_internal(true);
            }
        }
        response += ip.into_entity();
        Ok(response)
    }
}

#[test]
fn test_full_request_dispatch_render_parse_cycle() {
    setup();
    let config = Config::from_yaml_str("sniffles.resolver:\n  mark-internal: true\n").unwrap();
    let request = build_request("maltego.Domain", "example.com", [], &[]);

    let message = run_transform(&ToIpAddress, &request, &config);
    let xml = message.render().unwrap();

    let parsed = match MaltegoMessage::parse(&xml).unwrap() {
        MaltegoMessage::Response(response) => response,
        other => panic!("expected response, got {:?}", other),
    };
    let result = TransformResult::from_response(&parsed);
    assert_eq!(result.entities().len(), 1);
    let ip = &result.entities()[0];
    assert_eq!(ip.descriptor().entity_type, "maltego.IPv4Address");
    assert_eq!(ip.value(), "93.184.216.34");
    assert_eq!(ip.get("ipaddress.internal"), Some("true"));
}

#[test]
fn test_transform_failure_travels_as_exception_xml() {
    setup();
    let request = build_request("maltego.Domain", "", [], &[]);
    let message = run_transform(&ToIpAddress, &request, &Config::default());
    let xml = message.render().unwrap();

    assert!(xml.contains("<MaltegoTransformExceptionMessage>"));
    assert!(xml.contains("Expected a domain name as input."));

    match MaltegoMessage::parse(&xml).unwrap() {
        MaltegoMessage::Exception(exception) => {
            assert_eq!(exception.exceptions.len(), 1);
        }
        other => panic!("expected exception, got {:?}", other),
    }
}

#[test]
fn test_request_round_trip_preserves_entity_and_limits() {
    setup();
    let request = build_request(
        "maltego.Domain",
        "example.com",
        [Field::new("whois-info", "ACME Corp")],
        &["--deep".to_string()],
    );
    let xml = MaltegoMessage::Request(request).render().unwrap();

    let parsed = match MaltegoMessage::parse(&xml).unwrap() {
        MaltegoMessage::Request(request) => request,
        other => panic!("expected request, got {:?}", other),
    };
    assert_eq!(parsed.limits().soft, 10000);
    assert_eq!(parsed.entity().value(), "example.com");
    assert_eq!(parsed.entity().get("whois-info"), Some("ACME Corp"));
    match parsed.parameters() {
        TransformParameters::Arguments(args) => assert_eq!(args, ["--deep"]),
        TransformParameters::Fields(_) => panic!("expected argument list"),
    }
}
