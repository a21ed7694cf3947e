//! OASF records ↔ A2A agent cards.
//!
//! A record built from a card keeps the card verbatim under the A2A
//! module's `card_data`, so translating back returns the card exactly as
//! it came in. Card fields with no first-class OASF home are also copied
//! into flat string `annotations` for consumers that only read records.

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::document::{first_str, first_value, str_or, Document};
use crate::error::TranslateError;
use crate::translate::{find_module, now_rfc3339, objects, require_object};
use crate::types::{SchemaVersion, A2A_MODULE, A2A_MODULE_NAMES, DEFAULT_AUTHOR};

const DEFAULT_NAME: &str = "generated-agent";
const DEFAULT_DESCRIPTION: &str = "Agent generated from A2A card";
const DEFAULT_VERSION: &str = "v1.0.0";

/// Placeholder skill until cards carry OASF skill ids.
const PLACEHOLDER_SKILL: (u64, &str) = (1004, "agent_orchestration/agent_coordination");
/// Placeholder domain until cards carry OASF domain ids.
const PLACEHOLDER_DOMAIN: (u64, &str) = (10204, "technology/software_engineering/apis_integration");

/// Extract the A2A card from a record.
///
/// Returns the module's `card_data` when present, otherwise the module data
/// itself.
///
/// # Errors
///
/// Returns `TranslateError::ModuleMissing` if the record has neither an
/// `integration/a2a` nor a `runtime/a2a` module.
pub fn record_to_a2a(record: &Document) -> Result<Document, TranslateError> {
    let module = find_module(record, A2A_MODULE_NAMES)?;
    match module.data.get("card_data") {
        Some(card @ Value::Object(_)) => Ok(card.clone()),
        _ => {
            debug!(module = module.name, "no card_data; returning module data");
            Ok(module.data.clone())
        }
    }
}

/// Build a 0.8.0 OASF record from `{"a2aCard": {...}}`.
///
/// # Errors
///
/// Returns `TranslateError::InvalidRequest` if the payload has no `a2aCard`
/// object.
pub fn a2a_to_record(payload: &Document) -> Result<Document, TranslateError> {
    let card = require_object(payload, "a2aCard")?;

    let name = str_or(card, "name", DEFAULT_NAME);
    let description = str_or(card, "description", DEFAULT_DESCRIPTION);
    let version = str_or(card, "version", DEFAULT_VERSION);
    let author = card
        .get("provider")
        .and_then(Value::as_object)
        .and_then(|provider| first_str(provider, &["organization"]))
        .unwrap_or(DEFAULT_AUTHOR);
    let protocol_version =
        first_str(card, &["protocolVersion", "protocol_version"]).unwrap_or(DEFAULT_VERSION);

    let mut record = json!({
        "name": name,
        "version": version,
        "description": description,
        "authors": [author],
        "created_at": now_rfc3339(),
        "schema_version": SchemaVersion::V1Alpha2.as_str(),
        "skills": [{"id": PLACEHOLDER_SKILL.0, "name": PLACEHOLDER_SKILL.1}],
        "domains": [{"id": PLACEHOLDER_DOMAIN.0, "name": PLACEHOLDER_DOMAIN.1}],
        "locators": [],
        "modules": [{
            "name": A2A_MODULE,
            "data": {
                "card_data": Value::Object(card.clone()),
                "protocol_version": protocol_version,
                "capabilities": ["streaming"],
                "input_modes": ["text/plain", "application/json"],
                "output_modes": ["text/html", "application/json"],
                "security_schemes": ["none"],
                "transports": ["http"]
            }
        }]
    });

    let annotations = a2a_annotations(card);
    if !annotations.is_empty() {
        record["annotations"] = Value::Object(annotations);
    }
    Ok(record)
}

/// Flatten card fields OASF can't hold natively into string annotations.
///
/// camelCase and snake_case spellings are both read; the first non-empty
/// one wins. Booleans become `"true"`/`"false"` and list entries are
/// indexed (`a2a.interface.0.url`).
pub fn a2a_annotations(card: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    let mut put = |key: String, value: Option<String>| {
        if let Some(value) = value {
            out.insert(key, Value::String(value));
        }
    };

    put("a2a.url".into(), first_str(card, &["url"]).map(str::to_string));

    let interfaces = first_value(card, &["supportedInterfaces", "supported_interfaces"]);
    for (i, iface) in objects(interfaces).enumerate() {
        put(
            format!("a2a.interface.{i}.url"),
            first_str(iface, &["url"]).map(str::to_string),
        );
        put(
            format!("a2a.interface.{i}.protocol_binding"),
            first_str(iface, &["protocolBinding", "protocol_binding", "transport"])
                .map(str::to_string),
        );
    }

    let provider = card.get("provider").and_then(Value::as_object);
    if let Some(provider) = provider {
        put(
            "a2a.provider.url".into(),
            first_str(provider, &["url"]).map(str::to_string),
        );
        put(
            "a2a.provider.organization".into(),
            first_str(provider, &["organization"]).map(str::to_string),
        );
    }

    // Extensions live under `capabilities` in current cards; older cards
    // hung them off the provider.
    let extensions = card
        .get("capabilities")
        .and_then(Value::as_object)
        .and_then(|caps| first_value(caps, &["extensions"]))
        .or_else(|| provider.and_then(|p| first_value(p, &["extensions", "extension"])));
    for (i, ext) in objects(extensions).enumerate() {
        for field in ["uri", "description", "required"] {
            put(
                format!("a2a.provider.extension.{i}.{field}"),
                ext.get(field).and_then(scalar_string),
            );
        }
    }

    put(
        "a2a.documentation_url".into(),
        first_str(card, &["documentationUrl", "documentation_url"]).map(str::to_string),
    );
    put(
        "a2a.icon_url".into(),
        first_str(card, &["iconUrl", "icon_url"]).map(str::to_string),
    );
    put(
        "a2a.supports_authenticated_extended_card".into(),
        first_value(
            card,
            &[
                "supportsAuthenticatedExtendedCard",
                "supports_authenticated_extended_card",
            ],
        )
        .and_then(scalar_string),
    );

    out
}

/// String form of a scalar; empty strings and non-scalars give `None`.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
