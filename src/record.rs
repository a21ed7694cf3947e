//! Typed record shapes, one per recognized schema version.
//!
//! The shapes are deliberately permissive: every field defaults, and
//! anything a shape doesn't name is kept in its `extra` map so that
//! decoding never drops data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{Module, SchemaVersion};

/// A skill reference (`{id, name}` in 0.7+, category/class names in 0.3.1).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A domain reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Where an agent's artifacts live.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Locator {
    #[serde(rename = "type", default)]
    pub locator_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 0.3.1 extension: the predecessor of modules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extension {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub data: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `v0.3.1` agent record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordV1Alpha0 {
    #[serde(default)]
    pub schema_version: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub locators: Vec<Locator>,
    #[serde(default)]
    pub extensions: Vec<Extension>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub annotations: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Module-based record shape shared by 0.7.0, 0.8.0 and 1.0.0-rc.1.
macro_rules! module_record {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            #[serde(default)]
            pub schema_version: String,
            #[serde(default)]
            pub name: String,
            #[serde(default)]
            pub version: String,
            #[serde(default)]
            pub description: String,
            #[serde(default)]
            pub authors: Vec<String>,
            #[serde(default)]
            pub created_at: String,
            #[serde(default)]
            pub skills: Vec<Skill>,
            #[serde(default)]
            pub domains: Vec<Domain>,
            #[serde(default)]
            pub locators: Vec<Locator>,
            #[serde(default)]
            pub modules: Vec<Module>,
            #[serde(default, skip_serializing_if = "Map::is_empty")]
            pub annotations: Map<String, Value>,
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub previous_record_cid: Option<String>,
            #[serde(flatten)]
            pub extra: Map<String, Value>,
        }

        impl $name {
            /// Find a module by exact name.
            pub fn module(&self, name: &str) -> Option<&Module> {
                self.modules.iter().find(|m| m.name == name)
            }
        }
    };
}

module_record!(
    /// `0.7.0` record.
    RecordV1Alpha1
);
module_record!(
    /// `0.8.0` record.
    RecordV1Alpha2
);
module_record!(
    /// `1.0.0-rc.1` record.
    RecordV1
);

/// A record decoded into the shape matching its `schema_version`.
///
/// Serializes externally tagged (`{"v1alpha2": {...}}`), so exactly one
/// variant is ever present on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodedRecord {
    V1Alpha0(RecordV1Alpha0),
    V1Alpha1(RecordV1Alpha1),
    V1Alpha2(RecordV1Alpha2),
    V1(RecordV1),
}

impl DecodedRecord {
    pub fn version(&self) -> SchemaVersion {
        match self {
            DecodedRecord::V1Alpha0(_) => SchemaVersion::V1Alpha0,
            DecodedRecord::V1Alpha1(_) => SchemaVersion::V1Alpha1,
            DecodedRecord::V1Alpha2(_) => SchemaVersion::V1Alpha2,
            DecodedRecord::V1(_) => SchemaVersion::V1,
        }
    }

    /// The `schema_version` string as it appeared in the input.
    pub fn schema_version(&self) -> &str {
        match self {
            DecodedRecord::V1Alpha0(r) => &r.schema_version,
            DecodedRecord::V1Alpha1(r) => &r.schema_version,
            DecodedRecord::V1Alpha2(r) => &r.schema_version,
            DecodedRecord::V1(r) => &r.schema_version,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            DecodedRecord::V1Alpha0(r) => &r.name,
            DecodedRecord::V1Alpha1(r) => &r.name,
            DecodedRecord::V1Alpha2(r) => &r.name,
            DecodedRecord::V1(r) => &r.name,
        }
    }

    pub fn as_v1alpha0(&self) -> Option<&RecordV1Alpha0> {
        match self {
            DecodedRecord::V1Alpha0(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_v1alpha1(&self) -> Option<&RecordV1Alpha1> {
        match self {
            DecodedRecord::V1Alpha1(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_v1alpha2(&self) -> Option<&RecordV1Alpha2> {
        match self {
            DecodedRecord::V1Alpha2(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_v1(&self) -> Option<&RecordV1> {
        match self {
            DecodedRecord::V1(r) => Some(r),
            _ => None,
        }
    }
}
