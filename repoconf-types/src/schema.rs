use serde::{Deserialize, Serialize};

/// The verified identity of one schema: the exact bytes last accepted for a name and version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaLock {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,

    pub version: String,

    /// Lowercase hex SHA-256 of the schema bytes.
    pub hash: String,
}

/// A schema fetched during this run, paired with its lock identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadedSchema {
    pub lock: SchemaLock,

    #[serde(skip)]
    pub data: Vec<u8>,
}

impl LoadedSchema {
    pub fn name(&self) -> &str {
        &self.lock.name
    }

    pub fn version(&self) -> &str {
        &self.lock.version
    }
}
