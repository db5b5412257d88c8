use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Typed record data, keyed by field name. Numeric fields hold JSON numbers.
pub type Rdata = BTreeMap<String, serde_json::Value>;

/// Region name to the territories it covers.
pub type Regions = BTreeMap<String, BTreeSet<String>>;

/// A value computed on demand, so that rotated credentials or endpoints are
/// observed on the next call.
pub type Supplier<T> = Arc<dyn Fn() -> T + Send + Sync>;

pub const RECORD_KIND_A: &str = "A";
pub const RECORD_KIND_AAAA: &str = "AAAA";
pub const RECORD_KIND_CNAME: &str = "CNAME";
pub const RECORD_KIND_SOA: &str = "SOA";

pub const PROFILE_GEO: &str = "geo";
pub const PROFILE_ROUND_ROBIN: &str = "roundRobin";

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Geo {
    pub regions: Regions,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
#[non_exhaustive]
pub enum Profile {
    Geo(Geo),
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResourceRecordSet {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    pub records: Vec<Rdata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
}

impl ResourceRecordSet {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            qualifier: None,
            ttl: None,
            records: Vec::new(),
            profile: None,
        }
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    pub fn with_record(mut self, rdata: Rdata) -> Self {
        self.records.push(rdata);
        self
    }

    pub fn with_geo(mut self, regions: Regions) -> Self {
        self.profile = Some(Profile::Geo(Geo { regions }));
        self
    }

    pub fn geo(&self) -> Option<&Geo> {
        match &self.profile {
            Some(Profile::Geo(geo)) => Some(geo),
            None => None,
        }
    }

    /// Two sets describe the same slot in a zone.
    pub fn matches(&self, other: &Self) -> bool {
        self.name == other.name && self.kind == other.kind && self.qualifier == other.qualifier
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub ttl: u32,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
}

/// Credential parameters in the order the provider lists them.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Credentials(BTreeMap<String, String>);

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Builds credentials from positional values, named after the parameters
    /// of the first credential type that has the same arity.
    pub fn from_list(
        descriptor: &super::ProviderDescriptor,
        values: Vec<String>,
    ) -> super::Result<Self> {
        let params = descriptor
            .credential_types
            .values()
            .find(|params| params.len() == values.len())
            .ok_or_else(|| {
                super::InvalidInputSnafu {
                    message: format!(
                        "{} expects credentials of one of {:?}",
                        descriptor.name, descriptor.credential_types
                    ),
                }
                .build()
            })?;
        Ok(Self(params.iter().cloned().zip(values).collect()))
    }

    /// Succeeds when every parameter of at least one credential type is set
    /// and non-empty.
    pub fn validate(&self, descriptor: &super::ProviderDescriptor) -> super::Result<()> {
        let complete = descriptor.credential_types.values().any(|params| {
            params
                .iter()
                .all(|param| self.get(param).is_some_and(|value| !value.is_empty()))
        });
        if complete {
            return Ok(());
        }
        super::InvalidInputSnafu {
            message: format!(
                "incomplete credentials for {}; expected one of {:?}",
                descriptor.name, descriptor.credential_types
            ),
        }
        .fail()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.keys().map(|key| (key, "***")))
            .finish()
    }
}
