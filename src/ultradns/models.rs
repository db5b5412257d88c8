use chrono::{DateTime, Utc};

use crate::common::{Existing, Rdata, Regions};

/// A resource record as the backend returns it: a numeric type and the raw
/// `InfoNValue` fields in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRecord {
    pub name: String,
    pub type_code: u16,
    pub ttl: u32,
    pub created: Option<DateTime<Utc>>,
    pub rdata: Vec<String>,
    pub guid: String,
    pub pool_id: Option<String>,
}

impl WireRecord {
    pub fn new(name: impl Into<String>, type_code: u16, ttl: u32, rdata: Vec<String>) -> Self {
        Self {
            name: name.into(),
            type_code,
            ttl,
            created: None,
            rdata,
            guid: String::new(),
            pool_id: None,
        }
    }
}

/// A record inside a directional pool. `guid` holds the directional pool
/// record id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectionalWireRecord {
    pub record: WireRecord,
    pub group_id: Option<String>,
    pub group_name: Option<String>,
    pub no_response: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectionalGroup {
    pub name: String,
    pub regions: Regions,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NameAndType {
    pub name: String,
    pub kind: String,
}

impl NameAndType {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneInfo {
    pub name: String,
    pub account_id: Option<String>,
}

/// A wire record paired with its decoded rdata, so diffs compare canonical
/// values while writes keep the backend identifiers.
#[derive(Debug, Clone)]
pub(super) struct Decoded<W> {
    pub wire: W,
    pub rdata: Rdata,
}

impl Existing for Decoded<WireRecord> {
    fn rdata(&self) -> &Rdata {
        &self.rdata
    }

    fn ttl(&self) -> u32 {
        self.wire.ttl
    }
}

impl Existing for Decoded<DirectionalWireRecord> {
    fn rdata(&self) -> &Rdata {
        &self.rdata
    }

    fn ttl(&self) -> u32 {
        self.wire.record.ttl
    }
}
