use std::collections::{BTreeMap, BTreeSet};

use super::{InvalidInputSnafu, Regions, ResourceRecordSet, Result, Zone};

/// Lazily produced record sets. Each value is computed from remote state
/// fetched for this call only.
pub type RecordSets<'a> = Box<dyn Iterator<Item = Result<ResourceRecordSet>> + 'a>;

/// How a provider identifies zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneIdentification {
    /// The zone name is its id.
    Name,
    /// The provider assigns an opaque id.
    Opaque,
    /// Several zones may share a name and are told apart by a qualifier.
    Qualified,
}

/// Read-only facts about a provider, consulted instead of hard-coding them.
#[derive(Debug, Clone)]
pub struct ProviderDescriptor {
    pub name: String,
    pub default_url: String,
    pub zone_identification: ZoneIdentification,
    pub basic_record_types: BTreeSet<String>,
    pub profile_to_record_types: BTreeMap<String, BTreeSet<String>>,
    /// Credential type name to its ordered parameter names.
    pub credential_types: BTreeMap<String, Vec<String>>,
}

impl ProviderDescriptor {
    pub fn supports_profile(&self, profile: &str) -> bool {
        self.profile_to_record_types.contains_key(profile)
    }

    pub fn profile_supports(&self, profile: &str, kind: &str) -> bool {
        self.profile_to_record_types
            .get(profile)
            .is_some_and(|kinds| kinds.contains(kind))
    }
}

pub trait ZoneApi {
    fn iterate(&self) -> Result<Vec<Zone>>;
    fn iterate_by_name(&self, name: &str) -> Result<Vec<Zone>>;
    /// Creates the zone if needed and converges its ttl and email. Returns the id.
    fn put(&self, zone: &Zone) -> Result<String>;
    /// Deleting an absent zone is a no-op.
    fn delete(&self, id: &str) -> Result<()>;
}

/// Record sets without a qualifier.
pub trait ResourceRecordSetApi {
    fn iterate(&self) -> Result<RecordSets<'_>>;
    fn iterate_by_name(&self, name: &str) -> Result<RecordSets<'_>>;
    fn get_by_name_and_type(&self, name: &str, kind: &str) -> Result<Option<ResourceRecordSet>>;
    /// Adds missing records and corrects the ttl of present ones. Never deletes.
    fn add(&self, rrset: &ResourceRecordSet) -> Result<()>;
    /// Converges the remote set to exactly `rrset`.
    fn put(&self, rrset: &ResourceRecordSet) -> Result<()>;
    /// Deletes only the records listed in `rrset`.
    fn remove(&self, rrset: &ResourceRecordSet) -> Result<()>;
    fn apply_ttl_to_name_and_type(&self, ttl: u32, name: &str, kind: &str) -> Result<()>;
    fn delete_by_name_and_type(&self, name: &str, kind: &str) -> Result<()>;
}

/// Record sets routed by requester territory, one per qualifier.
pub trait GeoResourceRecordSetApi {
    fn supported_regions(&self) -> Result<Regions>;
    fn iterate(&self) -> Result<RecordSets<'_>>;
    fn iterate_by_name(&self, name: &str) -> Result<RecordSets<'_>>;
    fn iterate_by_name_and_type(&self, name: &str, kind: &str) -> Result<RecordSets<'_>>;
    fn get_by_name_type_and_qualifier(
        &self,
        name: &str,
        kind: &str,
        qualifier: &str,
    ) -> Result<Option<ResourceRecordSet>>;
    fn put(&self, rrset: &ResourceRecordSet) -> Result<()>;
    fn delete_by_name_type_and_qualifier(
        &self,
        name: &str,
        kind: &str,
        qualifier: &str,
    ) -> Result<()>;
}

/// Record sets answered in proportion to a weight, one per qualifier.
pub trait WeightedResourceRecordSetApi {
    fn supported_weights(&self) -> Vec<u32>;
    fn iterate_by_name(&self, name: &str) -> Result<RecordSets<'_>>;
    fn get_by_name_type_and_qualifier(
        &self,
        name: &str,
        kind: &str,
        qualifier: &str,
    ) -> Result<Option<ResourceRecordSet>>;
    fn put(&self, rrset: &ResourceRecordSet) -> Result<()>;
    fn delete_by_name_type_and_qualifier(
        &self,
        name: &str,
        kind: &str,
        qualifier: &str,
    ) -> Result<()>;
}

/// One provider account. Optional surfaces are `None` when the provider
/// lacks the profile.
pub trait DnsApi {
    fn provider(&self) -> &ProviderDescriptor;
    fn zones(&self) -> Box<dyn ZoneApi + '_>;
    fn basic_record_sets(&self, zone_id: &str) -> Box<dyn ResourceRecordSetApi + '_>;
    fn geo_record_sets(&self, zone_id: &str) -> Option<Box<dyn GeoResourceRecordSetApi + '_>>;

    fn weighted_record_sets(
        &self,
        _zone_id: &str,
    ) -> Option<Box<dyn WeightedResourceRecordSetApi + '_>> {
        None
    }

    fn all_profile_record_sets(&self, zone_id: &str) -> AllProfileResourceRecordSets<'_> {
        AllProfileResourceRecordSets {
            basic: self.basic_record_sets(zone_id),
            geo: self.geo_record_sets(zone_id),
        }
    }
}

/// Basic and qualified record sets of a zone behind one surface.
pub struct AllProfileResourceRecordSets<'a> {
    basic: Box<dyn ResourceRecordSetApi + 'a>,
    geo: Option<Box<dyn GeoResourceRecordSetApi + 'a>>,
}

impl<'a> AllProfileResourceRecordSets<'a> {
    pub fn new(
        basic: Box<dyn ResourceRecordSetApi + 'a>,
        geo: Option<Box<dyn GeoResourceRecordSetApi + 'a>>,
    ) -> Self {
        Self { basic, geo }
    }

    pub fn iterate(&self) -> Result<RecordSets<'_>> {
        let basic = self.basic.iterate()?;
        Ok(match &self.geo {
            Some(geo) => Box::new(basic.chain(geo.iterate()?)),
            None => basic,
        })
    }

    pub fn iterate_by_name(&self, name: &str) -> Result<RecordSets<'_>> {
        let basic = self.basic.iterate_by_name(name)?;
        Ok(match &self.geo {
            Some(geo) => Box::new(basic.chain(geo.iterate_by_name(name)?)),
            None => basic,
        })
    }

    pub fn iterate_by_name_and_type(&self, name: &str, kind: &str) -> Result<RecordSets<'_>> {
        let basic = self.basic.get_by_name_and_type(name, kind)?.map(Ok);
        Ok(match &self.geo {
            Some(geo) => Box::new(basic.into_iter().chain(geo.iterate_by_name_and_type(name, kind)?)),
            None => Box::new(basic.into_iter()),
        })
    }

    pub fn get_by_name_type_and_qualifier(
        &self,
        name: &str,
        kind: &str,
        qualifier: Option<&str>,
    ) -> Result<Option<ResourceRecordSet>> {
        match (qualifier, &self.geo) {
            (None, _) => self.basic.get_by_name_and_type(name, kind),
            (Some(qualifier), Some(geo)) => {
                geo.get_by_name_type_and_qualifier(name, kind, qualifier)
            }
            (Some(_), None) => Ok(None),
        }
    }

    pub fn put(&self, rrset: &ResourceRecordSet) -> Result<()> {
        if rrset.qualifier.is_none() {
            return self.basic.put(rrset);
        }
        match &self.geo {
            Some(geo) => geo.put(rrset),
            None => InvalidInputSnafu {
                message: format!(
                    "qualified record sets are not supported here: {} {}",
                    rrset.name, rrset.kind
                ),
            }
            .fail(),
        }
    }

    pub fn delete_by_name_type_and_qualifier(
        &self,
        name: &str,
        kind: &str,
        qualifier: Option<&str>,
    ) -> Result<()> {
        match (qualifier, &self.geo) {
            (None, _) => self.basic.delete_by_name_and_type(name, kind),
            (Some(qualifier), Some(geo)) => {
                geo.delete_by_name_type_and_qualifier(name, kind, qualifier)
            }
            (Some(_), None) => Ok(()),
        }
    }
}
