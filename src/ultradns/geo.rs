use snafu::OptionExt;

use super::codec;
use super::grouping::{DirectionalSkipMode, GroupGeoByNameTypeAndGroup};
use super::models::{Decoded, DirectionalGroup, DirectionalWireRecord, NameAndType, WireRecord};
use super::rrsets::DEFAULT_TTL;
use super::transport::{UltraDns, ALL_TYPES};
use crate::common::{
    diff_rdata, GeoResourceRecordSetApi, InvalidInputSnafu, OkIfNotFound, ProviderDescriptor,
    RecordSets, Regions, ResourceRecordSet, ResponseSnafu, Result, SyncMode, PROFILE_GEO,
    RECORD_KIND_A, RECORD_KIND_AAAA, RECORD_KIND_CNAME,
};

/// Directional pools are addressed by record type, and a CNAME may sit in
/// either address pool. Reads for CNAME therefore cover both.
fn channels(kind: &str) -> Vec<u16> {
    if kind == RECORD_KIND_CNAME {
        return [RECORD_KIND_A, RECORD_KIND_AAAA]
            .iter()
            .filter_map(|k| codec::type_code(k))
            .collect();
    }
    codec::type_code(kind).into_iter().collect()
}

/// Pool type used when a new directional pool is needed for `kind`.
fn pool_kind(kind: &str) -> &str {
    if kind == RECORD_KIND_CNAME {
        RECORD_KIND_A
    } else {
        kind
    }
}

/// Record sets answered by requester territory, one per qualifier
/// (the directional group name).
pub struct UltraDnsGeoResourceRecordSets<'a> {
    api: &'a dyn UltraDns,
    descriptor: &'a ProviderDescriptor,
    zone_name: String,
    skip_mode: DirectionalSkipMode,
}

impl<'a> UltraDnsGeoResourceRecordSets<'a> {
    pub fn new(
        api: &'a dyn UltraDns,
        descriptor: &'a ProviderDescriptor,
        zone_name: &str,
        skip_mode: DirectionalSkipMode,
    ) -> Self {
        Self {
            api,
            descriptor,
            zone_name: zone_name.to_string(),
            skip_mode,
        }
    }

    fn records_for_host(&self, name: &str, type_code: u16) -> Result<Vec<DirectionalWireRecord>> {
        Ok(self
            .api
            .get_directional_dns_records_for_host(&self.zone_name, name, type_code)
            .ok_if_not_found()?
            .unwrap_or_default())
    }

    fn records_by_name_and_type(&self, name: &str, kind: &str) -> Result<Vec<DirectionalWireRecord>> {
        let Some(type_code) = codec::type_code(kind) else {
            return Ok(Vec::new());
        };
        let mut records = Vec::new();
        for channel in channels(kind) {
            records.extend(self.records_for_host(name, channel)?);
        }
        records.retain(|r| r.record.type_code == type_code);
        Ok(records)
    }

    fn records_by_name_type_and_qualifier(
        &self,
        name: &str,
        kind: &str,
        qualifier: &str,
    ) -> Result<Vec<DirectionalWireRecord>> {
        let mut records = self.records_by_name_and_type(name, kind)?;
        records.retain(|r| !r.no_response && r.group_name.as_deref() == Some(qualifier));
        Ok(records)
    }

    fn group(&self, records: Vec<DirectionalWireRecord>) -> RecordSets<'a> {
        let api = self.api;
        Box::new(GroupGeoByNameTypeAndGroup::new(
            records,
            self.skip_mode,
            move |group_id: &str| api.get_directional_dns_group_details(group_id),
        ))
    }

    fn validate(&self, rrset: &ResourceRecordSet) -> Result<()> {
        let qualifier = rrset.qualifier.as_deref().with_context(|| InvalidInputSnafu {
            message: format!("no qualifier on {} {}", rrset.name, rrset.kind),
        })?;
        if rrset.geo().is_none() {
            return InvalidInputSnafu {
                message: format!("no geo profile on {} {} {qualifier}", rrset.name, rrset.kind),
            }
            .fail();
        }
        if !self.descriptor.profile_supports(PROFILE_GEO, &rrset.kind) {
            return InvalidInputSnafu {
                message: format!(
                    "{} does not support geo {} records",
                    self.descriptor.name, rrset.kind
                ),
            }
            .fail();
        }
        if rrset.records.is_empty() {
            return InvalidInputSnafu {
                message: format!("{} {} {qualifier} has no records", rrset.name, rrset.kind),
            }
            .fail();
        }
        for rdata in &rrset.records {
            codec::encode(&rrset.kind, rdata)?;
        }
        Ok(())
    }

    /// Creates the directional pool, or finds the one already there.
    fn reuse_or_create_pool(&self, name: &str, kind: &str) -> Result<String> {
        let kind = pool_kind(kind);
        match self.api.add_directional_pool(&self.zone_name, name, kind) {
            Ok(pool_id) => {
                tracing::info!(zone = self.zone_name, name, kind, pool_id, "Created directional pool");
                Ok(pool_id)
            }
            Err(err) if err.is_conflict() => {
                let pools = self.api.get_directional_pools_of_zone(&self.zone_name)?;
                pools
                    .get(&NameAndType::new(name, kind))
                    .cloned()
                    .with_context(|| ResponseSnafu {
                        message: format!("directional pool for {name} {kind} exists but was not listed"),
                    })
            }
            Err(err) => Err(err),
        }
    }

    fn regions_differ(&self, record: &DirectionalWireRecord, regions: &Regions) -> Result<bool> {
        let Some(group_id) = &record.group_id else {
            return Ok(true);
        };
        let current = self
            .api
            .get_directional_dns_group_details(group_id)
            .ok_if_not_found()?;
        Ok(current.map_or(true, |group| &group.regions != regions))
    }
}

impl GeoResourceRecordSetApi for UltraDnsGeoResourceRecordSets<'_> {
    fn supported_regions(&self) -> Result<Regions> {
        self.api.get_available_regions()
    }

    fn iterate(&self) -> Result<RecordSets<'_>> {
        let pools = self
            .api
            .get_directional_pools_of_zone(&self.zone_name)
            .ok_if_not_found()?
            .unwrap_or_default();
        let mut records = Vec::new();
        for pool in pools.keys() {
            if let Some(type_code) = codec::type_code(&pool.kind) {
                records.extend(self.records_for_host(&pool.name, type_code)?);
            }
        }
        Ok(self.group(records))
    }

    fn iterate_by_name(&self, name: &str) -> Result<RecordSets<'_>> {
        Ok(self.group(self.records_for_host(name, ALL_TYPES)?))
    }

    fn iterate_by_name_and_type(&self, name: &str, kind: &str) -> Result<RecordSets<'_>> {
        Ok(self.group(self.records_by_name_and_type(name, kind)?))
    }

    fn get_by_name_type_and_qualifier(
        &self,
        name: &str,
        kind: &str,
        qualifier: &str,
    ) -> Result<Option<ResourceRecordSet>> {
        let records = self.records_by_name_type_and_qualifier(name, kind, qualifier)?;
        self.group(records).next().transpose()
    }

    fn put(&self, rrset: &ResourceRecordSet) -> Result<()> {
        self.validate(rrset)?;
        let qualifier = rrset.qualifier.clone().unwrap_or_default();
        let regions = rrset
            .geo()
            .map(|geo| geo.regions.clone())
            .unwrap_or_default();
        let desired_group = DirectionalGroup {
            name: qualifier.clone(),
            regions: regions.clone(),
        };

        let existing: Vec<Decoded<DirectionalWireRecord>> = self
            .records_by_name_type_and_qualifier(&rrset.name, &rrset.kind, &qualifier)?
            .into_iter()
            .map(|wire| {
                let (_, rdata) = codec::decode(wire.record.type_code, &wire.record.rdata)?;
                Ok(Decoded { wire, rdata })
            })
            .collect::<Result<_>>()?;
        let ttl = rrset
            .ttl
            .or_else(|| existing.first().map(|r| r.wire.record.ttl))
            .unwrap_or(DEFAULT_TTL);

        let diff = diff_rdata(existing, &rrset.records, ttl, SyncMode::Exact);

        for record in &diff.delete {
            let record_id = &record.wire.record.guid;
            if self
                .api
                .delete_directional_pool_record(record_id)
                .ok_if_not_found()?
                .is_some()
            {
                tracing::info!(zone = self.zone_name, name = rrset.name, qualifier, record_id, "Deleted directional record");
            }
        }

        for record in diff.update {
            let mut wire = record.wire;
            wire.record.ttl = ttl;
            self.api.update_directional_pool_record(&wire, &desired_group)?;
            tracing::info!(
                zone = self.zone_name,
                name = rrset.name,
                qualifier,
                record_id = wire.record.guid,
                ttl,
                "Updated directional record"
            );
        }

        // The group is re-read per record: updating one record may already
        // have converged the group it shares with the next.
        for record in diff.unchanged {
            if !self.regions_differ(&record.wire, &regions)? {
                continue;
            }
            self.api
                .update_directional_pool_record(&record.wire, &desired_group)?;
            tracing::info!(
                zone = self.zone_name,
                name = rrset.name,
                qualifier,
                record_id = record.wire.record.guid,
                "Updated directional group regions"
            );
        }

        if diff.create.is_empty() {
            return Ok(());
        }
        let pool_id = self.reuse_or_create_pool(&rrset.name, &rrset.kind)?;
        for rdata in &diff.create {
            let (type_code, fields) = codec::encode(&rrset.kind, rdata)?;
            let record = WireRecord::new(&rrset.name, type_code, ttl, fields);
            let record_id = self
                .api
                .add_directional_pool_record(&pool_id, &record, &desired_group)?;
            tracing::info!(
                zone = self.zone_name,
                name = rrset.name,
                qualifier,
                pool_id,
                record_id,
                "Created directional record"
            );
        }
        Ok(())
    }

    fn delete_by_name_type_and_qualifier(
        &self,
        name: &str,
        kind: &str,
        qualifier: &str,
    ) -> Result<()> {
        for record in self.records_by_name_type_and_qualifier(name, kind, qualifier)? {
            let record_id = &record.record.guid;
            match self
                .api
                .delete_directional_pool_record(record_id)
                .ok_if_not_found()?
            {
                Some(()) => {
                    tracing::info!(zone = self.zone_name, name, qualifier, record_id, "Deleted directional record")
                }
                None => {
                    tracing::warn!(zone = self.zone_name, name, qualifier, record_id, "Directional record already deleted")
                }
            }
        }
        Ok(())
    }
}
