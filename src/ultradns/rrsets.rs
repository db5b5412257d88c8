use super::codec;
use super::grouping::{sort_wire_records, GroupByNameAndType};
use super::models::{Decoded, WireRecord};
use super::pools::RoundRobinPools;
use super::transport::{UltraDns, ALL_TYPES};
use crate::common::{
    diff_rdata, InvalidInputSnafu, OkIfNotFound, ProviderDescriptor, Rdata, RecordSets,
    ResourceRecordSet, ResourceRecordSetApi, Result, SyncMode,
};

/// Applied when neither the caller nor the existing records give a ttl.
pub const DEFAULT_TTL: u32 = 300;

/// Basic record sets of one zone.
pub struct UltraDnsResourceRecordSets<'a> {
    api: &'a dyn UltraDns,
    descriptor: &'a ProviderDescriptor,
    zone_name: String,
}

impl<'a> UltraDnsResourceRecordSets<'a> {
    pub fn new(api: &'a dyn UltraDns, descriptor: &'a ProviderDescriptor, zone_name: &str) -> Self {
        Self {
            api,
            descriptor,
            zone_name: zone_name.to_string(),
        }
    }

    fn pools(&self) -> RoundRobinPools<'_> {
        RoundRobinPools::new(self.api, &self.zone_name)
    }

    fn records_by_name_and_type(&self, name: &str, kind: &str) -> Result<Vec<Decoded<WireRecord>>> {
        let Some(type_code) = codec::type_code(kind) else {
            return Ok(Vec::new());
        };
        let mut records = self
            .api
            .get_resource_records_of_dname_by_type(&self.zone_name, name, type_code)
            .ok_if_not_found()?
            .unwrap_or_default();
        sort_wire_records(&mut records);

        records
            .into_iter()
            .map(|wire| {
                let (_, rdata) = codec::decode(wire.type_code, &wire.rdata)?;
                Ok(Decoded { wire, rdata })
            })
            .collect()
    }

    /// Rejects requests that cannot succeed, before any remote call.
    fn validate(&self, rrset: &ResourceRecordSet) -> Result<()> {
        if rrset.records.is_empty() {
            return InvalidInputSnafu {
                message: format!("{} {} has no records", rrset.name, rrset.kind),
            }
            .fail();
        }
        if let Some(qualifier) = &rrset.qualifier {
            return InvalidInputSnafu {
                message: format!(
                    "{} {} has qualifier {qualifier}; use a profile-specific api",
                    rrset.name, rrset.kind
                ),
            }
            .fail();
        }
        if !self.descriptor.basic_record_types.contains(&rrset.kind) {
            return InvalidInputSnafu {
                message: format!(
                    "{} does not support {} records",
                    self.descriptor.name, rrset.kind
                ),
            }
            .fail();
        }
        for rdata in &rrset.records {
            codec::encode(&rrset.kind, rdata)?;
        }
        Ok(())
    }

    fn reconcile(&self, rrset: &ResourceRecordSet, mode: SyncMode) -> Result<()> {
        self.validate(rrset)?;
        let existing = self.records_by_name_and_type(&rrset.name, &rrset.kind)?;
        let ttl = rrset
            .ttl
            .or_else(|| existing.first().map(|r| r.wire.ttl))
            .unwrap_or(DEFAULT_TTL);

        let diff = diff_rdata(existing, &rrset.records, ttl, mode);
        if diff.is_empty() {
            tracing::debug!(zone = self.zone_name, name = rrset.name, kind = rrset.kind, "No changes detected");
            return Ok(());
        }

        tracing::info!(
            zone = self.zone_name,
            name = rrset.name,
            kind = rrset.kind,
            create = diff.create.len(),
            update = diff.update.len(),
            delete = diff.delete.len(),
            "Applying changes",
        );

        // Deletes first - to avoid any key/unique errors.
        for record in &diff.delete {
            self.delete_record(&record.wire)?;
        }

        for record in diff.update {
            let mut wire = record.wire;
            wire.ttl = ttl;
            self.api.update_resource_record(&self.zone_name, &wire)?;
            tracing::info!(
                zone = self.zone_name,
                name = wire.name,
                kind = rrset.kind,
                record_id = wire.guid,
                ttl,
                "Updated record ttl"
            );
        }

        self.create(&rrset.name, &rrset.kind, ttl, &diff.create)
    }

    fn create(&self, name: &str, kind: &str, ttl: u32, rdata: &[Rdata]) -> Result<()> {
        if rdata.is_empty() {
            return Ok(());
        }
        if RoundRobinPools::is_pool_type(kind) {
            return self.pools().add(name, kind, ttl, rdata);
        }
        for entry in rdata {
            let (type_code, fields) = codec::encode(kind, entry)?;
            let record = WireRecord::new(name, type_code, ttl, fields);
            let guid = self.api.create_resource_record(&self.zone_name, &record)?;
            tracing::info!(zone = self.zone_name, name, kind, record_id = guid, "Created record");
        }
        Ok(())
    }

    fn delete_record(&self, record: &WireRecord) -> Result<()> {
        match self.api.delete_resource_record(&record.guid).ok_if_not_found()? {
            Some(()) => tracing::info!(
                zone = self.zone_name,
                name = record.name,
                record_id = record.guid,
                "Deleted record"
            ),
            None => tracing::warn!(
                zone = self.zone_name,
                name = record.name,
                record_id = record.guid,
                "Record already deleted"
            ),
        }
        Ok(())
    }

    fn delete_pool_if_empty(&self, name: &str, kind: &str) -> Result<()> {
        if RoundRobinPools::is_pool_type(kind) {
            self.pools().delete_pool(name, kind)?;
        }
        Ok(())
    }

    fn group(mut records: Vec<WireRecord>) -> RecordSets<'static> {
        sort_wire_records(&mut records);
        Box::new(GroupByNameAndType::new(records.into_iter()))
    }
}

impl ResourceRecordSetApi for UltraDnsResourceRecordSets<'_> {
    fn iterate(&self) -> Result<RecordSets<'_>> {
        let records = self
            .api
            .get_resource_records_of_zone(&self.zone_name)
            .ok_if_not_found()?
            .unwrap_or_default();
        Ok(Self::group(records))
    }

    fn iterate_by_name(&self, name: &str) -> Result<RecordSets<'_>> {
        let records = self
            .api
            .get_resource_records_of_dname_by_type(&self.zone_name, name, ALL_TYPES)
            .ok_if_not_found()?
            .unwrap_or_default();
        Ok(Self::group(records))
    }

    fn get_by_name_and_type(&self, name: &str, kind: &str) -> Result<Option<ResourceRecordSet>> {
        let Some(type_code) = codec::type_code(kind) else {
            return Ok(None);
        };
        let records = self
            .api
            .get_resource_records_of_dname_by_type(&self.zone_name, name, type_code)
            .ok_if_not_found()?
            .unwrap_or_default();
        Self::group(records).next().transpose()
    }

    fn add(&self, rrset: &ResourceRecordSet) -> Result<()> {
        self.reconcile(rrset, SyncMode::Merge)
    }

    fn put(&self, rrset: &ResourceRecordSet) -> Result<()> {
        self.reconcile(rrset, SyncMode::Exact)
    }

    fn remove(&self, rrset: &ResourceRecordSet) -> Result<()> {
        let mut deleted = 0;
        for record in self.records_by_name_and_type(&rrset.name, &rrset.kind)? {
            if rrset.records.contains(&record.rdata) {
                self.delete_record(&record.wire)?;
                deleted += 1;
            }
        }
        if deleted > 0 {
            self.delete_pool_if_empty(&rrset.name, &rrset.kind)?;
        }
        Ok(())
    }

    fn apply_ttl_to_name_and_type(&self, ttl: u32, name: &str, kind: &str) -> Result<()> {
        for record in self.records_by_name_and_type(name, kind)? {
            if record.wire.ttl == ttl {
                continue;
            }
            let mut wire = record.wire;
            wire.ttl = ttl;
            self.api.update_resource_record(&self.zone_name, &wire)?;
            tracing::info!(
                zone = self.zone_name,
                name,
                kind,
                record_id = wire.guid,
                ttl,
                "Updated record ttl"
            );
        }
        Ok(())
    }

    fn delete_by_name_and_type(&self, name: &str, kind: &str) -> Result<()> {
        for record in self.records_by_name_and_type(name, kind)? {
            self.delete_record(&record.wire)?;
        }
        self.delete_pool_if_empty(name, kind)
    }
}
