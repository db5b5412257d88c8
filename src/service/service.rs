use crate::common::{
    diff_record_sets, DnsApi, InvalidInputSnafu, ResourceRecordSet, Result,
};

use super::{SyncReport, Uuid};

/// Converges one zone to a list of desired record sets.
pub struct ZoneSync<'a> {
    api: &'a dyn DnsApi,
}

impl<'a> ZoneSync<'a> {
    pub fn new(api: &'a dyn DnsApi) -> Self {
        Self { api }
    }

    /// Record sets are matched by name, type and qualifier. Sets present
    /// remotely but absent from `desired` are only deleted when `prune` is set.
    pub fn sync(
        &self,
        zone: &str,
        desired: Vec<ResourceRecordSet>,
        dry_run: bool,
        prune: bool,
    ) -> Result<SyncReport> {
        let run_id = Uuid::new_v4();
        let Some(zone) = self.api.zones().iterate_by_name(zone)?.into_iter().next() else {
            return InvalidInputSnafu {
                message: format!("zone {zone} does not exist"),
            }
            .fail();
        };

        let rrsets = self.api.all_profile_record_sets(&zone.id);
        let current = rrsets.iterate()?.collect::<Result<Vec<_>>>()?;
        let diff = diff_record_sets(current, desired, prune);

        tracing::info!(
            run_id = %run_id,
            zone = zone.name,
            create = diff.create.len(),
            update = diff.update.len(),
            delete = diff.delete.len(),
            unchanged = diff.unchanged.len(),
            dry_run,
            "Computed changes"
        );

        let report = SyncReport {
            run_id,
            zone: zone.name.clone(),
            dry_run,
            created: diff.create.len(),
            updated: diff.update.len(),
            deleted: diff.delete.len(),
            unchanged: diff.unchanged.len(),
        };

        if dry_run {
            for rrset in &diff.create {
                tracing::info!(run_id = %run_id, name = rrset.name, kind = rrset.kind, qualifier = ?rrset.qualifier, "Would create");
            }
            for rrset in &diff.update {
                tracing::info!(run_id = %run_id, name = rrset.name, kind = rrset.kind, qualifier = ?rrset.qualifier, "Would update");
            }
            for rrset in &diff.delete {
                tracing::info!(run_id = %run_id, name = rrset.name, kind = rrset.kind, qualifier = ?rrset.qualifier, "Would delete");
            }
            return Ok(report);
        }

        // Deletes go first so a name can change type, e.g. A to CNAME.
        for rrset in &diff.delete {
            rrsets.delete_by_name_type_and_qualifier(
                &rrset.name,
                &rrset.kind,
                rrset.qualifier.as_deref(),
            )?;
        }
        for rrset in diff.create.iter().chain(diff.update.iter()) {
            rrsets.put(rrset)?;
        }

        tracing::info!(run_id = %run_id, zone = zone.name, changes = report.changes(), "Sync completed");
        Ok(report)
    }
}
