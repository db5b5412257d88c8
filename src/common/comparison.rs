use super::{Rdata, ResourceRecordSet};

/// An existing remote record that can be compared against desired rdata.
pub(crate) trait Existing {
    fn rdata(&self) -> &Rdata;
    fn ttl(&self) -> u32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SyncMode {
    /// Only add records and fix ttls; leave extra records alone.
    Merge,
    /// Converge to exactly the desired records.
    Exact,
}

#[derive(Debug)]
pub(crate) struct DiffResult<R, C = Rdata> {
    pub create: Vec<C>,
    pub update: Vec<R>,
    pub unchanged: Vec<R>,
    pub delete: Vec<R>,
}

impl<R, C> DiffResult<R, C> {
    /// Number of remote writes this diff implies.
    pub fn len(&self) -> usize {
        self.create.len() + self.update.len() + self.delete.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pairs each existing record with at most one desired rdata. Matched records
/// whose ttl differs from `ttl` land in `update`, unmatched desired rdata in
/// `create`, unmatched existing records in `delete` (only in `Exact` mode).
pub(crate) fn diff_rdata<R: Existing>(
    current: Vec<R>,
    desired: &[Rdata],
    ttl: u32,
    mode: SyncMode,
) -> DiffResult<R> {
    let mut left_to_create: Vec<&Rdata> = Vec::with_capacity(desired.len());
    for rdata in desired {
        if !left_to_create.contains(&rdata) {
            left_to_create.push(rdata);
        }
    }

    let mut update: Vec<R> = Vec::new();
    let mut unchanged: Vec<R> = Vec::new();
    let mut delete: Vec<R> = Vec::new();

    for existing in current {
        match left_to_create.iter().position(|&r| r == existing.rdata()) {
            Some(index) => {
                left_to_create.remove(index);
                if existing.ttl() != ttl {
                    update.push(existing);
                } else {
                    unchanged.push(existing);
                }
            }
            None if mode == SyncMode::Exact => delete.push(existing),
            None => {}
        }
    }

    DiffResult {
        create: left_to_create.into_iter().cloned().collect(),
        update,
        unchanged,
        delete,
    }
}

/// Set-level comparison used when syncing a whole zone. Sets are matched by
/// name, type and qualifier; `delete` is only filled when `prune` is set.
pub(crate) fn diff_record_sets(
    current: Vec<ResourceRecordSet>,
    authority: Vec<ResourceRecordSet>,
    prune: bool,
) -> DiffResult<ResourceRecordSet, ResourceRecordSet> {
    let mut create: Vec<ResourceRecordSet> = Vec::with_capacity(authority.len());
    let mut update: Vec<ResourceRecordSet> = Vec::with_capacity(authority.len());
    let mut unchanged: Vec<ResourceRecordSet> = Vec::new();
    let mut delete: Vec<ResourceRecordSet> = Vec::with_capacity(current.len());

    authority.iter().for_each(|rrset| {
        match current.iter().find(|r| r.matches(rrset)) {
            Some(existing) => {
                // Only update if content differs
                if same_content(existing, rrset) {
                    unchanged.push(rrset.to_owned());
                } else {
                    update.push(rrset.to_owned());
                }
            }
            None => create.push(rrset.to_owned()),
        }
    });

    if prune {
        current
            .into_iter()
            // SOA belongs to the zone itself
            .filter(|rrset| rrset.kind != super::RECORD_KIND_SOA)
            .for_each(|rrset| {
                if !authority.iter().any(|r| r.matches(&rrset)) {
                    delete.push(rrset);
                }
            });
    }

    DiffResult {
        create,
        update,
        unchanged,
        delete,
    }
}

fn same_content(existing: &ResourceRecordSet, desired: &ResourceRecordSet) -> bool {
    let same_ttl = desired.ttl.is_none() || desired.ttl == existing.ttl;
    let same_profile = desired.profile.is_none() || desired.profile == existing.profile;
    let same_records = existing.records.len() == desired.records.len()
        && desired.records.iter().all(|r| existing.records.contains(r));
    same_ttl && same_profile && same_records
}
