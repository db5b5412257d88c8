//! Merging of flat, sorted wire records into record sets.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::iter::Peekable;

use super::codec;
use super::models::{DirectionalGroup, DirectionalWireRecord, WireRecord};
use crate::common::{
    Error, OkIfNotFound, Regions, ResourceRecordSet, Result, UnsupportedRecordSnafu,
};

/// Backend calls do not agree on record order, so records are sorted by name,
/// type and creation time, with the raw rdata as the final tie-break.
pub fn sort_wire_records(records: &mut [WireRecord]) {
    records.sort_by(compare_wire_records);
}

fn compare_wire_records(a: &WireRecord, b: &WireRecord) -> Ordering {
    a.name
        .cmp(&b.name)
        .then(a.type_code.cmp(&b.type_code))
        .then(a.created.cmp(&b.created))
        .then_with(|| a.rdata.cmp(&b.rdata))
}

fn decode_rdata(record: &WireRecord) -> Result<(String, crate::common::Rdata)> {
    codec::decode(record.type_code, &record.rdata)
}

/// Emits one record set per run of records sharing name and type. The input
/// must already be sorted; see [`sort_wire_records`].
pub struct GroupByNameAndType<I: Iterator<Item = WireRecord>> {
    records: Peekable<I>,
}

impl<I: Iterator<Item = WireRecord>> GroupByNameAndType<I> {
    pub fn new(records: I) -> Self {
        Self {
            records: records.peekable(),
        }
    }
}

impl<I: Iterator<Item = WireRecord>> Iterator for GroupByNameAndType<I> {
    type Item = Result<ResourceRecordSet>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.records.next()?;
        let (kind, rdata) = match decode_rdata(&first) {
            Ok(decoded) => decoded,
            Err(err) => return Some(Err(err)),
        };
        let mut rrset = ResourceRecordSet::new(first.name.clone(), kind)
            .with_ttl(first.ttl)
            .with_record(rdata);

        while let Some(next) = self
            .records
            .next_if(|r| r.name == first.name && r.type_code == first.type_code)
        {
            match decode_rdata(&next) {
                Ok((_, rdata)) => rrset.records.push(rdata),
                Err(err) => return Some(Err(err)),
            }
        }
        Some(Ok(rrset))
    }
}

/// What to do with directional records that have no portable form:
/// "no response" sentinels and records bound to source-IP groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionalSkipMode {
    #[default]
    Skip,
    Error,
}

fn is_portable(record: &DirectionalWireRecord) -> bool {
    !record.no_response && record.group_id.is_some()
}

fn compare_directional_records(a: &DirectionalWireRecord, b: &DirectionalWireRecord) -> Ordering {
    a.record
        .name
        .cmp(&b.record.name)
        .then(a.record.type_code.cmp(&b.record.type_code))
        .then(a.record.ttl.cmp(&b.record.ttl))
        .then(a.group_id.cmp(&b.group_id))
        .then_with(|| compare_wire_records(&a.record, &b.record))
}

/// Emits one record set per run of directional records sharing name, type,
/// ttl and group. The group's regions are loaded once per group id; the
/// cache lives and dies with this iterator.
pub struct GroupGeoByNameTypeAndGroup<F>
where
    F: FnMut(&str) -> Result<DirectionalGroup>,
{
    records: Peekable<std::vec::IntoIter<DirectionalWireRecord>>,
    load_group: F,
    regions_by_group: HashMap<String, Option<Regions>>,
    pending_error: Option<Error>,
}

impl<F> GroupGeoByNameTypeAndGroup<F>
where
    F: FnMut(&str) -> Result<DirectionalGroup>,
{
    pub fn new(
        mut records: Vec<DirectionalWireRecord>,
        skip_mode: DirectionalSkipMode,
        load_group: F,
    ) -> Self {
        let mut pending_error = None;
        match skip_mode {
            DirectionalSkipMode::Skip => records.retain(|record| {
                let portable = is_portable(record);
                if !portable {
                    tracing::debug!(
                        name = record.record.name,
                        record_id = record.record.guid,
                        no_response = record.no_response,
                        "Skipping directional record without a geographic group"
                    );
                }
                portable
            }),
            DirectionalSkipMode::Error => {
                if let Some(record) = records.iter().find(|r| !is_portable(r)) {
                    pending_error = Some(
                        UnsupportedRecordSnafu {
                            message: format!(
                                "directional record {} of {} has no geographic group",
                                record.record.guid, record.record.name
                            ),
                        }
                        .build(),
                    );
                    records.clear();
                }
            }
        }
        records.sort_by(compare_directional_records);

        Self {
            records: records.into_iter().peekable(),
            load_group,
            regions_by_group: HashMap::new(),
            pending_error,
        }
    }

    /// `None` when the group was removed after its records were listed.
    fn regions(&mut self, group_id: &str) -> Result<Option<Regions>> {
        if let Some(regions) = self.regions_by_group.get(group_id) {
            return Ok(regions.clone());
        }
        let regions = (self.load_group)(group_id)
            .ok_if_not_found()?
            .map(|group| group.regions);
        self.regions_by_group
            .insert(group_id.to_string(), regions.clone());
        Ok(regions)
    }

    fn next_group(&mut self) -> Option<Result<ResourceRecordSet>> {
        loop {
            let first = self.records.next()?;
            let (kind, rdata) = match decode_rdata(&first.record) {
                Ok(decoded) => decoded,
                Err(err) => return Some(Err(err)),
            };
            let group_id = first.group_id.clone().unwrap_or_default();
            let qualifier = first.group_name.clone().unwrap_or_else(|| group_id.clone());

            let mut rrset = ResourceRecordSet::new(first.record.name.clone(), kind)
                .with_qualifier(qualifier)
                .with_ttl(first.record.ttl)
                .with_record(rdata);

            while let Some(next) = self.records.next_if(|r| {
                r.record.name == first.record.name
                    && r.record.type_code == first.record.type_code
                    && r.record.ttl == first.record.ttl
                    && r.group_id == first.group_id
            }) {
                match decode_rdata(&next.record) {
                    Ok((_, rdata)) => rrset.records.push(rdata),
                    Err(err) => return Some(Err(err)),
                }
            }

            match self.regions(&group_id) {
                Ok(Some(regions)) => return Some(Ok(rrset.with_geo(regions))),
                Ok(None) => tracing::debug!(
                    name = rrset.name,
                    kind = rrset.kind,
                    group_id,
                    "Skipping record set whose group no longer exists"
                ),
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

impl<F> Iterator for GroupGeoByNameTypeAndGroup<F>
where
    F: FnMut(&str) -> Result<DirectionalGroup>,
{
    type Item = Result<ResourceRecordSet>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.pending_error.take() {
            return Some(Err(err));
        }
        self.next_group()
    }
}
