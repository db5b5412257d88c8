//! In-memory stand-in for the remote surface, used by tests. It keeps a log
//! of operation names and raises faults through the same classifier as the
//! SOAP client.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{TimeZone, Utc};

use super::codec;
use super::fault::{classify, FaultCode};
use super::models::{DirectionalGroup, DirectionalWireRecord, NameAndType, WireRecord, ZoneInfo};
use super::transport::{UltraDns, ALL_TYPES};
use crate::common::{Regions, Result};

pub(crate) const ACCOUNT_ID: &str = "AAAAAAAAAAAAAAAA";

const WRITES: &[&str] = &[
    "createPrimaryZone",
    "deleteZone",
    "createResourceRecord",
    "updateResourceRecord",
    "deleteResourceRecord",
    "addRRLBPool",
    "addRecordToRRPool",
    "deleteLBPool",
    "addDirectionalPool",
    "addDirectionalPoolRecord",
    "updateDirectionalPoolRecord",
    "deleteDirectionalPoolRecord",
];

#[derive(Clone)]
struct Pool {
    id: String,
    zone: String,
    name: String,
    kind: String,
}

struct StoredDirectional {
    pool_id: String,
    record: DirectionalWireRecord,
}

#[derive(Default)]
struct State {
    next_id: u64,
    zones: BTreeSet<String>,
    records: Vec<(String, WireRecord)>,
    rr_pools: Vec<Pool>,
    dir_pools: Vec<Pool>,
    dir_records: Vec<StoredDirectional>,
    groups: BTreeMap<String, (String, DirectionalGroup)>,
    calls: Vec<String>,
    failures: HashMap<String, u32>,
}

impl State {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{:016X}", self.next_id)
    }

    fn call(&mut self, op: &str) -> Result<()> {
        self.calls.push(op.to_string());
        match self.failures.remove(op) {
            Some(code) => Err(classify(code, format!("injected failure of {op}"))),
            None => Ok(()),
        }
    }

    fn require_zone(&self, zone: &str) -> Result<()> {
        if self.zones.contains(zone) {
            return Ok(());
        }
        Err(fault(FaultCode::ZoneNotFound, "Zone does not exist in the system."))
    }

    fn stamp(&mut self, mut record: WireRecord) -> WireRecord {
        if record.guid.is_empty() {
            record.guid = self.id("");
        }
        if record.created.is_none() {
            record.created = Utc.timestamp_opt(1_600_000_000 + self.next_id as i64, 0).single();
        }
        record
    }

    fn group_for(&mut self, pool_id: &str, group: &DirectionalGroup) -> String {
        let existing = self
            .groups
            .iter()
            .find(|(_, (pool, g))| pool == pool_id && g.name == group.name)
            .map(|(id, _)| id.clone());
        let id = existing.unwrap_or_else(|| self.id("G"));
        self.groups
            .insert(id.clone(), (pool_id.to_string(), group.clone()));
        id
    }
}

fn fault(code: FaultCode, description: &str) -> crate::common::Error {
    classify(code.code(), description)
}

pub(crate) struct FakeUltraDns {
    state: Mutex<State>,
}

impl FakeUltraDns {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    pub fn with_zone(zone: &str) -> Self {
        let fake = Self::new();
        fake.seed_zone(zone);
        fake
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn seed_zone(&self, zone: &str) {
        let mut state = self.state();
        state.zones.insert(zone.to_string());
        let soa = WireRecord::new(
            zone,
            6,
            86400,
            ["pdns1.ultradns.net.", "admin.example.com.", "2013022200", "86400", "86400", "86400", "86400"]
                .map(String::from)
                .to_vec(),
        );
        let soa = state.stamp(soa);
        state.records.push((zone.to_string(), soa));
    }

    pub fn seed_record(&self, zone: &str, record: WireRecord) -> String {
        let mut state = self.state();
        let record = state.stamp(record);
        let guid = record.guid.clone();
        state.records.push((zone.to_string(), record));
        guid
    }

    pub fn seed_pool(&self, zone: &str, name: &str, kind: &str) -> String {
        let mut state = self.state();
        let id = state.id("P");
        state.rr_pools.push(Pool {
            id: id.clone(),
            zone: zone.to_string(),
            name: name.to_string(),
            kind: kind.to_string(),
        });
        id
    }

    pub fn seed_directional_pool(&self, zone: &str, name: &str, kind: &str) -> String {
        let mut state = self.state();
        let id = state.id("D");
        state.dir_pools.push(Pool {
            id: id.clone(),
            zone: zone.to_string(),
            name: name.to_string(),
            kind: kind.to_string(),
        });
        id
    }

    /// Adds a directional record. `group` of `None` models a source-IP group.
    pub fn seed_directional(
        &self,
        pool_id: &str,
        record: WireRecord,
        group: Option<&DirectionalGroup>,
        no_response: bool,
    ) -> String {
        let mut state = self.state();
        let record = state.stamp(record);
        let guid = record.guid.clone();
        let (group_id, group_name) = match group {
            Some(group) => (Some(state.group_for(pool_id, group)), Some(group.name.clone())),
            None => (None, None),
        };
        state.dir_records.push(StoredDirectional {
            pool_id: pool_id.to_string(),
            record: DirectionalWireRecord {
                record,
                group_id,
                group_name,
                no_response,
            },
        });
        guid
    }

    /// The next call of `op` fails with `code`.
    pub fn fail_next(&self, op: &str, code: u32) {
        self.state().failures.insert(op.to_string(), code);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn writes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|op| WRITES.contains(&op.as_str()))
            .collect()
    }

    pub fn count(&self, op: &str) -> usize {
        self.state().calls.iter().filter(|c| c.as_str() == op).count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn pool_count(&self, zone: &str) -> usize {
        self.state().rr_pools.iter().filter(|p| p.zone == zone).count()
    }

    pub fn directional_pool_count(&self, zone: &str) -> usize {
        self.state().dir_pools.iter().filter(|p| p.zone == zone).count()
    }

    pub fn records_of(&self, zone: &str, name: &str, type_code: u16) -> Vec<WireRecord> {
        self.state()
            .records
            .iter()
            .filter(|(z, r)| z == zone && r.name == name && r.type_code == type_code)
            .map(|(_, r)| r.clone())
            .collect()
    }

    pub fn group_regions(&self, group_id: &str) -> Option<Regions> {
        self.state()
            .groups
            .get(group_id)
            .map(|(_, group)| group.regions.clone())
    }
}

impl UltraDns for FakeUltraDns {
    fn get_accounts_list_of_user(&self) -> Result<String> {
        self.state().call("getAccountsListOfUser")?;
        Ok(ACCOUNT_ID.to_string())
    }

    fn get_zones_of_account(&self, account_id: &str) -> Result<Vec<ZoneInfo>> {
        let mut state = self.state();
        state.call("getZonesOfAccount")?;
        if account_id != ACCOUNT_ID {
            return Err(fault(FaultCode::AccountNotFound, "Account not found in the system."));
        }
        Ok(state
            .zones
            .iter()
            .map(|name| ZoneInfo {
                name: name.clone(),
                account_id: Some(account_id.to_string()),
            })
            .collect())
    }

    fn create_primary_zone(&self, _account_id: &str, zone_name: &str) -> Result<()> {
        self.state().call("createPrimaryZone")?;
        if self.state().zones.contains(zone_name) {
            return Err(fault(FaultCode::ZoneAlreadyExists, "Zone already exists in the system."));
        }
        self.seed_zone(zone_name);
        Ok(())
    }

    fn delete_zone(&self, zone_name: &str) -> Result<()> {
        let mut state = self.state();
        state.call("deleteZone")?;
        state.require_zone(zone_name)?;
        state.zones.remove(zone_name);
        state.records.retain(|(z, _)| z != zone_name);
        state.rr_pools.retain(|p| p.zone != zone_name);
        Ok(())
    }

    fn get_resource_records_of_zone(&self, zone_name: &str) -> Result<Vec<WireRecord>> {
        let mut state = self.state();
        state.call("getResourceRecordsOfZone")?;
        state.require_zone(zone_name)?;
        Ok(state
            .records
            .iter()
            .filter(|(z, _)| z == zone_name)
            .map(|(_, r)| r.clone())
            .collect())
    }

    fn get_resource_records_of_dname_by_type(
        &self,
        zone_name: &str,
        name: &str,
        type_code: u16,
    ) -> Result<Vec<WireRecord>> {
        let mut state = self.state();
        state.call("getResourceRecordsOfDNameByType")?;
        state.require_zone(zone_name)?;
        // newest first, unlike the zone listing
        Ok(state
            .records
            .iter()
            .rev()
            .filter(|(z, r)| {
                z == zone_name
                    && r.name == name
                    && (type_code == ALL_TYPES || r.type_code == type_code)
            })
            .map(|(_, r)| r.clone())
            .collect())
    }

    fn create_resource_record(&self, zone_name: &str, record: &WireRecord) -> Result<String> {
        let mut state = self.state();
        state.call("createResourceRecord")?;
        state.require_zone(zone_name)?;
        let exists = state.records.iter().any(|(z, r)| {
            z == zone_name
                && r.name == record.name
                && r.type_code == record.type_code
                && r.rdata == record.rdata
        });
        if exists {
            return Err(fault(
                FaultCode::ResourceRecordAlreadyExists,
                "Resource Record of type 1 with these attributes already exists in the system.",
            ));
        }
        let mut record = record.clone();
        record.guid = String::new();
        record.created = None;
        let record = state.stamp(record);
        let guid = record.guid.clone();
        state.records.push((zone_name.to_string(), record));
        Ok(guid)
    }

    fn update_resource_record(&self, zone_name: &str, record: &WireRecord) -> Result<()> {
        let mut state = self.state();
        state.call("updateResourceRecord")?;
        state.require_zone(zone_name)?;
        match state.records.iter_mut().find(|(_, r)| r.guid == record.guid) {
            Some((_, existing)) => {
                existing.ttl = record.ttl;
                existing.rdata = record.rdata.clone();
                Ok(())
            }
            None => Err(fault(FaultCode::ResourceRecordNotFound, "No Resource Record with GUID found in the system")),
        }
    }

    fn delete_resource_record(&self, guid: &str) -> Result<()> {
        let mut state = self.state();
        state.call("deleteResourceRecord")?;
        let before = state.records.len();
        state.records.retain(|(_, r)| r.guid != guid);
        if state.records.len() == before {
            return Err(fault(FaultCode::ResourceRecordNotFound, "No Resource Record with GUID found in the system"));
        }
        Ok(())
    }

    fn get_load_balancing_pools_by_zone(
        &self,
        zone_name: &str,
    ) -> Result<BTreeMap<NameAndType, String>> {
        let mut state = self.state();
        state.call("getLoadBalancingPoolsByZone")?;
        state.require_zone(zone_name)?;
        Ok(state
            .rr_pools
            .iter()
            .filter(|p| p.zone == zone_name)
            .map(|p| (NameAndType::new(&p.name, &p.kind), p.id.clone()))
            .collect())
    }

    fn get_rr_pool_records(&self, pool_id: &str) -> Result<Vec<WireRecord>> {
        let mut state = self.state();
        state.call("getRRPoolRecords")?;
        if !state.rr_pools.iter().any(|p| p.id == pool_id) {
            return Err(fault(FaultCode::PoolNotFound, "Pool does not exist in the system"));
        }
        Ok(state
            .records
            .iter()
            .filter(|(_, r)| r.pool_id.as_deref() == Some(pool_id))
            .map(|(_, r)| r.clone())
            .collect())
    }

    fn add_rr_lb_pool(&self, zone_name: &str, name: &str, type_code: u16) -> Result<String> {
        let mut state = self.state();
        state.call("addRRLBPool")?;
        state.require_zone(zone_name)?;
        let kind = codec::type_name(type_code);
        if state
            .rr_pools
            .iter()
            .any(|p| p.zone == zone_name && p.name == name && p.kind == kind)
        {
            return Err(fault(FaultCode::PoolAlreadyExists, "Pool already created for this host name"));
        }
        let id = state.id("P");
        state.rr_pools.push(Pool {
            id: id.clone(),
            zone: zone_name.to_string(),
            name: name.to_string(),
            kind,
        });
        Ok(id)
    }

    fn add_record_to_rr_pool(
        &self,
        zone_name: &str,
        pool_id: &str,
        type_code: u16,
        ttl: u32,
        rdata: &str,
    ) -> Result<String> {
        let mut state = self.state();
        state.call("addRecordToRRPool")?;
        let Some(pool) = state.rr_pools.iter().find(|p| p.id == pool_id).cloned() else {
            return Err(fault(FaultCode::PoolNotFound, "Pool does not exist in the system"));
        };
        let duplicate = state.records.iter().any(|(_, r)| {
            r.pool_id.as_deref() == Some(pool_id) && r.rdata.first().map(String::as_str) == Some(rdata)
        });
        if duplicate {
            return Err(fault(FaultCode::PoolRecordAlreadyExists, "Pool Record already exists."));
        }
        let mut record = WireRecord::new(&pool.name, type_code, ttl, vec![rdata.to_string()]);
        record.pool_id = Some(pool_id.to_string());
        let record = state.stamp(record);
        let guid = record.guid.clone();
        state.records.push((zone_name.to_string(), record));
        Ok(guid)
    }

    fn delete_lb_pool(&self, pool_id: &str) -> Result<()> {
        let mut state = self.state();
        state.call("deleteLBPool")?;
        let before = state.rr_pools.len();
        state.rr_pools.retain(|p| p.id != pool_id);
        if state.rr_pools.len() == before {
            return Err(fault(FaultCode::PoolNotFound, "Pool does not exist in the system"));
        }
        state
            .records
            .retain(|(_, r)| r.pool_id.as_deref() != Some(pool_id));
        Ok(())
    }

    fn get_directional_pools_of_zone(
        &self,
        zone_name: &str,
    ) -> Result<BTreeMap<NameAndType, String>> {
        let mut state = self.state();
        state.call("getDirectionalPoolsOfZone")?;
        state.require_zone(zone_name)?;
        Ok(state
            .dir_pools
            .iter()
            .filter(|p| p.zone == zone_name)
            .map(|p| (NameAndType::new(&p.name, &p.kind), p.id.clone()))
            .collect())
    }

    fn get_directional_dns_records_for_host(
        &self,
        zone_name: &str,
        name: &str,
        type_code: u16,
    ) -> Result<Vec<DirectionalWireRecord>> {
        let mut state = self.state();
        state.call("getDirectionalDNSRecordsForHost")?;
        state.require_zone(zone_name)?;
        let pools: Vec<String> = state
            .dir_pools
            .iter()
            .filter(|p| {
                p.zone == zone_name
                    && p.name == name
                    && (type_code == ALL_TYPES || codec::type_code(&p.kind) == Some(type_code))
            })
            .map(|p| p.id.clone())
            .collect();
        if pools.is_empty() {
            return Err(fault(FaultCode::DirectionalPoolNotFound, "Directional Pool not found."));
        }
        Ok(state
            .dir_records
            .iter()
            .filter(|stored| pools.contains(&stored.pool_id))
            .map(|stored| stored.record.clone())
            .collect())
    }

    fn get_directional_dns_group_details(&self, group_id: &str) -> Result<DirectionalGroup> {
        let mut state = self.state();
        state.call("getDirectionalDNSGroupDetails")?;
        match state.groups.get(group_id) {
            Some((_, group)) => Ok(group.clone()),
            None => Err(fault(FaultCode::GroupNotFound, "Group does not exist.")),
        }
    }

    fn get_available_regions(&self) -> Result<Regions> {
        self.state().call("getAvailableRegions")?;
        Ok(BTreeMap::from([
            (
                "Europe".to_string(),
                BTreeSet::from(["France".to_string(), "Germany".to_string(), "Spain".to_string()]),
            ),
            (
                "North America".to_string(),
                BTreeSet::from(["Canada".to_string(), "United States".to_string()]),
            ),
        ]))
    }

    fn add_directional_pool(&self, zone_name: &str, name: &str, kind: &str) -> Result<String> {
        let mut state = self.state();
        state.call("addDirectionalPool")?;
        state.require_zone(zone_name)?;
        if state
            .dir_pools
            .iter()
            .any(|p| p.zone == zone_name && p.name == name && p.kind == kind)
        {
            return Err(fault(FaultCode::PoolAlreadyExists, "Pool already created for this host name"));
        }
        let id = state.id("D");
        state.dir_pools.push(Pool {
            id: id.clone(),
            zone: zone_name.to_string(),
            name: name.to_string(),
            kind: kind.to_string(),
        });
        Ok(id)
    }

    fn add_directional_pool_record(
        &self,
        pool_id: &str,
        record: &WireRecord,
        group: &DirectionalGroup,
    ) -> Result<String> {
        let mut state = self.state();
        state.call("addDirectionalPoolRecord")?;
        let Some(pool) = state.dir_pools.iter().find(|p| p.id == pool_id).cloned() else {
            return Err(fault(FaultCode::DirectionalPoolNotFound, "Directional Pool not found."));
        };
        let group_id = state.group_for(pool_id, group);
        let mut record = record.clone();
        record.name = pool.name;
        record.guid = String::new();
        let record = state.stamp(record);
        let guid = record.guid.clone();
        state.dir_records.push(StoredDirectional {
            pool_id: pool_id.to_string(),
            record: DirectionalWireRecord {
                record,
                group_id: Some(group_id),
                group_name: Some(group.name.clone()),
                no_response: false,
            },
        });
        Ok(guid)
    }

    fn update_directional_pool_record(
        &self,
        record: &DirectionalWireRecord,
        group: &DirectionalGroup,
    ) -> Result<()> {
        let mut state = self.state();
        state.call("updateDirectionalPoolRecord")?;
        let Some(stored) = state
            .dir_records
            .iter_mut()
            .find(|stored| stored.record.record.guid == record.record.guid)
        else {
            return Err(fault(
                FaultCode::DirectionalPoolRecordNotFound,
                "Directional Pool Record does not exist in the system",
            ));
        };
        stored.record.record.ttl = record.record.ttl;
        stored.record.record.rdata = record.record.rdata.clone();
        stored.record.group_name = Some(group.name.clone());
        if let Some(group_id) = stored.record.group_id.clone() {
            if let Some(entry) = state.groups.get_mut(&group_id) {
                entry.1 = group.clone();
            }
        }
        Ok(())
    }

    fn delete_directional_pool_record(&self, record_id: &str) -> Result<()> {
        let mut state = self.state();
        state.call("deleteDirectionalPoolRecord")?;
        let before = state.dir_records.len();
        state
            .dir_records
            .retain(|stored| stored.record.record.guid != record_id);
        if state.dir_records.len() == before {
            return Err(fault(
                FaultCode::DirectionalPoolRecordNotFound,
                "Directional Pool Record does not exist in the system",
            ));
        }
        Ok(())
    }
}
