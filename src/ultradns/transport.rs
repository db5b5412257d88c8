use std::collections::BTreeMap;

use super::models::{DirectionalGroup, DirectionalWireRecord, NameAndType, WireRecord, ZoneInfo};
use crate::common::{Regions, Result};

/// Passed as a type code to read every record type at once.
pub const ALL_TYPES: u16 = 0;

/// The remote operations the reconcilers depend on. Implementations return
/// faults already classified (see [`super::fault::classify`]).
pub trait UltraDns: Send + Sync {
    fn get_accounts_list_of_user(&self) -> Result<String>;
    fn get_zones_of_account(&self, account_id: &str) -> Result<Vec<ZoneInfo>>;
    fn create_primary_zone(&self, account_id: &str, zone_name: &str) -> Result<()>;
    fn delete_zone(&self, zone_name: &str) -> Result<()>;

    fn get_resource_records_of_zone(&self, zone_name: &str) -> Result<Vec<WireRecord>>;
    fn get_resource_records_of_dname_by_type(
        &self,
        zone_name: &str,
        name: &str,
        type_code: u16,
    ) -> Result<Vec<WireRecord>>;
    /// Returns the new record's guid.
    fn create_resource_record(&self, zone_name: &str, record: &WireRecord) -> Result<String>;
    fn update_resource_record(&self, zone_name: &str, record: &WireRecord) -> Result<()>;
    fn delete_resource_record(&self, guid: &str) -> Result<()>;

    fn get_load_balancing_pools_by_zone(
        &self,
        zone_name: &str,
    ) -> Result<BTreeMap<NameAndType, String>>;
    fn get_rr_pool_records(&self, pool_id: &str) -> Result<Vec<WireRecord>>;
    /// Returns the new pool id.
    fn add_rr_lb_pool(&self, zone_name: &str, name: &str, type_code: u16) -> Result<String>;
    fn add_record_to_rr_pool(
        &self,
        zone_name: &str,
        pool_id: &str,
        type_code: u16,
        ttl: u32,
        rdata: &str,
    ) -> Result<String>;
    fn delete_lb_pool(&self, pool_id: &str) -> Result<()>;

    fn get_directional_pools_of_zone(
        &self,
        zone_name: &str,
    ) -> Result<BTreeMap<NameAndType, String>>;
    fn get_directional_dns_records_for_host(
        &self,
        zone_name: &str,
        name: &str,
        type_code: u16,
    ) -> Result<Vec<DirectionalWireRecord>>;
    fn get_directional_dns_group_details(&self, group_id: &str) -> Result<DirectionalGroup>;
    fn get_available_regions(&self) -> Result<Regions>;
    /// Returns the new directional pool id.
    fn add_directional_pool(&self, zone_name: &str, name: &str, kind: &str) -> Result<String>;
    /// Returns the new directional pool record id.
    fn add_directional_pool_record(
        &self,
        pool_id: &str,
        record: &WireRecord,
        group: &DirectionalGroup,
    ) -> Result<String>;
    fn update_directional_pool_record(
        &self,
        record: &DirectionalWireRecord,
        group: &DirectionalGroup,
    ) -> Result<()>;
    fn delete_directional_pool_record(&self, record_id: &str) -> Result<()>;
}
