use snafu::OptionExt;

use super::codec;
use super::models::NameAndType;
use super::transport::UltraDns;
use crate::common::{
    InvalidInputSnafu, OkIfNotFound, Rdata, ResponseSnafu, Result, RECORD_KIND_A,
    RECORD_KIND_AAAA,
};

/// Round-robin pools. A pool outlives its records, so the last delete of a
/// member must be followed by [`RoundRobinPools::delete_pool`].
pub(super) struct RoundRobinPools<'a> {
    api: &'a dyn UltraDns,
    zone_name: &'a str,
}

impl<'a> RoundRobinPools<'a> {
    pub fn new(api: &'a dyn UltraDns, zone_name: &'a str) -> Self {
        Self { api, zone_name }
    }

    pub fn is_pool_type(kind: &str) -> bool {
        kind == RECORD_KIND_A || kind == RECORD_KIND_AAAA
    }

    fn pool_id(&self, name: &str, kind: &str) -> Result<Option<String>> {
        let pools = self
            .api
            .get_load_balancing_pools_by_zone(self.zone_name)
            .ok_if_not_found()?
            .unwrap_or_default();
        Ok(pools.get(&NameAndType::new(name, kind)).cloned())
    }

    /// Creates the pool, or finds the one another writer created first.
    pub fn reuse_or_create_pool(&self, name: &str, kind: &str) -> Result<String> {
        let type_code = pool_type_code(kind)?;
        match self.api.add_rr_lb_pool(self.zone_name, name, type_code) {
            Ok(pool_id) => {
                tracing::info!(zone = self.zone_name, name, kind, pool_id, "Created pool");
                Ok(pool_id)
            }
            Err(err) if err.is_conflict() => {
                tracing::debug!(zone = self.zone_name, name, kind, "Pool exists, reusing it");
                self.pool_id(name, kind)?.with_context(|| ResponseSnafu {
                    message: format!("pool for {name} {kind} exists but was not listed"),
                })
            }
            Err(err) => Err(err),
        }
    }

    pub fn add(&self, name: &str, kind: &str, ttl: u32, rdata: &[Rdata]) -> Result<()> {
        let pool_id = self.reuse_or_create_pool(name, kind)?;
        for entry in rdata {
            let (type_code, fields) = codec::encode(kind, entry)?;
            let value = fields.into_iter().next().unwrap_or_default();
            let guid = self
                .api
                .add_record_to_rr_pool(self.zone_name, &pool_id, type_code, ttl, &value)?;
            tracing::info!(
                zone = self.zone_name,
                name,
                kind,
                pool_id,
                record_id = guid,
                "Added record to pool"
            );
        }
        Ok(())
    }

    /// Deletes the pool once it has no records. Absent pools are fine.
    pub fn delete_pool(&self, name: &str, kind: &str) -> Result<()> {
        let Some(pool_id) = self.pool_id(name, kind)? else {
            return Ok(());
        };
        let members = self
            .api
            .get_rr_pool_records(&pool_id)
            .ok_if_not_found()?
            .unwrap_or_default();
        if !members.is_empty() {
            tracing::debug!(
                zone = self.zone_name,
                name,
                kind,
                pool_id,
                members = members.len(),
                "Pool still has records"
            );
            return Ok(());
        }

        if self.api.delete_lb_pool(&pool_id).ok_if_not_found()?.is_none() {
            tracing::warn!(zone = self.zone_name, name, kind, pool_id, "Pool already deleted");
        } else {
            tracing::info!(zone = self.zone_name, name, kind, pool_id, "Deleted empty pool");
        }
        Ok(())
    }
}

fn pool_type_code(kind: &str) -> Result<u16> {
    if !RoundRobinPools::is_pool_type(kind) {
        return InvalidInputSnafu {
            message: format!("{kind} records cannot be pooled"),
        }
        .fail();
    }
    codec::type_code(kind).with_context(|| InvalidInputSnafu {
        message: format!("unknown record type {kind}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ultradns::codec::rdata;
    use crate::ultradns::fake::FakeUltraDns;
    use crate::ultradns::models::WireRecord;

    const ZONE: &str = "example.com.";

    #[test]
    fn only_address_types_are_pooled() {
        assert!(RoundRobinPools::is_pool_type("A"));
        assert!(RoundRobinPools::is_pool_type("AAAA"));
        assert!(!RoundRobinPools::is_pool_type("CNAME"));
        assert!(!RoundRobinPools::is_pool_type("MX"));
    }

    #[test]
    fn add_creates_pool_and_one_record_per_rdata() {
        let fake = FakeUltraDns::with_zone(ZONE);
        let pools = RoundRobinPools::new(&fake, ZONE);
        pools
            .add("www.example.com.", "A", 300, &[rdata::a("192.0.2.1"), rdata::a("192.0.2.2")])
            .unwrap();
        assert_eq!(
            fake.writes(),
            vec!["addRRLBPool", "addRecordToRRPool", "addRecordToRRPool"]
        );
    }

    #[test]
    fn existing_pool_is_reused_after_conflict() {
        let fake = FakeUltraDns::with_zone(ZONE);
        let pool_id = fake.seed_pool(ZONE, "www.example.com.", "A");
        let pools = RoundRobinPools::new(&fake, ZONE);
        assert_eq!(pools.reuse_or_create_pool("www.example.com.", "A").unwrap(), pool_id);
        assert_eq!(fake.count("getLoadBalancingPoolsByZone"), 1);
    }

    #[test]
    fn delete_pool_keeps_pool_with_members() {
        let fake = FakeUltraDns::with_zone(ZONE);
        let pool_id = fake.seed_pool(ZONE, "www.example.com.", "A");
        let mut record = WireRecord::new("www.example.com.", 1, 300, vec!["192.0.2.1".into()]);
        record.pool_id = Some(pool_id);
        fake.seed_record(ZONE, record);

        RoundRobinPools::new(&fake, ZONE)
            .delete_pool("www.example.com.", "A")
            .unwrap();
        assert_eq!(fake.count("deleteLBPool"), 0);
        assert_eq!(fake.pool_count(ZONE), 1);
    }

    #[test]
    fn delete_pool_removes_empty_pool_and_tolerates_races() {
        let fake = FakeUltraDns::with_zone(ZONE);
        fake.seed_pool(ZONE, "www.example.com.", "A");
        let pools = RoundRobinPools::new(&fake, ZONE);
        pools.delete_pool("www.example.com.", "A").unwrap();
        assert_eq!(fake.pool_count(ZONE), 0);

        // absent pool: nothing to do
        pools.delete_pool("www.example.com.", "A").unwrap();
        assert_eq!(fake.count("deleteLBPool"), 1);

        // pool removed by someone else between lookup and delete
        fake.seed_pool(ZONE, "www.example.com.", "A");
        fake.fail_next("deleteLBPool", 2911);
        pools.delete_pool("www.example.com.", "A").unwrap();
    }

    #[test]
    fn other_faults_propagate() {
        let fake = FakeUltraDns::with_zone(ZONE);
        fake.fail_next("addRRLBPool", 9999);
        let err = RoundRobinPools::new(&fake, ZONE)
            .reuse_or_create_pool("www.example.com.", "A")
            .unwrap_err();
        assert!(err.is_transient());
    }
}
