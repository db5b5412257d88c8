use super::account::AccountIdCache;
use super::codec;
use super::models::WireRecord;
use super::transport::UltraDns;
use crate::common::{OkIfNotFound, Result, Zone, ZoneApi, RECORD_KIND_SOA};

const SOA_RNAME: usize = 1;

/// `admin.example.com.` to `admin@example.com`.
fn rname_to_email(rname: &str) -> String {
    let rname = rname.trim_end_matches('.');
    match rname.split_once('.') {
        Some((user, domain)) => format!("{user}@{domain}"),
        None => rname.to_string(),
    }
}

fn email_to_rname(email: &str) -> String {
    let rname = email.replacen('@', ".", 1);
    if rname.ends_with('.') {
        rname
    } else {
        format!("{rname}.")
    }
}

/// Primary zones of the account. The zone name is its id.
pub struct UltraDnsZones<'a> {
    api: &'a dyn UltraDns,
    account: &'a AccountIdCache,
}

impl<'a> UltraDnsZones<'a> {
    pub fn new(api: &'a dyn UltraDns, account: &'a AccountIdCache) -> Self {
        Self { api, account }
    }

    fn soa(&self, zone_name: &str) -> Result<Option<WireRecord>> {
        let Some(soa_code) = codec::type_code(RECORD_KIND_SOA) else {
            return Ok(None);
        };
        Ok(self
            .api
            .get_resource_records_of_dname_by_type(zone_name, zone_name, soa_code)
            .ok_if_not_found()?
            .and_then(|records| records.into_iter().next()))
    }

    fn zone(&self, zone_name: &str) -> Result<Zone> {
        let soa = self.soa(zone_name)?;
        Ok(Zone {
            id: zone_name.to_string(),
            name: zone_name.to_string(),
            ttl: soa.as_ref().map_or(0, |soa| soa.ttl),
            email: soa
                .as_ref()
                .and_then(|soa| soa.rdata.get(SOA_RNAME))
                .map(|rname| rname_to_email(rname))
                .unwrap_or_default(),
            qualifier: None,
        })
    }

    fn zone_names(&self) -> Result<Vec<String>> {
        let account_id = self.account.get(self.api)?;
        Ok(self
            .api
            .get_zones_of_account(&account_id)
            .ok_if_not_found()?
            .unwrap_or_default()
            .into_iter()
            .map(|zone| zone.name)
            .collect())
    }
}

impl ZoneApi for UltraDnsZones<'_> {
    fn iterate(&self) -> Result<Vec<Zone>> {
        self.zone_names()?
            .iter()
            .map(|name| self.zone(name))
            .collect()
    }

    fn iterate_by_name(&self, name: &str) -> Result<Vec<Zone>> {
        self.zone_names()?
            .iter()
            .filter(|zone_name| zone_name.as_str() == name)
            .map(|zone_name| self.zone(zone_name))
            .collect()
    }

    fn put(&self, zone: &Zone) -> Result<String> {
        let account_id = self.account.get(self.api)?;
        match self.api.create_primary_zone(&account_id, &zone.name) {
            Ok(()) => tracing::info!(zone = zone.name, "Created zone"),
            Err(err) if err.is_conflict() => tracing::debug!(zone = zone.name, "Zone exists"),
            Err(err) => return Err(err),
        }

        let rname = email_to_rname(&zone.email);
        if let Some(mut soa) = self.soa(&zone.name)? {
            let current_rname = soa.rdata.get(SOA_RNAME).cloned().unwrap_or_default();
            if soa.ttl != zone.ttl || current_rname != rname {
                soa.ttl = zone.ttl;
                if let Some(field) = soa.rdata.get_mut(SOA_RNAME) {
                    *field = rname;
                }
                self.api.update_resource_record(&zone.name, &soa)?;
                tracing::info!(zone = zone.name, ttl = zone.ttl, email = zone.email, "Updated SOA");
            }
        }
        Ok(zone.name.clone())
    }

    fn delete(&self, id: &str) -> Result<()> {
        if self.api.delete_zone(id).ok_if_not_found()?.is_some() {
            tracing::info!(zone = id, "Deleted zone");
        } else {
            tracing::warn!(zone = id, "Zone already deleted");
        }
        Ok(())
    }
}
