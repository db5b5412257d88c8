use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use super::account::AccountIdCache;
use super::config::DEFAULT_URL;
use super::geo::UltraDnsGeoResourceRecordSets;
use super::grouping::DirectionalSkipMode;
use super::rrsets::UltraDnsResourceRecordSets;
use super::soap::SoapClient;
use super::transport::UltraDns;
use super::zones::UltraDnsZones;
use crate::common::{
    key_file_or_string, ConfigSnafu, Credentials, DnsApi, Error, GeoResourceRecordSetApi,
    ProviderDescriptor, ResourceRecordSetApi, Supplier, ZoneApi, ZoneIdentification,
    PROFILE_GEO, PROFILE_ROUND_ROBIN,
};

pub const PROVIDER_NAME: &str = "ultradns";

fn kinds(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|name| name.to_string()).collect()
}

pub fn descriptor() -> ProviderDescriptor {
    ProviderDescriptor {
        name: PROVIDER_NAME.to_string(),
        default_url: DEFAULT_URL.to_string(),
        zone_identification: ZoneIdentification::Name,
        basic_record_types: kinds(&[
            "A", "AAAA", "CNAME", "HINFO", "MX", "NAPTR", "NS", "PTR", "SOA", "SPF", "SRV",
            "SSHFP", "TXT",
        ]),
        profile_to_record_types: BTreeMap::from([
            (
                PROFILE_GEO.to_string(),
                kinds(&[
                    "A", "AAAA", "CNAME", "HINFO", "MX", "NAPTR", "PTR", "SPF", "SRV", "SSHFP",
                    "TXT",
                ]),
            ),
            (PROFILE_ROUND_ROBIN.to_string(), kinds(&["A", "AAAA"])),
        ]),
        credential_types: BTreeMap::from([(
            "password".to_string(),
            vec!["username".to_string(), "password".to_string()],
        )]),
    }
}

/// One UltraDNS account.
pub struct UltraDnsProvider {
    api: Arc<dyn UltraDns>,
    descriptor: ProviderDescriptor,
    account: AccountIdCache,
    skip_mode: DirectionalSkipMode,
}

impl UltraDnsProvider {
    pub fn new(
        api: Arc<dyn UltraDns>,
        url: Supplier<String>,
        credentials: Supplier<Credentials>,
        skip_mode: DirectionalSkipMode,
    ) -> Self {
        Self {
            api,
            descriptor: descriptor(),
            account: AccountIdCache::new(url, credentials),
            skip_mode,
        }
    }
}

impl TryFrom<super::Config> for UltraDnsProvider {
    type Error = Error;

    fn try_from(value: super::Config) -> Result<Self, Self::Error> {
        let descriptor = descriptor();
        let password = key_file_or_string(value.password, PROVIDER_NAME)?;
        let credentials = Credentials::from_list(&descriptor, vec![value.username, password])
            .and_then(|credentials| credentials.validate(&descriptor).map(|_| credentials))
            .map_err(|err| {
                ConfigSnafu {
                    prefix: PROVIDER_NAME,
                    message: err.to_string(),
                }
                .build()
            })?;
        let url = value
            .url
            .map(String::from)
            .unwrap_or_else(|| DEFAULT_URL.to_string());

        let url: Supplier<String> = Arc::new(move || url.clone());
        let credentials: Supplier<Credentials> = Arc::new(move || credentials.clone());
        let client = SoapClient::new(
            url.clone(),
            credentials.clone(),
            Duration::from_secs(value.timeout_secs),
        );
        Ok(Self::new(
            Arc::new(client),
            url,
            credentials,
            value.directional_skip_mode,
        ))
    }
}

impl DnsApi for UltraDnsProvider {
    fn provider(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn zones(&self) -> Box<dyn ZoneApi + '_> {
        Box::new(UltraDnsZones::new(self.api.as_ref(), &self.account))
    }

    fn basic_record_sets(&self, zone_id: &str) -> Box<dyn ResourceRecordSetApi + '_> {
        Box::new(UltraDnsResourceRecordSets::new(
            self.api.as_ref(),
            &self.descriptor,
            zone_id,
        ))
    }

    fn geo_record_sets(&self, zone_id: &str) -> Option<Box<dyn GeoResourceRecordSetApi + '_>> {
        if !self.descriptor.supports_profile(PROFILE_GEO) {
            return None;
        }
        Some(Box::new(UltraDnsGeoResourceRecordSets::new(
            self.api.as_ref(),
            &self.descriptor,
            zone_id,
            self.skip_mode,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Regions, ResourceRecordSet, Result};
    use crate::ultradns::codec::{self, rdata};
    use crate::ultradns::fake::FakeUltraDns;

    const ZONE: &str = "example.com.";

    fn provider(fake: &Arc<FakeUltraDns>) -> UltraDnsProvider {
        UltraDnsProvider::new(
            fake.clone(),
            Arc::new(|| DEFAULT_URL.to_string()),
            Arc::new(|| Credentials::new().with("username", "joe").with("password", "pw")),
            DirectionalSkipMode::Skip,
        )
    }

    fn europe() -> Regions {
        BTreeMap::from([("Europe".to_string(), kinds(&["France"]))])
    }

    #[test]
    fn descriptor_types_are_known_to_the_codec() {
        let descriptor = descriptor();
        for kind in &descriptor.basic_record_types {
            assert!(codec::type_code(kind).is_some(), "{kind}");
        }
        assert!(descriptor.profile_supports(PROFILE_ROUND_ROBIN, "A"));
        assert!(!descriptor.profile_supports(PROFILE_GEO, "SOA"));
        assert!(!descriptor.supports_profile("weighted"));
    }

    #[test]
    fn credentials_follow_descriptor_parameters() {
        let descriptor = descriptor();
        let credentials =
            Credentials::from_list(&descriptor, vec!["joe".into(), "pw".into()]).unwrap();
        assert_eq!(credentials.get("username"), Some("joe"));
        credentials.validate(&descriptor).unwrap();
        assert!(Credentials::new()
            .with("username", "joe")
            .validate(&descriptor)
            .is_err());
    }

    #[test]
    fn optional_surfaces() {
        let fake = Arc::new(FakeUltraDns::with_zone(ZONE));
        let provider = provider(&fake);
        assert!(provider.geo_record_sets(ZONE).is_some());
        assert!(provider.weighted_record_sets(ZONE).is_none());
        assert_eq!(provider.provider().name, PROVIDER_NAME);
    }

    #[test]
    fn all_profile_surface_routes_by_qualifier() {
        let fake = Arc::new(FakeUltraDns::with_zone(ZONE));
        let provider = provider(&fake);
        let all = provider.all_profile_record_sets(ZONE);

        let plain = ResourceRecordSet::new("www.example.com.", "A")
            .with_ttl(300)
            .with_record(rdata::a("192.0.2.1"));
        let geo = ResourceRecordSet::new("geo.example.com.", "CNAME")
            .with_qualifier("Europe")
            .with_ttl(300)
            .with_record(rdata::cname("eu.example.net."))
            .with_geo(europe());
        all.put(&plain).unwrap();
        all.put(&geo).unwrap();

        assert_eq!(
            all.get_by_name_type_and_qualifier("www.example.com.", "A", None)
                .unwrap(),
            Some(plain.clone())
        );
        assert_eq!(
            all.get_by_name_type_and_qualifier("geo.example.com.", "CNAME", Some("Europe"))
                .unwrap(),
            Some(geo.clone())
        );

        let everything: Vec<ResourceRecordSet> =
            all.iterate().unwrap().collect::<Result<_>>().unwrap();
        assert!(everything.contains(&plain));
        assert!(everything.contains(&geo));

        all.delete_by_name_type_and_qualifier("geo.example.com.", "CNAME", Some("Europe"))
            .unwrap();
        assert!(all
            .get_by_name_type_and_qualifier("geo.example.com.", "CNAME", Some("Europe"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn zones_use_the_cached_account() {
        let fake = Arc::new(FakeUltraDns::with_zone(ZONE));
        let provider = provider(&fake);
        assert_eq!(provider.zones().iterate().unwrap().len(), 1);
        assert_eq!(provider.zones().iterate_by_name(ZONE).unwrap().len(), 1);
        assert_eq!(fake.count("getAccountsListOfUser"), 1);
    }

    fn config(username: &str, password: &str) -> super::super::Config {
        super::super::Config {
            url: None,
            username: username.into(),
            password: password.into(),
            timeout_secs: 5,
            directional_skip_mode: DirectionalSkipMode::Skip,
        }
    }

    #[test]
    fn config_requires_username_and_password() {
        for config in [config("", "pw"), config("joe", "")] {
            assert!(matches!(
                UltraDnsProvider::try_from(config),
                Err(Error::ConfigError { .. })
            ));
        }
        assert!(UltraDnsProvider::try_from(config("joe", "pw")).is_ok());
    }
}
