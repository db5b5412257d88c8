//! UltraDNS: record sets kept in round-robin pools, and geo record sets kept
//! in directional pools.

mod account;
pub mod codec;
mod config;
#[cfg(test)]
pub(crate) mod fake;
pub mod fault;
mod geo;
pub mod grouping;
mod models;
mod pools;
mod provider;
mod rrsets;
mod soap;
mod transport;
mod xml;
mod zones;

pub use account::AccountIdCache;
pub use config::{Config, DEFAULT_URL};
pub use geo::UltraDnsGeoResourceRecordSets;
pub use grouping::DirectionalSkipMode;
pub use models::{DirectionalGroup, DirectionalWireRecord, NameAndType, WireRecord, ZoneInfo};
pub use provider::{descriptor, UltraDnsProvider, PROVIDER_NAME};
pub use rrsets::{UltraDnsResourceRecordSets, DEFAULT_TTL};
pub use soap::SoapClient;
pub use transport::{UltraDns, ALL_TYPES};
pub use zones::UltraDnsZones;
