use std::fmt;
use std::str::FromStr;

use snafu::OptionExt;

use crate::common::{ConfigSnafu, DnsApi, Error, InvalidInputSnafu, ProviderDescriptor, Result};
use crate::ultradns::UltraDnsProvider;

/// Environment variable prefix, e.g. `DNSRECONCILE_ULTRADNS__USERNAME`.
pub const ENV_PREFIX: &str = "DNSRECONCILE";

/// The providers this build can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    UltraDns,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 1] = [ProviderKind::UltraDns];

    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::UltraDns => crate::ultradns::PROVIDER_NAME,
        }
    }

    pub fn descriptor(self) -> ProviderDescriptor {
        match self {
            ProviderKind::UltraDns => crate::ultradns::descriptor(),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .with_context(|| InvalidInputSnafu {
                message: format!(
                    "unknown provider {s}; known providers: {}",
                    Self::ALL.map(ProviderKind::name).join(", ")
                ),
            })
    }
}

#[derive(Clone, Default, serde::Deserialize)]
pub struct Config {
    pub ultradns: Option<crate::ultradns::Config>,
}

impl Config {
    #[cfg(feature = "config")]
    pub fn from_env() -> Result<Self> {
        ::config::Config::builder()
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|err| {
                ConfigSnafu {
                    prefix: ENV_PREFIX,
                    message: err.to_string(),
                }
                .build()
            })
    }

    pub fn into_provider(self, kind: ProviderKind) -> Result<Box<dyn DnsApi>> {
        match kind {
            ProviderKind::UltraDns => {
                let cfg = self.ultradns.with_context(|| ConfigSnafu {
                    prefix: format!("{ENV_PREFIX}_ULTRADNS"),
                    message: "provider is not configured",
                })?;
                Ok(Box::new(UltraDnsProvider::try_from(cfg)?))
            }
        }
    }
}
