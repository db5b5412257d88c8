use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, PoisonError, RwLock};

use super::transport::UltraDns;
use crate::common::{Credentials, Result, Supplier};

fn fingerprint<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug, Clone)]
struct Cached {
    account_id: String,
    url: u64,
    credentials: u64,
}

/// Remembers the account id of the current user. The value is looked up
/// again whenever the endpoint or the credentials change.
pub struct AccountIdCache {
    url: Supplier<String>,
    credentials: Supplier<Credentials>,
    cached: RwLock<Option<Cached>>,
    refresh: Mutex<()>,
}

impl AccountIdCache {
    pub fn new(url: Supplier<String>, credentials: Supplier<Credentials>) -> Self {
        Self {
            url,
            credentials,
            cached: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    fn lookup_cached(&self, url: u64, credentials: u64) -> Option<String> {
        let cached = self.cached.read().unwrap_or_else(PoisonError::into_inner);
        cached
            .as_ref()
            .filter(|c| c.url == url && c.credentials == credentials)
            .map(|c| c.account_id.clone())
    }

    pub fn get(&self, api: &dyn UltraDns) -> Result<String> {
        let url = fingerprint((self.url)().as_str());
        let credentials = fingerprint(&(self.credentials)());
        if let Some(account_id) = self.lookup_cached(url, credentials) {
            return Ok(account_id);
        }

        let _refresh = self.refresh.lock().unwrap_or_else(PoisonError::into_inner);
        // another caller may have refreshed while we waited
        if let Some(account_id) = self.lookup_cached(url, credentials) {
            return Ok(account_id);
        }

        let account_id = api.get_accounts_list_of_user()?;
        tracing::debug!(account_id, "Resolved account id");
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(Cached {
            account_id: account_id.clone(),
            url,
            credentials,
        });
        Ok(account_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ultradns::fake::{FakeUltraDns, ACCOUNT_ID};
    use std::sync::Arc;

    fn credentials(password: &str) -> Credentials {
        Credentials::new()
            .with("username", "joe")
            .with("password", password)
    }

    fn fixed_cache() -> AccountIdCache {
        AccountIdCache::new(
            Arc::new(|| "https://ultra-api.ultradns.com:8443/UltraDNS_WS/v01".to_string()),
            Arc::new(|| credentials("letmein")),
        )
    }

    #[test]
    fn looks_up_once_while_inputs_are_unchanged() {
        let fake = FakeUltraDns::new();
        let cache = fixed_cache();
        assert_eq!(cache.get(&fake).unwrap(), ACCOUNT_ID);
        assert_eq!(cache.get(&fake).unwrap(), ACCOUNT_ID);
        assert_eq!(fake.count("getAccountsListOfUser"), 1);
    }

    #[test]
    fn credential_rotation_triggers_one_new_lookup() {
        let fake = FakeUltraDns::new();
        let password = Arc::new(Mutex::new("letmein".to_string()));
        let current = password.clone();
        let cache = AccountIdCache::new(
            Arc::new(|| "https://ultra-api.ultradns.com:8443/UltraDNS_WS/v01".to_string()),
            Arc::new(move || credentials(&current.lock().unwrap())),
        );

        cache.get(&fake).unwrap();
        *password.lock().unwrap() = "rotated".to_string();
        cache.get(&fake).unwrap();
        cache.get(&fake).unwrap();
        assert_eq!(fake.count("getAccountsListOfUser"), 2);
    }

    #[test]
    fn endpoint_change_triggers_new_lookup() {
        let fake = FakeUltraDns::new();
        let url = Arc::new(Mutex::new("https://a.example/v01".to_string()));
        let current = url.clone();
        let cache = AccountIdCache::new(
            Arc::new(move || current.lock().unwrap().clone()),
            Arc::new(|| credentials("letmein")),
        );

        cache.get(&fake).unwrap();
        *url.lock().unwrap() = "https://b.example/v01".to_string();
        cache.get(&fake).unwrap();
        assert_eq!(fake.count("getAccountsListOfUser"), 2);
    }

    #[test]
    fn failed_lookup_is_not_cached() {
        let fake = FakeUltraDns::new();
        fake.fail_next("getAccountsListOfUser", 9999);
        let cache = fixed_cache();
        assert!(cache.get(&fake).unwrap_err().is_transient());
        assert_eq!(cache.get(&fake).unwrap(), ACCOUNT_ID);
        assert_eq!(fake.count("getAccountsListOfUser"), 2);
    }

    #[test]
    fn concurrent_callers_share_one_lookup() {
        let fake = FakeUltraDns::new();
        let cache = fixed_cache();
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| assert_eq!(cache.get(&fake).unwrap(), ACCOUNT_ID));
            }
        });
        assert_eq!(fake.count("getAccountsListOfUser"), 1);
    }
}
