use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache; // ✅ TTL cache for the stakeholder policy table
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::engine::policy::{resolve_policy, ResolvedPolicy};
use crate::models::policy::PolicyTable;
use crate::models::resource::Resource;
use crate::models::user::Role;

/// Caches the backend policy table for `CHECKOUT_POLICY_TTL_SECS`. When the
/// entry is missing or expired, resolution falls back to built-in limits.
#[derive(Clone)]
pub struct PolicyCache {
    cache: Arc<Cache<(), Arc<PolicyTable>>>,
}

impl PolicyCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(Cache::builder().max_capacity(1).time_to_live(ttl).build()),
        }
    }

    pub fn table(&self) -> Option<Arc<PolicyTable>> {
        self.cache.get(&())
    }

    pub fn store(&self, table: PolicyTable) -> Arc<PolicyTable> {
        let table = Arc::new(table);
        self.cache.insert((), table.clone());
        table
    }

    pub fn invalidate(&self) {
        self.cache.invalidate(&());
    }

    /// Refetches the table. A failed fetch clears the cached copy.
    pub async fn refresh(&self, client: &ApiClient) -> Option<Arc<PolicyTable>> {
        match client.get_stakeholder_policies().await {
            Ok(table) => {
                debug!("Stakeholder policies refreshed");
                Some(self.store(table))
            }
            Err(e) => {
                warn!("Error fetching stakeholder policies, using defaults: {}", e);
                self.invalidate();
                None
            }
        }
    }

    /// Cached table, fetching it first when the entry has expired.
    pub async fn current(&self, client: &ApiClient) -> Option<Arc<PolicyTable>> {
        match self.table() {
            Some(table) => Some(table),
            None => self.refresh(client).await,
        }
    }

    pub fn resolve(&self, role: Role, resource: Option<&Resource>) -> ResolvedPolicy {
        resolve_policy(role, self.table().as_deref(), resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::policy::PolicySource;
    use crate::models::policy::Policy;
    use crate::models::request::Priority;

    #[test]
    fn resolves_from_cached_table_until_invalidated() {
        let cache = PolicyCache::new(Duration::from_secs(600));
        assert_eq!(cache.resolve(Role::Student, None).source, PolicySource::Builtin);

        cache.store(PolicyTable {
            student: Some(Policy {
                max_duration: 21,
                max_quantity: 2,
                priority_access: false,
                allowed_priorities: vec![Priority::Standard],
            }),
            ..PolicyTable::default()
        });
        let resolved = cache.resolve(Role::Student, None);
        assert_eq!(resolved.source, PolicySource::Server);
        assert_eq!((resolved.max_duration, resolved.max_quantity), (21, Some(2)));

        // roles missing from the server table still get built-in limits
        assert_eq!(cache.resolve(Role::Faculty, None).source, PolicySource::Builtin);

        cache.invalidate();
        assert!(cache.table().is_none());
        assert_eq!(cache.resolve(Role::Student, None).max_duration, 30);
    }
}
