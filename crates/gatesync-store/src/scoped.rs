//! Per-user scoping
//!
//! All synchronized state belongs to exactly one end-user. [`ScopedStore`]
//! lets several users share one backend by prefixing every key with the
//! user's scope.

use crate::error::StoreError;
use crate::store::{KeyedStore, SharedStore, Stamped, Timestamp, WriteMode};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::{self, Display, Formatter};

/// End-user scope identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserScope(String);

impl UserScope {
    /// Create scope, trimming surrounding whitespace
    #[inline]
    #[must_use]
    pub fn new(user: impl AsRef<str>) -> Self {
        Self(user.as_ref().trim().to_string())
    }

    /// Scope as string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// [`KeyedStore`] view restricted to one user
#[derive(Clone)]
pub struct ScopedStore {
    scope: UserScope,
    inner: SharedStore,
}

impl ScopedStore {
    /// Wrap a shared backend for `scope`
    #[inline]
    #[must_use]
    pub fn new(scope: UserScope, inner: SharedStore) -> Self {
        Self { scope, inner }
    }

    /// The user this view belongs to
    #[inline]
    #[must_use]
    pub fn scope(&self) -> &UserScope {
        &self.scope
    }

    fn scoped_key(&self, key: &str) -> String {
        format!("user/{}/{key}", self.scope)
    }
}

impl fmt::Debug for ScopedStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedStore")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl KeyedStore for ScopedStore {
    async fn pull(&self, key: &str) -> Result<Stamped, StoreError> {
        self.inner.pull(&self.scoped_key(key)).await
    }

    async fn timestamp(&self, key: &str) -> Result<Timestamp, StoreError> {
        self.inner.timestamp(&self.scoped_key(key)).await
    }

    async fn push(
        &self,
        key: &str,
        value: Value,
        mode: WriteMode,
    ) -> Result<Timestamp, StoreError> {
        self.inner.push(&self.scoped_key(key), value, mode).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn users_do_not_see_each_other() {
        let backend: SharedStore = Arc::new(MemoryStore::new());
        let alice = ScopedStore::new(UserScope::new("alice"), backend.clone());
        let bob = ScopedStore::new(UserScope::new("bob"), backend.clone());

        alice.push("1::Intake", json!(["a"]), WriteMode::Replace).await.unwrap();

        assert!(bob.pull("1::Intake").await.unwrap().is_empty());
        assert_eq!(alice.pull("1::Intake").await.unwrap().value, json!(["a"]));
        assert_eq!(
            backend.timestamp("user/alice/1::Intake").await.unwrap(),
            Timestamp(1)
        );
    }

    #[test]
    fn scope_is_trimmed() {
        assert_eq!(UserScope::new("  kim ").as_str(), "kim");
    }
}
