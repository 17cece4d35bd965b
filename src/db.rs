//! LMDB-backed storage provider

use std::collections::HashMap;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions, RoTxn, RwTxn};
use parking_lot::RwLock;

use crate::acl::Acl;
use crate::config::Config;
use crate::error::{err, AclError, Result};
use crate::identity::SecurityIdentity;
use crate::provider::{view_for, AclProvider};
use crate::target::TargetIdentity;

/// Raw key -> serialized collection
pub type Db = Database<Bytes, Bytes>;

/// Collections persisted in an LMDB environment, one key per target
pub struct LmdbProvider {
    env: Env,
    acls: Db,
    cache: Option<RwLock<HashMap<TargetIdentity, Acl>>>,
    cache_capacity: usize,
}

impl LmdbProvider {
    /// Open (or create) the environment described by `config`
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.path).map_err(err)?;
        // SAFETY: LMDB requires no other processes access this path concurrently during open.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(config.map_size)
                .max_dbs(config.max_dbs)
                .open(&config.path)
                .map_err(err)?
        };
        let mut tx = env.write_txn().map_err(err)?;
        let acls: Db = env.create_database(&mut tx, Some("acls")).map_err(err)?;
        tx.commit().map_err(err)?;
        tracing::info!(path = %config.path.display(), "opened acl store");
        Ok(Self {
            env,
            acls,
            cache: config.cache_enabled.then(|| RwLock::new(HashMap::new())),
            cache_capacity: config.cache_capacity,
        })
    }

    /// Execute a read-only operation
    #[inline]
    fn read<T, F: FnOnce(&Db, &RoTxn) -> Result<T>>(&self, f: F) -> Result<T> {
        f(&self.acls, &self.env.read_txn().map_err(err)?)
    }

    /// Execute a write operation in its own transaction
    fn write<T, F: FnOnce(&Db, &mut RwTxn) -> Result<T>>(&self, f: F) -> Result<T> {
        let mut tx = self.env.write_txn().map_err(err)?;
        let r = f(&self.acls, &mut tx)?;
        tx.commit().map_err(err)?;
        Ok(r)
    }

    fn get(db: &Db, tx: &RoTxn, target: &TargetIdentity) -> Result<Option<Acl>> {
        let Some(bytes) = db.get(tx, &target.storage_key()).map_err(err)? else {
            return Ok(None);
        };
        let acl: Acl = serde_json::from_slice(bytes)?;
        if acl.target() != target {
            tracing::warn!(requested = %target, stored = %acl.target(), "storage key collision");
            return Err(AclError::Storage(format!("key collision between {} and {}", target, acl.target())));
        }
        Ok(Some(acl))
    }

    fn cached(&self, target: &TargetIdentity) -> Option<Acl> {
        self.cache.as_ref()?.read().get(target).cloned()
    }

    fn remember(&self, acl: &Acl) {
        let Some(cache) = &self.cache else {
            return;
        };
        let mut cache = cache.write();
        // Full: drop an arbitrary entry to stay within capacity
        if cache.len() >= self.cache_capacity && !cache.contains_key(acl.target()) {
            if let Some(victim) = cache.keys().next().cloned() {
                cache.remove(&victim);
                tracing::debug!(oid = %victim, "evicted cached acl");
            }
        }
        cache.insert(acl.target().clone(), acl.clone());
    }

    fn forget(&self, target: &TargetIdentity) {
        if let Some(cache) = &self.cache {
            cache.write().remove(target);
        }
    }

    /// Number of stored collections
    pub fn count(&self) -> Result<u64> {
        self.read(|db, tx| db.len(tx).map_err(err))
    }

    /// Number of collections currently held by the read cache
    pub fn cached_len(&self) -> usize {
        self.cache.as_ref().map_or(0, |c| c.read().len())
    }

    /// Drop every stored collection (for testing)
    pub fn clear(&self) -> Result<()> {
        self.write(|db, tx| db.clear(tx).map_err(err))?;
        if let Some(cache) = &self.cache {
            cache.write().clear();
        }
        Ok(())
    }
}

impl AclProvider for LmdbProvider {
    fn load_or_create(&self, target: &TargetIdentity) -> Result<Acl> {
        let found = self.read(|db, tx| Self::get(db, tx, target))?;
        Ok(found.unwrap_or_else(|| Acl::new(target.clone())))
    }

    fn update_acl(&self, acl: &Acl) -> Result<()> {
        let bytes = serde_json::to_vec(acl)?;
        self.write(|db, tx| {
            // Never replace a collection stored for a different target
            Self::get(db, tx, acl.target())?;
            db.put(tx, &acl.target().storage_key(), &bytes).map_err(err)
        })?;
        self.forget(acl.target());
        tracing::debug!(oid = %acl.target(), entries = acl.entries().len(), "persisted acl");
        Ok(())
    }

    fn delete_acl(&self, target: &TargetIdentity) -> Result<()> {
        let existed = self.write(|db, tx| {
            Self::get(db, tx, target)?;
            db.delete(tx, &target.storage_key()).map_err(err)
        })?;
        self.forget(target);
        tracing::info!(oid = %target, existed, "deleted acl");
        Ok(())
    }

    fn find_acl(&self, target: &TargetIdentity) -> Result<Option<Acl>> {
        if let Some(acl) = self.cached(target) {
            return Ok(Some(acl));
        }
        let found = self.read(|db, tx| Self::get(db, tx, target))?;
        if let Some(acl) = &found {
            self.remember(acl);
        }
        Ok(found)
    }

    fn find_acls(
        &self,
        targets: &[TargetIdentity],
        identities: &[SecurityIdentity],
    ) -> Result<HashMap<TargetIdentity, Acl>> {
        let found = self.read(|db, tx| {
            let mut r = Vec::with_capacity(targets.len());
            for t in targets {
                if let Some(acl) = Self::get(db, tx, t)? {
                    r.push(acl);
                }
            }
            Ok(r)
        })?;
        tracing::debug!(requested = targets.len(), found = found.len(), "batch loaded acls");
        Ok(found
            .into_iter()
            .map(|acl| {
                self.remember(&acl);
                (acl.target().clone(), view_for(&acl, identities))
            })
            .collect())
    }
}
