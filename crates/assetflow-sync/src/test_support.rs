//! In-memory fakes shared by the unit tests in this crate.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

use assetflow_connector_graph::{
    Directory, DirectoryUserRecord, GraphError, GraphResult, TenantCredentials,
};
use assetflow_db::models::{DirectoryUser, Tenant};
use assetflow_db::DbError;

use crate::photo_store::PhotoStore;
use crate::store::{DirectoryStore, LeaseStore};

/// Directory tenant ID whose listings always fail.
pub const FAILING_DIRECTORY: &str = "dir-failing";

pub fn make_tenant(name: &str, with_credentials: bool) -> Tenant {
    Tenant {
        id: Uuid::new_v4(),
        name: name.to_string(),
        slug: name.to_string(),
        entra_tenant_id: with_credentials.then(|| format!("dir-{name}")),
        client_id: with_credentials.then(|| "client-id".to_string()),
        client_secret: with_credentials.then(|| "client-secret".to_string()),
        client_secret_expires_at: None,
        sync_enabled: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn make_record(external_id: &str) -> DirectoryUserRecord {
    DirectoryUserRecord {
        external_id: external_id.to_string(),
        user_principal_name: format!("{external_id}@example.com"),
        display_name: format!("User {external_id}"),
        email: Some(format!("{external_id}@example.com")),
        given_name: None,
        surname: None,
        job_title: None,
        department: None,
        account_enabled: true,
        last_sign_in: None,
    }
}

fn user_from_record(tenant_id: Uuid, record: &DirectoryUserRecord) -> DirectoryUser {
    let now = Utc::now();
    DirectoryUser {
        id: Uuid::new_v4(),
        tenant_id,
        external_id: record.external_id.clone(),
        user_principal_name: record.user_principal_name.clone(),
        display_name: record.display_name.clone(),
        email: record.email.clone(),
        given_name: record.given_name.clone(),
        surname: record.surname.clone(),
        job_title: record.job_title.clone(),
        department: record.department.clone(),
        account_enabled: record.account_enabled,
        last_sign_in_at: record.last_sign_in,
        photo_synced_at: None,
        photo_checked_at: None,
        created_at: now,
        updated_at: now,
    }
}

/// In-memory [`DirectoryStore`] with failure injection.
#[derive(Default)]
pub struct MemoryDirectoryStore {
    tenants: Mutex<Vec<Tenant>>,
    users: Mutex<HashMap<(Uuid, String), DirectoryUser>>,
    upserts: AtomicUsize,
    fail_upsert_after: Mutex<Option<usize>>,
}

impl MemoryDirectoryStore {
    pub fn insert_tenant(&self, tenant: Tenant) {
        self.tenants.lock().unwrap().push(tenant);
    }

    pub fn seed_user(&self, tenant_id: Uuid, record: DirectoryUserRecord) {
        let user = user_from_record(tenant_id, &record);
        self.users
            .lock()
            .unwrap()
            .insert((tenant_id, record.external_id), user);
    }

    pub fn set_photo_checked(&self, tenant_id: Uuid, external_id: &str) {
        if let Some(user) = self
            .users
            .lock()
            .unwrap()
            .get_mut(&(tenant_id, external_id.to_string()))
        {
            user.photo_checked_at = Some(Utc::now());
        }
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn user_count(&self, tenant_id: Uuid) -> usize {
        self.users
            .lock()
            .unwrap()
            .keys()
            .filter(|(t, _)| *t == tenant_id)
            .count()
    }

    pub fn user(&self, tenant_id: Uuid, external_id: &str) -> Option<DirectoryUser> {
        self.users
            .lock()
            .unwrap()
            .get(&(tenant_id, external_id.to_string()))
            .cloned()
    }

    pub fn fail_upsert_after(&self, successes: usize) {
        *self.fail_upsert_after.lock().unwrap() = Some(successes);
    }

    pub fn clear_upsert_failure(&self) {
        *self.fail_upsert_after.lock().unwrap() = None;
    }
}

#[async_trait]
impl DirectoryStore for MemoryDirectoryStore {
    async fn find_tenant(&self, id: Uuid) -> Result<Option<Tenant>, DbError> {
        Ok(self
            .tenants
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn find_tenant_by_directory_id(
        &self,
        directory_tenant_id: &str,
    ) -> Result<Option<Tenant>, DbError> {
        Ok(self
            .tenants
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.entra_tenant_id.as_deref() == Some(directory_tenant_id))
            .cloned())
    }

    async fn list_sync_enabled(&self) -> Result<Vec<Tenant>, DbError> {
        Ok(self
            .tenants
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.sync_enabled)
            .cloned()
            .collect())
    }

    async fn upsert_directory_user(
        &self,
        tenant_id: Uuid,
        record: &DirectoryUserRecord,
    ) -> Result<DirectoryUser, DbError> {
        if let Some(successes) = *self.fail_upsert_after.lock().unwrap() {
            if self.upserts.load(Ordering::SeqCst) >= successes {
                return Err(DbError::QueryFailed(sqlx::Error::PoolTimedOut));
            }
        }

        let mut users = self.users.lock().unwrap();
        let key = (tenant_id, record.external_id.clone());
        let user = match users.get(&key) {
            Some(existing) => {
                // Mirrors the SQL upsert: keys, created_at, and photo
                // bookkeeping survive; everything else is overwritten.
                let mut updated = user_from_record(tenant_id, record);
                updated.id = existing.id;
                updated.created_at = existing.created_at;
                updated.photo_synced_at = existing.photo_synced_at;
                updated.photo_checked_at = existing.photo_checked_at;
                updated
            }
            None => user_from_record(tenant_id, record),
        };
        users.insert(key, user.clone());
        self.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(user)
    }

    async fn mark_photo_synced(&self, tenant_id: Uuid, external_id: &str) -> Result<(), DbError> {
        if let Some(user) = self
            .users
            .lock()
            .unwrap()
            .get_mut(&(tenant_id, external_id.to_string()))
        {
            user.photo_synced_at = Some(Utc::now());
            user.photo_checked_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn mark_photo_checked(&self, tenant_id: Uuid, external_id: &str) -> Result<(), DbError> {
        if let Some(user) = self
            .users
            .lock()
            .unwrap()
            .get_mut(&(tenant_id, external_id.to_string()))
        {
            user.photo_checked_at = Some(Utc::now());
        }
        Ok(())
    }
}

/// In-memory [`Directory`] with scriptable users, photos, and failures.
#[derive(Default)]
pub struct FakeDirectory {
    users: Mutex<Vec<DirectoryUserRecord>>,
    photos: Mutex<HashMap<String, Bytes>>,
    failing_photos: Mutex<HashSet<String>>,
    fail_list: AtomicBool,
    list_calls: AtomicUsize,
    photo_calls: AtomicUsize,
}

impl FakeDirectory {
    pub fn set_users(&self, users: Vec<DirectoryUserRecord>) {
        *self.users.lock().unwrap() = users;
    }

    pub fn set_photo(&self, external_id: &str, bytes: Bytes) {
        self.photos
            .lock()
            .unwrap()
            .insert(external_id.to_string(), bytes);
    }

    pub fn fail_listing(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_photo_for(&self, external_id: &str) {
        self.failing_photos
            .lock()
            .unwrap()
            .insert(external_id.to_string());
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn photo_calls(&self) -> usize {
        self.photo_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Directory for FakeDirectory {
    async fn list_users(
        &self,
        credentials: &TenantCredentials,
    ) -> GraphResult<Vec<DirectoryUserRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst)
            || credentials.directory_tenant_id == FAILING_DIRECTORY
        {
            return Err(GraphError::Api {
                code: "ServiceUnavailable".to_string(),
                message: "directory unavailable".to_string(),
            });
        }
        Ok(self.users.lock().unwrap().clone())
    }

    async fn fetch_user_photo(
        &self,
        _credentials: &TenantCredentials,
        user_external_id: &str,
    ) -> GraphResult<Option<Bytes>> {
        self.photo_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_photos.lock().unwrap().contains(user_external_id) {
            return Err(GraphError::Api {
                code: "ServiceUnavailable".to_string(),
                message: "photo endpoint unavailable".to_string(),
            });
        }
        Ok(self.photos.lock().unwrap().get(user_external_id).cloned())
    }
}

/// In-memory [`PhotoStore`].
#[derive(Default)]
pub struct MemoryPhotoStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    puts: AtomicUsize,
}

impl MemoryPhotoStore {
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs.lock().unwrap().get(path).cloned()
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PhotoStore for MemoryPhotoStore {
    async fn put(&self, path: &str, bytes: &[u8]) -> std::io::Result<()> {
        self.blobs
            .lock()
            .unwrap()
            .insert(path.to_string(), bytes.to_vec());
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn exists(&self, path: &str) -> bool {
        self.blobs.lock().unwrap().contains_key(path)
    }
}

/// In-memory [`LeaseStore`].
#[derive(Default)]
pub struct MemoryLeaseStore {
    leases: Mutex<HashMap<String, (Uuid, Instant)>>,
}

impl MemoryLeaseStore {
    /// Pre-holds a lease on behalf of some other worker.
    pub fn hold(&self, job_name: &str, ttl: Duration) -> Uuid {
        let holder = Uuid::new_v4();
        self.leases
            .lock()
            .unwrap()
            .insert(job_name.to_string(), (holder, Instant::now() + ttl));
        holder
    }

    pub fn is_held(&self, job_name: &str) -> bool {
        self.leases
            .lock()
            .unwrap()
            .get(job_name)
            .is_some_and(|(_, expires)| *expires > Instant::now())
    }
}

#[async_trait]
impl LeaseStore for MemoryLeaseStore {
    async fn acquire(&self, job_name: &str, holder: Uuid, ttl: Duration) -> Result<bool, DbError> {
        let mut leases = self.leases.lock().unwrap();
        if let Some((_, expires)) = leases.get(job_name) {
            if *expires > Instant::now() {
                return Ok(false);
            }
        }
        leases.insert(job_name.to_string(), (holder, Instant::now() + ttl));
        Ok(true)
    }

    async fn release(&self, job_name: &str, holder: Uuid) -> Result<(), DbError> {
        let mut leases = self.leases.lock().unwrap();
        if leases.get(job_name).is_some_and(|(h, _)| *h == holder) {
            leases.remove(job_name);
        }
        Ok(())
    }
}
