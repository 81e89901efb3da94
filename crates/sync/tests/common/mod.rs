//! Shared test doubles and fixtures for the sync engine suites.

#![allow(dead_code)]

use async_trait::async_trait;
use atelier_core::{BackupEntry, ConfigurationSnapshot, LogoEntry, SyncConfig, UploadedImageEntry};
use atelier_storage::{
    MemoryBackend, ObjectMeta, PutOutcome, RemoteAssetStore, StorageResult, StoredObject,
};
use atelier_sync::{Order, OrderAssetService, OrderStore, SyncError, SyncResult};
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub const BASE_URL: &str = "https://cdn.example.com/assets";

/// Zero-pacing configuration matching the seeded fixtures.
pub fn test_cfg() -> SyncConfig {
    SyncConfig {
        public_base_url: BASE_URL.to_string(),
        item_delay_ms: 0,
        order_delay_ms: 0,
        ..SyncConfig::default()
    }
}

pub fn url_for(name: &str) -> String {
    format!("{BASE_URL}/uploads/{name}")
}

pub fn source_key(name: &str) -> String {
    format!("uploads/{name}")
}

pub fn folder_key(order_id: Uuid, name: &str) -> String {
    format!("atelier/orders/{order_id}/{name}")
}

/// A snapshot referencing `logo_names` via URL and `upload_names` via URL.
pub fn snapshot(logo_names: &[&str], upload_names: &[&str]) -> ConfigurationSnapshot {
    ConfigurationSnapshot {
        logos: logo_names
            .iter()
            .map(|n| LogoEntry::with_url(url_for(n)))
            .collect(),
        uploaded_images: upload_names
            .iter()
            .map(|n| UploadedImageEntry::with_url(url_for(n)))
            .collect(),
        ..Default::default()
    }
}

pub fn order(number: &str, snap: ConfigurationSnapshot) -> Order {
    Order {
        id: Uuid::new_v4(),
        order_number: number.to_string(),
        configuration: snap,
        backup_images: Vec::new(),
    }
}

/// In-memory order persistence with switchable write failures.
#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<Uuid, Order>>,
    fail_updates: AtomicBool,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, order: Order) {
        self.orders.write().await.insert(order.id, order);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub async fn contains(&self, order_id: Uuid) -> bool {
        self.orders.read().await.contains_key(&order_id)
    }

    pub async fn backup_images_of(&self, order_id: Uuid) -> Vec<BackupEntry> {
        self.orders
            .read()
            .await
            .get(&order_id)
            .map(|o| o.backup_images.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn get_order(&self, order_id: Uuid) -> SyncResult<Option<Order>> {
        Ok(self.orders.read().await.get(&order_id).cloned())
    }

    async fn get_orders(&self) -> SyncResult<Vec<Order>> {
        let mut all: Vec<Order> = self.orders.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.order_number.cmp(&b.order_number));
        Ok(all)
    }

    async fn update_order_backup_images(
        &self,
        order_id: Uuid,
        entries: Vec<BackupEntry>,
    ) -> SyncResult<Order> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(SyncError::Persistence("injected update fault".to_string()));
        }
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(&order_id)
            .ok_or(SyncError::OrderNotFound(order_id))?;
        order.backup_images = entries;
        Ok(order.clone())
    }

    async fn delete_order(&self, order_id: Uuid) -> SyncResult<()> {
        self.orders
            .write()
            .await
            .remove(&order_id)
            .map(|_| ())
            .ok_or(SyncError::OrderNotFound(order_id))
    }
}

/// In-memory edit-link store with switchable failures.
#[derive(Default)]
pub struct InMemoryLinkStore {
    links: RwLock<HashMap<Uuid, u64>>,
    fail: AtomicBool,
    deleted: AtomicU64,
}

impl InMemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_links(&self, order_id: Uuid, count: u64) {
        self.links.write().await.insert(order_id, count);
    }

    pub fn fail_deletions(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn deleted_total(&self) -> u64 {
        self.deleted.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl atelier_sync::EphemeralLinkStore for InMemoryLinkStore {
    async fn delete_order_links(&self, order_id: Uuid) -> SyncResult<u64> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SyncError::LinkStore("injected link fault".to_string()));
        }
        let count = self.links.write().await.remove(&order_id).unwrap_or(0);
        self.deleted.fetch_add(count, Ordering::SeqCst);
        Ok(count)
    }
}

/// Memory-backed store whose calls for chosen keys never complete.
/// Models a hung remote so tests can assert per-item time bounds.
#[derive(Default)]
pub struct StallingStore {
    inner: MemoryBackend,
    stalled_keys: RwLock<HashSet<String>>,
    stalled_prefixes: RwLock<HashSet<String>>,
}

impl StallingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &MemoryBackend {
        &self.inner
    }

    /// Make exists/get/delete of `key` hang forever.
    pub async fn stall_key(&self, key: &str) {
        self.stalled_keys.write().await.insert(key.to_string());
    }

    /// Make `list` of `prefix` hang forever.
    pub async fn stall_prefix(&self, prefix: &str) {
        self.stalled_prefixes.write().await.insert(prefix.to_string());
    }

    async fn hang_if_stalled(&self, key: &str) {
        if self.stalled_keys.read().await.contains(key) {
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait]
impl RemoteAssetStore for StallingStore {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.hang_if_stalled(key).await;
        self.inner.exists(key).await
    }

    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        self.hang_if_stalled(key).await;
        self.inner.head(key).await
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.hang_if_stalled(key).await;
        self.inner.get(key).await
    }

    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: Option<&str>,
        metadata: &BTreeMap<String, String>,
    ) -> StorageResult<PutOutcome> {
        self.hang_if_stalled(key).await;
        self.inner.put(key, data, content_type, metadata).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.hang_if_stalled(key).await;
        self.inner.delete(key).await
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<StoredObject>> {
        if self.stalled_prefixes.read().await.contains(prefix) {
            std::future::pending::<()>().await;
        }
        self.inner.list(prefix).await
    }

    fn backend_name(&self) -> &'static str {
        "stalling-memory"
    }
}

/// Fully wired engine over in-memory collaborators.
pub struct Harness {
    pub store: Arc<MemoryBackend>,
    pub orders: Arc<InMemoryOrderStore>,
    pub links: Arc<InMemoryLinkStore>,
    pub cfg: SyncConfig,
    pub service: OrderAssetService,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryBackend::new());
        let orders = Arc::new(InMemoryOrderStore::new());
        let links = Arc::new(InMemoryLinkStore::new());
        let cfg = test_cfg();
        let service = OrderAssetService::new(
            store.clone(),
            orders.clone(),
            links.clone(),
            cfg.clone(),
        );
        Self {
            store,
            orders,
            links,
            cfg,
            service,
        }
    }

    /// Seed the source asset behind `uploads/<name>`.
    pub async fn seed_source(&self, name: &str) {
        self.store.seed(&source_key(name), "image-bytes").await;
    }

    /// Seed a copy inside the order folder, as a prior backup would have.
    pub async fn seed_folder_copy(&self, order_id: Uuid, name: &str) {
        self.store.seed(&folder_key(order_id, name), "image-bytes").await;
    }

    /// Insert an order whose snapshot references `names` and whose source
    /// assets all exist.
    pub async fn seeded_order(&self, number: &str, names: &[&str]) -> Order {
        for name in names {
            self.seed_source(name).await;
        }
        let order = order(number, snapshot(names, &[]));
        self.orders.insert(order.clone()).await;
        order
    }
}

/// Engine wired over a [`StallingStore`] with a one-second item timeout,
/// for asserting that hung remote calls are bounded.
pub struct StallingHarness {
    pub store: Arc<StallingStore>,
    pub orders: Arc<InMemoryOrderStore>,
    pub links: Arc<InMemoryLinkStore>,
    pub cfg: SyncConfig,
    pub service: OrderAssetService,
}

impl StallingHarness {
    pub fn new() -> Self {
        let store = Arc::new(StallingStore::new());
        let orders = Arc::new(InMemoryOrderStore::new());
        let links = Arc::new(InMemoryLinkStore::new());
        let cfg = SyncConfig {
            item_timeout_secs: 1,
            ..test_cfg()
        };
        let service = OrderAssetService::new(
            store.clone(),
            orders.clone(),
            links.clone(),
            cfg.clone(),
        );
        Self {
            store,
            orders,
            links,
            cfg,
            service,
        }
    }
}
