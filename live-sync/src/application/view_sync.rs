//! Per-view synchronization
//!
//! A mounted view issues paged fetches keyed by its store's query state and
//! keeps one scoped topic subscription merging pushes into the same store.

use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::watch;
use tracker_core::{Identified, OrderId};

use super::error::SyncError;
use super::push_channel::PushChannel;
use super::registry::{MessageHandler, typed_handler};
use super::stores::LiveStore;
use super::topic_guard::TopicGuard;
use crate::domain::{FetchError, MountToken, PageFetcher, Topic, TopicKind, ViewPhase, WriteOutcome};

/// How pushed items are merged into the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// New entity: prepend to the live tail
    Insert,
    /// Existing entity changed: replace by id, never insert
    UpdateInPlace,
}

/// Push stream a view listens to, scoped by the view's order id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicBinding {
    pub kind: TopicKind,
    pub policy: MergePolicy,
}

impl TopicBinding {
    pub fn new(kind: TopicKind, policy: MergePolicy) -> Self {
        TopicBinding { kind, policy }
    }
}

/// One mounted view over a [`LiveStore`]
pub struct ViewSync<T, F: ?Sized> {
    store: Arc<LiveStore<T>>,
    fetcher: Arc<F>,
    scope: Option<OrderId>,
    token: MountToken,
    phase: watch::Sender<ViewPhase>,
    last_error: RwLock<Option<FetchError>>,
    subscription: Mutex<Option<TopicGuard>>,
}

impl<T, F> ViewSync<T, F>
where
    T: Identified + Clone + DeserializeOwned + Send + Sync + 'static,
    F: PageFetcher<T> + ?Sized,
{
    /// Mount without fetching. Subscribes when both a scope and a binding
    /// are given; a blank scope opens nothing.
    pub fn new(
        channel: &Arc<PushChannel>,
        store: Arc<LiveStore<T>>,
        fetcher: Arc<F>,
        scope: Option<OrderId>,
        binding: Option<TopicBinding>,
    ) -> Self {
        let token = MountToken::new();

        let subscription = match (scope.as_ref(), binding) {
            (Some(id), Some(binding)) => Topic::scoped(binding.kind, id).map(|topic| {
                let handler = push_handler(topic.clone(), Arc::clone(&store), token.clone(), binding.policy);
                TopicGuard::open(channel, topic, handler)
            }),
            _ => None,
        };

        let (phase, _) = watch::channel(ViewPhase::Idle);
        ViewSync {
            store,
            fetcher,
            scope,
            token,
            phase,
            last_error: RwLock::new(None),
            subscription: Mutex::new(subscription),
        }
    }

    /// Mount and run the first fetch. A failed fetch leaves the view mounted
    /// in [`ViewPhase::Failed`].
    pub async fn mount(
        channel: &Arc<PushChannel>,
        store: Arc<LiveStore<T>>,
        fetcher: Arc<F>,
        scope: Option<OrderId>,
        binding: Option<TopicBinding>,
    ) -> Self {
        let view = Self::new(channel, store, fetcher, scope, binding);
        // Outcome is kept in phase and last_error
        let _ = view.refresh().await;
        view
    }

    /// Fetch the page matching the store's current query and commit it.
    ///
    /// On failure the store keeps its previous contents.
    pub async fn refresh(&self) -> Result<(), SyncError> {
        if !self.token.is_active() {
            return Err(SyncError::Unmounted);
        }

        self.phase.send_replace(ViewPhase::Fetching);
        let query = self.store.query(self.scope.as_ref());
        let stamp = self.store.begin_write();

        let result = self.fetcher.fetch_page(&query).await;

        if !self.token.is_active() {
            tracing::debug!(page = query.page, "discarding fetch completed after unmount");
            return Err(SyncError::Unmounted);
        }

        match result {
            Ok(page) => {
                if self.store.commit_fetch(page, stamp) == WriteOutcome::Stale {
                    tracing::debug!(page = query.page, "fetch superseded by a newer write");
                }
                *self.last_error.write() = None;
                self.phase.send_replace(ViewPhase::Synced);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(page = query.page, error = %e, "fetch failed, keeping previous data");
                *self.last_error.write() = Some(e.clone());
                self.phase.send_replace(ViewPhase::Failed);
                Err(SyncError::Fetch(e))
            }
        }
    }

    pub async fn set_page(&self, page: u32) -> Result<bool, SyncError> {
        let changed = self.store.set_page(page);
        self.refetch_if(changed).await
    }

    pub async fn set_page_size(&self, page_size: u32) -> Result<bool, SyncError> {
        let changed = self.store.set_page_size(page_size);
        self.refetch_if(changed).await
    }

    pub async fn set_sort(&self, sort_key: &str) -> Result<bool, SyncError> {
        let changed = self.store.set_sort(sort_key);
        self.refetch_if(changed).await
    }

    pub async fn set_filter(&self, filter: Option<Vec<String>>) -> Result<bool, SyncError> {
        let changed = self.store.set_filter(filter);
        self.refetch_if(changed).await
    }

    async fn refetch_if(&self, changed: bool) -> Result<bool, SyncError> {
        if changed {
            self.refresh().await?;
        }
        Ok(changed)
    }
}

impl<T, F: ?Sized> ViewSync<T, F> {
    /// Stop writing into the store and release the topic. Runs once; later
    /// calls return false.
    pub fn unmount(&self) -> bool {
        if !self.token.invalidate() {
            return false;
        }

        let released = self.subscription.lock().take();
        if let Some(guard) = &released {
            tracing::debug!(topic = %guard.topic(), "view unmounted");
        }
        drop(released);

        self.phase.send_replace(ViewPhase::Unmounted);
        true
    }

    pub fn is_mounted(&self) -> bool {
        self.token.is_active()
    }

    pub fn phase(&self) -> ViewPhase {
        *self.phase.borrow()
    }

    pub fn watch_phase(&self) -> watch::Receiver<ViewPhase> {
        self.phase.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.phase().is_loading()
    }

    pub fn last_error(&self) -> Option<FetchError> {
        self.last_error.read().clone()
    }

    pub fn store(&self) -> &Arc<LiveStore<T>> {
        &self.store
    }

    pub fn scope(&self) -> Option<&OrderId> {
        self.scope.as_ref()
    }

    pub fn topic(&self) -> Option<Topic> {
        self.subscription.lock().as_ref().map(|guard| guard.topic().clone())
    }
}

impl<T, F: ?Sized> Drop for ViewSync<T, F> {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn push_handler<T>(
    topic: Topic,
    store: Arc<LiveStore<T>>,
    token: MountToken,
    policy: MergePolicy,
) -> MessageHandler
where
    T: Identified + Clone + DeserializeOwned + Send + Sync + 'static,
{
    typed_handler(topic, move |item: T| {
        if !token.is_active() {
            return;
        }
        match policy {
            MergePolicy::Insert => {
                store.push_insert(item);
            }
            MergePolicy::UpdateInPlace => {
                store.merge_by_id(item);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::registry::SubscriptionRegistry;
    use crate::domain::{ChannelError, Connector, Credential, Session};
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tracker_core::{Page, PageQuery, Pagination};

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Sample {
        id: u32,
        value: i64,
    }

    impl Identified for Sample {
        type Id = u32;

        fn id(&self) -> &u32 {
            &self.id
        }
    }

    struct OfflineConnector;

    #[async_trait]
    impl Connector for OfflineConnector {
        async fn open(&self, _: &Credential) -> Result<Session, ChannelError> {
            Err(ChannelError::Connection("offline".into()))
        }
    }

    /// Serves pages of `total` samples, or fails when told to
    struct StubFetcher {
        total: u64,
        fail: std::sync::atomic::AtomicBool,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl StubFetcher {
        fn new(total: u64) -> Self {
            StubFetcher {
                total,
                fail: Default::default(),
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl PageFetcher<Sample> for StubFetcher {
        async fn fetch_page(&self, query: &PageQuery) -> Result<Page<Sample>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(FetchError::Api {
                    status: 503,
                    message: "unavailable".into(),
                });
            }
            let start = query.page * query.size;
            let items = (start..start + query.size)
                .filter(|i| (*i as u64) < self.total)
                .map(|i| Sample { id: i, value: 0 })
                .collect();
            Ok(Page::new(items, Pagination::new(query.page, self.total, 0)))
        }
    }

    fn channel() -> Arc<PushChannel> {
        Arc::new(PushChannel::with_registry(
            Arc::new(OfflineConnector),
            Arc::new(SubscriptionRegistry::new()),
            Duration::from_secs(1),
        ))
    }

    fn scope() -> Option<OrderId> {
        Some(OrderId::new("42"))
    }

    fn insert_binding() -> Option<TopicBinding> {
        Some(TopicBinding::new(TopicKind::OrderDetails, MergePolicy::Insert))
    }

    #[tokio::test]
    async fn test_mount_fetches_and_subscribes() {
        let channel = channel();
        let store = Arc::new(LiveStore::<Sample>::new(5, "timeStamp"));
        let fetcher = Arc::new(StubFetcher::new(42));

        let view = ViewSync::mount(&channel, store.clone(), fetcher, scope(), insert_binding()).await;

        assert_eq!(view.phase(), ViewPhase::Synced);
        assert_eq!(store.items().len(), 5);
        assert_eq!(store.pagination().total_pages, 9);
        assert_eq!(
            view.topic().map(|t| t.to_string()),
            Some("/topic/details/order/42".to_string())
        );
        assert!(channel.registry().contains(&Topic::new("/topic/details/order/42")));
    }

    #[tokio::test]
    async fn test_push_routes_into_store() {
        let channel = channel();
        let store = Arc::new(LiveStore::<Sample>::new(5, "timeStamp"));
        let _view = ViewSync::mount(
            &channel,
            store.clone(),
            Arc::new(StubFetcher::new(42)),
            scope(),
            insert_binding(),
        )
        .await;

        channel
            .registry()
            .dispatch(None, "/topic/details/order/42", r#"{"id": 100, "value": 7}"#);

        assert_eq!(store.items()[0].id, 100);
        assert_eq!(store.pagination().total_elements, 43);
        assert_eq!(store.live().map(|s| s.value), Some(7));
    }

    #[tokio::test]
    async fn test_update_in_place_binding_never_inserts() {
        let channel = channel();
        let store = Arc::new(LiveStore::<Sample>::new(5, "timeStamp"));
        let _view = ViewSync::mount(
            &channel,
            store.clone(),
            Arc::new(StubFetcher::new(3)),
            scope(),
            Some(TopicBinding::new(TopicKind::OrderAlarms, MergePolicy::UpdateInPlace)),
        )
        .await;

        let registry = channel.registry();
        registry.dispatch(None, "/topic/alarms/order/42", r#"{"id": 1, "value": 9}"#);
        registry.dispatch(None, "/topic/alarms/order/42", r#"{"id": 50, "value": 3}"#);

        let items = store.items();
        assert_eq!(items.len(), 3);
        assert_eq!(items[1], Sample { id: 1, value: 9 });
        assert_eq!(store.live(), Some(Sample { id: 50, value: 3 }));
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_previous_window() {
        let channel = channel();
        let store = Arc::new(LiveStore::<Sample>::new(5, "timeStamp"));
        let fetcher = Arc::new(StubFetcher::new(42));
        let view = ViewSync::mount(&channel, store.clone(), fetcher.clone(), scope(), None).await;
        let before = store.window();

        fetcher.fail.store(true, Ordering::SeqCst);
        let result = view.set_page(2).await;

        assert!(matches!(result, Err(SyncError::Fetch(FetchError::Api { status: 503, .. }))));
        assert_eq!(view.phase(), ViewPhase::Failed);
        assert_eq!(store.items(), before.items().iter().cloned().collect::<Vec<_>>());
        assert!(view.last_error().is_some());

        fetcher.fail.store(false, Ordering::SeqCst);
        view.refresh().await.unwrap();
        assert_eq!(view.phase(), ViewPhase::Synced);
        assert!(view.last_error().is_none());
        assert_eq!(store.items()[0].id, 10);
    }

    #[tokio::test]
    async fn test_failed_page_change_keeps_pushes_out_of_old_rows() {
        let channel = channel();
        let store = Arc::new(LiveStore::<Sample>::new(5, "timeStamp"));
        let fetcher = Arc::new(StubFetcher::new(42));
        let view = ViewSync::mount(&channel, store.clone(), fetcher.clone(), scope(), insert_binding()).await;
        assert_eq!(view.set_page(2).await, Ok(true));

        fetcher.fail.store(true, Ordering::SeqCst);
        assert!(view.set_page(0).await.is_err());
        assert_eq!(view.phase(), ViewPhase::Failed);

        channel
            .registry()
            .dispatch(None, "/topic/details/order/42", r#"{"id": 100, "value": 7}"#);

        let ids: Vec<u32> = store.items().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![10, 11, 12, 13, 14]);
        assert_eq!(store.pagination().total_elements, 42);
        assert_eq!(store.live().map(|s| s.id), Some(100));

        fetcher.fail.store(false, Ordering::SeqCst);
        view.refresh().await.unwrap();
        assert_eq!(store.items()[0].id, 0);
        assert_eq!(store.loaded_page(), Some(0));
    }

    #[tokio::test]
    async fn test_unchanged_setter_does_not_fetch() {
        let channel = channel();
        let store = Arc::new(LiveStore::<Sample>::new(5, "timeStamp"));
        let fetcher = Arc::new(StubFetcher::new(42));
        let view = ViewSync::mount(&channel, store, fetcher.clone(), None, None).await;

        assert_eq!(view.set_page(0).await, Ok(false));
        assert_eq!(view.set_sort("timeStamp").await, Ok(false));
        assert_eq!(view.set_filter(None).await, Ok(false));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        assert_eq!(view.set_sort("temperature").await, Ok(true));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_blank_scope_opens_no_topic() {
        let channel = channel();
        let store = Arc::new(LiveStore::<Sample>::new(5, "timeStamp"));
        let view = ViewSync::new(
            &channel,
            store,
            Arc::new(StubFetcher::new(0)),
            Some(OrderId::new("")),
            insert_binding(),
        );

        assert!(view.topic().is_none());
        assert!(channel.registry().is_empty());
    }

    #[tokio::test]
    async fn test_unmount_runs_once_and_blocks_late_writes() {
        let channel = channel();
        let store = Arc::new(LiveStore::<Sample>::new(5, "timeStamp"));
        let view = ViewSync::new(
            &channel,
            store.clone(),
            Arc::new(StubFetcher::new(42)),
            scope(),
            insert_binding(),
        );
        let registry = Arc::clone(channel.registry());

        assert!(view.unmount());
        assert!(!view.unmount());
        assert_eq!(view.phase(), ViewPhase::Unmounted);
        assert!(registry.is_empty());
        assert_eq!(view.refresh().await, Err(SyncError::Unmounted));

        drop(view);
        assert!(store.items().is_empty());
    }

    #[tokio::test]
    async fn test_late_fetch_after_unmount_is_discarded() {
        let channel = channel();
        let store = Arc::new(LiveStore::<Sample>::new(5, "timeStamp"));
        let mut fetcher = StubFetcher::new(42);
        fetcher.delay = Duration::from_millis(50);
        let view = Arc::new(ViewSync::new(&channel, store.clone(), Arc::new(fetcher), scope(), None));

        let pending = {
            let view = Arc::clone(&view);
            tokio::spawn(async move { view.refresh().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        view.unmount();

        assert_eq!(pending.await.unwrap(), Err(SyncError::Unmounted));
        assert!(store.items().is_empty());
    }

    #[tokio::test]
    async fn test_drop_releases_subscription() {
        let channel = channel();
        let store = Arc::new(LiveStore::<Sample>::new(5, "timeStamp"));
        {
            let _view = ViewSync::new(
                &channel,
                store,
                Arc::new(StubFetcher::new(0)),
                scope(),
                insert_binding(),
            );
            assert_eq!(channel.registry().len(), 1);
        }
        assert!(channel.registry().is_empty());
    }
}
