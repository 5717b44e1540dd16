use parking_lot::RwLock;
use tokio::sync::watch;
use tracker_core::{Identified, OrderId, Page, PageQuery, Pagination};

use crate::domain::{ConsistencyMode, LiveSlot, PagedWindow, Stamp, WriteOutcome};

struct StoreState<T> {
    window: PagedWindow<T>,
    live: LiveSlot<T>,
    filter: Vec<String>,
    clock: u64,
    last_applied: Stamp,
}

impl<T> StoreState<T> {
    fn next_stamp(&mut self) -> Stamp {
        self.clock += 1;
        Stamp(self.clock)
    }

    fn mark_applied(&mut self, stamp: Stamp) {
        self.last_applied = self.last_applied.max(stamp);
    }

    /// Back to the first page after a query change
    fn rewind(&mut self) {
        self.window.set_current_page(0);
    }
}

/// Paged window plus live slot for one entity kind.
///
/// Fetch commits and push merges both write here. Every effective mutation
/// bumps the change counter published through [`watch`](Self::watch).
pub struct LiveStore<T> {
    mode: ConsistencyMode,
    state: RwLock<StoreState<T>>,
    changes: watch::Sender<u64>,
}

impl<T> LiveStore<T>
where
    T: Identified + Clone,
{
    pub fn new(page_size: u32, sort_key: impl Into<String>) -> Self {
        Self::with_mode(page_size, sort_key, ConsistencyMode::default())
    }

    pub fn with_mode(page_size: u32, sort_key: impl Into<String>, mode: ConsistencyMode) -> Self {
        let (changes, _) = watch::channel(0);
        LiveStore {
            mode,
            state: RwLock::new(StoreState {
                window: PagedWindow::new(page_size, sort_key),
                live: LiveSlot::empty(),
                filter: Vec::new(),
                clock: 0,
                last_applied: Stamp(0),
            }),
            changes,
        }
    }

    pub fn mode(&self) -> ConsistencyMode {
        self.mode
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn window(&self) -> PagedWindow<T> {
        self.state.read().window.clone()
    }

    pub fn items(&self) -> Vec<T> {
        self.state.read().window.items().iter().cloned().collect()
    }

    pub fn live(&self) -> Option<T> {
        self.state.read().live.get().cloned()
    }

    pub fn pagination(&self) -> Pagination {
        self.state.read().window.pagination()
    }

    pub fn current_page(&self) -> u32 {
        self.state.read().window.current_page()
    }

    pub fn page_size(&self) -> u32 {
        self.state.read().window.page_size()
    }

    /// Page the displayed items belong to, `None` while a new query is pending
    pub fn loaded_page(&self) -> Option<u32> {
        self.state.read().window.loaded_page()
    }

    pub fn sort_key(&self) -> String {
        self.state.read().window.sort_key().to_string()
    }

    pub fn filter(&self) -> Vec<String> {
        self.state.read().filter.clone()
    }

    pub fn find(&self, id: &T::Id) -> Option<T> {
        let state = self.state.read();
        state
            .window
            .position_of(id)
            .and_then(|pos| state.window.items().get(pos).cloned())
    }

    /// Query matching the current pagination, sort and filter
    pub fn query(&self, scope: Option<&OrderId>) -> PageQuery {
        let state = self.state.read();
        let mut query = PageQuery::new(
            state.window.current_page(),
            state.window.page_size(),
            state.window.sort_key(),
        )
        .with_filter(state.filter.clone());
        if let Some(id) = scope {
            query = query.with_scope(id.clone());
        }
        query
    }

    /// Change counter, bumped on every effective mutation
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    pub fn version(&self) -> u64 {
        *self.changes.borrow()
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Stamp a write about to be issued, typically a fetch request
    pub fn begin_write(&self) -> Stamp {
        self.state.write().next_stamp()
    }

    /// Unconditional replace with a freshly fetched page
    pub fn set_window(&self, items: Vec<T>, pagination: Pagination) {
        let stamp = self.begin_write();
        self.commit_fetch(Page::new(items, pagination), stamp);
    }

    /// Commit a fetched page stamped by [`begin_write`](Self::begin_write).
    ///
    /// In sequenced mode a page older than the last applied write is
    /// rejected.
    pub fn commit_fetch(&self, page: Page<T>, stamp: Stamp) -> WriteOutcome {
        {
            let mut state = self.state.write();
            if self.mode == ConsistencyMode::Sequenced && stamp < state.last_applied {
                tracing::debug!(
                    stamp = stamp.0,
                    last_applied = state.last_applied.0,
                    "rejecting stale fetch commit"
                );
                return WriteOutcome::Stale;
            }
            state.window.replace(page.items, page.pagination);
            state.mark_applied(stamp);
        }
        self.bump();
        WriteOutcome::Applied
    }

    /// Live-tail insert. The live slot always takes the item; the window
    /// only while it holds the fetched first page of the current query.
    /// Returns whether the window changed.
    pub fn push_insert(&self, item: T) -> bool {
        let inserted = {
            let mut state = self.state.write();
            state.live.set(item.clone());
            let inserted = state.window.push_front_bounded(item);
            if inserted {
                let stamp = state.next_stamp();
                state.mark_applied(stamp);
            }
            inserted
        };
        self.bump();
        inserted
    }

    /// Replace the element with the same id in place; never inserts. The
    /// live slot always takes the item. Returns whether the window changed.
    pub fn merge_by_id(&self, item: T) -> bool {
        let replaced = {
            let mut state = self.state.write();
            state.live.set(item.clone());
            let replaced = state.window.replace_by_id(item);
            if replaced {
                let stamp = state.next_stamp();
                state.mark_applied(stamp);
            }
            replaced
        };
        self.bump();
        replaced
    }

    /// Patch the element with `id` in place
    pub fn update_in_window<F>(&self, id: &T::Id, f: F) -> bool
    where
        F: FnOnce(&mut T),
    {
        let updated = {
            let mut state = self.state.write();
            let updated = state.window.modify_where(|item| item.id() == id, f);
            if updated {
                let stamp = state.next_stamp();
                state.mark_applied(stamp);
            }
            updated
        };
        if updated {
            self.bump();
        }
        updated
    }

    pub fn set_live(&self, item: T) {
        self.state.write().live.set(item);
        self.bump();
    }

    pub fn clear_live(&self) {
        let cleared = {
            let mut state = self.state.write();
            let had = !state.live.is_empty();
            state.live.clear();
            had
        };
        if cleared {
            self.bump();
        }
    }

    // ========================================================================
    // Query setters
    // ========================================================================

    /// Move to `page`. Ignored when it is the current page or past the last one.
    pub fn set_page(&self, page: u32) -> bool {
        let changed = {
            let mut state = self.state.write();
            let last = state.window.total_pages().max(1);
            if page == state.window.current_page() || page >= last {
                false
            } else {
                state.window.set_current_page(page);
                true
            }
        };
        self.bump_if(changed)
    }

    pub fn set_page_size(&self, page_size: u32) -> bool {
        let changed = {
            let mut state = self.state.write();
            if page_size == 0 || page_size == state.window.page_size() {
                false
            } else {
                state.window.set_page_size(page_size);
                state.rewind();
                true
            }
        };
        self.bump_if(changed)
    }

    pub fn set_sort(&self, sort_key: impl Into<String>) -> bool {
        let sort_key = sort_key.into();
        let changed = {
            let mut state = self.state.write();
            if sort_key == state.window.sort_key() {
                false
            } else {
                state.window.set_sort_key(sort_key);
                state.rewind();
                true
            }
        };
        self.bump_if(changed)
    }

    /// Replace the filter. `None` leaves it untouched.
    pub fn set_filter(&self, filter: Option<Vec<String>>) -> bool {
        let Some(filter) = filter else {
            return false;
        };
        let changed = {
            let mut state = self.state.write();
            if filter == state.filter {
                false
            } else {
                state.filter = filter;
                state.rewind();
                true
            }
        };
        self.bump_if(changed)
    }

    fn bump(&self) {
        self.changes.send_modify(|version| *version = version.wrapping_add(1));
    }

    fn bump_if(&self, changed: bool) -> bool {
        if changed {
            self.bump();
        }
        changed
    }
}
