use std::collections::VecDeque;

use tracker_core::{Identified, Pagination, total_pages};

/// Bounded, ordered slice of a collection currently materialized for display.
///
/// Invariants: `items.len() <= page_size` and
/// `total_pages == ceil(total_elements / page_size)` after every mutation.
/// `loaded_page` is the page the items were fetched for; any query change
/// clears it until the next fetched page replaces the items.
#[derive(Debug, Clone, PartialEq)]
pub struct PagedWindow<T> {
    items: VecDeque<T>,
    current_page: u32,
    page_size: u32,
    sort_key: String,
    total_elements: u64,
    total_pages: u32,
    loaded_page: Option<u32>,
}

impl<T> PagedWindow<T> {
    pub fn new(page_size: u32, sort_key: impl Into<String>) -> Self {
        PagedWindow {
            items: VecDeque::new(),
            current_page: 0,
            page_size: page_size.max(1),
            sort_key: sort_key.into(),
            total_elements: 0,
            total_pages: 0,
            loaded_page: None,
        }
    }

    pub fn items(&self) -> &VecDeque<T> {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity()
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn sort_key(&self) -> &str {
        &self.sort_key
    }

    pub fn total_elements(&self) -> u64 {
        self.total_elements
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Page the displayed items were fetched for. `None` while a query
    /// change is waiting for its page.
    pub fn loaded_page(&self) -> Option<u32> {
        self.loaded_page
    }

    /// Live-tail policy: pushes only show up while the items on display
    /// are the first page of the current query
    pub fn is_live_tail(&self) -> bool {
        self.current_page == 0 && self.loaded_page == Some(0)
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.current_page, self.total_elements, self.total_pages)
    }

    /// Replace items and pagination with a fetched page.
    ///
    /// Page count is derived from `total_elements` and the window's page
    /// size; extra items beyond the page size are dropped.
    pub fn replace(&mut self, items: Vec<T>, pagination: Pagination) {
        self.items = items.into_iter().take(self.capacity()).collect();
        self.current_page = pagination.current_page;
        self.loaded_page = Some(pagination.current_page);
        self.total_elements = pagination.total_elements;
        self.recompute_total_pages();
    }

    /// Prepend a freshly created item, evicting the oldest one when full.
    ///
    /// Returns false without touching anything when not on the first page.
    pub fn push_front_bounded(&mut self, item: T) -> bool {
        if !self.is_live_tail() {
            return false;
        }

        self.items.truncate(self.capacity().saturating_sub(1));
        self.items.push_front(item);
        self.total_elements += 1;
        self.recompute_total_pages();
        true
    }

    /// Replace the first element matching `pred`, keeping its position
    pub fn replace_where<F>(&mut self, pred: F, item: T) -> bool
    where
        F: Fn(&T) -> bool,
    {
        match self.items.iter_mut().find(|existing| pred(existing)) {
            Some(slot) => {
                *slot = item;
                true
            }
            None => false,
        }
    }

    /// Mutate the first element matching `pred` in place
    pub fn modify_where<P, F>(&mut self, pred: P, f: F) -> bool
    where
        P: Fn(&T) -> bool,
        F: FnOnce(&mut T),
    {
        match self.items.iter_mut().find(|existing| pred(existing)) {
            Some(slot) => {
                f(slot);
                true
            }
            None => false,
        }
    }

    pub fn set_current_page(&mut self, page: u32) {
        self.current_page = page;
        self.invalidate();
    }

    /// Mark the items as belonging to a superseded query
    pub fn invalidate(&mut self) {
        self.loaded_page = None;
    }

    /// Change the page size. Items beyond the new size are dropped.
    pub fn set_page_size(&mut self, page_size: u32) {
        self.page_size = page_size.max(1);
        let capacity = self.capacity();
        self.items.truncate(capacity);
        self.recompute_total_pages();
        self.invalidate();
    }

    pub fn set_sort_key(&mut self, sort_key: impl Into<String>) {
        self.sort_key = sort_key.into();
        self.invalidate();
    }

    fn capacity(&self) -> usize {
        usize::try_from(self.page_size).unwrap_or(usize::MAX)
    }

    fn recompute_total_pages(&mut self) {
        self.total_pages = total_pages(self.total_elements, self.page_size);
    }
}

impl<T: Identified> PagedWindow<T> {
    /// Replace the element carrying the same id as `item`
    pub fn replace_by_id(&mut self, item: T) -> bool {
        let id = item.id().clone();
        self.replace_where(|existing| *existing.id() == id, item)
    }

    pub fn position_of(&self, id: &T::Id) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }
}

/// Most recently received instance of an entity, independent of pagination
#[derive(Debug, Clone, PartialEq)]
pub struct LiveSlot<T>(Option<T>);

impl<T> LiveSlot<T> {
    pub fn empty() -> Self {
        LiveSlot(None)
    }

    pub fn set(&mut self, item: T) {
        self.0 = Some(item);
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }

    pub fn get(&self) -> Option<&T> {
        self.0.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

impl<T> Default for LiveSlot<T> {
    fn default() -> Self {
        Self::empty()
    }
}
