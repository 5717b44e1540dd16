use parking_lot::RwLock;
use tracker_core::{Identified, Product, User};

/// Plain list with one selected element, for entities without pagination
struct Listing<T> {
    items: Vec<T>,
    selected: Option<T>,
}

impl<T: Identified + Clone> Listing<T> {
    fn new() -> Self {
        Listing {
            items: Vec::new(),
            selected: None,
        }
    }

    /// Replace the element with the same id, or append it
    fn upsert(&mut self, item: T) {
        match self.items.iter_mut().find(|existing| existing.id() == item.id()) {
            Some(slot) => *slot = item,
            None => self.items.push(item),
        }
    }

    fn remove(&mut self, id: &T::Id) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id() != id);
        if self.selected.as_ref().is_some_and(|s| s.id() == id) {
            self.selected = None;
        }
        self.items.len() != before
    }
}

pub struct ProductsStore {
    state: RwLock<Listing<Product>>,
}

impl ProductsStore {
    pub fn new() -> Self {
        ProductsStore {
            state: RwLock::new(Listing::new()),
        }
    }

    pub fn products(&self) -> Vec<Product> {
        self.state.read().items.clone()
    }

    pub fn set_products(&self, products: Vec<Product>) {
        self.state.write().items = products;
    }

    pub fn upsert(&self, product: Product) {
        self.state.write().upsert(product);
    }

    pub fn remove(&self, id: i64) -> bool {
        self.state.write().remove(&id)
    }

    pub fn selected(&self) -> Option<Product> {
        self.state.read().selected.clone()
    }

    pub fn select(&self, product: Option<Product>) {
        self.state.write().selected = product;
    }
}

impl Default for ProductsStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Users, split into staff (internal) and customer (external) accounts
pub struct UsersStore {
    state: RwLock<Listing<User>>,
}

impl UsersStore {
    pub fn new() -> Self {
        UsersStore {
            state: RwLock::new(Listing::new()),
        }
    }

    pub fn users(&self) -> Vec<User> {
        self.state.read().items.clone()
    }

    pub fn internal(&self) -> Vec<User> {
        self.state
            .read()
            .items
            .iter()
            .filter(|u| u.is_internal())
            .cloned()
            .collect()
    }

    pub fn external(&self) -> Vec<User> {
        self.state
            .read()
            .items
            .iter()
            .filter(|u| u.is_external())
            .cloned()
            .collect()
    }

    pub fn set_users(&self, users: Vec<User>) {
        self.state.write().items = users;
    }

    pub fn upsert(&self, user: User) {
        self.state.write().upsert(user);
    }

    pub fn remove(&self, id: i64) -> bool {
        self.state.write().remove(&id)
    }

    pub fn selected(&self) -> Option<User> {
        self.state.read().selected.clone()
    }

    pub fn select(&self, user: Option<User>) {
        self.state.write().selected = user;
    }
}

impl Default for UsersStore {
    fn default() -> Self {
        Self::new()
    }
}
