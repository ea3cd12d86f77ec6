use std::sync::Arc;

use crate::fs::FileStore;

pub const LISTEN_PORT: u16 = 8080;
/// Target of the `/post` redirect.
pub const REDIRECT_URL: &str = "https://httpbin.org/get";
pub const INDEX_PAGE: &str = "index.html";

pub struct AppState<S> {
    pub store: Arc<S>,
    pub redirect_to: String,
}

impl<S: FileStore> AppState<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
            redirect_to: REDIRECT_URL.to_string(),
        }
    }
}

// Not derived: the store itself need not be `Clone`.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            redirect_to: self.redirect_to.clone(),
        }
    }
}
