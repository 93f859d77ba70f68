//! In-memory stand-in for the posts HTTP API.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use luvhive_state::{Record, Remote, Session, SessionError};

use super::records::Post;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    Unavailable,
    Unauthorized(SessionError),
    NotFound(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unavailable => write!(f, "service unavailable"),
            ApiError::Unauthorized(err) => write!(f, "unauthorized: {}", err),
            ApiError::NotFound(id) => write!(f, "not found: {}", id),
        }
    }
}

/// Server state shared by every client handle.
#[derive(Default)]
pub struct Server {
    pub posts: Vec<Post>,
    pub available: bool,
    pub assign_ids: bool,
    pub next_id: u64,
    /// Idempotency key -> id of the post it created.
    pub created: HashMap<String, String>,
    /// Header lines seen, `name: value`.
    pub requests: Vec<String>,
}

#[derive(Clone)]
pub struct PostsApi {
    session: Session,
    server: Arc<Mutex<Server>>,
}

impl PostsApi {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            server: Arc::new(Mutex::new(Server {
                available: true,
                next_id: 1,
                ..Default::default()
            })),
        }
    }

    pub fn server(&self) -> std::sync::MutexGuard<'_, Server> {
        self.server.lock().unwrap()
    }

    pub fn set_available(&self, available: bool) {
        self.server().available = available;
    }

    fn begin(&self, headers: Vec<(&'static str, String)>) -> Result<(), ApiError> {
        let mut server = self.server();
        for (name, value) in headers {
            server.requests.push(format!("{}: {}", name, value));
        }
        if server.available {
            Ok(())
        } else {
            Err(ApiError::Unavailable)
        }
    }

    fn auth(&self) -> Result<Vec<(&'static str, String)>, ApiError> {
        self.session
            .auth_header()
            .map(|header| vec![header])
            .map_err(ApiError::Unauthorized)
    }
}

impl Remote<Post> for PostsApi {
    type Error = ApiError;

    fn fetch(&mut self) -> Result<Vec<Post>, ApiError> {
        self.begin(self.auth()?)?;
        Ok(self.server().posts.clone())
    }

    fn create(&mut self, record: &Post, idempotency_key: &str) -> Result<Post, ApiError> {
        let headers = self
            .session
            .create_headers(idempotency_key)
            .map_err(ApiError::Unauthorized)?;
        self.begin(headers)?;

        let mut server = self.server();
        if let Some(existing) = server.created.get(idempotency_key).cloned() {
            if let Some(post) = server.posts.iter().find(|p| p.id() == existing) {
                return Ok(post.clone());
            }
        }

        let mut post = record.clone();
        if server.assign_ids {
            post.id = format!("srv-{}", server.next_id);
            server.next_id += 1;
        }
        server
            .created
            .insert(idempotency_key.to_string(), post.id.clone());
        server.posts.insert(0, post.clone());
        Ok(post)
    }

    fn update(&mut self, record: &Post) -> Result<Post, ApiError> {
        self.begin(self.auth()?)?;
        let mut server = self.server();
        let slot = server
            .posts
            .iter_mut()
            .find(|p| p.id == record.id)
            .ok_or_else(|| ApiError::NotFound(record.id.clone()))?;
        *slot = record.clone();
        Ok(record.clone())
    }

    fn delete(&mut self, id: &str) -> Result<(), ApiError> {
        self.begin(self.auth()?)?;
        let mut server = self.server();
        let before = server.posts.len();
        server.posts.retain(|p| p.id != id);
        if server.posts.len() == before {
            return Err(ApiError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
