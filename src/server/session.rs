//! Session attachment through a pluggable store.
//!
//! A [`SessionStore`] looks a session up by name for a request and persists
//! it again through the response. [`MemoryStore`] keeps values in process
//! and identifies sessions by a random id carried in a cookie named after
//! the session. Sessions must be saved before the response head is sent,
//! since saving adds a `Set-Cookie` header.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::server::context::RequestContext;
use crate::server::error::Error;

/// The `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

/// Cookie attributes for a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub path: String,
    pub domain: Option<String>,
    /// Lifetime in seconds. `0` makes a browser-session cookie; a negative
    /// value deletes the session when it is saved.
    pub max_age: i64,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            domain: None,
            max_age: 86400 * 30,
            secure: false,
            http_only: true,
            same_site: SameSite::Lax,
        }
    }
}

impl SessionOptions {
    /// Render a `Set-Cookie` value.
    pub fn cookie(&self, name: &str, value: &str) -> String {
        let mut cookie = format!("{name}={value}; Path={}", self.path);
        if let Some(domain) = &self.domain {
            let _ = write!(cookie, "; Domain={domain}");
        }
        if self.max_age < 0 {
            cookie.push_str("; Max-Age=0");
        } else if self.max_age > 0 {
            let _ = write!(cookie, "; Max-Age={}", self.max_age);
        }
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str(match self.same_site {
            SameSite::Strict => "; SameSite=Strict",
            SameSite::Lax => "; SameSite=Lax",
            SameSite::None => "; SameSite=None",
        });
        cookie
    }
}

/// The values of one session.
#[derive(Debug, Clone)]
pub struct SessionData {
    id: String,
    name: String,
    values: HashMap<String, Value>,
    pub options: SessionOptions,
    is_new: bool,
}

impl SessionData {
    /// A fresh, empty session with a random id.
    pub fn new(name: impl Into<String>, options: SessionOptions) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            name: name.into(),
            values: HashMap::new(),
            options,
            is_new: true,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the store had no record of this session.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// A value, if present and of the requested type.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn insert<T: Serialize>(&mut self, key: impl Into<String>, value: T) -> Result<(), Error> {
        self.values.insert(key.into(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn values(&self) -> &HashMap<String, Value> {
        &self.values
    }
}

/// Where sessions live between requests. Stores are shared across
/// connection tasks and do their own locking.
pub trait SessionStore: Send + Sync {
    /// Fetch the named session for this request, or a new one.
    fn get(&self, ctx: &RequestContext, name: &str) -> Result<SessionData, Error>;

    /// Persist `session` and tell the client how to find it again.
    fn save(&self, session: &SessionData, ctx: &mut RequestContext) -> Result<(), Error>;
}

struct StoredSession {
    values: HashMap<String, Value>,
    /// `None` for browser-session cookies (`max_age == 0`).
    expires_at: Option<Instant>,
}

impl StoredSession {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// In-process session store. Entries are dropped once their `max_age` has
/// passed; expired entries are pruned on every `get` and `save`.
#[derive(Default)]
pub struct MemoryStore {
    options: SessionOptions,
    sessions: Mutex<HashMap<String, StoredSession>>,
}

impl MemoryStore {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            options,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Number of stored sessions.
    pub fn len(&self) -> usize {
        self.lock().map(|sessions| sessions.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every session that expired at or before `now`.
    pub(crate) fn purge_expired(&self, now: Instant) -> Result<(), Error> {
        self.lock()?.retain(|_, stored| !stored.is_expired(now));
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, StoredSession>>, Error> {
        self.sessions
            .lock()
            .map_err(|_| Error::SessionError("session store lock poisoned".to_string()))
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, ctx: &RequestContext, name: &str) -> Result<SessionData, Error> {
        self.purge_expired(Instant::now())?;
        let sessions = self.lock()?;
        let stored = ctx
            .request()
            .cookie(name)
            .and_then(|id| sessions.get(&id).map(|stored| (id, stored.values.clone())));

        Ok(match stored {
            Some((id, values)) => SessionData {
                id,
                name: name.to_string(),
                values,
                options: self.options.clone(),
                is_new: false,
            },
            None => SessionData::new(name, self.options.clone()),
        })
    }

    fn save(&self, session: &SessionData, ctx: &mut RequestContext) -> Result<(), Error> {
        let now = Instant::now();
        self.purge_expired(now)?;
        {
            let mut sessions = self.lock()?;
            match u64::try_from(session.options.max_age) {
                Err(_) => {
                    sessions.remove(&session.id);
                }
                Ok(max_age) => {
                    let expires_at = (max_age > 0)
                        .then(|| now.checked_add(Duration::from_secs(max_age)))
                        .flatten();
                    let stored = StoredSession { values: session.values.clone(), expires_at };
                    sessions.insert(session.id.clone(), stored);
                }
            }
        }
        ctx.writer_mut()
            .append_header("Set-Cookie", session.options.cookie(&session.name, &session.id));
        Ok(())
    }
}

/// A request's view of its session: which store to use and with which
/// cookie options.
pub struct Session {
    pub options: SessionOptions,
    store: Arc<dyn SessionStore>,
    data: Option<SessionData>,
}

impl Session {
    pub fn new(options: SessionOptions, store: Arc<dyn SessionStore>) -> Self {
        Self { options, store, data: None }
    }

    /// Fetch or create the session named by the request's session name.
    pub fn start(&mut self, ctx: &RequestContext) -> Result<&mut SessionData, Error> {
        let mut data = self.store.get(ctx, ctx.session_name())?;
        data.options = self.options.clone();
        Ok(self.data.insert(data))
    }

    pub fn data(&self) -> Option<&SessionData> {
        self.data.as_ref()
    }

    pub fn data_mut(&mut self) -> Option<&mut SessionData> {
        self.data.as_mut()
    }

    /// Write the started session back through the store.
    pub fn save(&self, ctx: &mut RequestContext) -> Result<(), Error> {
        let data = self
            .data
            .as_ref()
            .ok_or_else(|| Error::SessionError("session not started".to_string()))?;
        self.store.save(data, ctx)
    }
}
