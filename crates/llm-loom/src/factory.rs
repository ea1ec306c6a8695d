//! Context factory: fresh contexts and per-thread reusable ones.
//!
//! A [`ContextFactory`] couples a shared [`SchemaRegistry`] with a
//! [`ContextConfig`] and stamps out [`ChatContext`]s.
//! [`create_context`](ContextFactory::create_context) returns a fresh,
//! caller-owned context; [`with_thread_context`](ContextFactory::with_thread_context)
//! lends out a context stored in thread-local storage, keyed by
//! (factory, thread, provider) — the same thread always observes the
//! same context for the same provider name.
//!
//! Thread-local contexts suit short-lived request handlers. The
//! closure-based API means the reference cannot escape its thread,
//! which is exactly the sharing contract a context requires. Entries
//! die with their thread; entries belonging to a dropped factory are
//! pruned lazily on the next access from that thread.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crate::config::ContextConfig;
use crate::context::ChatContext;
use crate::error::LoomError;
use crate::registry::SchemaRegistry;
use crate::session::ChatSession;
use crate::transport::HttpTransport;

static NEXT_FACTORY_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_CONTEXTS: RefCell<HashMap<(u64, String), ThreadEntry>> =
        RefCell::new(HashMap::new());
}

struct ThreadEntry {
    context: ChatContext,
    factory_alive: Weak<()>,
}

/// Creates [`ChatContext`]s from a shared registry.
#[derive(Debug)]
pub struct ContextFactory {
    registry: Arc<SchemaRegistry>,
    config: ContextConfig,
    id: u64,
    liveness: Arc<()>,
}

impl ContextFactory {
    /// Creates a factory over `registry` with default context config.
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self::with_config(registry, ContextConfig::default())
    }

    /// Creates a factory that applies `config` to every context.
    pub fn with_config(registry: Arc<SchemaRegistry>, config: ContextConfig) -> Self {
        Self {
            registry,
            config,
            id: NEXT_FACTORY_ID.fetch_add(1, Ordering::Relaxed),
            liveness: Arc::new(()),
        }
    }

    /// The registry this factory draws schemas from.
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Builds a fresh context for `provider` and hands over ownership.
    pub fn create_context(&self, provider: &str) -> Result<ChatContext, LoomError> {
        let schema = self.registry.load(provider)?;
        ChatContext::new(schema, self.config.clone())
    }

    /// Builds a fresh context wired to `transport` as a session.
    pub fn create_session(
        &self,
        provider: &str,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<ChatSession, LoomError> {
        Ok(ChatSession::new(self.create_context(provider)?, transport))
    }

    /// Runs `f` with this thread's context for `provider`, creating it
    /// on first access. Subsequent calls on the same thread observe the
    /// same context object — accumulated messages included.
    ///
    /// Do not call this reentrantly from inside `f`; the thread-local
    /// store is borrowed for the duration of the closure.
    pub fn with_thread_context<R>(
        &self,
        provider: &str,
        f: impl FnOnce(&mut ChatContext) -> R,
    ) -> Result<R, LoomError> {
        THREAD_CONTEXTS.with(|store| {
            let mut store = store.borrow_mut();

            // Entries whose factory has been dropped are unreachable by
            // key; collect them while we're here.
            store.retain(|_, entry| entry.factory_alive.strong_count() > 0);

            let key = (self.id, provider.to_string());
            if !store.contains_key(&key) {
                let context = self.create_context(provider)?;
                store.insert(
                    key.clone(),
                    ThreadEntry {
                        context,
                        factory_alive: Arc::downgrade(&self.liveness),
                    },
                );
            }
            let entry = store.get_mut(&key).expect("entry inserted above");
            Ok(f(&mut entry.context))
        })
    }

    /// Number of thread-local entries on the calling thread, across all
    /// factories. Test instrumentation.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn thread_cache_len() -> usize {
        THREAD_CONTEXTS.with(|store| store.borrow().len())
    }
}
