//! Servlet container
//!
//! Caches one initialized component per (class, context). Each key owns a
//! `OnceCell`, so concurrent first requests for the same key block on a
//! single construction while other keys proceed independently. Shutdown
//! waits for constructions already running, so every instance that was
//! handed out is also destroyed.

use crate::error::ServletError;
use crate::logger;
use crate::servlet::{ComponentRegistry, Filter, Servlet, ServletConfig, ServletContext};
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::sync::{Arc, PoisonError, RwLock};

/// (class identifier, context path)
type CacheKey = (String, String);

struct InstanceCache<T: ?Sized> {
    slots: DashMap<CacheKey, Arc<OnceCell<Arc<T>>>>,
    // Shared by lookups, exclusive while draining
    lifecycle: RwLock<()>,
}

impl<T: ?Sized> InstanceCache<T> {
    fn new() -> Self {
        Self {
            slots: DashMap::new(),
            lifecycle: RwLock::new(()),
        }
    }

    /// Cached instance for the key, running `create` at most once per key
    ///
    /// A failed `create` leaves the cell empty so a later call retries.
    fn get_or_create<F>(&self, class: &str, context: &ServletContext, create: F) -> Result<Arc<T>, ServletError>
    where
        F: FnOnce() -> Result<Arc<T>, ServletError>,
    {
        let _guard = self.lifecycle.read().unwrap_or_else(PoisonError::into_inner);
        let key = (class.to_string(), context.context_path().to_string());
        // Clone the cell out so the shard lock is not held while initializing
        let slot = Arc::clone(self.slots.entry(key).or_default().value());
        slot.get_or_try_init(create).map(Arc::clone)
    }

    /// Remove every slot, returning the instances that were initialized
    ///
    /// Blocks until in-flight `get_or_create` calls have finished.
    fn drain(&self) -> Vec<Arc<T>> {
        let _guard = self.lifecycle.write().unwrap_or_else(PoisonError::into_inner);
        let mut drained = Vec::new();
        self.slots.retain(|_, slot| {
            if let Some(instance) = slot.get() {
                drained.push(Arc::clone(instance));
            }
            false
        });
        drained
    }

    fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.value().get().is_some()).count()
    }
}

pub struct ServletContainer {
    registry: Arc<ComponentRegistry>,
    servlets: InstanceCache<dyn Servlet>,
    filters: InstanceCache<dyn Filter>,
}

impl ServletContainer {
    pub fn new(registry: Arc<ComponentRegistry>) -> Self {
        Self {
            registry,
            servlets: InstanceCache::new(),
            filters: InstanceCache::new(),
        }
    }

    pub const fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    /// Servlet instance for `class` in `context`, created and initialized on first use
    pub fn get_servlet(&self, class: &str, context: &Arc<ServletContext>) -> Result<Arc<dyn Servlet>, ServletError> {
        self.servlets.get_or_create(class, context, || {
            let mut servlet = self.registry.create_servlet(class)?;
            servlet
                .init(&ServletConfig::new(class, Arc::clone(context)))
                .map_err(|e| initialization_error(class, e))?;
            logger::log_info(&format!(
                "Initialized servlet '{class}' for context '{}'",
                display_context(context)
            ));
            Ok(Arc::from(servlet))
        })
    }

    /// Filter instance for `class` in `context`, created and initialized on first use
    pub fn get_filter(&self, class: &str, context: &Arc<ServletContext>) -> Result<Arc<dyn Filter>, ServletError> {
        self.filters.get_or_create(class, context, || {
            let mut filter = self.registry.create_filter(class)?;
            filter
                .init(&ServletConfig::new(class, Arc::clone(context)))
                .map_err(|e| initialization_error(class, e))?;
            logger::log_info(&format!(
                "Initialized filter '{class}' for context '{}'",
                display_context(context)
            ));
            Ok(Arc::from(filter))
        })
    }

    /// Number of initialized servlets and filters
    pub fn instance_count(&self) -> usize {
        self.servlets.len() + self.filters.len()
    }

    /// Destroy and forget every cached instance
    ///
    /// Requests after shutdown get freshly created instances.
    pub fn shutdown(&self) {
        let servlets = self.servlets.drain();
        let filters = self.filters.drain();
        let total = servlets.len() + filters.len();

        for filter in filters {
            filter.destroy();
        }
        for servlet in servlets {
            servlet.destroy();
        }
        logger::log_info(&format!("Destroyed {total} cached component(s)"));
    }
}

fn initialization_error(class: &str, err: ServletError) -> ServletError {
    match err {
        ServletError::Initialization { .. } => err,
        other => ServletError::Initialization {
            class: class.to_string(),
            reason: other.to_string(),
        },
    }
}

fn display_context(context: &ServletContext) -> &str {
    if context.context_path().is_empty() {
        "/"
    } else {
        context.context_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::servlet::{FilterChain, HttpRequest, HttpResponse, InMemorySessionStorage, ServletContextBuilder};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    #[derive(Default)]
    struct Counters {
        created: AtomicUsize,
        initialized: AtomicUsize,
        destroyed: AtomicUsize,
    }

    struct Counted {
        counters: Arc<Counters>,
        fail_first_inits: usize,
        init_delay: Duration,
    }

    impl Servlet for Counted {
        fn init(&mut self, _config: &ServletConfig) -> Result<(), ServletError> {
            thread::sleep(self.init_delay);
            let attempt = self.counters.initialized.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_first_inits {
                return Err(ServletError::execution("not ready"));
            }
            Ok(())
        }

        fn service(&self, _req: &mut HttpRequest, _resp: &mut HttpResponse) -> Result<(), ServletError> {
            Ok(())
        }

        fn destroy(&self) {
            self.counters.destroyed.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Filter for Counted {
        fn do_filter(
            &self,
            req: &mut HttpRequest,
            resp: &mut HttpResponse,
            chain: &mut FilterChain,
        ) -> Result<(), ServletError> {
            chain.do_filter(req, resp)
        }

        fn destroy(&self) {
            self.counters.destroyed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn container(counters: &Arc<Counters>, fail_first_inits: usize, init_delay: Duration) -> ServletContainer {
        let mut registry = ComponentRegistry::new();
        let servlet_counters = Arc::clone(counters);
        registry.register_servlet("counted", move || {
            servlet_counters.created.fetch_add(1, Ordering::SeqCst);
            Counted {
                counters: Arc::clone(&servlet_counters),
                fail_first_inits,
                init_delay,
            }
        });
        let filter_counters = Arc::clone(counters);
        registry.register_filter("counted", move || {
            filter_counters.created.fetch_add(1, Ordering::SeqCst);
            Counted {
                counters: Arc::clone(&filter_counters),
                fail_first_inits: 0,
                init_delay: Duration::ZERO,
            }
        });
        ServletContainer::new(Arc::new(registry))
    }

    fn context(path: &str) -> Arc<ServletContext> {
        Arc::new(
            ServletContextBuilder::new(path, Arc::new(InMemorySessionStorage::new()))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_single_instance_per_key() {
        let counters = Arc::new(Counters::default());
        let container = container(&counters, 0, Duration::ZERO);
        let ctx = context("/");

        let a = container.get_servlet("counted", &ctx).unwrap();
        let b = container.get_servlet("counted", &ctx).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(counters.created.load(Ordering::SeqCst), 1);
        assert_eq!(counters.initialized.load(Ordering::SeqCst), 1);
        assert_eq!(container.instance_count(), 1);
    }

    #[test]
    fn test_instances_are_per_context() {
        let counters = Arc::new(Counters::default());
        let container = container(&counters, 0, Duration::ZERO);

        let a = container.get_servlet("counted", &context("/a")).unwrap();
        let b = container.get_servlet("counted", &context("/b")).unwrap();
        let a_again = container.get_servlet("counted", &context("/a")).unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &a_again));
        assert_eq!(counters.created.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_first_access_creates_once() {
        let counters = Arc::new(Counters::default());
        let container = Arc::new(container(&counters, 0, Duration::from_millis(50)));
        let ctx = context("/");
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let container = Arc::clone(&container);
                let ctx = Arc::clone(&ctx);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    container.get_servlet("counted", &ctx).unwrap()
                })
            })
            .collect();

        let instances: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(instances.iter().all(|i| Arc::ptr_eq(i, &instances[0])));
        assert_eq!(counters.created.load(Ordering::SeqCst), 1);
        assert_eq!(counters.initialized.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_init_can_retry() {
        let counters = Arc::new(Counters::default());
        let container = container(&counters, 1, Duration::ZERO);
        let ctx = context("/");

        let err = container.get_servlet("counted", &ctx).err().unwrap();
        assert!(matches!(err, ServletError::Initialization { ref class, .. } if class == "counted"));
        assert_eq!(container.instance_count(), 0);

        assert!(container.get_servlet("counted", &ctx).is_ok());
        assert_eq!(counters.created.load(Ordering::SeqCst), 2);
        assert_eq!(container.instance_count(), 1);
    }

    #[test]
    fn test_unknown_class_does_not_poison_others() {
        let counters = Arc::new(Counters::default());
        let container = container(&counters, 0, Duration::ZERO);
        let ctx = context("/");

        let err = container.get_servlet("missing", &ctx).err().unwrap();
        assert!(matches!(err, ServletError::UnknownComponent(_)));
        assert!(container.get_servlet("counted", &ctx).is_ok());
    }

    #[test]
    fn test_shutdown_destroys_and_never_resurrects() {
        let counters = Arc::new(Counters::default());
        let container = container(&counters, 0, Duration::ZERO);
        let ctx = context("/");

        let before = container.get_servlet("counted", &ctx).unwrap();
        container.get_filter("counted", &ctx).unwrap();
        assert_eq!(container.instance_count(), 2);

        container.shutdown();
        assert_eq!(counters.destroyed.load(Ordering::SeqCst), 2);
        assert_eq!(container.instance_count(), 0);

        let after = container.get_servlet("counted", &ctx).unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(counters.created.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_shutdown_waits_for_running_init() {
        let counters = Arc::new(Counters::default());
        let container = Arc::new(container(&counters, 0, Duration::from_millis(200)));
        let ctx = context("/");

        let first = {
            let container = Arc::clone(&container);
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || container.get_servlet("counted", &ctx).unwrap())
        };
        thread::sleep(Duration::from_millis(50));

        // Lands while init is sleeping; must still see and destroy that instance
        container.shutdown();
        assert_eq!(counters.destroyed.load(Ordering::SeqCst), 1);
        assert_eq!(container.instance_count(), 0);

        let first_instance = first.join().unwrap();
        let fresh = container.get_servlet("counted", &ctx).unwrap();
        assert!(!Arc::ptr_eq(&first_instance, &fresh));
        assert_eq!(counters.created.load(Ordering::SeqCst), 2);

        container.shutdown();
        assert_eq!(counters.destroyed.load(Ordering::SeqCst), 2);
    }
}
