// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Transform and filter steps applied to every record before it is kept.
//!
//! A middleware receives the record by value together with a [`Next`]
//! continuation. Calling [`Next::run`] hands the (possibly rewritten) record
//! to the following middleware, or to the terminal action after the last
//! one. Returning without calling it drops the record: nothing later in the
//! chain runs and the record is never buffered or written.

use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::record::Record;

pub trait Middleware: Send + Sync {
    fn handle(&self, record: Record, next: Next<'_>);
}

impl<F> Middleware for F
where
    F: Fn(Record, Next<'_>) + Send + Sync,
{
    fn handle(&self, record: Record, next: Next<'_>) {
        self(record, next)
    }
}

/// The rest of the chain after the running middleware.
pub struct Next<'a> {
    remaining: &'a [Arc<dyn Middleware>],
    terminal: &'a mut dyn FnMut(Record),
}

impl Next<'_> {
    pub fn run(self, record: Record) {
        match self.remaining.split_first() {
            Some((middleware, rest)) => middleware.handle(
                record,
                Next {
                    remaining: rest,
                    terminal: self.terminal,
                },
            ),
            None => (self.terminal)(record),
        }
    }
}

/// Ordered list of middleware, executed in registration order.
#[derive(Default, Clone)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, middleware: Arc<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    pub fn clear(&mut self) {
        self.middlewares.clear();
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Runs `record` through the chain. Returns whether `terminal` was
    /// reached.
    pub fn process<T>(&self, record: Record, mut terminal: T) -> bool
    where
        T: FnMut(Record),
    {
        let mut reached = false;
        let mut wrapped = |record: Record| {
            reached = true;
            terminal(record);
        };
        Next {
            remaining: &self.middlewares,
            terminal: &mut wrapped,
        }
        .run(record);
        reached
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("len", &self.middlewares.len())
            .finish()
    }
}

/// Shared, lockable [`MiddlewareChain`].
///
/// Processing takes the read lock so concurrent log calls never serialize on
/// the pipeline; `add`/`clear` take the write lock. A middleware must not
/// mutate the pipeline that is running it.
#[derive(Clone, Default)]
pub struct Pipeline {
    chain: Arc<RwLock<MiddlewareChain>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide pipeline shared by loggers that were not given their own.
    pub fn global() -> &'static Pipeline {
        static GLOBAL: OnceLock<Pipeline> = OnceLock::new();
        GLOBAL.get_or_init(Pipeline::new)
    }

    pub fn add<M>(&self, middleware: M)
    where
        M: Middleware + 'static,
    {
        self.add_shared(Arc::new(middleware));
    }

    pub fn add_shared(&self, middleware: Arc<dyn Middleware>) {
        self.chain.write().add(middleware);
    }

    pub fn clear(&self) {
        self.chain.write().clear();
    }

    pub fn count(&self) -> usize {
        self.chain.read().len()
    }

    pub fn process<T>(&self, record: Record, terminal: T) -> bool
    where
        T: FnMut(Record),
    {
        self.chain.read().process(record, terminal)
    }

    pub fn ptr_eq(&self, other: &Pipeline) -> bool {
        Arc::ptr_eq(&self.chain, &other.chain)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("count", &self.count())
            .finish()
    }
}

pub fn add_middleware<M>(middleware: M)
where
    M: Middleware + 'static,
{
    Pipeline::global().add(middleware);
}

pub fn clear_middleware() {
    Pipeline::global().clear();
}

pub fn middleware_count() -> usize {
    Pipeline::global().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Severity;
    use parking_lot::Mutex;
    use serial_test::serial;

    fn tagging(tag: &'static str, order: Arc<Mutex<Vec<&'static str>>>) -> impl Middleware {
        move |mut record: Record, next: Next<'_>| {
            order.lock().push(tag);
            record.message.push_str(tag);
            next.run(record);
        }
    }

    #[test]
    fn test_empty_chain_reaches_terminal() {
        let chain = MiddlewareChain::new();
        let mut seen = Vec::new();
        let reached = chain.process(Record::new(Severity::Info, "m"), |r| seen.push(r.message));
        assert!(reached);
        assert_eq!(seen, vec!["m"]);
    }

    #[test]
    fn test_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut chain = MiddlewareChain::new();
        chain.add(Arc::new(tagging("a", Arc::clone(&order))));
        chain.add(Arc::new(tagging("b", Arc::clone(&order))));
        chain.add(Arc::new(tagging("c", Arc::clone(&order))));

        let mut seen = Vec::new();
        chain.process(Record::new(Severity::Info, ">"), |r| seen.push(r.message));

        assert_eq!(*order.lock(), vec!["a", "b", "c"]);
        assert_eq!(seen, vec![">abc"]);
    }

    #[test]
    fn test_veto_stops_chain() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut chain = MiddlewareChain::new();
        chain.add(Arc::new(tagging("a", Arc::clone(&order))));
        chain.add(Arc::new(|record: Record, next: Next<'_>| {
            if !record.message.contains("drop") {
                next.run(record);
            }
        }));
        chain.add(Arc::new(tagging("c", Arc::clone(&order))));

        let mut seen = Vec::new();
        let dropped = chain.process(Record::new(Severity::Info, "drop me"), |r| {
            seen.push(r.message)
        });
        let kept = chain.process(Record::new(Severity::Info, "keep"), |r| seen.push(r.message));

        assert!(!dropped);
        assert!(kept);
        assert_eq!(seen, vec!["keepac"]);
        assert_eq!(*order.lock(), vec!["a", "a", "c"]);
    }

    #[test]
    fn test_pipeline_add_clear_count() {
        let pipeline = Pipeline::new();
        assert_eq!(pipeline.count(), 0);
        pipeline.add(|record: Record, next: Next<'_>| next.run(record));
        pipeline.add(|record: Record, next: Next<'_>| next.run(record));
        assert_eq!(pipeline.count(), 2);

        let clone = pipeline.clone();
        assert!(clone.ptr_eq(&pipeline));
        clone.clear();
        assert_eq!(pipeline.count(), 0);
    }

    #[test]
    fn test_concurrent_processing_and_mutation() {
        let pipeline = Pipeline::new();
        pipeline.add(|mut record: Record, next: Next<'_>| {
            record.message = record.message.to_uppercase();
            next.run(record);
        });

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let pipeline = pipeline.clone();
                std::thread::spawn(move || {
                    let mut count = 0;
                    for _ in 0..200 {
                        pipeline.process(Record::new(Severity::Info, format!("t{i}")), |r| {
                            assert!(r.message.starts_with('T'));
                            count += 1;
                        });
                    }
                    count
                })
            })
            .collect();

        for _ in 0..50 {
            pipeline.add(|record: Record, next: Next<'_>| next.run(record));
        }

        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 800);
        assert_eq!(pipeline.count(), 51);
    }

    #[test]
    #[serial]
    fn test_global_pipeline_helpers() {
        clear_middleware();
        assert_eq!(middleware_count(), 0);
        add_middleware(|record: Record, next: Next<'_>| next.run(record));
        assert_eq!(middleware_count(), 1);
        assert!(Pipeline::global().ptr_eq(Pipeline::global()));
        clear_middleware();
        assert_eq!(middleware_count(), 0);
    }
}
