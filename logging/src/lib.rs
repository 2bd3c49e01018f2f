//! Buffered, typed event logging for relay participants.
//!
//! A [`Logger<E>`] accumulates timestamped events of type `E` and periodically hands
//! them in batches to an action closure. Loggers are cheap to clone, and each clone
//! appends to the same buffer. A [`Registry`] maps names to loggers so that different
//! parts of a participant can find the logger they should write to.
//!
//! # Examples
//! ```
//! use std::time::Instant;
//! use relay_logging::Registry;
//!
//! let mut registry = Registry::new(Instant::now());
//! registry.insert::<String, _>("text", |_time, batch| {
//!     for (elapsed, event) in batch.drain(..) {
//!         println!("{:?}\t{}", elapsed, event);
//!     }
//! });
//!
//! let logger = registry.get::<String>("text").expect("logger registered");
//! logger.log("hello".to_string());
//! logger.flush();
//! ```

#![forbid(missing_docs)]

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Number of buffered events that triggers a flush.
const BUFFER_CAPACITY: usize = 1024;

/// A map from names to typed loggers.
pub struct Registry {
    /// Instant against which every registered logger measures elapsed time.
    time: Instant,
    /// Type-erased loggers, with a flush handle each.
    map: HashMap<String, (Box<dyn Any>, Box<dyn Flush>)>,
}

impl Registry {
    /// Creates an empty registry whose loggers report time elapsed since `time`.
    pub fn new(time: Instant) -> Self {
        Registry {
            time,
            map: HashMap::new(),
        }
    }

    /// Binds a log name to an action on batches of log events.
    ///
    /// Returns any previously bound logger, type-erased.
    pub fn insert<E: 'static, F: FnMut(&Duration, &mut Vec<(Duration, E)>) + 'static>(
        &mut self,
        name: &str,
        action: F,
    ) -> Option<Box<dyn Any>> {
        let logger = Logger::new(self.time, action);
        self.insert_logger(name, logger)
    }

    /// Binds a log name to an existing logger.
    pub fn insert_logger<E: 'static>(&mut self, name: &str, logger: Logger<E>) -> Option<Box<dyn Any>> {
        self.map
            .insert(name.to_owned(), (Box::new(logger.clone()), Box::new(logger)))
            .map(|(any, _)| any)
    }

    /// Removes a bound logger.
    ///
    /// Any clones of the logger held elsewhere stay active until dropped.
    pub fn remove(&mut self, name: &str) -> Option<Box<dyn Any>> {
        self.map.remove(name).map(|(any, _)| any)
    }

    /// Retrieves a logger by name, if it exists with the requested event type.
    pub fn get<E: 'static>(&self, name: &str) -> Option<Logger<E>> {
        self.map
            .get(name)
            .and_then(|(any, _)| any.downcast_ref::<Logger<E>>())
            .cloned()
    }

    /// Flushes all registered loggers.
    pub fn flush(&mut self) {
        for (_, flush) in self.map.values() {
            flush.flush();
        }
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Type-erased flushing, so that the registry can flush loggers of any event type.
trait Flush {
    fn flush(&self);
}

/// A buffering logger of events of type `E`.
pub struct Logger<E> {
    inner: Rc<RefCell<LoggerInner<E>>>,
}

impl<E> Clone for Logger<E> {
    fn clone(&self) -> Self {
        Logger { inner: Rc::clone(&self.inner) }
    }
}

impl<E> std::fmt::Debug for Logger<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Logger")
            .field("buffered", &inner.buffer.len())
            .finish()
    }
}

struct LoggerInner<E> {
    time: Instant,
    buffer: Vec<(Duration, E)>,
    action: Box<dyn FnMut(&Duration, &mut Vec<(Duration, E)>)>,
}

impl<E> LoggerInner<E> {
    fn flush(&mut self) {
        if !self.buffer.is_empty() {
            let now = self.time.elapsed();
            (self.action)(&now, &mut self.buffer);
            self.buffer.clear();
        }
    }
}

impl<E> Drop for LoggerInner<E> {
    fn drop(&mut self) {
        self.flush();
    }
}

impl<E> Logger<E> {
    /// Allocates a new logger reporting time elapsed since `time`.
    pub fn new<F>(time: Instant, action: F) -> Self
    where
        F: FnMut(&Duration, &mut Vec<(Duration, E)>) + 'static,
    {
        Logger {
            inner: Rc::new(RefCell::new(LoggerInner {
                time,
                buffer: Vec::with_capacity(BUFFER_CAPACITY),
                action: Box::new(action),
            })),
        }
    }

    /// Logs an event.
    ///
    /// The event is buffered and may not be observed by the action until the logger
    /// is flushed, either explicitly, when the buffer fills, or when the last clone
    /// of the logger is dropped.
    pub fn log<T: Into<E>>(&self, event: T) {
        let mut inner = self.inner.borrow_mut();
        let elapsed = inner.time.elapsed();
        inner.buffer.push((elapsed, event.into()));
        if inner.buffer.len() >= BUFFER_CAPACITY {
            inner.flush();
        }
    }

    /// Hands any buffered events to the action.
    pub fn flush(&self) {
        self.inner.borrow_mut().flush();
    }
}

impl<E> Flush for Logger<E> {
    fn flush(&self) {
        Logger::flush(self)
    }
}
