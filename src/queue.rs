//! A single-lock work queue with an outstanding-task counter, used to drive
//! the worker pool in [`crate::scan`].
//!
//! A general-purpose blocking queue with separate not-empty/not-full/all-done
//! conditions costs three lock acquisitions per put in producer-heavy
//! workloads. One `Mutex<VecDeque<T>>` guarded by a `Condvar` for blocking
//! `get`, plus a separate outstanding-count `Condvar` pair for `join`, is
//! enough here and measurably cuts contention, deliberately not a
//! work-stealing deque or an mpmc channel.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

struct Inner<T> {
    deque: VecDeque<T>,
    outstanding: u64,
    shutdown: bool,
}

/// A bounded-lifetime FIFO work queue shared by a fixed pool of workers.
///
/// `put`/`put_many` enqueue work and bump the outstanding count; `task_done`
/// decrements it and wakes [`WorkQueue::join`] once it reaches zero. `get`
/// blocks until work is available or [`WorkQueue::shutdown`] has been
/// called, at which point it returns `None` so workers can exit.
pub struct WorkQueue<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
    done: Condvar,
}

impl<T> WorkQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                deque: VecDeque::new(),
                outstanding: 0,
                shutdown: false,
            }),
            not_empty: Condvar::new(),
            done: Condvar::new(),
        }
    }

    pub fn put(&self, task: T) {
        let mut inner = self.inner.lock().unwrap();
        inner.deque.push_back(task);
        inner.outstanding += 1;
        self.not_empty.notify_one();
    }

    pub fn put_many(&self, tasks: impl IntoIterator<Item = T>) {
        let mut inner = self.inner.lock().unwrap();
        let prev = inner.deque.len();
        inner.deque.extend(tasks);
        let added = inner.deque.len() - prev;
        if added == 0 {
            return;
        }
        inner.outstanding += added as u64;
        drop(inner);
        self.not_empty.notify_all();
    }

    /// Block until work is available, or return `None` after shutdown.
    pub fn get(&self) -> Option<T> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(task) = inner.deque.pop_front() {
                return Some(task);
            }
            if inner.shutdown {
                return None;
            }
            inner = self.not_empty.wait(inner).unwrap();
        }
    }

    /// Mark one unit of work complete. Must be called exactly once per
    /// [`WorkQueue::get`] that returned `Some`, once the worker is done
    /// processing (and has enqueued any follow-on work first).
    pub fn task_done(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.outstanding -= 1;
        if inner.outstanding == 0 {
            self.done.notify_all();
        }
    }

    /// Block until every enqueued task has been matched by a `task_done`.
    pub fn join(&self) {
        let mut inner = self.inner.lock().unwrap();
        while inner.outstanding != 0 {
            inner = self.done.wait(inner).unwrap();
        }
    }

    /// Wake every blocked `get` so workers can observe shutdown and exit.
    pub fn shutdown(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.shutdown = true;
        drop(inner);
        self.not_empty.notify_all();
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn get_blocks_until_put() {
        let q: Arc<WorkQueue<i32>> = Arc::new(WorkQueue::new());
        let q2 = Arc::clone(&q);
        let handle = thread::spawn(move || q2.get());
        thread::sleep(std::time::Duration::from_millis(20));
        q.put(42);
        assert_eq!(handle.join().unwrap(), Some(42));
    }

    #[test]
    fn get_returns_none_after_shutdown() {
        let q: WorkQueue<i32> = WorkQueue::new();
        q.shutdown();
        assert_eq!(q.get(), None);
    }

    #[test]
    fn join_waits_for_outstanding_to_drain() {
        let q: Arc<WorkQueue<i32>> = Arc::new(WorkQueue::new());
        q.put(1);
        q.put(2);
        let q2 = Arc::clone(&q);
        let handle = thread::spawn(move || {
            while let Some(_task) = q2.get() {
                q2.task_done();
            }
        });
        q.join();
        q.shutdown();
        handle.join().unwrap();
    }

    #[test]
    fn put_many_wakes_all_waiters() {
        let q: Arc<WorkQueue<i32>> = Arc::new(WorkQueue::new());
        let mut handles = Vec::new();
        for _ in 0..3 {
            let q2 = Arc::clone(&q);
            handles.push(thread::spawn(move || q2.get()));
        }
        thread::sleep(std::time::Duration::from_millis(20));
        q.put_many([1, 2, 3]);
        let mut results: Vec<i32> = handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect();
        results.sort_unstable();
        assert_eq!(results, vec![1, 2, 3]);
    }
}
