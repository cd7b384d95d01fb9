//! The host's single-threaded cooperative loop.
//!
//! A current-thread tokio runtime driving a [`LocalSet`]: all host-side state
//! (`Rc`, `RefCell`, callback sinks) lives on this one thread, while blocking
//! dialog work is pushed to tokio's blocking pool.

use super::EventBridge;
use anyhow::{Context, Result};
use std::future::Future;
use std::rc::Rc;
use tokio::runtime::{Builder, Runtime};
use tokio::task::{JoinError, JoinHandle, LocalSet};

pub struct HostLoop {
    local: LocalSet,
    runtime: Runtime,
    bridge: Rc<EventBridge>,
}

impl HostLoop {
    /// Build the runtime and the bridge that serves it
    pub fn new() -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .thread_name("taskbridge-host")
            .build()
            .context("Failed to build host runtime")?;

        Ok(Self {
            local: LocalSet::new(),
            runtime,
            bridge: EventBridge::initialize(),
        })
    }

    pub fn bridge(&self) -> &Rc<EventBridge> {
        &self.bridge
    }

    /// Run `future` to completion on the host thread, driving every local task
    /// (dialog completions, the bridge dispatcher) while it runs
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.local.block_on(&self.runtime, future)
    }

    /// Consume the loop, driving it until every spawned local task has finished
    pub fn run_until_idle(self) {
        let HostLoop { local, runtime, .. } = self;
        runtime.block_on(local);
    }
}

/// Run `work` on a worker thread, then `complete` back on the host thread.
///
/// `work` is free to block for as long as it likes; the host keeps turning in the
/// meantime. `complete` receives the work's result, or the [`JoinError`] if it
/// panicked. Must be called from inside the host's `LocalSet`.
pub fn run_blocking<W, T, C>(work: W, complete: C) -> JoinHandle<()>
where
    W: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
    C: FnOnce(Result<T, JoinError>) + 'static,
{
    tokio::task::spawn_local(async move {
        let result = tokio::task::spawn_blocking(work).await;
        complete(result);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::time::Duration;

    #[test]
    fn test_run_blocking_completes_on_host_thread() {
        let host = HostLoop::new().unwrap();
        let host_thread = std::thread::current().id();
        let seen = Rc::new(RefCell::new(None));

        let slot = Rc::clone(&seen);
        host.block_on(async move {
            let handle = run_blocking(
                || {
                    std::thread::sleep(Duration::from_millis(10));
                    std::thread::current().id()
                },
                move |result| {
                    let worker = result.unwrap();
                    *slot.borrow_mut() = Some((worker, std::thread::current().id()));
                },
            );
            handle.await.unwrap();
        });

        let (worker, completion) = seen.borrow().unwrap();
        assert_ne!(worker, host_thread);
        assert_eq!(completion, host_thread);
    }

    #[test]
    fn test_run_blocking_reports_worker_panic() {
        let host = HostLoop::new().unwrap();
        let panicked = Rc::new(RefCell::new(false));

        let flag = Rc::clone(&panicked);
        host.block_on(async move {
            run_blocking(
                || -> () { panic!("worker failure") },
                move |result| *flag.borrow_mut() = result.is_err(),
            )
            .await
            .unwrap();
        });

        assert!(*panicked.borrow());
    }

    #[test]
    fn test_run_until_idle_drives_spawned_tasks() {
        let host = HostLoop::new().unwrap();
        let done = Rc::new(RefCell::new(false));

        let flag = Rc::clone(&done);
        host.block_on(async move {
            tokio::task::spawn_local(async move {
                tokio::task::yield_now().await;
                *flag.borrow_mut() = true;
            });
        });
        host.run_until_idle();

        assert!(*done.borrow());
    }
}
