//! Frame-driven cooperative task runner
//!
//! Tasks behave like engine coroutines: starting one runs it up to its first
//! suspension point, and a suspended task runs again on the next
//! [`FrameScheduler::tick`] after something wakes it. Tasks are built with
//! `async-task` and woken tasks wait in a `concurrent-queue`. Everything runs
//! on the calling thread; there is no cancellation and no timeout.
//!
//! # Example
//!
//! ```ignore
//! let mut scheduler = FrameScheduler::new();
//! let spawner = scheduler.spawner();
//!
//! spawner.start(async move {
//!     handle.completion().await;
//!     log::info!("done");
//! });
//!
//! // Once per frame
//! backend.advance_frame();
//! scheduler.tick();
//! ```

use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;
use std::sync::Arc;

use async_task::Runnable;
use concurrent_queue::ConcurrentQueue;

/// Cloneable handle used to start tasks on a [`FrameScheduler`]
#[derive(Clone)]
pub struct Spawner {
    /// Tasks woken since they last ran
    woken: Arc<ConcurrentQueue<Runnable>>,
    /// Tasks started and not yet finished
    live: Rc<Cell<usize>>,
}

impl Default for Spawner {
    fn default() -> Self {
        Self {
            woken: Arc::new(ConcurrentQueue::unbounded()),
            live: Rc::new(Cell::new(0)),
        }
    }
}

impl Spawner {
    /// Start a task, running it until it first suspends.
    ///
    /// A suspended task runs again on the first tick after it is woken.
    pub fn start(&self, future: impl Future<Output = ()> + 'static) {
        let live = Rc::clone(&self.live);
        live.set(live.get() + 1);
        let future = async move {
            future.await;
            live.set(live.get() - 1);
        };

        let woken = Arc::clone(&self.woken);
        let (runnable, task) = async_task::spawn_local(future, move |runnable| {
            // Pushing only fails on a closed queue and this one is never closed
            let _ = woken.push(runnable);
        });
        task.detach();
        runnable.run();
    }

    /// Number of suspended tasks
    #[must_use]
    pub fn pending(&self) -> usize {
        self.live.get()
    }
}

impl std::fmt::Debug for Spawner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Spawner")
            .field("pending", &self.pending())
            .field("woken", &self.woken.len())
            .finish()
    }
}

/// Runs woken tasks once per frame
#[derive(Debug, Default)]
pub struct FrameScheduler {
    spawner: Spawner,
    frame: u64,
}

impl FrameScheduler {
    /// Create a scheduler with no tasks
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a spawner feeding this scheduler
    #[must_use]
    pub fn spawner(&self) -> Spawner {
        self.spawner.clone()
    }

    /// Number of frames ticked so far
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Number of tasks still suspended
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.spawner.pending()
    }

    /// Run every task woken before this frame, returning how many tasks
    /// remain suspended.
    ///
    /// Tasks woken while the frame runs wait for the next tick.
    pub fn tick(&mut self) -> usize {
        self.frame += 1;

        let woken = self.spawner.woken.len();
        for _ in 0..woken {
            let Ok(runnable) = self.spawner.woken.pop() else {
                break;
            };
            runnable.run();
        }

        self.spawner.pending()
    }

    /// Tick until no task is suspended or `max_frames` have passed.
    ///
    /// `per_frame` runs before each tick, typically to advance backends.
    /// Returns the number of frames ticked.
    pub fn run_until_idle(&mut self, max_frames: u32, mut per_frame: impl FnMut()) -> u32 {
        let mut frames = 0;
        while self.pending_tasks() > 0 && frames < max_frames {
            per_frame();
            self.tick();
            frames += 1;
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;

    use super::*;
    use crate::assets::OperationHandle;

    #[test]
    fn test_start_runs_until_first_suspension() {
        let scheduler = FrameScheduler::new();
        let ran = Rc::new(Cell::new(false));

        let flag = Rc::clone(&ran);
        scheduler.spawner().start(async move {
            flag.set(true);
        });

        assert!(ran.get());
        assert_eq!(scheduler.pending_tasks(), 0);
    }

    #[test]
    fn test_tick_resumes_suspended_tasks() {
        let mut scheduler = FrameScheduler::new();
        let (handle, completer) = OperationHandle::<u32>::pending();
        let seen = Rc::new(Cell::new(0));

        let out = Rc::clone(&seen);
        scheduler.spawner().start(async move {
            handle.completion().await;
            out.set(handle.result().unwrap_or_default());
        });

        assert_eq!(scheduler.tick(), 1);
        completer.succeed(9);
        assert_eq!(scheduler.tick(), 0);
        assert_eq!(seen.get(), 9);
        assert_eq!(scheduler.frame(), 2);
    }

    #[test]
    fn test_tasks_started_from_tasks() {
        let mut scheduler = FrameScheduler::new();
        let spawner = scheduler.spawner();
        let (handle, completer) = OperationHandle::<()>::pending();
        let count = Rc::new(Cell::new(0));

        let inner_count = Rc::clone(&count);
        let inner_spawner = spawner.clone();
        spawner.start(async move {
            handle.completion().await;
            let (pending, _completer) = OperationHandle::<()>::pending();
            inner_spawner.start(async move {
                pending.completion().await;
                inner_count.set(inner_count.get() + 1);
            });
        });

        completer.succeed(());
        scheduler.tick();
        // The nested task's completer was dropped, failing its operation
        assert_eq!(scheduler.tick(), 0);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_suspended_task_runs_only_when_woken() {
        let mut scheduler = FrameScheduler::new();
        let (handle, completer) = OperationHandle::<u32>::pending();
        let polls = Rc::new(Cell::new(0));

        let counter = Rc::clone(&polls);
        let mut completion = handle.completion();
        scheduler.spawner().start(async move {
            futures_lite::future::poll_fn(|cx| {
                counter.set(counter.get() + 1);
                Pin::new(&mut completion).poll(cx)
            })
            .await;
        });

        for _ in 0..100 {
            scheduler.tick();
        }
        assert_eq!(polls.get(), 1);
        assert_eq!(scheduler.pending_tasks(), 1);

        completer.succeed(3);
        assert_eq!(scheduler.tick(), 0);
        assert_eq!(polls.get(), 2);
    }

    #[test]
    fn test_run_until_idle_stops_at_limit() {
        let mut scheduler = FrameScheduler::new();
        let (handle, _completer) = OperationHandle::<()>::pending();

        scheduler.spawner().start(async move {
            handle.completion().await;
        });

        let mut frames_seen = 0;
        let frames = scheduler.run_until_idle(5, || frames_seen += 1);
        assert_eq!(frames, 5);
        assert_eq!(frames_seen, 5);
        assert_eq!(scheduler.pending_tasks(), 1);
    }
}
