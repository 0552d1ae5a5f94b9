//! Worker thread loop for [`TaskGraph`](crate::TaskGraph).
//!
//! Each worker receives [`Job`]s from a shared crossbeam channel, runs the
//! task, and pushes any tasks that became ready back onto the same
//! channel.

use crate::scheduler::{Shared, TaskId};
use crossbeam_channel::Receiver;
use std::sync::Arc;

/// A message to a worker.
pub(crate) enum Job {
    /// Execute a ready task.
    Run(TaskId),
    /// Exit the loop.
    Stop,
}

/// Main loop for a worker thread.
///
/// Runs until a [`Job::Stop`] arrives or the channel is closed.
pub(crate) fn worker_loop(jobs: Receiver<Job>, shared: Arc<Shared>) {
    while let Ok(Job::Run(id)) = jobs.recv() {
        let ready = shared.execute(id);
        shared.dispatch(ready);
    }
}
