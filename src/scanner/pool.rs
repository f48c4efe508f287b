use std::{
    collections::VecDeque,
    sync::{Mutex, mpsc::channel},
};

use crate::cancel::CancelToken;

/// Run `job` over `work` on up to `worker_count` scoped threads.
///
/// Results are handed to `on_result` on the calling thread in completion
/// order. Workers check `cancel` before taking each item and stop once it is
/// set; items already taken run to completion.
pub(super) fn run_workers<W, R, F, C>(
    work: Vec<W>,
    worker_count: usize,
    cancel: &CancelToken,
    job: F,
    mut on_result: C,
) where
    W: Send,
    R: Send,
    F: Fn(W) -> R + Sync,
    C: FnMut(R),
{
    if work.is_empty() {
        return;
    }
    let worker_count = worker_count.min(work.len()).max(1);
    let queue = Mutex::new(VecDeque::from(work));
    let (tx, rx) = channel();

    std::thread::scope(|scope| {
        for _ in 0..worker_count {
            let tx = tx.clone();
            let queue = &queue;
            let job = &job;
            scope.spawn(move || {
                loop {
                    if cancel.is_canceled() {
                        break;
                    }
                    let next = match queue.lock() {
                        Ok(mut guard) => guard.pop_front(),
                        Err(_) => return,
                    };
                    let Some(item) = next else {
                        break;
                    };
                    if tx.send(job(item)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);
        for result in rx {
            on_result(result);
        }
    });
}
