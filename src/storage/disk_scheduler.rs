//! Disk Scheduler - background I/O for the buffer pool.
//!
//! Requests go onto a single queue drained by one or more worker threads
//! that call the [`DiskManager`]. Each request carries a [`DiskCallback`];
//! the submitter keeps the matching [`DiskCompletion`] and may block on it
//! right away or hold on to it and wait later.
//!
//! ```text
//!  submitter ──schedule()──▶ [ queue ] ──▶ worker 0 ─┐
//!      │                                 ──▶ worker 1 ─┼─▶ DiskManager
//!      └──── DiskCompletion::wait() ◀── callback ◀─────┘
//! ```

use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, error, trace, warn};

use crate::common::{Error, PageId, Result};
use crate::storage::disk_manager::DiskManager;
use crate::storage::page::SharedPage;

/// Direction of a disk request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoKind {
    /// Disk image into the buffer.
    Read,
    /// Buffer onto disk.
    Write,
}

/// Sending half of a request's completion signal.
///
/// Dropping it without calling [`complete`](Self::complete) wakes the waiter
/// with `Error::SchedulerShutdown`, so a lost request never hangs anyone.
pub struct DiskCallback {
    tx: SyncSender<Result<()>>,
}

impl DiskCallback {
    pub fn complete(self, result: Result<()>) {
        // The waiter may have given up on the result; nothing to do then.
        let _ = self.tx.send(result);
    }
}

/// Receiving half of a request's completion signal.
pub struct DiskCompletion {
    rx: Receiver<Result<()>>,
}

impl DiskCompletion {
    /// Block until the request finishes.
    ///
    /// # Errors
    /// The request's own I/O error, or `Error::SchedulerShutdown` if it was
    /// cancelled.
    pub fn wait(self) -> Result<()> {
        self.rx.recv().unwrap_or(Err(Error::SchedulerShutdown))
    }
}

/// One unit of work for the scheduler.
///
/// `page` is the target frame's buffer. A write latches it shared with
/// `read_recursive`, so the submitter may already hold a shared latch; no
/// one may hold it exclusively while a write is queued. A read latches it
/// exclusively and expects nobody else to be using the frame.
pub struct DiskRequest {
    pub kind: IoKind,
    pub page: SharedPage,
    pub page_id: PageId,
    pub callback: DiskCallback,
}

type SharedDiskManager = Arc<Mutex<Box<dyn DiskManager>>>;

/// Schedules page reads and writes on background workers.
pub struct DiskScheduler {
    disk_manager: SharedDiskManager,
    /// `None` once shut down.
    queue: Mutex<Option<Sender<DiskRequest>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl DiskScheduler {
    /// Start `workers` background threads over `disk_manager`.
    ///
    /// # Errors
    /// I/O error if a worker thread cannot be spawned.
    pub fn new<D: DiskManager + 'static>(disk_manager: D, workers: usize) -> Result<Self> {
        let disk_manager: SharedDiskManager = Arc::new(Mutex::new(Box::new(disk_manager)));
        let (tx, rx) = mpsc::channel::<DiskRequest>();
        let rx = Arc::new(Mutex::new(rx));

        let mut handles = Vec::with_capacity(workers.max(1));
        for worker_id in 0..workers.max(1) {
            let rx = Arc::clone(&rx);
            let dm = Arc::clone(&disk_manager);
            let handle = thread::Builder::new()
                .name(format!("disk-io-{}", worker_id))
                .spawn(move || run_worker(worker_id, rx, dm))?;
            handles.push(handle);
        }

        debug!(workers = handles.len(), "disk scheduler started");
        Ok(Self {
            disk_manager,
            queue: Mutex::new(Some(tx)),
            workers: Mutex::new(handles),
        })
    }

    /// Create a linked callback/completion pair for one request.
    pub fn create_completion() -> (DiskCallback, DiskCompletion) {
        let (tx, rx) = mpsc::sync_channel(1);
        (DiskCallback { tx }, DiskCompletion { rx })
    }

    /// Queue a request. Never blocks on the I/O itself.
    ///
    /// After shutdown the request is cancelled immediately and its waiter
    /// sees `Error::SchedulerShutdown`.
    pub fn schedule(&self, request: DiskRequest) {
        let queue = self.queue.lock();
        let rejected = match queue.as_ref() {
            Some(tx) => tx.send(request).err().map(|e| e.0),
            None => Some(request),
        };

        if let Some(request) = rejected {
            warn!(page_id = %request.page_id, kind = ?request.kind, "disk request cancelled, scheduler is shut down");
            request.callback.complete(Err(Error::SchedulerShutdown));
        }
    }

    /// Read `page_id` into `page` and wait for it.
    pub fn read_page(&self, page_id: PageId, page: &SharedPage) -> Result<()> {
        self.submit(IoKind::Read, page_id, page).wait()
    }

    /// Write `page` out as `page_id` and wait for it.
    pub fn write_page(&self, page_id: PageId, page: &SharedPage) -> Result<()> {
        self.submit(IoKind::Write, page_id, page).wait()
    }

    /// Queue a request and hand back its completion without waiting.
    pub fn submit(&self, kind: IoKind, page_id: PageId, page: &SharedPage) -> DiskCompletion {
        let (callback, completion) = Self::create_completion();
        self.schedule(DiskRequest {
            kind,
            page: Arc::clone(page),
            page_id,
            callback,
        });
        completion
    }

    /// Logically free a page on the backing store.
    pub fn deallocate_page(&self, page_id: PageId) {
        self.disk_manager.lock().deallocate_page(page_id);
    }

    /// Page count reported by the disk manager.
    pub fn num_pages(&self) -> u32 {
        self.disk_manager.lock().num_pages()
    }

    /// Stop accepting work, drain what is queued, and join the workers.
    ///
    /// Idempotent.
    pub fn shutdown(&self) {
        let sender = self.queue.lock().take();
        if sender.is_none() {
            return;
        }
        // Closing the channel lets workers exit once the queue is empty.
        drop(sender);

        let handles: Vec<_> = self.workers.lock().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                error!("disk scheduler worker panicked");
            }
        }
        debug!("disk scheduler shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.queue.lock().is_none()
    }
}

impl Drop for DiskScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(worker_id: usize, rx: Arc<Mutex<Receiver<DiskRequest>>>, dm: SharedDiskManager) {
    loop {
        let next = rx.lock().recv();
        let Ok(request) = next else {
            break;
        };

        let result = match request.kind {
            IoKind::Write => {
                let page = request.page.read_recursive();
                dm.lock().write_page(request.page_id, &page)
            }
            IoKind::Read => {
                let mut page = request.page.write();
                dm.lock().read_page(request.page_id, &mut page)
            }
        };

        match &result {
            Ok(()) => trace!(worker_id, page_id = %request.page_id, kind = ?request.kind, "disk request done"),
            Err(e) => warn!(worker_id, page_id = %request.page_id, kind = ?request.kind, error = %e, "disk request failed"),
        }
        request.callback.complete(result);
    }
    debug!(worker_id, "disk scheduler worker exiting");
}
