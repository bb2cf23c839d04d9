use std::{
    path::PathBuf,
    sync::Arc,
    thread::{self, JoinHandle},
};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, trace};

use crate::disk::{
    fault::DiskFault,
    store::BlockStore,
    types::{Direction, DiskStats, Geometry, SeekModel, SharedBuffer},
};

/// Called by the disk worker after each request finishes.
pub type CompletionHandler = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug)]
struct Request {
    direction: Direction,
    block: usize,
    buffer: SharedBuffer,
}

#[derive(Debug)]
struct State {
    store: BlockStore,
    current_block: usize,
    busy: bool,
    pending: Option<Request>,
    running: bool,
}

struct Shared {
    state: Mutex<State>,
    request_ready: Condvar,
    seek: SeekModel,
    on_complete: Mutex<Option<CompletionHandler>>,
}

/// A slow disk with a seek delay.
///
/// `begin_read` and `begin_write` start an operation and return at once. A
/// worker thread performs the transfer after the seek delay and then calls
/// the completion handler. Issuing a second request before the completion
/// of the first one crashes the disk.
pub struct Disk {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Disk {
    /// Builds the disk and starts it spinning.
    pub fn new(
        geometry: Geometry,
        image: impl Into<PathBuf>,
        seek: SeekModel,
    ) -> Result<Self, DiskFault> {
        let store = BlockStore::open(geometry, image)?;
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                store,
                current_block: 0,
                busy: false,
                pending: None,
                running: true,
            }),
            request_ready: Condvar::new(),
            seek,
            on_complete: Mutex::new(None),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("DISK".into())
            .spawn(move || run_worker(worker_shared))
            .map_err(DiskFault::WorkerSpawn)?;

        Ok(Self {
            shared,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Installs the interrupt line. Replaces any previous handler.
    pub fn set_completion_handler(&self, handler: CompletionHandler) {
        *self.shared.on_complete.lock() = Some(handler);
    }

    pub fn begin_read(&self, block: usize, buffer: SharedBuffer) -> Result<(), DiskFault> {
        self.begin(Direction::Read, block, buffer)
    }

    pub fn begin_write(&self, block: usize, buffer: SharedBuffer) -> Result<(), DiskFault> {
        self.begin(Direction::Write, block, buffer)
    }

    fn begin(&self, direction: Direction, block: usize, buffer: SharedBuffer) -> Result<(), DiskFault> {
        let len = buffer.lock().len();
        let mut state = self.shared.state.lock();
        state.store.check(direction, block, len)?;
        if state.busy {
            return Err(DiskFault::Busy(direction));
        }

        state.busy = true;
        state.pending = Some(Request {
            direction,
            block,
            buffer,
        });
        trace!(%direction, block, "disk request accepted");
        self.shared.request_ready.notify_one();
        Ok(())
    }

    pub fn is_busy(&self) -> bool {
        self.shared.state.lock().busy
    }

    /// Block the head rests on after the last finished request.
    pub fn current_block(&self) -> usize {
        self.shared.state.lock().current_block
    }

    pub fn geometry(&self) -> Geometry {
        self.shared.state.lock().store.geometry()
    }

    pub fn stats(&self) -> DiskStats {
        self.shared.state.lock().store.stats()
    }

    pub fn format(&self) {
        self.shared.state.lock().store.format();
    }

    pub fn flush(&self) -> Result<(), DiskFault> {
        self.shared.state.lock().store.flush()
    }

    /// Finishes any accepted request, then stops the worker.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.state.lock();
            if !state.running {
                return;
            }
            state.running = false;
            self.shared.request_ready.notify_all();
        }

        let Some(worker) = self.worker.lock().take() else {
            return;
        };
        // The last handle may be dropped from inside a completion handler.
        if worker.thread().id() == thread::current().id() {
            return;
        }
        if worker.join().is_err() {
            error!("disk worker panicked");
        }
        debug!("disk stopped");
    }
}

impl Drop for Disk {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The disk controller's microprocessor: wait for a request, seek, move the
/// data, raise the completion interrupt.
fn run_worker(shared: Arc<Shared>) {
    loop {
        let (request, from) = {
            let mut state = shared.state.lock();
            while state.pending.is_none() && state.running {
                shared.request_ready.wait(&mut state);
            }
            match state.pending.take() {
                Some(request) => (request, state.current_block),
                None => break,
            }
        };

        thread::sleep(shared.seek.delay(from, request.block));

        {
            let mut state = shared.state.lock();
            let mut buffer = request.buffer.lock();
            // Bounds were checked when the request was accepted.
            let moved = match request.direction {
                Direction::Read => state.store.copy_out(request.block, &mut buffer),
                Direction::Write => state.store.copy_in(request.block, &buffer),
            };
            if let Err(fault) = moved {
                error!(%fault, "disk transfer failed");
            }
            state.current_block = request.block;
            state.busy = false;
        }

        // Outside the disk lock: the handler may start the next request.
        let handler = shared.on_complete.lock().clone();
        if let Some(handler) = handler {
            handler();
        }
    }
}
