use std::future::Future;
use std::io;
use std::sync::mpsc as std_mpsc;
use std::thread;
use tokio::runtime::{Builder, Handle};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Single-threaded runtime owned by a registry
///
/// Flushes and close watchers run here one at a time, whatever runtime (if
/// any) the caller uses. The thread exits once the executor is dropped.
pub(crate) struct Executor {
    handle: Handle,
    _shutdown: oneshot::Sender<()>,
}

impl Executor {
    pub fn start(name: &str) -> io::Result<Self> {
        let (shutdown, stopped) = oneshot::channel::<()>();
        let (ready_tx, ready_rx) = std_mpsc::channel();

        thread::Builder::new().name(name.to_string()).spawn(move || {
            let runtime = match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(runtime.handle().clone()));

            // resolves when the sender is dropped
            let _ = runtime.block_on(stopped);
        })?;

        let handle = ready_rx
            .recv()
            .map_err(|_| io::Error::other("status executor exited during startup"))??;

        Ok(Self {
            handle,
            _shutdown: shutdown,
        })
    }

    pub fn spawn<F>(&self, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(task)
    }
}
