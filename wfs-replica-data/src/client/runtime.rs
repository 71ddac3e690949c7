use std::future::Future;
use std::io;

use tokio::runtime::{Handle, Runtime, RuntimeFlavor};

/// Drives async requests from the synchronous client API.
///
/// Inside a multi-threaded Tokio runtime the caller's handle is used through
/// [`tokio::task::block_in_place`]; otherwise an owned current-thread runtime
/// runs the future. Calling from a `current_thread` runtime falls back to
/// the owned runtime and may deadlock if the caller's runtime drives IO the
/// request depends on.
pub(crate) struct BlockingRuntime {
    runtime: Runtime,
}

impl std::fmt::Debug for BlockingRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingRuntime")
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish()
    }
}

impl BlockingRuntime {
    pub(crate) fn new() -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self { runtime })
    }

    pub(crate) fn block_on<F: Future>(&self, future: F) -> F::Output {
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            _ => self.runtime.block_on(future),
        }
    }
}
