use std::{future::Future, io, sync::Arc, sync::OnceLock};

use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};

use crate::{error::RegistryError, RegistryResult};

static FALLBACK: OnceLock<Result<Runtime, Arc<io::Error>>> = OnceLock::new();

fn fallback() -> RegistryResult<&'static Runtime> {
    FALLBACK
        .get_or_init(|| {
            Builder::new_multi_thread()
                .worker_threads(1)
                .thread_name("rabbitmq-named-clients")
                .enable_all()
                .build()
                .map_err(Arc::new)
        })
        .as_ref()
        .map_err(|err| RegistryError::Runtime(err.clone()))
}

/// Drives `future` to completion on the calling thread.
///
/// Inside a multi-threaded runtime the worker is handed over with
/// `block_in_place`; outside of any runtime a process-wide runtime is used.
pub(crate) fn block_on<F: Future>(future: F) -> RegistryResult<F::Output> {
    match Handle::try_current() {
        Ok(handle) => match handle.runtime_flavor() {
            RuntimeFlavor::CurrentThread => Err(RegistryError::BlockingOnCurrentThread),
            _ => Ok(tokio::task::block_in_place(|| handle.block_on(future))),
        },
        Err(_) => Ok(fallback()?.block_on(future)),
    }
}
