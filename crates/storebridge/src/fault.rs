//! Process-fatal fault reporting.
//!
//! A panic on a worker thread can never satisfy the completions of the
//! requests that worker owned, so continuing would leave callers waiting
//! forever. The reporter logs the fault, gives an optional caller-supplied
//! handler one chance to observe it (flush state, notify a supervisor),
//! then delegates to the previous hook and aborts the process. A handler
//! that must prevent termination has to not return (e.g. exec or exit on
//! its own terms).

use parking_lot::Mutex;
use std::panic::PanicHookInfo;
use std::sync::Once;
use tracing::error;

type FaultHandler = Box<dyn Fn(&PanicHookInfo<'_>) + Send + Sync>;

static INSTALL: Once = Once::new();
static HANDLER: Mutex<Option<FaultHandler>> = Mutex::new(None);

/// Install the fault reporter, optionally with a caller-supplied handler.
///
/// The hook is installed once per process; later calls only replace the
/// handler.
pub fn install_fault_reporter(handler: Option<FaultHandler>) {
    *HANDLER.lock() = handler;

    INSTALL.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            error!("Fatal fault in bridge worker: {}", info);
            if let Some(handler) = HANDLER.lock().as_ref() {
                handler(info);
            }
            previous(info);
            std::process::abort();
        }));
    });
}
