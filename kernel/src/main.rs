// kernel/src/main.rs

use std::sync::Arc;

use so_kernel::kernel::{Kernel, KernelConfig};
use so_kernel::logger;
use so_kernel::repl::Repl;

fn main() {
    logger::init();

    let kernel = Arc::new(Kernel::new(KernelConfig::default()));
    kernel.print_banner();

    if let Err(err) = kernel.init_backing_store() {
        eprintln!("Could not initialize the backing store: {}", err);
        std::process::exit(1);
    }

    Repl::new(Arc::clone(&kernel)).run();

    // EOF: wait for any round-robin workers, then clean up and leave.
    kernel.join_workers();
    kernel.remove_backing_store();
}
