//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals.

pub mod dispenser;
pub mod uart_rx;

pub use dispenser::dispenser_task;
pub use uart_rx::uart_rx_task;
