//! Background work owned by the server process.

mod publisher;
mod scheduler;

pub use publisher::{PublicationSweep, register_publication_sweep};
pub use scheduler::{Scheduler, SchedulerConfig};
