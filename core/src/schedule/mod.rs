//! Scheduled-operation registry, cron triggers and persistence.

mod registry;
mod store;
mod trigger;

pub use registry::{
    OperationDispatcher, ScheduledOperation, ScheduledOperationInfo, ScheduledOperationRegistry,
};
pub use store::OperationStore;
pub use trigger::CancelPolicy;
