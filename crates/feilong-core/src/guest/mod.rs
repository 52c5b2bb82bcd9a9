//! Guest resource: spec, create pipeline, lease wait, read, update, delete.

pub mod create;
pub mod delete;
pub mod lease;
pub mod read;
pub mod spec;
pub mod update;

pub use create::create_guest;
pub use delete::delete_guest;
pub use lease::{read_addresses, LeaseResult, LeaseState, LeaseWaiter};
pub use read::{observe_guest, read_guest, reconcile, GuestObservedState};
pub use spec::{derive_system_name, GuestSpec, GuestState};
pub use update::{plan_update, update_guest, UpdatePlan};
