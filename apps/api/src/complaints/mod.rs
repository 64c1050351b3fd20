// Complaint domain: intake, access control, message threads, persistence.
// Handlers stay thin; every authorization decision lives in `access`.

pub mod access;
pub mod handlers;
pub mod intake;
pub mod messages;
pub mod store;
