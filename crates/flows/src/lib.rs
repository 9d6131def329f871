pub mod event;
pub mod executor;
pub mod retry;
pub mod store;

pub use event::{CloudEvent, DispatchData, RESULT_EVENT_SOURCE, RESULT_EVENT_TYPE, SPECVERSION};
pub use executor::{FlowExecutor, HttpFlowExecutor};
pub use retry::with_retry;
pub use store::{FlowRecord, FlowStore};
