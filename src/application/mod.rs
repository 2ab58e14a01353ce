pub mod agents;
pub mod decision;
pub mod memory;
pub mod orchestrator;
pub mod screener;
pub mod session;
