pub mod health_handlers;
pub mod plugin_handlers;
pub mod storage_handlers;
