/// Flow deployment records
pub mod flow_deployment;

/// Process instance aggregate and its status rules
pub mod process_instance;

/// Node instance history records
pub mod node_instance;

/// Process variables and their snapshots
pub mod instance_data;

/// Per-operation execution context
pub mod context;

/// Repository interfaces
pub mod repository;

/// Instance cache interface
pub mod cache;
