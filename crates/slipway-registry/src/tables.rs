//! redb table definitions for the Slipway registry.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized domain
//! types). Version keys are composite: `{service_id}:{version}`.

use redb::TableDefinition;

/// Service records keyed by `{service_id}`.
pub const SERVICES: TableDefinition<&str, &[u8]> = TableDefinition::new("services");

/// Service versions keyed by `{service_id}:{version}`.
pub const VERSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("versions");

/// Operation records keyed by `{operation_id}`.
pub const OPERATIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("operations");

/// Auth configurations keyed by `{service_id}`.
pub const AUTH_CONFIGS: TableDefinition<&str, &[u8]> = TableDefinition::new("auth_configs");
