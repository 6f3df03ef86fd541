//! redb table definitions for the slotswap state store.

use redb::TableDefinition;

/// The deployment record, stored under [`CURRENT_KEY`].
pub const DEPLOYMENT: TableDefinition<&str, &[u8]> = TableDefinition::new("deployment");

/// Operation journal keyed by zero-padded `{epoch_millis}`, plus a
/// zero-padded `-NNNN` suffix for entries sharing a millisecond.
pub const JOURNAL: TableDefinition<&str, &[u8]> = TableDefinition::new("journal");

/// Key of the single deployment record.
pub const CURRENT_KEY: &str = "current";
