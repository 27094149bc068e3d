/*!
 * Transaction Helper Utilities
 *
 * Scoped transactions: `begin` hands out a `DatabaseTransaction`, `commit`
 * finishes it. A transaction dropped without `commit` is rolled back.
 */

use crate::errors::ServiceError;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use tracing::debug;

/// Opens a transaction on the pool.
pub async fn begin(db: &DatabaseConnection) -> Result<DatabaseTransaction, ServiceError> {
    let txn = db.begin().await?;
    debug!("transaction started");
    Ok(txn)
}

/// Commits a transaction opened with [`begin`].
pub async fn commit(txn: DatabaseTransaction) -> Result<(), ServiceError> {
    txn.commit().await?;
    debug!("transaction committed");
    Ok(())
}
