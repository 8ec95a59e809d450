use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::error::Result;

const PROJECT_FINGERPRINTS: TableDefinition<&str, u64> =
    TableDefinition::new("project_fingerprints");
const FILE_METADATA: TableDefinition<u64, &[u8]> =
    TableDefinition::new("file_metadata");

/// The persistent incremental-build store (cache.redb).
///
/// Holds one fingerprint per project (the tree-snapshot hash of the last
/// successful compile) and per-file metadata backing change reporting.
pub struct CacheDb {
    db: Database,
}

impl CacheDb {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path)?;

        // Ensure all tables exist by opening them in a write transaction.
        let txn = db.begin_write()?;
        txn.open_table(PROJECT_FINGERPRINTS)?;
        txn.open_table(FILE_METADATA)?;
        txn.commit()?;

        Ok(Self { db })
    }

    // -- Project fingerprints --

    pub fn set_fingerprint(&self, project: &str, fingerprint: u64) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PROJECT_FINGERPRINTS)?;
            table.insert(project, fingerprint)?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_fingerprint(&self, project: &str) -> Result<Option<u64>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(PROJECT_FINGERPRINTS)?;
        Ok(table.get(project)?.map(|v| v.value()))
    }

    pub fn remove_fingerprint(&self, project: &str) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut table = txn.open_table(PROJECT_FINGERPRINTS)?;
            table.remove(project)?.is_some()
        };
        txn.commit()?;
        Ok(removed)
    }

    // -- File metadata --

    pub fn set_file_metadata(&self, key: u64, data: &[u8]) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(FILE_METADATA)?;
            table.insert(key, data)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Store metadata for multiple files in a single transaction.
    pub fn batch_set_file_metadata(
        &self,
        entries: &[(u64, Vec<u8>)],
    ) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(FILE_METADATA)?;
            for (key, data) in entries {
                table.insert(key, data.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    pub fn list_all_file_metadata(&self) -> Result<Vec<(u64, Vec<u8>)>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(FILE_METADATA)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let (k, v) = entry?;
            result.push((k.value(), v.value().to_vec()));
        }
        Ok(result)
    }

    pub fn remove_file_metadata(&self, keys: &[u64]) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(FILE_METADATA)?;
            for key in keys {
                table.remove(key)?;
            }
        }
        txn.commit()?;
        Ok(())
    }
}
