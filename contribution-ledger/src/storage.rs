//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `records` - Append-only contribution log (key: big-endian record index)
//! - `policy` - Current access policy (single key)
//!
//! Stats are not persisted; they are rebuilt on open by replaying `records`.

use crate::{
    access::AccessPolicy,
    error::{Error, Result},
    types::ContributionRecord,
    Config,
};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};

/// Column family names
const CF_RECORDS: &str = "records";
const CF_POLICY: &str = "policy";

const POLICY_KEY: &[u8] = b"access_policy";

/// Storage wrapper for RocksDB
pub struct Storage {
    db: DB,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("path", &self.db.path())
            .finish()
    }
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_RECORDS, Self::cf_options_records()),
            ColumnFamilyDescriptor::new(CF_POLICY, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = ?path, "Opened RocksDB");

        Ok(Self { db })
    }

    fn cf_options_records() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Record operations

    /// Write `records` at `first_index..` in one atomic batch
    pub fn append_records(&self, first_index: u64, records: &[ContributionRecord]) -> Result<()> {
        let cf = self.cf_handle(CF_RECORDS)?;
        let mut batch = WriteBatch::default();

        for (offset, record) in records.iter().enumerate() {
            let index = first_index + offset as u64;
            let value = bincode::serialize(record)?;
            batch.put_cf(cf, index.to_be_bytes(), &value);
        }

        self.db.write(batch)?;

        tracing::debug!(
            first_index,
            count = records.len(),
            "Records persisted"
        );

        Ok(())
    }

    /// Record at `index`, if persisted
    pub fn get_record(&self, index: u64) -> Result<Option<ContributionRecord>> {
        let cf = self.cf_handle(CF_RECORDS)?;
        match self.db.get_cf(cf, index.to_be_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Full record log in index order
    ///
    /// Fails if the persisted keys are not exactly `0..n`.
    pub fn load_records(&self) -> Result<Vec<ContributionRecord>> {
        let cf = self.cf_handle(CF_RECORDS)?;
        let mut records = Vec::new();

        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item?;

            let key_bytes = <[u8; 8]>::try_from(&key[..]).map_err(|_| {
                Error::InvariantViolation(format!("Malformed record key of {} bytes", key.len()))
            })?;
            let index = u64::from_be_bytes(key_bytes);
            let expected = records.len() as u64;
            if index != expected {
                return Err(Error::InvariantViolation(format!(
                    "Record log gap: expected index {}, found {}",
                    expected, index
                )));
            }

            records.push(bincode::deserialize(&value)?);
        }

        Ok(records)
    }

    // Policy operations

    /// Persist the access policy
    pub fn put_policy(&self, policy: &AccessPolicy) -> Result<()> {
        let cf = self.cf_handle(CF_POLICY)?;
        let value = bincode::serialize(policy)?;
        self.db.put_cf(cf, POLICY_KEY, &value)?;
        Ok(())
    }

    /// Persisted access policy, if any
    pub fn get_policy(&self) -> Result<Option<AccessPolicy>> {
        let cf = self.cf_handle(CF_POLICY)?;
        match self.db.get_cf(cf, POLICY_KEY)? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }
}
