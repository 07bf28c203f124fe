use crate::utils::error::Result;

/// Byte-level storage under a data directory. Paths are relative and use
/// forward slashes; implementations create parent directories on write.
pub trait Storage {
    fn read_file(&self, path: &str) -> Result<Vec<u8>>;
    fn write_file(&self, path: &str, data: &[u8]) -> Result<()>;
    fn exists(&self, path: &str) -> bool;
    /// File names (not paths) directly inside `dir`; empty if `dir` is absent.
    fn list_files(&self, dir: &str) -> Result<Vec<String>>;
    fn remove_file(&self, path: &str) -> Result<()>;
}

pub trait ConfigProvider {
    fn data_dir(&self) -> &str;
    fn backup_retention_days(&self) -> i64;
    fn default_capacity(&self) -> usize;
}
