use crate::core::registry::Registry;
use crate::domain::ports::Storage;
use crate::utils::error::{PortalError, Result};
use chrono::{NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const USERS_FILE: &str = "users.json";
pub const COURSES_FILE: &str = "courses.json";
pub const BACKUP_DIR: &str = "backups";
pub const EXPORT_DIR: &str = "exports";
const BACKUP_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Collection kinds that can be backed up and restored individually.
pub const DATA_KINDS: [&str; 2] = ["users", "courses"];

/// Typed persistence over a byte-level [`Storage`]: pretty-printed JSON
/// documents with a copy-before-overwrite backup scheme.
pub struct PortalStore<S: Storage> {
    storage: S,
    retention_days: i64,
}

impl<S: Storage> PortalStore<S> {
    pub fn new(storage: S, retention_days: i64) -> Self {
        Self {
            storage,
            retention_days,
        }
    }

    pub fn load_registry(&self) -> Result<Registry> {
        let users = self.load_collection(USERS_FILE)?;
        let courses = self.load_collection(COURSES_FILE)?;
        Ok(Registry::from_parts(users, courses))
    }

    /// Writes both collections. Each existing file is copied into the backup
    /// directory first; a failed backup copy is logged and does not block the
    /// save itself.
    pub fn save_registry(&self, registry: &Registry) -> Result<()> {
        self.save_collection(USERS_FILE, registry.users())?;
        self.save_collection(COURSES_FILE, registry.courses())?;
        Ok(())
    }

    fn load_collection<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>> {
        if !self.storage.exists(file) {
            tracing::info!("{} does not exist yet; starting with an empty collection", file);
            return Ok(Vec::new());
        }
        let bytes = self.storage.read_file(file)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn save_collection<T: Serialize>(&self, file: &str, items: &[T]) -> Result<()> {
        if self.storage.exists(file) {
            if let Err(e) = self.backup_file(file) {
                tracing::warn!("backup of {} failed before save: {}", file, e);
            }
        }
        let bytes = serde_json::to_vec_pretty(items)?;
        self.storage.write_file(file, &bytes)
    }

    fn backup_file(&self, file: &str) -> Result<String> {
        let kind = file.trim_end_matches(".json");
        let stamp = Utc::now().format(BACKUP_STAMP_FORMAT);
        let backup_name = format!("{}/{}_{}.json", BACKUP_DIR, kind, stamp);

        let bytes = self.storage.read_file(file)?;
        self.storage.write_file(&backup_name, &bytes)?;
        tracing::debug!("backed up {} to {}", file, backup_name);
        Ok(backup_name)
    }

    /// Backs up every data file that exists, returning how many were copied.
    pub fn backup_all(&self) -> Result<usize> {
        let mut copied = 0;
        for kind in DATA_KINDS {
            let file = format!("{}.json", kind);
            if self.storage.exists(&file) {
                self.backup_file(&file)?;
                copied += 1;
            }
        }
        Ok(copied)
    }

    /// Backup file names, most recent first, optionally filtered to one kind.
    pub fn list_backups(&self, kind: Option<&str>) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .storage
            .list_files(BACKUP_DIR)?
            .into_iter()
            .filter(|n| n.ends_with(".json"))
            .filter(|n| kind.map_or(true, |k| n.starts_with(&format!("{}_", k))))
            .collect();
        names.sort();
        names.reverse();
        Ok(names)
    }

    /// Overwrites the live file of `kind` with the backup taken at `stamp`.
    pub fn restore(&self, kind: &str, stamp: &str) -> Result<()> {
        if !DATA_KINDS.contains(&kind) {
            return Err(PortalError::InvalidValueError {
                field: "kind".to_string(),
                value: kind.to_string(),
                reason: format!("Known kinds: {}", DATA_KINDS.join(", ")),
            });
        }

        let backup_name = format!("{}/{}_{}.json", BACKUP_DIR, kind, stamp);
        if !self.storage.exists(&backup_name) {
            return Err(PortalError::NotFound {
                kind: "backup",
                id: backup_name,
            });
        }

        let bytes = self.storage.read_file(&backup_name)?;
        self.storage.write_file(&format!("{}.json", kind), &bytes)?;
        tracing::info!("restored {}.json from {}", kind, backup_name);
        Ok(())
    }

    /// Deletes backups older than the retention window, judged by the stamp
    /// embedded in the file name. Unparseable names are left alone.
    pub fn cleanup_old_backups(&self) -> Result<usize> {
        let cutoff = Utc::now() - chrono::Duration::days(self.retention_days);
        let mut removed = 0;

        for name in self.storage.list_files(BACKUP_DIR)? {
            let Some(stamp) = backup_stamp(&name) else {
                continue;
            };
            let Ok(taken) = NaiveDateTime::parse_from_str(stamp, BACKUP_STAMP_FORMAT) else {
                tracing::warn!("skipping backup with unparseable stamp: {}", name);
                continue;
            };
            if taken.and_utc() < cutoff {
                self.storage.remove_file(&format!("{}/{}", BACKUP_DIR, name))?;
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!("cleaned up {} old backup files", removed);
        }
        Ok(removed)
    }

    /// Writes a single JSON bundle of all collections into the export
    /// directory, returning its relative path.
    pub fn export_bundle(&self, registry: &Registry) -> Result<String> {
        let stamp = Utc::now().format(BACKUP_STAMP_FORMAT);
        let name = format!("{}/portal_export_{}.json", EXPORT_DIR, stamp);

        let bundle = serde_json::json!({
            "export_timestamp": Utc::now(),
            "data": {
                "users": registry.users(),
                "courses": registry.courses(),
            },
        });
        self.storage.write_file(&name, &serde_json::to_vec_pretty(&bundle)?)?;
        Ok(name)
    }

    /// Writes report bytes (CSV etc.) into the export directory, returning
    /// the relative path.
    pub fn save_export(&self, name: &str, bytes: &[u8]) -> Result<String> {
        let path = format!("{}/{}", EXPORT_DIR, name);
        self.storage.write_file(&path, bytes)?;
        Ok(path)
    }
}

fn backup_stamp(name: &str) -> Option<&str> {
    name.strip_suffix(".json")?.split_once('_').map(|(_, stamp)| stamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::testing::MemoryStorage;
    use crate::domain::model::CourseSection;
    use crate::domain::user::{Account, Student, User};

    fn store() -> PortalStore<MemoryStorage> {
        PortalStore::new(MemoryStorage::new(), 30)
    }

    fn registry() -> Registry {
        let users = vec![User::Student(Student::new(
            Account::new("student1", "pass123", "Student 1", "student1@portal.edu", "STU001"),
            "STU001",
        ))];
        let courses = vec![CourseSection::new("CS101", "Intro", "teacher1", 30, "A")];
        Registry::from_parts(users, courses)
    }

    #[test]
    fn test_load_missing_files_gives_empty_registry() {
        let store = store();
        let registry = store.load_registry().unwrap();
        assert_eq!(registry.user_count(), 0);
        assert_eq!(registry.course_count(), 0);
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let store = store();
        store.save_registry(&registry()).unwrap();

        let loaded = store.load_registry().unwrap();
        assert_eq!(loaded.user_count(), 1);
        assert_eq!(loaded.course_count(), 1);
        assert!(loaded.find_student("STU001").is_some());
        assert!(loaded.course_by_key("CS101", "A").is_some());
    }

    #[test]
    fn test_second_save_creates_backups() {
        let store = store();
        store.save_registry(&registry()).unwrap();
        assert!(store.list_backups(None).unwrap().is_empty());

        store.save_registry(&registry()).unwrap();
        let backups = store.list_backups(None).unwrap();
        assert_eq!(backups.len(), 2);
        assert_eq!(store.list_backups(Some("users")).unwrap().len(), 1);
        assert_eq!(store.list_backups(Some("courses")).unwrap().len(), 1);
    }

    #[test]
    fn test_backup_all_counts_existing_files() {
        let store = store();
        assert_eq!(store.backup_all().unwrap(), 0);
        store.save_registry(&registry()).unwrap();
        assert_eq!(store.backup_all().unwrap(), 2);
    }

    #[test]
    fn test_restore_replaces_live_file() {
        let store = store();
        store.save_registry(&Registry::empty()).unwrap();
        store.save_registry(&registry()).unwrap();

        let backups = store.list_backups(Some("users")).unwrap();
        let stamp = backups[0]
            .strip_prefix("users_")
            .and_then(|n| n.strip_suffix(".json"))
            .unwrap();
        store.restore("users", stamp).unwrap();

        let loaded = store.load_registry().unwrap();
        assert_eq!(loaded.user_count(), 0);
    }

    #[test]
    fn test_restore_rejects_unknown_kind_and_missing_stamp() {
        let store = store();
        assert!(matches!(
            store.restore("grades", "20240101_000000"),
            Err(PortalError::InvalidValueError { .. })
        ));
        assert!(matches!(
            store.restore("users", "20240101_000000"),
            Err(PortalError::NotFound { .. })
        ));
    }

    #[test]
    fn test_cleanup_removes_only_expired_backups() {
        let store = store();
        // One ancient backup, one fresh.
        store
            .storage
            .write_file("backups/users_20200101_000000.json", b"[]")
            .unwrap();
        let fresh = format!(
            "backups/users_{}.json",
            Utc::now().format(BACKUP_STAMP_FORMAT)
        );
        store.storage.write_file(&fresh, b"[]").unwrap();

        assert_eq!(store.cleanup_old_backups().unwrap(), 1);
        assert_eq!(store.list_backups(None).unwrap().len(), 1);
    }

    #[test]
    fn test_cleanup_skips_unparseable_names() {
        let store = store();
        store
            .storage
            .write_file("backups/users_notastamp.json", b"[]")
            .unwrap();
        assert_eq!(store.cleanup_old_backups().unwrap(), 0);
        assert_eq!(store.list_backups(None).unwrap().len(), 1);
    }

    #[test]
    fn test_export_bundle() {
        let store = store();
        let name = store.export_bundle(&registry()).unwrap();
        assert!(name.starts_with("exports/portal_export_"));

        let bytes = store.storage.read_file(&name).unwrap();
        let bundle: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(bundle["data"]["users"].as_array().unwrap().len(), 1);
        assert_eq!(bundle["data"]["courses"].as_array().unwrap().len(), 1);
    }
}
