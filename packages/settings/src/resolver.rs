// ABOUTME: Cached get/set access to settings by dotted path
// ABOUTME: Resolves "section" and "section.key" paths against storage and the cache

use setkeep_storage::BaseCache;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::SettingsError;
use crate::storage::SettingStorage;

/// Cache holding single setting values; a cached `None` is a stored NULL
pub type ValueCache = dyn BaseCache<Value = Option<String>>;

const CACHE_KEY_PREFIX: &str = "setting";

/// Cache key for one setting: `setting_{section}_{key}`
pub fn cache_key(section: &str, key: &str) -> String {
    format!("{}_{}_{}", CACHE_KEY_PREFIX, section, key)
}

/// A parsed lookup path. Only the first dot separates section from key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingPath<'a> {
    Section(&'a str),
    Key { section: &'a str, key: &'a str },
}

impl<'a> SettingPath<'a> {
    pub fn parse(path: &'a str) -> Self {
        match path.split_once('.') {
            Some((section, key)) => SettingPath::Key { section, key },
            None => SettingPath::Section(path),
        }
    }

    /// Parse a path that must name a single setting
    pub fn parse_key(path: &'a str) -> Result<(&'a str, &'a str), SettingsError> {
        match Self::parse(path) {
            SettingPath::Key { section, key } => Ok((section, key)),
            SettingPath::Section(_) => Err(SettingsError::InvalidPath(path.to_string())),
        }
    }
}

/// Result of a lookup: one value, or every value of a section
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Value(Option<String>),
    Section(BTreeMap<String, Option<String>>),
}

impl Resolved {
    pub fn into_value(self) -> Option<String> {
        match self {
            Resolved::Value(value) => value,
            Resolved::Section(_) => None,
        }
    }
}

#[derive(Clone)]
pub struct SettingsResolver {
    storage: SettingStorage,
    cache: Arc<ValueCache>,
}

impl SettingsResolver {
    pub fn new(storage: SettingStorage, cache: Arc<ValueCache>) -> Self {
        Self { storage, cache }
    }

    pub fn storage(&self) -> &SettingStorage {
        &self.storage
    }

    pub fn cache(&self) -> &Arc<ValueCache> {
        &self.cache
    }

    /// Look up `section` or `section.key`.
    ///
    /// A single value that is NULL or empty resolves to `default`; a missing
    /// row is `NotFound`. A section with no rows resolves to an empty map.
    /// Only NULL and `""` count as empty: a stored `"0"` is returned as is.
    pub async fn get(&self, path: &str, default: Option<&str>) -> Result<Resolved, SettingsError> {
        match SettingPath::parse(path) {
            SettingPath::Section(section) => Ok(Resolved::Section(self.get_section(section).await?)),
            SettingPath::Key { section, key } => Ok(Resolved::Value(
                self.get_key(section, key, default).await?,
            )),
        }
    }

    /// Single value lookup; `path` must be `section.key`
    pub async fn get_value(
        &self,
        path: &str,
        default: Option<&str>,
    ) -> Result<Option<String>, SettingsError> {
        let (section, key) = SettingPath::parse_key(path)?;
        self.get_key(section, key, default).await
    }

    /// Every value in a section, uncached
    pub async fn get_section(
        &self,
        section: &str,
    ) -> Result<BTreeMap<String, Option<String>>, SettingsError> {
        let settings = self.storage.find_by_section(section).await?;
        Ok(settings.into_iter().map(|s| (s.key, s.value)).collect())
    }

    async fn get_key(
        &self,
        section: &str,
        key: &str,
        default: Option<&str>,
    ) -> Result<Option<String>, SettingsError> {
        let cache_key = cache_key(section, key);

        let value = match self.cache.get(&cache_key).await? {
            Some(cached) => cached,
            None => {
                let setting = self
                    .storage
                    .find(section, key)
                    .await?
                    .ok_or_else(|| SettingsError::not_found(section, key))?;

                debug!(section, key, "Setting loaded from storage");
                self.cache.set(&cache_key, setting.value.clone()).await?;
                setting.value
            }
        };

        Ok(match value {
            Some(v) if !v.is_empty() => Some(v),
            _ => default.map(str::to_string),
        })
    }

    /// Persist a new value for `section.key`.
    ///
    /// Returns whether storage accepted the write. On success the cache entry
    /// is replaced with the new value.
    pub async fn set(&self, path: &str, value: Option<&str>) -> Result<bool, SettingsError> {
        let (section, key) = SettingPath::parse_key(path)?;

        if self.storage.find(section, key).await?.is_none() {
            return Err(SettingsError::not_found(section, key));
        }

        let saved = self.storage.update_value(section, key, value).await?;
        if saved {
            self.cache
                .set(&cache_key(section, key), value.map(str::to_string))
                .await?;
            debug!(section, key, "Setting value saved");
        }

        Ok(saved)
    }

    /// Drop the cached value for `section.key`
    pub async fn invalidate(&self, section: &str, key: &str) -> Result<bool, SettingsError> {
        Ok(self.cache.delete(&cache_key(section, key)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_format() {
        assert_eq!(cache_key("general", "title"), "setting_general_title");
    }

    #[test]
    fn test_path_parsing() {
        assert_eq!(SettingPath::parse("general"), SettingPath::Section("general"));
        assert_eq!(
            SettingPath::parse("general.title"),
            SettingPath::Key {
                section: "general",
                key: "title"
            }
        );
        // Only the first dot splits
        assert_eq!(
            SettingPath::parse("mail.smtp.host"),
            SettingPath::Key {
                section: "mail",
                key: "smtp.host"
            }
        );
        assert!(matches!(
            SettingPath::parse_key("general"),
            Err(SettingsError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_resolved_into_value() {
        assert_eq!(Resolved::Value(Some("x".into())).into_value(), Some("x".to_string()));
        assert_eq!(Resolved::Section(BTreeMap::new()).into_value(), None);
    }
}
