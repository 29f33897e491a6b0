//! JSON 파일 저장소 - 설정 파일 한 디렉토리

use crate::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::io;
use std::path::PathBuf;

/// 글로벌 설정 디렉토리 이름 (~/.config/fleetrun/)
const GLOBAL_DIR: &str = "fleetrun";

/// 프로젝트 설정 디렉토리 이름 (.fleetrun/)
const PROJECT_DIR: &str = ".fleetrun";

/// 디렉토리 하나에 묶인 JSON 설정 파일들
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// ~/.config/fleetrun/
    pub fn global() -> Result<Self> {
        dirs::config_dir()
            .map(|dir| Self::new(dir.join(GLOBAL_DIR)))
            .ok_or_else(|| Error::Config("no user config directory on this platform".to_string()))
    }

    /// <root>/.fleetrun/
    pub fn project(root: impl Into<PathBuf>) -> Self {
        Self::new(root.into().join(PROJECT_DIR))
    }

    /// ./.fleetrun/
    pub fn current_project() -> Result<Self> {
        Ok(Self::project(std::env::current_dir()?))
    }

    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// 파일이 없으면 `None`, 읽기/파싱 실패는 `Error::Config`
    pub fn load_optional<T: DeserializeOwned>(&self, filename: &str) -> Result<Option<T>> {
        let path = self.file_path(filename);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Config(format!("cannot read {}: {}", path.display(), e)));
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| Error::Config(format!("invalid JSON in {}: {}", path.display(), e)))
    }

    /// pretty JSON 으로 저장 (디렉토리 자동 생성)
    pub fn save<T: Serialize>(&self, filename: &str, data: &T) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let content = serde_json::to_string_pretty(data)?;
        std::fs::write(self.file_path(filename), content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        forks: usize,
    }

    #[test]
    fn test_save_creates_dir_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::project(dir.path());

        store.save("sample.json", &Sample { forks: 3 }).unwrap();
        assert!(dir.path().join(".fleetrun/sample.json").is_file());

        let loaded: Option<Sample> = store.load_optional("sample.json").unwrap();
        assert_eq!(loaded, Some(Sample { forks: 3 }));
    }

    #[test]
    fn test_load_optional_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("absent"));

        let loaded: Option<Sample> = store.load_optional("missing.json").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
        let store = JsonStore::new(dir.path());

        let err = store.load_optional::<Sample>("bad.json").unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("bad.json")));
    }

    #[test]
    fn test_save_unserializable_is_json_error() {
        use std::collections::HashMap;

        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());

        // JSON object keys must be strings
        let mut data = HashMap::new();
        data.insert(vec![1u8], 1);
        assert!(matches!(store.save("x.json", &data), Err(Error::Json(_))));
    }
}
