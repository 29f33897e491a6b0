//! Fleet Config - 통합 설정
//!
//! 워커 실행과 코디네이터 동작을 제어하는 FleetConfig

use crate::storage::JsonStore;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// 설정 파일명
pub const FLEET_CONFIG_FILE: &str = "config.json";

// ============================================================================
// Fleet Config (통합)
// ============================================================================

/// fleetrun 통합 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetConfig {
    /// 버전 (마이그레이션용)
    #[serde(default = "default_version")]
    pub version: u32,

    /// 동시에 실행 가능한 워커 수
    #[serde(default = "default_forks")]
    pub forks: usize,

    /// 결과 채널 용량
    #[serde(default = "default_result_queue_capacity")]
    pub result_queue_capacity: usize,

    /// 워커마다 stdin 을 복제할지 여부
    #[serde(default = "default_true")]
    pub duplicate_stdin: bool,

    /// 템플릿/리소스 기본 디렉토리
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_dir: Option<String>,

    /// 로깅 설정
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            forks: default_forks(),
            result_queue_capacity: default_result_queue_capacity(),
            duplicate_stdin: true,
            resource_dir: None,
            log: LogConfig::default(),
        }
    }
}

impl FleetConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// 글로벌 + 프로젝트 병합 로드
    pub fn load() -> Result<Self> {
        let mut stores = Vec::with_capacity(2);

        // 1. 글로벌 설정
        if let Ok(global) = JsonStore::global() {
            stores.push(global);
        }

        // 2. 프로젝트 설정
        if let Ok(project) = JsonStore::current_project() {
            stores.push(project);
        }

        Self::load_layered(&stores)
    }

    /// 특정 저장소에서 로드 (없으면 기본값)
    pub fn load_from(store: &JsonStore) -> Result<Self> {
        Self::load_layered(std::slice::from_ref(store))
    }

    /// 저장소 순서대로 덮어쓰기 (뒤에 올수록 우선)
    pub fn load_layered(stores: &[JsonStore]) -> Result<Self> {
        let mut config = Self::new();
        for store in stores {
            if let Some(layer) = store.load_optional::<ConfigLayer>(FLEET_CONFIG_FILE)? {
                debug!(path = %store.file_path(FLEET_CONFIG_FILE).display(), "loaded config layer");
                config.apply(layer);
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// 프로젝트 설정 저장
    pub fn save_project(&self) -> Result<()> {
        let store = JsonStore::current_project()?;
        store.save(FLEET_CONFIG_FILE, self)
    }

    // ========================================================================
    // Merge / Validate
    // ========================================================================

    /// 파일에 명시된 값만 덮어쓰기
    pub fn apply(&mut self, layer: ConfigLayer) {
        if let Some(version) = layer.version {
            self.version = version;
        }
        if let Some(forks) = layer.forks {
            self.forks = forks;
        }
        if let Some(capacity) = layer.result_queue_capacity {
            self.result_queue_capacity = capacity;
        }
        if let Some(duplicate_stdin) = layer.duplicate_stdin {
            self.duplicate_stdin = duplicate_stdin;
        }
        if layer.resource_dir.is_some() {
            self.resource_dir = layer.resource_dir;
        }
        if let Some(log) = layer.log {
            self.log.apply(log);
        }
    }

    /// 설정 값 검증
    pub fn validate(&self) -> Result<()> {
        if self.forks == 0 {
            return Err(Error::Config("forks must be at least 1".to_string()));
        }
        if self.result_queue_capacity == 0 {
            return Err(Error::Config(
                "resultQueueCapacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn forks(mut self, forks: usize) -> Self {
        self.forks = forks;
        self
    }

    pub fn result_queue_capacity(mut self, capacity: usize) -> Self {
        self.result_queue_capacity = capacity;
        self
    }

    pub fn resource_dir(mut self, dir: impl Into<String>) -> Self {
        self.resource_dir = Some(dir.into());
        self
    }
}

// ============================================================================
// Config Layer (파일 하나의 내용)
// ============================================================================

/// 설정 파일 하나에 실제로 적힌 값들. 없는 키는 `None`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigLayer {
    pub version: Option<u32>,
    pub forks: Option<usize>,
    pub result_queue_capacity: Option<usize>,
    pub duplicate_stdin: Option<bool>,
    pub resource_dir: Option<String>,
    pub log: Option<LogLayer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogLayer {
    pub level: Option<String>,
    pub with_target: Option<bool>,
}

// ============================================================================
// Log Config
// ============================================================================

/// 로깅 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogConfig {
    /// 기본 로그 레벨 (RUST_LOG 가 우선)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 로그에 target 표시
    #[serde(default)]
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: false,
        }
    }
}

impl LogConfig {
    fn apply(&mut self, layer: LogLayer) {
        if let Some(level) = layer.level {
            self.level = level;
        }
        if let Some(with_target) = layer.with_target {
            self.with_target = with_target;
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn default_version() -> u32 {
    1
}

fn default_forks() -> usize {
    5
}

fn default_result_queue_capacity() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
