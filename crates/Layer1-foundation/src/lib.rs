//! # fleet-foundation
//!
//! Foundation layer for fleetrun:
//! - Error: 공통 에러 타입
//! - Config: 통합 설정 (FleetConfig, LogConfig)
//! - Storage: JsonStore (글로벌/프로젝트 설정 파일)

pub mod config;
pub mod error;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{ConfigLayer, FleetConfig, LogConfig, LogLayer, FLEET_CONFIG_FILE};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::JsonStore;
