//! Config - 통합 설정 관리
//!
//! - `fleet.rs` - FleetConfig 통합 설정 (워커/코디네이터/로깅)

mod fleet;

pub use fleet::{ConfigLayer, FleetConfig, LogConfig, LogLayer, FLEET_CONFIG_FILE};
