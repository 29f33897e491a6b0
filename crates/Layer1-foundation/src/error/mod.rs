//! Error types for fleetrun
//!
//! 워크스페이스 공통 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// fleetrun 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // 인벤토리 / 플레이북
    // ========================================================================
    #[error("Inventory error: {0}")]
    Inventory(String),

    #[error("Playbook error: {0}")]
    Playbook(String),

    // ========================================================================
    // 실행 관련
    // ========================================================================
    #[error("Worker error: {0}")]
    Worker(String),

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 사용자에게 보여줄 수 있는 에러인지 확인
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::Config(_)
                | Error::Inventory(_)
                | Error::Playbook(_)
                | Error::NotFound(_)
                | Error::InvalidInput(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_errors() {
        assert!(Error::Playbook("missing hosts".into()).is_user_facing());
        assert!(!Error::Worker("join failed".into()).is_user_facing());
        assert!(!Error::Internal("boom".into()).is_user_facing());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.to_string(), "IO error: gone");
    }
}
