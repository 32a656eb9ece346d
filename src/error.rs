use thiserror::Error;
use warp::http::StatusCode;

/// Custom error types for the raffle server
#[derive(Debug, Error)]
pub enum RaffleError {
    /// Room lookup errors
    #[error("Room {0} not found")]
    RoomNotFound(String),

    #[error("Could not generate a unique room id after {attempts} attempts")]
    GeneratorExhausted { attempts: usize },

    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigurationParseFailed(String),
}

/// Convenience type alias for Results using RaffleError
pub type Result<T> = std::result::Result<T, RaffleError>;

impl RaffleError {
    /// HTTP status reported to clients for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            RaffleError::RoomNotFound(_) => StatusCode::BAD_REQUEST,
            RaffleError::GeneratorExhausted { .. }
            | RaffleError::InvalidConfiguration(_)
            | RaffleError::ConfigurationParseFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RaffleError::RoomNotFound("ZZZZ".to_string());
        assert_eq!(err.to_string(), "Room ZZZZ not found");

        let err = RaffleError::GeneratorExhausted { attempts: 3 };
        assert_eq!(
            err.to_string(),
            "Could not generate a unique room id after 3 attempts"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = RaffleError::InvalidConfiguration("ROOM_ID_LENGTH must be greater than zero".into());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: ROOM_ID_LENGTH must be greater than zero"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            RaffleError::RoomNotFound("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RaffleError::GeneratorExhausted { attempts: 1 }.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
