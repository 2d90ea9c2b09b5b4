//! Unit tests for query error types

#[cfg(test)]
mod tests {
    use crate::db::DbError;
    use crate::query::error::{ParseError, SearchError};
    use std::error::Error;

    #[test]
    fn test_tag_limit_message() {
        let error = SearchError::TagLimitExceeded { count: 7, limit: 6 };
        assert_eq!(
            error.to_string(),
            "You cannot search for more than 6 tags at a time (7 given)"
        );
    }

    #[test]
    fn test_database_error_from() {
        let error: SearchError = DbError::InvalidInput("bad key".to_string()).into();
        assert!(matches!(error, SearchError::DatabaseError(_)));
        assert!(error.to_string().contains("bad key"));
    }

    #[test]
    fn test_database_error_source() {
        let error: SearchError = DbError::NotFound("user alice".to_string()).into();
        assert!(error.source().is_none());
    }

    #[test]
    fn test_tag_limit_has_no_source() {
        let error = SearchError::TagLimitExceeded { count: 10, limit: 6 };
        assert!(error.source().is_none());
    }

    #[test]
    fn test_parse_error_display() {
        assert_eq!(
            ParseError::InvalidRange("5..".to_string()).to_string(),
            "Invalid range: 5.."
        );
        assert_eq!(
            ParseError::InvalidDuration("3q".to_string()).to_string(),
            "Invalid duration: 3q"
        );
    }

    #[test]
    fn test_parse_error_equality() {
        let a = ParseError::InvalidValue("x".to_string());
        assert_eq!(a.clone(), a);
        assert_ne!(a, ParseError::InvalidDate("x".to_string()));
    }

    #[test]
    fn test_error_debug() {
        let error = SearchError::TagLimitExceeded { count: 8, limit: 6 };
        let debug = format!("{error:?}");
        assert!(debug.contains("TagLimitExceeded"));
        assert!(debug.contains('8'));
    }
}
