// Error handling utilities for consistent error messages and exit codes

use std::process;

/// Exit with a user error (exit code 1)
/// User errors are for invalid input, missing resources, etc.
pub fn user_error(message: &str) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

/// Validate that a string is not empty
pub fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} cannot be empty", field_name))
    } else {
        Ok(())
    }
}

/// Validate an id (positive integer); `what` names the entity in messages
pub fn validate_id(id_str: &str, what: &str) -> Result<i64, String> {
    id_str.trim().parse::<i64>()
        .map_err(|_| format!("Invalid {} ID: '{}'. ID must be a number.", what, id_str))
        .and_then(|id| {
            if id > 0 {
                Ok(id)
            } else {
                Err(format!("Invalid {} ID: {}. ID must be positive.", what, id))
            }
        })
}

/// Parse a comma separated id list (`3` or `3,4,7`), keeping order and
/// dropping repeats
pub fn parse_id_list(spec: &str, what: &str) -> Result<Vec<i64>, String> {
    let mut ids = Vec::new();
    for part in spec.split(',') {
        if part.trim().is_empty() {
            return Err(format!("Invalid {} ID list: '{}'", what, spec));
        }
        let id = validate_id(part, what)?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Validate a todo priority (any integer)
pub fn validate_priority(value: &str) -> Result<i64, String> {
    value.trim().parse::<i64>()
        .map_err(|_| format!("Invalid priority: '{}'. Priority must be a number.", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_non_empty() {
        assert!(validate_non_empty("test", "field").is_ok());
        assert!(validate_non_empty("", "field").is_err());
        assert!(validate_non_empty("   ", "field").is_err());
    }

    #[test]
    fn test_validate_id() {
        assert_eq!(validate_id("1", "record"), Ok(1));
        assert_eq!(validate_id("42", "record"), Ok(42));
        assert!(validate_id("0", "record").is_err());
        assert!(validate_id("-1", "record").is_err());
        assert!(validate_id("abc", "todo").unwrap_err().contains("todo"));
        assert!(validate_id("", "record").is_err());
    }

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("3", "record"), Ok(vec![3]));
        assert_eq!(parse_id_list("3,4,7,4", "record"), Ok(vec![3, 4, 7]));
        assert!(parse_id_list("3,,4", "record").is_err());
        assert!(parse_id_list("3,x", "record").is_err());
    }

    #[test]
    fn test_validate_priority() {
        assert_eq!(validate_priority("-2"), Ok(-2));
        assert!(validate_priority("high").is_err());
    }
}
