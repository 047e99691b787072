//! Test utilities for authtabs
//!
//! Temporary files, error assertions and short-timing fixtures shared by the
//! unit tests.

use crate::config::TabLifecycleConfig;
use crate::error::Result;
use crate::tabs::Tab;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

/// Create a temporary directory for testing
///
/// # Returns
///
/// Returns a TempDir that will be cleaned up when dropped
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Create a test file with the given content
///
/// # Panics
///
/// Panics if file creation or writing fails
pub fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T>(result: Result<T>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}' but got Ok", expected),
        Err(e) => {
            let error_msg = e.to_string();
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

/// Lifecycle timings short enough for real-time tests: 50ms fallback, 5ms debounce
pub fn fast_tab_config() -> TabLifecycleConfig {
    TabLifecycleConfig::with_timings(Duration::from_millis(50), Duration::from_millis(5))
}

/// `count` ephemeral tabs with ids `prefix-0`, `prefix-1`, ...
pub fn ephemeral_tabs(prefix: &str, count: usize) -> Vec<Tab> {
    (0..count)
        .map(|i| Tab::ephemeral(format!("{}-{}", prefix, i)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthTabsError;

    #[test]
    fn test_temp_dir_creation() {
        let dir = temp_dir();
        assert!(dir.path().exists());
    }

    #[test]
    fn test_create_test_file() {
        let dir = temp_dir();
        let path = create_test_file(&dir, "authtabs.yaml", "tabs: {}");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "tabs: {}");
    }

    #[test]
    fn test_assert_error_contains_success() {
        let result: Result<()> = Err(AuthTabsError::Config("test error message".to_string()).into());
        assert_error_contains(result, "test error");
    }

    #[test]
    #[should_panic(expected = "Expected error containing")]
    fn test_assert_error_contains_ok() {
        assert_error_contains(Ok(()), "error");
    }

    #[test]
    #[should_panic(expected = "does not contain")]
    fn test_assert_error_contains_wrong_message() {
        let result: Result<()> = Err(AuthTabsError::Config("different error".to_string()).into());
        assert_error_contains(result, "not present");
    }

    #[test]
    fn test_fast_tab_config_is_valid() {
        let mut config = crate::config::Config::default();
        config.tabs = fast_tab_config();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ephemeral_tabs() {
        let tabs = ephemeral_tabs("t", 3);
        assert_eq!(tabs.len(), 3);
        assert_eq!(tabs[2].id.as_str(), "t-2");
        assert!(tabs.iter().all(|t| t.is_ephemeral));
    }
}
