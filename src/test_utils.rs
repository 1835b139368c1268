//! Shared test utilities for linkmend.
//!
//! This module provides common helpers used across multiple test modules.
//! It is only compiled when running tests.

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Creates a temporary vault directory for testing.
///
/// Returns a tuple of (TempDir, PathBuf) where:
/// - TempDir: The temp directory handle (must be kept alive for the test duration)
/// - PathBuf: The path to the vault subdirectory
///
/// Corpus scanning skips hidden directories, and on some systems temp
/// directories are created under paths like `/tmp/.tmpXXXXX`; the non-hidden
/// "vault" subdirectory keeps the scan working.
pub fn create_test_vault_dir() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let vault_dir = temp_dir.path().join("vault");
    fs::create_dir(&vault_dir).expect("Failed to create vault subdirectory");
    (temp_dir, vault_dir)
}
