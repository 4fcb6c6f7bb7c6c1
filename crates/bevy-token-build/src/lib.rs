//! Build-time utilities for bevy-token.
//!
//! This crate provides tools for:
//! - Parsing `tokens.toml` configuration files
//! - Managing `tokens.lock.toml` lock files for change detection
//! - Generating Rust code with the `token_hierarchy!` macro
//!
//! # Usage in build.rs
//!
//! ```ignore
//! // build.rs
//! fn main() {
//!     println!("cargo:rerun-if-changed=tokens.toml");
//!     let out = std::path::Path::new(&std::env::var("OUT_DIR").unwrap()).join("tokens.rs");
//!     bevy_token_build::generate("tokens.toml", out).expect("failed to generate tokens");
//! }
//!
//! // lib.rs
//! include!(concat!(env!("OUT_DIR"), "/tokens.rs"));
//! ```
//!
//! # tokens.toml
//!
//! ```toml
//! module_name = "StatusTokens"
//! on_remove = "error"          # or "warn"
//!
//! [[class]]
//! path = "Status"
//! root = { string_index = true, int_index = true }
//!
//! [[class]]
//! path = "Status.Success"
//! tokens = [{ name = "COMPLETED", int = 0 }, { name = "PAUSED", int = 1 }]
//!
//! [[class]]
//! path = "Status.Error"
//! tokens = ["USER_ERROR", { name = "MECHANICAL_ERROR", float = 0.5 }]
//! ```
//!
//! # Lock File Mechanism
//!
//! Persisted tokens compare by class, name and int value, so the lock file
//! records that triple for every token ever generated:
//!
//! - First build: writes `tokens.lock.toml`
//! - New tokens: appended to the lock
//! - Removed token: **error** (default) or, with `on_remove = "warn"`, the
//!   token stays generated as `#[deprecated]`
//! - Changed int value: always an error
//!
//! To intentionally break compatibility, delete the lock file and rebuild.

mod codegen;
mod lock;
mod toml_parser;

pub use codegen::{generate_token_code, generate_token_code_from_lock};
pub use lock::{LockDiff, LockEntry, LockFile, LockFileError, Renumbered};
pub use toml_parser::{ClassEntry, OnRemove, RootEntry, TokenEntry, TokensConfig, TokensConfigError};

use std::path::Path;

use tracing::{debug, warn};

/// Main entry point for build.rs integration.
///
/// Reads `tokens.toml`, compares with `tokens.lock.toml` next to it, and
/// writes the generated Rust source to `output_path`.
///
/// # Errors
///
/// - `tokens.toml` cannot be read, parsed or validated
/// - a locked token was removed and `on_remove = "error"`
/// - a locked token's int value changed
/// - the lock or output file cannot be written
pub fn generate(
    config_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
) -> Result<(), GenerateError> {
    let config_path = config_path.as_ref();
    let lock_path = config_path.with_extension("lock.toml");

    generate_with_lock(config_path, &lock_path, output_path)
}

/// Generate with explicit lock file path.
pub fn generate_with_lock(
    config_path: impl AsRef<Path>,
    lock_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
) -> Result<(), GenerateError> {
    let config_path = config_path.as_ref();
    let lock_path = lock_path.as_ref();
    let output_path = output_path.as_ref();

    // 1. Parse tokens.toml
    let config = TokensConfig::from_file(config_path)?;

    // 2. Load the lock, or start one
    let mut lock = if lock_path.exists() {
        let mut lock = LockFile::from_file(lock_path)?;
        apply_diff(&config, &mut lock)?;
        lock
    } else {
        debug!(lock = %lock_path.display(), "creating token lock file");
        LockFile::from_config(&config)
    };

    // 3. Write the lock, then the code
    lock.touch();
    lock.write_to_file(lock_path)?;

    let code = generate_token_code_from_lock(&config, &lock);
    std::fs::write(output_path, code)?;

    Ok(())
}

fn apply_diff(config: &TokensConfig, lock: &mut LockFile) -> Result<(), GenerateError> {
    let diff = lock.diff(config);

    if !diff.renumbered.is_empty() {
        return Err(GenerateError::Renumbered(format_renumbered_error(&diff)));
    }

    if !diff.removed.is_empty() {
        match config.on_remove {
            OnRemove::Error => {
                return Err(GenerateError::LockMismatch(format_lock_error(&diff)));
            }
            OnRemove::Warn => {
                for entry in &diff.removed {
                    warn!(token = %entry.qualified(), "token removed from tokens.toml, generating it as deprecated");
                    println!(
                        "cargo:warning=bevy-token: token '{}' was removed from tokens.toml and is now deprecated",
                        entry.qualified()
                    );
                    lock.mark_deprecated(&entry.class, &entry.name);
                }
            }
        }
    }

    for entry in diff.revived {
        debug!(token = %entry.qualified(), "deprecated token restored");
        lock.revive(&entry.class, &entry.name);
    }
    for entry in diff.added {
        debug!(token = %entry.qualified(), "locking new token");
        lock.add_entry(entry);
    }

    Ok(())
}

fn format_lock_error(diff: &LockDiff) -> String {
    let mut msg = String::new();
    msg.push_str("bevy-token: Lock file mismatch!\n\n");
    msg.push_str("  Missing in tokens.toml (existed in lock):\n");
    for entry in &diff.removed {
        msg.push_str(&format!("    - {}\n", entry.qualified()));
    }
    msg.push_str("\n  To fix:\n");
    msg.push_str("    1. Add the token(s) back to tokens.toml, OR\n");
    msg.push_str("    2. Set `on_remove = \"warn\"` in tokens.toml to deprecate instead, OR\n");
    msg.push_str("    3. Delete tokens.lock.toml to regenerate (BREAKING CHANGE!)\n");
    msg
}

fn format_renumbered_error(diff: &LockDiff) -> String {
    let mut msg = String::new();
    msg.push_str("bevy-token: int value changed for locked token(s):\n\n");
    for r in &diff.renumbered {
        msg.push_str(&format!(
            "    - {}.{}: {:?} -> {:?}\n",
            r.class, r.name, r.locked, r.current
        ));
    }
    msg.push_str("\n  Stored tokens would no longer compare equal. Restore the old value,\n");
    msg.push_str("  or delete tokens.lock.toml to regenerate (BREAKING CHANGE!)\n");
    msg
}

/// Errors that can occur during generation.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("config error: {0}")]
    Config(#[from] TokensConfigError),
    #[error("lock file error: {0}")]
    Lock(#[from] LockFileError),
    /// Locked tokens removed with `on_remove = "error"`
    #[error("{0}")]
    LockMismatch(String),
    /// Locked tokens whose int value changed
    #[error("{0}")]
    Renumbered(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
