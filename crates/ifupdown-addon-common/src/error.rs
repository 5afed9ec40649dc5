//! Error types for addon operations.
//!
//! Two layers of errors exist:
//!
//! - [`LinkError`]: failures reported by the link layer (kernel rejected a
//!   command, the `ip` binary could not be spawned, output did not parse).
//!   Addons catch these at the call site and log them.
//! - [`AddonError`]: failures an addon surfaces to its caller. Only
//!   configuration problems end up here; a link failure is wrapped only when
//!   a caller explicitly asks for it with `?`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for link layer operations.
pub type LinkResult<T> = Result<T, LinkError>;

/// Result type alias for addon operations.
pub type AddonResult<T> = Result<T, AddonError>;

/// Errors raised by the link layer.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Failed to execute a shell command (spawn error).
    #[error("Failed to execute shell command '{command}': {source}")]
    ShellExec {
        /// The command that failed to execute.
        command: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Shell command returned non-zero exit code.
    #[error("Shell command failed: '{command}' (exit code {exit_code}): {output}")]
    ShellCommandFailed {
        /// The command that failed.
        command: String,
        /// The exit code.
        exit_code: i32,
        /// Combined stdout/stderr output.
        output: String,
    },

    /// Command output could not be parsed.
    #[error("Failed to parse output of '{command}': {message}")]
    Parse {
        /// The command whose output was malformed.
        command: String,
        /// Error message.
        message: String,
    },

    /// Interface does not exist.
    #[error("Interface '{name}' not found")]
    NotFound {
        /// The interface name.
        name: String,
    },
}

impl LinkError {
    /// Creates a parse error.
    pub fn parse(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }
}

/// Errors surfaced by addons.
#[derive(Debug, Error)]
pub enum AddonError {
    /// Configuration validation error.
    #[error("Invalid configuration for {iface}: {attr}: {message}")]
    InvalidConfig {
        /// The interface the attribute belongs to.
        iface: String,
        /// The attribute that failed validation.
        attr: String,
        /// Error message.
        message: String,
    },

    /// Failed to read an interfaces file.
    #[error("Failed to read interfaces file '{path}': {source}")]
    ConfigRead {
        /// Path of the file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Syntax error in an interfaces file.
    #[error("Parse error at line {line}: {message}")]
    ConfigParse {
        /// 1-based line number.
        line: usize,
        /// Error message.
        message: String,
    },

    /// Link layer failure propagated to the caller.
    #[error(transparent)]
    Link(#[from] LinkError),
}

impl AddonError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(
        iface: impl Into<String>,
        attr: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidConfig {
            iface: iface.into(),
            attr: attr.into(),
            message: message.into(),
        }
    }

    /// Creates a parse error.
    pub fn config_parse(line: usize, message: impl Into<String>) -> Self {
        Self::ConfigParse {
            line,
            message: message.into(),
        }
    }

    /// Returns true for errors caused by the user's configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            AddonError::InvalidConfig { .. }
                | AddonError::ConfigParse { .. }
                | AddonError::ConfigRead { .. }
        )
    }
}
