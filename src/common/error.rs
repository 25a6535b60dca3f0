//! Error types for the CMA pool simulation.

use cmapool_mm::AllocError;
use thiserror::Error;

use crate::common::BufferId;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in the simulation.
///
/// Three kinds of failure share this type:
/// - parse errors: a log line could not be decoded
/// - logical errors: a decoded command doesn't fit the current state
/// - allocator faults: the range manager reported a problem
///
/// Only allocator faults that break the scan contract are fatal (see
/// [`Error::is_fatal`]); everything else is reported against its log line
/// and the replay moves on.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error while reading the log.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error reported by the range manager.
    #[error("allocator error: {0}")]
    Alloc(#[from] AllocError),

    /// Invalid pool settings.
    #[error("configuration error: {message}")]
    Config { message: String },

    // ------------------------------------------------------------------------
    // Parse errors
    // ------------------------------------------------------------------------
    /// The buffer identifier after the command is not hexadecimal.
    #[error("invalid address")]
    InvalidAddress,

    /// The command name is not followed by a space.
    #[error("unterminated command")]
    UnterminatedCommand,

    /// A command that takes no arguments was given some.
    #[error("unexpected args")]
    UnexpectedArgs,

    /// The command name is not recognized.
    #[error("unknown command {0}")]
    UnknownCommand(String),

    /// `create` without a decimal size.
    #[error("bad buffer size")]
    BadBufferSize,

    /// `madv` with a value other than `willneed` or `dontneed`.
    #[error("invalid madv value {0}")]
    InvalidAdvice(String),

    // ------------------------------------------------------------------------
    // Logical errors
    // ------------------------------------------------------------------------
    /// `create` for an identifier that is already live.
    #[error("creating buffer {0} but buffer already exists")]
    DuplicateBuffer(BufferId),

    /// The identifier doesn't name a live buffer.
    #[error("unknown buffer {0}")]
    UnknownBuffer(BufferId),

    /// `add_usecnt` on a buffer that is already in use.
    #[error("add_usecnt on buffer {0} but buffer already in use")]
    AlreadyInUse(BufferId),

    /// `remove_usecnt` on a buffer that is not in use.
    #[error("remove_usecnt on buffer {0} but buffer not in use")]
    NotInUse(BufferId),

    /// Direct insertion, purge and eviction all failed to make room.
    #[error("couldn't make space for buffer {id} of size {size}")]
    OutOfMemory { id: BufferId, size: u64 },
}

impl Error {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns true if processing must stop.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Alloc(e) => e.is_fatal(),
            _ => false,
        }
    }

    /// Returns true if the error comes from decoding a log line.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidAddress
                | Self::UnterminatedCommand
                | Self::UnexpectedArgs
                | Self::UnknownCommand(_)
                | Self::BadBufferSize
                | Self::InvalidAdvice(_)
        )
    }
}
