//! Decoding of `@@@` command lines.
//!
//! A relevant line looks like
//!
//! ```text
//! [   12.345678] @@@ create 8f3a2c00 16384 nomove
//! |___________|      |____| |______| |__________|
//!   timestamp       command  hex id      args
//! ```
//!
//! Anything before the marker is ignored, except for an optional kernel
//! timestamp at the very start of the line.

use std::fmt;
use std::time::Duration;

use crate::buffer::Advice;
use crate::common::config::COMMAND_MARKER;
use crate::common::{BufferId, Error, Result};

/// What a log line asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Register a buffer and page it in.
    Create { size: u64, pinned: bool },
    /// Release a buffer.
    Destroy,
    /// Set the in-use flag.
    AddUsecnt,
    /// Clear the in-use flag.
    RemoveUsecnt,
    /// Touch a buffer.
    Use,
    /// Change the madvise hint.
    Madvise(Advice),
}

impl Command {
    /// The name of the command in the log.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Create { .. } => "create",
            Command::Destroy => "destroy",
            Command::AddUsecnt => "add_usecnt",
            Command::RemoveUsecnt => "remove_usecnt",
            Command::Use => "use",
            Command::Madvise(_) => "madv",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Create { size, pinned } => {
                write!(f, "create {size}")?;
                if *pinned {
                    f.write_str(" nomove")?;
                }
                Ok(())
            }
            Command::Madvise(advice) => write!(f, "madv {advice}"),
            other => f.write_str(other.name()),
        }
    }
}

/// A decoded command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogCommand {
    /// Kernel timestamp of the line, if it had one.
    pub timestamp: Option<Duration>,
    /// The buffer the command applies to.
    pub buffer: BufferId,
    /// The command itself.
    pub command: Command,
}

/// Decode one log line.
///
/// Returns `Ok(None)` for lines that don't carry the command marker.
///
/// # Errors
/// - `Error::UnterminatedCommand` if no space follows the command name
/// - `Error::InvalidAddress` if the buffer id is not a 32-bit hex number
/// - `Error::UnknownCommand` for unrecognized command names
/// - `Error::UnexpectedArgs` if a command without arguments has some
/// - `Error::BadBufferSize` if `create` lacks a decimal size
/// - `Error::InvalidAdvice` if `madv` has an unrecognized value
///
/// # Example
/// ```
/// use cmapool::replay::{parse_line, Command};
/// use cmapool::BufferId;
///
/// let parsed = parse_line("[ 1.000002] @@@ create 0x1f 4096").unwrap().unwrap();
/// assert_eq!(parsed.buffer, BufferId::new(0x1f));
/// assert_eq!(parsed.command, Command::Create { size: 4096, pinned: false });
///
/// assert!(parse_line("unrelated noise").unwrap().is_none());
/// ```
pub fn parse_line(line: &str) -> Result<Option<LogCommand>> {
    let Some(marker) = line.find(COMMAND_MARKER) else {
        return Ok(None);
    };

    let rest = &line[marker + COMMAND_MARKER.len()..];
    let (name, after) = rest.split_once(' ').ok_or(Error::UnterminatedCommand)?;

    let (buffer, args) = parse_buffer_id(after)?;
    let args = args.trim_start();

    let command = match name {
        "create" => parse_create(args)?,
        "destroy" => no_args(args, Command::Destroy)?,
        "add_usecnt" => no_args(args, Command::AddUsecnt)?,
        "remove_usecnt" => no_args(args, Command::RemoveUsecnt)?,
        "use" => no_args(args, Command::Use)?,
        "madv" => parse_madv(args)?,
        _ => return Err(Error::UnknownCommand(name.to_string())),
    };

    Ok(Some(LogCommand {
        timestamp: parse_timestamp(line),
        buffer,
        command,
    }))
}

/// Decode a leading `[ seconds.micros]` kernel timestamp.
///
/// ```
/// use std::time::Duration;
/// use cmapool::replay::parse_timestamp;
///
/// assert_eq!(
///     parse_timestamp("[   12.000250] @@@ use 1"),
///     Some(Duration::new(12, 250_000))
/// );
/// assert_eq!(parse_timestamp("@@@ use 1"), None);
/// ```
pub fn parse_timestamp(line: &str) -> Option<Duration> {
    let inner = line.strip_prefix('[')?.trim_start_matches(' ');
    let (stamp, _) = inner.split_once(']')?;
    let (secs, micros) = stamp.trim_end_matches(' ').split_once('.')?;

    if secs.is_empty()
        || micros.len() != 6
        || !secs.bytes().all(|b| b.is_ascii_digit())
        || !micros.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let secs: u64 = secs.parse().ok()?;
    let micros: u32 = micros.parse().ok()?;
    Some(Duration::new(secs, micros * 1000))
}

// ============================================================================
// Field decoders
// ============================================================================

/// Split a leading hex buffer id (optional `0x` prefix) from the text.
fn parse_buffer_id(text: &str) -> Result<(BufferId, &str)> {
    let text = text.trim_start();

    let digits_start = match text.get(..2) {
        Some("0x" | "0X") if text[2..].starts_with(|c: char| c.is_ascii_hexdigit()) => 2,
        _ => 0,
    };
    let digits = &text[digits_start..];
    let len = digits
        .find(|c: char| !c.is_ascii_hexdigit())
        .unwrap_or(digits.len());

    if len == 0 {
        return Err(Error::InvalidAddress);
    }

    let id = u32::from_str_radix(&digits[..len], 16).map_err(|_| Error::InvalidAddress)?;
    Ok((BufferId::new(id), &digits[len..]))
}

/// `create <decimal size> [anything]`; any non-space tail pins the buffer.
fn parse_create(args: &str) -> Result<Command> {
    let len = args
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(args.len());

    if len == 0 {
        return Err(Error::BadBufferSize);
    }

    let size = args[..len].parse().map_err(|_| Error::BadBufferSize)?;
    let pinned = args[len..].chars().any(|c| !c.is_whitespace());

    Ok(Command::Create { size, pinned })
}

/// `madv <willneed|dontneed>`; text after the first word is ignored.
fn parse_madv(args: &str) -> Result<Command> {
    let value = args.split_whitespace().next().unwrap_or("");

    Advice::from_name(value)
        .map(Command::Madvise)
        .ok_or_else(|| Error::InvalidAdvice(value.to_string()))
}

fn no_args(args: &str, command: Command) -> Result<Command> {
    if args.is_empty() {
        Ok(command)
    } else {
        Err(Error::UnexpectedArgs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> LogCommand {
        parse_line(line).unwrap().unwrap()
    }

    fn parse_err(line: &str) -> Error {
        parse_line(line).unwrap_err()
    }

    #[test]
    fn test_ignores_lines_without_marker() {
        assert!(parse_line("").unwrap().is_none());
        assert!(parse_line("[    0.000000] Booting Linux").unwrap().is_none());
        assert!(parse_line("@@@ create 1 100").unwrap().is_none());
    }

    #[test]
    fn test_create() {
        let cmd = parse("[    1.500000] @@@ create 8f3a2c00 16384");

        assert_eq!(cmd.buffer, BufferId::new(0x8f3a_2c00));
        assert_eq!(
            cmd.command,
            Command::Create {
                size: 16384,
                pinned: false
            }
        );
        assert_eq!(cmd.timestamp, Some(Duration::new(1, 500_000_000)));
    }

    #[test]
    fn test_create_pinned_by_any_trailing_text() {
        for line in [
            "] @@@ create 1 1000 nomove",
            "] @@@ create 1 1000x",
            "] @@@ create 1 1000 \t?",
        ] {
            assert_eq!(
                parse(line).command,
                Command::Create {
                    size: 1000,
                    pinned: true
                },
                "{line}"
            );
        }

        assert_eq!(
            parse("] @@@ create 1 1000   ").command,
            Command::Create {
                size: 1000,
                pinned: false
            }
        );
    }

    #[test]
    fn test_create_bad_size() {
        assert!(matches!(parse_err("] @@@ create 1"), Error::BadBufferSize));
        assert!(matches!(parse_err("] @@@ create 1 big"), Error::BadBufferSize));
        assert!(matches!(
            parse_err("] @@@ create 1 99999999999999999999999"),
            Error::BadBufferSize
        ));
    }

    #[test]
    fn test_no_arg_commands() {
        assert_eq!(parse("] @@@ destroy 2").command, Command::Destroy);
        assert_eq!(parse("] @@@ add_usecnt 2").command, Command::AddUsecnt);
        assert_eq!(parse("] @@@ remove_usecnt 2").command, Command::RemoveUsecnt);
        assert_eq!(parse("] @@@ use 2 ").command, Command::Use);
    }

    #[test]
    fn test_unexpected_args() {
        assert!(matches!(parse_err("] @@@ destroy 2 now"), Error::UnexpectedArgs));
        assert!(matches!(parse_err("] @@@ use 2g"), Error::UnexpectedArgs));
    }

    #[test]
    fn test_madv() {
        assert_eq!(
            parse("] @@@ madv 3 dontneed").command,
            Command::Madvise(Advice::DontNeed)
        );
        assert_eq!(
            parse("] @@@ madv 3 willneed extra").command,
            Command::Madvise(Advice::WillNeed)
        );
        assert!(matches!(
            parse_err("] @@@ madv 3 sometimes"),
            Error::InvalidAdvice(v) if v == "sometimes"
        ));
        assert!(matches!(parse_err("] @@@ madv 3"), Error::InvalidAdvice(_)));
    }

    #[test]
    fn test_buffer_id_forms() {
        assert_eq!(parse("] @@@ use 0xdead").buffer, BufferId::new(0xdead));
        assert_eq!(parse("] @@@ use 0XBEEF").buffer, BufferId::new(0xbeef));
        assert_eq!(parse("] @@@ use   ff").buffer, BufferId::new(0xff));
        assert_eq!(parse("] @@@ use 0").buffer, BufferId::new(0));
    }

    #[test]
    fn test_invalid_address() {
        assert!(matches!(parse_err("] @@@ use zz"), Error::InvalidAddress));
        assert!(matches!(parse_err("] @@@ use "), Error::InvalidAddress));
        assert!(matches!(parse_err("] @@@ use 123456789"), Error::InvalidAddress));
    }

    #[test]
    fn test_address_checked_before_command_name() {
        assert!(matches!(parse_err("] @@@ frob zz"), Error::InvalidAddress));
        assert!(matches!(
            parse_err("] @@@ frob 1"),
            Error::UnknownCommand(name) if name == "frob"
        ));
    }

    #[test]
    fn test_unterminated_command() {
        assert!(matches!(parse_err("] @@@ destroy"), Error::UnterminatedCommand));
    }

    #[test]
    fn test_timestamp_forms() {
        assert_eq!(parse_timestamp("[0.000001] x"), Some(Duration::new(0, 1000)));
        assert_eq!(parse_timestamp("[  3.14] x"), None);
        assert_eq!(parse_timestamp(" [1.000000] x"), None);
        assert_eq!(parse_timestamp("[1.000000 x"), None);
        assert_eq!(parse("] @@@ use 1").timestamp, None);
    }

    #[test]
    fn test_display_round_trips_shape() {
        assert_eq!(
            Command::Create {
                size: 10,
                pinned: true
            }
            .to_string(),
            "create 10 nomove"
        );
        assert_eq!(Command::Madvise(Advice::DontNeed).to_string(), "madv dontneed");
        assert_eq!(Command::RemoveUsecnt.to_string(), "remove_usecnt");
    }
}
