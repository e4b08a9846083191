use std::io;
use std::process;

use thiserror::Error;

/// Everything the core can fail with. All of these are fatal: a code
/// buffer holding a half-emitted fragment cannot be rewound, so recovery
/// is never attempted.
#[derive(Debug, Error)]
pub enum Error {
    #[error("reader encountered illegal character '{}' ({})", *.0 as char, .0)]
    IllegalCharacter(u8),
    #[error("character '{}' ({}) has no reader properties", *.0 as char, .0)]
    NoProperties(u8),
    #[error("number continuation '{}' ({}) outside of a number", *.0 as char, .0)]
    NumberContinuationOutsideNumber(u8),
    #[error("unterminated string")]
    UnterminatedString,
    #[error("end of input inside a definition body")]
    UnterminatedDefinition,
    #[error("the name '{0}' is undefined")]
    UndefinedName(String),
    #[error("definition name must be a symbol")]
    BadDefName,
    #[error("allocation failed: {0}")]
    AllocationFailed(String),
    #[error("{0} is not implemented")]
    Unimplemented(&'static str),
    #[error("internal bug: {0}")]
    InternalBug(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Report a fatal error and terminate with status 1.
pub fn fatal(err: Error) -> ! {
    eprintln!("catena: {err}");
    process::exit(1);
}
