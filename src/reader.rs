//! The readtable-driven reader.
//!
//! One call to [`read`] produces one tagged object from the input stream.
//! Each byte is folded to upper case, classified through the active
//! readtable, and the datum is handed to a subordinate reader. The
//! subordinate readers are guest functions taking `( stream char )` on
//! the parameter stack, so user code can replace the macro-character
//! handlers through the `*READTAB*` handle.

use crate::error::{fatal, Error};
use crate::exec::GuestFn;
use crate::interp::interp;
use crate::object::{ReadObject, Word};
use crate::stack::{pop, pop_ptr, push, push_ptr};
use crate::stream::InStream;

/// Character classification bits.
pub mod props {
    pub const CONSTITUENT: u8 = 1 << 0;
    pub const NUMBER_INIT: u8 = 1 << 1;
    pub const NUMBER: u8 = 1 << 2;
    pub const MACRO: u8 = 1 << 4;
    pub const WHITESPACE: u8 = 1 << 5;
    pub const ERROR: u8 = 1 << 6;
}

/// Per-character classification plus per-character macro handlers. The
/// process keeps one mutable active copy; `with_defaults` rebuilds the
/// immutable default contract.
pub struct Readtable {
    pub properties: [u8; 256],
    pub dispatch: [Option<GuestFn>; 256],
}

impl Readtable {
    pub fn with_defaults() -> Self {
        let mut properties = [0u8; 256];
        let mut dispatch: [Option<GuestFn>; 256] = [None; 256];

        for c in b'a'..=b'z' {
            properties[c as usize] |= props::CONSTITUENT;
        }
        for c in b'A'..=b'Z' {
            properties[c as usize] |= props::CONSTITUENT;
        }
        // `;` stays constituent until a comment macro claims it
        for c in b"_!@#$%^&*:,.<>=/?;" {
            properties[*c as usize] |= props::CONSTITUENT;
        }
        for c in b"+-" {
            properties[*c as usize] |= props::NUMBER_INIT | props::CONSTITUENT;
        }
        for c in b'0'..=b'9' {
            properties[c as usize] |= props::NUMBER_INIT | props::NUMBER | props::CONSTITUENT;
        }
        for c in b"\"[(" {
            properties[*c as usize] |= props::MACRO;
        }
        for c in b"])" {
            properties[*c as usize] |= props::ERROR;
        }
        for c in b" \t\r\n" {
            properties[*c as usize] |= props::WHITESPACE;
        }

        dispatch[b'"' as usize] = Some(read_string as GuestFn);
        dispatch[b'[' as usize] = Some(read_quote as GuestFn);
        dispatch[b'(' as usize] = Some(read_list as GuestFn);

        Self {
            properties,
            dispatch,
        }
    }

    fn properties_of(&self, byte: u8) -> u8 {
        self.properties[byte as usize]
    }
}

/// Where the classifier sends a datum that starts with a given byte.
#[derive(Debug, PartialEq)]
enum Dispatch {
    Eof,
    Macro(u8),
    Number(u8),
    Symbol(u8),
}

/// Skip whitespace and classify the first byte of the next datum. The
/// classifier byte is consumed; subordinate readers receive it as an
/// argument.
fn classify(rt: &Readtable, stream: &mut InStream) -> Result<Dispatch, Error> {
    loop {
        let byte = match stream.read_byte()? {
            Some(b) => b.to_ascii_uppercase(),
            None => return Ok(Dispatch::Eof),
        };
        let p = rt.properties_of(byte);

        if p & props::ERROR != 0 {
            return Err(Error::IllegalCharacter(byte));
        }
        if p & props::WHITESPACE != 0 {
            continue;
        }
        if p & props::MACRO != 0 {
            return Ok(Dispatch::Macro(byte));
        }
        if p & props::NUMBER_INIT != 0 {
            // A bare sign is a symbol: `+` alone must name the addition
            // intrinsic. Require a number continuation after the sign
            // before committing to the integer reader.
            if (byte == b'+' || byte == b'-') && !sign_starts_number(rt, stream)? {
                return Ok(Dispatch::Symbol(byte));
            }
            return Ok(Dispatch::Number(byte));
        }
        if p & props::CONSTITUENT != 0 {
            return Ok(Dispatch::Symbol(byte));
        }
        if p & props::NUMBER != 0 {
            return Err(Error::NumberContinuationOutsideNumber(byte));
        }
        return Err(Error::NoProperties(byte));
    }
}

fn sign_starts_number(rt: &Readtable, stream: &mut InStream) -> Result<bool, Error> {
    match stream.read_byte()? {
        Some(next) => {
            let starts = rt.properties_of(next.to_ascii_uppercase()) & props::NUMBER != 0;
            stream.unread(next);
            Ok(starts)
        }
        None => Ok(false),
    }
}

/// Guest entry: `( stream -- object|null )`. Classifies bytes until a
/// datum starts, then runs the matching subordinate reader. A null object
/// means end of input was reached before any datum byte.
pub unsafe extern "C" fn read(tos: *mut Word) -> *mut Word {
    let (stream, tos): (*mut InStream, _) = pop_ptr(tos);

    let dispatch = match classify(&interp().readtable, &mut *stream) {
        Ok(d) => d,
        Err(e) => fatal(e),
    };
    let (handler, byte): (GuestFn, u8) = match dispatch {
        Dispatch::Eof => return push(tos, 0),
        Dispatch::Macro(byte) => {
            let handler = interp().readtable.dispatch[byte as usize].unwrap_or_else(|| {
                fatal(Error::InternalBug(format!(
                    "macro character '{}' has no dispatch handler",
                    byte as char
                )))
            });
            (handler, byte)
        }
        Dispatch::Number(byte) => (read_number as GuestFn, byte),
        Dispatch::Symbol(byte) => (read_symbol as GuestFn, byte),
    };

    let tos = push_ptr(tos, stream);
    let tos = push(tos, byte as Word);
    handler(tos)
}

/// Host-side convenience over the guest protocol: read the next object
/// from `stream`, or `None` at end of input.
///
/// # Safety
/// `stream` must be live and `tos` a live stack top.
pub unsafe fn read_next(
    stream: *mut InStream,
    tos: *mut Word,
) -> (Option<Box<ReadObject>>, *mut Word) {
    let tos = push_ptr(tos, stream);
    let tos = read(tos);
    let (obj, tos): (*mut ReadObject, _) = pop_ptr(tos);
    if obj.is_null() {
        (None, tos)
    } else {
        (Some(Box::from_raw(obj)), tos)
    }
}

/// Guest entry: `( stream char -- symbol )`.
unsafe extern "C" fn read_symbol(tos: *mut Word) -> *mut Word {
    let (first, tos) = pop(tos);
    let (stream, tos): (*mut InStream, _) = pop_ptr(tos);
    let name = lex_symbol(&interp().readtable, &mut *stream, first as u8)
        .unwrap_or_else(|e| fatal(e));
    push_ptr(tos, Box::into_raw(Box::new(ReadObject::Symbol(name))))
}

/// Guest entry: `( stream char -- integer )`.
unsafe extern "C" fn read_number(tos: *mut Word) -> *mut Word {
    let (first, tos) = pop(tos);
    let (stream, tos): (*mut InStream, _) = pop_ptr(tos);
    let value = lex_number(&interp().readtable, &mut *stream, first as u8)
        .unwrap_or_else(|e| fatal(e));
    push_ptr(tos, Box::into_raw(Box::new(ReadObject::Integer(value))))
}

/// Guest entry: `( stream char -- string )`. The classifier byte is the
/// opening quote.
unsafe extern "C" fn read_string(tos: *mut Word) -> *mut Word {
    let (_quote, tos) = pop(tos);
    let (stream, tos): (*mut InStream, _) = pop_ptr(tos);
    let contents = lex_string(&mut *stream).unwrap_or_else(|e| fatal(e));
    push_ptr(tos, Box::into_raw(Box::new(ReadObject::Str(contents))))
}

unsafe extern "C" fn read_quote(_tos: *mut Word) -> *mut Word {
    fatal(Error::Unimplemented("the quote reader"));
}

unsafe extern "C" fn read_list(_tos: *mut Word) -> *mut Word {
    fatal(Error::Unimplemented("the list reader"));
}

/// Accumulate uppercased constituent bytes after `first` (already
/// uppercased by the classifier). The first non-constituent byte goes
/// back into the stream.
fn lex_symbol(rt: &Readtable, stream: &mut InStream, first: u8) -> Result<String, Error> {
    let mut name = String::new();
    name.push(first as char);
    while let Some(byte) = stream.read_byte()? {
        let upper = byte.to_ascii_uppercase();
        if rt.properties_of(upper) & props::CONSTITUENT == 0 {
            stream.unread(byte);
            break;
        }
        name.push(upper as char);
    }
    Ok(name)
}

/// Accumulate number-continuation bytes and convert right-to-left with
/// factors ascending from one, so a single digit after a sign converts
/// correctly. Arithmetic wraps, which is what lets the most negative
/// machine word round-trip through its decimal spelling.
fn lex_number(rt: &Readtable, stream: &mut InStream, first: u8) -> Result<Word, Error> {
    let mut digits = Vec::new();
    let mut negate = false;
    match first {
        b'-' => negate = true,
        b'+' => {}
        digit => digits.push(digit),
    }
    while let Some(byte) = stream.read_byte()? {
        if rt.properties_of(byte.to_ascii_uppercase()) & props::NUMBER == 0 {
            stream.unread(byte);
            break;
        }
        digits.push(byte);
    }

    let mut value: Word = 0;
    let mut factor: Word = 1;
    for digit in digits.iter().rev() {
        value = value.wrapping_add(((digit - b'0') as Word).wrapping_mul(factor));
        factor = factor.wrapping_mul(10);
    }
    Ok(if negate { value.wrapping_neg() } else { value })
}

/// Consume bytes until the closing quote. No escapes; the delimiters are
/// not part of the result.
fn lex_string(stream: &mut InStream) -> Result<Vec<u8>, Error> {
    let mut contents = Vec::new();
    loop {
        match stream.read_byte()? {
            None => return Err(Error::UnterminatedString),
            Some(b'"') => return Ok(contents),
            Some(byte) => contents.push(byte),
        }
    }
}
