//! Evaluate-now and compile-later semantics over read-objects, plus the
//! definition forms that grow the symbol table at read time.
//!
//! Both modes dispatch on the object's tag. Evaluation performs the
//! action against the live parameter stack; compilation appends code to
//! the buffer that will perform it later. Macros are the crossover: a
//! macro symbol reached by the compiler runs immediately, in the host,
//! against the live stack — and may itself re-enter the reader.

use log::debug;

use crate::emit;
use crate::error::{fatal, Error};
use crate::exec::call_guest;
use crate::interp::interp;
use crate::object::{ReadObject, Word};
use crate::reader;
use crate::stack::{pop, pop_ptr, push};
use crate::symtab::SymbolKind;

/// Guest entry: `( object -- ... )`. Immediate semantics; whatever the
/// object denotes happens to the stack right now.
pub unsafe extern "C" fn eval(tos: *mut Word) -> *mut Word {
    let (obj, tos): (*mut ReadObject, _) = pop_ptr(tos);
    eval_obj(Box::from_raw(obj), tos)
}

pub(crate) unsafe fn eval_obj(obj: Box<ReadObject>, tos: *mut Word) -> *mut Word {
    match *obj {
        ReadObject::Symbol(name) => {
            let (value, kind) = interp()
                .symtab
                .lookup(&name)
                .unwrap_or_else(|| fatal(Error::UndefinedName(name)));
            match kind {
                SymbolKind::Function | SymbolKind::Macro => call_guest(value, tos),
                SymbolKind::Value => push(tos, value as Word),
            }
        }
        ReadObject::Integer(value) => push(tos, value),
        ReadObject::Str(bytes) => push(tos, capture_string(bytes) as Word),
        ReadObject::Quote(_) | ReadObject::Cons(_, _) => {
            fatal(Error::Unimplemented("evaluating quote and cons objects"))
        }
    }
}

/// Deferred semantics: append code for one object. Returns the address
/// where its fragment begins together with the stack top, which only a
/// macro may have moved.
pub(crate) unsafe fn compile_obj(obj: Box<ReadObject>, tos: *mut Word) -> (*const u8, *mut Word) {
    let fragment = interp().code.cursor() as *const u8;
    match *obj {
        ReadObject::Symbol(name) => {
            let (value, kind) = interp()
                .symtab
                .lookup(&name)
                .unwrap_or_else(|| fatal(Error::UndefinedName(name)));
            match kind {
                SymbolKind::Function => emit::call(&mut interp().code, value),
                // Macros run now, against the live stack; whatever they
                // choose to emit starts at `fragment`.
                SymbolKind::Macro => return (fragment, call_guest(value, tos)),
                SymbolKind::Value => emit::integer(&mut interp().code, value as Word),
            }
        }
        ReadObject::Integer(value) => emit::integer(&mut interp().code, value),
        ReadObject::Str(bytes) => {
            let contents = capture_string(bytes);
            emit::integer(&mut interp().code, contents as Word);
        }
        ReadObject::Quote(_) | ReadObject::Cons(_, _) => {
            fatal(Error::Unimplemented("compiling quote and cons objects"))
        }
    }
    (fragment, tos)
}

/// A string captured into compiled code must outlive the code buffer:
/// leak it, NUL-terminated, and hand out the address of the bytes.
fn capture_string(mut bytes: Vec<u8>) -> *const u8 {
    bytes.push(0);
    Box::leak(bytes.into_boxed_slice()).as_ptr()
}

/// Guest entry for `DEFUN`: read a name, compile body objects until
/// `DONE`, and register the emitted function.
pub unsafe extern "C" fn defun(tos: *mut Word) -> *mut Word {
    define(tos, SymbolKind::Function)
}

/// Guest entry for `DEFMACRO`: as `DEFUN`, but the result runs at
/// compile time.
pub unsafe extern "C" fn defmacro(tos: *mut Word) -> *mut Word {
    define(tos, SymbolKind::Macro)
}

/// Guest entry for `DEFVAL`: evaluate body objects until `DONE`, pop the
/// result, and register it as a value.
pub unsafe extern "C" fn defval(tos: *mut Word) -> *mut Word {
    define(tos, SymbolKind::Value)
}

unsafe fn define(mut tos: *mut Word, kind: SymbolKind) -> *mut Word {
    let input = interp().input;
    if input.is_null() {
        fatal(Error::InternalBug(
            "definition form with no input stream".to_string(),
        ));
    }

    let (name_obj, new_tos) = reader::read_next(input, tos);
    tos = new_tos;
    let name = match name_obj.map(|obj| *obj) {
        Some(ReadObject::Symbol(name)) => name,
        _ => fatal(Error::BadDefName),
    };

    let entry = interp().code.cursor() as *const u8;
    if kind != SymbolKind::Value {
        // registered before the body is read so it can call itself
        interp().symtab.add(&name, entry, kind);
    }
    emit::prologue(&mut interp().code);

    loop {
        let (obj, new_tos) = reader::read_next(input, tos);
        tos = new_tos;
        let obj = match obj {
            Some(obj) => obj,
            None => fatal(Error::UnterminatedDefinition),
        };
        if matches!(&*obj, ReadObject::Symbol(name) if name == "DONE") {
            break;
        }
        if kind == SymbolKind::Value {
            tos = eval_obj(obj, tos);
        } else {
            let (_fragment, new_tos) = compile_obj(obj, tos);
            tos = new_tos;
        }
    }

    emit::epilogue(&mut interp().code);
    emit::ret(&mut interp().code);

    if kind == SymbolKind::Value {
        let (value, new_tos) = pop(tos);
        tos = new_tos;
        interp().symtab.add(&name, value as *const u8, kind);
        debug!("defined value {name} = {value}");
    } else {
        debug!("defined {kind:?} {name} at {entry:p}");
    }
    tos
}
