//! The process-wide interpreter: every shared resource — symbol table,
//! readtable, code buffer, parameter stack, stream slots — plus the
//! top-level read/eval loop.
//!
//! Guest-reachable host functions receive only the stack pointer, so the
//! other singletons come through one global. The system is
//! single-threaded; re-entrant host calls touch disjoint fields.

use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use log::debug;

use crate::buffer::{CodeBuffer, DEFAULT_CODE_SIZE};
use crate::compile;
use crate::error::{fatal, Error};
use crate::exec::{call_guest, guest_addr};
use crate::intrinsics;
use crate::object::{ReadObject, Word, WORD_SIZE};
use crate::reader::{self, Readtable};
use crate::stack::{pop_ptr, push_ptr, ParamStack};
use crate::stream::{InStream, OutStream};
use crate::symtab::{SymbolKind, SymbolTable};

pub struct Interp {
    pub symtab: SymbolTable,
    pub readtable: Readtable,
    pub code: CodeBuffer,
    stack: ParamStack,
    tos: *mut Word,
    /// Current input stream, or null between sources. `*IN*` names this
    /// slot.
    pub input: *mut InStream,
    /// Current output stream. `*OUT*` names this slot.
    pub output: *mut OutStream,
}

static INTERP: AtomicPtr<Interp> = AtomicPtr::new(ptr::null_mut());

/// The live interpreter.
pub(crate) fn interp() -> &'static mut Interp {
    let ip = INTERP.load(Ordering::Relaxed);
    if ip.is_null() {
        fatal(Error::InternalBug(
            "interpreter used before bootstrap".to_string(),
        ));
    }
    unsafe { &mut *ip }
}

impl Interp {
    /// Allocate the shared resources and register the startup symbols.
    /// The returned interpreter becomes the process-wide singleton; it
    /// must stay alive for the rest of the process.
    pub fn bootstrap() -> Result<Box<Interp>, Error> {
        let mut ip = Box::new(Interp {
            symtab: SymbolTable::new(),
            readtable: Readtable::with_defaults(),
            code: CodeBuffer::new(DEFAULT_CODE_SIZE)?,
            stack: ParamStack::new(),
            tos: ptr::null_mut(),
            input: ptr::null_mut(),
            output: Box::into_raw(Box::new(OutStream::stdout())),
        });
        ip.tos = ip.stack.top();

        // Handles into the interpreter itself. The boxed allocation gives
        // them stable addresses.
        let symtab_handle = &mut ip.symtab as *mut SymbolTable as *const u8;
        let readtab_handle = &mut ip.readtable as *mut Readtable as *const u8;
        let in_slot = &mut ip.input as *mut *mut InStream as *const u8;
        let out_slot = &mut ip.output as *mut *mut OutStream as *const u8;
        let program_slot = ip.code.cursor_slot() as *const u8;

        let sym = &mut ip.symtab;
        sym.add("*SYMTAB*", symtab_handle, SymbolKind::Value);
        sym.add("*READTAB*", readtab_handle, SymbolKind::Value);
        sym.add("*IN*", in_slot, SymbolKind::Value);
        sym.add("*OUT*", out_slot, SymbolKind::Value);
        sym.add("*PROGRAM*", program_slot, SymbolKind::Value);
        sym.add("PTRSIZE", WORD_SIZE as *const u8, SymbolKind::Value);

        sym.add("READ", guest_addr(reader::read), SymbolKind::Function);
        sym.add("EVAL", guest_addr(compile::eval), SymbolKind::Function);

        sym.add("DUP", guest_addr(intrinsics::dup), SymbolKind::Function);
        sym.add("SWAP", guest_addr(intrinsics::swap), SymbolKind::Function);
        sym.add("+", guest_addr(intrinsics::add), SymbolKind::Function);
        sym.add("*", guest_addr(intrinsics::mul), SymbolKind::Function);
        sym.add("PGET", guest_addr(intrinsics::pget), SymbolKind::Function);
        sym.add("PSET", guest_addr(intrinsics::pset), SymbolKind::Function);
        sym.add("ALLOC", guest_addr(intrinsics::alloc), SymbolKind::Function);
        sym.add("PRINTI", guest_addr(intrinsics::printi), SymbolKind::Function);
        sym.add("PRINTS", guest_addr(intrinsics::prints), SymbolKind::Function);

        sym.add("DEFUN", guest_addr(compile::defun), SymbolKind::Function);
        sym.add("DEFMACRO", guest_addr(compile::defmacro), SymbolKind::Function);
        sym.add("DEFVAL", guest_addr(compile::defval), SymbolKind::Function);

        INTERP.store(&mut *ip, Ordering::Relaxed);
        debug!("interpreter bootstrapped");
        Ok(ip)
    }

    /// Process one source to end of input, evaluating each top-level
    /// object as it arrives. `-` names standard input.
    pub fn run(&mut self, source: &str) -> Result<(), Error> {
        let stream = if source == "-" {
            InStream::stdin()
        } else {
            InStream::file(source)?
        };
        let stream = Box::into_raw(Box::new(stream));
        self.input = stream;
        debug!("evaluating {source}");

        loop {
            unsafe {
                let tos = push_ptr(self.tos, stream);
                let tos = call_guest(guest_addr(reader::read), tos);
                let (obj, tos): (*mut ReadObject, _) = pop_ptr(tos);
                self.tos = tos;
                if obj.is_null() {
                    break;
                }
                let tos = push_ptr(self.tos, obj);
                self.tos = call_guest(guest_addr(compile::eval), tos);
            }
        }

        self.input = ptr::null_mut();
        unsafe { drop(Box::from_raw(stream)) };
        Ok(())
    }
}
