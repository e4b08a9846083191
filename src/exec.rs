//! The host/guest boundary.
//!
//! Everything callable from compiled code — host intrinsics and compiled
//! functions alike — has one shape: parameter-stack top in, new top out.
//! The registers are fixed by the System-V ABI (RDI in, RAX out); the
//! emitter moves RAX back into RDI after every call it generates, so
//! inside a compiled body the top always rides in RDI. This module is the
//! only place an address is turned back into something callable.

use std::mem;

use crate::object::Word;

/// Signature shared by every guest-callable function.
pub type GuestFn = unsafe extern "C" fn(*mut Word) -> *mut Word;

/// Erase a guest function to the pointer form stored in the symbol table.
pub fn guest_addr(f: GuestFn) -> *const u8 {
    f as *const u8
}

/// Call into native code — an intrinsic or a fragment of the code buffer
/// — handing it the current parameter-stack top.
///
/// # Safety
/// `target` must be the entry of a complete guest function: a registered
/// intrinsic, or an address captured from the code buffer cursor before a
/// full prologue..ret emission. `tos` must be a live stack top with room
/// for whatever the callee pushes.
pub unsafe fn call_guest(target: *const u8, tos: *mut Word) -> *mut Word {
    let f: GuestFn = mem::transmute(target);
    f(tos)
}
