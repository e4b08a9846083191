//! The intrinsic library callable from compiled code.
//!
//! Every function here is a guest function: parameter-stack top in,
//! new top out (see [`crate::exec`]). Stack effects are written
//! `( before -- after )` with the top at the right. All of them are
//! unsafe at the boundary for the same reason: they trust the words on
//! the stack to be what the program said they are.

use std::ffi::CStr;
use std::os::raw::c_char;

use crate::error::{fatal, Error};
use crate::interp::interp;
use crate::object::Word;
use crate::stack::{pop, pop_ptr, push};

/// `DUP ( a -- a a )`
pub unsafe extern "C" fn dup(tos: *mut Word) -> *mut Word {
    push(tos, tos.read())
}

/// `SWAP ( a b -- b a )`
pub unsafe extern "C" fn swap(tos: *mut Word) -> *mut Word {
    let below = tos.add(1);
    let a = below.read();
    below.write(tos.read());
    tos.write(a);
    tos
}

/// `+ ( a b -- a+b )`
pub unsafe extern "C" fn add(tos: *mut Word) -> *mut Word {
    let (b, tos) = pop(tos);
    let (a, tos) = pop(tos);
    push(tos, a.wrapping_add(b))
}

/// `* ( a b -- a*b )`
pub unsafe extern "C" fn mul(tos: *mut Word) -> *mut Word {
    let (b, tos) = pop(tos);
    let (a, tos) = pop(tos);
    push(tos, a.wrapping_mul(b))
}

/// `PGET ( addr -- value )` — load one word from memory.
pub unsafe extern "C" fn pget(tos: *mut Word) -> *mut Word {
    let (addr, tos): (*mut Word, _) = pop_ptr(tos);
    push(tos, addr.read())
}

/// `PSET ( value addr -- )` — store one word to memory.
pub unsafe extern "C" fn pset(tos: *mut Word) -> *mut Word {
    let (addr, tos): (*mut Word, _) = pop_ptr(tos);
    let (value, tos) = pop(tos);
    addr.write(value);
    tos
}

/// `ALLOC ( nbytes -- addr )` — zeroed storage that lives as long as the
/// process. Compiled code may bake the address in, so nothing is freed.
pub unsafe extern "C" fn alloc(tos: *mut Word) -> *mut Word {
    let (nbytes, tos) = pop(tos);
    let addr = alloc_zeroed(nbytes).unwrap_or_else(|e| fatal(e));
    push(tos, addr)
}

fn alloc_zeroed(nbytes: Word) -> Result<Word, Error> {
    if nbytes < 0 {
        return Err(Error::AllocationFailed(format!("ALLOC of {nbytes} bytes")));
    }
    let storage = vec![0u8; nbytes as usize].into_boxed_slice();
    Ok(Box::leak(storage).as_ptr() as Word)
}

/// `PRINTI ( n -- )` — the number and a newline, to `*OUT*`.
pub unsafe extern "C" fn printi(tos: *mut Word) -> *mut Word {
    let (n, tos) = pop(tos);
    let out = &mut *interp().output;
    if let Err(e) = out.write_all(format!("{n}\n").as_bytes()) {
        fatal(Error::Io(e));
    }
    tos
}

/// `PRINTS ( ptr -- )` — the NUL-terminated bytes at `ptr` and a
/// newline, to `*OUT*`.
pub unsafe extern "C" fn prints(tos: *mut Word) -> *mut Word {
    let (ptr, tos): (*mut c_char, _) = pop_ptr(tos);
    let bytes = CStr::from_ptr(ptr).to_bytes();
    let out = &mut *interp().output;
    if let Err(e) = out.write_all(bytes).and_then(|_| out.write_all(b"\n")) {
        fatal(Error::Io(e));
    }
    tos
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::ParamStack;

    #[test]
    fn dup_copies_the_top_slot() {
        let mut stack = ParamStack::new();
        unsafe {
            let tos = push(stack.top(), 5);
            let tos = dup(tos);
            let (b, tos) = pop(tos);
            let (a, _) = pop(tos);
            assert_eq!((a, b), (5, 5));
        }
    }

    #[test]
    fn swap_exchanges_the_top_two_slots() {
        let mut stack = ParamStack::new();
        unsafe {
            let tos = push(stack.top(), 1);
            let tos = push(tos, 2);
            let tos = swap(tos);
            let (b, tos) = pop(tos);
            let (a, _) = pop(tos);
            assert_eq!((a, b), (2, 1));
        }
    }

    #[test]
    fn arithmetic_consumes_two_and_leaves_one() {
        let mut stack = ParamStack::new();
        unsafe {
            let tos = push(stack.top(), 3);
            let tos = push(tos, 4);
            let tos = add(tos);
            assert_eq!(tos.read(), 7);
            let tos = push(tos, 6);
            let tos = mul(tos);
            assert_eq!(tos.read(), 42);
            assert_eq!(tos as usize, stack.top() as usize - 8);
        }
    }

    #[test]
    fn pget_and_pset_move_words_through_memory() {
        let mut stack = ParamStack::new();
        let mut cell: Word = 0;
        unsafe {
            let tos = push(stack.top(), 99);
            let tos = crate::stack::push_ptr(tos, &mut cell as *mut Word);
            let tos = pset(tos);
            assert_eq!(cell, 99);
            let tos = crate::stack::push_ptr(tos, &cell as *const Word);
            let tos = pget(tos);
            assert_eq!(tos.read(), 99);
        }
    }

    #[test]
    fn alloc_of_a_negative_size_is_an_allocation_failure() {
        let err = alloc_zeroed(-1).unwrap_err();
        assert!(err.to_string().contains("ALLOC of -1"), "message: {err}");
    }

    #[test]
    fn alloc_returns_zeroed_storage() {
        let mut stack = ParamStack::new();
        unsafe {
            let tos = push(stack.top(), 16);
            let tos = alloc(tos);
            let (addr, _): (*mut u8, _) = pop_ptr(tos);
            assert!(!addr.is_null());
            for i in 0..16 {
                assert_eq!(addr.add(i).read(), 0);
            }
        }
    }
}
