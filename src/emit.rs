//! x86-64 instruction sequences for compiled functions.
//!
//! Compiled bodies keep the parameter-stack top in RDI. Callees hand the
//! new top back in RAX, so every emitted call is followed by a
//! `mov rdi, rax` restoring the convention before the next instruction.
//! RCX is the only scratch register.

use crate::buffer::CodeBuffer;
use crate::object::Word;

const REX_W: u8 = 0x48;

/// Calls reachable within this displacement of the call site get the
/// five-byte relative encoding.
const REL32_RANGE: i64 = 0x7fff_ffe0;

/// `sub rsp, 8` — the call that entered this function left the native
/// stack 8 bytes off a 16-byte boundary; realign it so the calls inside
/// the body meet the System-V requirement.
pub fn prologue(buf: &mut CodeBuffer) {
    buf.write_u8(REX_W);
    buf.write_u8(0x83);
    buf.write_u8(0xec);
    buf.write_u8(0x08);
}

/// Undo the prologue and leave the stack top where the caller expects it:
/// `mov rax, rdi` then `add rsp, 8`.
pub fn epilogue(buf: &mut CodeBuffer) {
    buf.write_u8(REX_W);
    buf.write_u8(0x89);
    buf.write_u8(0xf8);
    buf.write_u8(REX_W);
    buf.write_u8(0x83);
    buf.write_u8(0xc4);
    buf.write_u8(0x08);
}

/// `ret`
pub fn ret(buf: &mut CodeBuffer) {
    buf.write_u8(0xc3);
}

/// Emit a call to the guest function at `target`, followed by the
/// `mov rdi, rax` fixup. The encoding depends on how far away the target
/// is; a null target forces the longest shape so `patch_call` can fill in
/// the address later.
pub fn call(buf: &mut CodeBuffer, target: *const u8) {
    let at = buf.cursor() as i64;
    let target_addr = target as i64;
    if !target.is_null() && (target_addr.wrapping_sub(at)).abs() < REL32_RANGE {
        // call rel32
        buf.write_u8(0xe8);
        buf.write_u32(target_addr.wrapping_sub(at + 5) as u32);
    } else if !target.is_null() && (target as u64) <= u32::MAX as u64 {
        // mov ecx, imm32; call rcx
        buf.write_u8(0xb9);
        buf.write_u32(target as u32);
        buf.write_u8(0xff);
        buf.write_u8(0xd1);
    } else {
        // movabs rcx, imm64; call rcx
        buf.write_u8(REX_W);
        buf.write_u8(0xb9);
        buf.write_u64(target as u64);
        buf.write_u8(0xff);
        buf.write_u8(0xd1);
    }
    // mov rdi, rax — the callee's returned stack top becomes ours
    buf.write_u8(REX_W);
    buf.write_u8(0x89);
    buf.write_u8(0xc7);
}

/// Rewrite the target of a call previously emitted in the longest shape.
///
/// # Safety
/// `site` must be the address of a call emitted with a null target (or
/// one otherwise known to have used the 64-bit absolute encoding).
pub unsafe fn patch_call(site: *mut u8, target: *const u8) {
    // skip the two-byte movabs opcode, overwrite the imm64
    std::ptr::copy_nonoverlapping((target as u64).to_le_bytes().as_ptr(), site.add(2), 8);
}

/// Push `value`: grow the parameter stack one slot downward and store the
/// literal in the new top.
pub fn integer(buf: &mut CodeBuffer, value: Word) {
    // sub rdi, 8
    buf.write_u8(REX_W);
    buf.write_u8(0x83);
    buf.write_u8(0xef);
    buf.write_u8(0x08);
    // movabs rcx, imm64
    buf.write_u8(REX_W);
    buf.write_u8(0xb9);
    buf.write_u64(value as u64);
    // mov [rdi], rcx
    buf.write_u8(REX_W);
    buf.write_u8(0x89);
    buf.write_u8(0x0f);
}
