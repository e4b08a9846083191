//! End-to-end scenarios: feed a program to the interpreter binary and
//! check what comes out.

use std::io::Write;
use std::process::{Command, Output, Stdio};

fn run(program: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_catena"))
        .arg("-")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn interpreter");
    child
        .stdin
        .as_mut()
        .expect("child stdin")
        .write_all(program.as_bytes())
        .expect("write program");
    child.wait_with_output().expect("wait for interpreter")
}

fn stdout_of(program: &str) -> String {
    let out = run(program);
    assert!(
        out.status.success(),
        "interpreter failed; stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8(out.stdout).expect("stdout is utf-8")
}

fn failure_of(program: &str) -> String {
    let out = run(program);
    assert_eq!(out.status.code(), Some(1));
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn addition() {
    assert_eq!(stdout_of("3 4 + PRINTI"), "7\n");
}

#[test]
fn multiplication() {
    assert_eq!(stdout_of("2 3 * PRINTI"), "6\n");
}

#[test]
fn dup_squares() {
    assert_eq!(stdout_of("5 DUP * PRINTI"), "25\n");
}

#[test]
fn string_printing() {
    assert_eq!(stdout_of("\"hi\" PRINTS"), "hi\n");
}

#[test]
fn defun_makes_a_callable_function() {
    assert_eq!(stdout_of("DEFUN SQUARE DUP * DONE 6 SQUARE PRINTI"), "36\n");
}

#[test]
fn defval_captures_a_value() {
    assert_eq!(stdout_of("DEFVAL TEN 10 DONE TEN TEN + PRINTI"), "20\n");
}

#[test]
fn swap_reorders_the_stack() {
    assert_eq!(stdout_of("1 10 SWAP PRINTI PRINTI"), "1\n10\n");
}

#[test]
fn source_is_case_insensitive() {
    assert_eq!(stdout_of("5 dup * printi"), "25\n");
}

#[test]
fn signed_literals() {
    assert_eq!(stdout_of("-7 PRINTI +42 PRINTI"), "-7\n42\n");
}

#[test]
fn machine_word_extremes_round_trip() {
    assert_eq!(
        stdout_of("9223372036854775807 PRINTI -9223372036854775808 PRINTI"),
        "9223372036854775807\n-9223372036854775808\n"
    );
}

#[test]
fn ptrsize_is_eight() {
    assert_eq!(stdout_of("PTRSIZE PRINTI"), "8\n");
}

#[test]
fn defined_values_compile_into_function_bodies() {
    assert_eq!(
        stdout_of("DEFVAL TEN 10 DONE DEFUN ADDTEN TEN + DONE 5 ADDTEN PRINTI"),
        "15\n"
    );
}

#[test]
fn captured_strings_outlive_their_definition() {
    assert_eq!(
        stdout_of("DEFUN GREET \"hi\" PRINTS DONE GREET GREET"),
        "hi\nhi\n"
    );
}

#[test]
fn defined_functions_compose() {
    assert_eq!(
        stdout_of("DEFUN SQUARE DUP * DONE DEFUN FOURTH SQUARE SQUARE DONE 2 FOURTH PRINTI"),
        "16\n"
    );
}

#[test]
fn macros_run_at_compile_time() {
    // M leaves 3 on the live stack while F is being compiled; F's body is
    // just the PRINTI call, which pops it when F runs.
    assert_eq!(
        stdout_of("DEFMACRO M 1 2 + DONE DEFUN F M PRINTI DONE F"),
        "3\n"
    );
}

#[test]
fn alloc_pget_pset_move_words_through_memory() {
    assert_eq!(
        stdout_of("DEFVAL CELL 8 ALLOC DONE 123 CELL PSET CELL PGET PRINTI"),
        "123\n"
    );
}

#[test]
fn program_cursor_only_moves_forward() {
    let out = stdout_of("*PROGRAM* PGET PRINTI DEFUN F DUP DONE *PROGRAM* PGET PRINTI");
    let cursors: Vec<i64> = out
        .lines()
        .map(|l| l.parse().expect("cursor address"))
        .collect();
    assert_eq!(cursors.len(), 2);
    assert!(cursors[1] > cursors[0]);
}

#[test]
fn undefined_name_is_fatal_and_named() {
    let stderr = failure_of("NOPE");
    assert!(stderr.contains("NOPE"), "stderr: {stderr}");
}

#[test]
fn stray_close_paren_is_fatal_and_named() {
    let stderr = failure_of(")");
    assert!(stderr.contains("')'"), "stderr: {stderr}");
}

#[test]
fn unterminated_string_is_fatal() {
    let stderr = failure_of("\"abc");
    assert!(stderr.contains("unterminated string"), "stderr: {stderr}");
}

#[test]
fn end_of_input_inside_a_definition_is_fatal() {
    let stderr = failure_of("DEFUN F DUP");
    assert!(stderr.contains("definition"), "stderr: {stderr}");
}

#[test]
fn non_symbol_definition_name_is_fatal() {
    let stderr = failure_of("DEFUN 5 DONE");
    assert!(stderr.contains("symbol"), "stderr: {stderr}");
}

#[test]
fn negative_alloc_is_fatal() {
    let stderr = failure_of("-1 ALLOC");
    assert!(stderr.contains("allocation failed"), "stderr: {stderr}");
}

#[test]
fn quote_and_list_readers_are_reserved() {
    let stderr = failure_of("[1]");
    assert!(stderr.contains("not implemented"), "stderr: {stderr}");
    let stderr = failure_of("(1)");
    assert!(stderr.contains("not implemented"), "stderr: {stderr}");
}

#[test]
fn sources_are_processed_in_argument_order() {
    let dir = std::env::temp_dir();
    let first = dir.join(format!("catena-first-{}.cat", std::process::id()));
    let second = dir.join(format!("catena-second-{}.cat", std::process::id()));
    std::fs::write(&first, "DEFUN SQUARE DUP * DONE 3 SQUARE PRINTI\n").unwrap();
    std::fs::write(&second, "4 SQUARE PRINTI\n").unwrap();

    let out = Command::new(env!("CARGO_BIN_EXE_catena"))
        .arg(&first)
        .arg(&second)
        .output()
        .expect("run interpreter");

    std::fs::remove_file(&first).ok();
    std::fs::remove_file(&second).ok();

    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "9\n16\n");
}

#[test]
fn missing_file_is_fatal() {
    let out = Command::new(env!("CARGO_BIN_EXE_catena"))
        .arg("/no/such/catena/source")
        .output()
        .expect("run interpreter");
    assert_eq!(out.status.code(), Some(1));
}
