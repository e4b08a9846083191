/// The machine word moved through the parameter stack and emitted as
/// immediate operands.
pub type Word = i64;
pub const WORD_SIZE: usize = std::mem::size_of::<Word>();

/// One datum produced by the reader.
///
/// An object is created by the reader, consumed exactly once by the
/// compiler or evaluator, and then freed — unless its payload is captured
/// into compiled code (a string whose pointer becomes an emitted
/// constant), in which case the payload is leaked so it outlives the code
/// buffer.
#[derive(Debug, PartialEq)]
pub enum ReadObject {
    /// An uppercased name.
    Symbol(String),
    Integer(Word),
    /// Raw bytes between string delimiters; no escape processing.
    Str(Vec<u8>),
    /// Reserved for the quote reader.
    Quote(Box<ReadObject>),
    /// Reserved for the list reader.
    Cons(Box<ReadObject>, Box<ReadObject>),
}
