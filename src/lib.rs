// Bit-precise pattern evaluation core for declarative binary data annotation
//
// Takes bitfield declarations (built by a front end or programmatically) and
// evaluates them against a binary data source into pattern trees describing
// where every field lives, bit by bit, and how to interpret it.

pub mod bitpos;
pub mod decl;
pub mod error;
pub mod eval;
pub mod span;

// Re-export key types for public API
pub use bitpos::BitPosition;
pub use decl::{
    Attribute, BinaryOp, BitfieldDecl, BitfieldOrder, Endianness, Expr, FieldDecl, UnaryOp,
};
pub use error::{ErrorKind, EvalError};
pub use eval::data_source::{DataSource, SliceDataSource};
pub use eval::pattern::{
    BitfieldAnchor, BitfieldPattern, FieldPattern, LocalPattern, Pattern, PatternAttributes,
    PatternValue,
};
pub use eval::value::Value;
pub use eval::{ControlFlow, Evaluator};
