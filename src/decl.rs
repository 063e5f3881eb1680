// Declaration model for bitfield evaluation
//
// Declarations are produced once (by a front end, or programmatically) and
// may be evaluated any number of times. All child nodes are exclusively
// owned, so `Clone` is a deep copy of the whole declaration tree.

use crate::eval::value::Value;
use crate::span::Span;

/// Byte endianness of the data a declaration reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

/// Declared bit assignment direction for a fixed-size bitfield.
///
/// Whether the layout is actually reversed depends on the byte endianness,
/// see `Evaluator::eval_bitfield`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitfieldOrder {
    MostToLeastSignificant = 0,
    LeastToMostSignificant = 1,
}

impl BitfieldOrder {
    /// Decode the numeric code used by the `bitfield_order` attribute.
    pub fn from_code(code: u128) -> Option<Self> {
        match code {
            0 => Some(BitfieldOrder::MostToLeastSignificant),
            1 => Some(BitfieldOrder::LeastToMostSignificant),
            _ => None,
        }
    }
}

/// Attribute: `[[name(args...)]]`. Arguments are expressions evaluated on
/// demand, at the point the attribute is consumed.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub args: Vec<Expr>,
    pub span: Span,
}

impl Attribute {
    pub fn new(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self {
            name: name.into(),
            args,
            span: Span::dummy(),
        }
    }
}

/// Argument and width expression with source span
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Value),
    /// Scope lookup; resolves to values of previously evaluated fields
    Ident(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self {
            kind,
            span: Span::dummy(),
        }
    }

    /// Unsigned integer literal
    pub fn uint(value: u128) -> Self {
        Self::new(ExprKind::Literal(Value::Unsigned(value)))
    }

    /// Signed integer literal
    pub fn int(value: i128) -> Self {
        Self::new(ExprKind::Literal(Value::Signed(value)))
    }

    pub fn boolean(value: bool) -> Self {
        Self::new(ExprKind::Literal(Value::Bool(value)))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(ExprKind::Literal(Value::String(value.into())))
    }

    /// Void literal, the result of expressions that produce nothing
    pub fn void() -> Self {
        Self::new(ExprKind::Literal(Value::Null))
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Self::new(ExprKind::Ident(name.into()))
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Self::new(ExprKind::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Self::new(ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

/// A bitfield declaration: an ordered list of field declarations plus the
/// attributes attached to the type.
#[derive(Debug, Clone)]
pub struct BitfieldDecl {
    pub name: String,
    /// Per-declaration endianness override; evaluator default when `None`
    pub endian: Option<Endianness>,
    pub fields: Vec<FieldDecl>,
    pub attrs: Vec<Attribute>,
    pub span: Span,
}

impl BitfieldDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endian: None,
            fields: Vec::new(),
            attrs: Vec::new(),
            span: Span::dummy(),
        }
    }

    pub fn with_field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_attr(mut self, attr: Attribute) -> Self {
        self.attrs.push(attr);
        self
    }

    pub fn with_endian(mut self, endian: Endianness) -> Self {
        self.endian = Some(endian);
        self
    }

    /// Look up an attribute by name. First match wins, like the front end
    /// which rejects duplicates before declarations reach the evaluator.
    pub fn attr(&self, name: &str) -> Option<&Attribute> {
        self.attrs.iter().find(|a| a.name == name)
    }
}

// --- Field declarations ---

#[derive(Debug, Clone)]
pub struct BitsDecl {
    pub name: String,
    pub width: Expr,
    /// Two's-complement interpretation of the extracted bits
    pub signed: bool,
    pub attrs: Vec<Attribute>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct BoolDecl {
    pub name: String,
    pub width: Expr,
    pub attrs: Vec<Attribute>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct PaddingDecl {
    pub width: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct NestedDecl {
    /// Member name inside the enclosing bitfield
    pub name: String,
    pub decl: Box<BitfieldDecl>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IfDecl {
    pub cond: Expr,
    pub then_body: Vec<FieldDecl>,
    pub else_body: Vec<FieldDecl>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct LocalDecl {
    pub name: String,
    pub expr: Expr,
    pub span: Span,
}

/// One field declaration inside a bitfield body.
///
/// This is a closed set: the evaluator dispatches exhaustively, and a deep
/// copy of a declaration is an ordinary `clone()`.
#[derive(Debug, Clone)]
pub enum FieldDecl {
    /// Named span of bits, unsigned or two's-complement
    Bits(BitsDecl),
    /// Named flag; nonzero bits decode to true
    Bool(BoolDecl),
    /// Anonymous filler: occupies bit-space, hidden from the member list
    Padding(PaddingDecl),
    /// Nested bitfield member
    Nested(NestedDecl),
    /// Conditional body; both branches are field lists
    If(IfDecl),
    /// Computed local value; produces a non-member pattern
    Local(LocalDecl),
    Break(Span),
    Continue(Span),
    Return(Span),
}

impl FieldDecl {
    pub fn bits(name: impl Into<String>, width: u64) -> Self {
        FieldDecl::Bits(BitsDecl {
            name: name.into(),
            width: Expr::uint(width as u128),
            signed: false,
            attrs: Vec::new(),
            span: Span::dummy(),
        })
    }

    pub fn signed_bits(name: impl Into<String>, width: u64) -> Self {
        FieldDecl::Bits(BitsDecl {
            name: name.into(),
            width: Expr::uint(width as u128),
            signed: true,
            attrs: Vec::new(),
            span: Span::dummy(),
        })
    }

    pub fn flag(name: impl Into<String>) -> Self {
        FieldDecl::Bool(BoolDecl {
            name: name.into(),
            width: Expr::uint(1),
            attrs: Vec::new(),
            span: Span::dummy(),
        })
    }

    pub fn padding(width: u64) -> Self {
        FieldDecl::Padding(PaddingDecl {
            width: Expr::uint(width as u128),
            span: Span::dummy(),
        })
    }

    pub fn nested(name: impl Into<String>, decl: BitfieldDecl) -> Self {
        FieldDecl::Nested(NestedDecl {
            name: name.into(),
            decl: Box::new(decl),
            span: Span::dummy(),
        })
    }

    pub fn when(cond: Expr, then_body: Vec<FieldDecl>) -> Self {
        FieldDecl::If(IfDecl {
            cond,
            then_body,
            else_body: Vec::new(),
            span: Span::dummy(),
        })
    }

    pub fn when_else(cond: Expr, then_body: Vec<FieldDecl>, else_body: Vec<FieldDecl>) -> Self {
        FieldDecl::If(IfDecl {
            cond,
            then_body,
            else_body,
            span: Span::dummy(),
        })
    }

    pub fn local(name: impl Into<String>, expr: Expr) -> Self {
        FieldDecl::Local(LocalDecl {
            name: name.into(),
            expr,
            span: Span::dummy(),
        })
    }

    pub fn break_() -> Self {
        FieldDecl::Break(Span::dummy())
    }

    pub fn continue_() -> Self {
        FieldDecl::Continue(Span::dummy())
    }

    pub fn return_() -> Self {
        FieldDecl::Return(Span::dummy())
    }

    pub fn span(&self) -> Span {
        match self {
            FieldDecl::Bits(d) => d.span,
            FieldDecl::Bool(d) => d.span,
            FieldDecl::Padding(d) => d.span,
            FieldDecl::Nested(d) => d.span,
            FieldDecl::If(d) => d.span,
            FieldDecl::Local(d) => d.span,
            FieldDecl::Break(span) | FieldDecl::Continue(span) | FieldDecl::Return(span) => *span,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        match &mut self {
            FieldDecl::Bits(d) => d.span = span,
            FieldDecl::Bool(d) => d.span = span,
            FieldDecl::Padding(d) => d.span = span,
            FieldDecl::Nested(d) => d.span = span,
            FieldDecl::If(d) => d.span = span,
            FieldDecl::Local(d) => d.span = span,
            FieldDecl::Break(s) | FieldDecl::Continue(s) | FieldDecl::Return(s) => *s = span,
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_from_code() {
        assert_eq!(
            BitfieldOrder::from_code(0),
            Some(BitfieldOrder::MostToLeastSignificant)
        );
        assert_eq!(
            BitfieldOrder::from_code(1),
            Some(BitfieldOrder::LeastToMostSignificant)
        );
        assert_eq!(BitfieldOrder::from_code(2), None);
    }

    #[test]
    fn test_attr_lookup() {
        let decl = BitfieldDecl::new("Flags")
            .with_attr(Attribute::new("comment", vec![Expr::string("x")]))
            .with_attr(Attribute::new("hidden", vec![]));
        assert!(decl.attr("hidden").is_some());
        assert!(decl.attr("color").is_none());
        assert_eq!(decl.attr("comment").unwrap().args.len(), 1);
    }

    #[test]
    fn test_clone_is_deep_copy() {
        let decl = BitfieldDecl::new("Outer").with_field(FieldDecl::nested(
            "inner",
            BitfieldDecl::new("Inner").with_field(FieldDecl::bits("a", 4)),
        ));
        let mut copy = decl.clone();
        match &mut copy.fields[0] {
            FieldDecl::Nested(n) => n.decl.fields.clear(),
            other => panic!("expected Nested, got {:?}", other),
        }
        // The original keeps its children
        match &decl.fields[0] {
            FieldDecl::Nested(n) => assert_eq!(n.decl.fields.len(), 1),
            other => panic!("expected Nested, got {:?}", other),
        }
    }

    #[test]
    fn test_field_span_round_trip() {
        let span = Span::new(3, 9);
        let field = FieldDecl::bits("a", 4).with_span(span);
        assert_eq!(field.span(), span);
    }
}
