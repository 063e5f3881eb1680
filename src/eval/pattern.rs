// Pattern types: evaluation output describing decoded bit regions
//
// Every evaluation produces a fresh pattern tree owned by the caller.
// Members of a bitfield carry a non-owning anchor back to the container for
// bit-address resolution; the container alone owns its members.

use crate::bitpos::BitPosition;
use crate::decl::Endianness;
use crate::eval::value::Value;

/// Decoded value of a single bitfield field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PatternValue {
    Unsigned(u128),
    Signed(i128),
    Bool(bool),
}

/// Display attributes applied through the generic attribute pipeline
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternAttributes {
    /// Display color in hex (e.g., "FF0000")
    pub color: Option<String>,
    /// Comment text
    pub comment: Option<String>,
    /// Whether this node is hidden from display
    pub hidden: bool,
    /// Custom display name
    pub display_name: Option<String>,
    /// Format string for value display
    pub format: Option<String>,
    /// Whether this node is sealed (members not expanded)
    pub sealed: bool,
}

/// Non-owning handle to the bitfield a member belongs to.
///
/// A plain value snapshot of the finished container: enough to resolve a
/// member's bit address without keeping the container alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitfieldAnchor {
    pub start: BitPosition,
    pub bit_size: u64,
    pub reversed: bool,
}

/// The finished bitfield container pattern
#[derive(Debug, Clone, PartialEq)]
pub struct BitfieldPattern {
    pub name: String,
    pub type_name: String,
    pub start: BitPosition,
    pub bit_size: u64,
    pub reversed: bool,
    pub endian: Endianness,
    pub section: u64,
    /// Visible members, in declaration order, padding filtered out
    pub members: Vec<Pattern>,
    /// Set when this bitfield is itself a member of an enclosing bitfield
    pub parent: Option<BitfieldAnchor>,
    pub attributes: PatternAttributes,
}

impl BitfieldPattern {
    /// Anchor handle members use to refer back to this container.
    pub fn anchor(&self) -> BitfieldAnchor {
        BitfieldAnchor {
            start: self.start,
            bit_size: self.bit_size,
            reversed: self.reversed,
        }
    }
}

/// A single decoded field inside a bitfield
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPattern {
    pub name: String,
    pub start: BitPosition,
    /// Width in bits
    pub width: u64,
    pub value: PatternValue,
    /// Padding fields occupy bit-space but stay out of the member list
    pub padding: bool,
    pub parent: Option<BitfieldAnchor>,
    pub attributes: PatternAttributes,
}

impl FieldPattern {
    /// Bit offset of this field relative to its parent's start.
    /// Zero when no parent anchor has been assigned yet.
    pub fn bit_offset_in_parent(&self) -> u64 {
        match self.parent {
            Some(anchor) => self.start.distance_to(anchor.start),
            None => 0,
        }
    }
}

/// A computed local value surfaced next to the members.
/// Not a bitfield member: occupies no bit-space, never padding.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalPattern {
    pub name: String,
    pub value: Value,
    pub attributes: PatternAttributes,
}

/// A node in the evaluation result tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Bitfield(BitfieldPattern),
    Field(FieldPattern),
    Local(LocalPattern),
}

impl Pattern {
    pub fn name(&self) -> &str {
        match self {
            Pattern::Bitfield(p) => &p.name,
            Pattern::Field(p) => &p.name,
            Pattern::Local(p) => &p.name,
        }
    }

    /// Whether this pattern is a bitfield member (has a bit extent inside a
    /// container). Locals pass through assembly untouched.
    pub fn is_bitfield_member(&self) -> bool {
        matches!(self, Pattern::Bitfield(_) | Pattern::Field(_))
    }

    /// Padding query; only field members can be padding.
    pub fn is_padding(&self) -> bool {
        match self {
            Pattern::Field(p) => p.padding,
            _ => false,
        }
    }

    /// Wire the member-to-container back-reference. No-op for non-members.
    pub fn set_parent(&mut self, anchor: BitfieldAnchor) {
        match self {
            Pattern::Bitfield(p) => p.parent = Some(anchor),
            Pattern::Field(p) => p.parent = Some(anchor),
            Pattern::Local(_) => {}
        }
    }

    /// Size in bits; locals occupy no bit-space.
    pub fn bit_size(&self) -> u64 {
        match self {
            Pattern::Bitfield(p) => p.bit_size,
            Pattern::Field(p) => p.width,
            Pattern::Local(_) => 0,
        }
    }

    pub fn attributes(&self) -> &PatternAttributes {
        match self {
            Pattern::Bitfield(p) => &p.attributes,
            Pattern::Field(p) => &p.attributes,
            Pattern::Local(p) => &p.attributes,
        }
    }

    pub fn attributes_mut(&mut self) -> &mut PatternAttributes {
        match self {
            Pattern::Bitfield(p) => &mut p.attributes,
            Pattern::Field(p) => &mut p.attributes,
            Pattern::Local(p) => &mut p.attributes,
        }
    }

    /// Unwrap as a bitfield container; panics on other variants.
    /// Convenience for tests and callers that just evaluated a bitfield.
    pub fn expect_bitfield(&self) -> &BitfieldPattern {
        match self {
            Pattern::Bitfield(p) => p,
            other => panic!("expected bitfield pattern, got {:?}", other),
        }
    }
}
