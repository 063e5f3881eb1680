// Bitfield evaluation: order resolution, field loop, size enforcement,
// member assembly, and state restoration
//
// State contract: the read-order flag is restored to its entry value on
// every exit path, success or error. The cursor is rewound to the entry
// position only when the order override flipped the flag; otherwise it ends
// past the consumed fields, where the next sibling reads.

use crate::bitpos::BitPosition;
use crate::decl::{BitfieldDecl, BitfieldOrder, Endianness};
use crate::error::EvalError;
use crate::eval::pattern::{BitfieldPattern, Pattern, PatternAttributes};
use crate::eval::{ControlFlow, Evaluator};

/// Names the front end used to accept for direction-only layout control.
const LEGACY_DIRECTION_ATTRS: [&str; 2] = ["left_to_right", "right_to_left"];

/// Outcome of resolving the `bitfield_order` attribute.
#[derive(Debug)]
struct OrderResolution {
    /// True when the override flipped the evaluator's read-order flag
    changed: bool,
    /// Declared fixed size in bits, 0 when no override is present
    fixed_size: u64,
    /// Cursor snapshot taken before the override consumed anything
    origin: BitPosition,
}

impl Evaluator<'_> {
    /// Evaluate a bitfield declaration into a single pattern.
    ///
    /// The returned `ControlFlow` is whatever the field list left pending:
    /// `Return` that stopped the loop, or any flow raised while inside an
    /// enclosing array element, for that loop to interpret.
    pub fn eval_bitfield(
        &mut self,
        decl: &BitfieldDecl,
    ) -> Result<(Pattern, ControlFlow), EvalError> {
        self.note_evaluation(&decl.name);
        self.enter_recursion(decl.span)?;
        let prev_reversed = self.read_order_reversed();
        let result = self.eval_bitfield_inner(decl);
        // Restoration guard: runs on success and error alike.
        self.set_read_order_reversed(prev_reversed);
        self.exit_recursion();
        result
    }

    fn eval_bitfield_inner(
        &mut self,
        decl: &BitfieldDecl,
    ) -> Result<(Pattern, ControlFlow), EvalError> {
        let endian = decl.endian.unwrap_or(self.default_endian());
        self.reject_legacy_direction_attrs(decl)?;
        let order = self.resolve_bitfield_order(decl, endian)?;

        // Scope opens here and closes on every exit below.
        self.scope.push();
        let outcome = self.eval_bitfield_fields(decl, order.fixed_size);
        self.scope.pop();
        let (collected, bit_size, flow) = outcome?;

        self.check_pattern_limit(decl.span)?;
        let mut container = BitfieldPattern {
            name: decl.name.clone(),
            type_name: decl.name.clone(),
            start: order.origin,
            bit_size,
            reversed: self.read_order_reversed(),
            endian,
            section: self.section_id(),
            members: Vec::new(),
            parent: None,
            attributes: PatternAttributes::default(),
        };
        if order.changed {
            // The fixed window was already counted; the members, not the
            // container, did the real cursor movement inside it.
            self.set_bit_cursor(order.origin);
        }
        assemble_members(&mut container, collected);

        let mut pattern = Pattern::Bitfield(container);
        self.apply_type_attributes(&decl.attrs, pattern.attributes_mut())?;
        Ok((pattern, flow))
    }

    fn reject_legacy_direction_attrs(&self, decl: &BitfieldDecl) -> Result<(), EvalError> {
        for name in LEGACY_DIRECTION_ATTRS {
            if let Some(attr) = decl.attr(name) {
                return Err(self.resolve_error(EvalError::attribute(
                    format!("attribute '{}' is no longer supported", attr.name),
                    attr.span,
                )));
            }
        }
        Ok(())
    }

    /// Interpret the `bitfield_order(direction, size)` attribute.
    ///
    /// When the resolved direction flips the read order, the declared window
    /// is consumed up front (reversed layout assigns fields back-to-front
    /// inside it) and the evaluator flag is overwritten.
    fn resolve_bitfield_order(
        &mut self,
        decl: &BitfieldDecl,
        endian: Endianness,
    ) -> Result<OrderResolution, EvalError> {
        let origin = self.bit_cursor();
        let Some(attr) = decl.attr("bitfield_order") else {
            return Ok(OrderResolution {
                changed: false,
                fixed_size: 0,
                origin,
            });
        };

        if attr.args.len() != 2 {
            return Err(self.resolve_error(EvalError::attribute(
                format!(
                    "attribute 'bitfield_order' expected 2 arguments, received {}",
                    attr.args.len()
                ),
                attr.span,
            )));
        }

        let direction = self.eval_expr(&attr.args[0])?;
        if direction.is_null() {
            return Err(self.resolve_error(EvalError::attribute(
                "the 'direction' argument of 'bitfield_order' must not be void",
                attr.args[0].span,
            )));
        }
        let code = direction.to_unsigned().map_err(|e| {
            self.resolve_error(
                EvalError::attribute(e.message, attr.args[0].span),
            )
        })?;
        let declared_order = BitfieldOrder::from_code(code).ok_or_else(|| {
            self.resolve_error(EvalError::attribute(
                format!("invalid bitfield order value {}", code),
                attr.args[0].span,
            ))
        })?;

        let size_value = self.eval_expr(&attr.args[1])?;
        if size_value.is_null() {
            return Err(self.resolve_error(EvalError::attribute(
                "the 'size' argument of 'bitfield_order' must not be void",
                attr.args[1].span,
            )));
        }
        let size = size_value.to_unsigned().map_err(|e| {
            self.resolve_error(
                EvalError::attribute(e.message, attr.args[1].span),
            )
        })?;
        if size == 0 {
            return Err(self.resolve_error(EvalError::attribute(
                "fixed size of a bitfield must be greater than zero",
                attr.args[1].span,
            )));
        }
        let fixed_size = u64::try_from(size).map_err(|_| {
            self.resolve_error(EvalError::attribute(
                "fixed size of a bitfield is too large",
                attr.args[1].span,
            ))
        })?;

        // Most-to-least under little-endian reads against the byte order,
        // as does least-to-most under big-endian.
        let should_reverse = (declared_order == BitfieldOrder::MostToLeastSignificant)
            != (endian == Endianness::Big);
        let mut changed = false;
        if should_reverse != self.read_order_reversed() {
            changed = true;
            let _ = self.take_bits(fixed_size);
            self.set_read_order_reversed(should_reverse);
            tracing::debug!(
                bitfield = %decl.name,
                reversed = should_reverse,
                window_bits = fixed_size,
                "bitfield read order changed"
            );
        }

        Ok(OrderResolution {
            changed,
            fixed_size,
            origin,
        })
    }

    /// Evaluate the field list, accounting consumed bits after every field.
    ///
    /// Returns the collected patterns, the final bit size, and the pending
    /// control flow. Outside an array element, Break and Continue stop the
    /// loop and come back cleared; Continue additionally discards the whole
    /// accumulator (all prior fields of this list, not just the current
    /// one). Inside an array element, flow is left pending for the enclosing
    /// loop and every field still evaluates.
    fn eval_bitfield_fields(
        &mut self,
        decl: &BitfieldDecl,
        fixed_size: u64,
    ) -> Result<(Vec<Pattern>, u64, ControlFlow), EvalError> {
        let loop_origin = self.bit_cursor();
        let mut collected = Vec::new();
        let mut bit_size = 0u64;
        let mut pending = ControlFlow::None;

        for field in &decl.fields {
            let flow = self.eval_field(field, &mut collected)?;

            bit_size = loop_origin.distance_to(self.bit_cursor());
            if fixed_size > 0 && bit_size > fixed_size {
                return Err(self.resolve_error(EvalError::size(
                    "bitfield fields exceeded the declared fixed size",
                    field.span(),
                )));
            }

            if self.current_array_index().is_none() {
                match flow {
                    ControlFlow::Return => {
                        pending = ControlFlow::Return;
                        break;
                    }
                    ControlFlow::Break => break,
                    ControlFlow::Continue => {
                        collected.clear();
                        break;
                    }
                    ControlFlow::None => {}
                }
            } else if flow != ControlFlow::None {
                pending = flow;
            }
        }

        if fixed_size > 0 {
            bit_size = fixed_size;
        }
        Ok((collected, bit_size, pending))
    }
}

/// Wire member back-references and filter padding out of the visible list.
/// Padding was already counted toward the size; exclusion is presentation
/// only. Non-member patterns pass through unchanged.
fn assemble_members(container: &mut BitfieldPattern, collected: Vec<Pattern>) {
    let anchor = container.anchor();
    let mut members = Vec::with_capacity(collected.len());
    for mut pattern in collected {
        if pattern.is_bitfield_member() {
            pattern.set_parent(anchor);
            if pattern.is_padding() {
                continue;
            }
        }
        members.push(pattern);
    }
    container.members = members;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{Attribute, Expr, FieldDecl};
    use crate::eval::data_source::SliceDataSource;

    fn order_attr(direction: Expr, size: Expr) -> Attribute {
        Attribute::new("bitfield_order", vec![direction, size])
    }

    #[test]
    fn test_resolve_order_absent() {
        let data = [0u8; 4];
        let ds = SliceDataSource::new(&data);
        let mut ev = Evaluator::new(&ds);
        let decl = BitfieldDecl::new("Flags");
        let res = ev
            .resolve_bitfield_order(&decl, Endianness::Little)
            .unwrap();
        assert!(!res.changed);
        assert_eq!(res.fixed_size, 0);
        assert_eq!(res.origin, BitPosition::default());
        assert!(!ev.read_order_reversed());
    }

    #[test]
    fn test_resolve_order_msb_little_endian_reverses() {
        let data = [0u8; 4];
        let ds = SliceDataSource::new(&data);
        let mut ev = Evaluator::new(&ds);
        let decl =
            BitfieldDecl::new("Flags").with_attr(order_attr(Expr::uint(0), Expr::uint(16)));
        let res = ev
            .resolve_bitfield_order(&decl, Endianness::Little)
            .unwrap();
        assert!(res.changed);
        assert_eq!(res.fixed_size, 16);
        assert!(ev.read_order_reversed());
        // The fixed window was reserved up front
        assert_eq!(ev.bit_cursor(), BitPosition::new(2, 0));
    }

    #[test]
    fn test_resolve_order_msb_big_endian_not_reversed() {
        let data = [0u8; 4];
        let ds = SliceDataSource::new(&data);
        let mut ev = Evaluator::new(&ds);
        let decl =
            BitfieldDecl::new("Flags").with_attr(order_attr(Expr::uint(0), Expr::uint(16)));
        let res = ev.resolve_bitfield_order(&decl, Endianness::Big).unwrap();
        assert!(!res.changed);
        assert_eq!(res.fixed_size, 16);
        assert!(!ev.read_order_reversed());
        assert_eq!(ev.bit_cursor(), BitPosition::default());
    }

    #[test]
    fn test_resolve_order_lsb_big_endian_reverses() {
        let data = [0u8; 4];
        let ds = SliceDataSource::new(&data);
        let mut ev = Evaluator::new(&ds);
        let decl = BitfieldDecl::new("Flags").with_attr(order_attr(Expr::uint(1), Expr::uint(8)));
        let res = ev.resolve_bitfield_order(&decl, Endianness::Big).unwrap();
        assert!(res.changed);
        assert!(ev.read_order_reversed());
    }

    #[test]
    fn test_resolve_order_invalid_direction_code() {
        let data = [0u8; 4];
        let ds = SliceDataSource::new(&data);
        let mut ev = Evaluator::new(&ds);
        let decl = BitfieldDecl::new("Flags").with_attr(order_attr(Expr::uint(7), Expr::uint(8)));
        let err = ev
            .resolve_bitfield_order(&decl, Endianness::Little)
            .unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Attribute);
    }

    #[test]
    fn test_assemble_filters_padding_and_sets_parents() {
        use crate::eval::pattern::{FieldPattern, PatternValue};
        let mut container = BitfieldPattern {
            name: "Flags".into(),
            type_name: "Flags".into(),
            start: BitPosition::default(),
            bit_size: 8,
            reversed: false,
            endian: Endianness::Little,
            section: 0,
            members: Vec::new(),
            parent: None,
            attributes: PatternAttributes::default(),
        };
        let field = |name: &str, padding: bool| {
            Pattern::Field(FieldPattern {
                name: name.into(),
                start: BitPosition::default(),
                width: 4,
                value: PatternValue::Unsigned(0),
                padding,
                parent: None,
                attributes: PatternAttributes::default(),
            })
        };
        assemble_members(&mut container, vec![field("padding", true), field("a", false)]);
        assert_eq!(container.members.len(), 1);
        assert_eq!(container.members[0].name(), "a");
        match &container.members[0] {
            Pattern::Field(f) => assert_eq!(f.parent, Some(container.anchor())),
            other => panic!("expected Field, got {:?}", other),
        }
    }

    #[test]
    fn test_fields_loop_size_error_cites_field() {
        use crate::span::Span;
        let data = [0u8; 4];
        let ds = SliceDataSource::new(&data);
        let mut ev = Evaluator::new(&ds);
        let decl = BitfieldDecl::new("Flags")
            .with_field(FieldDecl::bits("a", 4))
            .with_field(FieldDecl::bits("b", 8).with_span(Span::new(10, 20)));
        let err = ev.eval_bitfield_fields(&decl, 8).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Size);
        assert_eq!(err.span, Some(Span::new(10, 20)));
    }
}
