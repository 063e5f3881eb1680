// Field-declaration evaluation: one closed dispatch over FieldDecl
//
// Every arm appends zero or more patterns to the accumulator and returns the
// control-flow outcome for the enclosing field loop to interpret.

use crate::decl::{BitsDecl, BoolDecl, Expr, FieldDecl, LocalDecl, PaddingDecl};
use crate::error::EvalError;
use crate::eval::data_source::read_bits;
use crate::eval::pattern::{FieldPattern, LocalPattern, Pattern, PatternAttributes, PatternValue};
use crate::eval::value::Value;
use crate::eval::{ControlFlow, Evaluator};
use crate::span::Span;

/// Widest field value the evaluator can decode.
const MAX_FIELD_WIDTH: u64 = 128;

/// Interpret the low `width` bits of `raw` as two's complement.
fn sign_extend(raw: u128, width: u64) -> i128 {
    if width == 0 || width >= 128 {
        return raw as i128;
    }
    let sign_bit = 1u128 << (width - 1);
    if raw & sign_bit != 0 {
        (raw | (u128::MAX << width)) as i128
    } else {
        raw as i128
    }
}

impl Evaluator<'_> {
    /// Evaluate one field declaration against the current evaluator state.
    pub(crate) fn eval_field(
        &mut self,
        field: &FieldDecl,
        out: &mut Vec<Pattern>,
    ) -> Result<ControlFlow, EvalError> {
        match field {
            FieldDecl::Bits(d) => {
                self.eval_bits_field(d, out)?;
                Ok(ControlFlow::None)
            }
            FieldDecl::Bool(d) => {
                self.eval_bool_field(d, out)?;
                Ok(ControlFlow::None)
            }
            FieldDecl::Padding(d) => {
                self.eval_padding_field(d, out)?;
                Ok(ControlFlow::None)
            }
            FieldDecl::Nested(d) => {
                let (mut pattern, flow) = self.eval_bitfield(&d.decl)?;
                if let Pattern::Bitfield(p) = &mut pattern {
                    p.name = d.name.clone();
                }
                out.push(pattern);
                Ok(flow)
            }
            FieldDecl::If(d) => {
                let cond = self.eval_expr(&d.cond)?;
                let taken = cond
                    .to_bool()
                    .map_err(|e| self.resolve_error(e.with_span_if_none(d.span)))?;
                let body = if taken { &d.then_body } else { &d.else_body };
                for inner in body {
                    let flow = self.eval_field(inner, out)?;
                    if flow != ControlFlow::None {
                        return Ok(flow);
                    }
                }
                Ok(ControlFlow::None)
            }
            FieldDecl::Local(d) => {
                self.eval_local_field(d, out)?;
                Ok(ControlFlow::None)
            }
            FieldDecl::Break(_) => Ok(ControlFlow::Break),
            FieldDecl::Continue(_) => Ok(ControlFlow::Continue),
            FieldDecl::Return(_) => Ok(ControlFlow::Return),
        }
    }

    fn field_width(&mut self, width: &Expr, span: Span) -> Result<u64, EvalError> {
        let value = self
            .eval_expr(width)?
            .to_unsigned()
            .map_err(|e| self.resolve_error(e.with_span_if_none(span)))?;
        u64::try_from(value).map_err(|_| self.make_error("bit field width too large", span))
    }

    fn eval_bits_field(&mut self, d: &BitsDecl, out: &mut Vec<Pattern>) -> Result<(), EvalError> {
        let width = self.field_width(&d.width, d.span)?;
        if width > MAX_FIELD_WIDTH {
            return Err(self.make_error(
                format!("bit field width exceeds {} bits", MAX_FIELD_WIDTH),
                d.span,
            ));
        }
        let start = self.take_bits(width);
        let raw = read_bits(self.data, start, width)
            .map_err(|e| self.resolve_error(e.with_span_if_none(d.span)))?;
        let (value, scope_value) = if d.signed {
            let v = sign_extend(raw, width);
            (PatternValue::Signed(v), Value::Signed(v))
        } else {
            (PatternValue::Unsigned(raw), Value::Unsigned(raw))
        };
        self.scope.define(d.name.clone(), scope_value);
        self.check_pattern_limit(d.span)?;
        let mut attributes = PatternAttributes::default();
        self.apply_type_attributes(&d.attrs, &mut attributes)?;
        out.push(Pattern::Field(FieldPattern {
            name: d.name.clone(),
            start,
            width,
            value,
            padding: false,
            parent: None,
            attributes,
        }));
        Ok(())
    }

    fn eval_bool_field(&mut self, d: &BoolDecl, out: &mut Vec<Pattern>) -> Result<(), EvalError> {
        let width = self.field_width(&d.width, d.span)?;
        if width > MAX_FIELD_WIDTH {
            return Err(self.make_error(
                format!("bit field width exceeds {} bits", MAX_FIELD_WIDTH),
                d.span,
            ));
        }
        let start = self.take_bits(width);
        let raw = read_bits(self.data, start, width)
            .map_err(|e| self.resolve_error(e.with_span_if_none(d.span)))?;
        let value = raw != 0;
        self.scope.define(d.name.clone(), Value::Bool(value));
        self.check_pattern_limit(d.span)?;
        let mut attributes = PatternAttributes::default();
        self.apply_type_attributes(&d.attrs, &mut attributes)?;
        out.push(Pattern::Field(FieldPattern {
            name: d.name.clone(),
            start,
            width,
            value: PatternValue::Bool(value),
            padding: false,
            parent: None,
            attributes,
        }));
        Ok(())
    }

    // Padding consumes bit-space without touching the data source, so a
    // trailing pad may extend past the end of the data.
    fn eval_padding_field(
        &mut self,
        d: &PaddingDecl,
        out: &mut Vec<Pattern>,
    ) -> Result<(), EvalError> {
        let width = self.field_width(&d.width, d.span)?;
        let start = self.take_bits(width);
        self.check_pattern_limit(d.span)?;
        out.push(Pattern::Field(FieldPattern {
            name: "padding".into(),
            start,
            width,
            value: PatternValue::Unsigned(0),
            padding: true,
            parent: None,
            attributes: PatternAttributes::default(),
        }));
        Ok(())
    }

    fn eval_local_field(&mut self, d: &LocalDecl, out: &mut Vec<Pattern>) -> Result<(), EvalError> {
        let value = self.eval_expr(&d.expr)?;
        self.scope.define(d.name.clone(), value.clone());
        self.check_pattern_limit(d.span)?;
        out.push(Pattern::Local(LocalPattern {
            name: d.name.clone(),
            value,
            attributes: PatternAttributes::default(),
        }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_extend_negative() {
        assert_eq!(sign_extend(0b1111, 4), -1);
        assert_eq!(sign_extend(0b1000, 4), -8);
    }

    #[test]
    fn test_sign_extend_positive() {
        assert_eq!(sign_extend(0b0111, 4), 7);
        assert_eq!(sign_extend(0, 4), 0);
    }

    #[test]
    fn test_sign_extend_degenerate_widths() {
        assert_eq!(sign_extend(5, 0), 5);
        assert_eq!(sign_extend(u128::MAX, 128), -1);
    }
}
