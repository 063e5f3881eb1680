// Constant-expression evaluation for widths, conditions, and attribute args

use crate::decl::{BinaryOp, Expr, ExprKind, UnaryOp};
use crate::error::EvalError;
use crate::eval::Evaluator;
use crate::eval::value::Value;

impl Evaluator<'_> {
    /// Evaluate an expression to a value.
    ///
    /// Identifiers resolve through the scope chain, so expressions can refer
    /// to fields already decoded in the current (or an enclosing) bitfield.
    pub fn eval_expr(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        match &expr.kind {
            ExprKind::Literal(v) => Ok(v.clone()),
            ExprKind::Ident(name) => match self.scope.get(name) {
                Some(v) => Ok(v.clone()),
                None => Err(self.make_error(format!("undefined identifier '{}'", name), expr.span)),
            },
            ExprKind::Unary { op, operand } => {
                let v = self.eval_expr(operand)?;
                self.eval_unary(*op, v)
                    .map_err(|e| self.resolve_error(e.with_span_if_none(expr.span)))
            }
            ExprKind::Binary { op, lhs, rhs } => {
                // Logical operators short-circuit
                match op {
                    BinaryOp::And => {
                        let l = self.eval_expr(lhs)?.to_bool()?;
                        if !l {
                            return Ok(Value::Bool(false));
                        }
                        return Ok(Value::Bool(self.eval_expr(rhs)?.to_bool()?));
                    }
                    BinaryOp::Or => {
                        let l = self.eval_expr(lhs)?.to_bool()?;
                        if l {
                            return Ok(Value::Bool(true));
                        }
                        return Ok(Value::Bool(self.eval_expr(rhs)?.to_bool()?));
                    }
                    _ => {}
                }
                let l = self.eval_expr(lhs)?;
                let r = self.eval_expr(rhs)?;
                self.eval_binary(*op, l, r)
                    .map_err(|e| self.resolve_error(e.with_span_if_none(expr.span)))
            }
        }
    }

    fn eval_unary(&self, op: UnaryOp, v: Value) -> Result<Value, EvalError> {
        match op {
            UnaryOp::Neg => Ok(Value::Signed(
                v.to_signed()?
                    .checked_neg()
                    .ok_or_else(|| EvalError::new("negation overflow"))?,
            )),
            UnaryOp::Not => Ok(Value::Bool(!v.to_bool()?)),
            UnaryOp::BitNot => Ok(Value::Unsigned(!v.to_unsigned()?)),
        }
    }

    fn eval_binary(&self, op: BinaryOp, l: Value, r: Value) -> Result<Value, EvalError> {
        // Comparisons work over the common signed domain
        match op {
            BinaryOp::Eq => return Ok(Value::Bool(l.to_signed()? == r.to_signed()?)),
            BinaryOp::Ne => return Ok(Value::Bool(l.to_signed()? != r.to_signed()?)),
            BinaryOp::Lt => return Ok(Value::Bool(l.to_signed()? < r.to_signed()?)),
            BinaryOp::Le => return Ok(Value::Bool(l.to_signed()? <= r.to_signed()?)),
            BinaryOp::Gt => return Ok(Value::Bool(l.to_signed()? > r.to_signed()?)),
            BinaryOp::Ge => return Ok(Value::Bool(l.to_signed()? >= r.to_signed()?)),
            _ => {}
        }

        // Arithmetic: signed if either side is signed, unsigned otherwise
        let signed = matches!(l, Value::Signed(_)) || matches!(r, Value::Signed(_));
        if signed {
            let a = l.to_signed()?;
            let b = r.to_signed()?;
            let out = match op {
                BinaryOp::Add => a.wrapping_add(b),
                BinaryOp::Sub => a.wrapping_sub(b),
                BinaryOp::Mul => a.wrapping_mul(b),
                BinaryOp::Div => a
                    .checked_div(b)
                    .ok_or_else(|| EvalError::new("division by zero"))?,
                BinaryOp::Rem => a
                    .checked_rem(b)
                    .ok_or_else(|| EvalError::new("division by zero"))?,
                BinaryOp::Shl => a.wrapping_shl(b as u32),
                BinaryOp::Shr => a.wrapping_shr(b as u32),
                BinaryOp::BitAnd => a & b,
                BinaryOp::BitOr => a | b,
                BinaryOp::BitXor => a ^ b,
                _ => unreachable!("comparisons handled above"),
            };
            Ok(Value::Signed(out))
        } else {
            let a = l.to_unsigned()?;
            let b = r.to_unsigned()?;
            let out = match op {
                BinaryOp::Add => a.wrapping_add(b),
                BinaryOp::Sub => a.wrapping_sub(b),
                BinaryOp::Mul => a.wrapping_mul(b),
                BinaryOp::Div => a
                    .checked_div(b)
                    .ok_or_else(|| EvalError::new("division by zero"))?,
                BinaryOp::Rem => a
                    .checked_rem(b)
                    .ok_or_else(|| EvalError::new("division by zero"))?,
                BinaryOp::Shl => a.wrapping_shl(b as u32),
                BinaryOp::Shr => a.wrapping_shr(b as u32),
                BinaryOp::BitAnd => a & b,
                BinaryOp::BitOr => a | b,
                BinaryOp::BitXor => a ^ b,
                _ => unreachable!("comparisons handled above"),
            };
            Ok(Value::Unsigned(out))
        }
    }
}
