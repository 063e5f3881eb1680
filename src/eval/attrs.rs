// Generic type-level attribute application
//
// Maps display-oriented attributes onto PatternAttributes. Layout-steering
// attributes (bitfield_order) are consumed where evaluation needs them;
// names this pipeline does not know are left for other layers.

use crate::decl::Attribute;
use crate::error::EvalError;
use crate::eval::Evaluator;
use crate::eval::pattern::PatternAttributes;

impl Evaluator<'_> {
    /// Apply a declaration's attributes to a finished pattern.
    pub(crate) fn apply_type_attributes(
        &mut self,
        attrs: &[Attribute],
        target: &mut PatternAttributes,
    ) -> Result<(), EvalError> {
        for attr in attrs {
            match attr.name.as_str() {
                "color" => target.color = Some(self.attr_string_arg(attr)?),
                "comment" => target.comment = Some(self.attr_string_arg(attr)?),
                "name" => target.display_name = Some(self.attr_string_arg(attr)?),
                "format" => target.format = Some(self.attr_string_arg(attr)?),
                "hidden" => target.hidden = true,
                "sealed" => target.sealed = true,
                _ => {}
            }
        }
        Ok(())
    }

    /// Evaluate an attribute's single string argument on demand.
    fn attr_string_arg(&mut self, attr: &Attribute) -> Result<String, EvalError> {
        let arg = attr.args.first().ok_or_else(|| {
            self.resolve_error(EvalError::attribute(
                format!("attribute '{}' expects an argument", attr.name),
                attr.span,
            ))
        })?;
        let value = self.eval_expr(arg)?;
        if value.is_null() {
            return Err(self.resolve_error(EvalError::attribute(
                format!("argument of attribute '{}' must not be void", attr.name),
                arg.span,
            )));
        }
        value
            .to_display_string()
            .map_err(|e| self.resolve_error(e.with_span_if_none(arg.span)))
    }
}

#[cfg(test)]
mod tests {
    use crate::decl::{Attribute, Expr};
    use crate::eval::Evaluator;
    use crate::eval::data_source::SliceDataSource;
    use crate::eval::pattern::PatternAttributes;

    #[test]
    fn test_display_attributes_applied() {
        let data = [0u8; 1];
        let ds = SliceDataSource::new(&data);
        let mut ev = Evaluator::new(&ds);
        let attrs = vec![
            Attribute::new("color", vec![Expr::string("FF0000")]),
            Attribute::new("comment", vec![Expr::string("flag byte")]),
            Attribute::new("hidden", vec![]),
        ];
        let mut target = PatternAttributes::default();
        ev.apply_type_attributes(&attrs, &mut target).unwrap();
        assert_eq!(target.color.as_deref(), Some("FF0000"));
        assert_eq!(target.comment.as_deref(), Some("flag byte"));
        assert!(target.hidden);
        assert!(!target.sealed);
    }

    #[test]
    fn test_unknown_attribute_ignored() {
        let data = [0u8; 1];
        let ds = SliceDataSource::new(&data);
        let mut ev = Evaluator::new(&ds);
        let attrs = vec![Attribute::new("transform", vec![Expr::string("fn")])];
        let mut target = PatternAttributes::default();
        ev.apply_type_attributes(&attrs, &mut target).unwrap();
        assert_eq!(target, PatternAttributes::default());
    }

    #[test]
    fn test_missing_argument_rejected() {
        let data = [0u8; 1];
        let ds = SliceDataSource::new(&data);
        let mut ev = Evaluator::new(&ds);
        let attrs = vec![Attribute::new("comment", vec![])];
        let mut target = PatternAttributes::default();
        assert!(ev.apply_type_attributes(&attrs, &mut target).is_err());
    }

    #[test]
    fn test_void_argument_rejected() {
        let data = [0u8; 1];
        let ds = SliceDataSource::new(&data);
        let mut ev = Evaluator::new(&ds);
        let attrs = vec![Attribute::new("comment", vec![Expr::void()])];
        let mut target = PatternAttributes::default();
        assert!(ev.apply_type_attributes(&attrs, &mut target).is_err());
    }
}
