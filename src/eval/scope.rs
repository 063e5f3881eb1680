// Variable scope for field values and locals

use rustc_hash::FxHashMap;

use crate::eval::value::Value;

/// Scope chain for name resolution during evaluation.
///
/// Each bitfield body gets its own frame so sibling bitfields cannot see
/// each other's field values. Lookup walks outward, letting nested bitfields
/// branch on fields of the enclosing one.
pub struct Scope {
    frames: Vec<FxHashMap<String, Value>>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    pub fn new() -> Self {
        Self {
            frames: vec![FxHashMap::default()],
        }
    }

    /// Push a new scope frame
    pub fn push(&mut self) {
        self.frames.push(FxHashMap::default());
    }

    /// Pop the current scope frame. The root frame is never popped.
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Define (or shadow) a variable in the current frame
    #[inline]
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        let frame = self.frames.last_mut().unwrap();
        frame.insert(name.into(), value);
    }

    /// Look up a variable, walking the scope chain outward
    #[inline]
    pub fn get(&self, name: &str) -> Option<&Value> {
        for frame in self.frames.iter().rev() {
            if let Some(v) = frame.get(name) {
                return Some(v);
            }
        }
        None
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_get() {
        let mut scope = Scope::new();
        scope.define("x", Value::Unsigned(42));
        assert_eq!(scope.get("x"), Some(&Value::Unsigned(42)));
        assert_eq!(scope.get("y"), None);
    }

    #[test]
    fn test_shadowing_and_pop() {
        let mut scope = Scope::new();
        scope.define("x", Value::Unsigned(1));
        scope.push();
        scope.define("x", Value::Unsigned(2));
        assert_eq!(scope.get("x"), Some(&Value::Unsigned(2)));
        scope.pop();
        assert_eq!(scope.get("x"), Some(&Value::Unsigned(1)));
    }

    #[test]
    fn test_outer_frame_visible() {
        let mut scope = Scope::new();
        scope.define("outer", Value::Bool(true));
        scope.push();
        assert_eq!(scope.get("outer"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_root_frame_never_popped() {
        let mut scope = Scope::new();
        scope.define("x", Value::Unsigned(1));
        scope.pop();
        scope.pop();
        assert_eq!(scope.get("x"), Some(&Value::Unsigned(1)));
        assert_eq!(scope.depth(), 1);
    }
}
