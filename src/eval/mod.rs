// Tree-walking evaluation core for bitfield declarations

mod attrs;
mod bitfield;
pub mod data_source;
mod expr;
mod field;
pub mod pattern;
pub mod scope;
pub mod value;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::bitpos::BitPosition;
use crate::decl::Endianness;
use crate::error::EvalError;
use crate::span::Span;
use data_source::DataSource;
use scope::Scope;

/// Early-exit outcome of evaluating a field declaration.
///
/// Control flow is an explicit value handed back up to the enclosing loop,
/// not a flag stashed in the evaluator. The bitfield field loop interprets
/// it; enclosing array/loop evaluators receive whatever it leaves pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlow {
    None,
    Break,
    Continue,
    Return,
}

// Default evaluation limits
const DEFAULT_MAX_RECURSION_DEPTH: u32 = 256;
const DEFAULT_MAX_PATTERN_LIMIT: u64 = 0x40000;

/// Evaluator that walks declarations against binary data.
///
/// Holds the process-wide, thread-confined evaluation state: the bit cursor,
/// the read-order flag, the active section, and the variable scope. A
/// bitfield evaluation is the sole mutator of this state for its duration
/// and restores it as contracted on every exit path.
pub struct Evaluator<'a> {
    data: &'a dyn DataSource,
    pub scope: Scope,
    bit_cursor: BitPosition,
    reversed: bool,
    default_endian: Endianness,
    section: u64,
    /// Set by enclosing array evaluation; fields leave control flow pending
    /// while this is present
    current_array_index: Option<u64>,
    recursion_depth: u32,
    max_recursion_depth: u32,
    pattern_count: u64,
    max_pattern_limit: u64,
    /// Number of bitfield evaluations performed
    eval_count: u64,
    /// Shared counter — readable from outside during evaluation
    shared_eval_count: Option<Arc<AtomicU64>>,
    /// Declaration source text for error location reporting
    source: String,
}

impl<'a> Evaluator<'a> {
    pub fn new(data: &'a dyn DataSource) -> Self {
        Self {
            data,
            scope: Scope::new(),
            bit_cursor: BitPosition::default(),
            reversed: false,
            default_endian: Endianness::Little,
            section: 0,
            current_array_index: None,
            recursion_depth: 0,
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
            pattern_count: 0,
            max_pattern_limit: DEFAULT_MAX_PATTERN_LIMIT,
            eval_count: 0,
            shared_eval_count: None,
            source: String::new(),
        }
    }

    pub fn data(&self) -> &dyn DataSource {
        self.data
    }

    // --- bit cursor ---

    #[inline]
    pub fn bit_cursor(&self) -> BitPosition {
        self.bit_cursor
    }

    pub fn set_bit_cursor(&mut self, position: BitPosition) {
        self.bit_cursor = position;
    }

    /// Consume `bits` through the cursor in the current read direction and
    /// return the start of the consumed span (its lowest bit address).
    ///
    /// Forward reads return the old cursor and advance past the span;
    /// reversed reads step the cursor back first, so the span sits just
    /// below the old cursor.
    pub(crate) fn take_bits(&mut self, bits: u64) -> BitPosition {
        if self.reversed {
            self.bit_cursor = self.bit_cursor.rewound_by(bits);
            self.bit_cursor
        } else {
            let start = self.bit_cursor;
            self.bit_cursor = self.bit_cursor.advanced_by(bits);
            start
        }
    }

    // --- read order ---

    #[inline]
    pub fn read_order_reversed(&self) -> bool {
        self.reversed
    }

    pub fn set_read_order_reversed(&mut self, reversed: bool) {
        self.reversed = reversed;
    }

    // --- section / endianness ---

    pub fn section_id(&self) -> u64 {
        self.section
    }

    pub fn set_section_id(&mut self, section: u64) {
        self.section = section;
    }

    pub fn default_endian(&self) -> Endianness {
        self.default_endian
    }

    pub fn set_default_endian(&mut self, endian: Endianness) {
        self.default_endian = endian;
    }

    // --- array context ---

    /// Index of the array element currently being evaluated, if any.
    /// While set, bitfield field loops leave early-exit flow pending for the
    /// enclosing loop instead of interpreting it.
    pub fn current_array_index(&self) -> Option<u64> {
        self.current_array_index
    }

    pub fn set_current_array_index(&mut self, index: Option<u64>) {
        self.current_array_index = index;
    }

    // --- limits & telemetry ---

    /// Set evaluation limits.
    /// Recursion depth is capped at 1024 to prevent stack overflow.
    pub fn set_limits(&mut self, pattern_limit: u64, recursion_depth: u32) {
        self.max_pattern_limit = pattern_limit;
        self.max_recursion_depth = recursion_depth.min(1024);
    }

    /// Set a shared counter for live monitoring from another thread.
    pub fn set_shared_eval_count(&mut self, counter: Arc<AtomicU64>) {
        self.shared_eval_count = Some(counter);
    }

    pub fn eval_count(&self) -> u64 {
        self.eval_count
    }

    /// Progress hook, invoked once per bitfield evaluation.
    pub(crate) fn note_evaluation(&mut self, name: &str) {
        self.eval_count += 1;
        if let Some(ref counter) = self.shared_eval_count {
            counter.fetch_add(1, Ordering::Relaxed);
        }
        tracing::trace!(bitfield = name, cursor = %self.bit_cursor, "evaluating bitfield");
    }

    /// Check pattern limit and increment counter.
    pub(crate) fn check_pattern_limit(&mut self, span: Span) -> Result<(), EvalError> {
        self.pattern_count += 1;
        if self.max_pattern_limit > 0 && self.pattern_count > self.max_pattern_limit {
            return Err(self.make_error(
                format!("pattern limit exceeded (max {})", self.max_pattern_limit),
                span,
            ));
        }
        Ok(())
    }

    pub(crate) fn enter_recursion(&mut self, span: Span) -> Result<(), EvalError> {
        self.recursion_depth += 1;
        if self.recursion_depth > self.max_recursion_depth {
            self.recursion_depth -= 1;
            return Err(self.make_error(
                format!(
                    "recursion depth exceeded (max {})",
                    self.max_recursion_depth
                ),
                span,
            ));
        }
        Ok(())
    }

    pub(crate) fn exit_recursion(&mut self) {
        self.recursion_depth = self.recursion_depth.saturating_sub(1);
    }

    // --- diagnostics ---

    /// Set the declaration source text for error location reporting
    pub fn set_source(&mut self, source: String) {
        self.source = source;
    }

    /// Create an EvalError with span and resolved line/col
    pub(crate) fn make_error(&self, message: impl Into<String>, span: Span) -> EvalError {
        EvalError::new(message)
            .with_span_if_none(span)
            .resolve_location(&self.source)
    }

    /// Resolve location on an existing error (if span is set but line/col are not)
    pub(crate) fn resolve_error(&self, err: EvalError) -> EvalError {
        err.resolve_location(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::data_source::SliceDataSource;

    #[test]
    fn test_take_bits_forward() {
        let data = [0u8; 4];
        let ds = SliceDataSource::new(&data);
        let mut ev = Evaluator::new(&ds);
        let start = ev.take_bits(5);
        assert_eq!(start, BitPosition::new(0, 0));
        assert_eq!(ev.bit_cursor(), BitPosition::new(0, 5));
    }

    #[test]
    fn test_take_bits_reversed() {
        let data = [0u8; 4];
        let ds = SliceDataSource::new(&data);
        let mut ev = Evaluator::new(&ds);
        ev.set_bit_cursor(BitPosition::new(2, 0));
        ev.set_read_order_reversed(true);
        let start = ev.take_bits(5);
        assert_eq!(start, BitPosition::new(1, 3));
        assert_eq!(ev.bit_cursor(), BitPosition::new(1, 3));
    }

    #[test]
    fn test_recursion_guard() {
        let data = [0u8; 1];
        let ds = SliceDataSource::new(&data);
        let mut ev = Evaluator::new(&ds);
        ev.set_limits(0, 2);
        assert!(ev.enter_recursion(Span::dummy()).is_ok());
        assert!(ev.enter_recursion(Span::dummy()).is_ok());
        assert!(ev.enter_recursion(Span::dummy()).is_err());
        ev.exit_recursion();
        ev.exit_recursion();
        assert!(ev.enter_recursion(Span::dummy()).is_ok());
    }

    #[test]
    fn test_shared_eval_count() {
        let data = [0u8; 1];
        let ds = SliceDataSource::new(&data);
        let mut ev = Evaluator::new(&ds);
        let counter = Arc::new(AtomicU64::new(0));
        ev.set_shared_eval_count(Arc::clone(&counter));
        ev.note_evaluation("Flags");
        ev.note_evaluation("Flags");
        assert_eq!(ev.eval_count(), 2);
        assert_eq!(counter.load(Ordering::Relaxed), 2);
    }
}
