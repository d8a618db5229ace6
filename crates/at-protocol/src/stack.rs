//! Stack of classifier chains.
//!
//! The bottom layer is a permanent no-op layer: with nothing pushed, responses
//! pass through unclassified. The top layer is the active one.

use crate::classifier::ParserChain;

/// Ordered classifier layers, top is active.
#[derive(Debug)]
pub struct ParserStack {
    layers: Vec<Option<ParserChain>>,
}

impl Default for ParserStack {
    fn default() -> Self {
        ParserStack::new()
    }
}

impl ParserStack {
    /// Create a stack holding only the no-op base layer.
    pub fn new() -> Self {
        ParserStack { layers: vec![None] }
    }

    /// Create a stack with `chain` active above the base layer.
    pub fn with_active(chain: ParserChain) -> Self {
        let mut stack = ParserStack::new();
        stack.push(chain);
        stack
    }

    /// Make `chain` the active layer.
    pub fn push(&mut self, chain: ParserChain) {
        self.layers.push(Some(chain));
    }

    /// Remove the most recently pushed layer.
    ///
    /// Returns `false`, leaving the stack untouched, when only the base layer
    /// is left.
    pub fn pop(&mut self) -> bool {
        if self.layers.len() > 1 {
            self.layers.pop();
            true
        } else {
            false
        }
    }

    /// Drop every layer above `depth`. The base layer always stays.
    pub fn truncate(&mut self, depth: usize) {
        self.layers.truncate(depth.max(1));
    }

    /// Get the active chain, or `None` for the no-op base layer.
    pub fn active(&self) -> Option<&ParserChain> {
        self.layers.last().and_then(Option::as_ref)
    }

    /// Number of layers, base layer included.
    pub fn depth(&self) -> usize {
        self.layers.len()
    }
}
