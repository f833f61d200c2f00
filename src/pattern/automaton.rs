//! A generic Aho-Corasick dictionary automaton with an explicit two-phase
//! build/query contract.
//!
//! The matching engine itself is the real `aho-corasick` crate; this type
//! only adds the per-key value map and the build/query state machine
//! (duplicate-key overwrite, empty keys never matching, misuse across the
//! build/query boundary being an error).

use crate::error::MatcherError;
use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use std::collections::HashMap;

enum State {
    Building,
    Built(AhoCorasick),
}

/// A dictionary automaton mapping byte-string keys to values of type `V`.
///
/// Call [`Automaton::add_word`] any number of times, then
/// [`Automaton::make_automaton`] exactly once, then [`Automaton::find_overlapping`]
/// any number of times. Calling them out of order is a [`MatcherError`].
pub struct Automaton<V> {
    state: State,
    keys: Vec<Vec<u8>>,
    values: Vec<V>,
    index_of: HashMap<Vec<u8>, usize>,
}

impl<V> Automaton<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::Building,
            keys: Vec::new(),
            values: Vec::new(),
            index_of: HashMap::new(),
        }
    }

    /// Register `key` with `value`. A duplicate key overwrites the value at
    /// its existing slot; an empty key is accepted but can never match (see
    /// [`Automaton::find_overlapping`]).
    ///
    /// # Errors
    /// Returns [`MatcherError::AlreadyBuilt`] if called after
    /// [`Automaton::make_automaton`].
    pub fn add_word(&mut self, key: impl AsRef<[u8]>, value: V) -> Result<(), MatcherError> {
        if matches!(self.state, State::Built(_)) {
            return Err(MatcherError::AlreadyBuilt);
        }
        let key = key.as_ref();
        if key.is_empty() {
            return Ok(());
        }
        if let Some(&idx) = self.index_of.get(key) {
            self.values[idx] = value;
        } else {
            let idx = self.keys.len();
            self.keys.push(key.to_vec());
            self.values.push(value);
            self.index_of.insert(key.to_vec(), idx);
        }
        Ok(())
    }

    /// Finalize the failure/dict-suffix links. Idempotent calls are an
    /// error, matching the two-phase build/query contract.
    ///
    /// # Errors
    /// Returns [`MatcherError::BuiltTwice`] if already built.
    pub fn make_automaton(&mut self) -> Result<(), MatcherError> {
        if matches!(self.state, State::Built(_)) {
            return Err(MatcherError::BuiltTwice);
        }
        let ac = AhoCorasickBuilder::new()
            .match_kind(MatchKind::Standard)
            .build(&self.keys)
            .map_err(|_| MatcherError::BuiltTwice)?;
        self.state = State::Built(ac);
        Ok(())
    }

    /// Every `(end_index, value)` pair for every dictionary key occurring in
    /// `text`, where `end_index` is the zero-based index of the last
    /// character of the occurrence. Overlapping occurrences are all
    /// reported.
    ///
    /// # Errors
    /// Returns [`MatcherError::NotBuilt`] if called before
    /// [`Automaton::make_automaton`].
    pub fn find_overlapping(&self, text: &[u8]) -> Result<Vec<(usize, &V)>, MatcherError> {
        let State::Built(ac) = &self.state else {
            return Err(MatcherError::NotBuilt);
        };
        let mut out = Vec::new();
        for mat in ac.find_overlapping_iter(text) {
            let end_index = mat.end() - 1;
            out.push((end_index, &self.values[mat.pattern().as_usize()]));
        }
        Ok(out)
    }
}

impl<V> Default for Automaton<V> {
    fn default() -> Self {
        Self::new()
    }
}
