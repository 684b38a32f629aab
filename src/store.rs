//! Ordered, index-addressable list of recorded actions.
//!
//! Insertion order is execution order. Duplicates are allowed. Every write path
//! validates its input first, so a failed call never leaves a partial change.

use std::sync::Arc;
use tracing::{debug, trace};

use crate::config::{self, Action};
use crate::error::{Error, Result};

/// Direction for [`ActionStore::move_action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

impl MoveDirection {
    /// Map a signed step (`-1` up, `+1` down) to a direction.
    pub fn from_step(step: i32) -> Option<Self> {
        match step {
            -1 => Some(Self::Up),
            1 => Some(Self::Down),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionStore {
    actions: Vec<Action>,
}

impl ActionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from already-decoded actions, validating each one.
    pub fn from_actions(actions: Vec<Action>) -> Result<Self> {
        let mut store = Self::new();
        store.replace_all(actions)?;
        Ok(store)
    }

    /// Decode and validate a template document.
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(Self {
            actions: config::load_from_str(s)?,
        })
    }

    /// Encode the store as a template document.
    pub fn to_json(&self) -> Result<String> {
        config::to_string_pretty(&self.actions)
    }

    /// Append a validated action and return its index.
    pub fn append(&mut self, action: Action) -> Result<usize> {
        action.validate()?;
        trace!(target: "clicker::store", %action, "append");
        self.actions.push(action);
        Ok(self.actions.len() - 1)
    }

    /// Remove the action at `index`, shifting later actions down.
    pub fn remove(&mut self, index: usize) -> Result<Action> {
        self.check_index(index)?;
        let removed = self.actions.remove(index);
        trace!(target: "clicker::store", index, action = %removed, "remove");
        Ok(removed)
    }

    /// Swap the action at `index` with its neighbour.
    ///
    /// Returns the action's new index, or `None` when it already sits at the
    /// edge the move points to.
    pub fn move_action(&mut self, index: usize, direction: MoveDirection) -> Result<Option<usize>> {
        self.check_index(index)?;
        let target = match direction {
            MoveDirection::Up => index.checked_sub(1),
            MoveDirection::Down => Some(index + 1).filter(|&t| t < self.actions.len()),
        };
        if let Some(target) = target {
            self.actions.swap(index, target);
            trace!(target: "clicker::store", from = index, to = target, "move");
        }
        Ok(target)
    }

    /// Replace the whole sequence, or nothing at all if any action is invalid.
    pub fn replace_all(&mut self, actions: Vec<Action>) -> Result<()> {
        config::validate_actions(&actions)?;
        debug!(
            target: "clicker::store",
            previous = self.actions.len(), next = actions.len(),
            "Replacing action sequence"
        );
        self.actions = actions;
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&Action> {
        self.actions.get(index)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    pub fn as_slice(&self) -> &[Action] {
        &self.actions
    }

    /// Immutable copy handed to the playback engine.
    pub fn snapshot(&self) -> Arc<[Action]> {
        Arc::from(self.actions.as_slice())
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.actions.len() {
            Ok(())
        } else {
            Err(Error::IndexOutOfRange {
                index,
                len: self.actions.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MouseButton, Rgb};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn keys(store: &ActionStore) -> Vec<String> {
        store.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn append_returns_index_and_keeps_duplicates() {
        let mut store = ActionStore::new();
        assert_eq!(store.append(Action::key("a")).unwrap(), 0);
        assert_eq!(store.append(Action::key("a")).unwrap(), 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(0), store.get(1));
    }

    #[test]
    fn append_rejects_invalid_action() {
        let mut store = ActionStore::new();
        let err = store.append(Action::key("")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn remove_shifts_and_reports_bad_index() {
        let mut store =
            ActionStore::from_actions(vec![Action::key("a"), Action::key("b"), Action::key("c")])
                .unwrap();
        assert_eq!(store.remove(1).unwrap(), Action::key("b"));
        assert_eq!(store.as_slice(), &[Action::key("a"), Action::key("c")]);

        let err = store.remove(2).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 2, len: 2 }));
    }

    #[test]
    fn move_swaps_with_neighbour_and_stops_at_edges() {
        let mut store =
            ActionStore::from_actions(vec![Action::key("a"), Action::key("b"), Action::key("c")])
                .unwrap();

        assert_eq!(store.move_action(0, MoveDirection::Up).unwrap(), None);
        assert_eq!(store.move_action(2, MoveDirection::Down).unwrap(), None);
        assert_eq!(store.move_action(0, MoveDirection::Down).unwrap(), Some(1));
        assert_eq!(
            store.as_slice(),
            &[Action::key("b"), Action::key("a"), Action::key("c")]
        );
        assert_eq!(store.move_action(2, MoveDirection::Up).unwrap(), Some(1));
        assert_eq!(
            store.as_slice(),
            &[Action::key("b"), Action::key("c"), Action::key("a")]
        );
        assert!(matches!(
            store.move_action(3, MoveDirection::Up),
            Err(Error::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn direction_from_step() {
        assert_eq!(MoveDirection::from_step(-1), Some(MoveDirection::Up));
        assert_eq!(MoveDirection::from_step(1), Some(MoveDirection::Down));
        assert_eq!(MoveDirection::from_step(2), None);
    }

    #[test]
    fn replace_all_is_atomic() {
        let mut store = ActionStore::from_actions(vec![Action::key("keep")]).unwrap();
        let before = store.clone();

        let err = store
            .replace_all(vec![
                Action::key("fine"),
                Action::click(1, -1, MouseButton::Left),
            ])
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(store, before);

        store
            .replace_all(vec![Action::scroll(1, 1, 3), Action::key("z")])
            .unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn malformed_json_leaves_store_untouched() {
        let mut store = ActionStore::from_actions(vec![Action::key("keep")]).unwrap();
        let before = store.clone();

        let loaded = ActionStore::from_json(r#"[{"type": "KeyPress"}]"#);
        assert!(matches!(loaded, Err(Error::Format(_))));
        if let Ok(loaded) = loaded {
            store = loaded;
        }
        assert_eq!(store, before);
    }

    #[test]
    fn json_round_trip_is_lossless() {
        let store = ActionStore::from_actions(vec![
            Action::click(10, 10, MouseButton::Left),
            Action::double_click(5, 6, MouseButton::Right).guarded_by(Rgb(1, 2, 3)),
            Action::scroll(100, 200, -4).with_delay(0.75),
            Action::key("f5"),
            Action::color_condition(9, 9, Rgb(255, 254, 253)).with_delay(0.0),
            Action::key("f5"),
        ])
        .unwrap();
        let json = store.to_json().unwrap();
        assert_eq!(ActionStore::from_json(&json).unwrap(), store);
    }

    #[test]
    fn snapshot_is_detached_from_later_edits() {
        let mut store = ActionStore::from_actions(vec![Action::key("a")]).unwrap();
        let snap = store.snapshot();
        store.append(Action::key("b")).unwrap();
        assert_eq!(snap.len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn random_edits_match_reference_vec() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _round in 0..50 {
            let mut store = ActionStore::new();
            let mut reference: Vec<Action> = Vec::new();

            for step in 0..200 {
                match rng.random_range(0..3) {
                    0 => {
                        let action = Action::key(format!("k{}", rng.random_range(0..5)))
                            .with_delay(f64::from(step % 3));
                        store.append(action.clone()).unwrap();
                        reference.push(action);
                    }
                    1 => {
                        let index = rng.random_range(0..reference.len() + 2);
                        let got = store.remove(index);
                        if index < reference.len() {
                            assert_eq!(got.unwrap(), reference.remove(index));
                        } else {
                            assert!(got.is_err());
                        }
                    }
                    _ => {
                        let index = rng.random_range(0..reference.len() + 1);
                        let down = rng.random_bool(0.5);
                        let dir = if down {
                            MoveDirection::Down
                        } else {
                            MoveDirection::Up
                        };
                        let got = store.move_action(index, dir);
                        if index >= reference.len() {
                            assert!(got.is_err());
                            continue;
                        }
                        let target = if down {
                            (index + 1 < reference.len()).then_some(index + 1)
                        } else {
                            index.checked_sub(1)
                        };
                        if let Some(t) = target {
                            reference.swap(index, t);
                        }
                        assert_eq!(got.unwrap(), target);
                    }
                }
            }
            assert_eq!(store.as_slice(), reference.as_slice());
            assert_eq!(keys(&store).len(), reference.len());
        }
    }
}
