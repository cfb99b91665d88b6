//! Player registry keyed by connection id
//!
//! Owned by the server's single dispatch loop, so no locking is involved.
//! Entries are kept in ascending id order which makes iteration (and thus
//! snapshot order) stable from tick to tick.

use crate::error::RegistryError;
use log::{debug, info};
use shared::PlayerState;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: BTreeMap<u32, PlayerState>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new player; an existing entry for `id` is left untouched.
    pub fn register(&mut self, id: u32, initial: PlayerState) -> Result<(), RegistryError> {
        if self.players.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered(id));
        }

        info!("Registered player {} ({}) at ({}, {})", id, initial.name, initial.x, initial.y);
        self.players.insert(id, initial);
        Ok(())
    }

    /// Removes a player. Calling this for an unknown id is a no-op.
    pub fn unregister(&mut self, id: &u32) -> Option<PlayerState> {
        let removed = self.players.remove(id);
        match &removed {
            Some(player) => info!("Unregistered player {} ({})", id, player.name),
            None => debug!("Unregister for unknown player {}", id),
        }
        removed
    }

    pub fn get(&self, id: &u32) -> Option<&PlayerState> {
        self.players.get(id)
    }

    pub fn get_mut(&mut self, id: &u32) -> Option<&mut PlayerState> {
        self.players.get_mut(id)
    }

    pub fn contains(&self, id: &u32) -> bool {
        self.players.contains_key(id)
    }

    /// Applies `f` to every player in ascending id order.
    pub fn for_each<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut PlayerState),
    {
        for player in self.players.values_mut() {
            f(player);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerState> {
        self.players.values()
    }

    /// Clones every player, in id order, for serialization.
    pub fn snapshot(&self) -> Vec<PlayerState> {
        self.players.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: u32, name: &str) -> PlayerState {
        PlayerState::new(id, name.to_string(), "#ff0000".to_string(), 100.0, 100.0)
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = PlayerRegistry::new();
        assert!(registry.is_empty());

        registry.register(1, player(1, "one")).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&1));
        assert_eq!(registry.get(&1).unwrap().name, "one");
        assert!(registry.get(&2).is_none());
    }

    #[test]
    fn test_double_register_keeps_original() {
        let mut registry = PlayerRegistry::new();
        registry.register(1, player(1, "first")).unwrap();

        let result = registry.register(1, player(1, "second"));
        assert_eq!(result, Err(RegistryError::AlreadyRegistered(1)));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&1).unwrap().name, "first");
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let mut registry = PlayerRegistry::new();
        registry.register(5, player(5, "five")).unwrap();

        assert!(registry.unregister(&5).is_some());
        assert!(registry.unregister(&5).is_none());
        assert!(registry.unregister(&999).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_for_each_visits_in_id_order() {
        let mut registry = PlayerRegistry::new();
        for id in [3, 1, 2] {
            registry.register(id, player(id, "p")).unwrap();
        }

        let mut visited = Vec::new();
        registry.for_each(|p| {
            visited.push(p.id);
            p.x += 1.0;
        });

        assert_eq!(visited, vec![1, 2, 3]);
        assert!(registry.iter().all(|p| p.x == 101.0));
    }

    #[test]
    fn test_get_mut_and_snapshot() {
        let mut registry = PlayerRegistry::new();
        registry.register(2, player(2, "two")).unwrap();
        registry.register(1, player(1, "one")).unwrap();

        registry.get_mut(&2).unwrap().inputs.left = true;

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].id, 1);
        assert!(snapshot[1].inputs.left);
    }
}
