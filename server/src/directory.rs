use std::collections::HashMap;

use plinko_types::Player;
use uuid::Uuid;

/// Live players, keyed by id, with join order preserved.
///
/// Roster pushes list players in join order, so the order is tracked
/// explicitly alongside the lookup map.
#[derive(Debug, Default)]
pub struct PlayerDirectory {
    players: HashMap<Uuid, Player>,
    order: Vec<Uuid>,
}

impl PlayerDirectory {
    pub fn insert(&mut self, player: Player) {
        if !self.players.contains_key(&player.id) {
            self.order.push(player.id);
        }
        self.players.insert(player.id, player);
    }

    pub fn remove(&mut self, id: &Uuid) -> Option<Player> {
        let removed = self.players.remove(id);
        if removed.is_some() {
            self.order.retain(|entry| entry != id);
        }
        removed
    }

    pub fn get(&self, id: &Uuid) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.players.contains_key(id)
    }

    /// Players in join order.
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.order.iter().filter_map(|id| self.players.get(id))
    }

    /// Display names currently in use, optionally excluding one player.
    pub fn names_excluding(&self, exclude: Option<&Uuid>) -> Vec<String> {
        self.iter()
            .filter(|player| exclude.map_or(true, |id| player.id != *id))
            .map(|player| player.name.clone())
            .collect()
    }
}
