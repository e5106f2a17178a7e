use std::collections::{HashMap, VecDeque};

use game_types::{PlayerId, QueueMode};
use parking_lot::Mutex;
use tracing::{debug, info};

/// One FIFO queue per mode. A player waits in at most one of them.
#[derive(Default)]
pub struct MatchmakingQueue {
    queues: Mutex<HashMap<QueueMode, VecDeque<PlayerId>>>,
}

impl MatchmakingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue `player_id` for `mode` and return its 1-based position.
    /// Joining again keeps the original place; joining another mode moves
    /// the player to the back of that queue.
    pub fn add_player(&self, player_id: PlayerId, mode: QueueMode) -> u32 {
        let mut queues = self.queues.lock();

        for (queued_mode, queue) in queues.iter_mut() {
            if *queued_mode != mode {
                queue.retain(|p| *p != player_id);
            }
        }

        let queue = queues.entry(mode).or_default();
        let position = match queue.iter().position(|p| *p == player_id) {
            Some(index) => index + 1,
            None => {
                queue.push_back(player_id);
                queue.len()
            }
        };

        info!(player_id = %player_id, ?mode, position, "Player queued");
        position as u32
    }

    /// Idempotent. Returns the mode the player was waiting in.
    pub fn remove_player(&self, player_id: PlayerId) -> Option<QueueMode> {
        let mut queues = self.queues.lock();
        for (mode, queue) in queues.iter_mut() {
            if let Some(index) = queue.iter().position(|p| *p == player_id) {
                queue.remove(index);
                info!(player_id = %player_id, mode = ?mode, "Player left queue");
                return Some(*mode);
            }
        }
        None
    }

    /// Pop the two oldest eligible players of `mode`.
    ///
    /// Entries failing `eligible` (offline, already in a match) are dropped
    /// as they are met. A lone eligible player stays at the front.
    pub fn try_create_match<F>(&self, mode: QueueMode, eligible: F) -> Option<[PlayerId; 2]>
    where
        F: Fn(PlayerId) -> bool,
    {
        let mut queues = self.queues.lock();
        let queue = queues.get_mut(&mode)?;

        let mut pair = Vec::with_capacity(2);
        while pair.len() < 2 {
            let Some(candidate) = queue.pop_front() else {
                break;
            };
            if eligible(candidate) {
                pair.push(candidate);
            } else {
                debug!(player_id = %candidate, ?mode, "Dropped stale queue entry");
            }
        }

        match pair[..] {
            [first, second] => {
                info!(?mode, first = %first, second = %second, "Paired players");
                Some([first, second])
            }
            [lone] => {
                queue.push_front(lone);
                None
            }
            _ => None,
        }
    }

    pub fn queue_len(&self, mode: QueueMode) -> usize {
        self.queues.lock().get(&mode).map_or(0, VecDeque::len)
    }

    pub fn mode_of(&self, player_id: PlayerId) -> Option<QueueMode> {
        self.queues
            .lock()
            .iter()
            .find(|(_, queue)| queue.contains(&player_id))
            .map(|(mode, _)| *mode)
    }

    pub fn is_player_in_queue(&self, player_id: PlayerId) -> bool {
        self.mode_of(player_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use uuid::Uuid;

    fn anyone(_: PlayerId) -> bool {
        true
    }

    #[test]
    fn test_basic_queue_operations() {
        let queue = MatchmakingQueue::new();
        let player = Uuid::new_v4();

        assert_eq!(queue.add_player(player, QueueMode::Casual), 1);
        assert_eq!(queue.queue_len(QueueMode::Casual), 1);
        assert!(queue.is_player_in_queue(player));

        assert_eq!(queue.remove_player(player), Some(QueueMode::Casual));
        assert_eq!(queue.queue_len(QueueMode::Casual), 0);
        assert!(!queue.is_player_in_queue(player));
    }

    #[test]
    fn test_prevent_duplicate_queue_entries() {
        let queue = MatchmakingQueue::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        queue.add_player(first, QueueMode::Ranked);
        queue.add_player(second, QueueMode::Ranked);
        assert_eq!(queue.add_player(first, QueueMode::Ranked), 1);
        assert_eq!(queue.queue_len(QueueMode::Ranked), 2);
    }

    #[test]
    fn test_switching_mode_moves_player() {
        let queue = MatchmakingQueue::new();
        let player = Uuid::new_v4();

        queue.add_player(player, QueueMode::Casual);
        queue.add_player(player, QueueMode::Ranked);

        assert_eq!(queue.queue_len(QueueMode::Casual), 0);
        assert_eq!(queue.mode_of(player), Some(QueueMode::Ranked));
    }

    #[test]
    fn test_match_creation_with_minimum_players() {
        let queue = MatchmakingQueue::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        queue.add_player(first, QueueMode::Casual);
        assert!(queue.try_create_match(QueueMode::Casual, anyone).is_none());
        assert_eq!(queue.queue_len(QueueMode::Casual), 1);

        queue.add_player(second, QueueMode::Casual);
        let pair = queue.try_create_match(QueueMode::Casual, anyone).unwrap();
        assert_eq!(pair, [first, second]);
        assert_eq!(queue.queue_len(QueueMode::Casual), 0);
    }

    #[test]
    fn test_modes_never_pair_across() {
        let queue = MatchmakingQueue::new();
        queue.add_player(Uuid::new_v4(), QueueMode::Casual);
        queue.add_player(Uuid::new_v4(), QueueMode::Ranked);

        assert!(queue.try_create_match(QueueMode::Casual, anyone).is_none());
        assert!(queue.try_create_match(QueueMode::Ranked, anyone).is_none());
    }

    #[test]
    fn test_ineligible_entries_are_discarded() {
        let queue = MatchmakingQueue::new();
        let offline = Uuid::new_v4();
        let waiting = Uuid::new_v4();
        let joiner = Uuid::new_v4();
        let online: HashSet<PlayerId> = [waiting, joiner].into_iter().collect();

        queue.add_player(offline, QueueMode::Casual);
        queue.add_player(waiting, QueueMode::Casual);
        assert!(
            queue
                .try_create_match(QueueMode::Casual, |p| online.contains(&p))
                .is_none()
        );
        // the offline entry is gone, the valid one keeps its place
        assert_eq!(queue.queue_len(QueueMode::Casual), 1);
        assert!(!queue.is_player_in_queue(offline));

        queue.add_player(joiner, QueueMode::Casual);
        let pair = queue
            .try_create_match(QueueMode::Casual, |p| online.contains(&p))
            .unwrap();
        assert_eq!(pair, [waiting, joiner]);
    }

    #[test]
    fn test_remove_nonexistent_player() {
        let queue = MatchmakingQueue::new();
        assert_eq!(queue.remove_player(Uuid::new_v4()), None);
    }

    #[test]
    fn test_rapid_queue_operations() {
        let queue = MatchmakingQueue::new();
        let players: Vec<PlayerId> = (0..100).map(|_| Uuid::new_v4()).collect();

        for player in &players {
            queue.add_player(*player, QueueMode::Casual);
        }
        for (i, player) in players.iter().enumerate() {
            if i % 2 == 0 {
                queue.remove_player(*player);
            }
        }
        assert_eq!(queue.queue_len(QueueMode::Casual), 50);

        let mut paired = 0;
        while let Some([a, b]) = queue.try_create_match(QueueMode::Casual, anyone) {
            assert_ne!(a, b);
            paired += 2;
        }
        assert_eq!(paired, 50);
    }
}
