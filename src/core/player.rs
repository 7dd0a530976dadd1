//! Player identity and per-player storage.
//!
//! Agents, the action-value memory, and the demo games all key data by
//! player. [`PlayerId`] is a 0-based index into the seating order;
//! [`PlayerMap`] holds one slot per seat with O(1) access.

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// A seat at the table, 0-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl PlayerId {
    /// The id of seat `id`.
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    /// The seat as a 0-based index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// All seats of a `player_count`-player game, in order.
    ///
    /// ```
    /// use horizon_search::core::PlayerId;
    ///
    /// let players: Vec<_> = PlayerId::all(3).collect();
    /// assert_eq!(players, vec![PlayerId::new(0), PlayerId::new(1), PlayerId::new(2)]);
    /// ```
    pub fn all(player_count: usize) -> impl Iterator<Item = PlayerId> {
        (0..player_count as u8).map(PlayerId)
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Player {}", self.0)
    }
}

/// One value per seat.
///
/// The seat count is fixed at construction; indexing by [`PlayerId`] can
/// therefore never miss for ids belonging to the game.
///
/// ```
/// use horizon_search::core::{PlayerId, PlayerMap};
///
/// let mut score: PlayerMap<i32> = PlayerMap::with_value(4, 0);
///
/// score[PlayerId::new(1)] = 15;
/// assert_eq!(score[PlayerId::new(1)], 15);
/// assert_eq!(score[PlayerId::new(0)], 0);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerMap<T> {
    slots: Box<[T]>,
}

impl<T> PlayerMap<T> {
    /// One slot per seat, filled by `fill(seat)`.
    pub fn new(player_count: usize, fill: impl Fn(PlayerId) -> T) -> Self {
        assert!(player_count > 0, "a game needs at least one player");
        assert!(player_count <= 255, "player ids are single bytes");

        Self {
            slots: (0..player_count as u8).map(|i| fill(PlayerId(i))).collect(),
        }
    }

    /// One slot per seat, every slot a clone of `value`.
    pub fn with_value(player_count: usize, value: T) -> Self
    where
        T: Clone,
    {
        Self::new(player_count, |_| value.clone())
    }

    /// Visit every slot mutably, with its seat.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (PlayerId, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .map(|(i, v)| (PlayerId(i as u8), v))
    }
}

impl<T> Index<PlayerId> for PlayerMap<T> {
    type Output = T;

    fn index(&self, player: PlayerId) -> &T {
        &self.slots[player.index()]
    }
}

impl<T> IndexMut<PlayerId> for PlayerMap<T> {
    fn index_mut(&mut self, player: PlayerId) -> &mut T {
        &mut self.slots[player.index()]
    }
}
