//! Ordered track list with a cursor.
//!
//! The queue has no opinion about playback; it only answers "what is
//! current" and "what comes next". Navigation past either end is refused
//! and leaves the cursor where it was.

use crate::models::Track;

#[derive(Debug, Clone, Default)]
pub struct QueueManager {
    tracks: Vec<Track>,
    current: usize,
}

impl QueueManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole queue and move the cursor back to the first track.
    pub fn replace(&mut self, tracks: Vec<Track>) {
        self.tracks = tracks;
        self.current = 0;
    }

    /// Move to the next track. Returns `None` at the end of the queue.
    pub fn advance(&mut self) -> Option<&Track> {
        if self.current + 1 >= self.tracks.len() {
            return None;
        }
        self.current += 1;
        self.tracks.get(self.current)
    }

    /// Move to the previous track. Returns `None` at the start of the queue.
    pub fn retreat(&mut self) -> Option<&Track> {
        if self.current == 0 || self.tracks.is_empty() {
            return None;
        }
        self.current -= 1;
        self.tracks.get(self.current)
    }

    pub fn current(&self) -> Option<&Track> {
        self.tracks.get(self.current)
    }

    /// The track after the current one, without moving.
    pub fn peek_next(&self) -> Option<&Track> {
        self.tracks.get(self.current + 1)
    }

    /// Cursor position, or `None` when the queue is empty.
    pub fn current_index(&self) -> Option<usize> {
        (!self.tracks.is_empty()).then_some(self.current)
    }

    pub fn has_next(&self) -> bool {
        self.current + 1 < self.tracks.len()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracks(n: usize) -> Vec<Track> {
        (0..n)
            .map(|i| Track::new(format!("t{}", i), format!("Song {}", i), "Artist"))
            .collect()
    }

    #[test]
    fn test_empty_queue() {
        let mut queue = QueueManager::new();
        assert!(queue.current().is_none());
        assert!(queue.current_index().is_none());
        assert!(queue.advance().is_none());
        assert!(queue.retreat().is_none());
        assert!(queue.peek_next().is_none());
    }

    #[test]
    fn test_replace_resets_cursor() {
        let mut queue = QueueManager::new();
        let first = tracks(3);
        queue.replace(first.clone());
        assert_eq!(queue.current(), Some(&first[0]));

        queue.advance();
        queue.advance();
        assert_eq!(queue.current_index(), Some(2));

        queue.replace(tracks(2));
        assert_eq!(queue.current_index(), Some(0));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_retreat_on_single_track() {
        let mut queue = QueueManager::new();
        queue.replace(tracks(1));
        assert!(queue.retreat().is_none());
        assert!(queue.advance().is_none());
        assert_eq!(queue.current_index(), Some(0));
    }

    #[test]
    fn test_navigation_stops_at_edges() {
        let mut queue = QueueManager::new();
        queue.replace(tracks(2));

        assert!(queue.retreat().is_none());
        assert_eq!(queue.current_index(), Some(0));

        assert_eq!(queue.advance().unwrap().id.as_str(), "t1");
        assert!(!queue.has_next());
        assert!(queue.advance().is_none());
        assert_eq!(queue.current_index(), Some(1));

        assert_eq!(queue.retreat().unwrap().id.as_str(), "t0");
    }

    #[test]
    fn test_peek_next_does_not_move() {
        let mut queue = QueueManager::new();
        queue.replace(tracks(3));
        queue.advance();
        assert_eq!(queue.peek_next().unwrap().id.as_str(), "t2");
        assert_eq!(queue.current_index(), Some(1));
    }
}
