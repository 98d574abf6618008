//! Ordered track queue with a playback cursor

use super::track::Track;

/// The currently loaded tracks plus the cursor into them.
///
/// The cursor is `None` exactly when the queue is empty; otherwise it always
/// points at a valid entry.
#[derive(Clone, Debug, Default)]
pub struct Queue {
    tracks: Vec<Track>,
    current: Option<usize>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole queue. The cursor lands on the first track.
    pub fn replace(&mut self, tracks: Vec<Track>) {
        self.current = if tracks.is_empty() { None } else { Some(0) };
        self.tracks = tracks;
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.current = None;
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.and_then(|i| self.tracks.get(i))
    }

    /// Moves the cursor to the first track with `id`. Returns false (and
    /// leaves the cursor alone) when there is no such track.
    pub fn select(&mut self, id: &str) -> bool {
        match self.tracks.iter().position(|t| t.id == id) {
            Some(index) => {
                self.current = Some(index);
                true
            }
            None => false,
        }
    }

    /// Advances by one without wrapping. Returns false at the last track.
    pub fn advance(&mut self) -> bool {
        match self.current {
            Some(i) if i + 1 < self.tracks.len() => {
                self.current = Some(i + 1);
                true
            }
            _ => false,
        }
    }

    /// Steps back by one without wrapping. Returns false at the first track.
    pub fn retreat(&mut self) -> bool {
        match self.current {
            Some(i) if i > 0 => {
                self.current = Some(i - 1);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_of(ids: &[&str]) -> Queue {
        let mut queue = Queue::new();
        queue.replace(ids.iter().map(|id| Track::new(*id, format!("Track {id}"))).collect());
        queue
    }

    #[test]
    fn test_replace_sets_cursor() {
        let mut queue = queue_of(&["1", "2"]);
        assert_eq!(queue.current_index(), Some(0));

        queue.replace(Vec::new());
        assert!(queue.is_empty());
        assert_eq!(queue.current_index(), None);
        assert!(queue.current().is_none());
    }

    #[test]
    fn test_advance_saturates_at_end() {
        let mut queue = queue_of(&["1", "2", "3"]);
        assert!(queue.advance());
        assert!(queue.advance());
        assert_eq!(queue.current_index(), Some(2));
        assert!(!queue.advance());
        assert_eq!(queue.current_index(), Some(2));
    }

    #[test]
    fn test_retreat_saturates_at_start() {
        let mut queue = queue_of(&["1", "2"]);
        assert!(!queue.retreat());
        assert_eq!(queue.current_index(), Some(0));
        queue.advance();
        assert!(queue.retreat());
        assert_eq!(queue.current_index(), Some(0));
    }

    #[test]
    fn test_cursor_stays_in_bounds_for_any_walk() {
        let mut queue = queue_of(&["1", "2", "3", "4"]);
        let walk = [true, true, false, true, true, true, true, false, false, false, false, false];
        for forward in walk {
            if forward {
                queue.advance();
            } else {
                queue.retreat();
            }
            let index = queue.current_index().unwrap();
            assert!(index < queue.len());
        }
    }

    #[test]
    fn test_select_first_match_wins() {
        let mut queue = queue_of(&["1", "2", "1"]);
        queue.advance();
        queue.advance();
        assert!(queue.select("1"));
        assert_eq!(queue.current_index(), Some(0));
    }

    #[test]
    fn test_select_unknown_is_noop() {
        let mut queue = queue_of(&["1", "2"]);
        queue.advance();
        assert!(!queue.select("missing"));
        assert_eq!(queue.current_index(), Some(1));

        let mut empty = Queue::new();
        assert!(!empty.select("1"));
        assert_eq!(empty.current_index(), None);
    }

    #[test]
    fn test_navigation_on_empty_queue() {
        let mut queue = Queue::new();
        assert!(!queue.advance());
        assert!(!queue.retreat());
        assert_eq!(queue.current_index(), None);
    }
}
