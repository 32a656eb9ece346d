use rand::Rng;
use tokio::time::{Duration, Instant};

/// A bag of entries waiting to be drawn
#[derive(Debug, Clone)]
pub struct Room {
    entries: Vec<String>,
    last_used: Instant,
}

impl Room {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            last_used: Instant::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Marks the room as active now
    pub fn touch(&mut self) {
        self.last_used = Instant::now();
    }

    pub fn push(&mut self, entry: String) {
        self.entries.push(entry);
    }

    /// Removes and returns a uniformly chosen entry.
    ///
    /// The remaining entries keep their relative order.
    pub fn draw_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..self.entries.len());
        Some(self.entries.remove(index))
    }

    /// How long the room has gone without activity as of `now`
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_used)
    }
}

impl Default for Room {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    fn room_with(entries: &[&str]) -> Room {
        let mut room = Room::new();
        for entry in entries {
            room.push(entry.to_string());
        }
        room
    }

    #[test]
    fn test_draw_from_empty_room() {
        let mut room = Room::new();
        assert_eq!(room.draw_with(&mut rand::thread_rng()), None);
        assert!(room.is_empty());
    }

    #[test]
    fn test_draw_preserves_order_of_remaining() {
        let mut room = room_with(&["a", "b", "c", "d", "e"]);
        let drawn = room.draw_with(&mut rand::thread_rng()).unwrap();

        let expected: Vec<&str> = ["a", "b", "c", "d", "e"]
            .into_iter()
            .filter(|e| *e != drawn)
            .collect();
        assert_eq!(room.entries(), expected.as_slice());
    }

    #[test]
    fn test_draw_first_index_keeps_tail_in_place() {
        // StepRng yielding zero always selects index 0
        let mut rng = StepRng::new(0, 0);
        let mut room = room_with(&["cat", "dog", "fish"]);

        assert_eq!(room.draw_with(&mut rng).as_deref(), Some("cat"));
        assert_eq!(room.entries(), &["dog".to_string(), "fish".to_string()]);
    }

    #[test]
    fn test_duplicates_and_empty_entries_allowed() {
        let mut room = room_with(&["", "x", "x"]);
        assert_eq!(room.len(), 3);

        let mut drawn = Vec::new();
        while let Some(entry) = room.draw_with(&mut rand::thread_rng()) {
            drawn.push(entry);
        }
        drawn.sort();
        assert_eq!(drawn, vec!["", "x", "x"]);
    }

    #[test]
    fn test_draw_is_roughly_uniform() {
        let mut counts = [0usize; 4];
        let mut rng = rand::thread_rng();
        for _ in 0..8_000 {
            let mut room = room_with(&["0", "1", "2", "3"]);
            let drawn = room.draw_with(&mut rng).unwrap();
            counts[drawn.parse::<usize>().unwrap()] += 1;
        }
        // Expected 2000 each; bounds are many standard deviations wide
        for count in counts {
            assert!((1_600..=2_400).contains(&count), "skewed counts {:?}", counts);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_for_tracks_touch() {
        let mut room = Room::new();
        tokio::time::advance(Duration::from_secs(90)).await;
        assert_eq!(room.idle_for(Instant::now()), Duration::from_secs(90));

        room.touch();
        assert_eq!(room.idle_for(Instant::now()), Duration::ZERO);
    }
}
