/// Minimum horizontal travel, in pixels, for a touch to count as a swipe.
pub const DEFAULT_SWIPE_THRESHOLD: f32 = 50.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Swipe {
    Left,
    Right,
}

/// Tracks one touch from start to end and classifies it.
#[derive(Clone, Copy, Debug)]
pub struct SwipeDetector {
    threshold: f32,
    start: [f32; 2],
}

impl Default for SwipeDetector {
    fn default() -> Self {
        Self::new(DEFAULT_SWIPE_THRESHOLD)
    }
}

impl SwipeDetector {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            start: [0.0; 2],
        }
    }

    pub fn touch_start(&mut self, x: f32, y: f32) {
        self.start = [x, y];
    }

    pub fn touch_end(&self, x: f32, y: f32) -> Option<Swipe> {
        classify_swipe(x - self.start[0], y - self.start[1], self.threshold)
    }
}

/// A mostly-horizontal movement longer than `threshold` is a swipe.
pub fn classify_swipe(dx: f32, dy: f32, threshold: f32) -> Option<Swipe> {
    if dx.abs() <= dy.abs() || dx.abs() <= threshold {
        return None;
    }
    if dx > 0.0 { Some(Swipe::Right) } else { Some(Swipe::Left) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_horizontal_swipes() {
        assert_eq!(classify_swipe(80.0, 10.0, 50.0), Some(Swipe::Right));
        assert_eq!(classify_swipe(-80.0, 10.0, 50.0), Some(Swipe::Left));
        assert_eq!(classify_swipe(50.0, 0.0, 50.0), None);
        assert_eq!(classify_swipe(80.0, -90.0, 50.0), None);
    }

    #[test]
    fn detector_measures_from_touch_start() {
        let mut detector = SwipeDetector::default();
        detector.touch_start(200.0, 100.0);
        assert_eq!(detector.touch_end(120.0, 110.0), Some(Swipe::Left));
        assert_eq!(detector.touch_end(230.0, 100.0), None);
    }
}
