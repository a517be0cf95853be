//! Procedural "yes" (nod) and "no" (shake) head gestures, stepped once per
//! rendered frame, with a pointer-follow pose in between.

use std::f32::consts::PI;

use tracing::debug;

const NOD_SPEED: f32 = 0.08;
const NOD_AMPLITUDE: f32 = 0.5;
const SHAKE_SPEED: f32 = 0.10;
const SHAKE_AMPLITUDE: f32 = 0.7;
const SHAKE_LIMIT: f32 = PI / 3.0;
const POINTER_TILT: f32 = 0.2;
/// Full swings per gesture.
const SWINGS: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "bin", derive(clap::ValueEnum))]
pub enum Gesture {
    Nod,
    Shake,
}

/// Model group rotation in radians.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rotation {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Debug)]
struct Swing {
    angle: f32,
    direction: f32,
    count: u32,
}

impl Default for Swing {
    fn default() -> Self {
        Self {
            angle: 0.0,
            direction: 1.0,
            count: 0,
        }
    }
}

impl Swing {
    /// Advance one frame, flipping direction outside `(low, high)`. Returns
    /// true once enough half-swings have been made.
    fn advance(&mut self, speed: f32, low: f32, high: f32) -> bool {
        self.angle += speed * self.direction;
        if self.angle > high {
            self.direction = -1.0;
            self.count += 1;
        }
        if self.angle < low {
            self.direction = 1.0;
            self.count += 1;
        }
        self.count >= SWINGS * 2
    }
}

#[derive(Clone, Debug, Default)]
pub struct GestureAnimator {
    nod: Option<Swing>,
    shake: Option<Swing>,
    pointer: [f32; 2],
    rotation: Rotation,
}

impl GestureAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `gesture`. Restarting one already in progress is a no-op.
    pub fn trigger(&mut self, gesture: Gesture) {
        let slot = match gesture {
            Gesture::Nod => &mut self.nod,
            Gesture::Shake => &mut self.shake,
        };
        if slot.is_none() {
            debug!("starting {gesture:?}");
            *slot = Some(Swing::default());
        }
    }

    pub fn is_active(&self, gesture: Gesture) -> bool {
        match gesture {
            Gesture::Nod => self.nod.is_some(),
            Gesture::Shake => self.shake.is_some(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.nod.is_none() && self.shake.is_none()
    }

    /// Normalized pointer position, each axis in `[-1, 1]`.
    pub fn set_pointer(&mut self, x: f32, y: f32) {
        self.pointer = [x, y];
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Advance one frame. A nod takes priority over a pending shake.
    pub fn step(&mut self) -> Rotation {
        if let Some(nod) = &mut self.nod {
            let done = nod.advance(NOD_SPEED, 0.0, PI / 2.0);
            self.rotation.x = nod.angle.sin() * NOD_AMPLITUDE;
            if done {
                debug!("nod finished");
                self.nod = None;
                self.rotation.x = self.pointer[1] * POINTER_TILT;
            }
        } else if let Some(shake) = &mut self.shake {
            let done = shake.advance(SHAKE_SPEED, -SHAKE_LIMIT, SHAKE_LIMIT);
            self.rotation.y = shake.angle.sin() * SHAKE_AMPLITUDE;
            if done {
                debug!("shake finished");
                self.shake = None;
                self.rotation.y = 0.0;
            }
        } else {
            self.rotation = Rotation {
                x: self.pointer[1] * POINTER_TILT,
                y: 0.0,
            };
        }
        self.rotation
    }

    /// Trigger `gesture` and step until it finishes, or `max_frames` pass.
    pub fn run(&mut self, gesture: Gesture, max_frames: usize) -> Vec<Rotation> {
        self.trigger(gesture);
        let mut frames = Vec::new();
        while self.is_active(gesture) && frames.len() < max_frames {
            frames.push(self.step());
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_follows_pointer() {
        let mut anim = GestureAnimator::new();
        anim.set_pointer(0.3, -0.5);
        assert_eq!(anim.step(), Rotation { x: -0.1, y: 0.0 });
    }

    #[test]
    fn nod_runs_two_swings_then_returns_to_pointer() {
        let mut anim = GestureAnimator::new();
        anim.set_pointer(0.0, 0.5);
        let frames = anim.run(Gesture::Nod, 1000);

        assert!(anim.is_idle());
        assert!(frames.len() > 70 && frames.len() < 100, "{}", frames.len());
        let peak = frames.iter().map(|r| r.x).fold(f32::MIN, f32::max);
        assert!(peak <= NOD_AMPLITUDE && peak > 0.49);
        assert!(frames.iter().all(|r| r.y == 0.0));
        assert_eq!(frames.last().map(|r| r.x), Some(0.5 * POINTER_TILT));
    }

    #[test]
    fn shake_swings_both_ways_and_resets() {
        let mut anim = GestureAnimator::new();
        let frames = anim.run(Gesture::Shake, 1000);

        assert!(anim.is_idle());
        assert!(frames.iter().any(|r| r.y > 0.6));
        assert!(frames.iter().any(|r| r.y < -0.6));
        assert_eq!(frames.last().map(|r| r.y), Some(0.0));
    }

    #[test]
    fn nod_takes_priority() {
        let mut anim = GestureAnimator::new();
        anim.trigger(Gesture::Shake);
        anim.trigger(Gesture::Nod);

        anim.step();
        assert!(anim.rotation().x > 0.0);
        assert_eq!(anim.rotation().y, 0.0);

        let nod_frames = anim.run(Gesture::Nod, 1000);
        assert!(!nod_frames.is_empty());
        assert!(anim.is_active(Gesture::Shake));
        anim.step();
        assert!(anim.rotation().y > 0.0);
    }
}
