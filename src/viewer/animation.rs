use tracing::debug;

/// Playback state for one clip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClipState {
    pub name: String,
    pub running: bool,
    pub paused: bool,
}

/// Which animation clip is playing, and whether it is paused.
///
/// At most one clip runs at a time. The first clip starts automatically as
/// soon as the clip list is known.
#[derive(Clone, Debug, Default)]
pub struct AnimationController {
    clips: Vec<ClipState>,
    current: Option<usize>,
    playing: bool,
}

impl AnimationController {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        let mut controller = Self {
            clips: names
                .into_iter()
                .map(|name| ClipState {
                    name: name.into(),
                    running: false,
                    paused: false,
                })
                .collect(),
            current: None,
            playing: true,
        };
        if !controller.clips.is_empty() {
            controller.play_index(0);
        }
        controller
    }

    pub fn clips(&self) -> &[ClipState] {
        &self.clips
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.clips.iter().map(|c| c.name.as_str())
    }

    pub fn current(&self) -> Option<&str> {
        self.current.map(|i| self.clips[i].name.as_str())
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Stop every other clip and play `name`. Unknown names are ignored.
    pub fn select(&mut self, name: &str) -> bool {
        match self.clips.iter().position(|c| c.name == name) {
            Some(index) => {
                self.play_index(index);
                true
            }
            None => {
                debug!("ignoring unknown animation clip {name:?}");
                false
            }
        }
    }

    /// Flip between playing and paused. Returns the new playing state.
    pub fn toggle_play(&mut self) -> bool {
        self.playing = !self.playing;
        if let Some(index) = self.current {
            self.clips[index].paused = !self.playing;
        }
        self.playing
    }

    fn play_index(&mut self, index: usize) {
        for clip in &mut self.clips {
            clip.running = false;
            clip.paused = false;
        }
        let clip = &mut self.clips[index];
        clip.running = true;
        clip.paused = !self.playing;
        self.current = Some(index);
        debug!("playing animation clip {:?}", clip.name);
    }
}
