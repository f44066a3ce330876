//! Named signal buses shared by every Tone in a synth.
//!
//! Sticky channels hold their value until written again; non-sticky ones are
//! zeroed at the start of every sample. Ids are stable for the lifetime of
//! the bank, so Tones resolve names once and index afterwards.

use std::collections::HashMap;

use crate::matrix::Matrix;

#[derive(Debug, Clone)]
struct Channel {
    value: Matrix,
    sticky: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Channels {
    channels: Vec<Channel>,
    by_name: HashMap<String, usize>,
}

impl Channels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `name`, or change its stickiness if it already exists.
    pub fn setup(&mut self, name: &str, sticky: bool) -> usize {
        let id = self.resolve(name);
        self.channels[id].sticky = sticky;
        id
    }

    /// Id of `name`, creating a non-sticky channel on first use.
    pub fn resolve(&mut self, name: &str) -> usize {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = self.channels.len();
        self.channels.push(Channel {
            value: Matrix::scalar(0.0),
            sticky: false,
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn id(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    #[inline]
    pub fn get(&self, id: usize) -> &Matrix {
        &self.channels[id].value
    }

    #[inline]
    pub fn put(&mut self, id: usize, value: &Matrix) {
        self.channels[id].value.copy_from(value);
    }

    /// Store a stereo frame.
    #[inline]
    pub fn put_stereo(&mut self, id: usize, frame: [f32; 2]) {
        let value = &mut self.channels[id].value;
        value.resize(2, 1);
        value.put(0, 0, frame[0]);
        value.put(1, 0, frame[1]);
    }

    /// Start-of-sample reset for non-sticky channels.
    #[inline]
    pub fn update(&mut self) {
        for channel in &mut self.channels {
            if !channel.sticky {
                channel.value.fill(0.0);
            }
        }
    }

    /// Zero every channel, sticky or not. Ids stay valid.
    pub fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.value.set_scalar(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_sticky_channels_reset_each_sample() {
        let mut channels = Channels::new();
        let bus = channels.resolve("bus");
        let held = channels.setup("held", true);
        channels.put(bus, &Matrix::scalar(3.0));
        channels.put(held, &Matrix::scalar(4.0));
        channels.update();
        assert_eq!(channels.get(bus).to_scalar(), 0.0);
        assert_eq!(channels.get(held).to_scalar(), 4.0);
    }

    #[test]
    fn ids_are_stable() {
        let mut channels = Channels::new();
        let a = channels.resolve("a");
        let b = channels.setup("b", true);
        assert_eq!(channels.resolve("a"), a);
        assert_eq!(channels.setup("b", false), b);
        assert_eq!(channels.id("b"), Some(b));
        assert_eq!(channels.id("c"), None);
    }

    #[test]
    fn stereo_frames_keep_both_sides() {
        let mut channels = Channels::new();
        let id = channels.setup("lead", true);
        channels.put_stereo(id, [0.25, -0.5]);
        assert_eq!(channels.get(id).as_stereo(), [0.25, -0.5]);
    }
}
