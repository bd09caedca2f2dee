//! Debug overlay written once per frame for visualisation.
//!
//! Same three channels as the [`WorldMap`](crate::world_map::WorldMap)
//! (obstacle → red, target → green, navigable → blue), but sized like the
//! rectified frame and fully overwritten on every step rather than
//! accumulated.

use rover_types::BinaryMask;

use crate::world_map::Channel;

/// Value written for a lit mask pixel.
pub const FULL_INTENSITY: u8 = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugOverlay {
    pub width: usize,
    pub height: usize,
    /// Row-major, three bytes per pixel in [`Channel`] order.
    pub data: Vec<u8>,
}

impl DebugOverlay {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height * 3],
        }
    }

    #[inline]
    pub fn get(&self, channel: Channel, col: usize, row: usize) -> u8 {
        self.data[(row * self.width + col) * 3 + channel.index()]
    }

    /// Overwrite `channel` with `mask` scaled to [`FULL_INTENSITY`].
    pub fn write_mask(&mut self, channel: Channel, mask: &BinaryMask) {
        debug_assert_eq!((mask.width, mask.height), (self.width, self.height));
        for (px, &m) in self.data.chunks_exact_mut(3).zip(mask.data.iter()) {
            px[channel.index()] = if m != 0 { FULL_INTENSITY } else { 0 };
        }
    }

    /// Zero `channel` across the whole overlay.
    pub fn clear_channel(&mut self, channel: Channel) {
        for px in self.data.chunks_exact_mut(3) {
            px[channel.index()] = 0;
        }
    }

    /// Number of pixels where `channel` is lit.
    pub fn lit_count(&self, channel: Channel) -> usize {
        self.data
            .chunks_exact(3)
            .filter(|px| px[channel.index()] != 0)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_mask_overwrites_only_its_channel() {
        let mut overlay = DebugOverlay::new(4, 2);
        overlay.data.fill(7);
        let mask = BinaryMask::from_fn(4, 2, |col, _| col < 2);
        overlay.write_mask(Channel::Navigable, &mask);

        assert_eq!(overlay.get(Channel::Navigable, 0, 0), FULL_INTENSITY);
        assert_eq!(overlay.get(Channel::Navigable, 3, 1), 0);
        assert_eq!(overlay.get(Channel::Obstacle, 3, 1), 7);
        assert_eq!(overlay.lit_count(Channel::Navigable), 4);
    }

    #[test]
    fn clear_channel_zeroes_it() {
        let mut overlay = DebugOverlay::new(3, 3);
        overlay.write_mask(Channel::Target, &BinaryMask::from_fn(3, 3, |_, _| true));
        overlay.clear_channel(Channel::Target);
        assert_eq!(overlay.lit_count(Channel::Target), 0);
    }
}
