use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

pub const MAX_CHANNEL: u8 = u8::MAX;

/// Four 8-bit light channels (red, green, blue, sky) packed into one `u32`.
///
/// Light contributions are only ever merged with [`BlockBrightness::max`]; a
/// merge can raise a channel but never lower it.
#[repr(transparent)]
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
#[serde(from = "[u8; 4]", into = "[u8; 4]")]
pub struct BlockBrightness(u32);

impl BlockBrightness {
    pub const DARK: Self = Self(0);
    pub const FULL: Self = Self(u32::MAX);

    pub const fn new(red: u8, green: u8, blue: u8, sky: u8) -> Self {
        Self(u32::from_le_bytes([red, green, blue, sky]))
    }

    pub const fn uniform(level: u8) -> Self {
        Self::new(level, level, level, level)
    }

    pub const fn from_packed(packed: u32) -> Self {
        Self(packed)
    }

    pub const fn packed(self) -> u32 {
        self.0
    }

    pub const fn channels(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    pub const fn red(self) -> u8 {
        self.channels()[0]
    }

    pub const fn green(self) -> u8 {
        self.channels()[1]
    }

    pub const fn blue(self) -> u8 {
        self.channels()[2]
    }

    pub const fn sky(self) -> u8 {
        self.channels()[3]
    }

    pub fn with_sky(self, sky: u8) -> Self {
        let [r, g, b, _] = self.channels();
        Self::new(r, g, b, sky)
    }

    pub fn is_dark(self) -> bool {
        self.0 == 0
    }

    /// Component-wise maximum.
    pub fn max(self, other: Self) -> Self {
        self.zip_with(other, u8::max)
    }

    /// Subtracts `by` from every channel, flooring at zero.
    pub fn attenuate(self, by: Self) -> Self {
        self.zip_with(by, u8::saturating_sub)
    }

    /// True when no channel of `self` is below the matching channel of `other`.
    pub fn dominates(self, other: Self) -> bool {
        self.channels()
            .iter()
            .zip(other.channels())
            .all(|(lhs, rhs)| *lhs >= rhs)
    }

    fn zip_with(self, other: Self, op: impl Fn(u8, u8) -> u8) -> Self {
        let lhs = self.channels();
        let rhs = other.channels();
        Self::new(
            op(lhs[0], rhs[0]),
            op(lhs[1], rhs[1]),
            op(lhs[2], rhs[2]),
            op(lhs[3], rhs[3]),
        )
    }
}

impl From<[u8; 4]> for BlockBrightness {
    fn from(channels: [u8; 4]) -> Self {
        Self::new(channels[0], channels[1], channels[2], channels[3])
    }
}

impl From<BlockBrightness> for [u8; 4] {
    fn from(brightness: BlockBrightness) -> Self {
        brightness.channels()
    }
}

#[cfg(test)]
mod tests {
    use super::BlockBrightness;

    #[test]
    fn channels_pack_into_a_single_word() {
        let brightness = BlockBrightness::new(1, 2, 3, 4);
        assert_eq!(brightness.red(), 1);
        assert_eq!(brightness.green(), 2);
        assert_eq!(brightness.blue(), 3);
        assert_eq!(brightness.sky(), 4);
        assert_eq!(brightness.packed(), 0x0403_0201);
        assert_eq!(std::mem::size_of::<BlockBrightness>(), 4);
    }

    #[test]
    fn max_is_component_wise() {
        let a = BlockBrightness::new(200, 0, 50, 10);
        let b = BlockBrightness::new(100, 30, 60, 0);
        assert_eq!(a.max(b), BlockBrightness::new(200, 30, 60, 10));
        assert!(a.max(b).dominates(a));
        assert!(a.max(b).dominates(b));
    }

    #[test]
    fn attenuation_floors_at_zero() {
        let light = BlockBrightness::new(10, 200, 0, 255);
        let attenuated = light.attenuate(BlockBrightness::uniform(17));
        assert_eq!(attenuated, BlockBrightness::new(0, 183, 0, 238));
        assert_eq!(
            light.attenuate(BlockBrightness::FULL),
            BlockBrightness::DARK
        );
    }

    #[test]
    fn deserializes_from_channel_array() {
        #[derive(serde::Deserialize)]
        struct Holder {
            light: BlockBrightness,
        }

        let holder: Holder = toml::from_str("light = [255, 128, 0, 0]").expect("valid toml");
        assert_eq!(holder.light, BlockBrightness::new(255, 128, 0, 0));
    }
}
