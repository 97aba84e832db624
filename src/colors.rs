//! The color ramp: an ordered set of keyframes, each mapping a closed
//! sub-interval of [0, 1] to a pair of colors, interpolated per
//! channel.  The interpolation factor is the raw lookup value, not a
//! position within the matched keyframe's sub-interval; an unusual
//! choice, but an intentional one, since renormalizing per keyframe
//! changes every image produced with multi-keyframe ramps.

use num::clamp;

use crate::errors::EngineError;

/// An RGBA color with 8 bits per channel.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha; 255 is opaque.
    pub a: u8,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    /// An opaque color from its three channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 255 }
    }

    /// A color from all four channels.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }
}

/// One interval of a ramp: the closed range `[interval_start,
/// interval_end]` maps onto a start and end color.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Keyframe {
    /// Lower bound of the interval, inclusive.
    pub interval_start: f64,
    /// Upper bound of the interval, inclusive.
    pub interval_end: f64,
    /// The color at the start of the interval.
    pub color_start: Color,
    /// The color at the end of the interval.
    pub color_end: Color,
}

impl Keyframe {
    /// Constructor.
    pub fn new(interval_start: f64, interval_end: f64, color_start: Color, color_end: Color) -> Self {
        Keyframe {
            interval_start,
            interval_end,
            color_start,
            color_end,
        }
    }

    /// Whether `value` falls inside this keyframe's closed interval.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.interval_start && value <= self.interval_end
    }
}

/// An ordered sequence of keyframes.  Callers must supply keyframes
/// that collectively cover [0, 1]; on a boundary shared by two
/// keyframes, the one inserted first wins.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColorRamp {
    keyframes: Vec<Keyframe>,
}

impl ColorRamp {
    /// A ramp over the given keyframes, in insertion order.
    pub fn new(keyframes: Vec<Keyframe>) -> Self {
        ColorRamp { keyframes }
    }

    /// Whether the ramp has no keyframes at all.
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// The keyframes, in insertion order.
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Maps a value in [0, 1] to a color.  Out-of-range values are
    /// clamped before lookup.  Fails with a lookup error when no
    /// keyframe contains the clamped value, which means the ramp does
    /// not actually cover [0, 1].
    pub fn interpolate(&self, value: f64) -> Result<Color, EngineError> {
        let value = clamp(value, 0.0, 1.0);
        let frame = self
            .keyframes
            .iter()
            .find(|frame| frame.contains(value))
            .ok_or(EngineError::Lookup(value))?;
        Ok(Color {
            r: blend(frame.color_start.r, frame.color_end.r, value),
            g: blend(frame.color_start.g, frame.color_end.g, value),
            b: blend(frame.color_start.b, frame.color_end.b, value),
            a: blend(frame.color_start.a, frame.color_end.a, value),
        })
    }
}

/// One channel of the interpolation: the channel delta scaled by the
/// raw lookup value, rounded, offset by the start channel, clamped to
/// the representable range.
fn blend(start: u8, end: u8, value: f64) -> u8 {
    let delta = ((f64::from(end) - f64::from(start)) * value).round();
    clamp(delta + f64::from(start), 0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_part_ramp() -> ColorRamp {
        ColorRamp::new(vec![
            Keyframe::new(0.0, 0.5, Color::rgb(0, 0, 0), Color::rgb(100, 100, 100)),
            Keyframe::new(0.5, 1.0, Color::rgb(100, 100, 100), Color::rgb(200, 255, 0)),
        ])
    }

    #[test]
    fn endpoints_hit_the_outer_keyframe_colors() {
        let ramp = two_part_ramp();
        assert_eq!(ramp.interpolate(0.0).unwrap(), Color::rgb(0, 0, 0));
        assert_eq!(ramp.interpolate(1.0).unwrap(), Color::rgb(200, 255, 0));
    }

    #[test]
    fn out_of_range_values_are_clamped_first() {
        let ramp = two_part_ramp();
        assert_eq!(ramp.interpolate(-3.0).unwrap(), ramp.interpolate(0.0).unwrap());
        assert_eq!(ramp.interpolate(42.0).unwrap(), ramp.interpolate(1.0).unwrap());
    }

    #[test]
    fn channel_formula_uses_the_raw_value() {
        let ramp = ColorRamp::new(vec![Keyframe::new(
            0.0,
            1.0,
            Color::rgb(10, 0, 255),
            Color::rgb(20, 0, 255),
        )]);
        // round((20 - 10) * 0.5) + 10 = 15
        assert_eq!(ramp.interpolate(0.5).unwrap().r, 15);
    }

    #[test]
    fn shared_boundary_goes_to_the_first_keyframe() {
        let ramp = two_part_ramp();
        // 0.5 is inside both keyframes; insertion order breaks the tie.
        // First keyframe at 0.5: round((100 - 0) * 0.5) + 0 = 50.
        assert_eq!(ramp.interpolate(0.5).unwrap(), Color::rgb(50, 50, 50));
    }

    #[test]
    fn a_gap_in_coverage_is_a_lookup_error() {
        let ramp = ColorRamp::new(vec![Keyframe::new(
            0.0,
            0.25,
            Color::BLACK,
            Color::WHITE,
        )]);
        match ramp.interpolate(0.75) {
            Err(EngineError::Lookup(value)) => assert_eq!(value, 0.75),
            other => panic!("expected a lookup error, got {:?}", other),
        }
    }

    #[test]
    fn descending_channels_interpolate_downward() {
        let ramp = ColorRamp::new(vec![Keyframe::new(
            0.0,
            1.0,
            Color::rgb(200, 0, 0),
            Color::rgb(0, 0, 0),
        )]);
        // round((0 - 200) * 0.25) + 200 = 150
        assert_eq!(ramp.interpolate(0.25).unwrap().r, 150);
    }

    #[test]
    fn alpha_interpolates_like_any_other_channel() {
        let ramp = ColorRamp::new(vec![Keyframe::new(
            0.0,
            1.0,
            Color::rgba(0, 0, 0, 0),
            Color::rgba(0, 0, 0, 200),
        )]);
        assert_eq!(ramp.interpolate(0.5).unwrap().a, 100);
    }
}
