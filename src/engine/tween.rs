// Declarative animation timelines.
//
// A Timeline is a list of interpolation segments, each writing one channel
// over [start, start + duration), advanced by a single time cursor. Yoyo
// segments play forward then mirror back over a second `duration`, so they
// occupy 2 × duration on the timeline.

/// Animated quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    PositionX,
    PositionY,
    PositionZ,
    Yaw,
    /// Additive vertical offset layered over PositionY.
    OffsetY,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ease {
    Linear,
    /// `1 - (1 - t)^2`, fast start and soft landing.
    QuadOut,
}

impl Ease {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::QuadOut => 1.0 - (1.0 - t) * (1.0 - t),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub channel:  Channel,
    pub from:     f32,
    pub to:       f32,
    pub start:    f32,
    pub duration: f32,
    pub ease:     Ease,
    pub yoyo:     bool,
}

impl Segment {
    pub fn new(channel: Channel, from: f32, to: f32, start: f32, duration: f32) -> Self {
        Self { channel, from, to, start, duration, ease: Ease::QuadOut, yoyo: false }
    }

    pub fn with_ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }

    pub fn yoyo(mut self) -> Self {
        self.yoyo = true;
        self
    }

    pub fn end(&self) -> f32 {
        self.start + if self.yoyo { 2.0 * self.duration } else { self.duration }
    }

    /// Value at absolute timeline time `t`. Before the segment starts this is
    /// `from`; after it ends it is the resting value (`to`, or `from` for yoyo).
    pub fn value_at(&self, t: f32) -> f32 {
        let local = t - self.start;
        if self.duration <= 0.0 {
            return if self.yoyo { self.from } else { self.to };
        }
        let progress = if self.yoyo {
            if local <= self.duration {
                local / self.duration
            } else {
                // Mirror: same ease played backwards.
                1.0 - (local - self.duration) / self.duration
            }
        } else {
            local / self.duration
        };
        let k = self.ease.apply(progress);
        self.from + (self.to - self.from) * k
    }
}

/// Segments sharing one cursor.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    segments: Vec<Segment>,
    cursor:   f32,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, segment: Segment) -> &mut Self {
        self.segments.push(segment);
        self
    }

    pub fn duration(&self) -> f32 {
        self.segments.iter().map(Segment::end).fold(0.0, f32::max)
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.duration()
    }

    /// Move the cursor forward, clamped to the timeline end.
    pub fn advance(&mut self, dt: f32) {
        self.cursor = (self.cursor + dt.max(0.0)).min(self.duration());
    }

    /// Current value of an absolute channel: the last segment on that channel
    /// that has started wins. `None` if no segment drives it yet.
    pub fn sample(&self, channel: Channel) -> Option<f32> {
        self.segments
            .iter()
            .filter(|s| s.channel == channel && s.start <= self.cursor)
            .last()
            .map(|s| s.value_at(self.cursor))
    }

    /// Sum of all segments on an additive channel (0 when none are active).
    pub fn sample_additive(&self, channel: Channel) -> f32 {
        self.segments
            .iter()
            .filter(|s| s.channel == channel && s.start <= self.cursor)
            .map(|s| s.value_at(self.cursor))
            .sum()
    }
}

/// Wrap an angle into (-π, π].
pub fn wrap_angle(a: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let wrapped = (a + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI { wrapped + TAU } else { wrapped }
}

/// Signed shortest rotation from `from` to `to`, in (-π, π].
pub fn shortest_angle_delta(from: f32, to: f32) -> f32 {
    wrap_angle(to - from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn quad_out_hits_endpoints() {
        assert_eq!(Ease::QuadOut.apply(0.0), 0.0);
        assert_eq!(Ease::QuadOut.apply(1.0), 1.0);
        assert!(Ease::QuadOut.apply(0.5) > 0.5);
    }

    #[test]
    fn yoyo_returns_to_start() {
        let s = Segment::new(Channel::OffsetY, 0.0, 1.0, 0.0, 0.1).yoyo();
        assert!((s.end() - 0.2).abs() < 1e-6);
        assert!((s.value_at(0.1) - 1.0).abs() < 1e-6);
        assert!(s.value_at(0.2).abs() < 1e-6);
        assert!((s.value_at(0.05) - s.value_at(0.15)).abs() < 1e-5, "yoyo should be symmetric");
    }

    #[test]
    fn timeline_clamps_and_finishes() {
        let mut tl = Timeline::new();
        tl.push(Segment::new(Channel::PositionX, 0.0, 3.0, 0.0, 0.2).with_ease(Ease::Linear));
        tl.advance(0.1);
        assert!((tl.sample(Channel::PositionX).unwrap() - 1.5).abs() < 1e-5);
        assert!(!tl.is_finished());
        tl.advance(10.0);
        assert!(tl.is_finished());
        assert!((tl.sample(Channel::PositionX).unwrap() - 3.0).abs() < 1e-6);
        assert_eq!(tl.sample(Channel::PositionZ), None);
    }

    #[test]
    fn additive_channels_sum() {
        let mut tl = Timeline::new();
        tl.push(Segment::new(Channel::OffsetY, 0.0, 1.0, 0.0, 1.0).with_ease(Ease::Linear));
        tl.push(Segment::new(Channel::OffsetY, 0.0, 2.0, 0.0, 1.0).with_ease(Ease::Linear));
        tl.advance(0.5);
        assert!((tl.sample_additive(Channel::OffsetY) - 1.5).abs() < 1e-5);
    }

    #[test]
    fn wrap_angle_range() {
        assert!((wrap_angle(PI) - PI).abs() < 1e-6);
        assert!((wrap_angle(-PI) - PI).abs() < 1e-6);
        assert!((wrap_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-5);
        assert!(wrap_angle(4.0 * PI).abs() < 1e-5);
    }

    #[test]
    fn shortest_delta_crosses_the_seam() {
        let d = shortest_angle_delta(3.0, -3.0);
        assert!(d > 0.0, "expected positive delta through π, got {d}");
        assert!((d - (2.0 * PI - 6.0)).abs() < 1e-5);
    }
}
