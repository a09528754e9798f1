use eframe::egui::{pos2, Pos2, Vec2};

/// Screen region the HUD is attached to.
///
/// The declaration order is the persisted ordinal, so it must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AnchorPoint {
    #[default]
    TopLeft,
    TopMiddle,
    TopRight,
    MiddleLeft,
    MiddleRight,
    BottomLeft,
    BottomMiddle,
    BottomRight,
}

const LOWER_THIRD: f32 = 1.0 / 3.0;
const UPPER_THIRD: f32 = 2.0 / 3.0;

impl AnchorPoint {
    pub const ALL: [AnchorPoint; 8] = [
        AnchorPoint::TopLeft,
        AnchorPoint::TopMiddle,
        AnchorPoint::TopRight,
        AnchorPoint::MiddleLeft,
        AnchorPoint::MiddleRight,
        AnchorPoint::BottomLeft,
        AnchorPoint::BottomMiddle,
        AnchorPoint::BottomRight,
    ];

    /// Normalized position of the widget centre for this anchor.
    pub fn default_offsets(self) -> Offsets {
        let (x, y) = match self {
            AnchorPoint::TopLeft => (0.0, 0.0),
            AnchorPoint::TopMiddle => (0.5, 0.0),
            AnchorPoint::TopRight => (1.0, 0.0),
            AnchorPoint::MiddleLeft => (0.0, 0.5),
            AnchorPoint::MiddleRight => (1.0, 0.5),
            AnchorPoint::BottomLeft => (0.0, 1.0),
            AnchorPoint::BottomMiddle => (0.5, 1.0),
            AnchorPoint::BottomRight => (1.0, 1.0),
        };
        Offsets { x, y }
    }

    /// Absolute top-left of a widget of `widget` size placed at this anchor.
    pub fn position(self, widget: Vec2, screen: Vec2) -> Pos2 {
        self.default_offsets().place(widget, screen)
    }

    /// Anchors on the bottom row grow upwards when the widget expands.
    pub fn is_bottom(self) -> bool {
        matches!(
            self,
            AnchorPoint::BottomLeft | AnchorPoint::BottomMiddle | AnchorPoint::BottomRight
        )
    }

    /// Map a widget centre, given as fractions of the screen size, to the
    /// anchor region containing it. First match wins.
    pub fn classify(x_percent: f32, y_percent: f32) -> AnchorPoint {
        let x = x_percent;
        let y = y_percent;
        if x < LOWER_THIRD && y < LOWER_THIRD {
            AnchorPoint::TopLeft
        } else if x < UPPER_THIRD && y < LOWER_THIRD {
            AnchorPoint::TopMiddle
        } else if y < LOWER_THIRD {
            AnchorPoint::TopRight
        } else if x < LOWER_THIRD && y < UPPER_THIRD {
            AnchorPoint::MiddleLeft
        } else if x >= UPPER_THIRD && y < UPPER_THIRD {
            AnchorPoint::MiddleRight
        } else if x < LOWER_THIRD {
            AnchorPoint::BottomLeft
        } else if x < UPPER_THIRD {
            AnchorPoint::BottomMiddle
        } else {
            AnchorPoint::BottomRight
        }
    }
}

impl std::fmt::Display for AnchorPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AnchorPoint::TopLeft => "Top Left",
            AnchorPoint::TopMiddle => "Top Middle",
            AnchorPoint::TopRight => "Top Right",
            AnchorPoint::MiddleLeft => "Middle Left",
            AnchorPoint::MiddleRight => "Middle Right",
            AnchorPoint::BottomLeft => "Bottom Left",
            AnchorPoint::BottomMiddle => "Bottom Middle",
            AnchorPoint::BottomRight => "Bottom Right",
        };
        write!(f, "{label}")
    }
}

/// Widget centre expressed as fractions of the screen width and height.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Offsets {
    pub x: f32,
    pub y: f32,
}

impl Offsets {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Top-left position that centres the widget on these offsets while
    /// keeping it fully on screen.
    pub fn place(self, widget: Vec2, screen: Vec2) -> Pos2 {
        let x = self.x * screen.x - widget.x / 2.0;
        let y = self.y * screen.y - widget.y / 2.0;
        clamp_to_screen(pos2(x, y), widget, screen)
    }

    /// True when either component moved by more than `epsilon`.
    pub fn differs_from(self, other: Offsets, epsilon: f32) -> bool {
        (self.x - other.x).abs() > epsilon || (self.y - other.y).abs() > epsilon
    }
}

/// Clamp a top-left position so a widget of `widget` size stays inside the
/// screen. A widget larger than the screen is pinned to the origin.
pub fn clamp_to_screen(pos: Pos2, widget: Vec2, screen: Vec2) -> Pos2 {
    let max_x = (screen.x - widget.x).max(0.0);
    let max_y = (screen.y - widget.y).max(0.0);
    let x = if pos.x.is_nan() { 0.0 } else { pos.x.clamp(0.0, max_x) };
    let y = if pos.y.is_nan() { 0.0 } else { pos.y.clamp(0.0, max_y) };
    pos2(x, y)
}
