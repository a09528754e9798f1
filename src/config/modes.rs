use crate::anchor::AnchorPoint;
use crate::playback::PlaybackState;

/// Enumerated setting persisted by its zero-based position in `VARIANTS`.
pub trait Ordinal: Copy + PartialEq + std::fmt::Debug + 'static {
    const VARIANTS: &'static [Self];

    fn ordinal(self) -> i64 {
        Self::VARIANTS
            .iter()
            .position(|v| *v == self)
            .unwrap_or(0) as i64
    }

    /// Look up the variant for `ordinal`, clamping out-of-range input.
    fn from_ordinal(ordinal: i64) -> Self {
        Self::VARIANTS[clamp_ordinal::<Self>(ordinal) as usize]
    }
}

/// Clamp `ordinal` into `[0, N-1]` for the enumeration `T`.
pub fn clamp_ordinal<T: Ordinal>(ordinal: i64) -> i64 {
    let max = T::VARIANTS.len().saturating_sub(1) as i64;
    ordinal.clamp(0, max)
}

impl Ordinal for AnchorPoint {
    const VARIANTS: &'static [Self] = &AnchorPoint::ALL;
}

/// What the link button does with the current song link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkMode {
    #[default]
    Open,
    Copy,
}

impl Ordinal for LinkMode {
    const VARIANTS: &'static [Self] = &[LinkMode::Open, LinkMode::Copy];
}

impl std::fmt::Display for LinkMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkMode::Open => write!(f, "Open"),
            LinkMode::Copy => write!(f, "Copy"),
        }
    }
}

/// Host screen the HUD would be drawn over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenKind {
    /// No screen open, plain gameplay view.
    Game,
    Chat,
    /// Any other menu or inventory screen.
    Menu,
}

/// Which host screens the HUD renders over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderType {
    #[default]
    NonIntrusive,
    Always,
    GameOnly,
}

impl Ordinal for RenderType {
    const VARIANTS: &'static [Self] = &[
        RenderType::NonIntrusive,
        RenderType::Always,
        RenderType::GameOnly,
    ];
}

impl RenderType {
    pub fn can_render(self, screen: ScreenKind) -> bool {
        match self {
            RenderType::NonIntrusive => matches!(screen, ScreenKind::Game | ScreenKind::Chat),
            RenderType::Always => true,
            RenderType::GameOnly => screen == ScreenKind::Game,
        }
    }
}

impl std::fmt::Display for RenderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderType::NonIntrusive => write!(f, "Non Intrusive"),
            RenderType::Always => write!(f, "Always"),
            RenderType::GameOnly => write!(f, "Game Only"),
        }
    }
}

/// Which playback states make the HUD visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    WhenSongFound,
    WhenPlaying,
    Always,
}

impl Ordinal for DisplayMode {
    const VARIANTS: &'static [Self] = &[
        DisplayMode::WhenSongFound,
        DisplayMode::WhenPlaying,
        DisplayMode::Always,
    ];
}

impl DisplayMode {
    pub fn can_display(self, state: Option<&PlaybackState>) -> bool {
        match self {
            DisplayMode::WhenSongFound => state.is_some_and(|s| s.has_song()),
            DisplayMode::WhenPlaying => state.is_some_and(|s| s.has_song() && s.is_playing),
            DisplayMode::Always => true,
        }
    }
}

impl std::fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisplayMode::WhenSongFound => write!(f, "When Song Found"),
            DisplayMode::WhenPlaying => write!(f, "When Playing"),
            DisplayMode::Always => write!(f, "Always"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_follow_declaration_order() {
        assert_eq!(AnchorPoint::BottomRight.ordinal(), 7);
        assert_eq!(RenderType::GameOnly.ordinal(), 2);
        assert_eq!(LinkMode::from_ordinal(1), LinkMode::Copy);
    }

    #[test]
    fn from_ordinal_clamps() {
        assert_eq!(AnchorPoint::from_ordinal(-4), AnchorPoint::TopLeft);
        assert_eq!(AnchorPoint::from_ordinal(99), AnchorPoint::BottomRight);
        assert_eq!(DisplayMode::from_ordinal(i64::MAX), DisplayMode::Always);
    }

    #[test]
    fn non_intrusive_skips_menus() {
        assert!(RenderType::NonIntrusive.can_render(ScreenKind::Chat));
        assert!(!RenderType::NonIntrusive.can_render(ScreenKind::Menu));
        assert!(!RenderType::GameOnly.can_render(ScreenKind::Chat));
    }
}
