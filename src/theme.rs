//! Nord color theme for the pipeline viewer
//!
//! Based on the Nord color palette: https://www.nordtheme.com/

use ratatui::style::Color;

/// Nord Polar Night - Background colors
pub mod polar_night {
    use super::Color;

    /// nord1 - Lighter background (status bars)
    pub const NORD1: Color = Color::Rgb(59, 66, 82);
    /// nord3 - Brightest background (borders, subtle elements)
    pub const NORD3: Color = Color::Rgb(76, 86, 106);
}

/// Nord Snow Storm - Text colors
pub mod snow_storm {
    use super::Color;

    /// nord4 - Primary text
    pub const NORD4: Color = Color::Rgb(216, 222, 233);
    /// nord6 - Bright white, emphasized text
    pub const NORD6: Color = Color::Rgb(236, 239, 244);
}

/// Nord Frost - Accent colors (blues and cyan)
pub mod frost {
    use super::Color;

    /// nord8 - Bright cyan (titles)
    pub const NORD8: Color = Color::Rgb(136, 192, 208);
    /// nord9 - Blue (running)
    pub const NORD9: Color = Color::Rgb(129, 161, 193);
}

/// Nord Aurora - Accent colors (semantic colors)
pub mod aurora {
    use super::Color;

    /// nord11 - Red (errors, failed)
    pub const NORD11: Color = Color::Rgb(191, 97, 106);
    /// nord12 - Orange (warnings)
    pub const NORD12: Color = Color::Rgb(208, 135, 112);
    /// nord13 - Yellow (pending)
    pub const NORD13: Color = Color::Rgb(235, 203, 139);
    /// nord14 - Green (success)
    pub const NORD14: Color = Color::Rgb(163, 190, 140);
    /// nord15 - Purple
    pub const NORD15: Color = Color::Rgb(180, 142, 173);
}

/// Status bar background (nord1)
pub const BG_ELEVATED: Color = polar_night::NORD1;
/// Border color (nord3)
pub const BORDER: Color = polar_night::NORD3;

/// Primary text color (nord4)
pub const TEXT: Color = snow_storm::NORD4;
/// Secondary/dimmed text (nord3)
pub const TEXT_DIM: Color = polar_night::NORD3;
/// Emphasized text (nord6)
pub const TEXT_BRIGHT: Color = snow_storm::NORD6;

/// Accent color - cyan (nord8)
pub const ACCENT: Color = frost::NORD8;

/// Success color - green (nord14)
pub const SUCCESS: Color = aurora::NORD14;
/// Error color - red (nord11)
pub const ERROR: Color = aurora::NORD11;

/// Pipeline status colors
pub mod pipeline {
    use super::*;

    /// Job success (green)
    pub const SUCCESS: Color = aurora::NORD14;
    /// Job running (blue)
    pub const RUNNING: Color = frost::NORD9;
    /// Job pending (yellow)
    pub const PENDING: Color = aurora::NORD13;
    /// Job failed (red)
    pub const FAILED: Color = aurora::NORD11;
    /// Job failed but allowed to (orange)
    pub const ALLOWED_FAILURE: Color = aurora::NORD12;
    /// Job canceled (gray)
    pub const CANCELED: Color = polar_night::NORD3;
    /// Job skipped (dim gray)
    pub const SKIPPED: Color = polar_night::NORD3;
    /// Job manual (grey)
    pub const MANUAL: Color = snow_storm::NORD4;
    /// Job created/waiting (dim gray)
    pub const CREATED: Color = polar_night::NORD3;
}
