//! macOS system colors used by the tray icons.
//!
//! https://developer.apple.com/design/human-interface-guidelines/color#macOS-system-colors

pub type Rgb = (u8, u8, u8);

/// System red, readable on both light and dark menu bars
pub const RED: Rgb = (255, 59, 48);

/// System gray
pub const GRAY: Rgb = (142, 142, 147);

/// Template icons are drawn in black; macOS recolors them for the menu bar.
pub const TEMPLATE: Rgb = (0, 0, 0);
