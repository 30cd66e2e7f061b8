//! Tray icons, drawn in code.
//!
//! The microphone glyph is a capsule on a U-shaped holder with a stem and
//! base. The muted variant is red and struck through.

use image::{Rgba, RgbaImage};

use crate::MicState;
use crate::color::{self, Rgb};

/// Icon edge length in pixels. 32px renders crisply on retina menu bars.
pub const ICON_SIZE: u32 = 32;

/// What the tray icon shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayGlyph {
    Live,
    Muted,
    /// No default input device
    NoDevice,
}

impl TrayGlyph {
    pub fn new(state: MicState, has_device: bool) -> Self {
        match (state, has_device) {
            (MicState::Muted, _) => TrayGlyph::Muted,
            (MicState::Live, true) => TrayGlyph::Live,
            (MicState::Live, false) => TrayGlyph::NoDevice,
        }
    }

    /// Template icons follow the menu bar appearance. macOS keeps only the
    /// alpha of a template, so the colored glyphs must not be templates.
    pub fn is_template(self) -> bool {
        matches!(self, TrayGlyph::Live)
    }

    fn color(self) -> Rgb {
        match self {
            TrayGlyph::Live => color::TEMPLATE,
            TrayGlyph::Muted => color::RED,
            TrayGlyph::NoDevice => color::GRAY,
        }
    }

    pub fn render(self) -> RgbaImage {
        let (r, g, b) = self.color();
        let slashed = self == TrayGlyph::Muted;

        RgbaImage::from_fn(ICON_SIZE, ICON_SIZE, |x, y| {
            let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
            let covered = if slashed {
                // leave a gap around the slash so it reads at small sizes
                let d = segment_distance((px, py), (7.0, 5.0), (25.0, 27.0));
                d <= 1.5 || (d > 3.0 && in_microphone(px, py))
            } else {
                in_microphone(px, py)
            };

            if covered {
                Rgba([r, g, b, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }

    /// Tooltip text for the given device label.
    pub fn tooltip(self, device_label: &str) -> String {
        match self {
            TrayGlyph::Muted => format!("{device_label} (Muted)"),
            _ => device_label.to_string(),
        }
    }
}

fn in_microphone(x: f32, y: f32) -> bool {
    // capsule
    if segment_distance((x, y), (16.0, 8.5), (16.0, 14.5)) <= 4.5 {
        return true;
    }

    // holder: lower half of a ring around the capsule
    let ring = ((x - 16.0).powi(2) + (y - 14.5).powi(2)).sqrt();
    if y >= 14.5 && (7.5..=9.0).contains(&ring) {
        return true;
    }

    // stem and base
    let stem = (15.0..=17.0).contains(&x) && (23.0..=27.0).contains(&y);
    let base = (11.0..=21.0).contains(&x) && (27.0..=29.0).contains(&y);
    stem || base
}

/// Distance from `p` to the segment `a`..`b`.
fn segment_distance(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len2 = dx * dx + dy * dy;
    let t = if len2 == 0.0 {
        0.0
    } else {
        (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len2).clamp(0.0, 1.0)
    };
    let (cx, cy) = (a.0 + t * dx, a.1 + t * dy);
    ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt()
}

/// Converts a glyph into a tray icon.
#[cfg(target_os = "macos")]
pub fn to_tray_icon(glyph: TrayGlyph) -> Result<tray_icon::Icon, tray_icon::BadIcon> {
    let image = glyph.render();
    let (width, height) = image.dimensions();
    tray_icon::Icon::from_rgba(image.into_raw(), width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opaque(image: &RgbaImage) -> usize {
        image.pixels().filter(|p| p[3] == 255).count()
    }

    #[test]
    fn test_glyph_selection() {
        assert_eq!(TrayGlyph::new(MicState::Live, true), TrayGlyph::Live);
        assert_eq!(TrayGlyph::new(MicState::Muted, true), TrayGlyph::Muted);
        assert_eq!(TrayGlyph::new(MicState::Muted, false), TrayGlyph::Muted);
        assert_eq!(TrayGlyph::new(MicState::Live, false), TrayGlyph::NoDevice);
    }

    #[test]
    fn test_render_dimensions_and_colors() {
        let live = TrayGlyph::Live.render();
        assert_eq!(live.dimensions(), (ICON_SIZE, ICON_SIZE));
        assert!(opaque(&live) > 50);

        let muted = TrayGlyph::Muted.render();
        let (r, g, b) = color::RED;
        assert!(
            muted
                .pixels()
                .filter(|p| p[3] == 255)
                .all(|p| p[0] == r && p[1] == g && p[2] == b)
        );
        // the capsule center is drawn in both
        assert_eq!(live.get_pixel(16, 10)[3], 255);
        // the slash crosses the top-left corner area only when muted
        assert_eq!(live.get_pixel(8, 6)[3], 0);
        assert_eq!(muted.get_pixel(8, 6)[3], 255);
    }

    #[test]
    fn test_corners_are_transparent() {
        for glyph in [TrayGlyph::Live, TrayGlyph::Muted, TrayGlyph::NoDevice] {
            let image = glyph.render();
            assert_eq!(image.get_pixel(0, 0)[3], 0);
            assert_eq!(image.get_pixel(ICON_SIZE - 1, 0)[3], 0);
        }
    }

    #[test]
    fn test_tooltip() {
        assert_eq!(TrayGlyph::Live.tooltip("USB Headset"), "USB Headset");
        assert_eq!(
            TrayGlyph::Muted.tooltip("USB Headset"),
            "USB Headset (Muted)"
        );
    }

    #[test]
    fn test_template_flag() {
        assert!(TrayGlyph::Live.is_template());
        assert!(!TrayGlyph::NoDevice.is_template());
        assert!(!TrayGlyph::Muted.is_template());
    }

    #[test]
    fn test_glyphs_stay_distinct_as_rendered() {
        // a template is reduced to its alpha, so any glyph that only differs
        // from the live one by color has to keep that color
        for glyph in [TrayGlyph::Muted, TrayGlyph::NoDevice] {
            let same_alpha = glyph
                .render()
                .pixels()
                .zip(TrayGlyph::Live.render().pixels())
                .all(|(a, b)| a[3] == b[3]);
            assert!(!same_alpha || !glyph.is_template(), "{glyph:?}");
        }
        let (r, g, b) = color::GRAY;
        let gray = TrayGlyph::NoDevice.render();
        assert_eq!(gray.get_pixel(16, 10).0, [r, g, b, 255]);
    }
}
