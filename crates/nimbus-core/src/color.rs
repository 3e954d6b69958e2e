#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color(pub u8, pub u8, pub u8, pub u8);

impl Color {
    pub const TRANSPARENT: Color = Color(0, 0, 0, 0);
    pub const BLACK: Color = Color(0, 0, 0, 255);
    pub const WHITE: Color = Color(255, 255, 255, 255);
    pub const GRAY: Color = Color(0x88, 0x88, 0x88, 255);
    pub const DARK_GRAY: Color = Color(0x44, 0x44, 0x44, 255);

    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Color(r, g, b, 255)
    }
    pub fn from_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color(r, g, b, a)
    }
    /// `#RRGGBB` or `#RRGGBBAA`; anything else is opaque black.
    pub fn from_hex(hex: &str) -> Self {
        let s = hex.trim_start_matches('#');
        let byte = |i: usize| {
            s.get(i..i + 2)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .unwrap_or(0)
        };
        match s.len() {
            6 => Color(byte(0), byte(2), byte(4), 255),
            8 => Color(byte(0), byte(2), byte(4), byte(6)),
            _ => Color::BLACK,
        }
    }
    pub fn with_alpha(self, a: u8) -> Self {
        Color(self.0, self.1, self.2, a)
    }
    /// Alpha as a 0..=1 fraction, e.g. `Color::WHITE.copy_alpha(0.3)`.
    pub fn copy_alpha(self, a: f32) -> Self {
        self.with_alpha((a.clamp(0.0, 1.0) * 255.0).round() as u8)
    }
    pub fn to_linear(self) -> [f32; 4] {
        fn srgb_to_linear(c: f32) -> f32 {
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        [
            srgb_to_linear(self.0 as f32 / 255.0),
            srgb_to_linear(self.1 as f32 / 255.0),
            srgb_to_linear(self.2 as f32 / 255.0),
            self.3 as f32 / 255.0,
        ]
    }
}
