//! Renderer contract: the scene descriptor the engine hands to the host
//! rasterizer, plus the 16-color EGA palette and color resolution.
//!
//! The engine never draws. It assembles a [`Scene`] (room vector
//! graphics + sprite instances) each render phase and passes it with the
//! interpolation alpha to whatever implements [`Renderer`].

use reverie_data::RoomGraphicsDef;

/// Logical screen size.
pub const SCREEN_W: u32 = 320;
pub const SCREEN_H: u32 = 200;

/// The classic EGA arrangement, indices 0..15.
pub const EGA_PALETTE: [(u8, u8, u8); 16] = [
    (0x00, 0x00, 0x00), // 0  black
    (0x00, 0x00, 0xAA), // 1  blue
    (0x00, 0xAA, 0x00), // 2  green
    (0x00, 0xAA, 0xAA), // 3  cyan
    (0xAA, 0x00, 0x00), // 4  red
    (0xAA, 0x00, 0xAA), // 5  magenta
    (0xAA, 0x55, 0x00), // 6  brown
    (0xAA, 0xAA, 0xAA), // 7  light gray
    (0x55, 0x55, 0x55), // 8  dark gray
    (0x55, 0x55, 0xFF), // 9  light blue
    (0x55, 0xFF, 0x55), // 10 light green
    (0x55, 0xFF, 0xFF), // 11 light cyan
    (0xFF, 0x55, 0x55), // 12 light red
    (0xFF, 0x55, 0xFF), // 13 light magenta
    (0xFF, 0xFF, 0x55), // 14 yellow
    (0xFF, 0xFF, 0xFF), // 15 white
];

const COLOR_NAMES: [(&str, u8); 16] = [
    ("black", 0),
    ("blue", 1),
    ("green", 2),
    ("cyan", 3),
    ("red", 4),
    ("magenta", 5),
    ("brown", 6),
    ("lightgray", 7),
    ("darkgray", 8),
    ("lightblue", 9),
    ("lightgreen", 10),
    ("lightcyan", 11),
    ("lightred", 12),
    ("lightmagenta", 13),
    ("yellow", 14),
    ("white", 15),
];

/// Resolve a color argument (palette index, name, or hex) to a palette
/// index. Non-palette colors snap to the nearest entry; garbage maps to
/// black rather than failing a render.
pub fn resolve_color(color: &str) -> u8 {
    let trimmed = color.trim();
    if let Ok(index) = trimmed.parse::<u8>()
        && index < 16
    {
        return index;
    }
    let lower = trimmed.to_lowercase().replace([' ', '_', '-'], "");
    if let Some((_, index)) = COLOR_NAMES.iter().find(|(name, _)| *name == lower) {
        return *index;
    }
    if let Some(hex) = trimmed.strip_prefix('#')
        && hex.len() == 6
        && let Ok(value) = u32::from_str_radix(hex, 16)
    {
        let r = ((value >> 16) & 0xFF) as i32;
        let g = ((value >> 8) & 0xFF) as i32;
        let b = (value & 0xFF) as i32;
        return nearest_palette_index(r, g, b);
    }
    0
}

fn nearest_palette_index(r: i32, g: i32, b: i32) -> u8 {
    let mut best = 0u8;
    let mut best_distance = i32::MAX;
    for (i, (pr, pg, pb)) in EGA_PALETTE.iter().enumerate() {
        let dr = r - i32::from(*pr);
        let dg = g - i32::from(*pg);
        let db = b - i32::from(*pb);
        let distance = dr * dr + dg * dg + db * db;
        if distance < best_distance {
            best_distance = distance;
            best = i as u8;
        }
    }
    best
}

/// Priority band for a screen Y, SCI0-style: everything above the
/// horizon shares band 0; the playfield divides into rising bands.
pub fn priority_from_y(y: i32) -> u8 {
    const TOP: i32 = 42;
    const BOTTOM: i32 = 190;
    if y < TOP {
        return 0;
    }
    if y >= BOTTOM {
        return 15;
    }
    let band = (y - TOP) * 14 / (BOTTOM - TOP) + 1;
    u8::try_from(band.clamp(1, 14)).unwrap_or(14)
}

/// Visual effect bits.
pub const EFFECT_GHOST: u8 = 0b01;
pub const EFFECT_INVERTED: u8 = 0b10;

/// One sprite (VIEW) placed in the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteInstance {
    pub x: f64,
    pub y: f64,
    /// Loop name within the entity's sprite definition.
    pub current_loop: String,
    pub current_cell: usize,
    pub mirrored: bool,
    pub scale: f64,
    pub effect_mask: u8,
    pub visible: bool,
    /// Explicit priority; None means derive from Y.
    pub priority: Option<u8>,
}

impl SpriteInstance {
    /// Draw-order priority: declared, or the Y band.
    pub fn effective_priority(&self) -> u8 {
        #[allow(clippy::cast_possible_truncation)]
        self.priority.unwrap_or_else(|| priority_from_y(self.y as i32))
    }
}

/// Everything the renderer needs for one frame of one room.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene {
    pub room_id: String,
    pub background_color: u8,
    pub graphics: Option<RoomGraphicsDef>,
    /// Sprites pre-sorted ascending by (priority, y).
    pub sprites: Vec<SpriteInstance>,
}

impl Scene {
    /// Sort sprites into draw order: ascending (priority, y).
    pub fn sort_sprites(&mut self) {
        self.sprites.sort_by(|a, b| {
            a.effective_priority()
                .cmp(&b.effective_priority())
                .then(a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
        });
    }
}

/// The rasterizer collaborator. Implementations own dithering, the
/// priority buffer, sprite pooling, and scaling.
pub trait Renderer {
    /// Draw one frame; `alpha` in [0, 1) interpolates between the
    /// previous and current simulation states.
    fn render(&mut self, scene: &Scene, alpha: f64);
}

/// Renderer that draws nothing; used headless and in tests.
#[derive(Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _scene: &Scene, _alpha: f64) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_and_name_colors_resolve() {
        assert_eq!(resolve_color("0"), 0);
        assert_eq!(resolve_color("15"), 15);
        assert_eq!(resolve_color("yellow"), 14);
        assert_eq!(resolve_color("light gray"), 7);
        assert_eq!(resolve_color("Light-Blue"), 9);
    }

    #[test]
    fn exact_hex_resolves_and_off_palette_snaps() {
        assert_eq!(resolve_color("#0000AA"), 1);
        assert_eq!(resolve_color("#FFFFFF"), 15);
        // near-white snaps to white, murky green snaps to green
        assert_eq!(resolve_color("#F0F0F0"), 15);
        assert_eq!(resolve_color("#10A010"), 2);
    }

    #[test]
    fn nonsense_color_is_black() {
        assert_eq!(resolve_color("plaid"), 0);
        assert_eq!(resolve_color("#ZZZZZZ"), 0);
        assert_eq!(resolve_color("99"), 0);
    }

    #[test]
    fn priority_bands_cover_the_playfield() {
        assert_eq!(priority_from_y(0), 0);
        assert_eq!(priority_from_y(41), 0);
        assert_eq!(priority_from_y(42), 1);
        assert_eq!(priority_from_y(189), 14);
        assert_eq!(priority_from_y(190), 15);
        assert_eq!(priority_from_y(199), 15);
        // bands never decrease with depth
        let mut last = 0;
        for y in 0..200 {
            let p = priority_from_y(y);
            assert!(p >= last);
            last = p;
        }
    }

    #[test]
    fn sprites_sort_by_priority_then_y() {
        let sprite = |y: f64, priority: Option<u8>| SpriteInstance {
            x: 0.0,
            y,
            current_loop: "idle".into(),
            current_cell: 0,
            mirrored: false,
            scale: 1.0,
            effect_mask: 0,
            visible: true,
            priority,
        };
        let mut scene = Scene {
            room_id: "r".into(),
            background_color: 0,
            graphics: None,
            sprites: vec![sprite(100.0, None), sprite(50.0, None), sprite(180.0, Some(0))],
        };
        scene.sort_sprites();
        // declared priority 0 draws first, then Y-banded back-to-front
        assert!((scene.sprites[0].y - 180.0).abs() < f64::EPSILON);
        assert!((scene.sprites[1].y - 50.0).abs() < f64::EPSILON);
        assert!((scene.sprites[2].y - 100.0).abs() < f64::EPSILON);
    }
}
