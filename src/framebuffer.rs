pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;

/// bytes per framebuffer row, 8 pixels per byte
pub const DISPLAY_PITCH: usize = DISPLAY_WIDTH / 8;

pub const DISPLAY_SIZE_BYTES: usize = DISPLAY_PITCH * DISPLAY_HEIGHT;

/// 1 bit per pixel, rows top to bottom, most significant bit leftmost.
#[derive(Clone, PartialEq, Eq)]
pub struct PackedFramebuffer {
    bytes: [u8; DISPLAY_SIZE_BYTES],
}

impl Default for PackedFramebuffer {
    fn default() -> Self {
        PackedFramebuffer {
            bytes: [0; DISPLAY_SIZE_BYTES],
        }
    }
}

impl std::fmt::Debug for PackedFramebuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.bytes.chunks(DISPLAY_PITCH) {
            for byte in row {
                write!(f, "{:08b}", byte)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl PackedFramebuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.bytes = [0; DISPLAY_SIZE_BYTES];
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        let x = x % DISPLAY_WIDTH;
        let y = y % DISPLAY_HEIGHT;
        self.bytes[y * DISPLAY_PITCH + x / 8] & (0x80 >> (x % 8)) != 0
    }

    /// XOR one 8-pixel sprite row into the buffer at (x, y), wrapping both
    /// coordinates. Returns true if any lit pixel was switched off.
    pub fn draw_row(&mut self, x: usize, y: usize, row: u8) -> bool {
        let x = x % DISPLAY_WIDTH;
        let y = y % DISPLAY_HEIGHT;
        let line = y * DISPLAY_PITCH;
        let column = x / 8;
        let shift = x % 8;

        let mut collided = Self::xor_byte(&mut self.bytes[line + column], row >> shift);

        // an unaligned row spills its low bits into the next byte along,
        // which wraps to the start of the same line
        if shift != 0 {
            let next = line + (column + 1) % DISPLAY_PITCH;
            collided |= Self::xor_byte(&mut self.bytes[next], row << (8 - shift));
        }
        collided
    }

    fn xor_byte(byte: &mut u8, mask: u8) -> bool {
        let collided = *byte & mask != 0;
        *byte ^= mask;
        collided
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned_draw() {
        let mut fb = PackedFramebuffer::new();
        assert!(!fb.draw_row(8, 1, 0b1010_0000));
        assert_eq!(fb.as_bytes()[DISPLAY_PITCH + 1], 0b1010_0000);
        assert!(fb.pixel(8, 1));
        assert!(!fb.pixel(9, 1));
        assert!(fb.pixel(10, 1));
    }

    #[test]
    fn test_unaligned_draw_straddles_bytes() {
        let mut fb = PackedFramebuffer::new();
        fb.draw_row(3, 0, 0xff);
        assert_eq!(fb.as_bytes()[0], 0b0001_1111);
        assert_eq!(fb.as_bytes()[1], 0b1110_0000);
        for x in 0..16 {
            assert_eq!(fb.pixel(x, 0), (3..11).contains(&x), "x = {}", x);
        }
    }

    #[test]
    fn test_wraps_columns_at_60() {
        let mut fb = PackedFramebuffer::new();
        fb.draw_row(60, 5, 0xff);
        let line = &fb.as_bytes()[5 * DISPLAY_PITCH..6 * DISPLAY_PITCH];
        // columns 60-63 land in the rightmost byte, 0-3 in the leftmost
        assert_eq!(line[DISPLAY_PITCH - 1], 0b0000_1111);
        assert_eq!(line[0], 0b1111_0000);
        assert_eq!(&line[1..DISPLAY_PITCH - 1], &[0; DISPLAY_PITCH - 2]);
        // no bleed into the neighbouring rows
        assert_eq!(fb.as_bytes()[6 * DISPLAY_PITCH], 0);
        assert_eq!(fb.as_bytes()[5 * DISPLAY_PITCH - 1], 0);
    }

    #[test]
    fn test_wraps_coordinates() {
        let mut a = PackedFramebuffer::new();
        let mut b = PackedFramebuffer::new();
        a.draw_row(70, 33, 0x3c);
        b.draw_row(6, 1, 0x3c);
        assert_eq!(a, b);
    }

    #[test]
    fn test_xor_is_self_inverse_and_collides() {
        let mut fb = PackedFramebuffer::new();
        assert!(!fb.draw_row(13, 10, 0x81));
        assert!(fb.draw_row(13, 10, 0x81));
        assert_eq!(fb, PackedFramebuffer::new());
    }

    #[test]
    fn test_collision_only_on_set_to_unset() {
        let mut fb = PackedFramebuffer::new();
        fb.draw_row(0, 0, 0b1100_0000);
        // overlapping on the unlit part doesn't count
        assert!(!fb.draw_row(0, 0, 0b0011_0000));
        assert!(fb.pixel(2, 0));
        // switching off a lit pixel through the spill-over byte does
        assert!(fb.draw_row(60, 0, 0b0000_1000));
        assert!(!fb.pixel(0, 0));
        assert!(fb.pixel(1, 0));
    }

    #[test]
    fn test_clear() {
        let mut fb = PackedFramebuffer::new();
        fb.draw_row(60, 31, 0xff);
        fb.clear();
        assert_eq!(fb.as_bytes(), &[0; DISPLAY_SIZE_BYTES][..]);
        assert!(!fb.draw_row(60, 31, 0xff));
    }
}
