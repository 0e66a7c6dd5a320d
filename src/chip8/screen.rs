//! Pixel addressing for the packed framebuffer. One bit per pixel, row-major,
//! most significant bit is the leftmost pixel of each byte.

pub const SCREEN_WIDTH: usize = 64;
pub const SCREEN_HEIGHT: usize = 32;
pub const SCREEN_BYTES: usize = SCREEN_WIDTH * SCREEN_HEIGHT / 8;

fn bit(x: usize, y: usize) -> (usize, u8) {
    let index = y * SCREEN_WIDTH + x;
    (index / 8, 0x80 >> (index % 8))
}

/// Coordinates are not range checked; out-of-range values panic on the
/// slice index.
pub fn get_pixel(screen: &[u8], x: usize, y: usize) -> bool {
    let (byte, mask) = bit(x, y);
    screen[byte] & mask != 0
}

pub fn set_pixel(screen: &mut [u8], x: usize, y: usize, on: bool) {
    let (byte, mask) = bit(x, y);
    if on {
        screen[byte] |= mask;
    } else {
        screen[byte] &= !mask;
    }
}

pub fn clear(screen: &mut [u8]) {
    screen.iter_mut().for_each(|b| *b = 0);
}

/// (x, y) of every lit pixel
pub fn lit_pixels(screen: &[u8]) -> impl Iterator<Item = (usize, usize)> + '_ {
    (0..SCREEN_WIDTH * SCREEN_HEIGHT)
        .map(|i| (i % SCREEN_WIDTH, i / SCREEN_WIDTH))
        .filter(move |&(x, y)| get_pixel(screen, x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_count() {
        assert_eq!(SCREEN_BYTES, 256);
    }

    #[test]
    fn test_bit_order() {
        let mut s = [0u8; SCREEN_BYTES];
        set_pixel(&mut s, 0, 0, true);
        assert_eq!(s[0], 0x80);
        set_pixel(&mut s, 7, 0, true);
        assert_eq!(s[0], 0x81);
        set_pixel(&mut s, 8, 1, true);
        assert_eq!(s[9], 0x40);
    }

    #[test]
    fn test_set_and_clear_pixel() {
        let mut s = [0u8; SCREEN_BYTES];
        set_pixel(&mut s, 63, 31, true);
        assert!(get_pixel(&s, 63, 31));
        assert_eq!(s[255], 0x01);
        set_pixel(&mut s, 63, 31, false);
        assert!(!get_pixel(&s, 63, 31));
        assert_eq!(s[255], 0);
    }

    #[test]
    fn test_clear() {
        let mut s = [0xFFu8; SCREEN_BYTES];
        clear(&mut s);
        assert!(s.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_lit_pixels() {
        let mut s = [0u8; SCREEN_BYTES];
        set_pixel(&mut s, 3, 0, true);
        set_pixel(&mut s, 10, 20, true);
        let lit: Vec<_> = lit_pixels(&s).collect();
        assert_eq!(lit, vec![(3, 0), (10, 20)]);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_panics() {
        let s = [0u8; SCREEN_BYTES];
        get_pixel(&s, 0, 32);
    }
}
