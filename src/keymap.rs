use sdl2::keyboard::Keycode;

/// left-hand side of a qwerty keyboard onto the hex keypad
///   1 2 3 C      1 2 3 4
///   4 5 6 D      Q W E R
///   7 8 9 E      A S D F
///   A 0 B F      Z X C V
const KEYMAP: [(Keycode, u8); 16] = [
    (Keycode::X, 0x0),
    (Keycode::Num1, 0x1),
    (Keycode::Num2, 0x2),
    (Keycode::Num3, 0x3),
    (Keycode::Q, 0x4),
    (Keycode::W, 0x5),
    (Keycode::E, 0x6),
    (Keycode::A, 0x7),
    (Keycode::S, 0x8),
    (Keycode::D, 0x9),
    (Keycode::Z, 0xA),
    (Keycode::C, 0xB),
    (Keycode::Num4, 0xC),
    (Keycode::R, 0xD),
    (Keycode::F, 0xE),
    (Keycode::V, 0xF),
];

pub fn map_key(keycode: Keycode) -> Option<u8> {
    KEYMAP
        .iter()
        .find(|(k, _)| *k == keycode)
        .map(|&(_, key)| key)
}
