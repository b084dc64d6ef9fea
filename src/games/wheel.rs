//! European wheel layout: pocket colours and physical pocket order.

use super::types::{Color, MAX_NUMBER};

/// Red pockets of the standard European layout. Not derivable by formula.
pub const RED_NUMBERS: [u8; 18] = [1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36];

/// Pocket order, clockwise starting from 0. Presentation only.
pub const WHEEL_ORDER: [u8; 37] = [
    0, 32, 15, 19, 4, 21, 2, 25, 17, 34, 6, 27, 13, 36, 11, 30, 8, 23, 10, 5, 24, 16, 33, 1, 20, 14,
    31, 9, 22, 18, 29, 7, 28, 12, 35, 3, 26,
];

pub fn color_of(number: u8) -> Color {
    if number == 0 {
        Color::Green
    } else if RED_NUMBERS.contains(&number) {
        Color::Red
    } else {
        Color::Black
    }
}

pub fn is_valid_number(number: u8) -> bool {
    number <= MAX_NUMBER
}

/// Index of `number` in [`WHEEL_ORDER`]
pub fn wheel_position(number: u8) -> Option<usize> {
    WHEEL_ORDER.iter().position(|&pocket| pocket == number)
}
