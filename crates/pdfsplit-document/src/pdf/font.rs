// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Metrics and encoding for the standard 14 Helvetica font with
// WinAnsiEncoding, used for the invisible OCR text layer.

/// Smallest font size the text layer fitting will go down to.
pub const MIN_FONT_SIZE: f32 = 1.0;

/// Step by which the font size is reduced while text is too wide.
pub const FONT_SIZE_STEP: f32 = 0.2;

/// Helvetica advance widths for 0x20..=0x7E, in 1/1000 em.
const ASCII_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 0x20
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0x30
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 0x40
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 0x50
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 0x60
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 0x70
];

/// Helvetica advance widths for 0xA0..=0xFF (Latin-1 range of WinAnsi).
const LATIN1_WIDTHS: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333, // 0xA0
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611, // 0xB0
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278, // 0xC0
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611, // 0xD0
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278, // 0xE0
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500, // 0xF0
];

/// Characters WinAnsi places in 0x80..=0x9F, with their Helvetica widths.
const WINANSI_EXTRAS: [(char, u8, u16); 27] = [
    ('€', 0x80, 556),
    ('‚', 0x82, 222),
    ('ƒ', 0x83, 556),
    ('„', 0x84, 333),
    ('…', 0x85, 1000),
    ('†', 0x86, 556),
    ('‡', 0x87, 556),
    ('ˆ', 0x88, 333),
    ('‰', 0x89, 1000),
    ('Š', 0x8A, 667),
    ('‹', 0x8B, 333),
    ('Œ', 0x8C, 1000),
    ('Ž', 0x8E, 611),
    ('\u{2018}', 0x91, 222),
    ('\u{2019}', 0x92, 222),
    ('\u{201C}', 0x93, 333),
    ('\u{201D}', 0x94, 333),
    ('•', 0x95, 350),
    ('–', 0x96, 556),
    ('—', 0x97, 1000),
    ('˜', 0x98, 333),
    ('™', 0x99, 1000),
    ('š', 0x9A, 500),
    ('›', 0x9B, 333),
    ('œ', 0x9C, 944),
    ('ž', 0x9E, 500),
    ('Ÿ', 0x9F, 667),
];

/// WinAnsi code of a character, if the font can show it.
pub fn winansi_byte(c: char) -> Option<u8> {
    let code = c as u32;
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(code as u8),
        _ => WINANSI_EXTRAS
            .iter()
            .find(|(extra, _, _)| *extra == c)
            .map(|(_, byte, _)| *byte),
    }
}

/// Advance width of a WinAnsi code in 1/1000 em.
pub fn glyph_width(byte: u8) -> u16 {
    match byte {
        0x20..=0x7E => ASCII_WIDTHS[(byte - 0x20) as usize],
        0xA0..=0xFF => LATIN1_WIDTHS[(byte - 0xA0) as usize],
        _ => WINANSI_EXTRAS
            .iter()
            .find(|(_, code, _)| *code == byte)
            .map(|(_, _, width)| *width)
            .unwrap_or(556),
    }
}

/// Drop every character the font cannot encode.
pub fn clean_for_encoding(text: &str) -> String {
    text.chars().filter(|c| winansi_byte(*c).is_some()).collect()
}

/// Encode text as WinAnsi bytes, skipping characters the font cannot show.
pub fn encode(text: &str) -> Vec<u8> {
    text.chars().filter_map(winansi_byte).collect()
}

/// Width of `text` at size 1, in 1/1000 text space units.
pub fn string_width(text: &str) -> f32 {
    text.chars()
        .filter_map(winansi_byte)
        .map(|byte| glyph_width(byte) as f32)
        .sum()
}

/// Largest font size `box_height - k * FONT_SIZE_STEP` at which `text` fits
/// into `box_width`. Never below [`MIN_FONT_SIZE`].
pub fn fit_font_size(text: &str, box_width: f32, box_height: f32) -> f32 {
    let start = box_height.max(MIN_FONT_SIZE);
    if !start.is_finite() {
        return MIN_FONT_SIZE;
    }
    let em_width = string_width(text) / 1000.0;
    if em_width * start <= box_width {
        return start;
    }

    let widest = box_width / em_width;
    let steps = ((start - widest) / FONT_SIZE_STEP).ceil();
    let mut size = start - steps * FONT_SIZE_STEP;
    // Rounding can leave the size a hair too wide.
    if em_width * size > box_width {
        size = widest * (1.0 - 4.0 * f32::EPSILON) - FONT_SIZE_STEP;
    }
    size.max(MIN_FONT_SIZE)
}
