//! Helvetica text for cover titles and page numbers.
//!
//! Helvetica is one of the standard 14 fonts, so nothing is embedded; the
//! advance widths below (from the Adobe AFM, 1/1000 em) are only needed to
//! center a line.

use lopdf::content::Operation;
use lopdf::{Object, dictionary};

/// Resource name the font is registered under on every page.
pub const FONT_RESOURCE: &str = "F1";

/// Widths for `' '..='~'`.
const ASCII_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

const FALLBACK_WIDTH: u16 = 556;

/// The font dictionary for [`FONT_RESOURCE`].
pub fn font_dictionary() -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Map text to WinAnsi bytes. Latin-1 characters map to themselves,
/// anything else becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7e | 0xa0..=0xff => c as u8,
            _ => b'?',
        })
        .collect()
}

/// Width of `text` in points at `font_size`.
pub fn text_width(text: &str, font_size: f64) -> f64 {
    let units: u32 = encode_win_ansi(text)
        .into_iter()
        .map(|b| match b {
            0x20..=0x7e => u32::from(ASCII_WIDTHS[usize::from(b - 0x20)]),
            _ => u32::from(FALLBACK_WIDTH),
        })
        .sum();
    f64::from(units) * font_size / 1000.0
}

/// Operations drawing `text` horizontally centered on `center_x`, baseline at `y`.
pub fn centered_line(text: &str, font_size: f64, center_x: f64, y: f64) -> Vec<Operation> {
    let x = center_x - text_width(text, font_size) / 2.0;
    vec![
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![FONT_RESOURCE.into(), Object::Real(font_size as f32)],
        ),
        Operation::new("Td", vec![Object::Real(x as f32), Object::Real(y as f32)]),
        Operation::new("Tj", vec![Object::string_literal(encode_win_ansi(text))]),
        Operation::new("ET", vec![]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_table_covers_printable_ascii() {
        assert_eq!(ASCII_WIDTHS.len(), ('~' as usize) - (' ' as usize) + 1);
    }

    #[test]
    fn known_widths() {
        assert_eq!(text_width(" ", 1000.0), 278.0);
        assert_eq!(text_width("W", 1000.0), 944.0);
        assert_eq!(text_width("1 / 3", 10.0), (556.0 + 278.0 + 278.0 + 278.0 + 556.0) / 100.0);
    }

    #[test]
    fn non_latin_becomes_question_mark() {
        assert_eq!(encode_win_ansi("Café ✓"), b"Caf\xe9 ?".to_vec());
    }

    #[test]
    fn centered_line_starts_half_width_left_of_center() {
        let ops = centered_line("My PDF", 24.0, 300.0, 400.0);
        let td = ops.iter().find(|op| op.operator == "Td").unwrap();
        let expected_x = 300.0 - text_width("My PDF", 24.0) / 2.0;
        assert_eq!(td.operands[0].as_float().unwrap(), expected_x as f32);
        assert_eq!(td.operands[1].as_float().unwrap(), 400.0);
    }
}
