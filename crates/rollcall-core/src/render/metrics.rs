// Standard-14 Times font metrics and WinAnsi encoding
//
// Widths are in 1/1000 text space units, taken from the Adobe AFM files for
// Times-Roman and Times-Bold. Only WinAnsi-encodable text is measured; every
// other character has already been replaced by `?` during encoding.

/// One of the two faces drawn on a certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFace {
    Bold,
    Regular,
}

impl FontFace {
    /// PostScript name of the standard font
    pub fn base_font(&self) -> &'static str {
        match self {
            FontFace::Bold => "Times-Bold",
            FontFace::Regular => "Times-Roman",
        }
    }

    /// Resource name used in the page's font dictionary
    pub fn resource_name(&self) -> &'static str {
        match self {
            FontFace::Bold => "RcTimesBold",
            FontFace::Regular => "RcTimesRoman",
        }
    }
}

// Codes 0x20..=0x7E
const TIMES_ROMAN_ASCII: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278, // 0x20
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444, // 0x30
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722, // 0x40
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500, // 0x50
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500, // 0x60
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541, // 0x70
];

const TIMES_BOLD_ASCII: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278, // 0x20
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500, // 0x30
    930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778, // 0x40
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500, // 0x50
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500, // 0x60
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520, // 0x70
];

// Latin-1 letters 0xC0..=0xFF share the width of their base letter; `*` marks
// glyphs with their own width (see `latin1_special`).
const LATIN1_BASE: &[u8; 64] =
    b"AAAAAA*CEEEEIIII*NOOOOO*OUUUUY**aaaaaa*ceeeeiiii*nooooo*ouuuuy*y";

/// Encode text for a simple font with `WinAnsiEncoding`
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{A0}'..='\u{FF}' => c as u32 as u8,
            '€' => 0x80,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            _ => b'?',
        })
        .collect()
}

/// Width of one encoded glyph in 1/1000 units
pub fn glyph_width(face: FontFace, code: u8) -> u16 {
    let ascii = match face {
        FontFace::Bold => &TIMES_BOLD_ASCII,
        FontFace::Regular => &TIMES_ROMAN_ASCII,
    };

    match code {
        0x20..=0x7E => ascii[(code - 0x20) as usize],
        0x80 | 0x96 => 500,
        0x85 | 0x97 => 1000,
        0x91 | 0x92 => 333,
        0x93 | 0x94 => match face {
            FontFace::Bold => 500,
            FontFace::Regular => 444,
        },
        0x95 => 350,
        0xA0 => 250,
        0xC0..=0xFF => match LATIN1_BASE[(code - 0xC0) as usize] {
            b'*' => latin1_special(face, code),
            base => ascii[(base - 0x20) as usize],
        },
        _ => 500,
    }
}

fn latin1_special(face: FontFace, code: u8) -> u16 {
    let (regular, bold) = match code {
        0xC6 => (889, 1000), // AE
        0xD0 => (722, 722),  // Eth
        0xD7 => (564, 570),  // multiply
        0xD8 => (722, 778),  // Oslash
        0xDE => (556, 611),  // Thorn
        0xDF => (500, 556),  // germandbls
        0xE6 => (667, 722),  // ae
        0xF0 => (500, 500),  // eth
        0xF7 => (564, 570),  // divide
        0xF8 => (500, 500),  // oslash
        0xFE => (500, 556),  // thorn
        _ => (500, 500),
    };
    match face {
        FontFace::Bold => bold,
        FontFace::Regular => regular,
    }
}

/// Width of already-encoded text at `size`, in text space units
pub fn width_of_encoded(face: FontFace, encoded: &[u8], size: f32) -> f32 {
    let units: u32 = encoded
        .iter()
        .map(|&code| u32::from(glyph_width(face, code)))
        .sum();
    units as f32 * size / 1000.0
}

/// Width of `text` at `size` after WinAnsi encoding
pub fn width_of_text_at_size(face: FontFace, text: &str, size: f32) -> f32 {
    width_of_encoded(face, &encode_win_ansi(text), size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.001
    }

    #[test]
    fn test_known_widths() {
        assert_eq!(glyph_width(FontFace::Regular, b'A'), 722);
        assert_eq!(glyph_width(FontFace::Bold, b'W'), 1000);
        assert_eq!(glyph_width(FontFace::Regular, b'~'), 541);
        assert_eq!(glyph_width(FontFace::Bold, b'~'), 520);
        assert_eq!(glyph_width(FontFace::Regular, b'"'), 408);
    }

    #[test]
    fn test_width_of_text() {
        assert!(approx(
            width_of_text_at_size(FontFace::Regular, "Tech Talk", 16.0),
            65.312
        ));
        assert!(approx(
            width_of_text_at_size(FontFace::Bold, "Jane Doe", 35.0),
            137.06
        ));
    }

    #[test]
    fn test_accented_letters_use_base_width() {
        assert_eq!(
            glyph_width(FontFace::Regular, 0xE9),
            glyph_width(FontFace::Regular, b'e')
        );
        assert_eq!(
            glyph_width(FontFace::Bold, 0xD1),
            glyph_width(FontFace::Bold, b'N')
        );
        assert_eq!(glyph_width(FontFace::Bold, 0xC6), 1000);
    }

    #[test]
    fn test_encode_win_ansi() {
        assert_eq!(encode_win_ansi("Señor"), vec![b'S', b'e', 0xF1, b'o', b'r']);
        assert_eq!(encode_win_ansi("“Hi”"), vec![0x93, b'H', b'i', 0x94]);
        assert_eq!(encode_win_ansi("李"), vec![b'?']);
    }
}
