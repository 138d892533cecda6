// Certificate layout: where each line goes and how it looks

use super::metrics::{encode_win_ansi, width_of_encoded, FontFace};
use super::text::CertificateLines;

/// Fill colour in 0..=1 components
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub f32, pub f32, pub f32);

impl Rgb {
    pub fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }
}

/// Style of one drawn line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineStyle {
    /// Face the text is drawn with
    pub face: FontFace,
    /// Face used to measure the text for centering
    pub measure_face: FontFace,
    pub size: f32,
    /// Distance below the previous line's baseline
    pub drop: f32,
    /// Horizontal adjustment applied after centering
    pub x_shift: f32,
    pub color: Rgb,
}

/// Vertical anchor and per-line styles
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateLayout {
    /// Baseline of the recipient name
    pub anchor_y: f32,
    pub name: LineStyle,
    pub title: LineStyle,
    pub held_on: LineStyle,
    pub given: LineStyle,
}

impl Default for CertificateLayout {
    fn default() -> Self {
        let ink = Rgb::from_u8(60, 81, 121);
        Self {
            anchor_y: 340.0,
            name: LineStyle {
                face: FontFace::Bold,
                measure_face: FontFace::Bold,
                size: 35.0,
                drop: 0.0,
                x_shift: 0.0,
                color: Rgb::from_u8(255, 102, 0),
            },
            // Drawn bold but centred on its regular-face width, 10 units left.
            title: LineStyle {
                face: FontFace::Bold,
                measure_face: FontFace::Regular,
                size: 16.0,
                drop: 50.0,
                x_shift: -10.0,
                color: ink,
            },
            held_on: LineStyle {
                face: FontFace::Regular,
                measure_face: FontFace::Regular,
                size: 16.0,
                drop: 20.0,
                x_shift: 0.0,
                color: ink,
            },
            given: LineStyle {
                face: FontFace::Regular,
                measure_face: FontFace::Regular,
                size: 18.0,
                drop: 65.0,
                x_shift: 0.0,
                color: ink,
            },
        }
    }
}

/// A line with its final position
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub encoded: Vec<u8>,
    pub face: FontFace,
    pub size: f32,
    pub x: f32,
    pub y: f32,
    pub color: Rgb,
}

impl CertificateLayout {
    /// Position all four lines on a page of `page_width`
    pub fn place(&self, page_width: f32, lines: &CertificateLines) -> Vec<PlacedLine> {
        let rows = [
            (&lines.name, &self.name),
            (&lines.title, &self.title),
            (&lines.held_on, &self.held_on),
            (&lines.given, &self.given),
        ];

        let mut y = self.anchor_y;
        rows.into_iter()
            .map(|(text, style)| {
                y -= style.drop;
                let encoded = encode_win_ansi(text);
                let width = width_of_encoded(style.measure_face, &encoded, style.size);
                PlacedLine {
                    x: (page_width - width) / 2.0 + style.x_shift,
                    y,
                    face: style.face,
                    size: style.size,
                    color: style.color,
                    encoded,
                }
            })
            .collect()
    }
}

/// Content stream drawing `lines`
///
/// Starts with `Q` to close the `q` that wraps the template's own content.
pub fn overlay_content(lines: &[PlacedLine]) -> Vec<u8> {
    let mut out = b"Q\n".to_vec();
    for line in lines {
        let Rgb(r, g, b) = line.color;
        out.extend_from_slice(b"BT\n");
        out.extend_from_slice(
            format!("/{} {} Tf\n", line.face.resource_name(), num(line.size)).as_bytes(),
        );
        out.extend_from_slice(format!("{} {} {} rg\n", num(r), num(g), num(b)).as_bytes());
        out.extend_from_slice(format!("{} {} Td\n", num(line.x), num(line.y)).as_bytes());
        out.push(b'(');
        escape_literal(&line.encoded, &mut out);
        out.extend_from_slice(b") Tj\nET\n");
    }
    out
}

fn num(value: f32) -> String {
    let s = format!("{value:.4}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

fn escape_literal(bytes: &[u8], out: &mut Vec<u8>) {
    for &b in bytes {
        match b {
            b'(' | b')' | b'\\' => {
                out.push(b'\\');
                out.push(b);
            }
            0x20..=0x7E => out.push(b),
            _ => out.extend_from_slice(format!("\\{b:03o}").as_bytes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines() -> CertificateLines {
        CertificateLines {
            name: "Jane Doe".into(),
            title: "\"Tech Talk\"".into(),
            held_on: "Held on June 1, 2024".into(),
            given: "Given this 5th of June 2024,".into(),
        }
    }

    #[test]
    fn test_vertical_offsets() {
        let placed = CertificateLayout::default().place(842.0, &lines());
        let ys: Vec<f32> = placed.iter().map(|l| l.y).collect();
        assert_eq!(ys, vec![340.0, 290.0, 270.0, 205.0]);
        let sizes: Vec<f32> = placed.iter().map(|l| l.size).collect();
        assert_eq!(sizes, vec![35.0, 16.0, 16.0, 18.0]);
    }

    #[test]
    fn test_name_is_centred_on_bold_width() {
        let placed = CertificateLayout::default().place(842.0, &lines());
        // "Jane Doe" is 3916 units in Times-Bold
        let expected = (842.0 - 3916.0 * 35.0 / 1000.0) / 2.0;
        assert!((placed[0].x - expected).abs() < 0.001);
        assert_eq!(placed[0].face, FontFace::Bold);
    }

    #[test]
    fn test_title_is_shifted_left_of_regular_centre() {
        let placed = CertificateLayout::default().place(842.0, &lines());
        // "\"Tech Talk\"" is 4898 units in Times-Roman
        let expected = (842.0 - 4898.0 * 16.0 / 1000.0) / 2.0 - 10.0;
        assert!((placed[1].x - expected).abs() < 0.001);
        assert_eq!(placed[1].face, FontFace::Bold);
    }

    #[test]
    fn test_placement_is_deterministic() {
        let layout = CertificateLayout::default();
        assert_eq!(layout.place(612.0, &lines()), layout.place(612.0, &lines()));
    }

    #[test]
    fn test_overlay_content_escapes_text() {
        let line = PlacedLine {
            encoded: b"a(b)\\".to_vec(),
            face: FontFace::Regular,
            size: 16.0,
            x: 10.5,
            y: 20.0,
            color: Rgb(0.0, 0.0, 0.0),
        };
        let content = String::from_utf8(overlay_content(&[line])).unwrap();
        assert!(content.starts_with("Q\n"));
        assert!(content.contains("/RcTimesRoman 16 Tf"));
        assert!(content.contains("10.5 20 Td"));
        assert!(content.contains("(a\\(b\\)\\\\) Tj"));
    }

    #[test]
    fn test_overlay_content_octal_for_high_bytes() {
        let line = PlacedLine {
            encoded: vec![b'S', 0xF1],
            face: FontFace::Bold,
            size: 35.0,
            x: 0.0,
            y: 0.0,
            color: Rgb(1.0, 0.4, 0.0),
        };
        let content = String::from_utf8(overlay_content(&[line])).unwrap();
        assert!(content.contains("(S\\361) Tj"));
        assert!(content.contains("1 0.4 0 rg"));
    }
}
