// Certificate rendering
//
// text    - line composition (title case, date formats)
// metrics - Times font widths and WinAnsi encoding
// layout  - positions, sizes and colours of the four lines
// pdf     - lopdf-backed template overlay

pub mod layout;
pub mod metrics;
pub mod pdf;
pub mod text;

pub use layout::{CertificateLayout, LineStyle, PlacedLine, Rgb};
pub use metrics::{encode_win_ansi, width_of_text_at_size, FontFace};
pub use pdf::PdfTemplateRenderer;
pub use text::{long_date, ordinal_long_date, title_case, CertificateLines};
