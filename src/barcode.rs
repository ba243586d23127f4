//! Code 128 (code set B) barcodes rendered as SVG.
//!
//! Each symbol is six alternating bar/space widths in modules, starting with
//! a bar; the stop symbol has seven.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt::Write;
use thiserror::Error;

const PATTERNS: [&str; 106] = [
    "212222", "222122", "222221", "121223", "121322", "131222", "122213", "122312", "132212",
    "221213", "221312", "231212", "112232", "122132", "122231", "113222", "123122", "123221",
    "223211", "221132", "221231", "213212", "223112", "312131", "311222", "321122", "321221",
    "312212", "322112", "322211", "212123", "212321", "232121", "111323", "131123", "131321",
    "112313", "132113", "132311", "211313", "231113", "231311", "112133", "112331", "132131",
    "113123", "113321", "133121", "313121", "211331", "231131", "213113", "213311", "213131",
    "311123", "311321", "331121", "312113", "312311", "332111", "314111", "221411", "431111",
    "111224", "111422", "121124", "121421", "141122", "141221", "112214", "112412", "122114",
    "122411", "142112", "142211", "241211", "221114", "413111", "241112", "134111", "111242",
    "121142", "121241", "114212", "124112", "124211", "411212", "421112", "421211", "212141",
    "214121", "412121", "111143", "111341", "131141", "114113", "114311", "411113", "411311",
    "113141", "114131", "311141", "411131", "211412", "211214", "211232",
];
const STOP: &str = "2331112";
const START_B: usize = 104;
const QUIET_ZONE: u32 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BarcodeError {
    #[error("cannot encode an empty value")]
    Empty,

    #[error("character {0:?} is outside the printable ASCII range")]
    UnsupportedCharacter(char),
}

/// Rendering options for [`render_svg`].
#[derive(Debug, Clone, Copy)]
pub struct SvgOptions {
    /// Width of the narrowest bar in pixels.
    pub module_width: u32,
    pub bar_height: u32,
    /// Print the encoded value under the bars.
    pub show_text: bool,
}

impl Default for SvgOptions {
    fn default() -> Self {
        Self {
            module_width: 2,
            bar_height: 80,
            show_text: true,
        }
    }
}

/// Symbol values for `value`: start B, data, checksum.
fn symbols(value: &str) -> Result<Vec<usize>, BarcodeError> {
    if value.is_empty() {
        return Err(BarcodeError::Empty);
    }

    let mut symbols = Vec::with_capacity(value.len() + 2);
    symbols.push(START_B);
    for c in value.chars() {
        if !(' '..='~').contains(&c) {
            return Err(BarcodeError::UnsupportedCharacter(c));
        }
        symbols.push(c as usize - 32);
    }

    let checksum = symbols
        .iter()
        .enumerate()
        .fold(0, |acc, (position, symbol)| acc + position.max(1) * symbol)
        % 103;
    symbols.push(checksum);
    Ok(symbols)
}

/// Bar/space widths in modules, quiet zones excluded.
pub fn encode(value: &str) -> Result<Vec<u8>, BarcodeError> {
    let widths = symbols(value)?
        .into_iter()
        .map(|symbol| PATTERNS[symbol])
        .chain(std::iter::once(STOP))
        .flat_map(|pattern| pattern.bytes().map(|b| b - b'0'))
        .collect();
    Ok(widths)
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn render_svg(value: &str, options: SvgOptions) -> Result<String, BarcodeError> {
    let widths = encode(value)?;
    let modules: u32 = widths.iter().map(|w| *w as u32).sum::<u32>() + 2 * QUIET_ZONE;
    let width = modules * options.module_width;
    let text_height = if options.show_text { 24 } else { 0 };
    let height = options.bar_height + text_height;

    let mut svg = String::new();
    // Writing into a String cannot fail.
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    );
    let _ = write!(svg, r##"<rect width="{width}" height="{height}" fill="#ffffff"/>"##);
    svg.push_str(r##"<g fill="#000000">"##);

    let mut x = QUIET_ZONE * options.module_width;
    for (idx, w) in widths.iter().enumerate() {
        let bar_width = *w as u32 * options.module_width;
        if idx % 2 == 0 {
            let _ = write!(
                svg,
                r#"<rect x="{x}" y="0" width="{bar_width}" height="{}"/>"#,
                options.bar_height
            );
        }
        x += bar_width;
    }
    svg.push_str("</g>");

    if options.show_text {
        let _ = write!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="middle" font-family="monospace" font-size="16">{}</text>"#,
            width / 2,
            options.bar_height + 18,
            escape_xml(value)
        );
    }
    svg.push_str("</svg>");
    Ok(svg)
}

/// SVG as a `data:` URI for inline `<img>` embedding.
pub fn svg_data_uri(value: &str, options: SvgOptions) -> Result<String, BarcodeError> {
    let svg = render_svg(value, options)?;
    Ok(format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg)))
}
