//! SGR-aware conversion of display lines into styled ratatui text.
//!
//! Only SGR (`CSI ... m`) is interpreted. Other control sequences are
//! dropped since the output view is line-oriented.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use vte::{Params, Parser, Perform};

/// Console palette, indexed by ANSI colour number.
pub const PALETTE: [Color; 16] = [
    Color::Black,
    Color::Rgb(0xE5, 0x4B, 0x4B),
    Color::Rgb(0x9E, 0xCE, 0x58),
    Color::Rgb(0xFA, 0xED, 0x70),
    Color::Rgb(0x39, 0x6F, 0xE2),
    Color::Rgb(0xBB, 0x80, 0xB3),
    Color::Rgb(0x2D, 0xDA, 0xFD),
    Color::Rgb(0xD0, 0xD0, 0xD0),
    Color::DarkGray,
    Color::Rgb(0xFF, 0x53, 0x70),
    Color::Rgb(0xC3, 0xE8, 0x8D),
    Color::Rgb(0xFF, 0xCB, 0x6B),
    Color::Rgb(0x82, 0xAA, 0xFF),
    Color::Rgb(0xC7, 0x92, 0xEA),
    Color::Rgb(0x89, 0xDD, 0xFF),
    Color::Rgb(0xFF, 0xFF, 0xFF),
];

/// Background used to highlight search matches.
pub const SELECTION: Color = Color::Rgb(0xFA, 0xF0, 0x89);

/// Map an indexed colour, using the console palette for the first 16.
fn indexed(idx: u16) -> Color {
    PALETTE
        .get(usize::from(idx))
        .copied()
        .unwrap_or_else(|| Color::Indexed(u8::try_from(idx).unwrap_or(u8::MAX)))
}

#[derive(Default)]
struct SpanBuilder {
    style: Style,
    text: String,
    spans: Vec<Span<'static>>,
}

impl SpanBuilder {
    fn flush(&mut self) {
        if !self.text.is_empty() {
            let text = std::mem::take(&mut self.text);
            self.spans.push(Span::styled(text, self.style));
        }
    }

    fn set_style(&mut self, style: Style) {
        if style != self.style {
            self.flush();
            self.style = style;
        }
    }

    fn apply_sgr(&mut self, params: &Params) {
        let mut style = self.style;
        let mut iter = params.iter();

        // `CSI m` with no parameters is a reset.
        if params.is_empty() {
            self.set_style(Style::default());
            return;
        }

        while let Some(param) = iter.next() {
            let n = param.first().copied().unwrap_or(0);
            match n {
                0 => style = Style::default(),
                1 => style = style.add_modifier(Modifier::BOLD),
                2 => style = style.add_modifier(Modifier::DIM),
                3 => style = style.add_modifier(Modifier::ITALIC),
                4 => style = style.add_modifier(Modifier::UNDERLINED),
                7 => style = style.add_modifier(Modifier::REVERSED),
                9 => style = style.add_modifier(Modifier::CROSSED_OUT),
                22 => style = style.remove_modifier(Modifier::BOLD | Modifier::DIM),
                23 => style = style.remove_modifier(Modifier::ITALIC),
                24 => style = style.remove_modifier(Modifier::UNDERLINED),
                27 => style = style.remove_modifier(Modifier::REVERSED),
                29 => style = style.remove_modifier(Modifier::CROSSED_OUT),
                30..=37 => style.fg = Some(indexed(n - 30)),
                39 => style.fg = None,
                40..=47 => style.bg = Some(indexed(n - 40)),
                49 => style.bg = None,
                90..=97 => style.fg = Some(indexed(n - 90 + 8)),
                100..=107 => style.bg = Some(indexed(n - 100 + 8)),
                38 | 48 => {
                    let color = match iter.next().and_then(|p| p.first().copied()) {
                        Some(5) => iter
                            .next()
                            .and_then(|p| p.first().copied())
                            .map(indexed),
                        Some(2) => {
                            let mut channel = || {
                                iter.next()
                                    .and_then(|p| p.first().copied())
                                    .map_or(0, |v| u8::try_from(v).unwrap_or(u8::MAX))
                            };
                            let (r, g, b) = (channel(), channel(), channel());
                            Some(Color::Rgb(r, g, b))
                        }
                        _ => None,
                    };
                    if n == 38 {
                        style.fg = color.or(style.fg);
                    } else {
                        style.bg = color.or(style.bg);
                    }
                }
                _ => {}
            }
        }

        self.set_style(style);
    }
}

impl Perform for SpanBuilder {
    fn print(&mut self, c: char) {
        self.text.push(c);
    }

    fn execute(&mut self, byte: u8) {
        if byte == b'\t' {
            self.text.push_str("    ");
        }
    }

    fn csi_dispatch(&mut self, params: &Params, _intermediates: &[u8], _ignore: bool, action: char) {
        if action == 'm' {
            self.apply_sgr(params);
        }
    }
}

/// Parse one display line into styled spans.
pub fn to_line(text: &str) -> Line<'static> {
    let mut parser = Parser::new();
    let mut builder = SpanBuilder::default();
    for byte in text.bytes() {
        parser.advance(&mut builder, byte);
    }
    builder.flush();
    Line::from(builder.spans)
}

/// Visible text of a display line with all escape sequences removed.
pub fn strip(text: &str) -> String {
    to_line(text)
        .spans
        .iter()
        .map(|span| span.content.as_ref())
        .collect()
}
