//! Terminal styles. `console` drops the colors by itself when stdout is not
//! a terminal, so piped output stays plain.

use console::Style;

pub fn path() -> Style {
    Style::new().cyan().bold()
}

pub fn muted() -> Style {
    Style::new().dim()
}

pub fn archived() -> Style {
    Style::new().red().dim()
}

pub fn name() -> Style {
    Style::new().bold()
}

pub fn success() -> Style {
    Style::new().green()
}
