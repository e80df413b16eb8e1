use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;

fn colored(color: AnsiColor) -> Style {
    Style::new().bold().fg_color(Some(Color::Ansi(color)))
}

/// Help and error styling shared by the portal binaries.
pub fn get_styles() -> Styles {
    Styles::styled()
        .usage(colored(AnsiColor::Magenta).underline())
        .header(colored(AnsiColor::Magenta).underline())
        .literal(colored(AnsiColor::Green))
        .invalid(colored(AnsiColor::Red))
        .error(colored(AnsiColor::Red))
        .valid(colored(AnsiColor::Green))
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
}
