use mdr_core::LineKind;
use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeChoice {
    Auto,
    Default,
    HighContrast,
}

#[derive(Debug, Clone)]
pub struct ThemeTokens {
    pub heading: Style,
    pub bullet: Style,
    pub code: Style,
    pub quote: Style,
    pub rule: Style,
    pub image: Style,
    pub plain: Style,
}

pub fn build_theme(choice: ThemeChoice, no_color: bool) -> ThemeTokens {
    if no_color {
        return monochrome_theme();
    }

    match choice {
        ThemeChoice::Auto | ThemeChoice::Default => default_theme(),
        ThemeChoice::HighContrast => high_contrast_theme(),
    }
}

pub fn style_for_line(tokens: &ThemeTokens, kind: LineKind) -> Style {
    match kind {
        LineKind::Blank | LineKind::Plain => tokens.plain,
        LineKind::Heading => tokens.heading,
        LineKind::Bullet => tokens.bullet,
        LineKind::Code => tokens.code,
        LineKind::Quote => tokens.quote,
        LineKind::Rule => tokens.rule,
        LineKind::Image => tokens.image,
    }
}

fn default_theme() -> ThemeTokens {
    ThemeTokens {
        heading: Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
        bullet: Style::default().fg(Color::Magenta),
        code: Style::default().fg(Color::LightYellow),
        quote: Style::default().fg(Color::Gray),
        rule: Style::default().fg(Color::DarkGray),
        image: Style::default().fg(Color::LightBlue),
        plain: Style::default(),
    }
}

fn high_contrast_theme() -> ThemeTokens {
    ThemeTokens {
        heading: Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
        bullet: Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
        code: Style::default().fg(Color::Yellow).bg(Color::Black),
        quote: Style::default().fg(Color::White),
        rule: Style::default().fg(Color::White),
        image: Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
        plain: Style::default().fg(Color::White),
    }
}

fn monochrome_theme() -> ThemeTokens {
    let base = Style::default();
    ThemeTokens {
        heading: base.add_modifier(Modifier::BOLD),
        bullet: base,
        code: base,
        quote: base.add_modifier(Modifier::ITALIC),
        rule: base,
        image: base,
        plain: base,
    }
}

#[cfg(test)]
mod tests {
    use mdr_core::LineKind;
    use ratatui::style::{Color, Modifier};

    use super::{ThemeChoice, build_theme, style_for_line};

    #[test]
    fn no_color_theme_is_bold_for_heading() {
        let theme = build_theme(ThemeChoice::Default, true);
        let style = style_for_line(&theme, LineKind::Heading);
        assert!(style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(style.fg, None);
    }

    #[test]
    fn auto_and_default_themes_match() {
        let auto = build_theme(ThemeChoice::Auto, false);
        let default = build_theme(ThemeChoice::Default, false);
        assert_eq!(auto.heading, default.heading);
        assert_eq!(auto.code, default.code);
    }

    #[test]
    fn no_color_overrides_selected_theme() {
        let theme = build_theme(ThemeChoice::HighContrast, true);
        assert_eq!(theme.plain.fg, None);
        assert_eq!(theme.code.bg, None);
    }

    #[test]
    fn style_for_line_maps_kinds() {
        let theme = build_theme(ThemeChoice::Default, false);
        assert_eq!(style_for_line(&theme, LineKind::Heading).fg, Some(Color::Cyan));
        assert_eq!(style_for_line(&theme, LineKind::Code).fg, Some(Color::LightYellow));
        assert_eq!(style_for_line(&theme, LineKind::Bullet).fg, Some(Color::Magenta));
        assert_eq!(
            style_for_line(&theme, LineKind::Blank),
            style_for_line(&theme, LineKind::Plain)
        );
    }
}
