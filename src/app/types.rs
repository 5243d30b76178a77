use ratatui::style::{Color, Modifier, Style};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum ThemePreset {
    Graphite,
    Paper,
}

impl ThemePreset {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            ThemePreset::Graphite => "graphite",
            ThemePreset::Paper => "paper",
        }
    }

    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "graphite" | "dark" | "slate" => Some(ThemePreset::Graphite),
            "paper" | "light" => Some(ThemePreset::Paper),
            _ => None,
        }
    }

    pub(crate) fn palette(self) -> ThemePalette {
        match self {
            ThemePreset::Graphite => ThemePalette {
                prompt: Color::Rgb(100, 150, 200),
                input_text: Color::Rgb(180, 200, 220),
                muted_text: Color::Rgb(80, 100, 120),
                highlight_fg: Color::Rgb(200, 220, 240),
                highlight_bg: Color::Rgb(40, 60, 80),
                status_text: Color::Rgb(90, 110, 130),
                user_fg: Color::Rgb(200, 220, 240),
                user_bg: Color::Rgb(25, 35, 45),
                assistant_label: Color::Rgb(255, 127, 80),
                assistant_text: Color::Rgb(170, 190, 210),
                error_label: Color::Rgb(220, 100, 100),
                error_text: Color::Rgb(230, 120, 120),
                banner_title: Color::Rgb(150, 170, 190),
                panel_bg: Color::Rgb(10, 20, 30),
                panel_fg: Color::Rgb(170, 190, 210),
                code_fg: Color::Rgb(180, 200, 220),
                code_bg: Color::Rgb(5, 15, 25),
                inline_code_fg: Color::Rgb(160, 180, 200),
                inline_code_bg: Color::Rgb(20, 30, 40),
                bullet: Color::Rgb(110, 130, 150),
            },
            ThemePreset::Paper => ThemePalette {
                prompt: Color::Rgb(70, 90, 120),
                input_text: Color::Rgb(40, 45, 55),
                muted_text: Color::Rgb(140, 140, 135),
                highlight_fg: Color::Rgb(30, 35, 45),
                highlight_bg: Color::Rgb(215, 212, 200),
                status_text: Color::Rgb(120, 120, 115),
                user_fg: Color::Rgb(30, 35, 45),
                user_bg: Color::Rgb(228, 225, 215),
                assistant_label: Color::Rgb(190, 85, 45),
                assistant_text: Color::Rgb(55, 60, 70),
                error_label: Color::Rgb(180, 55, 55),
                error_text: Color::Rgb(165, 60, 60),
                banner_title: Color::Rgb(80, 90, 110),
                panel_bg: Color::Rgb(250, 249, 244),
                panel_fg: Color::Rgb(55, 60, 70),
                code_fg: Color::Rgb(45, 50, 60),
                code_bg: Color::Rgb(236, 234, 226),
                inline_code_fg: Color::Rgb(60, 65, 80),
                inline_code_bg: Color::Rgb(232, 230, 221),
                bullet: Color::Rgb(130, 130, 125),
            },
        }
    }
}

pub(crate) fn default_theme() -> ThemePreset {
    ThemePreset::Graphite
}

#[derive(Clone, Copy)]
pub(crate) struct ThemePalette {
    pub(crate) prompt: Color,
    pub(crate) input_text: Color,
    pub(crate) muted_text: Color,
    pub(crate) highlight_fg: Color,
    pub(crate) highlight_bg: Color,
    pub(crate) status_text: Color,
    pub(crate) user_fg: Color,
    pub(crate) user_bg: Color,
    pub(crate) assistant_label: Color,
    pub(crate) assistant_text: Color,
    pub(crate) error_label: Color,
    pub(crate) error_text: Color,
    pub(crate) banner_title: Color,
    pub(crate) panel_bg: Color,
    pub(crate) panel_fg: Color,
    pub(crate) code_fg: Color,
    pub(crate) code_bg: Color,
    pub(crate) inline_code_fg: Color,
    pub(crate) inline_code_bg: Color,
    pub(crate) bullet: Color,
}

impl ThemePalette {
    pub(crate) fn prompt_style(self) -> Style {
        Style::default()
            .fg(self.prompt)
            .add_modifier(Modifier::BOLD)
    }

    pub(crate) fn title_style(self) -> Style {
        Style::default()
            .fg(self.banner_title)
            .add_modifier(Modifier::BOLD)
    }

    pub(crate) fn body_style(self) -> Style {
        Style::default().fg(self.assistant_text)
    }

    pub(crate) fn muted_style(self) -> Style {
        Style::default().fg(self.muted_text)
    }

    pub(crate) fn status_style(self) -> Style {
        Style::default().fg(self.status_text)
    }

    pub(crate) fn error_style(self) -> Style {
        Style::default().fg(self.error_text)
    }

    pub(crate) fn error_label_style(self) -> Style {
        Style::default()
            .fg(self.error_label)
            .add_modifier(Modifier::BOLD)
    }

    pub(crate) fn panel_surface_style(self) -> Style {
        Style::default().bg(self.panel_bg).fg(self.panel_fg)
    }

    pub(crate) fn panel_border_style(self) -> Style {
        Style::default().fg(self.highlight_bg)
    }

    pub(crate) fn input_surface_style(self) -> Style {
        Style::default().fg(self.input_text)
    }

    pub(crate) fn hint_selected_style(self) -> Style {
        Style::default()
            .fg(self.highlight_fg)
            .bg(self.highlight_bg)
            .add_modifier(Modifier::BOLD)
    }
}
