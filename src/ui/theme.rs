use std::process::Command;

use ratatui::style::Color;

use crate::config::ThemePreference;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appearance {
    Light,
    Dark,
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub preference: ThemePreference,
    pub header_accent_bg: Color,
    pub header_accent_fg: Color,
    pub table_header_bg: Color,
    pub table_header_fg: Color,
    pub row_bg: Color,
    pub row_alt_bg: Color,
    pub row_high_bg: Color,
    pub row_medium_bg: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,
    pub cursor_fg: Color,
    pub added_fg: Color,
    pub denied_fg: Color,
    pub status_ok: Color,
    pub status_warn: Color,
    pub status_err: Color,
    pub statusbar_bg: Color,
    pub overlay_border: Color,
    pub text_primary: Color,
    pub text_secondary: Color,
    pub pill_key_bg: Color,
    pub pill_key_fg: Color,
    pub pill_desc_fg: Color,
    pub surface_bg: Color,
    pub gauge_low: Color,
    pub gauge_mid: Color,
    pub gauge_high: Color,
    pub gauge_unfilled: Color,
}

impl Theme {
    /// `System` consults the desktop settings; anything undetectable is light.
    pub fn from_preference(preference: ThemePreference) -> Self {
        match preference {
            ThemePreference::Light => Self::light(),
            ThemePreference::Dark => Self::dark(),
            ThemePreference::Modern => Self::modern(),
            ThemePreference::System => Self::following(detect_system_appearance()),
        }
    }

    pub fn following(appearance: Appearance) -> Self {
        let base = match appearance {
            Appearance::Light => Self::light(),
            Appearance::Dark => Self::dark(),
        };
        Theme {
            preference: ThemePreference::System,
            ..base
        }
    }

    pub fn label(&self) -> &'static str {
        self.preference.tag()
    }

    /// Gauge fill for the given system memory usage.
    pub fn gauge_color(&self, used_percent: f64) -> Color {
        if used_percent < 50.0 {
            self.gauge_low
        } else if used_percent < 80.0 {
            self.gauge_mid
        } else {
            self.gauge_high
        }
    }

    /// Row background, tinted for processes holding a large share of RAM.
    pub fn row_background(&self, index: usize, memory_percent: f64) -> Color {
        if memory_percent > 10.0 {
            self.row_high_bg
        } else if memory_percent > 5.0 {
            self.row_medium_bg
        } else if index % 2 == 1 {
            self.row_alt_bg
        } else {
            self.row_bg
        }
    }

    pub fn light() -> Self {
        Theme {
            preference: ThemePreference::Light,
            header_accent_bg: Color::Rgb(44, 62, 80),
            header_accent_fg: Color::White,
            table_header_bg: Color::Rgb(44, 62, 80),
            table_header_fg: Color::White,
            row_bg: Color::White,
            row_alt_bg: Color::Rgb(240, 240, 240),
            row_high_bg: Color::Rgb(255, 244, 205),
            row_medium_bg: Color::Rgb(255, 249, 225),
            selection_bg: Color::Rgb(61, 174, 233),
            selection_fg: Color::White,
            cursor_fg: Color::Rgb(44, 62, 80),
            added_fg: Color::Rgb(39, 174, 96),
            denied_fg: Color::Rgb(150, 150, 150),
            status_ok: Color::Rgb(0, 120, 0),
            status_warn: Color::Rgb(200, 120, 0),
            status_err: Color::Red,
            statusbar_bg: Color::Rgb(220, 220, 220),
            overlay_border: Color::Rgb(150, 150, 150),
            text_primary: Color::Black,
            text_secondary: Color::DarkGray,
            pill_key_bg: Color::Rgb(52, 73, 94),
            pill_key_fg: Color::White,
            pill_desc_fg: Color::Black,
            surface_bg: Color::Rgb(245, 245, 245),
            gauge_low: Color::Rgb(39, 174, 96),
            gauge_mid: Color::Rgb(243, 156, 18),
            gauge_high: Color::Rgb(231, 76, 60),
            gauge_unfilled: Color::Rgb(208, 208, 208),
        }
    }

    pub fn dark() -> Self {
        Theme {
            preference: ThemePreference::Dark,
            header_accent_bg: Color::Rgb(13, 71, 161),
            header_accent_fg: Color::White,
            table_header_bg: Color::Rgb(13, 71, 161),
            table_header_fg: Color::White,
            row_bg: Color::Rgb(37, 37, 37),
            row_alt_bg: Color::Rgb(45, 45, 45),
            row_high_bg: Color::Rgb(80, 69, 30),
            row_medium_bg: Color::Rgb(63, 56, 33),
            selection_bg: Color::Rgb(255, 111, 0),
            selection_fg: Color::White,
            cursor_fg: Color::Rgb(25, 118, 210),
            added_fg: Color::Rgb(76, 175, 80),
            denied_fg: Color::Gray,
            status_ok: Color::Green,
            status_warn: Color::Yellow,
            status_err: Color::Red,
            statusbar_bg: Color::Rgb(30, 30, 30),
            overlay_border: Color::Rgb(61, 61, 61),
            text_primary: Color::White,
            text_secondary: Color::Gray,
            pill_key_bg: Color::Rgb(21, 101, 192),
            pill_key_fg: Color::White,
            pill_desc_fg: Color::White,
            surface_bg: Color::Rgb(30, 30, 30),
            gauge_low: Color::Rgb(39, 174, 96),
            gauge_mid: Color::Rgb(243, 156, 18),
            gauge_high: Color::Rgb(231, 76, 60),
            gauge_unfilled: Color::Rgb(61, 61, 61),
        }
    }

    pub fn modern() -> Self {
        Theme {
            preference: ThemePreference::Modern,
            header_accent_bg: Color::Rgb(255, 111, 0),
            header_accent_fg: Color::White,
            table_header_bg: Color::Rgb(255, 111, 0),
            table_header_fg: Color::White,
            row_bg: Color::White,
            row_alt_bg: Color::Rgb(238, 238, 238),
            row_high_bg: Color::Rgb(255, 244, 205),
            row_medium_bg: Color::Rgb(255, 249, 225),
            selection_bg: Color::Rgb(255, 143, 0),
            selection_fg: Color::White,
            cursor_fg: Color::Rgb(255, 111, 0),
            added_fg: Color::Rgb(76, 175, 80),
            denied_fg: Color::Rgb(158, 158, 158),
            status_ok: Color::Rgb(76, 175, 80),
            status_warn: Color::Rgb(255, 143, 0),
            status_err: Color::Rgb(211, 47, 47),
            statusbar_bg: Color::Rgb(238, 238, 238),
            overlay_border: Color::Rgb(224, 224, 224),
            text_primary: Color::Rgb(33, 33, 33),
            text_secondary: Color::Rgb(97, 97, 97),
            pill_key_bg: Color::Rgb(255, 111, 0),
            pill_key_fg: Color::White,
            pill_desc_fg: Color::Rgb(33, 33, 33),
            surface_bg: Color::Rgb(245, 245, 245),
            gauge_low: Color::Rgb(39, 174, 96),
            gauge_mid: Color::Rgb(243, 156, 18),
            gauge_high: Color::Rgb(231, 76, 60),
            gauge_unfilled: Color::Rgb(224, 224, 224),
        }
    }
}

/// Reads the GNOME colour scheme, then the GTK theme name.
pub fn detect_system_appearance() -> Appearance {
    if let Some(scheme) = gsettings("color-scheme")
        && let Some(appearance) = appearance_from_color_scheme(&scheme)
    {
        return appearance;
    }
    if let Some(gtk_theme) = gsettings("gtk-theme") {
        return appearance_from_gtk_theme(&gtk_theme);
    }
    Appearance::Light
}

fn gsettings(key: &str) -> Option<String> {
    let output = Command::new("gsettings")
        .args(["get", "org.gnome.desktop.interface", key])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn clean_setting(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '\'' || c == '"' || c == ' ')
        .to_lowercase()
}

pub fn appearance_from_color_scheme(raw: &str) -> Option<Appearance> {
    let value = clean_setting(raw);
    if value.contains("dark") {
        Some(Appearance::Dark)
    } else if value.contains("light") {
        Some(Appearance::Light)
    } else {
        None
    }
}

pub fn appearance_from_gtk_theme(raw: &str) -> Appearance {
    if clean_setting(raw).contains("dark") {
        Appearance::Dark
    } else {
        Appearance::Light
    }
}
