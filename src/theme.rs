use ratatui::style::Color;

#[derive(Debug, Clone)]
pub struct Theme {
    pub name: &'static str,
    pub fg: Color,
    pub bg: Color,
    pub dim: Color,
    pub border: Color,
    pub highlight_bg: Color,
    pub highlight_fg: Color,
    pub positive: Color,
    pub accent: Color,
    pub input_accent: Color,
    pub title: Color,
    pub error: Color,
}

impl Default for Theme {
    fn default() -> Self {
        dark()
    }
}

pub fn by_name(name: &str) -> Theme {
    match name {
        "light" => light(),
        _ => dark(),
    }
}

/// The other of the two palettes.
pub fn toggled(current: &Theme) -> Theme {
    match current.name {
        "dark" => light(),
        _ => dark(),
    }
}

pub fn dark() -> Theme {
    Theme {
        name: "dark",
        fg: Color::Indexed(253),        // bright white
        bg: Color::Reset,
        dim: Color::Indexed(243),       // mid gray
        border: Color::Indexed(240),
        highlight_bg: Color::Indexed(237),
        highlight_fg: Color::Indexed(255),
        positive: Color::Indexed(46),   // vivid green
        accent: Color::Indexed(81),     // sky cyan
        input_accent: Color::Indexed(220), // gold
        title: Color::Indexed(255),
        error: Color::Indexed(196),
    }
}

pub fn light() -> Theme {
    Theme {
        name: "light",
        fg: Color::Indexed(234),        // near black
        bg: Color::Indexed(231),        // white
        dim: Color::Indexed(246),       // mid gray
        border: Color::Indexed(251),    // light gray
        highlight_bg: Color::Indexed(253),
        highlight_fg: Color::Indexed(232),
        positive: Color::Indexed(28),   // dark green
        accent: Color::Indexed(25),     // dark blue
        input_accent: Color::Indexed(130), // dark orange
        title: Color::Indexed(232),     // black
        error: Color::Indexed(124),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggling_flips_between_the_two_palettes() {
        assert_eq!(toggled(&dark()).name, "light");
        assert_eq!(toggled(&light()).name, "dark");
        assert_eq!(by_name("solarized").name, "dark");
    }
}
