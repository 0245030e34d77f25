//! Line commands accepted by `lightctl watch`, fed to the control surface as user input.

use client_core::HeadlessSurface;
use shared::domain::{ConfigKey, RgbaFraction, StatusOption};

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Select(ConfigKey, String),
    Brightness(String),
    CustomStatus(String),
    Color(RgbaFraction),
    Refresh,
    Quit,
}

pub const HELP: &str = "commands: speed <1-5> | mode <name> | status <label or text> | \
brightness <0-150> | color <r> <g> <b> [alpha 0-1] | refresh | quit";

/// Parses one line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Input>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map(|(word, rest)| (word, rest.trim()))
        .unwrap_or((line, ""));

    let input = match word {
        "quit" | "exit" => Input::Quit,
        "refresh" => Input::Refresh,
        "brightness" => Input::Brightness(required(word, rest)?.to_string()),
        "color" => Input::Color(parse_color(rest)?),
        "status" => {
            let text = required(word, rest)?;
            match StatusOption::from_label(text) {
                Some(option) => Input::Select(ConfigKey::Status, option.label().to_string()),
                None => Input::CustomStatus(text.to_string()),
            }
        }
        _ => match ConfigKey::from_label(word) {
            Some(key) => Input::Select(key, required(word, rest)?.to_string()),
            None => return Err(format!("unknown command '{word}'; {HELP}")),
        },
    };
    Ok(Some(input))
}

fn required<'a>(word: &str, rest: &'a str) -> Result<&'a str, String> {
    if rest.is_empty() {
        Err(format!("'{word}' needs a value"))
    } else {
        Ok(rest)
    }
}

fn parse_color(rest: &str) -> Result<RgbaFraction, String> {
    let parts: Vec<&str> = rest.split_whitespace().collect();
    if !(3..=4).contains(&parts.len()) {
        return Err("color needs <r> <g> <b> [alpha]".to_string());
    }
    let channel = |text: &str| {
        text.parse::<u8>()
            .map_err(|_| format!("'{text}' is not a color channel (0-255)"))
    };
    let alpha = match parts.get(3) {
        Some(text) => text
            .parse::<f64>()
            .map_err(|_| format!("'{text}' is not an alpha fraction (0-1)"))?,
        None => 1.0,
    };
    Ok(RgbaFraction {
        r: channel(parts[0])?,
        g: channel(parts[1])?,
        b: channel(parts[2])?,
        alpha,
    })
}

pub fn feed(surface: &HeadlessSurface, input: Input) {
    match input {
        Input::Select(key, label) => surface.user_select(key, &label),
        Input::Brightness(value) => surface.user_set_brightness(&value),
        Input::CustomStatus(text) => surface.user_type_custom_status(&text),
        Input::Color(color) => surface.user_drag_color(color),
        Input::Refresh => surface.user_refresh(),
        Input::Quit => {}
    }
}
