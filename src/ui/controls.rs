use crate::config::SlotConfig;
use crate::scene::{color_to_rgb, rgb_to_color};
use crate::sync::table::ValueRange;
use crate::sync::BindingHandle;

/// Typed widget occupying a control slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Widget {
    /// Slot laid out but not bound to anything yet.
    Placeholder,
    Number {
        text: String,
        range: Option<ValueRange>,
        step: f32,
    },
    Slider {
        value: f32,
        range: ValueRange,
        step: f32,
        readout: String,
    },
    Color {
        hex: String,
        foreground: [u8; 3],
        background: [u8; 3],
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlSlot {
    pub id: String,
    pub label: String,
    pub widget: Widget,
    pub binding: Option<BindingHandle>,
}

/// Named control slots in panel order.
#[derive(Debug, Clone, Default)]
pub struct ControlSurface {
    slots: Vec<ControlSlot>,
}

impl ControlSurface {
    pub fn from_layout(layout: &[SlotConfig]) -> Self {
        let mut surface = Self::default();
        for slot in layout {
            surface.add_slot(&slot.id, &slot.label);
        }
        surface
    }

    pub fn add_slot(&mut self, id: &str, label: &str) {
        if self.contains(id) {
            log::warn!("Duplicate control slot '{}' ignored", id);
            return;
        }
        self.slots.push(ControlSlot {
            id: id.to_string(),
            label: label.to_string(),
            widget: Widget::Placeholder,
            binding: None,
        });
    }

    pub fn contains(&self, id: &str) -> bool {
        self.slot(id).is_some()
    }

    pub fn slot(&self, id: &str) -> Option<&ControlSlot> {
        self.slots.iter().find(|slot| slot.id == id)
    }

    pub fn slot_mut(&mut self, id: &str) -> Option<&mut ControlSlot> {
        self.slots.iter_mut().find(|slot| slot.id == id)
    }

    #[cfg(test)]
    pub fn slots(&self) -> &[ControlSlot] {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut [ControlSlot] {
        &mut self.slots
    }

    /// Swap the slot's widget for a typed one. Returns false if the slot does not exist.
    pub fn replace(&mut self, id: &str, widget: Widget, binding: BindingHandle) -> bool {
        match self.slot_mut(id) {
            Some(slot) => {
                slot.widget = widget;
                slot.binding = Some(binding);
                true
            }
            None => false,
        }
    }

    /// The text a user currently sees for the control.
    #[cfg(test)]
    pub fn display_text(&self, id: &str) -> Option<&str> {
        match &self.slot(id)?.widget {
            Widget::Placeholder => None,
            Widget::Number { text, .. } => Some(text.as_str()),
            Widget::Slider { readout, .. } => Some(readout.as_str()),
            Widget::Color { hex, .. } => Some(hex.as_str()),
        }
    }
}

/// Two decimals, exact halves rounded away from zero.
pub fn format_number(value: f32) -> String {
    let rounded = (f64::from(value) * 100.0).round() / 100.0;
    format!("{rounded:.2}")
}

pub fn format_hex_color(color: u32) -> String {
    format!("#{:06x}", color & 0xff_ffff)
}

/// Parse a finite number, ignoring surrounding whitespace.
pub fn parse_number(raw: &str) -> Option<f32> {
    raw.trim()
        .parse::<f32>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Parse `#rrggbb` (the leading `#` is optional).
pub fn parse_hex_color(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    let digits = raw.strip_prefix('#').unwrap_or(raw);
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

/// Foreground/background pair that keeps the hex text legible on the swatch.
pub fn readable_contrast(color: u32) -> ([u8; 3], [u8; 3]) {
    let [r, g, b] = color_to_rgb(color);
    let luminance =
        (0.2126 * f32::from(r) + 0.7152 * f32::from(g) + 0.0722 * f32::from(b)) / 255.0;
    let foreground = if luminance > 0.5 {
        [0, 0, 0]
    } else {
        [255, 255, 255]
    };
    (foreground, [r, g, b])
}

pub fn color_widget(color: u32) -> Widget {
    let (foreground, background) = readable_contrast(color);
    Widget::Color {
        hex: format_hex_color(color),
        foreground,
        background,
    }
}

pub fn swatch_color(background: [u8; 3]) -> u32 {
    rgb_to_color(background)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_layout;

    #[test]
    fn layout_creates_placeholders_in_order() {
        let surface = ControlSurface::from_layout(&default_layout());
        assert_eq!(surface.slots().len(), 10);
        assert_eq!(surface.slots()[0].id, "field01");
        assert_eq!(surface.slots()[9].id, "range03");
        assert!(surface
            .slots()
            .iter()
            .all(|slot| slot.widget == Widget::Placeholder && slot.binding.is_none()));
        assert_eq!(surface.display_text("field02"), None);
    }

    #[test]
    fn replace_missing_slot_is_rejected() {
        let mut surface = ControlSurface::default();
        surface.add_slot("a", "A");
        surface.add_slot("a", "duplicate");
        assert_eq!(surface.slots().len(), 1);
        assert!(!surface.replace("b", Widget::Placeholder, BindingHandle::new(0)));
        assert!(surface.replace("a", color_widget(0xff8000), BindingHandle::new(3)));
        assert_eq!(surface.display_text("a"), Some("#ff8000"));
        assert_eq!(surface.slot("a").unwrap().binding, Some(BindingHandle::new(3)));
    }

    #[test]
    fn number_parsing() {
        assert_eq!(parse_number("15"), Some(15.0));
        assert_eq!(parse_number(" -2.5 "), Some(-2.5));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn hex_parsing() {
        assert_eq!(parse_hex_color("#ff8000"), Some(0xff8000));
        assert_eq!(parse_hex_color("00FF00"), Some(0x00ff00));
        assert_eq!(parse_hex_color("#zzzzzz"), None);
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#+12345"), None);
    }

    #[test]
    fn number_formatting_uses_two_decimals() {
        assert_eq!(format_number(10.0), "10.00");
        assert_eq!(format_number(-0.125), "-0.13");
        assert_eq!(format_number(0.125), "0.13");
        assert_eq!(format_number(2.375), "2.38");
        assert_eq!(format_number(1.0 / 3.0), "0.33");
        assert_eq!(format_hex_color(0x00ff00), "#00ff00");
    }

    #[test]
    fn contrast_picks_legible_foreground() {
        assert_eq!(readable_contrast(0xffffff).0, [0, 0, 0]);
        assert_eq!(readable_contrast(0x000080).0, [255, 255, 255]);
        assert_eq!(readable_contrast(0x00ff00), ([0, 0, 0], [0, 0xff, 0]));
        assert_eq!(swatch_color([0x12, 0x34, 0x56]), 0x123456);
    }
}
