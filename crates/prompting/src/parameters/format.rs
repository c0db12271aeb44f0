//! Locale-aware parsing of number-typed parameter values.
//!
//! A [`FormattingContext`] is an explicit value owned by each panel; nothing
//! here reads process-wide locale state.

use serde_json::{Number, Value};

/// Decimal and grouping separators for one locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattingContext {
    locale: String,
    decimal: char,
    group: char,
}

impl Default for FormattingContext {
    fn default() -> Self {
        Self::for_locale("en")
    }
}

impl FormattingContext {
    /// Separators for a BCP-47-ish tag such as `en`, `de-DE` or `fr_CA`.
    /// Unknown languages use English separators.
    pub fn for_locale(locale: &str) -> Self {
        let tag = locale.trim().to_ascii_lowercase().replace('_', "-");
        let (decimal, group) = match tag.as_str() {
            "de-ch" | "it-ch" => ('.', '\''),
            _ => match tag.split('-').next().unwrap_or_default() {
                "de" | "es" | "it" | "pt" | "nl" | "da" | "id" | "tr" | "el" => (',', '.'),
                "fr" | "ru" | "pl" | "sv" | "fi" | "nb" | "no" | "cs" | "sk" | "uk" => {
                    (',', '\u{a0}')
                }
                _ => ('.', ','),
            },
        };
        Self {
            locale: if tag.is_empty() { "en".into() } else { tag },
            decimal,
            group,
        }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn decimal_separator(&self) -> char {
        self.decimal
    }

    pub fn group_separator(&self) -> char {
        self.group
    }

    /// Parse locale-formatted text into a JSON number.
    ///
    /// Integral values written with decimal places (`"2,00"` in `de`) would
    /// lose those places as a number, so they come back as a normalized
    /// decimal string (`"2.00"`). Returns `None` when the text is not a number.
    pub fn parse_number(&self, text: &str) -> Option<Value> {
        let cleaned: String = text
            .trim()
            .chars()
            .filter(|c| *c != self.group && !(self.group == '\u{a0}' && *c == ' '))
            .collect();

        let (int_part, frac_part) = match cleaned.find(self.decimal) {
            Some(idx) if idx > 0 => {
                let (int_part, rest) = cleaned.split_at(idx);
                (int_part, Some(rest.strip_prefix(self.decimal).unwrap_or(rest)))
            }
            Some(_) => return None,
            None => (cleaned.as_str(), None),
        };

        let digits = int_part.strip_prefix(['-', '+']).unwrap_or(int_part);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        let Some(frac) = frac_part else {
            return match int_part.parse::<i64>() {
                Ok(n) => Some(Value::Number(n.into())),
                Err(_) => int_part
                    .parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number),
            };
        };

        if frac.is_empty() || !frac.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let normalized = format!("{int_part}.{frac}");
        let parsed: f64 = normalized.parse().ok()?;
        if !parsed.is_finite() {
            return None;
        }
        if parsed.fract() == 0.0 {
            return Some(Value::String(format!("{:.*}", frac.len(), parsed)));
        }
        Number::from_f64(parsed).map(Value::Number)
    }

    /// Parse when possible, otherwise keep the raw text.
    pub fn number_or_text(&self, text: &str) -> Value {
        self.parse_number(text)
            .unwrap_or_else(|| Value::String(text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn english_separators() {
        let en = FormattingContext::default();
        assert_eq!(en.locale(), "en");
        assert_eq!(en.parse_number("1,234"), Some(json!(1234)));
        assert_eq!(en.parse_number("-12.5"), Some(json!(-12.5)));
        assert_eq!(en.parse_number("3.00"), Some(json!("3.00")));
    }

    #[test]
    fn german_separators() {
        let de = FormattingContext::for_locale("de_DE");
        assert_eq!(de.locale(), "de-de");
        assert_eq!(de.decimal_separator(), ',');
        assert_eq!(de.parse_number("1.234,75"), Some(json!(1234.75)));
        assert_eq!(de.parse_number("2,00"), Some(json!("2.00")));
    }

    #[test]
    fn french_accepts_plain_spaces_as_groups() {
        let fr = FormattingContext::for_locale("fr");
        assert_eq!(fr.parse_number("1 000,5"), Some(json!(1000.5)));
        assert_eq!(fr.parse_number("1\u{a0}000"), Some(json!(1000)));
    }

    #[test]
    fn swiss_german_uses_apostrophes() {
        let ch = FormattingContext::for_locale("de-CH");
        assert_eq!(ch.group_separator(), '\'');
        assert_eq!(ch.parse_number("1'000.25"), Some(json!(1000.25)));
    }

    #[test]
    fn rejects_non_numbers() {
        let en = FormattingContext::default();
        for text in ["", "abc", ".5", "1.", "1.2.3", "NaN", "inf", "1e5", "--1"] {
            assert_eq!(en.parse_number(text), None, "{text:?}");
        }
        assert_eq!(en.number_or_text("abc"), json!("abc"));
        assert_eq!(en.number_or_text("42"), json!(42));
    }

    #[test]
    fn unknown_locale_falls_back_to_english() {
        let xx = FormattingContext::for_locale("xx");
        assert_eq!(xx.decimal_separator(), '.');
        assert_eq!(FormattingContext::for_locale("").locale(), "en");
    }
}
