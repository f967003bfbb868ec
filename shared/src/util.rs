use serde::{Deserialize, Deserializer};

/// Formats a chapter number the way sources address chapters: whole numbers
/// lose their fractional part (3.0 -> "3"), everything else is kept as is
/// (3.5 -> "3.5").
pub fn format_chapter_number(number: f64) -> String {
    if number.is_finite() && number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        format!("{}", number)
    }
}

/// A JSON value that services send either as a number or as a string.
#[derive(Deserialize, Clone, PartialEq, Debug)]
#[serde(untagged)]
pub enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Numeric::Number(n) => Some(*n).filter(|n| n.is_finite()),
            Numeric::Text(s) => s
                .trim()
                .replace(',', ".")
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite()),
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        let n = self.as_f64()?;
        if n < 0.0 || n.fract() != 0.0 || n > u32::MAX as f64 {
            return None;
        }

        Some(n as u32)
    }

    pub fn as_u64(&self) -> Option<u64> {
        let n = self.as_f64()?;
        if n < 0.0 || n.fract() != 0.0 {
            return None;
        }

        Some(n as u64)
    }

    /// Reads a year out of either a plain number or a date-like string
    /// ("2019", "2019-04-02").
    pub fn as_year(&self) -> Option<i32> {
        match self {
            Numeric::Number(n) if n.fract() == 0.0 => Some(*n as i32),
            Numeric::Number(_) => None,
            Numeric::Text(s) => {
                let digits = s
                    .trim()
                    .chars()
                    .take_while(|c| c.is_ascii_digit())
                    .collect::<String>();
                digits.parse::<i32>().ok()
            }
        }
    }
}

/// `#[serde(deserialize_with = "nullable")]`: an explicit `null` becomes the
/// default value instead of a parse error.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A value tagged with a language code.
pub trait Localized {
    fn lang(&self) -> Option<&str>;
}

/// Picks the entry tagged with `locale`, else the first entry.
pub fn pick_localized<'a, T>(entries: &'a [T], locale: &str) -> Option<&'a T>
where
    T: Localized,
{
    entries
        .iter()
        .find(|e| {
            e.lang()
                .map(|l| l.eq_ignore_ascii_case(locale))
                .unwrap_or(false)
        })
        .or_else(|| entries.first())
}

/// Returns the first non-blank string.
pub fn first_non_empty<'a, I>(values: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    values
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}
