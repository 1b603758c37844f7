pub struct Utils;

impl Utils {
    /// Lowercase hex of a byte slice, used for logging frames.
    pub fn hex(data: &[u8]) -> String {
        data.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Parse a hex string such as `"AA55C07F0102"` into bytes.
    ///
    /// Whitespace is ignored. Returns `None` for odd lengths or invalid digits.
    pub fn from_hex(s: &str) -> Option<Vec<u8>> {
        let s: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        if !s.is_ascii() || s.len() % 2 != 0 {
            return None;
        }

        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
            .collect()
    }

    /// Decode an ascii field, dropping trailing padding.
    pub fn ascii(data: &[u8]) -> String {
        String::from_utf8_lossy(data)
            .trim_end_matches(|c: char| c == '\0' || c.is_whitespace())
            .to_string()
    }

    pub fn round(value: f64, places: i32) -> f64 {
        let factor = 10f64.powi(places);
        (value * factor).round() / factor
    }
}
