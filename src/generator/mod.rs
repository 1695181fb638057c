//! Password generation and strength scoring.

use rand::RngCore;

const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const NUMBERS: &str = "0123456789";
const SYMBOLS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

/// Which character classes to draw from, and how many characters.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorOptions {
    pub length: usize,
    pub lowercase: bool,
    pub uppercase: bool,
    pub numbers: bool,
    pub symbols: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            length: 16,
            lowercase: true,
            uppercase: true,
            numbers: true,
            symbols: true,
        }
    }
}

/// Generate a random password from the selected character classes.
///
/// With every class disabled, falls back to letters + digits rather
/// than producing an empty password.
pub fn generate_password(options: &GeneratorOptions) -> String {
    let mut charset = String::new();
    if options.lowercase {
        charset.push_str(LOWERCASE);
    }
    if options.uppercase {
        charset.push_str(UPPERCASE);
    }
    if options.numbers {
        charset.push_str(NUMBERS);
    }
    if options.symbols {
        charset.push_str(SYMBOLS);
    }

    if charset.is_empty() {
        charset = format!("{LOWERCASE}{UPPERCASE}{NUMBERS}");
    }

    let bytes = charset.as_bytes();
    let mut random = vec![0u8; options.length];
    rand::rngs::OsRng.fill_bytes(&mut random);

    random
        .iter()
        .map(|b| bytes[*b as usize % bytes.len()] as char)
        .collect()
}

/// Rough strength classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrengthLevel {
    Empty,
    Weak,
    Medium,
    Strong,
}

/// Strength heuristic result.
#[derive(Debug, Clone, Copy)]
pub struct StrengthReport {
    pub score: u32,
    pub level: StrengthLevel,
    pub percentage: u32,
}

/// Score a password by length and character variety.
///
/// This is a UI hint, not an entropy estimate.
pub fn password_strength(password: &str) -> StrengthReport {
    if password.is_empty() {
        return StrengthReport {
            score: 0,
            level: StrengthLevel::Empty,
            percentage: 0,
        };
    }

    let mut score = 0u32;

    // Length bonus
    if password.len() >= 8 {
        score += 20;
    }
    if password.len() >= 12 {
        score += 20;
    }
    if password.len() >= 16 {
        score += 10;
    }

    // Character variety bonus
    if password.chars().any(|c| c.is_ascii_lowercase()) {
        score += 10;
    }
    if password.chars().any(|c| c.is_ascii_uppercase()) {
        score += 15;
    }
    if password.chars().any(|c| c.is_ascii_digit()) {
        score += 15;
    }
    if password.chars().any(|c| !c.is_ascii_alphanumeric()) {
        score += 10;
    }

    let level = if score >= 80 {
        StrengthLevel::Strong
    } else if score >= 50 {
        StrengthLevel::Medium
    } else {
        StrengthLevel::Weak
    };

    StrengthReport {
        score,
        level,
        percentage: score.min(100),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_length_is_sixteen() {
        let password = generate_password(&GeneratorOptions::default());
        assert_eq!(password.len(), 16);
    }

    #[test]
    fn respects_disabled_classes() {
        let options = GeneratorOptions {
            length: 64,
            lowercase: true,
            uppercase: false,
            numbers: false,
            symbols: false,
        };
        let password = generate_password(&options);
        assert!(password.chars().all(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn all_classes_disabled_falls_back_to_alphanumeric() {
        let options = GeneratorOptions {
            length: 64,
            lowercase: false,
            uppercase: false,
            numbers: false,
            symbols: false,
        };
        let password = generate_password(&options);
        assert_eq!(password.len(), 64);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn consecutive_passwords_differ() {
        let options = GeneratorOptions::default();
        assert_ne!(generate_password(&options), generate_password(&options));
    }

    #[test]
    fn strength_levels() {
        assert_eq!(password_strength("").level, StrengthLevel::Empty);
        assert_eq!(password_strength("abc").level, StrengthLevel::Weak);
        assert_eq!(password_strength("abcdefgh1").level, StrengthLevel::Medium);
        assert_eq!(
            password_strength("Abcdefgh1234!xyz").level,
            StrengthLevel::Strong
        );
    }

    #[test]
    fn percentage_is_capped() {
        let report = password_strength("Abcdefgh1234!xyzABC");
        assert!(report.percentage <= 100);
    }
}
