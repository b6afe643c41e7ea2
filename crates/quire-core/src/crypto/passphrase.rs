//! Passphrase validation and strength scoring.
//!
//! Enforces minimum security requirements for passphrases and gives
//! interactive callers a score to show while the user types.

use crate::error::{QuireError, Result};

/// Minimum passphrase length in characters.
const MIN_PASSPHRASE_LENGTH: usize = 8;

/// At most this many feedback lines are reported.
const MAX_FEEDBACK: usize = 3;

const SPECIAL_CHARS: &str = "!@#$%^&*()_+-=[]{};':\"\\|,.<>/?";

const CASE_SENSITIVE_PATTERNS: [&str; 3] = ["12345", "abcde", "qwerty"];
const DICTIONARY_PATTERNS: [&str; 3] = ["password", "letmein", "welcome"];

const SEQUENCES: [&str; 2] = ["abcdefghijklmnopqrstuvwxyz", "0123456789"];

/// Validate passphrase meets minimum security requirements.
///
/// # Requirements
///
/// - At least 8 characters long
/// - Not empty or only whitespace
pub fn validate_passphrase(passphrase: &str) -> Result<()> {
    if passphrase.trim().is_empty() {
        return Err(QuireError::InvalidInput(
            "Passphrase cannot be empty".to_string(),
        ));
    }

    let length = passphrase.chars().count();
    if length < MIN_PASSPHRASE_LENGTH {
        return Err(QuireError::InvalidInput(format!(
            "Passphrase must be at least {} characters (got {})",
            MIN_PASSPHRASE_LENGTH, length
        )));
    }

    Ok(())
}

/// Coarse strength bucket derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrengthLevel {
    Empty,
    Weak,
    Fair,
    Good,
    Strong,
}

impl StrengthLevel {
    pub fn label(self) -> &'static str {
        match self {
            StrengthLevel::Empty => "Empty",
            StrengthLevel::Weak => "Weak",
            StrengthLevel::Fair => "Fair",
            StrengthLevel::Good => "Good",
            StrengthLevel::Strong => "Strong",
        }
    }
}

/// Result of [`check_strength`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassphraseStrength {
    /// 0 to 100.
    pub score: u8,
    pub level: StrengthLevel,
    pub feedback: Vec<String>,
}

/// Score a passphrase on length, character variety and common weaknesses.
pub fn check_strength(passphrase: &str) -> PassphraseStrength {
    if passphrase.is_empty() {
        return PassphraseStrength {
            score: 0,
            level: StrengthLevel::Empty,
            feedback: Vec::new(),
        };
    }

    let mut feedback = Vec::new();
    let mut score: i32 = 0;
    let length = passphrase.chars().count();

    if length < 8 {
        feedback.push("Password should be at least 8 characters long".to_string());
    } else if length < 12 {
        score += 10;
        feedback.push("Consider using 12+ characters for better security".to_string());
    } else if length < 16 {
        score += 20;
    } else {
        score += 30;
    }

    let has_lower = passphrase.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = passphrase.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = passphrase.chars().any(|c| c.is_ascii_digit());
    let has_special = passphrase.chars().any(|c| SPECIAL_CHARS.contains(c));

    for (present, points, hint) in [
        (has_lower, 10, "Add lowercase letters"),
        (has_upper, 10, "Add uppercase letters"),
        (has_digit, 10, "Add numbers"),
        (has_special, 15, "Add special characters (!@#$%^&*...)"),
    ] {
        if present {
            score += points;
        } else {
            feedback.push(hint.to_string());
        }
    }

    let lowered = passphrase.to_lowercase();
    let common = CASE_SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| passphrase.contains(pattern))
        || DICTIONARY_PATTERNS
            .iter()
            .any(|pattern| lowered.contains(pattern));
    if common {
        score -= 20;
        feedback.push("Avoid common patterns or dictionary words".to_string());
    }

    if has_repetition(passphrase) {
        score -= 10;
        feedback.push("Avoid repeating characters".to_string());
    }

    if has_sequence(&lowered) {
        score -= 10;
        feedback.push("Avoid sequential characters".to_string());
    }

    if length >= 16 && has_lower && has_upper && has_digit && has_special {
        score += 15;
    }

    let score = score.clamp(0, 100) as u8;
    let level = match score {
        0..=29 => StrengthLevel::Weak,
        30..=59 => StrengthLevel::Fair,
        60..=79 => StrengthLevel::Good,
        _ => StrengthLevel::Strong,
    };

    if feedback.is_empty() {
        if score >= 80 {
            feedback.push("Excellent password strength!".to_string());
        } else if score >= 60 {
            feedback.push("Good password strength".to_string());
        }
    }
    feedback.truncate(MAX_FEEDBACK);

    PassphraseStrength {
        score,
        level,
        feedback,
    }
}

/// Any character repeated three or more times in a row.
fn has_repetition(value: &str) -> bool {
    let chars: Vec<char> = value.chars().collect();
    chars.windows(3).any(|w| w[0] == w[1] && w[1] == w[2])
}

/// Any three-character run of consecutive letters or digits.
fn has_sequence(lowered: &str) -> bool {
    let chars: Vec<char> = lowered.chars().collect();
    chars.windows(3).any(|w| {
        let run: String = w.iter().collect();
        SEQUENCES.iter().any(|seq| seq.contains(&run))
    })
}
