use chrono::{DateTime, Utc};

// MM/YY, as printed on the card
pub fn format_expiry(expires_at: DateTime<Utc>) -> String {
    expires_at.format("%m/%y").to_string()
}

pub fn mask_card_number(card_number: &str) -> String {
    let digits: Vec<char> = card_number.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 8 {
        return "*".repeat(digits.len());
    }

    let head: String = digits[..4].iter().collect();
    let tail: String = digits[digits.len() - 4..].iter().collect();
    format!("{head} **** **** {tail}")
}
