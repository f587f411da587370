//! Account and bank identifier checks.

/// Upper-cased, whitespace-free form used for checks and files.
pub fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Length, character set and ISO 13616 mod-97 checksum.
pub fn is_valid_iban(value: &str) -> bool {
    let iban = normalize(value);
    let bytes = iban.as_bytes();
    if !(15..=34).contains(&bytes.len()) {
        return false;
    }
    if !bytes[..2].iter().all(u8::is_ascii_uppercase)
        || !bytes[2..4].iter().all(u8::is_ascii_digit)
        || !bytes.iter().all(u8::is_ascii_alphanumeric)
    {
        return false;
    }

    let rearranged = bytes[4..].iter().chain(&bytes[..4]);
    let mut remainder: u32 = 0;
    for b in rearranged {
        let value = if b.is_ascii_digit() {
            u32::from(b - b'0')
        } else {
            u32::from(b - b'A') + 10
        };
        remainder = if value >= 10 {
            (remainder * 100 + value) % 97
        } else {
            (remainder * 10 + value) % 97
        };
    }
    remainder == 1
}

/// 8 or 11 characters: bank code and country letters, then location and branch.
pub fn is_valid_bic(value: &str) -> bool {
    let bic = normalize(value);
    let bytes = bic.as_bytes();
    if bytes.len() != 8 && bytes.len() != 11 {
        return false;
    }
    bytes[..6].iter().all(u8::is_ascii_uppercase) && bytes[6..].iter().all(u8::is_ascii_alphanumeric)
}
