//! Bulgarian personal identifiers (EGN for citizens, LNCH for foreigners).

use chrono::NaiveDate;

const EGN_WEIGHTS: [u32; 9] = [2, 4, 8, 5, 10, 9, 7, 3, 6];

fn digits(value: &str) -> Option<Vec<u32>> {
    if value.len() != 10 {
        return None;
    }
    value.chars().map(|c| c.to_digit(10)).collect()
}

/// Birth date encoded in an EGN. Month offsets: +20 for 1800s, +40 for 2000s.
pub fn egn_birth_date(egn: &str) -> Option<NaiveDate> {
    let d = digits(egn)?;
    let yy = (d[0] * 10 + d[1]) as i32;
    let mm = d[2] * 10 + d[3];
    let dd = d[4] * 10 + d[5];
    let (year, month) = match mm {
        41..=52 => (2000 + yy, mm - 40),
        21..=32 => (1800 + yy, mm - 20),
        1..=12 => (1900 + yy, mm),
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, dd)
}

/// Expected tenth digit for the first nine digits of an EGN.
pub fn egn_check_digit(first_nine: &[u32]) -> u32 {
    let sum: u32 = first_nine
        .iter()
        .zip(EGN_WEIGHTS.iter())
        .map(|(d, w)| d * w)
        .sum();
    match sum % 11 {
        10 => 0,
        r => r,
    }
}

pub fn is_valid_egn(egn: &str) -> bool {
    let Some(d) = digits(egn) else {
        return false;
    };
    egn_birth_date(egn).is_some() && egn_check_digit(&d[..9]) == d[9]
}

/// LNCH numbers carry no date or checksum we verify; ten digits is the rule.
pub fn is_valid_lnch(lnch: &str) -> bool {
    digits(lnch).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_century_from_month_offset() {
        assert_eq!(egn_birth_date("8501010011"), NaiveDate::from_ymd_opt(1985, 1, 1));
        assert_eq!(egn_birth_date("0541150002"), NaiveDate::from_ymd_opt(2005, 1, 15));
        assert_eq!(egn_birth_date("9922010000"), NaiveDate::from_ymd_opt(1899, 2, 1));
        assert_eq!(egn_birth_date("8513010000"), None);
    }

    #[test]
    fn checksum_is_enforced() {
        assert!(is_valid_egn("8501010011"));
        assert!(is_valid_egn("5503150001"));
        assert!(!is_valid_egn("8501010012"));
        assert!(!is_valid_egn("850101001"));
        assert!(!is_valid_egn("85010100a1"));
    }

    #[test]
    fn lnch_is_ten_digits() {
        assert!(is_valid_lnch("1000000001"));
        assert!(!is_valid_lnch("10000000"));
    }
}
