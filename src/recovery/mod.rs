//! Recovery key generation and validation.
//!
//! A recovery key is the master-password backup of last resort: 32
//! dash-separated groups of 4 characters from `A-Z0-9`, shown to the
//! user exactly once.  It is never stored locally or remotely; losing
//! both the master password and the recovery key means the data is
//! gone, by design.

use std::sync::OnceLock;

use rand::RngCore;
use regex::Regex;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Number of groups in a recovery key.
const GROUPS: usize = 32;

/// Characters per group.
const GROUP_LEN: usize = 4;

/// Groups per line when formatting for display.
const GROUPS_PER_LINE: usize = 8;

/// Generate a recovery key: `XXXX-XXXX-...` (32 groups).
pub fn generate_recovery_key() -> String {
    let mut groups = Vec::with_capacity(GROUPS);

    for _ in 0..GROUPS {
        let mut random = [0u8; GROUP_LEN];
        rand::rngs::OsRng.fill_bytes(&mut random);

        let group: String = random
            .iter()
            .map(|b| CHARSET[*b as usize % CHARSET.len()] as char)
            .collect();
        groups.push(group);
    }

    groups.join("-")
}

/// Check that a string has the recovery key format.
pub fn is_valid_recovery_key(key: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"^([A-Z0-9]{4}-){31}[A-Z0-9]{4}$").expect("recovery key pattern is valid")
    });
    pattern.is_match(key)
}

/// Break a recovery key into lines of 8 groups for display.
pub fn format_recovery_key_for_display(key: &str) -> String {
    let groups: Vec<&str> = key.split('-').collect();

    groups
        .chunks(GROUPS_PER_LINE)
        .map(|line| line.join("-"))
        .collect::<Vec<_>>()
        .join("\n")
}
