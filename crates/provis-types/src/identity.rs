use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

/// Upper bound (exclusive) of the random tie-breaker appended to uids.
const TIE_BREAKER_RANGE: u64 = 10_000_000_000;

/// Current wall-clock time as fractional seconds since the UNIX epoch.
pub fn now_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// Generate a unique item id for an item created at `ctime`.
///
/// The format is `<seconds, 16 wide, 6 decimals>::<10 digit random>`, e.g.
/// `1700000000.123456::0048213377`. Two items created in the same
/// microsecond are separated by the random component; collisions are not
/// checked against existing ids.
pub fn generate_uid(ctime: f64) -> String {
    let tie = rand::thread_rng().gen_range(0..TIE_BREAKER_RANGE);
    format!("{ctime:016.6}::{tie:010}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn uid_format() {
        let uid = generate_uid(1234.5);
        let (time, tie) = uid.split_once("::").expect("separator");
        assert_eq!(time, "000001234.500000");
        assert_eq!(tie.len(), 10);
        assert!(tie.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn same_instant_uids_differ() {
        let ctime = now_timestamp();
        let uids: HashSet<String> = (0..1000).map(|_| generate_uid(ctime)).collect();
        assert_eq!(uids.len(), 1000);
    }

    #[test]
    fn timestamp_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(now_timestamp() > 1_577_836_800.0);
    }
}
