use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

pub const ID_PREFIX: &str = "BK-";
pub const SHORT_CODE_LEN: usize = 6;

static LAST_ISSUED: AtomicI64 = AtomicI64::new(0);

pub fn new_booking_id() -> String {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_ISSUED.load(Ordering::SeqCst);
    loop {
        let next = now.max(last + 1);
        match LAST_ISSUED.compare_exchange(last, next, Ordering::SeqCst, Ordering::SeqCst) {
            Ok(_) => return format!("{ID_PREFIX}{next}"),
            Err(current) => last = current,
        }
    }
}

pub fn short_code(id: &str) -> &str {
    match id.char_indices().rev().nth(SHORT_CODE_LEN - 1) {
        Some((idx, _)) => &id[idx..],
        None => id,
    }
}

// Exact short code, any longer tail, or the full id.
pub fn code_matches(code: &str, id: &str) -> bool {
    code.len() >= SHORT_CODE_LEN && id.to_ascii_uppercase().ends_with(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_prefixed_and_increasing() {
        let mut prev = 0i64;
        for _ in 0..1000 {
            let id = new_booking_id();
            assert!(id.starts_with(ID_PREFIX));
            let n: i64 = id[ID_PREFIX.len()..].parse().unwrap();
            assert!(n > prev, "{n} should be greater than {prev}");
            prev = n;
        }
    }

    #[test]
    fn test_ids_unique_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| (0..250).map(|_| new_booking_id()).collect::<Vec<_>>()))
            .collect();
        let mut all: Vec<String> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let total = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), total);
    }

    #[test]
    fn test_short_code_is_tail() {
        assert_eq!(short_code("BK-1717171717171"), "717171");
        assert_eq!(short_code("BK-1"), "BK-1");
        assert_eq!(short_code(&new_booking_id()).len(), SHORT_CODE_LEN);
    }

    #[test]
    fn test_code_matches() {
        let id = "BK-1717171234567";
        assert!(code_matches("234567", id));
        assert!(code_matches("1234567", id));
        assert!(code_matches("BK-1717171234567", id));
        // too short to be trusted
        assert!(!code_matches("4567", id));
        // contained but not a tail
        assert!(!code_matches("171717", id));
        assert!(!code_matches("999999", id));
    }
}
