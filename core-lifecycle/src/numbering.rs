// =====================================================================================
// File: core-lifecycle/src/numbering.rs
// Description: Monotonic per-day public number sequences
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use chrono::{NaiveDate, Utc};
use std::sync::Mutex;

/// Monotonic per-day counter producing `PREFIX-YYYYMMDD-NNNNNN` numbers.
///
/// The read-modify-write of the counter is serialized on one lock, so the
/// numeric suffixes within a calendar day are strictly increasing from 1.
/// The counter resets when the UTC day rolls over.
#[derive(Debug)]
pub struct DailySequence {
    prefix: &'static str,
    state: Mutex<(NaiveDate, u32)>,
}

impl DailySequence {
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            state: Mutex::new((Utc::now().date_naive(), 0)),
        }
    }

    /// Allocate the next public number
    pub fn next(&self) -> String {
        let today = Utc::now().date_naive();
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if state.0 != today {
            *state = (today, 0);
        }
        state.1 += 1;
        format!("{}-{}-{:06}", self.prefix, today.format("%Y%m%d"), state.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_format() {
        let seq = DailySequence::new("ALT");
        let number = seq.next();
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ALT");
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2], "000001");
    }

    #[test]
    fn test_suffixes_strictly_increasing() {
        let seq = DailySequence::new("CASE");
        let numbers: Vec<String> = (0..5).map(|_| seq.next()).collect();
        for (i, number) in numbers.iter().enumerate() {
            let suffix: u32 = number.rsplit('-').next().unwrap().parse().unwrap();
            assert_eq!(suffix, i as u32 + 1);
        }
    }

    #[test]
    fn test_concurrent_allocation_has_no_duplicates() {
        use std::collections::HashSet;
        use std::sync::Arc;

        let seq = Arc::new(DailySequence::new("SAR"));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let seq = seq.clone();
            handles.push(std::thread::spawn(move || {
                (0..50).map(|_| seq.next()).collect::<Vec<String>>()
            }));
        }
        let mut all = HashSet::new();
        for handle in handles {
            for number in handle.join().unwrap() {
                assert!(all.insert(number), "duplicate number allocated");
            }
        }
        assert_eq!(all.len(), 400);
    }
}
