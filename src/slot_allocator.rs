//! hands out scratch storage slots for intermediate values.
//!
//! A slot is a small non-negative integer naming one fixed-width cell of per-row scratch
//! storage. `take()` always returns the smallest slot that is not currently live, so the number
//! of distinct slots ever live at once, reported by `peak()`, is the scratch width the evaluator
//! needs for each row.
//!
//! The live slots are kept in an ascending vector with no duplicates. While no gap precedes it,
//! every value in that vector equals its own position, which lets `take()` find the first gap by
//! binary search.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotAllocator {
    used: Vec<usize>,
    max_used: usize,
}

impl SlotAllocator {
    pub fn new() -> SlotAllocator {
        SlotAllocator::default()
    }

    /// returns the smallest slot not currently live and marks it live.
    pub fn take(&mut self) -> usize {
        let first_missing = match self.used.len() {
            0 => 0,
            n => self.find_first_missing(0, n - 1),
        };
        // `first_missing` is also the position it belongs at to keep `used` sorted.
        self.used.insert(first_missing, first_missing);
        self.max_used = self.max_used.max(first_missing + 1);
        first_missing
    }

    /// marks `slot` as no longer live. Giving back a slot that is not live does nothing.
    pub fn give(&mut self, slot: usize) {
        if let Ok(pos) = self.used.binary_search(&slot) {
            self.used.remove(pos);
        }
    }

    /// returns the largest number of slots that were live at the same time.
    pub fn peak(&self) -> usize {
        self.max_used
    }

    /// returns the number of slots live right now.
    pub fn live(&self) -> usize {
        self.used.len()
    }

    // Finds the smallest value missing from `used`, looking only at positions `start..=end`.
    // Every position before `start` holds its own index.
    fn find_first_missing(&self, start: usize, end: usize) -> usize {
        if start > end {
            return end + 1;
        }
        if self.used[start] != start {
            return start;
        }
        let mid = start + (end - start) / 2;
        if self.used[mid] == mid {
            self.find_first_missing(mid + 1, end)
        } else {
            self.find_first_missing(start, mid)
        }
    }
}

#[test]
fn test_take_from_empty() {
    let mut a = SlotAllocator::new();
    assert_eq!(a.take(), 0);
    assert_eq!(a.take(), 1);
    assert_eq!(a.take(), 2);
    assert_eq!(a.peak(), 3);
    assert_eq!(a.live(), 3);
}

#[test]
fn test_give_then_take_reuses_lowest() {
    let mut a = SlotAllocator::new();
    assert_eq!(a.take(), 0);
    assert_eq!(a.take(), 1);
    a.give(0);
    assert_eq!(a.take(), 0);
    assert_eq!(a.peak(), 2);
}

#[test]
fn test_give_unknown_slot_is_noop() {
    let mut a = SlotAllocator::new();
    a.give(7);
    assert_eq!(a.take(), 0);
    a.give(3);
    assert_eq!(a.live(), 1);
    assert_eq!(a.take(), 1);
}

#[test]
fn test_finds_gap_anywhere() {
    struct Case {
        desc: &'static str,
        live: usize,
        give_back: Vec<usize>,
        expected: usize,
    }
    let cases = vec![
        Case {
            desc: "gap at front",
            live: 8,
            give_back: vec![0],
            expected: 0,
        },
        Case {
            desc: "gap in middle",
            live: 8,
            give_back: vec![5],
            expected: 5,
        },
        Case {
            desc: "gap at end",
            live: 8,
            give_back: vec![7],
            expected: 7,
        },
        Case {
            desc: "several gaps picks lowest",
            live: 9,
            give_back: vec![6, 2, 4],
            expected: 2,
        },
        Case {
            desc: "no gap",
            live: 5,
            give_back: vec![],
            expected: 5,
        },
        Case {
            desc: "all given back",
            live: 3,
            give_back: vec![0, 1, 2],
            expected: 0,
        },
    ];
    for case in cases {
        println!("Running case: {}", case.desc);
        let mut a = SlotAllocator::new();
        for _ in 0..case.live {
            a.take();
        }
        for s in &case.give_back {
            a.give(*s);
        }
        assert_eq!(a.take(), case.expected);
        assert_eq!(a.peak(), case.live.max(case.expected + 1));
    }
}

#[test]
fn test_peak_tracks_simultaneously_live() {
    // Simulate a deep left-leaning chain: each step frees one slot and takes one.
    let mut a = SlotAllocator::new();
    let mut current = a.take();
    for _ in 0..20 {
        a.give(current);
        current = a.take();
        assert_eq!(current, 0);
    }
    assert_eq!(a.peak(), 1);

    // A balanced pair keeps two slots live before the parent consumes them.
    let l = a.take();
    assert_eq!(l, 1);
    a.give(current);
    a.give(l);
    assert_eq!(a.take(), 0);
    assert_eq!(a.peak(), 2);
}

#[test]
fn test_live_slots_are_unique() {
    let mut a = SlotAllocator::new();
    let mut live: Vec<usize> = vec![];
    // Deterministic interleaving of takes and gives.
    for step in 0..200usize {
        if step % 3 == 2 && !live.is_empty() {
            let victim = live.remove((step * 7) % live.len());
            a.give(victim);
        } else {
            let expected = (0..).find(|i| !live.contains(i)).unwrap();
            let s = a.take();
            assert!(!live.contains(&s), "slot {} handed out twice", s);
            assert_eq!(s, expected);
            live.push(s);
        }
        assert_eq!(a.live(), live.len());
        assert!(a.peak() >= live.len());
    }
}
