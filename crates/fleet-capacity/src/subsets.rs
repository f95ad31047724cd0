//! Lazy enumeration of bounded-size subsets through bit patterns.

/// Hard bound on the number of elements considered for enumeration; elements
/// beyond it are ignored. Keeps the pattern within a `u32` and bounds the
/// worst case of the exponential scan.
pub const MAX_CONSIDERED_ELEMENTS: usize = 31;

/// Iterator over every non-empty subset of cardinality at most `max_size`
/// of the first [`MAX_CONSIDERED_ELEMENTS`] items of a list. Each subset is
/// produced exactly once, in increasing bit-pattern order.
pub struct SubsetEnumerator<T> {
    items: Vec<T>,
    max_size: u32,
    // binary representation selects the items of the next subset
    pattern: u32,
}

impl<T: Copy> SubsetEnumerator<T> {
    pub fn new(items: &[T], max_size: usize) -> Self {
        let considered = items.len().min(MAX_CONSIDERED_ELEMENTS);
        Self {
            items: items[..considered].to_vec(),
            max_size: max_size as u32,
            pattern: 0,
        }
    }
}

impl<T: Copy> Iterator for SubsetEnumerator<T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Vec<T>> {
        let end = 1u32 << self.items.len();
        loop {
            if self.pattern >= end - 1 {
                return None;
            }
            self.pattern += 1;
            if self.pattern.count_ones() > self.max_size {
                continue;
            }
            let subset = self
                .items
                .iter()
                .enumerate()
                .filter(|(position, _)| self.pattern & (1 << position) != 0)
                .map(|(_, item)| *item)
                .collect();
            return Some(subset);
        }
    }
}
