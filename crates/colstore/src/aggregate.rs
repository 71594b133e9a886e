use crate::value::IndexSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Max,
    Min,
}

/// Running extremum over a stream of `(index, value)` pairs.
///
/// A value equal to the current extremum is appended; a strictly better one
/// resets the result to just its index. The final `indices` are every
/// offered index achieving the extremum, in offer order.
#[derive(Debug, Clone)]
pub struct Extremum {
    direction: Direction,
    best: Option<f32>,
    indices: IndexSet,
}

impl Extremum {
    pub fn new(direction: Direction) -> Self {
        Extremum {
            direction,
            best: None,
            indices: Vec::new(),
        }
    }

    pub fn offer(&mut self, index: usize, value: f32) {
        let better = match self.best {
            None => true,
            Some(best) if value == best => {
                self.indices.push(index);
                return;
            }
            Some(best) => match self.direction {
                Direction::Max => value > best,
                Direction::Min => value < best,
            },
        };
        if better {
            self.best = Some(value);
            self.indices.clear();
            self.indices.push(index);
        }
    }

    pub fn best(&self) -> Option<f32> {
        self.best
    }

    pub fn into_indices(self) -> IndexSet {
        self.indices
    }
}

/// Min and max tracked in one pass over the same index set.
#[derive(Debug, Clone)]
pub struct MinMax {
    pub min: Extremum,
    pub max: Extremum,
}

impl MinMax {
    pub fn new() -> Self {
        MinMax {
            min: Extremum::new(Direction::Min),
            max: Extremum::new(Direction::Max),
        }
    }

    pub fn offer(&mut self, index: usize, value: f32) {
        self.min.offer(index, value);
        self.max.offer(index, value);
    }
}

impl Default for MinMax {
    fn default() -> Self {
        MinMax::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(direction: Direction, values: &[(usize, f32)]) -> IndexSet {
        let mut e = Extremum::new(direction);
        for &(i, v) in values {
            e.offer(i, v);
        }
        e.into_indices()
    }

    #[test]
    fn test_ties_accumulate_in_scan_order() {
        let vals = [(3, 1.0), (5, 4.0), (8, 2.0), (9, 4.0), (12, 4.0)];
        assert_eq!(run(Direction::Max, &vals), vec![5, 9, 12]);
        assert_eq!(run(Direction::Min, &vals), vec![3]);
    }

    #[test]
    fn test_better_value_resets() {
        let vals = [(0, 5.0), (1, 5.0), (2, 6.0)];
        assert_eq!(run(Direction::Max, &vals), vec![2]);
    }

    #[test]
    fn test_negative_values_reach_max() {
        let vals = [(0, -10.0), (1, -2.5), (2, -7.0)];
        assert_eq!(run(Direction::Max, &vals), vec![1]);
    }

    #[test]
    fn test_empty() {
        let e = Extremum::new(Direction::Min);
        assert_eq!(e.best(), None);
        assert!(e.into_indices().is_empty());
    }

    #[test]
    fn test_shared_scan_matches_separate_scans() {
        let vals = [(0, 3.0), (1, 1.0), (2, 3.0), (3, 1.0), (4, 2.0)];
        let mut mm = MinMax::new();
        for &(i, v) in &vals {
            mm.offer(i, v);
        }
        assert_eq!(mm.max.best(), Some(3.0));
        assert_eq!(mm.min.into_indices(), run(Direction::Min, &vals));
        assert_eq!(mm.max.into_indices(), run(Direction::Max, &vals));
    }
}
