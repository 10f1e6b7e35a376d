use std::error::Error;
use std::fmt;

/// InputValueError is used if some simulation option or parameter does not fulfill the posed
/// requirements, e.g., an empty waypoint list or a non-positive respawn delay.
#[derive(Debug, Clone, PartialEq)]
pub struct InputValueError {
    pub what: String,
}

impl InputValueError {
    pub fn new(what: impl Into<String>) -> InputValueError {
        InputValueError { what: what.into() }
    }
}

impl fmt::Display for InputValueError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Invalid input value: {}", self.what)
    }
}

impl Error for InputValueError {}

#[derive(Debug, Clone, Copy)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// argsort returns the indices that would sort an array. The sort is stable, incomparable values
/// (NaN) are treated as equal.
pub fn argsort<T: std::cmp::PartialOrd>(x: &[T], order: SortOrder) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..x.len()).collect();
    match order {
        SortOrder::Ascending => indices.sort_by(|&a, &b| {
            x[a].partial_cmp(&x[b])
                .unwrap_or(std::cmp::Ordering::Equal)
        }),
        SortOrder::Descending => indices.sort_by(|&a, &b| {
            x[b].partial_cmp(&x[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        }),
    }
    indices
}

/// wrap_next returns the index following idx in a cyclic sequence of length len.
pub fn wrap_next(idx: usize, len: usize) -> usize {
    if idx + 1 >= len {
        0
    } else {
        idx + 1
    }
}

/// wrap_prev returns the index preceding idx in a cyclic sequence of length len.
pub fn wrap_prev(idx: usize, len: usize) -> usize {
    if idx == 0 {
        len - 1
    } else {
        idx - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argsort_descending_is_stable() {
        let progress = [1.5, 2.25, 1.5, 0.0];
        assert_eq!(argsort(&progress, SortOrder::Descending), vec![1, 0, 2, 3]);
        assert_eq!(argsort(&progress, SortOrder::Ascending), vec![3, 0, 2, 1]);
    }

    #[test]
    fn cyclic_indices_wrap_at_both_ends() {
        assert_eq!(wrap_next(3, 4), 0);
        assert_eq!(wrap_next(0, 4), 1);
        assert_eq!(wrap_prev(0, 4), 3);
        assert_eq!(wrap_prev(2, 4), 1);
        assert_eq!(wrap_next(0, 1), 0);
        assert_eq!(wrap_prev(0, 1), 0);
    }

    #[test]
    fn input_value_error_names_the_offending_value() {
        let err = InputValueError::new("lap target must be at least 1");
        assert_eq!(
            err.to_string(),
            "Invalid input value: lap target must be at least 1"
        );
    }
}
