use std::cmp::Ordering;

/// Insertion sort with a custom comparator.
///
/// Stable: equal elements keep their relative order, because an element is
/// only moved left past neighbours that compare [`Ordering::Greater`].
///
/// # Examples
///
/// ```
/// use json_draft_util::sort::insertion_sort_by;
///
/// let mut arr = vec![3, 1, 4, 1, 5];
/// insertion_sort_by(&mut arr, |a, b| b.cmp(a)); // Descending order
/// assert_eq!(arr, vec![5, 4, 3, 1, 1]);
/// ```
pub fn insertion_sort_by<T, F>(arr: &mut [T], mut compare: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    let len = arr.len();
    for i in 1..len {
        let mut j = i;
        while j > 0 && compare(&arr[j - 1], &arr[j]) == Ordering::Greater {
            arr.swap(j - 1, j);
            j -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_sort_empty() {
        let mut arr: Vec<i32> = vec![];
        insertion_sort_by(&mut arr, |a, b| a.cmp(b));
        assert!(arr.is_empty());
    }

    #[test]
    fn test_insertion_sort_single() {
        let mut arr = vec![1];
        insertion_sort_by(&mut arr, |a, b| a.cmp(b));
        assert_eq!(arr, vec![1]);
    }

    #[test]
    fn test_insertion_sort_reverse() {
        let mut arr = vec![5, 4, 3, 2, 1];
        insertion_sort_by(&mut arr, |a, b| a.cmp(b));
        assert_eq!(arr, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_insertion_sort_is_stable() {
        let mut arr = vec![(1, 'a'), (0, 'b'), (1, 'c'), (0, 'd')];
        insertion_sort_by(&mut arr, |a, b| a.0.cmp(&b.0));
        assert_eq!(arr, vec![(0, 'b'), (0, 'd'), (1, 'a'), (1, 'c')]);
    }

    #[test]
    fn test_insertion_sort_inconsistent_comparator() {
        let mut arr = vec![3, 1, 2];
        insertion_sort_by(&mut arr, |_, _| Ordering::Greater);
        arr.sort();
        assert_eq!(arr, vec![1, 2, 3]);
    }
}
