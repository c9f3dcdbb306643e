use std::cmp::Ordering;

use super::insertion::insertion_sort_by;

/// Runs at or below this length are finished with insertion sort.
const INSERTION_THRESHOLD: usize = 16;

/// Stable top-down merge sort with a custom comparator.
///
/// Used where the comparator comes from a caller and may not describe a
/// total order. `slice::sort_by` is allowed to panic in that case; this sort
/// just yields some permutation of the input.
///
/// # Examples
///
/// ```
/// use json_draft_util::sort::merge_sort_by;
///
/// let mut arr: Vec<u32> = (0..40).rev().collect();
/// merge_sort_by(&mut arr, |a, b| a.cmp(b));
/// assert_eq!(arr, (0..40).collect::<Vec<_>>());
/// ```
pub fn merge_sort_by<T, F>(arr: &mut [T], mut compare: F)
where
    T: Clone,
    F: FnMut(&T, &T) -> Ordering,
{
    if arr.len() <= INSERTION_THRESHOLD {
        insertion_sort_by(arr, compare);
        return;
    }
    let mut buf = arr.to_vec();
    sort_run(arr, &mut buf, &mut compare);
}

fn sort_run<T, F>(arr: &mut [T], buf: &mut [T], compare: &mut F)
where
    T: Clone,
    F: FnMut(&T, &T) -> Ordering,
{
    let len = arr.len();
    if len <= INSERTION_THRESHOLD {
        insertion_sort_by(arr, &mut *compare);
        return;
    }
    let mid = len / 2;
    {
        let (left, right) = arr.split_at_mut(mid);
        let (buf_left, buf_right) = buf.split_at_mut(mid);
        sort_run(left, buf_left, compare);
        sort_run(right, buf_right, compare);
    }
    // Already in order across the seam.
    if compare(&arr[mid - 1], &arr[mid]) != Ordering::Greater {
        return;
    }
    buf[..len].clone_from_slice(arr);
    let (mut i, mut j, mut k) = (0, mid, 0);
    while i < mid && j < len {
        // Right side wins only when strictly smaller, which keeps the sort stable.
        if compare(&buf[j], &buf[i]) == Ordering::Less {
            arr[k] = buf[j].clone();
            j += 1;
        } else {
            arr[k] = buf[i].clone();
            i += 1;
        }
        k += 1;
    }
    while i < mid {
        arr[k] = buf[i].clone();
        i += 1;
        k += 1;
    }
    while j < len {
        arr[k] = buf[j].clone();
        j += 1;
        k += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_merge_sort_large_reverse() {
        let mut arr: Vec<i32> = (0..100).rev().collect();
        merge_sort_by(&mut arr, |a, b| a.cmp(b));
        assert_eq!(arr, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_merge_sort_inconsistent_comparator_keeps_elements() {
        let mut arr: Vec<i32> = (0..64).collect();
        let mut flip = false;
        merge_sort_by(&mut arr, |_, _| {
            flip = !flip;
            if flip {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        });
        arr.sort();
        assert_eq!(arr, (0..64).collect::<Vec<_>>());
    }

    proptest! {
        #[test]
        fn merge_sort_matches_std_stable_sort(input in proptest::collection::vec((0u8..8, any::<u16>()), 0..200)) {
            let mut expected = input.clone();
            expected.sort_by(|a, b| a.0.cmp(&b.0));
            let mut actual = input;
            merge_sort_by(&mut actual, |a, b| a.0.cmp(&b.0));
            prop_assert_eq!(actual, expected);
        }
    }
}
