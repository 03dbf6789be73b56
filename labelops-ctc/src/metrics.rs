//! Word and character error rates.

/// Levenshtein distance between two sequences.
pub fn edit_distance<T: PartialEq>(target: &[T], prediction: &[T]) -> usize {
    let mut previous: Vec<usize> = (0..=prediction.len()).collect();
    let mut current = vec![0; prediction.len() + 1];

    for (i, t) in target.iter().enumerate() {
        current[0] = i + 1;

        for (j, p) in prediction.iter().enumerate() {
            let substitution = previous[j] + usize::from(t != p);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }

        std::mem::swap(&mut previous, &mut current);
    }

    previous[prediction.len()]
}

fn rate(distance: usize, target_len: usize, prediction_empty: bool) -> f64 {
    if target_len == 0 {
        return if prediction_empty { 0.0 } else { 1.0 };
    }
    distance as f64 / target_len as f64
}

/// Word edit distance over the number of target words.
///
/// An empty target scores 0 against an empty prediction and 1 otherwise.
///
/// ```
/// use labelops_ctc::metrics::word_error_rate;
///
/// assert_eq!(word_error_rate("the cat sat", "the bat sat"), 1.0 / 3.0);
/// ```
pub fn word_error_rate(target: &str, prediction: &str) -> f64 {
    let target: Vec<&str> = target.split_whitespace().collect();
    let prediction: Vec<&str> = prediction.split_whitespace().collect();

    rate(
        edit_distance(&target, &prediction),
        target.len(),
        prediction.is_empty(),
    )
}

/// Character edit distance over the number of target characters.
pub fn char_error_rate(target: &str, prediction: &str) -> f64 {
    let target: Vec<char> = target.chars().collect();
    let prediction: Vec<char> = prediction.chars().collect();

    rate(
        edit_distance(&target, &prediction),
        target.len(),
        prediction.is_empty(),
    )
}
