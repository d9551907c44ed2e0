/// Mean pace across stored results, rounded to whole words per minute.
pub fn mean_speed(speeds: &[u32]) -> Option<u32> {
    if speeds.is_empty() {
        return None;
    }
    let total: u64 = speeds.iter().map(|&s| s as u64).sum();
    Some((total as f64 / speeds.len() as f64).round() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_speed_rounds() {
        assert_eq!(mean_speed(&[100, 150, 151]), Some(134));
        assert_eq!(mean_speed(&[100, 101]), Some(101));
    }

    #[test]
    fn test_mean_speed_single_value() {
        assert_eq!(mean_speed(&[42]), Some(42));
    }

    #[test]
    fn test_mean_speed_empty_slice() {
        assert_eq!(mean_speed(&[]), None);
    }

    #[test]
    fn test_mean_speed_does_not_overflow() {
        assert_eq!(mean_speed(&[u32::MAX, u32::MAX]), Some(u32::MAX));
    }
}
