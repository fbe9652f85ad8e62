use std::cmp::Ordering;

pub fn compare_titles(a_title: &str, a_id: &str, b_title: &str, b_id: &str) -> Ordering {
    a_title
        .to_lowercase()
        .cmp(&b_title.to_lowercase())
        .then_with(|| a_title.cmp(b_title))
        .then_with(|| a_id.cmp(b_id))
}

pub fn plural(count: u32, unit: &str) -> String {
    if count == 1 {
        format!("{count} {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_compare_case_insensitively() {
        assert_eq!(compare_titles("alpha", "1", "Beta", "2"), Ordering::Less);
        assert_eq!(compare_titles("Zeta", "1", "alpha", "2"), Ordering::Greater);
        assert_eq!(compare_titles("same", "a", "same", "b"), Ordering::Less);
    }

    #[test]
    fn plural_units() {
        assert_eq!(plural(1, "day"), "1 day");
        assert_eq!(plural(3, "day"), "3 days");
    }
}
