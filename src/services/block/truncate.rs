//! Title truncation with a trailing ellipsis.

/// Fewest characters kept in front of the ellipsis
pub const MIN_KEPT_CHARS: usize = 4;

/// Shorten `title` to a character budget.
///
/// A budget at or above the title length leaves it unchanged. A negative
/// budget is relative to the title length. Budgets under four characters
/// keep exactly four. Counts characters, not bytes.
///
/// # Examples
/// ```
/// use conference_timetable::services::block::truncate_title;
///
/// assert_eq!(truncate_title(20, "Opening"), "Opening");
/// assert_eq!(truncate_title(5, "Opening remarks"), "Openi...");
/// assert_eq!(truncate_title(-6, "Opening remarks"), "Opening r...");
/// assert_eq!(truncate_title(1, "Opening remarks"), "Open...");
/// ```
pub fn truncate_title(budget: i64, title: &str) -> String {
    let len = title.chars().count() as i64;
    if budget >= len {
        return title.to_string();
    }

    let keep = if budget < 0 { len + budget } else { budget };
    let keep = keep.max(MIN_KEPT_CHARS as i64) as usize;

    let mut out: String = title.chars().take(keep).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_no_op_at_or_above_length() {
        assert_eq!(truncate_title(7, "Keynote"), "Keynote");
        assert_eq!(truncate_title(100, "Keynote"), "Keynote");
    }

    #[test]
    fn test_counts_characters() {
        assert_eq!(truncate_title(5, "Überblick über Detektoren"), "Überb...");
    }

    #[test]
    fn test_short_title_keeps_everything_it_has() {
        assert_eq!(truncate_title(-10, "abc"), "abc...");
    }

    proptest! {
        #[test]
        fn prop_budget_at_or_above_length_is_identity(title in "[a-zA-Z ]{0,40}", extra in 0i64..20) {
            let len = title.chars().count() as i64;
            prop_assert_eq!(truncate_title(len + extra, &title), title);
        }

        #[test]
        fn prop_relative_budget_length(title in "[a-zA-Z ]{4,60}", n in -80i64..-3) {
            let len = title.chars().count() as i64;
            let out = truncate_title(n, &title);
            prop_assert!(out.ends_with("..."));
            prop_assert_eq!(out.chars().count() as i64, (len + n).max(4) + 3);
        }
    }
}
