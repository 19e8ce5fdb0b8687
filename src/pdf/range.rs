//! Free-form page selection parsing

use crate::error::{Error, Result};
use std::collections::BTreeSet;

/// Parse a page selection such as `"1-3, 5, 8-10"` into 1-indexed page numbers.
///
/// Tokens are separated by commas and are either a page number or a
/// hyphenated pair. Range endpoints are clamped to `1..=page_count`; a single
/// page outside the document is dropped without error. A reversed pair is read
/// in ascending order. Any malformed token fails the whole selection.
pub fn parse_page_selection(input: &str, page_count: u32) -> Result<BTreeSet<u32>> {
    let mut pages = BTreeSet::new();

    for token in input.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        match token.split_once('-') {
            Some((start, end)) => {
                let start = parse_page_number(start, token)?;
                let end = parse_page_number(end, token)?;
                let (low, high) = if start <= end {
                    (start, end)
                } else {
                    (end, start)
                };

                let low = low.max(1);
                let high = high.min(page_count);
                if low <= high {
                    pages.extend(low..=high);
                }
            }
            None => {
                let page = parse_page_number(token, token)?;
                if (1..=page_count).contains(&page) {
                    pages.insert(page);
                }
            }
        }
    }

    Ok(pages)
}

fn parse_page_number(part: &str, token: &str) -> Result<u32> {
    let part = part.trim();
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidPageRange {
            range: token.to_string(),
        });
    }
    // Digits only, so a parse failure is overflow; saturate so clamping applies
    Ok(part
        .parse::<u64>()
        .ok()
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(u32::MAX))
}

/// Resolve an optional selection to a page list, defaulting to every page.
pub fn selected_pages(selection: Option<&str>, page_count: u32) -> Result<Vec<u32>> {
    match selection {
        Some(input) if !input.trim().is_empty() => {
            Ok(parse_page_selection(input, page_count)?.into_iter().collect())
        }
        _ => Ok((1..=page_count).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn set(pages: &[u32]) -> BTreeSet<u32> {
        pages.iter().copied().collect()
    }

    #[rstest]
    #[case("1-3,5", 6, &[1, 2, 3, 5])]
    #[case("0-2", 6, &[1, 2])]
    #[case("9", 6, &[])]
    #[case("4-20", 6, &[4, 5, 6])]
    #[case(" 2 , 4 - 5 ", 6, &[2, 4, 5])]
    #[case("3-1", 6, &[1, 2, 3])]
    #[case("1,1,2-3,2", 6, &[1, 2, 3])]
    #[case("1,,2,", 6, &[1, 2])]
    #[case("7-9", 6, &[])]
    #[case("", 6, &[])]
    #[case("2-99999999999", 6, &[2, 3, 4, 5, 6])]
    #[case("99999999999", 6, &[])]
    #[case("99999999999999999999999-5", 6, &[5, 6])]
    #[case("1, 4294967296", 6, &[1])]
    fn test_parse_page_selection(
        #[case] input: &str,
        #[case] page_count: u32,
        #[case] expected: &[u32],
    ) {
        assert_eq!(parse_page_selection(input, page_count).unwrap(), set(expected));
    }

    #[rstest]
    #[case("abc")]
    #[case("1,abc")]
    #[case("-3")]
    #[case("1-")]
    #[case("1-2-3")]
    #[case("2.5")]
    #[case("+4")]
    fn test_malformed_tokens_fail(#[case] input: &str) {
        assert!(matches!(
            parse_page_selection(input, 6),
            Err(Error::InvalidPageRange { .. })
        ));
    }

    #[test]
    fn test_selected_pages_defaults_to_all() {
        assert_eq!(selected_pages(None, 3).unwrap(), vec![1, 2, 3]);
        assert_eq!(selected_pages(Some("  "), 2).unwrap(), vec![1, 2]);
        assert_eq!(selected_pages(Some("2-9"), 3).unwrap(), vec![2, 3]);
    }
}
