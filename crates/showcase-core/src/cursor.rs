//! Opaque pagination cursors
//!
//! A cursor is the base64 of a decimal offset into an ordered collection.
//! Clients treat it as opaque; anything that fails to decode is read as
//! offset 0 rather than an error, so a stale or mangled cursor restarts the
//! listing instead of failing it.

use base64::Engine;

/// Encode an offset as an opaque cursor
pub fn encode(offset: usize) -> String {
    base64::engine::general_purpose::STANDARD.encode(offset.to_string())
}

/// Decode a cursor back to an offset; missing or invalid cursors are offset 0
pub fn decode(cursor: Option<&str>) -> usize {
    let Some(cursor) = cursor else {
        return 0;
    };
    base64::engine::general_purpose::STANDARD
        .decode(cursor)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .and_then(|text| text.parse::<usize>().ok())
        .unwrap_or(0)
}

/// One page of an ordered collection
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Present iff there are items beyond this page
    pub next_cursor: Option<String>,
}

/// Return items `[offset, min(offset + page_size, len))` and a cursor for the
/// next page iff one exists. Every successive call strictly advances the
/// offset, so paging always terminates.
pub fn paginate<T: Clone>(items: &[T], cursor: Option<&str>, page_size: usize) -> Page<T> {
    let offset = decode(cursor).min(items.len());
    let end = (offset + page_size).min(items.len());
    let next_cursor = (end < items.len()).then(|| encode(end));

    Page {
        items: items[offset..end].to_vec(),
        next_cursor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for offset in [0, 1, 9, 10, 99, 100, 12345] {
            assert_eq!(decode(Some(&encode(offset))), offset);
        }
    }

    #[test]
    fn test_invalid_cursor_decodes_to_zero() {
        assert_eq!(decode(None), 0);
        assert_eq!(decode(Some("")), 0);
        assert_eq!(decode(Some("not base64!!")), 0);
        // valid base64 but not a number
        let garbage = base64::engine::general_purpose::STANDARD.encode("ten");
        assert_eq!(decode(Some(&garbage)), 0);
    }

    #[test]
    fn test_first_page_of_hundred() {
        let items: Vec<u32> = (1..=100).collect();

        let page = paginate(&items, None, 10);
        assert_eq!(page.items, (1..=10).collect::<Vec<u32>>());
        assert_eq!(decode(page.next_cursor.as_deref()), 10);

        let page = paginate(&items, page.next_cursor.as_deref(), 10);
        assert_eq!(page.items, (11..=20).collect::<Vec<u32>>());
    }

    #[test]
    fn test_paging_visits_every_item_once_and_terminates() {
        let items: Vec<u32> = (1..=100).collect();
        let mut seen = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0;

        loop {
            let page = paginate(&items, cursor.as_deref(), 10);
            seen.extend(page.items);
            pages += 1;
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        assert_eq!(pages, 10);
        assert_eq!(seen, items);
    }

    #[test]
    fn test_final_page_carries_no_cursor() {
        let items: Vec<u32> = (1..=25).collect();

        let page = paginate(&items, Some(&encode(20)), 10);
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn test_offset_past_end_yields_empty_page() {
        let items: Vec<u32> = (1..=5).collect();

        let page = paginate(&items, Some(&encode(50)), 10);
        assert!(page.items.is_empty());
        assert!(page.next_cursor.is_none());
    }
}
