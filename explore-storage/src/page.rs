//! Page assembly for over-fetched keyset queries.

use explore_core::{Liker, PageCursor, StorageError};

use crate::decision_store::LikersPage;

/// Turn up to `page.limit + 1` newest-first rows into a page.
///
/// When the extra row is present it is dropped and a continuation token is
/// minted from the last row that stays on the page. Otherwise this is the
/// last page and no token is produced.
pub fn assemble_page(mut rows: Vec<Liker>, page: PageCursor) -> Result<LikersPage, StorageError> {
    let limit = page.page_len();

    if rows.len() <= limit {
        return Ok(LikersPage {
            likers: rows,
            next_token: None,
        });
    }

    rows.truncate(limit);
    let next_token = match rows.last() {
        Some(last) => Some(
            page.next_after(last.timestamp)
                .encode()
                .map_err(|e| StorageError::Serialization {
                    reason: e.to_string(),
                })?,
        ),
        None => None,
    };

    Ok(LikersPage {
        likers: rows,
        next_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use explore_core::Cursor;

    fn likers(timestamps: &[i64]) -> Vec<Liker> {
        timestamps
            .iter()
            .map(|ts| Liker::new(format!("actor-{}", ts), *ts))
            .collect()
    }

    #[test]
    fn test_short_page_has_no_next_token() {
        let page = assemble_page(likers(&[300, 200]), PageCursor::first_page(2)).unwrap();
        assert_eq!(page.likers.len(), 2);
        assert_eq!(page.next_token, None);
    }

    #[test]
    fn test_over_fetched_row_is_dropped() {
        let page = assemble_page(likers(&[300, 200, 100]), PageCursor::first_page(2)).unwrap();
        let timestamps: Vec<i64> = page.likers.iter().map(|l| l.timestamp).collect();
        assert_eq!(timestamps, vec![300, 200]);

        let token = page.next_token.expect("next token");
        let cursor = Cursor::decode(&token).unwrap().unwrap();
        assert_eq!(cursor, Cursor::new(200, 2));
    }

    #[test]
    fn test_empty_rows() {
        let page = assemble_page(Vec::new(), PageCursor::default()).unwrap();
        assert!(page.likers.is_empty());
        assert!(page.next_token.is_none());
    }
}
