use sqlx::{QueryBuilder, Sqlite};

/// Keyset window over an integer id column. Cursors are exclusive bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub after: Option<i64>,
    pub before: Option<i64>,
    pub first: Option<usize>,
    pub last: Option<usize>,
    pub max_page_size: usize,
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_previous_page: bool,
    pub has_next_page: bool,
}

impl PageRequest {
    pub fn new(
        after: Option<i64>,
        before: Option<i64>,
        first: Option<usize>,
        last: Option<usize>,
        max_page_size: usize,
    ) -> Self {
        Self {
            after,
            before,
            first,
            last,
            max_page_size: max_page_size.max(1),
        }
    }

    fn backwards(&self) -> bool {
        self.first.is_none() && self.last.is_some()
    }

    fn limit(&self) -> usize {
        let wanted = if self.backwards() { self.last } else { self.first };
        wanted.unwrap_or(self.max_page_size).min(self.max_page_size)
    }

    /// Appends `AND column > after AND column < before` to a query that
    /// already has a WHERE clause.
    pub fn push_bounds(&self, qb: &mut QueryBuilder<'_, Sqlite>, column: &str) {
        if let Some(after) = self.after {
            qb.push(" AND ").push(column).push(" > ").push_bind(after);
        }
        if let Some(before) = self.before {
            qb.push(" AND ").push(column).push(" < ").push_bind(before);
        }
    }

    /// Appends ORDER BY and LIMIT. One extra row is fetched to detect
    /// whether more rows exist past the window.
    pub fn push_order(&self, qb: &mut QueryBuilder<'_, Sqlite>, column: &str) {
        let direction = if self.backwards() { "DESC" } else { "ASC" };
        qb.push(" ORDER BY ")
            .push(column)
            .push(" ")
            .push(direction)
            .push(" LIMIT ")
            .push_bind((self.limit() + 1) as i64);
    }

    /// Trims the probe row and restores ascending id order.
    pub fn finish<T>(&self, mut rows: Vec<T>) -> Page<T> {
        let limit = self.limit();
        let overflow = rows.len() > limit;
        rows.truncate(limit);

        if self.backwards() {
            rows.reverse();
            return Page {
                items: rows,
                has_previous_page: overflow,
                has_next_page: self.before.is_some(),
            };
        }

        let mut has_previous_page = self.after.is_some();
        if let Some(last) = self.last {
            if rows.len() > last {
                rows.drain(..rows.len() - last);
                has_previous_page = true;
            }
        }
        Page {
            items: rows,
            has_previous_page,
            has_next_page: overflow,
        }
    }
}
