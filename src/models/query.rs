use uuid::Uuid;

use super::UserStatus;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Email,
    CreatedAt,
    FirstName,
    LastName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Ordering for user listings. Only the combinations below are accepted;
/// anything else falls back to newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserSort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for UserSort {
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            direction: SortDirection::Desc,
        }
    }
}

impl UserSort {
    /// Parse `field:direction`. Unknown input yields the default rather than
    /// an error.
    pub fn parse(raw: &str) -> Self {
        let Some((field, direction)) = raw.trim().split_once(':') else {
            return Self::default();
        };

        let field = match field {
            "email" => SortField::Email,
            "created_at" => SortField::CreatedAt,
            "first_name" => SortField::FirstName,
            "last_name" => SortField::LastName,
            _ => return Self::default(),
        };
        let direction = match direction {
            "asc" => SortDirection::Asc,
            "desc" => SortDirection::Desc,
            _ => return Self::default(),
        };

        Self { field, direction }
    }

    /// ORDER BY body. `id` breaks ties so pages never overlap.
    pub fn order_by(&self) -> &'static str {
        match (self.field, self.direction) {
            (SortField::Email, SortDirection::Asc) => "email ASC, id ASC",
            (SortField::Email, SortDirection::Desc) => "email DESC, id DESC",
            (SortField::CreatedAt, SortDirection::Asc) => "created_at ASC, id ASC",
            (SortField::CreatedAt, SortDirection::Desc) => "created_at DESC, id DESC",
            (SortField::FirstName, SortDirection::Asc) => "first_name ASC, id ASC",
            (SortField::FirstName, SortDirection::Desc) => "first_name DESC, id DESC",
            (SortField::LastName, SortDirection::Asc) => "last_name ASC, id ASC",
            (SortField::LastName, SortDirection::Desc) => "last_name DESC, id DESC",
        }
    }
}

/// Filters, ordering and paging for a user listing. Filters combine with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserQuery {
    pub page: i64,
    pub limit: i64,
    pub status: Option<UserStatus>,
    pub search: Option<String>,
    pub role_ids: Vec<Uuid>,
    pub sort: UserSort,
}

impl UserQuery {
    /// Apply page/limit defaults: non-positive values become 1 and 20, and
    /// limit is capped at 100.
    pub fn normalized(mut self) -> Self {
        if self.page <= 0 {
            self.page = DEFAULT_PAGE;
        }
        if self.limit <= 0 {
            self.limit = DEFAULT_LIMIT;
        }
        self.limit = self.limit.min(MAX_LIMIT);
        self
    }

    /// `(limit, offset)` when both page and limit are positive; otherwise the
    /// listing is unpaginated. The offset saturates at `i64::MAX`, so a page
    /// past the end is simply empty.
    pub fn window(&self) -> Option<(i64, i64)> {
        (self.page > 0 && self.limit > 0)
            .then(|| (self.limit, (self.page - 1).saturating_mul(self.limit)))
    }

    /// Search term with surrounding whitespace removed, if any remains.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }
}

pub fn total_pages(total: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}
