// storefront/src/web/pagination.rs

use serde::{Deserialize, Serialize};

use crate::db::{Page, PageRequest};
use crate::errors::{AppError, Result};

pub const DEFAULT_PAGE_SIZE: i64 = 12;
pub const MAX_PAGE_SIZE: i64 = 100;

/// `?page=&page_size=` as sent by clients. Kept as strings so a malformed
/// value can be handled here instead of failing query extraction.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
  pub page: Option<String>,
  pub page_size: Option<String>,
}

impl PageQuery {
  pub fn number(&self) -> Result<i64> {
    match self.page.as_deref().map(str::trim) {
      None | Some("") => Ok(1),
      Some(raw) => raw
        .parse::<i64>()
        .ok()
        .filter(|n| *n >= 1)
        .ok_or_else(|| AppError::NotFound("Invalid page.".to_string())),
    }
  }

  /// Falls back to the default on junk and caps at `MAX_PAGE_SIZE`.
  pub fn size(&self) -> i64 {
    self
      .page_size
      .as_deref()
      .and_then(|raw| raw.trim().parse::<i64>().ok())
      .filter(|n| *n >= 1)
      .map_or(DEFAULT_PAGE_SIZE, |n| n.min(MAX_PAGE_SIZE))
  }

  /// A page number whose offset does not fit in an `i64` is treated like any
  /// other page past the end.
  pub fn request(&self) -> Result<PageRequest> {
    let size = self.size();
    let offset = (self.number()? - 1)
      .checked_mul(size)
      .ok_or_else(|| AppError::NotFound("Invalid page.".to_string()))?;
    Ok(PageRequest { offset, limit: Some(size) })
  }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
  pub count: i64,
  pub page: i64,
  pub page_size: i64,
  pub results: Vec<T>,
}

impl<T> Paginated<T> {
  /// Wraps a store page. Asking for a page past the end is a 404, except for
  /// page 1 of an empty list.
  pub fn new(query: &PageQuery, page: Page<T>) -> Result<Self> {
    let number = query.number()?;
    if number > 1 && page.results.is_empty() {
      return Err(AppError::NotFound("Invalid page.".to_string()));
    }
    Ok(Self {
      count: page.count,
      page: number,
      page_size: query.size(),
      results: page.results,
    })
  }
}
