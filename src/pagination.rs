use crate::error::{Error, Result};

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_PAGE_SIZE: u32 = 10;

/// Pagination parameters as they arrive from the transport layer. Both
/// fields optional: when neither is set the caller wants the whole list.
#[derive(Debug, Clone, Copy, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
  #[serde(default)]
  pub page: Option<u32>,
  #[serde(default)]
  pub page_size: Option<u32>,
}

impl PageQuery {
  pub fn is_empty(&self) -> bool {
    self.page.is_none() && self.page_size.is_none()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
  pub page: u32,
  pub page_size: u32,
  pub total: usize,
  pub total_pages: u32,
  pub has_previous_page: bool,
  pub has_next_page: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Page<T> {
  pub data: Vec<T>,
  pub meta: PageMeta,
}

/// Slices one page out of `items`.
///
/// `total_pages` is `ceil(total / page_size)` floored at 1, so an empty
/// collection still reports one (empty) page. Requests past the end are
/// rejected rather than answered with an empty slice.
pub fn paginate<T: Clone>(items: &[T], query: &PageQuery) -> Result<Page<T>> {
  let page = query.page.unwrap_or(DEFAULT_PAGE);
  let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
  let total = items.len();

  if page < 1 {
    return Err(Error::InvalidRequest(
      "Page number must be greater than 0".to_string(),
    ));
  }
  if page_size < 1 {
    return Err(Error::InvalidRequest(
      "Page size must be greater than 0".to_string(),
    ));
  }

  let total_pages = (total.div_ceil(page_size as usize)).max(1) as u32;

  if total == 0 && page > 1 {
    return Err(Error::InvalidRequest("No data available".to_string()));
  }
  if total > 0 && page > total_pages {
    return Err(Error::InvalidRequest(format!(
      "Page {} does not exist. Total pages: {}",
      page, total_pages
    )));
  }

  let start = (page - 1) as usize * page_size as usize;
  let data: Vec<T> = items
    .iter()
    .skip(start)
    .take(page_size as usize)
    .cloned()
    .collect();

  Ok(Page {
    data,
    meta: PageMeta {
      page,
      page_size,
      total,
      total_pages,
      has_previous_page: page > 1,
      has_next_page: page < total_pages,
    },
  })
}
