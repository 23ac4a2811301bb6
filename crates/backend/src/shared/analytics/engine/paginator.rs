use contracts::dashboards::d500_pharmacy_analytics::PaginationDto;

/// Page coordinates after defaulting and clamping. Only built through `clamped`, so
/// `page` and `page_size` are always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    page_size: usize,
}

impl PageRequest {
    /// `page` below 1 becomes 1; `page_size` falls back to `default_size` and is clamped to
    /// `1..=max_size`.
    pub fn clamped(
        page: Option<i64>,
        page_size: Option<i64>,
        default_size: usize,
        max_size: usize,
    ) -> Self {
        let max_size = max_size.max(1) as i64;
        let page = page.unwrap_or(1).max(1) as usize;
        let page_size = page_size
            .unwrap_or(default_size as i64)
            .clamp(1, max_size) as usize;
        Self { page, page_size }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn pagination(&self) -> PaginationDto {
        PaginationDto {
            page: self.page,
            page_size: self.page_size,
            total: self.total,
            total_pages: self.total_pages,
        }
    }
}

pub struct ResultPaginator;

impl ResultPaginator {
    /// Slices an already ordered list. A page past the end is empty, not an error.
    pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
        let total = items.len();
        let total_pages = total.div_ceil(request.page_size);
        let items = items
            .into_iter()
            .skip(request.offset())
            .take(request.page_size)
            .collect();

        Page {
            items,
            page: request.page,
            page_size: request.page_size,
            total,
            total_pages,
        }
    }
}
