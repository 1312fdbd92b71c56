use super::parameters::{ParamName, Storage};
use super::Request;

/// Limit/offset window of a request, expressed as pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    limit: Option<u64>,
    offset: Option<u64>,
    default_per_page: u64,
}

impl Pagination {
    pub fn new(limit: Option<u64>, offset: Option<u64>, default_per_page: u64) -> Self {
        Self {
            limit,
            offset,
            default_per_page: default_per_page.max(1),
        }
    }

    /// Page size: the limit, or the default per-page when unset.
    pub fn limit_value(&self) -> u64 {
        self.limit.unwrap_or(self.default_per_page)
    }

    pub fn offset_value(&self) -> u64 {
        self.offset.unwrap_or(0)
    }

    /// 1-based page the offset falls on.
    pub fn current_page(&self) -> u64 {
        match self.limit_value() {
            0 => 1,
            limit => self.offset_value() / limit + 1,
        }
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        match self.limit_value() {
            0 => 0,
            limit => total.div_ceil(limit),
        }
    }
}

/// One page of materialized results.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub current_page: u64,
    pub total_pages: u64,
    pub limit_value: u64,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn is_first(&self) -> bool {
        self.current_page <= 1
    }

    pub fn is_last(&self) -> bool {
        self.current_page >= self.total_pages
    }
}

impl Request {
    /// The pagination window this request describes.
    pub fn pagination(&self) -> Pagination {
        Pagination::new(
            self.parameters().integer(ParamName::Limit),
            self.parameters().integer(ParamName::Offset),
            self.context().settings().default_per_page,
        )
    }

    /// Jump to the 1-based page `page`, keeping the page size.
    pub fn page(&self, page: u64) -> Request {
        let per = self.pagination().limit_value();
        self.paginate(per, page.max(1))
    }

    /// Change the page size, staying on the current page.
    pub fn per(&self, per: u64) -> Request {
        let page = self.pagination().current_page();
        self.paginate(per, page)
    }

    fn paginate(&self, per: u64, page: u64) -> Request {
        let offset = per.saturating_mul(page - 1);
        self.with_parameters(
            self.parameters()
                .replace(ParamName::Limit, Storage::Integer(Some(per)))
                .replace(ParamName::Offset, Storage::Integer(Some(offset))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::engine::MockSearchEngine;
    use crate::index::IndexDefinition;
    use crate::Context;
    use serde_json::json;
    use std::sync::Arc;

    fn cities(settings: Settings) -> Request {
        let ctx = Context::new(Arc::new(MockSearchEngine::new()), settings);
        ctx.define(IndexDefinition::builder("cities")).unwrap();
        ctx.all("cities").unwrap()
    }

    #[test]
    fn page_math() {
        let pagination = Pagination::new(Some(10), Some(20), 25);
        assert_eq!(pagination.current_page(), 3);
        assert_eq!(pagination.total_pages(41), 5);
        assert_eq!(pagination.total_pages(40), 4);
        assert_eq!(pagination.total_pages(0), 0);

        let defaults = Pagination::new(None, None, 25);
        assert_eq!(defaults.limit_value(), 25);
        assert_eq!(defaults.offset_value(), 0);
        assert_eq!(defaults.current_page(), 1);
    }

    #[test]
    fn zero_limit_does_not_divide_by_zero() {
        let pagination = Pagination::new(Some(0), Some(10), 25);
        assert_eq!(pagination.current_page(), 1);
        assert_eq!(pagination.total_pages(100), 0);
    }

    #[test]
    fn page_uses_the_default_per_page() {
        let request = cities(Settings {
            default_per_page: 10,
            ..Settings::default()
        })
        .page(3);

        assert_eq!(
            serde_json::Value::Object(request.render().body),
            json!({"size": 10, "from": 20})
        );
    }

    #[test]
    fn per_keeps_the_current_page() {
        let request = cities(Settings::default()).limit(10).page(3).per(5);
        assert_eq!(request.pagination().current_page(), 3);
        assert_eq!(
            serde_json::Value::Object(request.render().body),
            json!({"size": 5, "from": 10})
        );
    }

    #[test]
    fn page_zero_is_the_first_page() {
        let request = cities(Settings::default()).page(0);
        assert_eq!(request.pagination().offset_value(), 0);
    }

    #[test]
    fn huge_pages_saturate_the_offset() {
        let request = cities(Settings::default()).limit(10).page(u64::MAX);
        assert_eq!(request.pagination().offset_value(), u64::MAX);
        assert_eq!(request.pagination().limit_value(), 10);
    }

    #[test]
    fn page_flags() {
        let page: Page<u8> = Page {
            items: vec![],
            current_page: 2,
            total_pages: 2,
            limit_value: 10,
            total: 15,
        };
        assert!(!page.is_first());
        assert!(page.is_last());
    }
}
