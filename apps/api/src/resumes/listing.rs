//! Pure sorting and pagination for the dashboard resume listing.
//!
//! Sorting is stable: rows with equal keys keep their input order, so
//! descending is the exact reverse of ascending for distinct keys. Pages are
//! 1-based and a requested page outside the valid range clamps instead of
//! erroring.

use serde::{Deserialize, Serialize};

use crate::models::resume::ResumeRow;

pub const PAGE_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    Name,
    JobTitle,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// One page of a listing plus enough shape information to render paging
/// controls.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

/// Sorts resumes by the requested key. `JobTitle` compares target roles with
/// missing values treated as empty strings, which sorts them first ascending.
pub fn sort_resumes(mut resumes: Vec<ResumeRow>, key: SortKey, direction: SortDirection) -> Vec<ResumeRow> {
    resumes.sort_by(|a, b| {
        let ord = match key {
            SortKey::Name => a.name.cmp(&b.name),
            SortKey::JobTitle => {
                let a_role = a.target_role.as_deref().unwrap_or("");
                let b_role = b.target_role.as_deref().unwrap_or("");
                a_role.cmp(b_role)
            }
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
    resumes
}

/// Slices `items` into the requested 1-based page. Page numbers outside the
/// valid range clamp to the nearest valid page; an empty input yields one
/// empty page.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let total_items = items.len();
    let total_pages = if total_items == 0 {
        1
    } else {
        (total_items + page_size - 1) / page_size
    };
    let page = page.clamp(1, total_pages);

    let start = (page - 1) * page_size;
    let end = (start + page_size).min(total_items);
    let page_items = if start < total_items {
        items[start..end].to_vec()
    } else {
        Vec::new()
    };

    Page {
        items: page_items,
        page,
        page_size,
        total_items,
        total_pages,
    }
}
