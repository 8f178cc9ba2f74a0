use serde::Serialize;

/// Fixed-size page splitter for feed listings.
///
/// The requested page number is forgiving: a missing or non-integer value
/// selects the first page and an out-of-range integer selects the last one.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    per_page: i64,
}

/// Slice of a listing chosen by `Paginator::window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: i64,
    pub num_pages: i64,
    pub count: i64,
    pub per_page: i64,
}

impl PageWindow {
    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.per_page
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }

    /// Attach the fetched rows for this window.
    pub fn into_page<T>(self, object_list: Vec<T>) -> Page<T> {
        let has_next = self.number < self.num_pages;
        let has_previous = self.number > 1;
        Page {
            object_list,
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            per_page: self.per_page,
            has_next,
            has_previous,
            next_page_number: has_next.then_some(self.number + 1),
            previous_page_number: has_previous.then_some(self.number - 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub object_list: Vec<T>,
    pub number: i64,
    pub num_pages: i64,
    pub count: i64,
    pub per_page: i64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<i64>,
    pub previous_page_number: Option<i64>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            object_list: self.object_list.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            per_page: self.per_page,
            has_next: self.has_next,
            has_previous: self.has_previous,
            next_page_number: self.next_page_number,
            previous_page_number: self.previous_page_number,
        }
    }

    pub fn len(&self) -> usize {
        self.object_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object_list.is_empty()
    }
}

impl Paginator {
    pub fn new(per_page: i64) -> Self {
        Self {
            per_page: per_page.max(1),
        }
    }

    pub fn per_page(&self) -> i64 {
        self.per_page
    }

    /// An empty listing still has one (empty) page.
    pub fn num_pages(&self, count: i64) -> i64 {
        if count <= 0 {
            1
        } else {
            (count + self.per_page - 1) / self.per_page
        }
    }

    /// Resolve the raw `page` query value against a listing of `count` items.
    pub fn window(&self, raw_page: Option<&str>, count: i64) -> PageWindow {
        let num_pages = self.num_pages(count);
        let number = match raw_page.map(str::trim) {
            None => 1,
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) if (1..=num_pages).contains(&n) => n,
                Ok(_) => num_pages,
                // Integers too large for i64 are still out of range
                Err(_) if is_integer_literal(raw) => num_pages,
                Err(_) => 1,
            },
        };

        PageWindow {
            number,
            num_pages,
            count: count.max(0),
            per_page: self.per_page,
        }
    }
}

fn is_integer_literal(raw: &str) -> bool {
    let digits = raw.strip_prefix(&['+', '-'][..]).unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}
