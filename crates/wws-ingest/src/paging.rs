//! Paginated retrieval.
//!
//! The request body is a template carrying a page placeholder. Page 1 is
//! fetched first to learn `Total_Pages`; every page is then requested from a
//! pool of scoped worker threads and the bodies come back in page order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use tracing::{debug, info};
use wws_model::Namespace;

use crate::error::{IngestError, Result};

/// Upper bound on the page count a response may report.
pub const MAX_PAGES: usize = 8000;

/// Default number of concurrent page requests.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Element holding the page count in every paged response.
pub const TOTAL_PAGES_ELEMENT: &str = "Total_Pages";

const PAGE_PLACEHOLDERS: [&str; 2] = ["{{ page }}", "{ page }"];

/// Anything that can turn a request body into a response body.
pub trait PageFetcher: Sync {
    fn fetch(&self, payload: &str) -> Result<Vec<u8>>;
}

impl<F> PageFetcher for F
where
    F: Fn(&str) -> Result<Vec<u8>> + Sync,
{
    fn fetch(&self, payload: &str) -> Result<Vec<u8>> {
        self(payload)
    }
}

/// Progress callbacks, invoked on the calling thread.
pub trait FetchObserver {
    fn on_total(&mut self, _pages: usize) {}
    fn on_page(&mut self, _page: usize) {}
}

impl FetchObserver for () {}

/// Substitutes the page number into `template`.
pub fn render_page(template: &str, page: usize) -> String {
    let number = page.to_string();
    PAGE_PLACEHOLDERS
        .iter()
        .fold(template.to_string(), |body, placeholder| {
            body.replace(placeholder, &number)
        })
}

/// Reads the `Total_Pages` value from a response.
pub fn total_pages(response: &[u8], namespace: &Namespace) -> Result<usize> {
    let text = std::str::from_utf8(response)?;
    let document = roxmltree::Document::parse(text)?;
    let node = document
        .descendants()
        .find(|node| node.has_tag_name((namespace.uri.as_str(), TOTAL_PAGES_ELEMENT)))
        .ok_or_else(|| IngestError::MissingElement {
            element: TOTAL_PAGES_ELEMENT.to_string(),
        })?;
    let value = node.text().unwrap_or_default().trim();
    value
        .parse::<usize>()
        .map_err(|_| IngestError::InvalidPageCount {
            element: TOTAL_PAGES_ELEMENT.to_string(),
            value: value.to_string(),
        })
}

/// Fetches every page described by `template`, in page order.
pub fn fetch_all_pages<F>(
    fetcher: &F,
    template: &str,
    namespace: &Namespace,
    concurrency: usize,
    observer: &mut dyn FetchObserver,
) -> Result<Vec<Vec<u8>>>
where
    F: PageFetcher + ?Sized,
{
    let first = fetcher.fetch(&render_page(template, 1))?;
    let pages = total_pages(&first, namespace)?;
    if pages > MAX_PAGES {
        return Err(IngestError::TooManyPages {
            pages,
            limit: MAX_PAGES,
        });
    }
    info!(pages, "response reports page count");
    observer.on_total(pages);
    if pages == 0 {
        return Ok(Vec::new());
    }

    let workers = concurrency.clamp(1, pages);
    let next_page = AtomicUsize::new(1);
    let mut bodies: Vec<Option<Vec<u8>>> = vec![None; pages];

    thread::scope(|scope| -> Result<()> {
        let (sender, receiver) = mpsc::channel::<(usize, Result<Vec<u8>>)>();
        for _ in 0..workers {
            let sender = sender.clone();
            let next_page = &next_page;
            scope.spawn(move || {
                loop {
                    let page = next_page.fetch_add(1, Ordering::Relaxed);
                    if page > pages {
                        break;
                    }
                    debug!(page, "requesting page");
                    let result = fetcher.fetch(&render_page(template, page));
                    let failed = result.is_err();
                    if sender.send((page, result)).is_err() || failed {
                        break;
                    }
                }
            });
        }
        drop(sender);

        for (page, result) in receiver {
            match result {
                Ok(body) => {
                    bodies[page - 1] = Some(body);
                    observer.on_page(page);
                }
                Err(error) => {
                    // in-flight requests still finish
                    next_page.store(pages + 1, Ordering::Relaxed);
                    return Err(error);
                }
            }
        }
        Ok(())
    })?;

    bodies
        .into_iter()
        .enumerate()
        .map(|(index, body)| body.ok_or(IngestError::MissingPage { page: index + 1 }))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn paged_response(page: usize, total: &str) -> Vec<u8> {
        format!(
            r#"<env:Envelope xmlns:env="http://schemas.xmlsoap.org/soap/envelope/"><env:Body>
<wd:Get_Workers_Response xmlns:wd="urn:com.workday/bsvc">
<wd:Response_Results><wd:Total_Pages>{total}</wd:Total_Pages><wd:Page>{page}</wd:Page></wd:Response_Results>
</wd:Get_Workers_Response></env:Body></env:Envelope>"#
        )
        .into_bytes()
    }

    fn page_of(payload: &str) -> usize {
        payload
            .trim_start_matches("<Page>")
            .trim_end_matches("</Page>")
            .parse()
            .expect("page number")
    }

    #[test]
    fn render_page_replaces_both_placeholders() {
        assert_eq!(render_page("<Page>{{ page }}</Page>", 3), "<Page>3</Page>");
        assert_eq!(render_page("<Page>{ page }</Page>", 12), "<Page>12</Page>");
        assert_eq!(render_page("<Page>1</Page>", 5), "<Page>1</Page>");
    }

    #[test]
    fn total_pages_reads_count() {
        let namespace = Namespace::workday();
        assert_eq!(total_pages(&paged_response(1, "4"), &namespace).expect("count"), 4);
        assert_eq!(total_pages(&paged_response(1, " 2 "), &namespace).expect("count"), 2);
    }

    #[test]
    fn total_pages_errors_are_descriptive() {
        let namespace = Namespace::workday();
        let missing = total_pages(b"<root/>", &namespace).expect_err("missing");
        assert_eq!(missing.to_string(), "Total_Pages element not found in response");
        let invalid = total_pages(&paged_response(1, "many"), &namespace).expect_err("invalid");
        assert!(matches!(invalid, IngestError::InvalidPageCount { .. }));
    }

    #[test]
    fn fetches_every_page_in_order() {
        let seen = Mutex::new(Vec::new());
        let fetcher = |payload: &str| -> Result<Vec<u8>> {
            let page = page_of(payload);
            seen.lock().expect("lock").push(page);
            Ok(paged_response(page, "5"))
        };
        struct Count(usize, usize);
        impl FetchObserver for Count {
            fn on_total(&mut self, pages: usize) {
                self.0 = pages;
            }
            fn on_page(&mut self, _page: usize) {
                self.1 += 1;
            }
        }
        let mut count = Count(0, 0);
        let bodies = fetch_all_pages(
            &fetcher,
            "<Page>{{ page }}</Page>",
            &Namespace::workday(),
            3,
            &mut count,
        )
        .expect("fetch");

        assert_eq!(bodies.len(), 5);
        for (index, body) in bodies.iter().enumerate() {
            let text = String::from_utf8_lossy(body);
            assert!(text.contains(&format!("<wd:Page>{}</wd:Page>", index + 1)));
        }
        assert_eq!((count.0, count.1), (5, 5));
        // page 1 is requested once for the count and once as data
        assert_eq!(seen.lock().expect("lock").len(), 6);
    }

    #[test]
    fn refuses_oversized_page_counts() {
        let fetcher = |_: &str| -> Result<Vec<u8>> { Ok(paged_response(1, "8001")) };
        let error = fetch_all_pages(&fetcher, "{ page }", &Namespace::workday(), 4, &mut ())
            .expect_err("too many pages");
        assert!(matches!(
            error,
            IngestError::TooManyPages {
                pages: 8001,
                limit: MAX_PAGES
            }
        ));
    }

    #[test]
    fn page_failure_is_returned() {
        let fetcher = |payload: &str| -> Result<Vec<u8>> {
            match page_of(payload) {
                3 => Err(IngestError::MissingElement {
                    element: "Body".into(),
                }),
                page => Ok(paged_response(page, "4")),
            }
        };
        let error = fetch_all_pages(
            &fetcher,
            "<Page>{ page }</Page>",
            &Namespace::workday(),
            2,
            &mut (),
        )
        .expect_err("page 3 fails");
        assert!(matches!(error, IngestError::MissingElement { .. }));
    }
}
